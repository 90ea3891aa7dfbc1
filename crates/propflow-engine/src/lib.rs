//! Workflow automation engine for Propflow
//!
//! The engine reacts to domain events (a maintenance request created, a
//! payment becoming overdue, a lease approaching expiry) by matching
//! configured rules and executing their actions in priority order:
//!
//! ```text
//! EVENT → MATCHER (rule store + condition evaluator)
//!       → ordered matched rules
//!       → EXECUTOR (per rule, per action, idempotent)
//!       → EXECUTION LEDGER (append) + rule stats
//! ```
//!
//! # Key Types
//!
//! - [`WorkflowEngine`] - facade wiring store, dispatch, and ledger
//! - [`RuleMatcher`] - trigger-indexed, priority-ordered matching
//! - [`ActionExecutor`] - sequential action execution with idempotency
//! - [`ExecutionLedger`] - durable record of every rule firing

pub mod engine;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod matcher;

pub use engine::{EventReport, RuleStats, WorkflowEngine};
pub use error::{EngineError, EngineResult};
pub use executor::ActionExecutor;
pub use ledger::{
    ActionOutcome, BeginOutcome, ExecutionLedger, ExecutionRecord, ExecutionStatus, LedgerError,
    LedgerResult, MemoryLedger, Outcome,
};
pub use matcher::RuleMatcher;
