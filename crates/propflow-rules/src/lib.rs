//! Rule model and matching primitives for Propflow
//!
//! An automation rule ties together a trigger, conditions, and actions:
//!
//! ```text
//! RULE = TRIGGER → CONDITIONS (all must hold) → ACTIONS (in order)
//! ```
//!
//! This crate owns the persisted rule shape, the pure condition
//! evaluator, and the `RuleStore` read/stats contract the engine uses.
//! Rule definitions themselves are created and edited by the external
//! rule-builder UI; the engine only reads them, flips `is_active`, and
//! updates execution stats.

pub mod action;
pub mod condition;
pub mod eval;
pub mod rule;
pub mod store;

pub use action::{ActionSpec, EscalationRole, NotificationChannel};
pub use condition::{Condition, ConditionError, ConditionOperator, ConditionResult};
pub use eval::ConditionEvaluator;
pub use rule::{Rule, RuleConfig};
pub use store::{MemoryRuleStore, RuleStore, StoreError, StoreResult};
