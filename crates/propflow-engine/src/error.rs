//! Engine error taxonomy
//!
//! Action failures are not errors here: they are recorded per-action in
//! the execution ledger. Errors cover configuration problems (unknown
//! event type, malformed envelope) and store/ledger unavailability, which
//! aborts the whole processing attempt so the caller can retry with the
//! same event ID.

use thiserror::Error;

use propflow_rules::StoreError;

use crate::ledger::LedgerError;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("rule store error: {0}")]
    Store(#[from] StoreError),

    #[error("execution ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
