//! Execution ledger
//!
//! Durable record of every rule firing. The ledger serves two purposes:
//! the `(rule_id, event_id)` key makes execution idempotent under event
//! redelivery, and the per-action outcomes feed the dashboard's
//! "executed N times / success rate" display. Records are append-only:
//! immutable once finished, never deleted by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};
use ulid::Ulid;

use propflow_core::{EventId, RuleId};

/// Ledger errors
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("no execution record for rule {rule_id} and event {event_id}")]
    NotFound { rule_id: RuleId, event_id: EventId },

    #[error("execution record for rule {rule_id} and event {event_id} is already finished")]
    AlreadyFinished { rule_id: RuleId, event_id: EventId },

    #[error("execution ledger unavailable: {0}")]
    Unavailable(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Outcome of a single action within a rule firing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed { reason: String },
}

/// Recorded outcome of one action, in declared order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Position of the action in the rule's action list
    pub index: usize,

    /// Action type label (e.g. "assign_contractor")
    pub kind: String,

    /// What happened
    pub outcome: Outcome,
}

/// Lifecycle state of one rule firing
///
/// `pending → running → {completed | partially_failed | failed}`;
/// terminal states are final. A firing is pending only before its atomic
/// `begin` claims the idempotency slot, so the in-memory ledger never
/// stores a `Pending` record; durable ledgers that stage records ahead
/// of the claim do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    PartiallyFailed,
    Failed,
}

impl ExecutionStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::PartiallyFailed | ExecutionStatus::Failed
        )
    }

    /// Overall status summarizing a finished action list
    ///
    /// Failures alongside successes are a partial failure; failures with
    /// no successes fail the firing.
    pub fn from_outcomes(outcomes: &[ActionOutcome]) -> Self {
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for action in outcomes {
            match action.outcome {
                Outcome::Succeeded => succeeded += 1,
                Outcome::Failed { .. } => failed += 1,
            }
        }

        if failed == 0 {
            ExecutionStatus::Completed
        } else if succeeded == 0 {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::PartiallyFailed
        }
    }
}

/// One rule firing against one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Record identity (ULID)
    pub id: String,

    /// The rule that fired
    pub rule_id: RuleId,

    /// The event it fired for
    pub event_id: EventId,

    /// When execution started
    pub started_at: DateTime<Utc>,

    /// When execution finished; the record is immutable once set
    pub finished_at: Option<DateTime<Utc>>,

    /// Per-action outcomes in declared order
    pub actions: Vec<ActionOutcome>,

    /// Overall status
    pub status: ExecutionStatus,
}

/// Result of attempting to begin an execution
#[derive(Debug, Clone)]
pub enum BeginOutcome {
    /// This caller won the `(rule_id, event_id)` slot and must run the
    /// actions and finish the record
    Started,

    /// A record for this key already exists; return it unchanged
    AlreadyExecuted(ExecutionRecord),
}

/// Append-only execution record store
///
/// The begin check-then-write must be atomic per `(rule_id, event_id)`:
/// when the same event is redelivered concurrently, exactly one caller
/// observes `Started`.
#[async_trait]
pub trait ExecutionLedger: Send + Sync {
    /// Atomically claim the `(rule_id, event_id)` idempotency slot
    async fn begin(
        &self,
        rule_id: &RuleId,
        event_id: &EventId,
        started_at: DateTime<Utc>,
    ) -> LedgerResult<BeginOutcome>;

    /// Finish a running record with its action outcomes
    async fn finish(
        &self,
        rule_id: &RuleId,
        event_id: &EventId,
        actions: Vec<ActionOutcome>,
        status: ExecutionStatus,
        finished_at: DateTime<Utc>,
    ) -> LedgerResult<ExecutionRecord>;

    /// Look up the record for an idempotency key
    async fn find(&self, rule_id: &RuleId, event_id: &EventId) -> LedgerResult<Option<ExecutionRecord>>;

    /// All records for a rule, ordered by start time
    async fn history(&self, rule_id: &RuleId) -> LedgerResult<Vec<ExecutionRecord>>;
}

/// In-memory execution ledger
pub struct MemoryLedger {
    /// Records keyed by the idempotency key
    records: DashMap<(RuleId, EventId), ExecutionRecord>,
    /// Index of event IDs per rule, in insertion order
    rule_index: DashMap<RuleId, Vec<EventId>>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            rule_index: DashMap::new(),
        }
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionLedger for MemoryLedger {
    async fn begin(
        &self,
        rule_id: &RuleId,
        event_id: &EventId,
        started_at: DateTime<Utc>,
    ) -> LedgerResult<BeginOutcome> {
        let key = (rule_id.clone(), event_id.clone());

        // The entry API holds the shard lock across the check and the
        // insert, which is what makes redelivery races lose cleanly.
        match self.records.entry(key) {
            Entry::Occupied(existing) => {
                trace!(rule_id = %rule_id, event_id = %event_id, "Execution already recorded");
                Ok(BeginOutcome::AlreadyExecuted(existing.get().clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(ExecutionRecord {
                    id: Ulid::new().to_string(),
                    rule_id: rule_id.clone(),
                    event_id: event_id.clone(),
                    started_at,
                    finished_at: None,
                    actions: Vec::new(),
                    status: ExecutionStatus::Running,
                });

                self.rule_index
                    .entry(rule_id.clone())
                    .or_default()
                    .push(event_id.clone());

                debug!(rule_id = %rule_id, event_id = %event_id, "Began execution");
                Ok(BeginOutcome::Started)
            }
        }
    }

    async fn finish(
        &self,
        rule_id: &RuleId,
        event_id: &EventId,
        actions: Vec<ActionOutcome>,
        status: ExecutionStatus,
        finished_at: DateTime<Utc>,
    ) -> LedgerResult<ExecutionRecord> {
        let key = (rule_id.clone(), event_id.clone());
        let mut record = self.records.get_mut(&key).ok_or_else(|| LedgerError::NotFound {
            rule_id: rule_id.clone(),
            event_id: event_id.clone(),
        })?;

        if record.finished_at.is_some() {
            return Err(LedgerError::AlreadyFinished {
                rule_id: rule_id.clone(),
                event_id: event_id.clone(),
            });
        }

        record.actions = actions;
        record.status = status;
        record.finished_at = Some(finished_at);

        debug!(
            rule_id = %rule_id,
            event_id = %event_id,
            status = ?status,
            "Finished execution"
        );
        Ok(record.clone())
    }

    async fn find(
        &self,
        rule_id: &RuleId,
        event_id: &EventId,
    ) -> LedgerResult<Option<ExecutionRecord>> {
        let key = (rule_id.clone(), event_id.clone());
        Ok(self.records.get(&key).map(|r| r.clone()))
    }

    async fn history(&self, rule_id: &RuleId) -> LedgerResult<Vec<ExecutionRecord>> {
        let Some(event_ids) = self.rule_index.get(rule_id) else {
            return Ok(Vec::new());
        };

        let mut records: Vec<ExecutionRecord> = event_ids
            .iter()
            .filter_map(|eid| {
                self.records
                    .get(&(rule_id.clone(), eid.clone()))
                    .map(|r| r.clone())
            })
            .collect();

        records.sort_by_key(|r| r.started_at);
        Ok(records)
    }
}
