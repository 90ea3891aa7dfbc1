//! Action execution
//!
//! Runs a matched rule's actions in declared order against the dispatch
//! registry, records per-action outcomes, and writes the execution
//! record. Execution is at-most-once per `(rule_id, event_id)`: the
//! ledger's atomic begin decides whether this firing runs or short-
//! circuits to the prior record.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use propflow_core::Event;
use propflow_dispatch::{DispatchCall, DispatchRegistry};
use propflow_rules::{Rule, RuleStore};

use crate::error::EngineResult;
use crate::ledger::{
    ActionOutcome, BeginOutcome, ExecutionLedger, ExecutionRecord, ExecutionStatus, Outcome,
};

/// Default bound on one external collaborator call
const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes matched rules action by action
pub struct ActionExecutor {
    dispatch: Arc<DispatchRegistry>,
    ledger: Arc<dyn ExecutionLedger>,
    store: Arc<dyn RuleStore>,
    action_timeout: Duration,
}

impl ActionExecutor {
    /// Create an executor over the dispatch registry, ledger, and store
    pub fn new(
        dispatch: Arc<DispatchRegistry>,
        ledger: Arc<dyn ExecutionLedger>,
        store: Arc<dyn RuleStore>,
    ) -> Self {
        Self {
            dispatch,
            ledger,
            store,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    /// Override the per-action timeout bound
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Execute a rule's actions for an event
    ///
    /// Actions run sequentially in declared order; a failed action is
    /// recorded and execution continues with the remaining actions. On
    /// completion the record is finished and the rule's execution stats
    /// updated in the same logical step. If a record for this
    /// `(rule_id, event_id)` already exists, it is returned unchanged and
    /// nothing is dispatched.
    pub async fn execute(&self, rule: &Rule, event: &Event) -> EngineResult<ExecutionRecord> {
        let started_at = Utc::now();

        match self.ledger.begin(&rule.id, &event.id, started_at).await? {
            BeginOutcome::AlreadyExecuted(record) => {
                debug!(
                    rule_id = %rule.id,
                    event_id = %event.id,
                    "Duplicate delivery, returning prior record"
                );
                return Ok(record);
            }
            BeginOutcome::Started => {}
        }

        debug!(
            rule_id = %rule.id,
            event_id = %event.id,
            actions = rule.actions.len(),
            "Executing rule"
        );

        let mut outcomes = Vec::with_capacity(rule.actions.len());
        for (index, action) in rule.actions.iter().enumerate() {
            let call = DispatchCall::for_action(action, event);
            let outcome = match tokio::time::timeout(self.action_timeout, self.dispatch.call(call))
                .await
            {
                Ok(Ok(())) => Outcome::Succeeded,
                Ok(Err(e)) => {
                    warn!(
                        rule_id = %rule.id,
                        action = action.kind(),
                        error = %e,
                        "Action failed"
                    );
                    Outcome::Failed {
                        reason: e.to_string(),
                    }
                }
                Err(_) => {
                    warn!(
                        rule_id = %rule.id,
                        action = action.kind(),
                        timeout = ?self.action_timeout,
                        "Action timed out"
                    );
                    Outcome::Failed {
                        reason: format!("timed out after {:?}", self.action_timeout),
                    }
                }
            };

            outcomes.push(ActionOutcome {
                index,
                kind: action.kind().to_string(),
                outcome,
            });
        }

        let status = ExecutionStatus::from_outcomes(&outcomes);
        let finished_at = Utc::now();

        // Ledger write and stats update form one logical step; a store
        // failure here surfaces as an engine error and the caller retries
        // against the idempotency key.
        let record = self
            .ledger
            .finish(&rule.id, &event.id, outcomes, status, finished_at)
            .await?;
        self.store.record_execution(&rule.id, finished_at).await?;

        Ok(record)
    }
}
