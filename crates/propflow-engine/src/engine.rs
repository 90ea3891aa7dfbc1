//! Engine facade
//!
//! Wires the rule store, condition evaluator, dispatch registry, and
//! execution ledger together, and exposes the external surface: event
//! ingestion, event processing, the bus consumption loop, the rule
//! activation toggle, and the history/stats queries feeding the
//! dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use propflow_core::{Context, Event, EventId, EventPayload, RuleId};
use propflow_dispatch::DispatchRegistry;
use propflow_event_bus::SharedEventBus;
use propflow_rules::RuleStore;

use crate::error::{EngineError, EngineResult};
use crate::executor::ActionExecutor;
use crate::ledger::{ExecutionLedger, ExecutionRecord};
use crate::matcher::RuleMatcher;

/// Raw ingestion envelope accepted from external producers
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestEnvelope {
    event_id: EventId,
    #[serde(rename = "type")]
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: Value,
}

/// Summary of one event's trip through the engine
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    /// The processed event
    pub event_id: EventId,

    /// How many rules matched
    pub matched: usize,

    /// Execution records, in the order rules ran
    pub records: Vec<ExecutionRecord>,
}

/// Per-rule stats for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleStats {
    /// How many times the rule has executed
    pub execution_count: u64,

    /// When it last executed
    pub last_executed_at: Option<DateTime<Utc>>,

    /// Completed fraction of finished firings; `None` if it never ran
    pub success_rate: Option<f64>,
}

/// The workflow automation engine
///
/// Methods take `&self`; all shared state lives behind the injected
/// store, ledger, and registry, so events can be processed concurrently
/// from multiple tasks.
pub struct WorkflowEngine {
    store: Arc<dyn RuleStore>,
    ledger: Arc<dyn ExecutionLedger>,
    matcher: RuleMatcher,
    executor: ActionExecutor,
}

impl WorkflowEngine {
    /// Create an engine over a rule store, dispatch registry, and ledger
    pub fn new(
        store: Arc<dyn RuleStore>,
        dispatch: Arc<DispatchRegistry>,
        ledger: Arc<dyn ExecutionLedger>,
    ) -> Self {
        Self {
            matcher: RuleMatcher::new(store.clone()),
            executor: ActionExecutor::new(dispatch, ledger.clone(), store.clone()),
            store,
            ledger,
        }
    }

    /// Override the per-action timeout bound
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_action_timeout(timeout);
        self
    }

    /// Parse a raw producer envelope into a typed event
    ///
    /// An unknown `type` or a payload that does not match it is a
    /// configuration error: the event is logged and dropped, never
    /// retried.
    pub fn ingest(&self, raw: Value) -> EngineResult<Event> {
        let envelope: IngestEnvelope = serde_json::from_value(raw).map_err(|e| {
            warn!(error = %e, "Rejected malformed event envelope");
            EngineError::Configuration(format!("malformed event envelope: {}", e))
        })?;

        // The payload enum is tagged by event type; reassembling the tag
        // into the payload object lets serde enforce the closed set.
        let mut tagged = envelope.payload;
        match tagged.as_object_mut() {
            Some(map) => {
                map.insert("type".to_string(), Value::String(envelope.event_type.clone()));
            }
            None => {
                warn!(event_id = %envelope.event_id, "Rejected event with non-object payload");
                return Err(EngineError::Configuration(
                    "event payload must be an object".to_string(),
                ));
            }
        }

        let payload: EventPayload = serde_json::from_value(tagged).map_err(|e| {
            warn!(
                event_id = %envelope.event_id,
                event_type = %envelope.event_type,
                error = %e,
                "Rejected event with unknown type or mismatched payload"
            );
            EngineError::Configuration(format!(
                "unknown event type or mismatched payload '{}': {}",
                envelope.event_type, e
            ))
        })?;

        Ok(Event::new(payload, Context::new())
            .with_id(envelope.event_id)
            .with_occurred_at(envelope.occurred_at))
    }

    /// Process one event: match rules, execute them in priority order
    ///
    /// Matched rules run sequentially so that "when X and Y, then Z"
    /// ordering holds and two rules cannot race to assign different
    /// contractors to the same issue. A rule whose actions fail does not
    /// stop later rules; a store or ledger failure aborts the attempt and
    /// the caller retries with the same event ID.
    pub async fn process(&self, event: &Event) -> EngineResult<EventReport> {
        let rules = self.matcher.matching_rules(event).await?;

        let mut records = Vec::with_capacity(rules.len());
        for rule in &rules {
            let record = self.executor.execute(rule, event).await?;
            records.push(record);
        }

        info!(
            event_id = %event.id,
            trigger = %event.trigger,
            matched = rules.len(),
            "Processed event"
        );

        Ok(EventReport {
            event_id: event.id.clone(),
            matched: rules.len(),
            records,
        })
    }

    /// Ingest and process a raw producer envelope
    pub async fn handle(&self, raw: Value) -> EngineResult<EventReport> {
        let event = self.ingest(raw)?;
        self.process(&event).await
    }

    /// Consume events from the bus until it closes
    ///
    /// Engine errors are logged per event; the loop keeps going so one
    /// bad event cannot stall the stream.
    pub async fn run(&self, bus: SharedEventBus) {
        let mut rx = bus.subscribe_all();
        info!("Engine consuming event bus");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.process(&event).await {
                        warn!(event_id = %event.id, error = %e, "Event processing failed");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event bus receiver lagged; events missed");
                }
                Err(RecvError::Closed) => {
                    debug!("Event bus closed, stopping engine loop");
                    break;
                }
            }
        }
    }

    /// Toggle whether a rule participates in matching
    ///
    /// Best effort with respect to in-flight work: deactivation prevents
    /// future matching but does not interrupt running executions.
    pub async fn set_active(&self, rule_id: &RuleId, active: bool) -> EngineResult<()> {
        self.store.set_active(rule_id, active).await?;
        Ok(())
    }

    /// All execution records for a rule, ordered by start time
    pub async fn execution_history(&self, rule_id: &RuleId) -> EngineResult<Vec<ExecutionRecord>> {
        Ok(self.ledger.history(rule_id).await?)
    }

    /// Execution stats for the dashboard's per-rule display
    pub async fn stats(&self, rule_id: &RuleId) -> EngineResult<RuleStats> {
        let rule = self.store.get(rule_id).await?;
        let history = self.ledger.history(rule_id).await?;

        let finished: Vec<_> = history.iter().filter(|r| r.finished_at.is_some()).collect();
        let success_rate = if finished.is_empty() {
            None
        } else {
            let completed = finished
                .iter()
                .filter(|r| r.status == crate::ledger::ExecutionStatus::Completed)
                .count();
            Some(completed as f64 / finished.len() as f64)
        };

        Ok(RuleStats {
            execution_count: rule.execution_count,
            last_executed_at: rule.last_executed_at,
            success_rate,
        })
    }
}
