//! Action dispatch registry for Propflow
//!
//! Each action type a rule can declare maps to one external collaborator:
//! contractor assignment, notification, email, escalation, or task
//! creation. Those collaborators are black boxes behind async handlers
//! registered here; the engine routes each action to its handler and
//! records success or failure.

use dashmap::DashMap;
use propflow_core::{Context, Event};
use propflow_rules::ActionSpec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Result type for dispatch calls
pub type DispatchResult = Result<(), DispatchError>;

/// Future type for async dispatch handlers
pub type DispatchFuture = Pin<Box<dyn Future<Output = DispatchResult> + Send>>;

/// Dispatch handler function type
pub type DispatchHandler = Arc<dyn Fn(DispatchCall) -> DispatchFuture + Send + Sync>;

/// Errors that can occur when dispatching an action
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("no handler registered for dispatch target: {0}")]
    NotRegistered(DispatchTarget),

    #[error("dispatch call failed: {0}")]
    CallFailed(String),
}

/// The external collaborators actions dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchTarget {
    Contractor,
    Notification,
    Email,
    Escalation,
    Task,
}

impl DispatchTarget {
    /// The target an action spec dispatches to
    pub fn for_action(action: &ActionSpec) -> Self {
        match action {
            ActionSpec::AssignContractor { .. } => DispatchTarget::Contractor,
            ActionSpec::SendNotification { .. } => DispatchTarget::Notification,
            ActionSpec::SendEmail { .. } => DispatchTarget::Email,
            ActionSpec::EscalateIssue { .. } => DispatchTarget::Escalation,
            ActionSpec::CreateTask { .. } => DispatchTarget::Task,
        }
    }
}

impl std::fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DispatchTarget::Contractor => "contractor",
            DispatchTarget::Notification => "notification",
            DispatchTarget::Email => "email",
            DispatchTarget::Escalation => "escalation",
            DispatchTarget::Task => "task",
        };
        write!(f, "{}", s)
    }
}

/// One call to an external collaborator
#[derive(Debug, Clone)]
pub struct DispatchCall {
    /// Which collaborator to call
    pub target: DispatchTarget,

    /// Call data, shaped per target
    pub data: Value,

    /// Context chaining back to the triggering event
    pub context: Context,
}

impl DispatchCall {
    /// Build the dispatch call for an action fired by an event
    ///
    /// The call data carries the action's own parameters plus the subject
    /// the event is about, so collaborators can act without re-fetching
    /// the event.
    pub fn for_action(action: &ActionSpec, event: &Event) -> Self {
        let fields = event.payload.fields();
        let subject = subject_id(&fields);

        let data = match action {
            ActionSpec::AssignContractor { contractor_id } => json!({
                "contractor_id": contractor_id,
                "request_id": subject,
            }),
            ActionSpec::SendNotification { channel } => json!({
                "channel": channel,
                "payload": Value::Object(fields),
            }),
            ActionSpec::SendEmail { template_id } => json!({
                "template_id": template_id,
                "payload": Value::Object(fields),
            }),
            ActionSpec::EscalateIssue { to_role } => json!({
                "issue_id": subject,
                "to_role": to_role,
            }),
            ActionSpec::CreateTask { description } => json!({
                "description": description,
                "context": Value::Object(fields),
            }),
        };

        Self {
            target: DispatchTarget::for_action(action),
            data,
            context: event.context.child(),
        }
    }
}

/// The id of the domain record an event is about
fn subject_id(fields: &serde_json::Map<String, Value>) -> Value {
    for key in ["request_id", "lease_id", "property_id"] {
        if let Some(v) = fields.get(key) {
            return v.clone();
        }
    }
    Value::Null
}

/// The dispatch registry routes action calls to registered handlers
pub struct DispatchRegistry {
    handlers: DashMap<DispatchTarget, DispatchHandler>,
}

impl DispatchRegistry {
    /// Create a new empty dispatch registry
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register the handler for a dispatch target
    pub fn register<F, Fut>(&self, target: DispatchTarget, handler: F)
    where
        F: Fn(DispatchCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult> + Send + 'static,
    {
        debug!(target = %target, "Registering dispatch handler");

        let handler: DispatchHandler =
            Arc::new(move |call| Box::pin(handler(call)) as DispatchFuture);
        self.handlers.insert(target, handler);
    }

    /// Route a call to its handler
    pub async fn call(&self, call: DispatchCall) -> DispatchResult {
        let registered = self.handlers.get(&call.target).ok_or_else(|| {
            warn!(target = %call.target, "Dispatch target has no handler");
            DispatchError::NotRegistered(call.target)
        })?;

        debug!(target = %call.target, "Dispatching call");

        let handler = registered.clone();
        drop(registered); // Release the lock before awaiting the handler

        handler(call).await
    }

    /// Check whether a target has a handler
    pub fn has_handler(&self, target: DispatchTarget) -> bool {
        self.handlers.contains_key(&target)
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
