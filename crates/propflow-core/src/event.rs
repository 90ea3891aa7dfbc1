//! Domain event model
//!
//! Events are the input to the automation engine. Each event carries a
//! trigger type, a typed payload specific to that trigger, and a context
//! for causality tracking. Events are immutable once created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Context, EventId};

/// The fixed set of domain event types rules can listen for
///
/// This set is closed: an event with a type outside it is a configuration
/// error and is rejected at the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    MaintenanceRequestCreated,
    MaintenanceRequestResolved,
    PaymentOverdue,
    PaymentReceived,
    LeaseExpiring,
    ContractorAssigned,
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TriggerType::MaintenanceRequestCreated => "maintenance_request_created",
            TriggerType::MaintenanceRequestResolved => "maintenance_request_resolved",
            TriggerType::PaymentOverdue => "payment_overdue",
            TriggerType::PaymentReceived => "payment_received",
            TriggerType::LeaseExpiring => "lease_expiring",
            TriggerType::ContractorAssigned => "contractor_assigned",
        };
        write!(f, "{}", s)
    }
}

/// Category assigned to a maintenance issue by the external classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Plumbing,
    Electrical,
    Hvac,
    Appliance,
    Structural,
    Pest,
    Other,
}

/// Severity assigned to a maintenance issue by the external classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Urgent,
}

/// Trigger-specific event payload
///
/// One variant per trigger type, so the evaluator and executor can match
/// exhaustively and an unknown event shape is a deserialization error
/// rather than a runtime surprise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    MaintenanceRequestCreated {
        request_id: String,
        property_id: String,
        category: IssueCategory,
        severity: Severity,
        estimated_cost: f64,
    },
    MaintenanceRequestResolved {
        request_id: String,
        property_id: String,
        resolution_cost: f64,
    },
    PaymentOverdue {
        lease_id: String,
        days_overdue: i64,
        amount: f64,
    },
    PaymentReceived {
        lease_id: String,
        amount: f64,
    },
    LeaseExpiring {
        lease_id: String,
        property_id: String,
        days_until_expiry: i64,
    },
    ContractorAssigned {
        request_id: String,
        contractor_id: String,
    },
}

impl EventPayload {
    /// The trigger type this payload belongs to
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            EventPayload::MaintenanceRequestCreated { .. } => {
                TriggerType::MaintenanceRequestCreated
            }
            EventPayload::MaintenanceRequestResolved { .. } => {
                TriggerType::MaintenanceRequestResolved
            }
            EventPayload::PaymentOverdue { .. } => TriggerType::PaymentOverdue,
            EventPayload::PaymentReceived { .. } => TriggerType::PaymentReceived,
            EventPayload::LeaseExpiring { .. } => TriggerType::LeaseExpiring,
            EventPayload::ContractorAssigned { .. } => TriggerType::ContractorAssigned,
        }
    }

    /// Flatten the payload to a field map for condition lookup
    ///
    /// Conditions reference payload fields by name; fields absent from the
    /// map evaluate closed-world false.
    pub fn fields(&self) -> serde_json::Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("type");
                map
            }
            _ => serde_json::Map::new(),
        }
    }
}

/// A domain event flowing through the engine
///
/// The event ID is caller-supplied on ingestion and forms the idempotency
/// key together with the matched rule's ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: EventId,

    /// The trigger type, always consistent with the payload variant
    pub trigger: TriggerType,

    /// When the event occurred in the domain
    pub occurred_at: DateTime<Utc>,

    /// Trigger-specific payload
    pub payload: EventPayload,

    /// Context tracking the origin and causality
    pub context: Context,
}

impl Event {
    /// Create a new event with a generated ID and the current timestamp
    pub fn new(payload: EventPayload, context: Context) -> Self {
        Self {
            id: EventId::new(),
            trigger: payload.trigger_type(),
            occurred_at: Utc::now(),
            payload,
            context,
        }
    }

    /// Create an event with a specific ID (for redelivery with a stable key)
    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = id.into();
        self
    }

    /// Create an event with a specific occurrence time
    pub fn with_occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = at;
        self
    }
}
