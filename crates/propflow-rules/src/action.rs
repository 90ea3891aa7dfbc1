//! Action types
//!
//! Actions are the typed side effects a matched rule performs. Each
//! variant maps to one external dispatch target; the set is closed so the
//! executor can match exhaustively.

use serde::{Deserialize, Serialize};

/// Channel for a notification action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Push,
    Sms,
    InApp,
}

/// Role an issue can be escalated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationRole {
    PropertyManager,
    RegionalManager,
    Owner,
}

/// Action specification within a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Assign a contractor to the triggering maintenance request
    AssignContractor { contractor_id: String },

    /// Send a notification on the given channel
    SendNotification { channel: NotificationChannel },

    /// Send a templated email
    SendEmail { template_id: String },

    /// Escalate the triggering issue to a role
    EscalateIssue { to_role: EscalationRole },

    /// Create a follow-up task
    CreateTask { description: String },
}

impl ActionSpec {
    /// Stable label for this action type, recorded per action outcome
    pub fn kind(&self) -> &'static str {
        match self {
            ActionSpec::AssignContractor { .. } => "assign_contractor",
            ActionSpec::SendNotification { .. } => "send_notification",
            ActionSpec::SendEmail { .. } => "send_email",
            ActionSpec::EscalateIssue { .. } => "escalate_issue",
            ActionSpec::CreateTask { .. } => "create_task",
        }
    }
}
