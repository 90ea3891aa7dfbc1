//! Rule definition and persisted configuration shape

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use propflow_core::{RuleId, TriggerType};

use crate::action::ActionSpec;
use crate::condition::{Condition, ConditionResult};

/// Rule configuration as persisted by the external rule builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique ID (optional, auto-generated if not provided)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RuleId>,

    /// Human-readable name
    pub name: String,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the rule participates in matching
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Execution priority; higher runs first
    #[serde(default)]
    pub priority: i32,

    /// Event type the rule listens for
    pub trigger: TriggerType,

    /// Predicates over the event payload, all must hold
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Actions to execute in declared order
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

fn default_active() -> bool {
    true
}

/// An automation rule with engine-owned execution stats
///
/// The definition fields are owned by the configuration layer; the engine
/// only reads them. `execution_count` and `last_executed_at` are
/// denormalized from the execution ledger and owned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier
    pub id: RuleId,

    /// Human-readable name
    pub name: String,

    /// Description
    pub description: Option<String>,

    /// Whether the rule participates in matching
    pub is_active: bool,

    /// Execution priority; higher runs first, ties broken by id ascending
    pub priority: i32,

    /// Event type the rule listens for
    pub trigger: TriggerType,

    /// Predicates over the event payload
    pub conditions: Vec<Condition>,

    /// Actions to execute in declared order
    pub actions: Vec<ActionSpec>,

    /// How many times the rule has executed
    pub execution_count: u64,

    /// When the rule last executed
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl Rule {
    /// Create from config, generating an ID if the config has none
    pub fn from_config(config: RuleConfig) -> Self {
        Self {
            id: config.id.unwrap_or_default(),
            name: config.name,
            description: config.description,
            is_active: config.is_active,
            priority: config.priority,
            trigger: config.trigger,
            conditions: config.conditions,
            actions: config.actions,
            execution_count: 0,
            last_executed_at: None,
        }
    }

    /// Check all condition value shapes against their operators
    pub fn validate(&self) -> ConditionResult<()> {
        for condition in &self.conditions {
            condition.validate()?;
        }
        Ok(())
    }

    /// Total execution order: priority descending, id ascending
    pub fn cmp_execution_order(&self, other: &Rule) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}
