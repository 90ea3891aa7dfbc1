//! Identifier newtypes for events and rules

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a domain event
///
/// Event IDs are the caller-supplied half of the idempotency key: retries
/// of the same logical event must reuse the same EventId.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a fresh event ID (ULID)
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Get the ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an automation rule
///
/// Rule IDs order lexicographically; ULIDs make that ordering creation
/// order, which is what breaks priority ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Generate a fresh rule ID (ULID)
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Get the ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RuleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
        assert_ne!(RuleId::new(), RuleId::new());
    }

    #[test]
    fn test_rule_id_orders_lexicographically() {
        let a = RuleId::from("01ARZ3NDEKTSV4RRFFQ69G5FAA");
        let b = RuleId::from("01ARZ3NDEKTSV4RRFFQ69G5FAB");
        assert!(a < b);
    }

    #[test]
    fn test_id_serde_transparent() {
        let id: EventId = serde_json::from_str("\"evt_42\"").unwrap();
        assert_eq!(id.as_str(), "evt_42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"evt_42\"");
    }
}
