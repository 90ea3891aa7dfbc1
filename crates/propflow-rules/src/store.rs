//! Rule store access
//!
//! The engine reads rules through the `RuleStore` trait and writes only
//! the engine-owned stats (`execution_count`, `last_executed_at`) and the
//! `is_active` toggle. In production the store fronts the platform's
//! relational database; `MemoryRuleStore` is the in-process
//! implementation used by the engine runtime and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use propflow_core::{RuleId, TriggerType};

use crate::rule::{Rule, RuleConfig};

/// Rule store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Rule not found: {0}")]
    NotFound(RuleId),

    #[error("Invalid rule configuration: {0}")]
    InvalidConfig(String),

    #[error("Rule store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for rule store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Read/stats contract the engine holds on the rule store
///
/// Implementations must return self-consistent rule snapshots: a rule
/// edited concurrently either appears with all its fields from before the
/// edit or all from after, never a partial view.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All active rules listening for the given trigger type
    ///
    /// Must be indexed by trigger: O(active rules for that trigger), not
    /// O(all rules).
    async fn list_active_by_trigger(&self, trigger: TriggerType) -> StoreResult<Vec<Rule>>;

    /// Fetch one rule by ID
    async fn get(&self, id: &RuleId) -> StoreResult<Rule>;

    /// Toggle whether a rule participates in matching
    async fn set_active(&self, id: &RuleId, active: bool) -> StoreResult<()>;

    /// Record a completed execution: bump `execution_count` and set
    /// `last_executed_at` atomically
    async fn record_execution(
        &self,
        id: &RuleId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<()>;
}

/// In-memory rule store with a trigger-type index
pub struct MemoryRuleStore {
    /// All rules by ID
    rules: DashMap<RuleId, Rule>,
    /// Index of rule IDs by trigger type
    trigger_index: DashMap<TriggerType, Vec<RuleId>>,
}

impl MemoryRuleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            trigger_index: DashMap::new(),
        }
    }

    /// Load rules from configs
    pub fn load(&self, configs: Vec<RuleConfig>) -> StoreResult<()> {
        for config in configs {
            self.add(config)?;
        }
        Ok(())
    }

    /// Add a rule from config
    pub fn add(&self, config: RuleConfig) -> StoreResult<RuleId> {
        let rule = Rule::from_config(config);
        let id = rule.id.clone();

        if self.rules.contains_key(&id) {
            return Err(StoreError::InvalidConfig(format!(
                "Rule with ID {} already exists",
                id
            )));
        }

        // Malformed conditions are stored but will never match; surface
        // the diagnostic here where the configuration layer can see it.
        if let Err(e) = rule.validate() {
            warn!(rule_id = %id, error = %e, "Rule has a malformed condition");
        }

        info!(rule_id = %id, name = %rule.name, trigger = %rule.trigger, "Added rule");

        self.trigger_index
            .entry(rule.trigger)
            .or_default()
            .push(id.clone());
        self.rules.insert(id.clone(), rule);
        Ok(id)
    }

    /// Remove a rule
    pub fn remove(&self, id: &RuleId) -> StoreResult<Rule> {
        let (_, rule) = self
            .rules
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if let Some(mut ids) = self.trigger_index.get_mut(&rule.trigger) {
            ids.retain(|rid| rid != id);
        }

        info!(rule_id = %id, "Removed rule");
        Ok(rule)
    }

    /// All rules, unordered
    pub fn all(&self) -> Vec<Rule> {
        self.rules.iter().map(|r| r.value().clone()).collect()
    }

    /// Number of stored rules
    pub fn count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn list_active_by_trigger(&self, trigger: TriggerType) -> StoreResult<Vec<Rule>> {
        let Some(ids) = self.trigger_index.get(&trigger) else {
            return Ok(Vec::new());
        };

        // Snapshot clones; each rule is read whole under its shard lock
        let rules: Vec<Rule> = ids
            .iter()
            .filter_map(|id| self.rules.get(id).map(|r| r.value().clone()))
            .filter(|r| r.is_active)
            .collect();

        debug!(trigger = %trigger, count = rules.len(), "Listed active rules");
        Ok(rules)
    }

    async fn get(&self, id: &RuleId) -> StoreResult<Rule> {
        self.rules
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn set_active(&self, id: &RuleId, active: bool) -> StoreResult<()> {
        let mut rule = self
            .rules
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        rule.is_active = active;
        info!(
            rule_id = %id,
            "{} rule",
            if active { "Activated" } else { "Deactivated" }
        );
        Ok(())
    }

    async fn record_execution(
        &self,
        id: &RuleId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut rule = self
            .rules
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        rule.execution_count += 1;
        rule.last_executed_at = Some(executed_at);
        debug!(
            rule_id = %id,
            execution_count = rule.execution_count,
            "Recorded execution"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(id: &str, trigger: &str, active: bool) -> RuleConfig {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Rule {}", id),
            "trigger": trigger,
            "is_active": active,
            "actions": []
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_trigger_index_lookup() {
        let store = MemoryRuleStore::new();
        store
            .load(vec![
                config("r1", "payment_overdue", true),
                config("r2", "payment_overdue", true),
                config("r3", "lease_expiring", true),
            ])
            .unwrap();

        let rules = store
            .list_active_by_trigger(TriggerType::PaymentOverdue)
            .await
            .unwrap();
        assert_eq!(rules.len(), 2);

        let rules = store
            .list_active_by_trigger(TriggerType::ContractorAssigned)
            .await
            .unwrap();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_rules_excluded() {
        let store = MemoryRuleStore::new();
        store
            .load(vec![
                config("active", "payment_overdue", true),
                config("dormant", "payment_overdue", false),
            ])
            .unwrap();

        let rules = store
            .list_active_by_trigger(TriggerType::PaymentOverdue)
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id.as_str(), "active");
    }

    #[tokio::test]
    async fn test_set_active_toggle() {
        let store = MemoryRuleStore::new();
        store.load(vec![config("r1", "payment_overdue", true)]).unwrap();
        let id = RuleId::from("r1");

        store.set_active(&id, false).await.unwrap();
        assert!(!store.get(&id).await.unwrap().is_active);

        store.set_active(&id, true).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_record_execution_updates_stats() {
        let store = MemoryRuleStore::new();
        store.load(vec![config("r1", "payment_overdue", true)]).unwrap();
        let id = RuleId::from("r1");

        let at = Utc::now();
        store.record_execution(&id, at).await.unwrap();
        store.record_execution(&id, at).await.unwrap();

        let rule = store.get(&id).await.unwrap();
        assert_eq!(rule.execution_count, 2);
        assert_eq!(rule.last_executed_at, Some(at));
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryRuleStore::new();
        store.add(config("r1", "payment_overdue", true)).unwrap();

        let result = store.add(config("r1", "payment_overdue", true));
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_remove_cleans_index() {
        let store = MemoryRuleStore::new();
        store.add(config("r1", "payment_overdue", true)).unwrap();

        store.remove(&RuleId::from("r1")).unwrap();
        assert_eq!(store.count(), 0);

        let rules = store
            .list_active_by_trigger(TriggerType::PaymentOverdue)
            .await
            .unwrap();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn test_missing_rule_is_not_found() {
        let store = MemoryRuleStore::new();
        let missing = RuleId::from("ghost");

        assert!(matches!(
            store.get(&missing).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.set_active(&missing, true).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
