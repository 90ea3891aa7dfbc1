//! Rule matching and scheduling
//!
//! Given an incoming event, select all active rules whose trigger and
//! conditions match, and return them in execution order: priority
//! descending, ties broken by rule ID ascending so matching is
//! deterministic.

use std::sync::Arc;
use tracing::debug;

use propflow_core::Event;
use propflow_rules::{ConditionEvaluator, Rule, RuleStore};

use crate::error::EngineResult;

/// Matches incoming events against the rule store
///
/// Matching is read-only: rules are snapshots taken at fetch time, so a
/// rule edited mid-evaluation is either wholly included or wholly
/// excluded.
pub struct RuleMatcher {
    store: Arc<dyn RuleStore>,
    evaluator: ConditionEvaluator,
}

impl RuleMatcher {
    /// Create a matcher over a rule store
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            evaluator: ConditionEvaluator::new(),
        }
    }

    /// All rules that should fire for this event, in execution order
    pub async fn matching_rules(&self, event: &Event) -> EngineResult<Vec<Rule>> {
        let mut rules = self.store.list_active_by_trigger(event.trigger).await?;

        rules.retain(|rule| self.evaluator.matches(&rule.conditions, event));
        rules.sort_by(|a, b| a.cmp_execution_order(b));

        debug!(
            event_id = %event.id,
            trigger = %event.trigger,
            matched = rules.len(),
            "Matched rules"
        );
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propflow_core::{Context, EventPayload};
    use propflow_rules::{MemoryRuleStore, RuleConfig};
    use serde_json::json;

    fn overdue_rule(id: &str, priority: i32, min_days: i64, active: bool) -> RuleConfig {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Rule {}", id),
            "trigger": "payment_overdue",
            "priority": priority,
            "is_active": active,
            "conditions": [
                {"field": "days_overdue", "operator": "gte", "value": min_days}
            ],
            "actions": []
        }))
        .unwrap()
    }

    fn overdue_event(days: i64) -> Event {
        Event::new(
            EventPayload::PaymentOverdue {
                lease_id: "lease_1".to_string(),
                days_overdue: days,
                amount: 1500.0,
            },
            Context::new(),
        )
    }

    async fn matcher_with(configs: Vec<RuleConfig>) -> RuleMatcher {
        let store = MemoryRuleStore::new();
        store.load(configs).unwrap();
        RuleMatcher::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_priority_descending_order() {
        let matcher = matcher_with(vec![
            overdue_rule("gentle_reminder", 5, 1, true),
            overdue_rule("final_notice", 10, 1, true),
        ])
        .await;

        let rules = matcher.matching_rules(&overdue_event(7)).await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id.as_str(), "final_notice");
        assert_eq!(rules[1].id.as_str(), "gentle_reminder");
    }

    #[tokio::test]
    async fn test_equal_priority_tie_broken_by_id() {
        let matcher = matcher_with(vec![
            overdue_rule("b_rule", 10, 1, true),
            overdue_rule("a_rule", 10, 1, true),
        ])
        .await;

        let rules = matcher.matching_rules(&overdue_event(7)).await.unwrap();
        assert_eq!(rules[0].id.as_str(), "a_rule");
        assert_eq!(rules[1].id.as_str(), "b_rule");
    }

    #[tokio::test]
    async fn test_inactive_rules_never_match() {
        let matcher = matcher_with(vec![overdue_rule("dormant", 10, 1, false)]).await;

        let rules = matcher.matching_rules(&overdue_event(30)).await.unwrap();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn test_conditions_filter_candidates() {
        let matcher = matcher_with(vec![
            overdue_rule("week_late", 5, 7, true),
            overdue_rule("month_late", 10, 30, true),
        ])
        .await;

        let rules = matcher.matching_rules(&overdue_event(10)).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id.as_str(), "week_late");
    }

    #[tokio::test]
    async fn test_other_triggers_not_considered() {
        let matcher = matcher_with(vec![overdue_rule("late", 5, 1, true)]).await;

        let lease_event = Event::new(
            EventPayload::LeaseExpiring {
                lease_id: "lease_1".to_string(),
                property_id: "prop_1".to_string(),
                days_until_expiry: 30,
            },
            Context::new(),
        );

        let rules = matcher.matching_rules(&lease_event).await.unwrap();
        assert!(rules.is_empty());
    }
}
