//! Condition evaluation logic
//!
//! Pure match/no-match decisions over an event payload. Evaluation never
//! errors: a condition referencing a field the event does not carry, or a
//! numeric comparison against something that will not coerce, evaluates
//! false with a diagnostic logged, so one malformed rule cannot abort
//! evaluation of others.

use propflow_core::Event;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::condition::{Condition, ConditionOperator};

/// Condition evaluator
///
/// Stateless and side-effect-free so it can be unit-tested independently
/// of the event bus and stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Create a new condition evaluator
    pub fn new() -> Self {
        Self
    }

    /// Evaluate all conditions against an event (logical AND)
    ///
    /// An empty condition set always matches.
    pub fn matches(&self, conditions: &[Condition], event: &Event) -> bool {
        let fields = event.payload.fields();
        conditions.iter().all(|c| self.matches_one(c, &fields))
    }

    fn matches_one(&self, condition: &Condition, fields: &Map<String, Value>) -> bool {
        let Some(actual) = fields.get(&condition.field) else {
            warn!(
                field = %condition.field,
                "Condition references a field absent from the event payload"
            );
            return false;
        };

        let result = match condition.operator {
            ConditionOperator::Equals => json_eq(actual, &condition.value),

            ConditionOperator::In => match condition.value.as_array() {
                Some(values) => values.iter().any(|v| json_eq(actual, v)),
                None => {
                    warn!(
                        field = %condition.field,
                        "'in' condition value is not an array"
                    );
                    false
                }
            },

            ConditionOperator::Gte => match (as_number(actual), as_number(&condition.value)) {
                (Some(actual), Some(threshold)) => actual >= threshold,
                _ => {
                    warn_not_numeric(&condition.field, actual, &condition.value);
                    false
                }
            },

            ConditionOperator::Lte => match (as_number(actual), as_number(&condition.value)) {
                (Some(actual), Some(threshold)) => actual <= threshold,
                _ => {
                    warn_not_numeric(&condition.field, actual, &condition.value);
                    false
                }
            },

            ConditionOperator::Between => match between_bounds(&condition.value) {
                Some((low, high)) => match as_number(actual) {
                    Some(actual) => actual >= low && actual <= high,
                    None => {
                        warn_not_numeric(&condition.field, actual, &condition.value);
                        false
                    }
                },
                None => {
                    warn!(
                        field = %condition.field,
                        "'between' condition value is not a numeric [low, high] pair"
                    );
                    false
                }
            },
        };

        trace!(
            field = %condition.field,
            operator = ?condition.operator,
            result,
            "Condition check"
        );

        result
    }
}

/// Compare two JSON values, treating numbers as numbers
///
/// `450` and `450.0` compare equal; strings and booleans compare exactly.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Coerce a JSON value to a number
///
/// Accepts numbers and numeric strings (the rule builder stores form
/// input as strings).
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn between_bounds(value: &Value) -> Option<(f64, f64)> {
    let arr = value.as_array()?;
    if arr.len() != 2 {
        return None;
    }
    Some((as_number(&arr[0])?, as_number(&arr[1])?))
}

fn warn_not_numeric(field: &str, actual: &Value, expected: &Value) {
    warn!(
        field,
        actual = %actual,
        expected = %expected,
        "Numeric condition could not coerce operands"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionOperator as Op;
    use propflow_core::{Context, EventPayload, IssueCategory, Severity};
    use serde_json::json;

    fn maintenance_event(category: IssueCategory, severity: Severity, cost: f64) -> Event {
        Event::new(
            EventPayload::MaintenanceRequestCreated {
                request_id: "req_1".to_string(),
                property_id: "prop_1".to_string(),
                category,
                severity,
                estimated_cost: cost,
            },
            Context::new(),
        )
    }

    #[test]
    fn test_empty_conditions_always_match() {
        let evaluator = ConditionEvaluator::new();
        let event = maintenance_event(IssueCategory::Other, Severity::Low, 10.0);
        assert!(evaluator.matches(&[], &event));
    }

    #[test]
    fn test_equals_on_enum_field() {
        let evaluator = ConditionEvaluator::new();
        let event = maintenance_event(IssueCategory::Plumbing, Severity::High, 450.0);

        let matching = Condition::new("category", Op::Equals, json!("plumbing"));
        let other = Condition::new("category", Op::Equals, json!("electrical"));

        assert!(evaluator.matches(&[matching], &event));
        assert!(!evaluator.matches(&[other], &event));
    }

    #[test]
    fn test_in_membership() {
        let evaluator = ConditionEvaluator::new();
        let event = maintenance_event(IssueCategory::Plumbing, Severity::High, 450.0);

        let condition = Condition::new("severity", Op::In, json!(["high", "urgent"]));
        assert!(evaluator.matches(&[condition], &event));

        let condition = Condition::new("severity", Op::In, json!(["low", "medium"]));
        assert!(!evaluator.matches(&[condition], &event));
    }

    #[test]
    fn test_numeric_thresholds() {
        let evaluator = ConditionEvaluator::new();
        let event = maintenance_event(IssueCategory::Hvac, Severity::Medium, 450.0);

        assert!(evaluator.matches(
            &[Condition::new("estimated_cost", Op::Gte, json!(400))],
            &event
        ));
        assert!(!evaluator.matches(
            &[Condition::new("estimated_cost", Op::Gte, json!(500))],
            &event
        ));
        assert!(evaluator.matches(
            &[Condition::new("estimated_cost", Op::Lte, json!(450))],
            &event
        ));
    }

    #[test]
    fn test_numeric_threshold_coerces_string_value() {
        let evaluator = ConditionEvaluator::new();
        let event = maintenance_event(IssueCategory::Hvac, Severity::Medium, 450.0);

        // Rule builder form input arrives as a string
        let condition = Condition::new("estimated_cost", Op::Gte, json!("400"));
        assert!(evaluator.matches(&[condition], &event));
    }

    #[test]
    fn test_between_inclusive() {
        let evaluator = ConditionEvaluator::new();
        let event = Event::new(
            EventPayload::PaymentOverdue {
                lease_id: "lease_1".to_string(),
                days_overdue: 14,
                amount: 1200.0,
            },
            Context::new(),
        );

        assert!(evaluator.matches(
            &[Condition::new("days_overdue", Op::Between, json!([7, 14]))],
            &event
        ));
        assert!(!evaluator.matches(
            &[Condition::new("days_overdue", Op::Between, json!([15, 30]))],
            &event
        ));
    }

    #[test]
    fn test_unknown_field_is_no_match() {
        let evaluator = ConditionEvaluator::new();
        let event = maintenance_event(IssueCategory::Plumbing, Severity::High, 450.0);

        // `days_overdue` belongs to payment events, not maintenance events
        let condition = Condition::new("days_overdue", Op::Gte, json!(7));
        assert!(!evaluator.matches(&[condition], &event));
    }

    #[test]
    fn test_failed_coercion_is_no_match() {
        let evaluator = ConditionEvaluator::new();
        let event = maintenance_event(IssueCategory::Plumbing, Severity::High, 450.0);

        // `category` is not numeric
        let condition = Condition::new("category", Op::Gte, json!(5));
        assert!(!evaluator.matches(&[condition], &event));
    }

    #[test]
    fn test_all_conditions_are_anded() {
        let evaluator = ConditionEvaluator::new();
        let event = maintenance_event(IssueCategory::Plumbing, Severity::High, 450.0);

        let conditions = vec![
            Condition::new("category", Op::Equals, json!("plumbing")),
            Condition::new("severity", Op::In, json!(["high", "urgent"])),
        ];
        assert!(evaluator.matches(&conditions, &event));

        let conditions = vec![
            Condition::new("category", Op::Equals, json!("plumbing")),
            Condition::new("severity", Op::In, json!(["low"])),
        ];
        assert!(!evaluator.matches(&conditions, &event));
    }
}
