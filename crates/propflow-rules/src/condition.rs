//! Condition types
//!
//! Conditions are predicates over event payload fields. All conditions on
//! a rule must hold (logical AND) for the rule to match; an empty
//! condition set always matches.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Condition errors
#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("Invalid condition configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for condition operations
pub type ConditionResult<T> = Result<T, ConditionError>;

/// Comparison operator for a condition
///
/// The operator set is closed; rule configurations naming anything else
/// fail deserialization instead of surprising the evaluator at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Field equals the value
    Equals,

    /// Field is one of the values in a list
    In,

    /// Field is numerically greater than or equal to the value
    Gte,

    /// Field is numerically less than or equal to the value
    Lte,

    /// Field is numerically within an inclusive [low, high] pair
    Between,
}

/// A single predicate over an event payload field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Payload field name to test
    pub field: String,

    /// Comparison operator
    pub operator: ConditionOperator,

    /// Comparison value: a scalar for equals/gte/lte, an array for
    /// in/between
    pub value: Value,
}

impl Condition {
    /// Create a condition
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Check the value shape against the operator
    ///
    /// The evaluator treats malformed conditions as no-match; this check
    /// lets the configuration surface flag them up front.
    pub fn validate(&self) -> ConditionResult<()> {
        match self.operator {
            ConditionOperator::In => {
                if !self.value.is_array() {
                    return Err(ConditionError::InvalidConfig(format!(
                        "'in' condition on field '{}' requires an array value",
                        self.field
                    )));
                }
            }
            ConditionOperator::Between => {
                let ok = self
                    .value
                    .as_array()
                    .map(|arr| arr.len() == 2)
                    .unwrap_or(false);
                if !ok {
                    return Err(ConditionError::InvalidConfig(format!(
                        "'between' condition on field '{}' requires a [low, high] pair",
                        self.field
                    )));
                }
            }
            ConditionOperator::Equals | ConditionOperator::Gte | ConditionOperator::Lte => {}
        }
        Ok(())
    }
}
