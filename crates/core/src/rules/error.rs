//! Rule validation error types.

use thiserror::Error;

/// Errors raised when validating rule definitions at write time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// Rule identifier is missing or not a valid UUID.
    #[error("Rule is missing a valid rule_id")]
    MissingRuleId,

    /// Rule has no condition, or the condition is empty.
    #[error("Rule has no condition")]
    MissingCondition,

    /// Rule has no action payload.
    #[error("Rule has no action")]
    MissingAction,

    /// Unknown rule type string.
    #[error("Unknown rule type: {0}")]
    UnknownRuleType(String),

    /// Condition JSON does not match either supported shape.
    #[error("Condition is neither a flat map nor a compound form: {0}")]
    InvalidConditionShape(String),

    /// Action JSON is not a key-value object.
    #[error("Action is not a key-value object")]
    InvalidActionShape,

    /// An expected value starts with an operator token that cannot be parsed.
    #[error("Unparseable condition operator for field '{field}': '{token}'")]
    UnparseableOperator {
        /// The condition field whose expected value is malformed.
        field: String,
        /// The malformed expected value.
        token: String,
    },
}

impl RuleError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingRuleId => "MISSING_RULE_ID",
            Self::MissingCondition => "MISSING_CONDITION",
            Self::MissingAction => "MISSING_ACTION",
            Self::UnknownRuleType(_) => "UNKNOWN_RULE_TYPE",
            Self::InvalidConditionShape(_) => "INVALID_CONDITION_SHAPE",
            Self::InvalidActionShape => "INVALID_ACTION_SHAPE",
            Self::UnparseableOperator { .. } => "UNPARSEABLE_OPERATOR",
        }
    }
}
