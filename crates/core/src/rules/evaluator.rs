//! Prioritized rule evaluation.
//!
//! Pure and deterministic: no I/O, no interior mutability, safe to call
//! concurrently against the same rule set. Rules are evaluated in priority
//! order (higher first) and the first matching rule wins; rules are never
//! combined or merged.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::types::{ConditionType, Rule, RuleCondition, RuleMatch};

/// Comparison operator parsed from an expected-value string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Ge,
    Le,
    Ne,
    Eq,
    Gt,
    Lt,
    Contains,
    In,
}

/// Stateless engine for evaluating prioritized rules against a context.
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Evaluates rules against the context; first match by priority wins.
    ///
    /// Inactive rules are skipped. An empty rule set, or a rule referencing
    /// fields absent from the context, simply yields no match.
    #[must_use]
    pub fn evaluate(rules: &[Rule], context: &Value) -> Option<RuleMatch> {
        let mut candidates: Vec<&Rule> = rules.iter().filter(|r| r.is_active).collect();
        // Stable sort: equal priorities keep their configured order.
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

        candidates
            .into_iter()
            .find(|r| Self::condition_matches(&r.condition, context))
            .map(|r| RuleMatch {
                rule_id: r.id,
                action: r.action.clone(),
            })
    }

    /// Evaluates a single condition against the context.
    #[must_use]
    pub fn condition_matches(condition: &RuleCondition, context: &Value) -> bool {
        match condition {
            RuleCondition::Flat(map) => Self::flat_matches(map, context),
            RuleCondition::Compound(compound) => match compound.condition_type {
                // `all`/`any` short-circuit on the first false/true member.
                ConditionType::And => compound
                    .conditions
                    .iter()
                    .all(|m| Self::flat_matches(m, context)),
                ConditionType::Or => compound
                    .conditions
                    .iter()
                    .any(|m| Self::flat_matches(m, context)),
            },
        }
    }

    fn flat_matches(map: &serde_json::Map<String, Value>, context: &Value) -> bool {
        map.iter()
            .all(|(field, expected)| Self::comparison_matches(field, expected, context))
    }

    /// Evaluates one `field -> expected` comparison.
    ///
    /// A missing field path is a non-match, never an error.
    fn comparison_matches(field: &str, expected: &Value, context: &Value) -> bool {
        let Some(actual) = lookup_path(context, field) else {
            return false;
        };

        match expected {
            Value::String(s) => {
                if let Some((op, operand)) = parse_operator(s) {
                    apply_operator(op, operand, actual)
                } else {
                    values_equal(actual, expected)
                }
            }
            // Expected list: membership test.
            Value::Array(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
            _ => values_equal(actual, expected),
        }
    }
}

/// Resolves a dot-path into the context.
///
/// Supports nested maps and list indices, e.g. `items.0.category`.
#[must_use]
pub fn lookup_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Parses a leading operator token from an expected-value string.
fn parse_operator(s: &str) -> Option<(Operator, &str)> {
    let trimmed = s.trim_start();
    for (token, op) in [
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        ("!=", Operator::Ne),
        ("==", Operator::Eq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
    ] {
        if let Some(rest) = trimmed.strip_prefix(token) {
            return Some((op, rest.trim()));
        }
    }
    if let Some(rest) = trimmed.strip_prefix("contains ") {
        return Some((Operator::Contains, rest.trim()));
    }
    if let Some(rest) = trimmed.strip_prefix("in ") {
        return Some((Operator::In, rest.trim()));
    }
    None
}

/// Write-time check that an expected-value string is well-formed.
///
/// Returns the offending string when it begins with an operator token but
/// cannot be applied: empty operand, or a non-numeric operand on an
/// ordering operator.
pub(crate) fn validate_expected(s: &str) -> Result<(), String> {
    let Some((op, operand)) = parse_operator(s) else {
        // Plain equality string; always valid.
        return Ok(());
    };
    if operand.is_empty() {
        return Err(s.to_string());
    }
    if matches!(
        op,
        Operator::Ge | Operator::Le | Operator::Gt | Operator::Lt
    ) && parse_decimal(operand).is_none()
    {
        return Err(s.to_string());
    }
    Ok(())
}

fn apply_operator(op: Operator, operand: &str, actual: &Value) -> bool {
    match op {
        Operator::Ge | Operator::Le | Operator::Gt | Operator::Lt => {
            // Numeric operators fail closed on non-numeric values.
            let (Some(lhs), Some(rhs)) = (as_decimal(actual), parse_decimal(operand)) else {
                return false;
            };
            match op {
                Operator::Ge => lhs >= rhs,
                Operator::Le => lhs <= rhs,
                Operator::Gt => lhs > rhs,
                Operator::Lt => lhs < rhs,
                _ => unreachable!(),
            }
        }
        Operator::Eq | Operator::Ne => {
            let equal = match (as_decimal(actual), parse_decimal(operand)) {
                (Some(lhs), Some(rhs)) => lhs == rhs,
                _ => as_text(actual).is_some_and(|a| a.eq_ignore_ascii_case(operand)),
            };
            (op == Operator::Eq) == equal
        }
        Operator::Contains => match actual {
            Value::String(s) => s.to_lowercase().contains(&operand.to_lowercase()),
            Value::Array(items) => items.iter().any(|item| text_equal(item, operand)),
            _ => false,
        },
        Operator::In => operand
            .split(',')
            .map(str::trim)
            .any(|candidate| text_equal(actual, candidate)),
    }
}

/// Coerces an actual value to text for case-insensitive comparison.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_equal(actual: &Value, candidate: &str) -> bool {
    as_text(actual).is_some_and(|a| a.eq_ignore_ascii_case(candidate))
}

/// Coerces a JSON value to a decimal: numbers directly, strings if they parse.
fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim()).ok()
}

/// Equality with type coercion: numeric first, then case-insensitive text.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    if let (Some(lhs), Some(rhs)) = (as_decimal(actual), as_decimal(expected)) {
        return lhs == rhs;
    }
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::{RuleAction, RuleType};
    use saldo_shared::types::{RuleId, TenantId};
    use serde_json::json;

    fn make_rule(priority: i32, condition: Value, action: Value) -> Rule {
        Rule {
            id: RuleId::new(),
            tenant_id: TenantId::new(),
            rule_type: RuleType::DiscountCalculation,
            name: format!("rule-p{priority}"),
            condition: serde_json::from_value(condition).unwrap(),
            action: action_map(action),
            priority,
            is_active: true,
        }
    }

    fn action_map(value: Value) -> RuleAction {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_empty_rule_set_no_match() {
        assert!(RuleEvaluator::evaluate(&[], &json!({"quantity": 5})).is_none());
    }

    #[test]
    fn test_quantity_threshold_matches() {
        let rules = vec![make_rule(
            8,
            json!({"quantity": ">= 10"}),
            json!({"discount_rate": 0.05}),
        )];

        let matched = RuleEvaluator::evaluate(&rules, &json!({"quantity": 15})).unwrap();
        assert_eq!(matched.action.get("discount_rate"), Some(&json!(0.05)));

        assert!(RuleEvaluator::evaluate(&rules, &json!({"quantity": 5})).is_none());
    }

    #[test]
    fn test_higher_priority_wins() {
        let low = make_rule(5, json!({"quantity": "> 0"}), json!({"rate": "low"}));
        let high = make_rule(10, json!({"quantity": "> 0"}), json!({"rate": "high"}));
        let high_id = high.id;

        // Insertion order must not matter.
        let matched = RuleEvaluator::evaluate(&[low, high], &json!({"quantity": 3})).unwrap();
        assert_eq!(matched.rule_id, high_id);
        assert_eq!(matched.action.get("rate"), Some(&json!("high")));
    }

    #[test]
    fn test_inactive_rule_skipped() {
        let mut rule = make_rule(10, json!({"quantity": "> 0"}), json!({"rate": 1}));
        rule.is_active = false;
        assert!(RuleEvaluator::evaluate(&[rule], &json!({"quantity": 3})).is_none());
    }

    #[test]
    fn test_missing_field_is_not_an_error() {
        let rules = vec![make_rule(1, json!({"absent.field": 1}), json!({"x": 1}))];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"quantity": 3})).is_none());
    }

    #[test]
    fn test_dot_path_nested_and_list_index() {
        let ctx = json!({"items": [{"category": "Electronics"}, {"category": "food"}]});
        assert_eq!(
            lookup_path(&ctx, "items.1.category"),
            Some(&json!("food"))
        );
        assert!(lookup_path(&ctx, "items.5.category").is_none());
        assert!(lookup_path(&ctx, "items.x.category").is_none());

        let rules = vec![make_rule(
            1,
            json!({"items.0.category": "electronics"}),
            json!({"account": "4100"}),
        )];
        assert!(RuleEvaluator::evaluate(&rules, &ctx).is_some());
    }

    #[test]
    fn test_numeric_coercion_on_string_actual() {
        let rules = vec![make_rule(1, json!({"quantity": ">= 10"}), json!({"x": 1}))];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"quantity": "15"})).is_some());
    }

    #[test]
    fn test_numeric_operator_fails_closed() {
        let rules = vec![make_rule(1, json!({"quantity": ">= 10"}), json!({"x": 1}))];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"quantity": "plenty"})).is_none());
        assert!(RuleEvaluator::evaluate(&rules, &json!({"quantity": true})).is_none());
    }

    #[test]
    fn test_case_insensitive_string_equality() {
        let rules = vec![make_rule(
            1,
            json!({"payment_method": "CASH"}),
            json!({"x": 1}),
        )];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"payment_method": "cash"})).is_some());
    }

    #[test]
    fn test_numeric_equality_with_type_coercion() {
        let rules = vec![make_rule(1, json!({"amount": 100}), json!({"x": 1}))];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"amount": "100"})).is_some());
        assert!(RuleEvaluator::evaluate(&rules, &json!({"amount": 100.0})).is_some());
        assert!(RuleEvaluator::evaluate(&rules, &json!({"amount": 101})).is_none());
    }

    #[test]
    fn test_expected_list_membership() {
        let rules = vec![make_rule(
            1,
            json!({"payment_method": ["cash", "bank_transfer"]}),
            json!({"x": 1}),
        )];
        assert!(
            RuleEvaluator::evaluate(&rules, &json!({"payment_method": "bank_transfer"})).is_some()
        );
        assert!(RuleEvaluator::evaluate(&rules, &json!({"payment_method": "credit"})).is_none());
    }

    #[test]
    fn test_not_equal_operator() {
        let rules = vec![make_rule(
            1,
            json!({"payment_method": "!= cash"}),
            json!({"x": 1}),
        )];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"payment_method": "credit"})).is_some());
        assert!(RuleEvaluator::evaluate(&rules, &json!({"payment_method": "Cash"})).is_none());
    }

    #[test]
    fn test_contains_operator() {
        let rules = vec![make_rule(
            1,
            json!({"description": "contains rent"}),
            json!({"x": 1}),
        )];
        assert!(
            RuleEvaluator::evaluate(&rules, &json!({"description": "Office RENT June"})).is_some()
        );
        assert!(RuleEvaluator::evaluate(&rules, &json!({"description": "utilities"})).is_none());

        // contains over a list actual
        let rules = vec![make_rule(1, json!({"tags": "contains vip"}), json!({"x": 1}))];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"tags": ["new", "VIP"]})).is_some());
    }

    #[test]
    fn test_in_operator() {
        let rules = vec![make_rule(
            1,
            json!({"payment_method": "in cash,bank_transfer"}),
            json!({"x": 1}),
        )];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"payment_method": "cash"})).is_some());
        assert!(RuleEvaluator::evaluate(&rules, &json!({"payment_method": "credit"})).is_none());
    }

    #[test]
    fn test_flat_map_is_implicit_and() {
        let rules = vec![make_rule(
            1,
            json!({"quantity": ">= 10", "payment_method": "cash"}),
            json!({"x": 1}),
        )];
        assert!(
            RuleEvaluator::evaluate(&rules, &json!({"quantity": 12, "payment_method": "cash"}))
                .is_some()
        );
        assert!(
            RuleEvaluator::evaluate(&rules, &json!({"quantity": 12, "payment_method": "credit"}))
                .is_none()
        );
    }

    #[test]
    fn test_compound_or() {
        let rules = vec![make_rule(
            1,
            json!({
                "condition_type": "OR",
                "conditions": [{"quantity": ">= 100"}, {"product_category": "wholesale"}]
            }),
            json!({"discount_rate": 0.1}),
        )];
        assert!(RuleEvaluator::evaluate(&rules, &json!({"quantity": 150})).is_some());
        assert!(
            RuleEvaluator::evaluate(&rules, &json!({"product_category": "wholesale"})).is_some()
        );
        assert!(
            RuleEvaluator::evaluate(&rules, &json!({"quantity": 1, "product_category": "retail"}))
                .is_none()
        );
    }

    #[test]
    fn test_compound_and() {
        let rules = vec![make_rule(
            1,
            json!({
                "condition_type": "AND",
                "conditions": [{"quantity": ">= 10"}, {"payment_method": "cash"}]
            }),
            json!({"x": 1}),
        )];
        assert!(
            RuleEvaluator::evaluate(&rules, &json!({"quantity": 12, "payment_method": "cash"}))
                .is_some()
        );
        assert!(
            RuleEvaluator::evaluate(&rules, &json!({"quantity": 12, "payment_method": "credit"}))
                .is_none()
        );
    }

    #[rstest::rstest]
    #[case("cash", true)]
    #[case(">= 10", true)]
    #[case("<= 99.5", true)]
    #[case("!= cash", true)]
    #[case("in a,b", true)]
    #[case("contains rent", true)]
    #[case(">= ", false)]
    #[case("> lots", false)]
    #[case("< ", false)]
    #[case("contains ", false)]
    #[case("in ", false)]
    fn test_validate_expected(#[case] expected: &str, #[case] valid: bool) {
        assert_eq!(validate_expected(expected).is_ok(), valid);
    }
}
