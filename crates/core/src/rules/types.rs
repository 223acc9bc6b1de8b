//! Rule domain types.
//!
//! A rule pairs a declarative condition with an opaque action payload.
//! Conditions come in two shapes: a flat field map (implicit AND) or a
//! compound `{condition_type, conditions}` form combining several flat maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use saldo_shared::types::{RuleId, TenantId};

use super::error::RuleError;

/// Rule category, determining which lookups consult the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Maps products/events to chart-of-accounts codes.
    ProductMapping,
    /// Derives a tax rate for an event.
    TaxCalculation,
    /// Derives a discount rate for an event.
    DiscountCalculation,
    /// Flags low-stock conditions (consumed by alerting, not posting).
    InventoryAlert,
}

impl RuleType {
    /// Parse a rule type from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "product_mapping" => Some(Self::ProductMapping),
            "tax_calculation" => Some(Self::TaxCalculation),
            "discount_calculation" => Some(Self::DiscountCalculation),
            "inventory_alert" => Some(Self::InventoryAlert),
            _ => None,
        }
    }

    /// Returns the wire representation of the rule type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProductMapping => "product_mapping",
            Self::TaxCalculation => "tax_calculation",
            Self::DiscountCalculation => "discount_calculation",
            Self::InventoryAlert => "inventory_alert",
        }
    }
}

/// Logical combinator for compound conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionType {
    /// All member conditions must match.
    And,
    /// At least one member condition must match.
    Or,
}

/// A compound condition combining several flat maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundCondition {
    /// How the member conditions combine.
    pub condition_type: ConditionType,
    /// Member conditions; each is a flat field map (implicit AND).
    pub conditions: Vec<serde_json::Map<String, Value>>,
}

/// A rule condition: flat field map or compound form.
///
/// `Compound` is tried first during deserialization; a map without the
/// `condition_type`/`conditions` keys falls through to `Flat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleCondition {
    /// Compound `{condition_type, conditions}` form.
    Compound(CompoundCondition),
    /// Flat `field -> expected` map, combined with implicit AND.
    Flat(serde_json::Map<String, Value>),
}

impl RuleCondition {
    /// Returns true if the condition has no comparisons at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat(map) => map.is_empty(),
            Self::Compound(c) => c.conditions.iter().all(serde_json::Map::is_empty),
        }
    }

    /// Iterates every `field -> expected` comparison in the condition.
    pub(crate) fn comparisons(&self) -> impl Iterator<Item = (&String, &Value)> {
        let maps: Vec<&serde_json::Map<String, Value>> = match self {
            Self::Flat(map) => vec![map],
            Self::Compound(c) => c.conditions.iter().collect(),
        };
        maps.into_iter().flat_map(serde_json::Map::iter)
    }
}

/// Opaque key-value action payload, interpreted by the caller.
pub type RuleAction = serde_json::Map<String, Value>;

/// A tenant-configured condition/action rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier for the rule.
    pub id: RuleId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Rule category.
    pub rule_type: RuleType,
    /// Human-readable name.
    pub name: String,
    /// Declarative match condition.
    pub condition: RuleCondition,
    /// Action payload returned on match.
    pub action: RuleAction,
    /// Evaluation priority; higher is evaluated first.
    pub priority: i32,
    /// Inactive rules are skipped by the evaluator.
    pub is_active: bool,
}

impl Rule {
    /// Parses and validates a raw rule definition at the write boundary.
    ///
    /// # Errors
    ///
    /// Returns `RuleError` naming the specific problem: missing or invalid
    /// `rule_id`, unknown `rule_type`, missing or malformed
    /// `condition`/`action`, or an unparseable operator token.
    pub fn parse(tenant_id: TenantId, definition: &Value) -> Result<Self, RuleError> {
        let object = definition
            .as_object()
            .ok_or_else(|| RuleError::InvalidConditionShape("definition is not an object".into()))?;

        let id = object
            .get("rule_id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<RuleId>().ok())
            .ok_or(RuleError::MissingRuleId)?;

        let rule_type_raw = object
            .get("rule_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let rule_type = RuleType::parse(rule_type_raw)
            .ok_or_else(|| RuleError::UnknownRuleType(rule_type_raw.to_string()))?;

        let condition_value = object.get("condition").ok_or(RuleError::MissingCondition)?;
        let condition: RuleCondition = serde_json::from_value(condition_value.clone())
            .map_err(|err| RuleError::InvalidConditionShape(err.to_string()))?;

        let action = match object.get("action") {
            None => return Err(RuleError::MissingAction),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(RuleError::InvalidActionShape),
        };

        let rule = Self {
            id,
            tenant_id,
            rule_type,
            name: object
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unnamed rule")
                .to_string(),
            condition,
            action,
            priority: object
                .get("priority")
                .and_then(Value::as_i64)
                .and_then(|p| i32::try_from(p).ok())
                .unwrap_or(0),
            is_active: object
                .get("is_active")
                .and_then(Value::as_bool)
                .unwrap_or(true),
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Validates a rule definition at write time.
    ///
    /// Malformed definitions are rejected with the specific problem rather
    /// than silently accepted and skipped at evaluation time.
    ///
    /// # Errors
    ///
    /// Returns `RuleError` naming the first problem found: an empty or
    /// missing condition, an empty action, or an unparseable operator token
    /// in one of the expected values.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.condition.is_empty() {
            return Err(RuleError::MissingCondition);
        }
        if self.action.is_empty() {
            return Err(RuleError::MissingAction);
        }
        for (field, expected) in self.condition.comparisons() {
            if let Value::String(s) = expected
                && let Err(token) = super::evaluator::validate_expected(s)
            {
                return Err(RuleError::UnparseableOperator {
                    field: field.clone(),
                    token,
                });
            }
        }
        Ok(())
    }
}

/// Result of a successful rule evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// The matching rule.
    pub rule_id: RuleId,
    /// The matching rule's action payload.
    pub action: RuleAction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat(value: Value) -> RuleCondition {
        match value {
            Value::Object(map) => RuleCondition::Flat(map),
            _ => panic!("expected object"),
        }
    }

    fn make_rule(condition: RuleCondition, action: Value) -> Rule {
        Rule {
            id: RuleId::new(),
            tenant_id: TenantId::new(),
            rule_type: RuleType::ProductMapping,
            name: "test".to_string(),
            condition,
            action: match action {
                Value::Object(map) => map,
                _ => panic!("expected object"),
            },
            priority: 1,
            is_active: true,
        }
    }

    #[test]
    fn test_rule_type_roundtrip() {
        for rt in [
            RuleType::ProductMapping,
            RuleType::TaxCalculation,
            RuleType::DiscountCalculation,
            RuleType::InventoryAlert,
        ] {
            assert_eq!(RuleType::parse(rt.as_str()), Some(rt));
        }
        assert_eq!(RuleType::parse("unknown"), None);
    }

    #[test]
    fn test_condition_deserialize_flat() {
        let cond: RuleCondition =
            serde_json::from_value(json!({"payment_method": "cash"})).unwrap();
        assert!(matches!(cond, RuleCondition::Flat(_)));
    }

    #[test]
    fn test_condition_deserialize_compound() {
        let cond: RuleCondition = serde_json::from_value(json!({
            "condition_type": "OR",
            "conditions": [{"quantity": ">= 10"}, {"product_category": "wholesale"}]
        }))
        .unwrap();
        match cond {
            RuleCondition::Compound(c) => {
                assert_eq!(c.condition_type, ConditionType::Or);
                assert_eq!(c.conditions.len(), 2);
            }
            RuleCondition::Flat(_) => panic!("expected compound"),
        }
    }

    #[test]
    fn test_validate_ok() {
        let rule = make_rule(
            flat(json!({"quantity": ">= 10"})),
            json!({"discount_rate": 0.05}),
        );
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_condition() {
        let rule = make_rule(flat(json!({})), json!({"discount_rate": 0.05}));
        assert!(matches!(rule.validate(), Err(RuleError::MissingCondition)));
    }

    #[test]
    fn test_validate_empty_action() {
        let rule = make_rule(flat(json!({"quantity": ">= 10"})), json!({}));
        assert!(matches!(rule.validate(), Err(RuleError::MissingAction)));
    }

    #[test]
    fn test_validate_bad_operator() {
        let rule = make_rule(
            flat(json!({"quantity": ">= "})),
            json!({"discount_rate": 0.05}),
        );
        assert!(matches!(
            rule.validate(),
            Err(RuleError::UnparseableOperator { ref field, .. }) if field == "quantity"
        ));
    }

    #[test]
    fn test_parse_valid_definition() {
        let definition = json!({
            "rule_id": "00000000-0000-0000-0000-0000000000a1",
            "rule_type": "discount_calculation",
            "name": "Bulk discount",
            "condition": {"quantity": ">= 10"},
            "action": {"discount_rate": 0.05},
            "priority": 8
        });
        let rule = Rule::parse(TenantId::new(), &definition).unwrap();
        assert_eq!(rule.rule_type, RuleType::DiscountCalculation);
        assert_eq!(rule.priority, 8);
        assert!(rule.is_active);
    }

    #[test]
    fn test_parse_missing_rule_id() {
        let definition = json!({
            "rule_type": "tax_calculation",
            "condition": {"x": 1},
            "action": {"tax_rate": 0.11}
        });
        assert_eq!(
            Rule::parse(TenantId::new(), &definition),
            Err(RuleError::MissingRuleId)
        );
    }

    #[test]
    fn test_parse_unknown_rule_type() {
        let definition = json!({
            "rule_id": "00000000-0000-0000-0000-0000000000a1",
            "rule_type": "price_override",
            "condition": {"x": 1},
            "action": {"y": 2}
        });
        assert_eq!(
            Rule::parse(TenantId::new(), &definition),
            Err(RuleError::UnknownRuleType("price_override".to_string()))
        );
    }

    #[test]
    fn test_parse_missing_condition_and_action() {
        let no_condition = json!({
            "rule_id": "00000000-0000-0000-0000-0000000000a1",
            "rule_type": "tax_calculation",
            "action": {"tax_rate": 0.11}
        });
        assert_eq!(
            Rule::parse(TenantId::new(), &no_condition),
            Err(RuleError::MissingCondition)
        );

        let no_action = json!({
            "rule_id": "00000000-0000-0000-0000-0000000000a1",
            "rule_type": "tax_calculation",
            "condition": {"x": 1}
        });
        assert_eq!(
            Rule::parse(TenantId::new(), &no_action),
            Err(RuleError::MissingAction)
        );
    }

    #[test]
    fn test_parse_non_object_action() {
        let definition = json!({
            "rule_id": "00000000-0000-0000-0000-0000000000a1",
            "rule_type": "tax_calculation",
            "condition": {"x": 1},
            "action": "flat"
        });
        assert_eq!(
            Rule::parse(TenantId::new(), &definition),
            Err(RuleError::InvalidActionShape)
        );
    }

    #[test]
    fn test_parse_rejects_bad_operator() {
        let definition = json!({
            "rule_id": "00000000-0000-0000-0000-0000000000a1",
            "rule_type": "discount_calculation",
            "condition": {"quantity": ">= "},
            "action": {"discount_rate": 0.05}
        });
        assert!(matches!(
            Rule::parse(TenantId::new(), &definition),
            Err(RuleError::UnparseableOperator { .. })
        ));
    }
}
