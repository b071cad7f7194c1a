//! Parsing of loose catalog JSON into typed validation rules and
//! conditional logic.
//!
//! The platform stores `validation_rules` and `conditional_logic` as free
//! JSON blobs. We parse them into a closed set of variants once at
//! catalog-load time; anything malformed is dropped with a warning so a bad
//! catalog entry can never crash a render.

use log::warn;
use regex::Regex;
use serde_json::Value;

/// Declared constraints for a single question.
///
/// Every field is optional; a missing field means the check does not apply.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_files: Option<usize>,
    pub max_files: Option<usize>,
    pub pattern: Option<Regex>,
    pub validation_message: Option<String>,
}

impl ValidationRules {
    /// Parse a raw `validation_rules` blob. Returns `None` when the blob is
    /// not an object; individual malformed fields are skipped.
    pub fn parse(raw: &Value, question_id: &str) -> Option<Self> {
        let obj = match raw.as_object() {
            Some(obj) => obj,
            None => {
                if !raw.is_null() {
                    warn!(
                        "question {}: validation_rules is not an object, ignoring",
                        question_id
                    );
                }
                return None;
            }
        };

        let mut rules = ValidationRules {
            min_length: count_field(obj, "minLength", question_id),
            max_length: count_field(obj, "maxLength", question_id),
            min: number_field(obj, "min", question_id),
            max: number_field(obj, "max", question_id),
            min_files: count_field(obj, "minFiles", question_id),
            max_files: count_field(obj, "maxFiles", question_id),
            pattern: None,
            validation_message: obj
                .get("validationMessage")
                .or_else(|| obj.get("validation_message"))
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        if let Some(pattern) = obj.get("pattern") {
            match pattern.as_str() {
                Some(source) => match Regex::new(source) {
                    Ok(regex) => rules.pattern = Some(regex),
                    Err(e) => warn!(
                        "question {}: invalid pattern {:?}, ignoring: {}",
                        question_id, source, e
                    ),
                },
                None => warn!("question {}: pattern is not a string, ignoring", question_id),
            }
        }

        Some(rules)
    }
}

fn count_field(obj: &serde_json::Map<String, Value>, key: &str, question_id: &str) -> Option<usize> {
    let value = obj.get(key)?;
    match value.as_u64() {
        Some(n) => Some(n as usize),
        None => {
            warn!(
                "question {}: {} is not a non-negative integer, ignoring",
                question_id, key
            );
            None
        }
    }
}

fn number_field(obj: &serde_json::Map<String, Value>, key: &str, question_id: &str) -> Option<f64> {
    let value = obj.get(key)?;
    match value.as_f64() {
        Some(n) if n.is_finite() => Some(n),
        _ => {
            warn!("question {}: {} is not a finite number, ignoring", question_id, key);
            None
        }
    }
}

/// How the conditions of a list are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicOperator {
    #[default]
    And,
    Or,
}

/// Comparison applied to another question's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
    /// Operator string the engine does not know. Always evaluates false.
    Unsupported,
}

impl ConditionOperator {
    fn parse(raw: &str, question_id: &str) -> Self {
        match raw {
            "equals" => ConditionOperator::Equals,
            "not_equals" => ConditionOperator::NotEquals,
            "contains" => ConditionOperator::Contains,
            "greater_than" => ConditionOperator::GreaterThan,
            "less_than" => ConditionOperator::LessThan,
            "is_empty" => ConditionOperator::IsEmpty,
            "is_not_empty" => ConditionOperator::IsNotEmpty,
            other => {
                warn!(
                    "question {}: unknown condition operator {:?}, will evaluate false",
                    question_id, other
                );
                ConditionOperator::Unsupported
            }
        }
    }
}

/// One comparison against another question's answer.
#[derive(Debug, Clone)]
pub struct Condition {
    pub question_id: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

/// Show/hide rules for a question. Both lists share one combining operator.
#[derive(Debug, Clone, Default)]
pub struct ConditionalLogic {
    pub operator: LogicOperator,
    pub show_if: Vec<Condition>,
    pub hide_if: Vec<Condition>,
}

impl ConditionalLogic {
    /// Parse a raw `conditional_logic` blob. Returns `None` when the blob
    /// carries no usable conditions.
    pub fn parse(raw: &Value, question_id: &str) -> Option<Self> {
        let obj = match raw.as_object() {
            Some(obj) => obj,
            None => {
                if !raw.is_null() {
                    warn!(
                        "question {}: conditional_logic is not an object, ignoring",
                        question_id
                    );
                }
                return None;
            }
        };

        let operator = match obj.get("operator").and_then(Value::as_str) {
            Some("OR") | Some("or") => LogicOperator::Or,
            Some("AND") | Some("and") | None => LogicOperator::And,
            Some(other) => {
                warn!(
                    "question {}: unknown logic operator {:?}, defaulting to AND",
                    question_id, other
                );
                LogicOperator::And
            }
        };

        let show_if = parse_condition_list(obj.get("show_if"), question_id);
        let hide_if = parse_condition_list(obj.get("hide_if"), question_id);

        if show_if.is_empty() && hide_if.is_empty() {
            return None;
        }

        Some(ConditionalLogic {
            operator,
            show_if,
            hide_if,
        })
    }
}

fn parse_condition_list(raw: Option<&Value>, question_id: &str) -> Vec<Condition> {
    let items = match raw {
        Some(Value::Array(items)) => items,
        Some(other) if !other.is_null() => {
            warn!(
                "question {}: condition list is not an array, ignoring",
                question_id
            );
            return Vec::new();
        }
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| parse_condition(item, question_id))
        .collect()
}

fn parse_condition(raw: &Value, question_id: &str) -> Option<Condition> {
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => {
            warn!("question {}: condition is not an object, skipping", question_id);
            return None;
        }
    };

    let target = match obj.get("question_id").and_then(Value::as_str) {
        Some(target) if !target.is_empty() => target.to_string(),
        _ => {
            warn!(
                "question {}: condition missing question_id, skipping",
                question_id
            );
            return None;
        }
    };

    let operator = match obj.get("operator").and_then(Value::as_str) {
        Some(op) => ConditionOperator::parse(op, question_id),
        None => {
            warn!(
                "question {}: condition missing operator, skipping",
                question_id
            );
            return None;
        }
    };

    Some(Condition {
        question_id: target,
        operator,
        value: obj.get("value").cloned().unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rules() {
        let raw = json!({
            "minLength": 2,
            "maxLength": 50,
            "pattern": "^[A-Z]",
            "validationMessage": "Must start with a capital letter"
        });

        let rules = ValidationRules::parse(&raw, "q1").unwrap();
        assert_eq!(rules.min_length, Some(2));
        assert_eq!(rules.max_length, Some(50));
        assert!(rules.pattern.is_some());
        assert_eq!(
            rules.validation_message.as_deref(),
            Some("Must start with a capital letter")
        );
    }

    #[test]
    fn test_malformed_bounds_are_skipped() {
        let raw = json!({"minLength": "two", "min": "low", "maxFiles": 3});
        let rules = ValidationRules::parse(&raw, "q1").unwrap();
        assert_eq!(rules.min_length, None);
        assert_eq!(rules.min, None);
        assert_eq!(rules.max_files, Some(3));
    }

    #[test]
    fn test_invalid_pattern_is_dropped_not_fatal() {
        let raw = json!({"pattern": "(unclosed"});
        let rules = ValidationRules::parse(&raw, "q1").unwrap();
        assert!(rules.pattern.is_none());
    }

    #[test]
    fn test_parse_conditional_logic() {
        let raw = json!({
            "operator": "OR",
            "show_if": [
                {"question_id": "a", "operator": "equals", "value": "yes"},
                {"question_id": "b", "operator": "is_not_empty"}
            ]
        });

        let logic = ConditionalLogic::parse(&raw, "q2").unwrap();
        assert_eq!(logic.operator, LogicOperator::Or);
        assert_eq!(logic.show_if.len(), 2);
        assert!(logic.hide_if.is_empty());
        assert_eq!(logic.show_if[0].operator, ConditionOperator::Equals);
        assert_eq!(logic.show_if[1].operator, ConditionOperator::IsNotEmpty);
    }

    #[test]
    fn test_unknown_operator_parses_as_unsupported() {
        let raw = json!({
            "show_if": [{"question_id": "a", "operator": "matches_regex", "value": "x"}]
        });

        let logic = ConditionalLogic::parse(&raw, "q2").unwrap();
        assert_eq!(logic.show_if[0].operator, ConditionOperator::Unsupported);
    }

    #[test]
    fn test_empty_logic_parses_to_none() {
        assert!(ConditionalLogic::parse(&json!({}), "q2").is_none());
        assert!(ConditionalLogic::parse(&json!(null), "q2").is_none());
        assert!(ConditionalLogic::parse(&json!({"show_if": []}), "q2").is_none());
    }
}
