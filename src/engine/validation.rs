//! Pure answer validation.
//!
//! Evaluation order per question: required check, then declared rules, then
//! type-specific format checks. The first failure wins; `validate_all`
//! collects one error per failing question.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::model::{AnswerMap, Question, QuestionType};

/// Field-scoped, user-recoverable validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    Required,
    Length,
    Range,
    Format,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Empty means: absent, null, empty string, empty array, or empty object.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Validate one answer against one question. Returns the first failure, or
/// `None` when the answer is acceptable. Pure function, no side effects.
pub fn validate_answer(question: &Question, value: Option<&Value>) -> Option<ValidationError> {
    if is_empty_value(value) {
        if question.is_required {
            return Some(ValidationError::new(
                ValidationErrorKind::Required,
                format!("{} is required", question.question_text),
            ));
        }
        // Not required and empty: nothing further to check.
        return None;
    }

    let value = value?;

    if let Some(rules) = &question.validation_rules {
        if let Some(error) = check_rules(question, rules, value) {
            return Some(error);
        }
    }

    check_type_format(question.question_type, value)
}

/// Validate every question against the answer map. Returns one error per
/// failing question, keyed by question id.
pub fn validate_all(
    questions: &[Question],
    answers: &AnswerMap,
) -> HashMap<String, ValidationError> {
    let mut errors = HashMap::new();
    for question in questions {
        let value = answers.get(&question.id).map(|a| &a.value);
        if let Some(error) = validate_answer(question, value) {
            errors.insert(question.id.clone(), error);
        }
    }
    errors
}

fn check_rules(
    question: &Question,
    rules: &super::rules::ValidationRules,
    value: &Value,
) -> Option<ValidationError> {
    if let Some(text) = value.as_str() {
        let length = text.chars().count();
        if let Some(min) = rules.min_length {
            if length < min {
                return Some(ValidationError::new(
                    ValidationErrorKind::Length,
                    format!("Must be at least {} characters", min),
                ));
            }
        }
        if let Some(max) = rules.max_length {
            if length > max {
                return Some(ValidationError::new(
                    ValidationErrorKind::Length,
                    format!("Must be no more than {} characters", max),
                ));
            }
        }
    }

    if let Some(number) = coerce_number(value) {
        if let Some(min) = rules.min {
            if number < min {
                return Some(ValidationError::new(
                    ValidationErrorKind::Range,
                    format!("Must be at least {}", min),
                ));
            }
        }
        if let Some(max) = rules.max {
            if number > max {
                return Some(ValidationError::new(
                    ValidationErrorKind::Range,
                    format!("Must be no more than {}", max),
                ));
            }
        }
    }

    if let Some(items) = value.as_array() {
        if let Some(min) = rules.min_files {
            if items.len() < min {
                return Some(ValidationError::new(
                    ValidationErrorKind::Range,
                    format!("Select at least {} file(s)", min),
                ));
            }
        }
        if let Some(max) = rules.max_files {
            if items.len() > max {
                return Some(ValidationError::new(
                    ValidationErrorKind::Range,
                    format!("Select no more than {} file(s)", max),
                ));
            }
        }
    }

    if let Some(pattern) = &rules.pattern {
        if let Some(text) = value.as_str() {
            if !pattern.is_match(text) {
                let message = rules
                    .validation_message
                    .clone()
                    .unwrap_or_else(|| "Invalid format".to_string());
                return Some(ValidationError::new(ValidationErrorKind::Format, message));
            }
        }
    }

    None
}

fn check_type_format(question_type: QuestionType, value: &Value) -> Option<ValidationError> {
    match question_type {
        QuestionType::Email => {
            let text = value.as_str().unwrap_or_default();
            if !email_regex().is_match(text) {
                return Some(ValidationError::new(
                    ValidationErrorKind::Format,
                    "Please enter a valid email address",
                ));
            }
            None
        }
        QuestionType::Phone => {
            let text = value.as_str().unwrap_or_default();
            let stripped: String = text
                .chars()
                .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
                .collect();
            if !phone_regex().is_match(&stripped) {
                return Some(ValidationError::new(
                    ValidationErrorKind::Format,
                    "Please enter a valid phone number",
                ));
            }
            None
        }
        QuestionType::Number => {
            if coerce_number(value).is_none() {
                return Some(ValidationError::new(
                    ValidationErrorKind::Format,
                    "Please enter a valid number",
                ));
            }
            None
        }
        QuestionType::Date | QuestionType::DatePicker => {
            if !parses_as_date(value) {
                return Some(ValidationError::new(
                    ValidationErrorKind::Format,
                    "Please enter a valid date",
                ));
            }
            None
        }
        // No type-specific format for the remaining (or unknown) types.
        _ => None,
    }
}

/// Coerce a JSON value to a finite number, JS-style: numbers pass through,
/// numeric strings parse, everything else fails.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn parses_as_date(value: &Value) -> bool {
    let text = match value.as_str() {
        Some(text) => text.trim(),
        None => return false,
    };
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || NaiveDate::parse_from_str(text, "%d/%m/%Y").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
}

fn email_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn phone_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^\+?[0-9]{10,15}$").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::ValidationRules;
    use serde_json::json;

    fn required(id: &str, question_type: QuestionType) -> Question {
        let mut q = Question::new(id, question_type);
        q.question_text = format!("Question {}", id);
        q.is_required = true;
        q
    }

    #[test]
    fn test_required_empty_values_fail() {
        let q = required("q1", QuestionType::Text);
        for empty in [None, Some(json!(null)), Some(json!("")), Some(json!([])), Some(json!({}))] {
            let error = validate_answer(&q, empty.as_ref()).expect("should fail");
            assert_eq!(error.kind, ValidationErrorKind::Required);
            assert!(error.message.contains("Question q1"));
        }
    }

    #[test]
    fn test_optional_empty_short_circuits() {
        let mut q = Question::new("q1", QuestionType::Email);
        q.validation_rules = Some(ValidationRules {
            min_length: Some(5),
            ..Default::default()
        });
        // Empty and not required: no rule or format checks run.
        assert_eq!(validate_answer(&q, None), None);
        assert_eq!(validate_answer(&q, Some(&json!(""))), None);
    }

    #[test]
    fn test_length_bounds() {
        let mut q = Question::new("q1", QuestionType::Text);
        q.validation_rules = Some(ValidationRules {
            min_length: Some(3),
            max_length: Some(5),
            ..Default::default()
        });

        assert_eq!(
            validate_answer(&q, Some(&json!("ab"))).unwrap().kind,
            ValidationErrorKind::Length
        );
        assert_eq!(
            validate_answer(&q, Some(&json!("abcdef"))).unwrap().kind,
            ValidationErrorKind::Length
        );
        assert_eq!(validate_answer(&q, Some(&json!("abcd"))), None);
    }

    #[test]
    fn test_numeric_bounds() {
        let mut q = Question::new("q1", QuestionType::Number);
        q.validation_rules = Some(ValidationRules {
            min: Some(1.0),
            max: Some(10.0),
            ..Default::default()
        });

        assert_eq!(
            validate_answer(&q, Some(&json!(0))).unwrap().kind,
            ValidationErrorKind::Range
        );
        assert_eq!(
            validate_answer(&q, Some(&json!("11"))).unwrap().kind,
            ValidationErrorKind::Range
        );
        assert_eq!(validate_answer(&q, Some(&json!(5))), None);
    }

    #[test]
    fn test_file_count_bounds() {
        let mut q = Question::new("photos", QuestionType::PhotoUpload);
        q.validation_rules = Some(ValidationRules {
            min_files: Some(1),
            max_files: Some(2),
            ..Default::default()
        });

        assert_eq!(
            validate_answer(&q, Some(&json!(["a.jpg", "b.jpg", "c.jpg"])))
                .unwrap()
                .kind,
            ValidationErrorKind::Range
        );
        assert_eq!(validate_answer(&q, Some(&json!(["a.jpg"]))), None);
    }

    #[test]
    fn test_pattern_uses_custom_message() {
        let mut q = Question::new("q1", QuestionType::Text);
        q.validation_rules = ValidationRules::parse(
            &json!({"pattern": "^[A-Z]", "validationMessage": "Start with a capital"}),
            "q1",
        );

        let error = validate_answer(&q, Some(&json!("lowercase"))).unwrap();
        assert_eq!(error.kind, ValidationErrorKind::Format);
        assert_eq!(error.message, "Start with a capital");
    }

    #[test]
    fn test_email_format() {
        let q = Question::new("email", QuestionType::Email);
        assert!(validate_answer(&q, Some(&json!("not-an-email"))).is_some());
        assert_eq!(validate_answer(&q, Some(&json!("a@b.co"))), None);
    }

    #[test]
    fn test_phone_format() {
        let q = Question::new("phone", QuestionType::Phone);
        // 10 digits after stripping separators.
        assert_eq!(validate_answer(&q, Some(&json!("555-123-4567"))), None);
        assert_eq!(validate_answer(&q, Some(&json!("+31 (20) 123 4567 89"))), None);
        let error = validate_answer(&q, Some(&json!("abc"))).unwrap();
        assert_eq!(error.kind, ValidationErrorKind::Format);
        // Too few digits.
        assert!(validate_answer(&q, Some(&json!("12345"))).is_some());
    }

    #[test]
    fn test_number_format() {
        let q = Question::new("n", QuestionType::Number);
        assert_eq!(validate_answer(&q, Some(&json!("12.5"))), None);
        assert!(validate_answer(&q, Some(&json!("twelve"))).is_some());
    }

    #[test]
    fn test_date_format() {
        let q = Question::new("d", QuestionType::DatePicker);
        assert_eq!(validate_answer(&q, Some(&json!("2026-03-14"))), None);
        assert!(validate_answer(&q, Some(&json!("2026-13-40"))).is_some());
        assert!(validate_answer(&q, Some(&json!("soon"))).is_some());
    }

    #[test]
    fn test_unknown_type_skips_format_stage() {
        let q = Question::new("q1", QuestionType::Unknown);
        assert_eq!(validate_answer(&q, Some(&json!("anything"))), None);
    }

    #[test]
    fn test_validate_all_single_required_empty_submit() {
        let q = required("q1", QuestionType::Text);
        let errors = validate_all(std::slice::from_ref(&q), &AnswerMap::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["q1"].kind, ValidationErrorKind::Required);
    }

    #[test]
    fn test_validate_all_collects_one_error_per_question() {
        use crate::engine::model::Answer;

        let q1 = required("q1", QuestionType::Text);
        let q2 = Question::new("q2", QuestionType::Email);
        let mut answers = AnswerMap::new();
        answers.insert("q2".to_string(), Answer::new(json!("bad-email")));

        let errors = validate_all(&[q1, q2], &answers);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["q1"].kind, ValidationErrorKind::Required);
        assert_eq!(errors["q2"].kind, ValidationErrorKind::Format);
    }
}
