//! Conditional visibility evaluation.
//!
//! Pure functions over the answer map. All comparison operators fail closed:
//! a dangling question reference, an unsupported operator, or a value that
//! will not coerce evaluates to false rather than panicking.

use serde_json::Value;

use super::model::{AnswerMap, Question};
use super::rules::{Condition, ConditionOperator, ConditionalLogic, LogicOperator};
use super::validation::{coerce_number, is_empty_value};

/// Whether a question should be rendered given the current answers.
pub fn should_show(question: &Question, answers: &AnswerMap) -> bool {
    let logic = match &question.conditional_logic {
        Some(logic) => logic,
        None => return true,
    };

    // show_if failing hides the question outright; hide_if is not consulted.
    if !logic.show_if.is_empty() && !combine(&logic.show_if, logic.operator, answers) {
        return false;
    }

    if !logic.hide_if.is_empty() && combine(&logic.hide_if, logic.operator, answers) {
        return false;
    }

    true
}

/// Filter a question list down to the visible ones, preserving order.
pub fn visible_questions<'a>(questions: &'a [Question], answers: &AnswerMap) -> Vec<&'a Question> {
    questions
        .iter()
        .filter(|q| should_show(q, answers))
        .collect()
}

/// Every question whose show_if/hide_if references `target_id`. Used to
/// re-evaluate only the affected questions when one answer changes.
pub fn dependent_questions<'a>(target_id: &str, questions: &'a [Question]) -> Vec<&'a Question> {
    questions
        .iter()
        .filter(|q| {
            q.conditional_logic.as_ref().is_some_and(|logic| {
                logic
                    .show_if
                    .iter()
                    .chain(logic.hide_if.iter())
                    .any(|c| c.question_id == target_id)
            })
        })
        .collect()
}

fn combine(conditions: &[Condition], operator: LogicOperator, answers: &AnswerMap) -> bool {
    match operator {
        LogicOperator::And => conditions.iter().all(|c| evaluate(c, answers)),
        LogicOperator::Or => conditions.iter().any(|c| evaluate(c, answers)),
    }
}

fn evaluate(condition: &Condition, answers: &AnswerMap) -> bool {
    // A reference to a question with no answer (or no such question at all)
    // behaves as an absent value.
    let actual = answers.get(&condition.question_id).map(|a| &a.value);

    match condition.operator {
        ConditionOperator::Equals => equals(actual, &condition.value),
        ConditionOperator::NotEquals => !equals(actual, &condition.value),
        ConditionOperator::Contains => contains(actual, &condition.value),
        ConditionOperator::GreaterThan => compare(actual, &condition.value, |a, b| a > b),
        ConditionOperator::LessThan => compare(actual, &condition.value, |a, b| a < b),
        ConditionOperator::IsEmpty => is_empty_value(actual),
        ConditionOperator::IsNotEmpty => !is_empty_value(actual),
        ConditionOperator::Unsupported => false,
    }
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        // Array answers (multi-choice): membership test.
        Some(Value::Array(items)) => items.contains(expected),
        Some(value) => value == expected,
        None => false,
    }
}

fn contains(actual: Option<&Value>, expected: &Value) -> bool {
    let needle = value_to_string(expected).to_lowercase();
    match actual {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| value_to_string(item).to_lowercase().contains(&needle)),
        Some(value) => value_to_string(value).to_lowercase().contains(&needle),
        None => false,
    }
}

fn compare(actual: Option<&Value>, expected: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(coerce_number), coerce_number(expected)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
