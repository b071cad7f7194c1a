//! Domain model for the questionnaire engine.
//!
//! These types are the parsed, known-safe representation of the platform
//! catalog. Loose JSON from the wire is converted into them exactly once at
//! catalog-load time (see `engine::rules` and `api::catalog`), so the
//! evaluation code never has to re-check shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::rules::{ConditionalLogic, ValidationRules};

/// Flat answer mapping for a whole template, keyed by question id.
///
/// Answers are template-wide rather than page-scoped because conditional
/// logic may reference questions on other pages.
pub type AnswerMap = BTreeMap<String, Answer>;

/// A single answer value plus its last-modified stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            updated_at: Utc::now(),
        }
    }
}

/// Closed enumeration of question types supported by the platform.
///
/// Unknown strings from the catalog deserialize to `Unknown`; such questions
/// still get required/rule checks but skip type-specific validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Textarea,
    Email,
    Phone,
    Number,
    Date,
    DatePicker,
    SingleChoice,
    MultipleChoice,
    Checkbox,
    FileUpload,
    PhotoUpload,
    PhotoGrid,
    Rating,
    Slider,
    PainScale,
    ToothChart,
    BudgetRange,
    #[serde(other)]
    Unknown,
}

impl QuestionType {
    /// Types whose answers are entered as free text in the terminal host.
    pub fn is_text_entry(&self) -> bool {
        matches!(
            self,
            QuestionType::Text
                | QuestionType::Textarea
                | QuestionType::Email
                | QuestionType::Phone
                | QuestionType::Number
                | QuestionType::Date
                | QuestionType::DatePicker
                | QuestionType::BudgetRange
                | QuestionType::Unknown
        )
    }

    /// Types whose answers are arrays of selected options or files.
    pub fn is_multi_value(&self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice
                | QuestionType::FileUpload
                | QuestionType::PhotoUpload
                | QuestionType::PhotoGrid
                | QuestionType::ToothChart
        )
    }
}

/// Page kinds; anything the catalog sends that we do not recognize renders
/// as a standard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Intro,
    PhotoUpload,
    Summary,
    #[serde(other)]
    Standard,
}

/// Read-only template catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub total_pages: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub intro_text: Option<String>,
    #[serde(default)]
    pub completion_text: Option<String>,
}

fn default_true() -> bool {
    true
}

/// An ordered section of a template with its (already parsed) questions.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: String,
    pub template_id: String,
    /// 1-based; unique and contiguous within a template.
    pub page_number: u32,
    pub page_type: PageType,
    pub show_progress: bool,
    pub allow_back_navigation: bool,
    pub auto_advance: bool,
    pub questions: Vec<Question>,
}

/// A single prompt with optional validation rules and conditional logic.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: String,
    pub template_id: String,
    pub page_id: Option<String>,
    pub question_type: QuestionType,
    pub question_text: String,
    pub order_index: i32,
    pub is_required: bool,
    pub options: Vec<String>,
    pub validation_rules: Option<ValidationRules>,
    pub conditional_logic: Option<ConditionalLogic>,
}

impl Question {
    /// Minimal question for tests and programmatic construction.
    pub fn new(id: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            id: id.into(),
            template_id: String::new(),
            page_id: None,
            question_type,
            question_text: String::new(),
            order_index: 0,
            is_required: false,
            options: Vec::new(),
            validation_rules: None,
            conditional_logic: None,
        }
    }
}

/// The persisted unit of work: one user's attempt at a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub template_id: String,
    pub submission_token: String,
    #[serde(default)]
    pub submission_data: Value,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub completion_percentage: u8,
    #[serde(default)]
    pub time_spent_seconds: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Local-only: false while the id is a client-side placeholder. The
    /// engine must never PATCH a submission whose id the server has not
    /// assigned.
    #[serde(default)]
    pub server_assigned: bool,
}

impl Submission {
    /// Local shell created at session start, before (or instead of) a
    /// successful create call.
    pub fn local_shell(template_id: &str, submission_token: &str) -> Self {
        Self {
            id: format!("pending-{}", submission_token),
            template_id: template_id.to_string(),
            submission_token: submission_token.to_string(),
            submission_data: Value::Object(Default::default()),
            is_complete: false,
            completion_percentage: 0,
            time_spent_seconds: 0,
            created_at: Some(Utc::now()),
            updated_at: None,
            completed_at: None,
            server_assigned: false,
        }
    }
}

/// Convert the answer map into the wire shape of `submission_data`
/// (question id -> raw value, timestamps stripped).
pub fn answers_to_submission_data(answers: &AnswerMap) -> Value {
    let map: serde_json::Map<String, Value> = answers
        .iter()
        .map(|(id, answer)| (id.clone(), answer.value.clone()))
        .collect();
    Value::Object(map)
}
