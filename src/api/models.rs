//! Wire models for the platform API.
//!
//! Catalog responses carry `validation_rules` and `conditional_logic` as
//! loose JSON; the raw shapes below exist only long enough to be converted
//! into the typed domain model (see `api::catalog`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::model::{PageType, QuestionType};

/// Page as returned by `GET /api/templates/{id}/pages`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    pub id: String,
    #[serde(default)]
    pub template_id: String,
    pub page_number: u32,
    #[serde(default = "default_page_type")]
    pub page_type: PageType,
    #[serde(default = "default_true")]
    pub show_progress: bool,
    #[serde(default = "default_true")]
    pub allow_back_navigation: bool,
    #[serde(default)]
    pub auto_advance: bool,
    #[serde(default)]
    pub questions: Vec<RawQuestion>,
}

/// Question as returned nested in a page.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    pub id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub page_id: Option<String>,
    pub question_type: QuestionType,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub validation_rules: Option<Value>,
    #[serde(default)]
    pub conditional_logic: Option<Value>,
}

fn default_page_type() -> PageType {
    PageType::Standard
}

fn default_true() -> bool {
    true
}

/// Partial update body for `PATCH /api/submissions/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPatch {
    pub submission_data: Value,
    pub completion_percentage: u8,
    pub time_spent_seconds: u64,
}

/// Body for `POST /api/submissions/{id}/complete`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionPayload {
    pub submission_data: Value,
    pub time_spent_seconds: u64,
}

/// Fire-and-forget analytics event.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub event: String,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn submission_completed(template_id: &str, submission_id: &str) -> Self {
        Self {
            event: "submission_completed".to_string(),
            template_id: template_id.to_string(),
            submission_id: Some(submission_id.to_string()),
            occurred_at: Utc::now(),
        }
    }
}
