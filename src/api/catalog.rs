//! Read-only template catalog access.
//!
//! Converts the loose wire shapes into the typed domain model at load time,
//! sorting pages by page_number and questions by order_index.

use anyhow::Result;
use log::debug;
use urlencoding::encode;

use super::client::PlatformClient;
use super::models::{RawPage, RawQuestion};
use crate::engine::model::{Page, Question, Template};
use crate::engine::rules::{ConditionalLogic, ValidationRules};

impl PlatformClient {
    pub(super) async fn fetch_templates_impl(&self) -> Result<Vec<Template>> {
        let templates: Vec<Template> = self.get_json("/api/templates?active=true").await?;
        debug!("Fetched {} active templates", templates.len());
        Ok(templates)
    }

    pub(super) async fn fetch_template_impl(&self, template_id: &str) -> Result<Template> {
        let template: Template = self
            .get_json(&format!("/api/templates/{}", encode(template_id)))
            .await?;

        if !template.is_active {
            anyhow::bail!("Template '{}' is not active", template.name);
        }

        Ok(template)
    }

    pub(super) async fn fetch_pages_impl(&self, template_id: &str) -> Result<Vec<Page>> {
        let raw_pages: Vec<RawPage> = self
            .get_json(&format!("/api/templates/{}/pages", encode(template_id)))
            .await?;

        let mut pages: Vec<Page> = raw_pages.into_iter().map(convert_page).collect();
        pages.sort_by_key(|p| p.page_number);

        debug!(
            "Fetched {} pages ({} questions) for template {}",
            pages.len(),
            pages.iter().map(|p| p.questions.len()).sum::<usize>(),
            template_id
        );

        Ok(pages)
    }
}

fn convert_page(raw: RawPage) -> Page {
    let mut questions: Vec<Question> = raw.questions.into_iter().map(convert_question).collect();
    // Stable sort: duplicate order_index values keep their catalog order.
    questions.sort_by_key(|q| q.order_index);

    Page {
        id: raw.id,
        template_id: raw.template_id,
        page_number: raw.page_number,
        page_type: raw.page_type,
        show_progress: raw.show_progress,
        allow_back_navigation: raw.allow_back_navigation,
        auto_advance: raw.auto_advance,
        questions,
    }
}

fn convert_question(raw: RawQuestion) -> Question {
    let validation_rules = raw
        .validation_rules
        .as_ref()
        .and_then(|rules| ValidationRules::parse(rules, &raw.id));
    let conditional_logic = raw
        .conditional_logic
        .as_ref()
        .and_then(|logic| ConditionalLogic::parse(logic, &raw.id));

    Question {
        id: raw.id,
        template_id: raw.template_id,
        page_id: raw.page_id,
        question_type: raw.question_type,
        question_text: raw.question_text,
        order_index: raw.order_index,
        is_required: raw.is_required,
        options: raw.options.unwrap_or_default(),
        validation_rules,
        conditional_logic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::QuestionType;
    use serde_json::json;

    #[test]
    fn test_convert_page_sorts_questions_stably() {
        let raw: RawPage = serde_json::from_value(json!({
            "id": "p1",
            "page_number": 1,
            "questions": [
                {"id": "q3", "question_type": "text", "order_index": 2},
                {"id": "q1", "question_type": "text", "order_index": 1},
                {"id": "q2", "question_type": "text", "order_index": 1}
            ]
        }))
        .unwrap();

        let page = convert_page(raw);
        let ids: Vec<&str> = page.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2", "q3"]);
    }

    #[test]
    fn test_convert_question_parses_rules_and_logic() {
        let raw: RawQuestion = serde_json::from_value(json!({
            "id": "q1",
            "question_type": "phone",
            "question_text": "Phone number",
            "is_required": true,
            "validation_rules": {"minLength": 10},
            "conditional_logic": {
                "show_if": [{"question_id": "contact", "operator": "equals", "value": "phone"}]
            }
        }))
        .unwrap();

        let question = convert_question(raw);
        assert_eq!(question.question_type, QuestionType::Phone);
        assert!(question.is_required);
        assert_eq!(question.validation_rules.unwrap().min_length, Some(10));
        assert_eq!(question.conditional_logic.unwrap().show_if.len(), 1);
    }

    #[test]
    fn test_convert_question_tolerates_malformed_blobs() {
        let raw: RawQuestion = serde_json::from_value(json!({
            "id": "q1",
            "question_type": "text",
            "validation_rules": "not-an-object",
            "conditional_logic": 42
        }))
        .unwrap();

        let question = convert_question(raw);
        assert!(question.validation_rules.is_none());
        assert!(question.conditional_logic.is_none());
    }
}
