//! The questionnaire engine: domain model, validation, conditional
//! visibility, session state and autosave.

pub mod autosave;
pub mod conditions;
pub mod model;
pub mod rules;
pub mod session;
pub mod validation;

pub use autosave::{AutosaveConfig, AutosaveCoordinator, DEFAULT_AUTOSAVE_INTERVAL};
pub use conditions::{dependent_questions, should_show, visible_questions};
pub use model::{Answer, AnswerMap, Page, PageType, Question, QuestionType, Submission, Template};
pub use rules::{Condition, ConditionOperator, ConditionalLogic, LogicOperator, ValidationRules};
pub use session::{QuestionnaireSession, SaveOutcome, SessionSnapshot, SessionStatus};
pub use validation::{validate_all, validate_answer, ValidationError, ValidationErrorKind};
