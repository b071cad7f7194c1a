use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, warn};
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::autosave::AutosaveCoordinator;
use crate::engine::conditions::visible_questions;
use crate::engine::model::{Page, PageType, Question, QuestionType, Template};
use crate::engine::session::{QuestionnaireSession, SaveOutcome};
use crate::engine::validation::{validate_all, ValidationError};
use crate::storage::SnapshotStore;

const SNAPSHOT_THROTTLE: Duration = Duration::from_secs(2);

pub struct RunnerApp {
    session: Arc<QuestionnaireSession>,
    template: Template,
    pages: Vec<Page>,
    store: SnapshotStore,
    coordinator: AutosaveCoordinator,
    selected: usize,
    errors: HashMap<String, ValidationError>,
    status: String,
    confirm_quit: bool,
    finished: bool,
    should_quit: bool,
    last_persist: Instant,
}

struct QuestionRow {
    label: String,
    required: bool,
    value: String,
    hint: String,
    error: Option<String>,
    selected: bool,
}

struct FrameView {
    heading: String,
    intro: Option<String>,
    show_progress: bool,
    progress: u8,
    questions: Vec<QuestionRow>,
    status: String,
    dirty: bool,
    confirm_quit: bool,
    finished: bool,
    completion_text: String,
}

impl RunnerApp {
    pub fn new(
        session: Arc<QuestionnaireSession>,
        template: Template,
        pages: Vec<Page>,
        store: SnapshotStore,
        coordinator: AutosaveCoordinator,
    ) -> Self {
        Self {
            session,
            template,
            pages,
            store,
            coordinator,
            selected: 0,
            errors: HashMap::new(),
            status: String::new(),
            confirm_quit: false,
            finished: false,
            should_quit: false,
            last_persist: Instant::now(),
        }
    }

    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            let view = self.build_view().await;
            terminal.draw(|f| Self::render(f, &view))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(150))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key).await?;
                    }
                }
            }

            // Throttled local persistence so a crash or restart can resume.
            if self.last_persist.elapsed() >= SNAPSHOT_THROTTLE {
                self.persist_snapshot().await;
            }
        }

        self.coordinator.stop();
        Ok(())
    }

    async fn page_for_current(&self) -> Option<Page> {
        let number = self.session.current_page().await;
        self.pages.iter().find(|p| p.page_number == number).cloned()
    }

    async fn visible_on_current_page(&self) -> Vec<Question> {
        let page = match self.page_for_current().await {
            Some(page) => page,
            None => return Vec::new(),
        };
        let answers = self.session.answers().await;
        visible_questions(&page.questions, &answers)
            .into_iter()
            .cloned()
            .collect()
    }

    async fn selected_question(&self) -> Option<Question> {
        let visible = self.visible_on_current_page().await;
        visible.get(self.selected).cloned()
    }

    // -- key handling ------------------------------------------------------

    async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.finished {
            self.should_quit = true;
            return Ok(());
        }

        if self.confirm_quit {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.persist_snapshot().await;
                    self.should_quit = true;
                }
                _ => {
                    self.confirm_quit = false;
                    self.status.clear();
                }
            }
            return Ok(());
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => self.manual_save().await,
                KeyCode::Char('c') => self.request_quit().await,
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Esc => self.request_quit().await,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                let count = self.visible_on_current_page().await.len();
                if self.selected + 1 < count {
                    self.selected += 1;
                }
            }
            KeyCode::Left | KeyCode::PageUp => self.go_back().await,
            KeyCode::Right | KeyCode::PageDown => self.go_forward().await?,
            KeyCode::Enter => self.on_enter().await?,
            KeyCode::Backspace => self.edit_backspace().await,
            KeyCode::Delete => self.clear_answer().await,
            KeyCode::Char(c) => self.edit_char(c).await,
            _ => {}
        }
        Ok(())
    }

    /// Save-before-leave: flush dirty state, and only ask for confirmation
    /// when the flush could not guarantee persistence.
    async fn request_quit(&mut self) {
        self.persist_snapshot().await;
        if self.coordinator.flush_on_teardown().await {
            self.should_quit = true;
        } else {
            self.confirm_quit = true;
            self.status = "Your progress could not be saved to the server.".to_string();
        }
    }

    async fn manual_save(&mut self) {
        self.persist_snapshot().await;
        match self.coordinator.save_now().await {
            Ok(SaveOutcome::Saved) => self.status = "Progress saved.".to_string(),
            Ok(SaveOutcome::Clean) => self.status = "Nothing to save.".to_string(),
            Ok(SaveOutcome::InFlight) => self.status = "Save already in progress.".to_string(),
            Ok(outcome) => {
                debug!("Manual save outcome: {:?}", outcome);
                self.status = "Could not save yet; will retry automatically.".to_string();
            }
            Err(e) => {
                warn!("Manual save failed: {}", e);
                self.status = format!("Save failed: {}", e);
            }
        }
    }

    async fn go_back(&mut self) {
        let page = match self.page_for_current().await {
            Some(page) => page,
            None => return,
        };
        if !page.allow_back_navigation {
            self.status = "Back navigation is disabled on this page.".to_string();
            return;
        }
        if !self.session.can_navigate_back().await {
            return;
        }
        let target = self.session.current_page().await - 1;
        self.change_page(target).await;
    }

    async fn go_forward(&mut self) -> Result<()> {
        if !self.validate_current_page().await {
            return Ok(());
        }

        let current = self.session.current_page().await;
        if current >= self.session.total_pages().await {
            return self.complete().await;
        }

        let target = current + 1;
        if self.session.can_navigate_to_page(target).await {
            self.change_page(target).await;
        }
        Ok(())
    }

    async fn on_enter(&mut self) -> Result<()> {
        let page = match self.page_for_current().await {
            Some(page) => page,
            None => return Ok(()),
        };

        match page.page_type {
            // Intro and summary pages have nothing to edit; Enter pages on.
            PageType::Intro | PageType::Summary => self.go_forward().await,
            _ if page.auto_advance => self.go_forward().await,
            _ => {
                // Move to the next question, or page forward from the last.
                let count = self.visible_on_current_page().await.len();
                if self.selected + 1 < count {
                    self.selected += 1;
                    Ok(())
                } else {
                    self.go_forward().await
                }
            }
        }
    }

    /// Validate visible questions; errors are all displayed, but only
    /// required questions block forward navigation.
    async fn validate_current_page(&mut self) -> bool {
        let visible = self.visible_on_current_page().await;
        let answers = self.session.answers().await;
        self.errors = validate_all(&visible, &answers);

        let blocked = visible
            .iter()
            .any(|q| q.is_required && self.errors.contains_key(&q.id));
        if blocked {
            self.status = "Please answer the highlighted questions.".to_string();
        }
        !blocked
    }

    async fn change_page(&mut self, target: u32) {
        self.session.set_current_page(target).await;
        self.selected = 0;
        self.errors.clear();
        self.status.clear();
        self.persist_snapshot().await;
    }

    async fn complete(&mut self) -> Result<()> {
        match self.session.complete_submission().await {
            Ok(()) => {
                if let Some(submission) = self.session.submission().await {
                    if let Err(e) = self.store.delete(&submission.submission_token) {
                        warn!("Could not remove completed snapshot: {}", e);
                    }
                }
                self.finished = true;
                self.status.clear();
            }
            Err(e) => {
                warn!("Completion failed: {}", e);
                self.status = format!("Could not submit: {}. Press Right to retry.", e);
            }
        }
        Ok(())
    }

    // -- answer editing ----------------------------------------------------

    async fn edit_char(&mut self, c: char) {
        let question = match self.selected_question().await {
            Some(question) => question,
            None => return,
        };

        if question.question_type.is_text_entry() {
            let mut text = self
                .session
                .answer_value(&question.id)
                .await
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            text.push(c);
            self.session.update_answer(&question.id, json!(text)).await;
            self.errors.remove(&question.id);
            return;
        }

        match question.question_type {
            QuestionType::Checkbox => {
                if c == ' ' {
                    let current = self
                        .session
                        .answer_value(&question.id)
                        .await
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    self.session.update_answer(&question.id, json!(!current)).await;
                    self.errors.remove(&question.id);
                }
            }
            QuestionType::SingleChoice => {
                if let Some(option) = digit_option(c, &question.options) {
                    self.session.update_answer(&question.id, json!(option)).await;
                    self.errors.remove(&question.id);
                }
            }
            QuestionType::MultipleChoice => {
                if let Some(option) = digit_option(c, &question.options) {
                    let mut selected: Vec<Value> = self
                        .session
                        .answer_value(&question.id)
                        .await
                        .and_then(|v| v.as_array().cloned())
                        .unwrap_or_default();
                    let entry = json!(option);
                    if let Some(pos) = selected.iter().position(|v| *v == entry) {
                        selected.remove(pos);
                    } else {
                        selected.push(entry);
                    }
                    if selected.is_empty() {
                        self.session.remove_answer(&question.id).await;
                    } else {
                        self.session.update_answer(&question.id, json!(selected)).await;
                    }
                    self.errors.remove(&question.id);
                }
            }
            QuestionType::Rating | QuestionType::Slider | QuestionType::PainScale => {
                if let Some(digit) = c.to_digit(10) {
                    // 0 enters 10 so a 1-10 scale stays one keypress.
                    let value = if digit == 0 { 10 } else { digit };
                    self.session.update_answer(&question.id, json!(value)).await;
                    self.errors.remove(&question.id);
                }
            }
            _ => {}
        }
    }

    async fn edit_backspace(&mut self) {
        let question = match self.selected_question().await {
            Some(question) => question,
            None => return,
        };
        if !question.question_type.is_text_entry() {
            return;
        }
        let mut text = self
            .session
            .answer_value(&question.id)
            .await
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        text.pop();
        if text.is_empty() {
            self.session.remove_answer(&question.id).await;
        } else {
            self.session.update_answer(&question.id, json!(text)).await;
        }
    }

    async fn clear_answer(&mut self) {
        if let Some(question) = self.selected_question().await {
            self.session.remove_answer(&question.id).await;
            self.errors.remove(&question.id);
        }
    }

    async fn persist_snapshot(&mut self) {
        if let Some(snapshot) = self.session.snapshot().await {
            if let Err(e) = self.store.save(&snapshot) {
                warn!("Could not persist session snapshot: {}", e);
            }
        }
        self.last_persist = Instant::now();
    }

    // -- rendering ---------------------------------------------------------

    async fn build_view(&self) -> FrameView {
        let current = self.session.current_page().await;
        let total = self.session.total_pages().await;
        let page = self.page_for_current().await;
        let answers = self.session.answers().await;
        let dirty = self.session.is_dirty().await;

        let (show_progress, intro, questions) = match &page {
            Some(page) => {
                let intro = match page.page_type {
                    PageType::Intro => self.template.intro_text.clone(),
                    PageType::Summary => Some(
                        "Review your answers, then press Enter to submit.".to_string(),
                    ),
                    _ => None,
                };
                let rows = visible_questions(&page.questions, &answers)
                    .into_iter()
                    .enumerate()
                    .map(|(i, q)| self.question_row(q, &answers, i == self.selected))
                    .collect();
                (page.show_progress, intro, rows)
            }
            None => (false, None, Vec::new()),
        };

        FrameView {
            heading: format!("{} (page {}/{})", self.template.name, current, total),
            intro,
            show_progress,
            progress: self.session.completion_percentage().await,
            questions,
            status: self.status.clone(),
            dirty,
            confirm_quit: self.confirm_quit,
            finished: self.finished,
            completion_text: self
                .template
                .completion_text
                .clone()
                .unwrap_or_else(|| "Thank you! Your questionnaire has been submitted.".to_string()),
        }
    }

    fn question_row(
        &self,
        question: &Question,
        answers: &crate::engine::model::AnswerMap,
        selected: bool,
    ) -> QuestionRow {
        let value = answers
            .get(&question.id)
            .map(|a| display_value(&a.value))
            .unwrap_or_default();

        let hint = match question.question_type {
            QuestionType::SingleChoice | QuestionType::MultipleChoice => question
                .options
                .iter()
                .enumerate()
                .map(|(i, option)| format!("[{}] {}", i + 1, option))
                .collect::<Vec<_>>()
                .join("  "),
            QuestionType::Checkbox => "space toggles".to_string(),
            QuestionType::Rating | QuestionType::Slider | QuestionType::PainScale => {
                "1-9, 0 for 10".to_string()
            }
            QuestionType::Date | QuestionType::DatePicker => "YYYY-MM-DD".to_string(),
            _ => String::new(),
        };

        QuestionRow {
            label: question.question_text.clone(),
            required: question.is_required,
            value,
            hint,
            error: self.errors.get(&question.id).map(|e| e.message.clone()),
            selected,
        }
    }

    fn render(f: &mut Frame, view: &FrameView) {
        if view.finished {
            let block = Block::default()
                .title(" Submitted ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green));
            let text = format!("\n{}\n\nPress any key to exit.", view.completion_text);
            let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
            f.render_widget(paragraph, f.area());
            return;
        }

        let constraints = if view.show_progress {
            vec![
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
        } else {
            vec![
                Constraint::Length(1),
                Constraint::Length(0),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(f.area());

        let heading = Paragraph::new(Line::from(Span::styled(
            view.heading.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        f.render_widget(heading, chunks[0]);

        if view.show_progress {
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(Color::Cyan))
                .percent(view.progress as u16);
            f.render_widget(gauge, chunks[1]);
        }

        Self::render_body(f, chunks[2], view);
        Self::render_status(f, chunks[3], view);

        let footer = Paragraph::new(
            "←/→ pages  ↑/↓ questions  Enter next  Ctrl+S save  Esc quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        f.render_widget(footer, chunks[4]);
    }

    fn render_body(f: &mut Frame, area: Rect, view: &FrameView) {
        let mut lines: Vec<Line> = Vec::new();

        if let Some(intro) = &view.intro {
            lines.push(Line::from(intro.clone()));
            lines.push(Line::from(""));
        }

        for row in &view.questions {
            let marker = if row.selected { "> " } else { "  " };
            let required = if row.required { " *" } else { "" };
            let label_style = if row.selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{}{}", row.label, required), label_style),
            ]));

            let value = if row.value.is_empty() {
                Span::styled("(no answer)", Style::default().fg(Color::DarkGray))
            } else {
                Span::styled(row.value.clone(), Style::default().fg(Color::Cyan))
            };
            lines.push(Line::from(vec![Span::raw("    "), value]));

            if row.selected && !row.hint.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("    {}", row.hint),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            if let Some(error) = &row.error {
                lines.push(Line::from(Span::styled(
                    format!("    {}", error),
                    Style::default().fg(Color::Red),
                )));
            }
            lines.push(Line::from(""));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_status(f: &mut Frame, area: Rect, view: &FrameView) {
        let line = if view.confirm_quit {
            Line::from(Span::styled(
                format!("{} Leave anyway? [y/N]", view.status),
                Style::default().fg(Color::Red),
            ))
        } else {
            let dirty = if view.dirty { "● unsaved" } else { "○ saved" };
            Line::from(vec![
                Span::styled(dirty.to_string(), Style::default().fg(Color::DarkGray)),
                Span::raw("  "),
                Span::raw(view.status.clone()),
            ])
        };
        f.render_widget(Paragraph::new(line), area);
    }
}

fn digit_option(c: char, options: &[String]) -> Option<&str> {
    let index = c.to_digit(10)? as usize;
    if index == 0 {
        return None;
    }
    options.get(index - 1).map(String::as_str)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
