//! Terminal host for the questionnaire flow.
//!
//! This layer is thin glue over the engine: it renders the current page,
//! routes key events to navigation/editing, and enforces save-before-leave
//! using the session's dirty flag. All questionnaire semantics live in
//! `engine`.

mod runner;

use anyhow::Result;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::sync::Arc;

use crate::engine::autosave::{AutosaveConfig, AutosaveCoordinator};
use crate::engine::model::{Page, Template};
use crate::engine::session::QuestionnaireSession;
use crate::storage::SnapshotStore;

use runner::RunnerApp;

/// Run the interactive questionnaire until completion or quit.
pub async fn run_questionnaire(
    session: Arc<QuestionnaireSession>,
    template: Template,
    pages: Vec<Page>,
    store: SnapshotStore,
    autosave: AutosaveConfig,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut coordinator = AutosaveCoordinator::new(Arc::clone(&session), autosave);
    coordinator.start();

    let mut app = RunnerApp::new(session, template, pages, store, coordinator);
    let result = app.run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
