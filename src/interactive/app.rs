use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::models::{DirectoryEntry, PipelineView};
use crate::pipeline::PipelineHandle;

use super::input::QueryInput;
use super::results::{ResultList, Selection};
use super::ui;

/// Which list Up/Down navigate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Results,
    Selection,
}

/// Interactive search session state
pub struct InteractiveApp {
    pipeline: PipelineHandle,
    input: QueryInput,
    results: ResultList,
    selection: Selection,
    focus: Focus,
    /// Latest view published by the pipeline
    view: PipelineView,
    /// Transient status line message
    info_message: Option<String>,
    should_quit: bool,
}

impl InteractiveApp {
    pub fn new(pipeline: PipelineHandle) -> Self {
        let view = pipeline.view();
        Self {
            pipeline,
            input: QueryInput::new(),
            results: ResultList::new(),
            selection: Selection::new(),
            focus: Focus::Results,
            view,
            info_message: None,
            should_quit: false,
        }
    }

    /// Run until the user quits; returns the selected entries
    pub async fn run(mut self) -> Result<Vec<DirectoryEntry>> {
        let mut terminal = Self::setup_terminal()?;

        let result = self.event_loop(&mut terminal).await;

        Self::restore_terminal(terminal)?;
        result?;

        Ok(self.selection.entries().to_vec())
    }

    async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let mut events = spawn_event_reader();
        let mut views = self.pipeline.subscribe();

        while !self.should_quit {
            terminal.draw(|f| ui::render(f, self))?;

            tokio::select! {
                event = events.recv() => match event {
                    Some(Event::Key(key)) => self.handle_key(key),
                    // Resize and other events only need a redraw
                    Some(_) => {}
                    None => break,
                },
                changed = views.changed() => {
                    if changed.is_err() {
                        log::debug!("Search pipeline stopped, leaving interactive mode");
                        break;
                    }
                    let view = views.borrow_and_update().clone();
                    self.apply_view(view);
                }
            }
        }

        Ok(())
    }

    pub(super) fn apply_view(&mut self, view: PipelineView) {
        self.results.set_results(view.results.clone());
        self.view = view;
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('r') if ctrl => {
                self.info_message = Some("Refreshing symbol directory...".to_string());
                self.pipeline.refresh_directory();
            }
            KeyCode::Char('x') if ctrl => self.remove_highlighted(),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Results if !self.selection.is_empty() => Focus::Selection,
                    _ => Focus::Results,
                };
            }
            KeyCode::Down => match self.focus {
                Focus::Results => self.results.next(),
                Focus::Selection => self.selection.next(),
            },
            KeyCode::Up => match self.focus {
                Focus::Results => self.results.prev(),
                Focus::Selection => self.selection.prev(),
            },
            KeyCode::Enter if self.focus == Focus::Results => self.select_current(),
            KeyCode::Enter => {}
            _ => {
                if self.input.handle_key(key) {
                    self.info_message = None;
                    self.pipeline.set_query(self.input.value());
                }
            }
        }
    }

    /// Add the highlighted result to the selection and start a fresh query
    fn select_current(&mut self) {
        let Some(entry) = self.results.selected().cloned() else {
            return;
        };

        let symbol = entry.symbol.clone();
        self.info_message = Some(if self.selection.add(entry) {
            format!("Added {}", symbol)
        } else {
            format!("{} is already selected", symbol)
        });

        self.input.clear();
        self.pipeline.set_query("");
    }

    fn remove_highlighted(&mut self) {
        self.info_message = self
            .selection
            .remove_highlighted()
            .map(|entry| format!("Removed {}", entry.symbol));
        if self.selection.is_empty() {
            self.focus = Focus::Results;
        }
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
        crossterm::terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    // Getters for UI rendering
    pub fn input(&self) -> &QueryInput {
        &self.input
    }

    pub fn results(&self) -> &ResultList {
        &self.results
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn view(&self) -> &PipelineView {
        &self.view
    }

    pub fn info_message(&self) -> Option<&str> {
        self.info_message.as_deref()
    }
}

/// Forward terminal events from a blocking reader thread
///
/// The thread exits once the receiver is dropped.
fn spawn_event_reader() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        loop {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => {
                    if tx.is_closed() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to poll terminal events: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::directory::DirectorySource;
    use crate::models::SymbolRecord;
    use crate::pipeline::SearchPipeline;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EmptySource;

    #[async_trait]
    impl DirectorySource for EmptySource {
        async fn fetch(&self) -> Result<Vec<SymbolRecord>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    fn app() -> InteractiveApp {
        let config = SearchConfig {
            auto_fetch: false,
            ..Default::default()
        };
        InteractiveApp::new(SearchPipeline::spawn(config, Arc::new(EmptySource)))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn view_with(symbols: &[&str]) -> PipelineView {
        let results: Vec<DirectoryEntry> = symbols
            .iter()
            .map(|s| DirectoryEntry::new(*s, format!("{} Corp", s)))
            .collect();
        PipelineView {
            results: results.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_enter_adds_highlighted_result_and_clears_query() {
        let mut app = app();
        app.handle_key(press(KeyCode::Char('A')));
        app.handle_key(press(KeyCode::Char('M')));
        app.apply_view(view_with(&["AMD", "AMZN"]));

        app.handle_key(press(KeyCode::Down));
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.selection().symbols(), vec!["AMZN"]);
        assert_eq!(app.input().value(), "");
        assert_eq!(app.info_message(), Some("Added AMZN"));
    }

    #[tokio::test]
    async fn test_duplicate_selection_is_reported() {
        let mut app = app();
        app.apply_view(view_with(&["AMD"]));
        app.handle_key(press(KeyCode::Enter));
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.selection().symbols(), vec!["AMD"]);
        assert_eq!(app.info_message(), Some("AMD is already selected"));
    }

    #[tokio::test]
    async fn test_remove_highlighted_selection_row() {
        let mut app = app();
        app.apply_view(view_with(&["AAPL", "MSFT", "TSLA"]));
        app.handle_key(press(KeyCode::Enter));
        app.handle_key(press(KeyCode::Down));
        app.handle_key(press(KeyCode::Enter));
        app.handle_key(press(KeyCode::Down));
        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.selection().symbols(), vec!["AAPL", "MSFT", "TSLA"]);

        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.focus(), Focus::Selection);
        app.handle_key(press(KeyCode::Up));
        app.handle_key(press(KeyCode::Up));
        app.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));

        assert_eq!(app.selection().symbols(), vec!["MSFT", "TSLA"]);
        assert_eq!(app.info_message(), Some("Removed AAPL"));

        // Enter does not select while the selection has focus
        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.selection().symbols(), vec!["MSFT", "TSLA"]);

        app.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));
        app.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert!(app.selection().is_empty());
        assert_eq!(app.focus(), Focus::Results);
    }

    #[tokio::test]
    async fn test_tab_needs_a_selection() {
        let mut app = app();
        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.focus(), Focus::Results);
    }

    #[tokio::test]
    async fn test_enter_without_results_does_nothing() {
        let mut app = app();
        app.handle_key(press(KeyCode::Enter));
        assert!(app.selection().is_empty());
    }

    #[tokio::test]
    async fn test_escape_quits() {
        let mut app = app();
        app.handle_key(press(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_key_release_ignored() {
        let mut app = app();
        let mut release = press(KeyCode::Char('A'));
        release.kind = KeyEventKind::Release;
        app.handle_key(release);
        assert_eq!(app.input().value(), "");
    }
}
