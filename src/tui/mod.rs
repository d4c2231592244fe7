//! Terminal user interface for sqlchat.
//!
//! Runs the main application loop using ratatui and crossterm. The loop
//! owns the chat context; questions run on a spawned task so the UI can
//! show agent progress while the answer is in flight.

pub mod app;
mod ui;

pub use app::App;

use std::io::{self, Stdout};
use std::panic;
use std::sync::Arc;

use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::agent::{AgentEvent, MockResponder, Responder};
use crate::app::{ChatContext, InputResult};
use crate::cli::Cli;
use crate::config::Credential;
use crate::db::HandleCache;
use crate::error::{ChatError, Result};
use self::app::{Screen, SetupField};

/// Messages sent from background tasks to the main loop.
#[derive(Debug)]
enum UiMessage {
    /// Progress from the agent while a question is in flight.
    Agent(AgentEvent),
    /// The question finished, successfully or not.
    Done(Result<String>),
}

/// The main TUI application runner.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Creates a new TUI instance, initializing the terminal.
    pub fn new() -> Result<Self> {
        let terminal = Self::setup_terminal()?;
        Ok(Self { terminal })
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()
            .map_err(|e| ChatError::internal(format!("Failed to enable raw mode: {e}")))?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| ChatError::internal(format!("Failed to enter alternate screen: {e}")))?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)
            .map_err(|e| ChatError::internal(format!("Failed to create terminal: {e}")))?;

        Ok(terminal)
    }

    fn restore_terminal(&mut self) -> Result<()> {
        disable_raw_mode()
            .map_err(|e| ChatError::internal(format!("Failed to disable raw mode: {e}")))?;

        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| ChatError::internal(format!("Failed to leave alternate screen: {e}")))?;

        self.terminal
            .show_cursor()
            .map_err(|e| ChatError::internal(format!("Failed to show cursor: {e}")))?;

        Ok(())
    }

    /// Runs the main event loop.
    pub async fn run(&mut self, cli: &Cli) -> Result<()> {
        // Restore the terminal if a panic unwinds through the loop
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = LoopState::new(cli, tx);

        // A complete set of flags skips the form; a failed attempt falls
        // back to it with the error shown.
        if state.should_auto_connect() {
            state.connect().await;
        }

        let result = self.run_event_loop(&mut state, rx).await;

        state.handles.lock().await.evict().await;
        let _ = panic::take_hook();

        result
    }

    async fn run_event_loop(
        &mut self,
        state: &mut LoopState<'_>,
        mut rx: mpsc::UnboundedReceiver<UiMessage>,
    ) -> Result<()> {
        loop {
            self.terminal
                .draw(|frame| ui::render(frame, &state.app, state.context.as_ref()))
                .map_err(|e| ChatError::internal(format!("Failed to draw: {e}")))?;

            if !state.app.running {
                break;
            }

            tokio::select! {
                event_result = tokio::task::spawn_blocking(|| {
                    let tick_rate = std::time::Duration::from_millis(100);
                    if crossterm::event::poll(tick_rate).unwrap_or(false) {
                        crossterm::event::read().ok()
                    } else {
                        None
                    }
                }) => {
                    if let Ok(Some(event)) = event_result {
                        state.handle_crossterm_event(event).await;
                    }
                }

                Some(msg) = rx.recv() => {
                    state.handle_ui_message(msg);
                }
            }
        }

        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

/// Everything the event loop mutates.
struct LoopState<'a> {
    cli: &'a Cli,
    app: App,
    context: Option<ChatContext>,
    handles: Arc<Mutex<HandleCache>>,
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl<'a> LoopState<'a> {
    fn new(cli: &'a Cli, tx: mpsc::UnboundedSender<UiMessage>) -> Self {
        Self {
            cli,
            app: App::new(cli),
            context: None,
            handles: Arc::new(Mutex::new(HandleCache::new())),
            tx,
        }
    }

    /// True when the flags alone describe a usable session.
    fn should_auto_connect(&self) -> bool {
        self.cli.mock_agent
            || (self.cli.to_database_config().is_some() && self.cli.credential().is_some())
    }

    async fn handle_crossterm_event(&mut self, event: crossterm::event::Event) {
        use crossterm::event::Event as CEvent;

        match event {
            CEvent::Key(key) => {
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.app.running = false;
                        return;
                    }
                    KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.app.running = false;
                        return;
                    }
                    _ => {}
                }

                match self.app.screen {
                    Screen::Setup => self.handle_setup_key(key).await,
                    Screen::Chat => self.handle_chat_key(key),
                }
            }
            CEvent::Resize(_, _) => {}
            _ => {}
        }
    }

    async fn handle_setup_key(&mut self, key: crossterm::event::KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Down => self.app.form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.app.form.prev_field(),
            KeyCode::Left | KeyCode::Right if self.app.form.active == SetupField::Mode => {
                self.app.form.toggle_mode();
            }
            KeyCode::Char(c) => self.app.form.insert(c),
            KeyCode::Backspace => self.app.form.backspace(),
            KeyCode::Enter => self.connect().await,
            _ => {}
        }
    }

    /// Attempts to connect with the current form values.
    ///
    /// On failure the form stays up with the error and the previous
    /// session, if any, is kept; nothing is retried. On success the chat
    /// history carries over into the rebuilt context.
    async fn connect(&mut self) {
        self.app.form.error = None;

        let previous = self.context.take();

        let mut context = if self.cli.mock_agent {
            let responder: Arc<dyn Responder> = Arc::new(MockResponder::new(
                "This is the mock responder; no model or database was used.",
            ));
            ChatContext::with_responder(responder, "mock responder".to_string())
        } else {
            let config = self.app.form.to_config();
            let credential = Credential::new(&self.app.form.api_key);

            match ChatContext::create(
                &self.handles,
                &config,
                &credential,
                self.app.form.model.trim(),
            )
            .await
            {
                Ok(context) => {
                    info!("Connected: {}", context.connection_info());
                    context
                }
                Err(e) => {
                    warn!("Connection attempt failed: {e}");
                    self.app.form.error = Some(format!("{}: {e}", e.category()));
                    self.context = previous;
                    return;
                }
            }
        };

        // Only /clear discards history; reconfiguring does not.
        if let Some(old) = previous {
            context.resume_transcript(old.into_store());
        }

        self.context = Some(context);
        self.app.screen = Screen::Chat;
    }

    fn handle_chat_key(&mut self, key: crossterm::event::KeyEvent) {
        // One request in flight; editing resumes when it finishes
        if self.app.is_processing {
            return;
        }

        match key.code {
            KeyCode::Enter => self.submit_input(),
            KeyCode::Esc => {
                // Back to the form; the cached handle survives for reuse
                self.app.screen = Screen::Setup;
            }
            KeyCode::Char(c) => self.app.input.insert(c),
            KeyCode::Backspace => self.app.input.backspace(),
            KeyCode::Left => self.app.input.move_left(),
            KeyCode::Right => self.app.input.move_right(),
            KeyCode::Home => self.app.input.move_home(),
            KeyCode::End => self.app.input.move_end(),
            KeyCode::Up => self.app.chat_scroll = self.app.chat_scroll.saturating_add(1),
            KeyCode::Down => self.app.chat_scroll = self.app.chat_scroll.saturating_sub(1),
            KeyCode::PageUp => self.app.chat_scroll = self.app.chat_scroll.saturating_add(10),
            KeyCode::PageDown => self.app.chat_scroll = self.app.chat_scroll.saturating_sub(10),
            _ => {}
        }
    }

    fn submit_input(&mut self) {
        let raw = self.app.input.take();
        let input = raw.trim();
        if input.is_empty() {
            return;
        }

        let Some(context) = self.context.as_mut() else {
            return;
        };

        if input.starts_with('/') {
            match context.handle_command(input) {
                InputResult::Exit => self.app.running = false,
                InputResult::Notice(text) => self.app.set_notice(text),
                InputResult::None | InputResult::Answered => {}
            }
            return;
        }

        context.begin_question(input);
        let responder = context.responder();
        self.app.begin_request();
        spawn_question(responder, input.to_string(), self.tx.clone());
    }

    fn handle_ui_message(&mut self, msg: UiMessage) {
        match msg {
            UiMessage::Agent(event) => self.app.handle_agent_event(event),
            UiMessage::Done(result) => {
                self.app.finish_request();
                match result {
                    Ok(answer) => {
                        if let Some(context) = self.context.as_mut() {
                            context.complete_question(answer);
                        }
                    }
                    Err(e) => self.app.set_error(format!("{}: {e}", e.category())),
                }
            }
        }
    }
}

/// Runs the Responder on a background task, forwarding its events.
///
/// The Responder call runs on its own task so a panic inside it cannot
/// swallow the completion message; Done is always sent, keeping the loop
/// accepting input.
fn spawn_question(
    responder: Arc<dyn Responder>,
    question: String,
    ui_tx: mpsc::UnboundedSender<UiMessage>,
) {
    tokio::spawn(async move {
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();

        let fwd_tx = ui_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = evt_rx.recv().await {
                if fwd_tx.send(UiMessage::Agent(event)).is_err() {
                    break;
                }
            }
        });

        let worker =
            tokio::spawn(async move { responder.answer(&question, &evt_tx).await });
        let result = match worker.await {
            Ok(result) => result,
            Err(e) => Err(ChatError::internal(format!("Question task failed: {e}"))),
        };

        // The worker owned the event sender, so by now the forwarder has
        // drained and stopped, panics included.
        let _ = forwarder.await;
        let _ = ui_tx.send(UiMessage::Done(result));
    });
}

/// Runs the TUI application.
pub async fn run(cli: &Cli) -> Result<()> {
    let mut tui = Tui::new()?;
    tui.run(cli).await
}
