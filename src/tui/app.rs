//! Application state for the TUI.
//!
//! Holds the setup form and chat screen state. All state transitions are
//! plain methods so they can be tested without a terminal.

use std::path::PathBuf;
use std::time::Instant;

use crate::agent::AgentEvent;
use crate::cli::Cli;
use crate::config::{DatabaseConfig, RemoteConfig, DEFAULT_LOCAL_DB};

/// Braille spinner frames shown while a request is in flight.
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Animation speed in milliseconds per frame.
const FRAME_DURATION_MS: u128 = 100;

/// Which screen is currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Connection setup form.
    Setup,
    /// Chat with the connected database.
    Chat,
}

/// Database mode selected on the setup form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbMode {
    #[default]
    Local,
    Remote,
}

impl DbMode {
    pub fn toggle(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Local => "SQLite file (read-only)",
            Self::Remote => "MySQL server",
        }
    }
}

/// Fields on the setup form, in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    Mode,
    Path,
    Host,
    User,
    Password,
    Database,
    ApiKey,
    Model,
}

impl SetupField {
    /// Returns the fields visible for the given mode, in order.
    pub fn visible(mode: DbMode) -> &'static [SetupField] {
        match mode {
            DbMode::Local => &[
                Self::Mode,
                Self::Path,
                Self::ApiKey,
                Self::Model,
            ],
            DbMode::Remote => &[
                Self::Mode,
                Self::Host,
                Self::User,
                Self::Password,
                Self::Database,
                Self::ApiKey,
                Self::Model,
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mode => "Database",
            Self::Path => "SQLite path",
            Self::Host => "Host",
            Self::User => "User",
            Self::Password => "Password",
            Self::Database => "Database name",
            Self::ApiKey => "Groq API key",
            Self::Model => "Model",
        }
    }

    /// True for fields whose value is rendered masked.
    pub fn is_secret(self) -> bool {
        matches!(self, Self::Password | Self::ApiKey)
    }
}

/// Connection setup form state.
#[derive(Debug)]
pub struct SetupForm {
    pub mode: DbMode,
    pub path: String,
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub api_key: String,
    pub model: String,
    pub active: SetupField,
    /// Validation or connection error from the last submit attempt.
    pub error: Option<String>,
}

impl SetupForm {
    /// Pre-fills the form from command-line flags.
    pub fn from_cli(cli: &Cli) -> Self {
        let remote = cli.host.is_some()
            || cli.user.is_some()
            || cli.password.is_some()
            || cli.database.is_some();

        Self {
            mode: if remote { DbMode::Remote } else { DbMode::Local },
            path: cli
                .local
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| DEFAULT_LOCAL_DB.to_string()),
            host: cli.host.clone().unwrap_or_default(),
            user: cli.user.clone().unwrap_or_default(),
            password: cli.password.clone().unwrap_or_default(),
            database: cli.database.clone().unwrap_or_default(),
            api_key: cli.api_key.clone().unwrap_or_default(),
            model: cli.model.clone(),
            active: SetupField::Mode,
            error: None,
        }
    }

    /// Moves focus to the next visible field, wrapping around.
    pub fn next_field(&mut self) {
        let fields = SetupField::visible(self.mode);
        let idx = fields.iter().position(|f| *f == self.active).unwrap_or(0);
        self.active = fields[(idx + 1) % fields.len()];
    }

    /// Moves focus to the previous visible field, wrapping around.
    pub fn prev_field(&mut self) {
        let fields = SetupField::visible(self.mode);
        let idx = fields.iter().position(|f| *f == self.active).unwrap_or(0);
        self.active = fields[(idx + fields.len() - 1) % fields.len()];
    }

    /// Toggles the database mode and keeps focus valid.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
        if !SetupField::visible(self.mode).contains(&self.active) {
            self.active = SetupField::Mode;
        }
    }

    /// Returns the value of a field.
    pub fn value(&self, field: SetupField) -> &str {
        match field {
            SetupField::Mode => self.mode.label(),
            SetupField::Path => &self.path,
            SetupField::Host => &self.host,
            SetupField::User => &self.user,
            SetupField::Password => &self.password,
            SetupField::Database => &self.database,
            SetupField::ApiKey => &self.api_key,
            SetupField::Model => &self.model,
        }
    }

    fn active_value_mut(&mut self) -> Option<&mut String> {
        match self.active {
            SetupField::Mode => None,
            SetupField::Path => Some(&mut self.path),
            SetupField::Host => Some(&mut self.host),
            SetupField::User => Some(&mut self.user),
            SetupField::Password => Some(&mut self.password),
            SetupField::Database => Some(&mut self.database),
            SetupField::ApiKey => Some(&mut self.api_key),
            SetupField::Model => Some(&mut self.model),
        }
    }

    /// Types a character into the active field.
    pub fn insert(&mut self, c: char) {
        if self.active == SetupField::Mode {
            self.toggle_mode();
            return;
        }
        if let Some(value) = self.active_value_mut() {
            value.push(c);
        }
    }

    /// Deletes the last character of the active field.
    pub fn backspace(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.pop();
        }
    }

    /// Builds the database configuration the form currently describes.
    pub fn to_config(&self) -> DatabaseConfig {
        match self.mode {
            DbMode::Local => DatabaseConfig::Local {
                path: PathBuf::from(self.path.trim()),
            },
            DbMode::Remote => DatabaseConfig::Remote(RemoteConfig {
                host: self.host.trim().to_string(),
                user: self.user.trim().to_string(),
                password: self.password.clone(),
                database: self.database.trim().to_string(),
            }),
        }
    }
}

/// Input state for the chat line.
#[derive(Debug, Default)]
pub struct InputState {
    pub text: String,
    pub cursor: usize,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let prev = self.text[..self.cursor]
                .chars()
                .next_back()
                .map(|c| c.len_utf8())
                .unwrap_or(0);
            self.cursor -= prev;
            self.text.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        let prev = self.text[..self.cursor]
            .chars()
            .next_back()
            .map(|c| c.len_utf8())
            .unwrap_or(0);
        self.cursor -= prev;
    }

    pub fn move_right(&mut self) {
        let next = self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| c.len_utf8())
            .unwrap_or(0);
        self.cursor += next;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// Cursor position in characters, for terminal cursor placement.
    ///
    /// `cursor` is a byte offset; using it directly would misplace the
    /// cursor after any multibyte character.
    pub fn cursor_column(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Clears the input and returns the previous text.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

/// Main TUI state.
pub struct App {
    pub running: bool,
    pub screen: Screen,
    pub form: SetupForm,
    pub input: InputState,
    /// Lines from the bottom of the transcript.
    pub chat_scroll: usize,
    /// True while a question is with the Responder. Exactly one request
    /// is ever in flight; input submission is ignored meanwhile.
    pub is_processing: bool,
    /// Model text accumulated from Thinking events.
    pub streaming: String,
    /// Progress lines from Sql/Executing/Rows events.
    pub activity: Vec<String>,
    /// Transient error, cleared on the next submission.
    pub error: Option<String>,
    /// Transient notice from the last command.
    pub notice: Option<String>,
    spinner_start: Instant,
}

impl App {
    pub fn new(cli: &Cli) -> Self {
        Self {
            running: true,
            screen: Screen::Setup,
            form: SetupForm::from_cli(cli),
            input: InputState::new(),
            chat_scroll: 0,
            is_processing: false,
            streaming: String::new(),
            activity: Vec::new(),
            error: None,
            notice: None,
            spinner_start: Instant::now(),
        }
    }

    /// Marks the start of a question round trip.
    pub fn begin_request(&mut self) {
        self.is_processing = true;
        self.streaming.clear();
        self.activity.clear();
        self.error = None;
        self.notice = None;
        self.spinner_start = Instant::now();
    }

    /// Marks the end of a question round trip.
    pub fn finish_request(&mut self) {
        self.is_processing = false;
        self.streaming.clear();
        self.activity.clear();
        self.chat_scroll = 0;
    }

    /// Folds one agent event into the activity display.
    pub fn handle_agent_event(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::Thinking(chunk) => self.streaming.push_str(&chunk),
            AgentEvent::Sql(sql) => self.activity.push(format!("query: {sql}")),
            AgentEvent::Executing => self.activity.push("running query...".to_string()),
            AgentEvent::Rows(n) => self.activity.push(format!("{n} row(s)")),
        }
    }

    /// Sets a transient error shown until the next submission.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.notice = None;
    }

    /// Sets a transient notice shown until the next submission.
    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
        self.error = None;
    }

    /// Returns the current spinner frame.
    pub fn spinner_frame(&self) -> &'static str {
        let elapsed = self.spinner_start.elapsed().as_millis();
        let idx = (elapsed / FRAME_DURATION_MS) as usize;
        SPINNER_FRAMES[idx % SPINNER_FRAMES.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn app(args: &[&str]) -> App {
        App::new(&Cli::parse_from(args))
    }

    #[test]
    fn test_new_app_starts_on_setup() {
        let app = app(&["sqlchat"]);
        assert_eq!(app.screen, Screen::Setup);
        assert!(app.running);
        assert!(!app.is_processing);
    }

    #[test]
    fn test_form_prefilled_from_flags() {
        let app = app(&["sqlchat", "--host", "db.example.com", "--user", "root"]);
        assert_eq!(app.form.mode, DbMode::Remote);
        assert_eq!(app.form.host, "db.example.com");
        assert_eq!(app.form.user, "root");
    }

    #[test]
    fn test_form_defaults_to_local_path() {
        let app = app(&["sqlchat"]);
        assert_eq!(app.form.mode, DbMode::Local);
        assert_eq!(app.form.path, DEFAULT_LOCAL_DB);
    }

    #[test]
    fn test_field_navigation_wraps() {
        let mut form = SetupForm::from_cli(&Cli::parse_from(["sqlchat"]));
        assert_eq!(form.active, SetupField::Mode);
        form.next_field();
        assert_eq!(form.active, SetupField::Path);
        form.prev_field();
        form.prev_field();
        assert_eq!(form.active, SetupField::Model);
    }

    #[test]
    fn test_mode_toggle_resets_invalid_focus() {
        let mut form = SetupForm::from_cli(&Cli::parse_from(["sqlchat", "--host", "h"]));
        form.active = SetupField::Host;
        form.toggle_mode();
        assert_eq!(form.mode, DbMode::Local);
        assert_eq!(form.active, SetupField::Mode);
    }

    #[test]
    fn test_form_editing() {
        let mut form = SetupForm::from_cli(&Cli::parse_from(["sqlchat"]));
        form.active = SetupField::ApiKey;
        for c in "gsk_abc".chars() {
            form.insert(c);
        }
        assert_eq!(form.api_key, "gsk_abc");
        form.backspace();
        assert_eq!(form.api_key, "gsk_ab");
    }

    #[test]
    fn test_form_to_remote_config() {
        let mut form = SetupForm::from_cli(&Cli::parse_from(["sqlchat"]));
        form.mode = DbMode::Remote;
        form.host = " localhost ".to_string();
        form.user = "root".to_string();
        form.password = "pw".to_string();
        form.database = "student".to_string();

        match form.to_config() {
            DatabaseConfig::Remote(remote) => {
                assert_eq!(remote.host, "localhost");
                assert_eq!(remote.database, "student");
            }
            _ => panic!("Expected remote config"),
        }
    }

    #[test]
    fn test_agent_events_update_activity() {
        let mut app = app(&["sqlchat"]);
        app.begin_request();
        app.handle_agent_event(AgentEvent::Thinking("SELECT".to_string()));
        app.handle_agent_event(AgentEvent::Thinking(" 1;".to_string()));
        app.handle_agent_event(AgentEvent::Sql("SELECT 1;".to_string()));
        app.handle_agent_event(AgentEvent::Executing);
        app.handle_agent_event(AgentEvent::Rows(2));

        assert_eq!(app.streaming, "SELECT 1;");
        assert_eq!(app.activity.len(), 3);
        assert_eq!(app.activity[2], "2 row(s)");
    }

    #[test]
    fn test_finish_request_clears_activity() {
        let mut app = app(&["sqlchat"]);
        app.begin_request();
        app.handle_agent_event(AgentEvent::Executing);
        app.finish_request();
        assert!(!app.is_processing);
        assert!(app.activity.is_empty());
        assert!(app.streaming.is_empty());
    }

    #[test]
    fn test_error_cleared_on_next_request() {
        let mut app = app(&["sqlchat"]);
        app.set_error("Agent Error: model unavailable");
        assert!(app.error.is_some());
        app.begin_request();
        assert!(app.error.is_none());
    }

    #[test]
    fn test_cursor_column_counts_characters() {
        let mut input = InputState::new();
        for c in "héllo 学生".chars() {
            input.insert(c);
        }
        assert_eq!(input.cursor_column(), 8);

        input.move_left();
        input.move_left();
        assert_eq!(input.cursor_column(), 6);

        input.move_home();
        assert_eq!(input.cursor_column(), 0);
    }

    #[test]
    fn test_input_editing() {
        let mut input = InputState::new();
        for c in "hello".chars() {
            input.insert(c);
        }
        input.move_left();
        input.backspace();
        assert_eq!(input.text, "helo");
        input.move_end();
        assert_eq!(input.cursor, 4);
        assert_eq!(input.take(), "helo");
        assert!(input.text.is_empty());
    }
}
