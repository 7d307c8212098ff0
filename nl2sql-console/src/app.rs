//! Application state for the TUI.
//!
//! The `App` is the glue between the terminal and the core: key events call
//! into the session's `begin_*` guards, passing calls to spawned transport
//! tasks, and completed outcomes come back over an mpsc channel to be
//! applied by `finish_*` on the next tick. If the app is dropped with a call
//! still outstanding, the channel dies with it and the late response is
//! discarded.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use nl2sql_console_core::{
    ApiClient, Config, ExecuteResult, LogBuffer, LogStream, PlanResponse, Session, StreamEvent,
};
use ratatui::widgets::TableState;
use tokio::sync::mpsc;

/// Current view mode
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewMode {
    /// Conversation view: transcript, candidates, result
    #[default]
    Chat,
    /// Log tail view for one run
    Logs { run_id: String },
}

/// Focused pane within the chat view.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ChatFocus {
    /// Question input line
    #[default]
    Input,
    /// Candidate table
    Candidates,
}

/// Completion of a spawned network call.
pub enum NetMsg {
    PlanDone(Result<PlanResponse, String>),
    ExecuteDone(Result<ExecuteResult, String>),
}

/// Main application state.
pub struct App {
    /// API client shared with spawned transport tasks
    client: Arc<ApiClient>,
    /// Deployment label for plan calls
    deployment: String,
    /// Connector identifier for plan and execute calls
    connector: String,
    /// Row cap passed to execute calls
    row_limit: u32,
    /// Retention bound for a fresh log buffer
    log_retention: usize,

    /// Current view mode
    pub view_mode: ViewMode,
    /// Focused pane in the chat view
    pub focus: ChatFocus,
    /// Conversation session state machine
    pub session: Session,
    /// Question being typed
    pub input: String,
    /// Candidate table selection state
    pub candidate_state: TableState,

    /// Log lines for the log view
    pub log_buffer: LogBuffer,
    /// Notice shown once the stream has ended
    pub stream_notice: Option<String>,
    /// The open log stream, if any (at most one)
    log_stream: Option<LogStream>,

    /// Sender cloned into spawned transport tasks
    net_tx: mpsc::UnboundedSender<NetMsg>,
    /// Completions drained each tick
    net_rx: mpsc::UnboundedReceiver<NetMsg>,

    /// Whether the app should exit
    pub should_quit: bool,
}

impl App {
    /// Create a new App talking to `client`.
    pub fn new(client: Arc<ApiClient>, deployment: String, connector: String, config: &Config) -> Self {
        let (net_tx, net_rx) = mpsc::unbounded_channel();
        Self {
            client,
            deployment,
            connector,
            row_limit: config.api.row_limit,
            log_retention: config.stream.retention,
            view_mode: ViewMode::default(),
            focus: ChatFocus::default(),
            session: Session::default(),
            input: String::new(),
            candidate_state: TableState::default(),
            log_buffer: LogBuffer::new(config.stream.retention),
            stream_notice: None,
            log_stream: None,
            net_tx,
            net_rx,
            should_quit: false,
        }
    }

    /// The connector this console plans and executes against.
    pub fn connector(&self) -> &str {
        &self.connector
    }

    /// The deployment this console plans against.
    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// Apply completed network calls and any buffered log lines.
    pub fn drain_events(&mut self) {
        while let Ok(msg) = self.net_rx.try_recv() {
            match msg {
                NetMsg::PlanDone(outcome) => {
                    let succeeded = outcome.is_ok();
                    self.session.finish_plan(outcome);
                    if succeeded {
                        self.input.clear();
                        if self.session.candidates().is_empty() {
                            self.candidate_state.select(None);
                        } else {
                            self.candidate_state.select(Some(0));
                            self.focus = ChatFocus::Candidates;
                        }
                    }
                }
                NetMsg::ExecuteDone(outcome) => self.session.finish_execute(outcome),
            }
        }

        if let Some(stream) = self.log_stream.as_mut() {
            while let Some(event) = stream.try_next() {
                match event {
                    StreamEvent::Line(line) => self.log_buffer.push(line),
                    StreamEvent::Closed { reason } => {
                        self.stream_notice = Some(match reason {
                            Some(reason) => format!("stream ended: {}", reason),
                            None => "stream ended".to_string(),
                        });
                        stream.close();
                    }
                }
            }
        }
    }

    /// Handle a key event.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.view_mode {
            ViewMode::Chat => self.handle_chat_key(key),
            ViewMode::Logs { .. } => self.handle_logs_key(key),
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    ChatFocus::Input => ChatFocus::Candidates,
                    ChatFocus::Candidates => ChatFocus::Input,
                };
            }
            KeyCode::Esc => {
                self.should_quit = true;
            }
            _ => match self.focus {
                ChatFocus::Input => self.handle_input_key(key),
                ChatFocus::Candidates => self.handle_candidates_key(key),
            },
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                self.input.push(c);
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => {
                self.submit_question();
            }
            _ => {}
        }
    }

    fn handle_candidates_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.select_candidate(-1),
            KeyCode::Down => self.select_candidate(1),
            KeyCode::Enter => self.approve_selected(),
            KeyCode::Char('l') => {
                if let Some(run_id) = self.session.run_id().map(str::to_string) {
                    self.open_logs(run_id);
                }
            }
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn handle_logs_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.close_logs(),
            _ => {}
        }
    }

    /// Move the candidate selection by `delta`, clamped to the table.
    fn select_candidate(&mut self, delta: i64) {
        let len = self.session.candidates().len();
        if len == 0 {
            self.candidate_state.select(None);
            return;
        }
        let current = self.candidate_state.selected().unwrap_or(0) as i64;
        let next = (current + delta).clamp(0, len as i64 - 1) as usize;
        self.candidate_state.select(Some(next));
    }

    /// Submit the typed question as a plan request.
    ///
    /// The session's guards decide whether a call happens: while one is
    /// pending, or with empty input, nothing is spawned.
    fn submit_question(&mut self) {
        let question = self.input.trim().to_string();
        if self.session.begin_plan(&question, &self.connector).is_err() {
            // The session recorded the rejection in last_error
            return;
        }

        let client = Arc::clone(&self.client);
        let deployment = self.deployment.clone();
        let connector = self.connector.clone();
        let tx = self.net_tx.clone();
        tokio::spawn(async move {
            let outcome = client
                .plan(&question, &deployment, &connector)
                .await
                .map_err(|e| e.detail());
            let _ = tx.send(NetMsg::PlanDone(outcome));
        });
    }

    /// Approve the selected candidate and execute it.
    fn approve_selected(&mut self) {
        let Some(index) = self.candidate_state.selected() else {
            return;
        };
        let Some(candidate) = self.session.candidates().get(index) else {
            return;
        };
        let sql = candidate.sql.clone();

        let run_id = match self.session.begin_execute(&sql) {
            Ok(run_id) => run_id,
            Err(_) => return,
        };

        let client = Arc::clone(&self.client);
        let connector = self.connector.clone();
        let limit = self.row_limit;
        let tx = self.net_tx.clone();
        tokio::spawn(async move {
            let outcome = client
                .execute(&run_id, &connector, &sql, limit)
                .await
                .map_err(|e| e.detail());
            let _ = tx.send(NetMsg::ExecuteDone(outcome));
        });
    }

    /// Switch to the log view for `run_id`, replacing any open stream.
    pub fn open_logs(&mut self, run_id: String) {
        if let Some(mut stream) = self.log_stream.take() {
            stream.close();
        }
        self.log_buffer = LogBuffer::new(self.log_retention);
        self.stream_notice = None;
        self.log_stream = Some(LogStream::open(&self.client, &run_id));
        self.view_mode = ViewMode::Logs { run_id };
    }

    /// Leave the log view, releasing the stream.
    fn close_logs(&mut self) {
        if let Some(mut stream) = self.log_stream.take() {
            stream.close();
        }
        self.view_mode = ViewMode::Chat;
    }
}
