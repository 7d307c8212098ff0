//! Live log tailing for a run
//!
//! A [`LogStream`] owns one SSE channel to `GET /runs/{id}/logs/stream` and
//! delivers each log line as it arrives. On any channel error the stream
//! reports [`StreamEvent::Closed`] once and stops; there is no automatic
//! reconnect - the owning view re-opens on user navigation if it wants to
//! keep tailing.

use std::collections::VecDeque;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::ApiClient;

/// Bounded ring of the most recent log lines for one run.
///
/// Not a log store: old lines are discarded silently once the retention
/// bound is hit.
#[derive(Debug)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    retention: usize,
}

impl LogBuffer {
    /// Create an empty buffer holding at most `retention` lines.
    pub fn new(retention: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            retention,
        }
    }

    /// Append a line, discarding the oldest lines past the retention bound.
    pub fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.retention {
            self.lines.pop_front();
        }
    }

    /// Lines in arrival order, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Event delivered by a [`LogStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One log line arrived.
    Line(String),
    /// The channel ended. Sent at most once, always last.
    Closed { reason: Option<String> },
}

/// Incremental parser for the SSE wire format.
///
/// Only `data:` fields matter for the log feed; `event:`/`id:`/`retry:`
/// fields and `:` comments are skipped. A blank line dispatches the
/// accumulated event, with multi-line data joined by `\n`.
#[derive(Debug, Default)]
pub struct SseParser {
    /// Raw text not yet terminated by a newline
    pending: String,
    /// Data lines of the event being assembled
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the response body, returning any completed event
    /// payloads.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let mut events = Vec::new();
        self.pending.push_str(chunk);

        while let Some(pos) = self.pending.find('\n') {
            let raw: String = self.pending.drain(..=pos).collect();
            let line = raw.trim_end_matches('\n').trim_end_matches('\r');
            self.consume_line(line, &mut events);
        }

        events
    }

    fn consume_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(self.data.join("\n"));
                self.data.clear();
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // ':' comments and event:/id:/retry: fields carry nothing for us
    }
}

/// A live subscription to one run's log feed.
///
/// Dropping the stream closes it; [`LogStream::close`] is idempotent.
pub struct LogStream {
    run_id: String,
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    task: Option<JoinHandle<()>>,
}

impl LogStream {
    /// Open the SSE channel for `run_id` and start reading in the
    /// background.
    ///
    /// Must be called within a tokio runtime.
    pub fn open(client: &ApiClient, run_id: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let url = client.logs_url(run_id);
        let id = run_id.to_string();

        let task = tokio::spawn(async move {
            read_stream(url, id, tx).await;
        });

        Self {
            run_id: run_id.to_string(),
            rx,
            task: Some(task),
        }
    }

    /// The run this stream tails
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Non-blocking poll for the next event.
    pub fn try_next(&mut self) -> Option<StreamEvent> {
        self.rx.try_recv().ok()
    }

    /// Await the next event. Returns `None` once the reader is gone and the
    /// channel is drained.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Stop reading. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(run_id = %self.run_id, "log stream closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read the SSE body, forwarding one [`StreamEvent::Line`] per event and
/// ending with a single [`StreamEvent::Closed`].
async fn read_stream(url: String, run_id: String, tx: mpsc::UnboundedSender<StreamEvent>) {
    tracing::debug!(run_id = %run_id, url = %url, "opening log stream");

    // The API client's request timeout would cut a long-lived tail short,
    // so the reader uses its own client with only a connect timeout.
    let http = match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
    {
        Ok(http) => http,
        Err(e) => {
            let _ = tx.send(StreamEvent::Closed {
                reason: Some(format!("failed to create HTTP client: {}", e)),
            });
            return;
        }
    };

    let response = match http.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(StreamEvent::Closed {
                reason: Some(format!("connect failed: {}", e)),
            });
            return;
        }
    };

    if !response.status().is_success() {
        let _ = tx.send(StreamEvent::Closed {
            reason: Some(format!("stream rejected: {}", response.status())),
        });
        return;
    }

    let mut parser = SseParser::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                for line in parser.feed(&text) {
                    if tx.send(StreamEvent::Line(line)).is_err() {
                        // receiver dropped
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "log stream error");
                let _ = tx.send(StreamEvent::Closed {
                    reason: Some(format!("stream error: {}", e)),
                });
                return;
            }
        }
    }

    tracing::debug!(run_id = %run_id, "log stream ended");
    let _ = tx.send(StreamEvent::Closed { reason: None });
}
