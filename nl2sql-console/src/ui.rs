//! UI rendering for the TUI.

use chrono::Local;
use nl2sql_console_core::{Phase, Role};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, ChatFocus, ViewMode};

/// User message prefix color
const USER_COLOR: Color = Color::Rgb(0, 180, 180);
/// Assistant message prefix color
const ASSISTANT_COLOR: Color = Color::Rgb(80, 160, 80);
/// Clarification text color
const CLARIFICATION_COLOR: Color = Color::Rgb(220, 180, 0);
/// Border color for the focused pane
const BORDER_FOCUSED: Color = Color::Rgb(0, 150, 150);
/// Border color for unfocused panes
const BORDER_DIM: Color = Color::Rgb(60, 60, 60);
/// Error text color
const ERROR_COLOR: Color = Color::Rgb(220, 80, 80);
/// Log line color
const LOG_COLOR: Color = Color::Rgb(0, 180, 180);

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    match app.view_mode.clone() {
        ViewMode::Chat => render_chat_view(frame, app),
        ViewMode::Logs { run_id } => render_logs_view(frame, app, &run_id),
    }
}

/// Render the conversation view.
fn render_chat_view(frame: &mut Frame, app: &mut App) {
    let has_result = app.session.last_result().is_some();

    let mut constraints = vec![
        Constraint::Min(5),    // transcript
        Constraint::Length(9), // candidates
    ];
    if has_result {
        constraints.push(Constraint::Length(9)); // result rows
    }
    constraints.push(Constraint::Length(3)); // input
    constraints.push(Constraint::Length(1)); // status

    let chunks = Layout::vertical(constraints).split(frame.area());

    render_transcript(frame, app, chunks[0]);
    render_candidates(frame, app, chunks[1]);
    if has_result {
        render_result(frame, app, chunks[2]);
    }
    let input_area = chunks[chunks.len() - 2];
    let status_area = chunks[chunks.len() - 1];
    render_input(frame, app, input_area);
    render_status(frame, app, status_area);
}

/// Render the transcript pane, with any open clarifications at the bottom.
fn render_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    for message in app.session.messages() {
        let (prefix, color) = match message.role {
            Role::User => ("you", USER_COLOR),
            Role::Assistant => ("nl2sql", ASSISTANT_COLOR),
        };
        let stamp = message.at.with_timezone(&Local).format("%H:%M:%S");
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} {} ", stamp, prefix),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(message.content.clone()),
        ]));
    }

    for clarification in app.session.clarifications() {
        lines.push(Line::from(Span::styled(
            format!("? {}", clarification),
            Style::default().fg(CLARIFICATION_COLOR),
        )));
    }

    // Keep the newest lines visible
    let visible = area.height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);
    let lines: Vec<Line> = lines.into_iter().skip(skip).collect();

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BORDER_DIM))
                .title(" Conversation "),
        );
    frame.render_widget(paragraph, area);
}

/// Render the candidate table.
fn render_candidates(frame: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == ChatFocus::Candidates;

    let header = Row::new(vec!["SQL", "Rationale", "Cost"]).style(
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .session
        .candidates()
        .iter()
        .map(|candidate| {
            Row::new(vec![
                Cell::from(candidate.sql.clone()),
                Cell::from(candidate.rationale.clone()),
                Cell::from(format!("{:.1}", candidate.est_cost)),
            ])
        })
        .collect();

    let title = match app.session.run_id() {
        Some(run_id) => format!(" Candidates (run {}) ", run_id),
        None => " Candidates ".to_string(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(55),
            Constraint::Percentage(35),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(40, 60, 60))
            .add_modifier(Modifier::BOLD),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { BORDER_FOCUSED } else { BORDER_DIM }))
            .title(title),
    );

    frame.render_stateful_widget(table, area, &mut app.candidate_state);
}

/// Render the result rows of the last execute.
fn render_result(frame: &mut Frame, app: &App, area: Rect) {
    let Some(result) = app.session.last_result() else {
        return;
    };

    let columns: Vec<String> = result
        .rows
        .first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();

    let header = Row::new(columns.iter().map(|c| Cell::from(c.clone()))).style(
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = result
        .rows
        .iter()
        .map(|row| {
            Row::new(
                columns
                    .iter()
                    .map(|column| Cell::from(render_value(row.get(column))))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let widths = vec![Constraint::Ratio(1, columns.len().max(1) as u32); columns.len().max(1)];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BORDER_DIM))
            .title(format!(
                " Result: {} row(s), ref {} ",
                result.row_count, result.result_ref
            )),
    );

    frame.render_widget(table, area);
}

/// Render a result cell value without JSON string quoting.
fn render_value(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Render the question input line.
fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == ChatFocus::Input;

    let paragraph = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { BORDER_FOCUSED } else { BORDER_DIM }))
            .title(format!(
                " Ask ({} @ {}) ",
                app.deployment(),
                app.connector()
            )),
    );
    frame.render_widget(paragraph, area);

    if focused {
        frame.set_cursor_position((area.x + 1 + app.input.len() as u16, area.y + 1));
    }
}

/// Render the status line: pending indicator, error, or key hints.
fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = if app.session.pending() {
        let verb = match app.session.phase() {
            Phase::Planning => "planning...",
            Phase::Executing => "executing...",
            _ => "working...",
        };
        Line::from(Span::styled(verb, Style::default().fg(CLARIFICATION_COLOR)))
    } else if let Some(error) = app.session.last_error() {
        Line::from(Span::styled(error.to_string(), Style::default().fg(ERROR_COLOR)))
    } else {
        Line::from(Span::styled(
            "Enter: ask | Tab: focus candidates | Enter: approve | l: logs | Esc: quit",
            Style::default().fg(Color::DarkGray),
        ))
    };

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the log tail view.
fn render_logs_view(frame: &mut Frame, app: &App, run_id: &str) {
    let chunks = Layout::vertical([
        Constraint::Min(1),    // log lines
        Constraint::Length(1), // status
    ])
    .split(frame.area());

    // Show the newest lines that fit
    let visible = chunks[0].height.saturating_sub(2) as usize;
    let skip = app.log_buffer.len().saturating_sub(visible);

    let items: Vec<ListItem> = app
        .log_buffer
        .lines()
        .skip(skip)
        .map(|line| ListItem::new(Span::styled(line.to_string(), Style::default().fg(LOG_COLOR))))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BORDER_DIM))
            .title(format!(" Logs: run {} ", run_id)),
    );
    frame.render_widget(list, chunks[0]);

    let status = match &app.stream_notice {
        Some(notice) => Line::from(Span::styled(
            format!("{} | Esc: back", notice),
            Style::default().fg(CLARIFICATION_COLOR),
        )),
        None => Line::from(Span::styled(
            "tailing... | Esc: back",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(status), chunks[1]);
}
