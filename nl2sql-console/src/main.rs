//! nl2sql-console - conversational front end to the nl2sql service
//!
//! Terminal UI for asking a question, approving one of the proposed SQL
//! candidates, executing it against a connector, and tailing a run's logs.

mod app;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nl2sql_console_core::{ApiClient, Config};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::App;

#[derive(Parser)]
#[command(name = "nl2sql-console")]
#[command(about = "Ask questions, approve SQL, watch run logs")]
#[command(version)]
struct Args {
    /// Override the API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Deployment label to plan against
    #[arg(long)]
    deployment: Option<String>,

    /// Connector identifier to plan and execute against
    #[arg(long)]
    connector: Option<String>,

    /// Open the log view for this run id instead of the chat view
    #[arg(long, value_name = "RUN_ID")]
    logs: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
    }

    // Initialize logging (to file, not stdout since we have a TUI)
    let _log_guard =
        nl2sql_console_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("nl2sql-console starting up");

    let deployment = args
        .deployment
        .or_else(|| config.defaults.deployment.clone())
        .context("no deployment given; pass --deployment or set [defaults] deployment in config")?;
    let connector = args
        .connector
        .or_else(|| config.defaults.connector.clone())
        .context("no connector given; pass --connector or set [defaults] connector in config")?;

    let client = Arc::new(ApiClient::new(&config.api).context("failed to create API client")?);
    tracing::info!(base_url = %client.base_url(), "Using nl2sql service");

    if !client.health().await {
        tracing::warn!(base_url = %client.base_url(), "health probe failed; the service may be unreachable");
    }

    let mut app = App::new(client, deployment, connector, &config);
    if let Some(run_id) = args.logs {
        app.open_logs(run_id);
    }

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    tracing::info!("nl2sql-console shutting down");

    result
}

/// Run the main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Apply completed network calls and buffered log lines
        app.drain_events();

        // Render
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    Ok(())
}
