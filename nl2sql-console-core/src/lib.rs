//! # nl2sql-console-core
//!
//! Core library for nl2sql-console - a terminal front end to the nl2sql
//! inference service.
//!
//! This library provides:
//! - Wire and transcript types for the plan/execute conversation
//! - An HTTP client for the two inference endpoints
//! - A log stream reader tailing a run's SSE log feed
//! - The conversation session state machine
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! The session state machine is sans-IO: the TUI (or any other caller) pairs
//! a `begin_*` call with a `finish_*` call, delivering the transport outcome
//! as a plain result. All network work lives in [`ApiClient`] and
//! [`LogStream`]; all state lives in [`Session`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use nl2sql_console_core::{ApiClient, Config, Session};
//!
//! # async fn demo() -> nl2sql_console_core::Result<()> {
//! let config = Config::load()?;
//! let client = ApiClient::new(&config.api)?;
//!
//! let mut session = Session::default();
//! session.begin_plan("How many orders yesterday?", "orders_db")?;
//! let outcome = client.plan("How many orders yesterday?", "dev", "orders_db").await;
//! session.finish_plan(outcome.map_err(|e| e.detail()));
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use api::ApiClient;
pub use config::Config;
pub use error::{Error, Result};
pub use session::{Phase, Session};
pub use stream::{LogBuffer, LogStream, SseParser, StreamEvent};
pub use types::*;

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod stream;
pub mod types;
