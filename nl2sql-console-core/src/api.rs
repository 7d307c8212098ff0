//! HTTP client for the nl2sql inference API
//!
//! The client performs exactly two request/response operations, `plan` and
//! `execute`, plus a health probe. Every call is a single attempt: failures
//! are surfaced to the caller and never retried here.

use std::time::Duration;

use serde::Serialize;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{ExecuteResult, PlanResponse};

/// HTTP client for the nl2sql service
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

/// Request body for POST /inference/plan
#[derive(Serialize)]
struct PlanRequest<'a> {
    question: &'a str,
    deployment: &'a str,
    connector: &'a str,
}

/// Request body for POST /inference/execute
#[derive(Serialize)]
struct ExecuteRequest<'a> {
    run_id: &'a str,
    connector: &'a str,
    approved_sql: &'a str,
    limit: u32,
}

impl ApiClient {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.resolved_base_url();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    /// The resolved base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the planner for SQL candidates answering `question`
    pub async fn plan(
        &self,
        question: &str,
        deployment: &str,
        connector: &str,
    ) -> Result<PlanResponse> {
        let url = format!("{}/inference/plan", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&PlanRequest {
                question,
                deployment,
                connector,
            })
            .send()
            .await
            .map_err(|e| Error::Http(format!("plan request failed: {}", e)))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("failed to decode plan response: {}", e)))
    }

    /// Execute one approved candidate against `connector`, capped at `limit`
    /// rows
    pub async fn execute(
        &self,
        run_id: &str,
        connector: &str,
        approved_sql: &str,
        limit: u32,
    ) -> Result<ExecuteResult> {
        let url = format!("{}/inference/execute", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&ExecuteRequest {
                run_id,
                connector,
                approved_sql,
                limit,
            })
            .send()
            .await
            .map_err(|e| Error::Http(format!("execute request failed: {}", e)))?;

        let response = check_status(response).await?;
        let result: ExecuteResult = response
            .json()
            .await
            .map_err(|e| Error::Http(format!("failed to decode execute response: {}", e)))?;

        Ok(normalize_row_count(result))
    }

    /// Check if the console can reach the service
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);

        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// SSE endpoint URL for a run's log feed
    pub(crate) fn logs_url(&self, run_id: &str) -> String {
        format!(
            "{}/runs/{}/logs/stream",
            self.base_url,
            urlencoding::encode(run_id)
        )
    }
}

/// Pass 2xx responses through; map anything else to [`Error::Api`] carrying
/// the backend's `detail` when the body has one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        detail: extract_detail(&body, status),
    })
}

/// Extract the `detail` field from an error body, falling back to the HTTP
/// status description.
fn extract_detail(body: &str, status: reqwest::StatusCode) -> String {
    let from_body = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        });

    from_body.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    })
}

/// Force `row_count` to match the rows actually received.
fn normalize_row_count(mut result: ExecuteResult) -> ExecuteResult {
    let observed = result.rows.len() as u64;
    if result.row_count != observed {
        tracing::warn!(
            reported = result.row_count,
            observed,
            "execute row_count disagrees with received rows"
        );
        result.row_count = observed;
    }
    result
}
