//! Domain and wire types for the plan/execute conversation.
//!
//! Wire field names follow the backend contract (`run_id`, `est_cost`,
//! `row_count`, ...), so the serde defaults of snake_case line up without
//! renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of one transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Immutable once appended; the transcript itself is
/// an append-only ordered sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// When the entry was appended
    pub at: DateTime<Utc>,
}

impl Message {
    /// A user-authored entry, stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            at: Utc::now(),
        }
    }

    /// An assistant-authored entry, stamped now.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// One proposed SQL statement from the planner.
///
/// `sql` is unique within a single plan response and serves as the identity
/// key for selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCandidate {
    pub sql: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub explain_summary: String,
    #[serde(default)]
    pub est_cost: f64,
}

/// Response from `POST /inference/plan`
#[derive(Debug, Clone, Deserialize)]
pub struct PlanResponse {
    /// Run identity; created only by a successful plan call
    pub run_id: String,
    #[serde(default)]
    pub candidates: Vec<PlanCandidate>,
    #[serde(default)]
    pub clarifications: Vec<String>,
}

/// Outcome of executing one approved candidate, from
/// `POST /inference/execute`
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResult {
    /// Result rows, each a column -> value mapping in column order
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Row count; normalized by the client to `rows.len()` after decode
    pub row_count: u64,
    /// Handle for out-of-band retrieval; never re-fetched by the console
    #[serde(default)]
    pub result_ref: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roles() {
        let user = Message::user("How many orders yesterday?");
        assert_eq!(user.role, Role::User);
        let assistant = Message::assistant("Proposed 1 SQL candidate.");
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn test_decode_plan_response() {
        let json = r#"{
            "run_id": "r1",
            "candidates": [
                {"sql": "SELECT COUNT(*) FROM orders", "rationale": "count rows", "explain_summary": "seq scan", "est_cost": 12.3}
            ],
            "clarifications": ["Which timezone is 'yesterday'?"]
        }"#;
        let response: PlanResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.run_id, "r1");
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].est_cost, 12.3);
        assert_eq!(response.clarifications.len(), 1);
    }

    #[test]
    fn test_decode_plan_response_missing_optionals() {
        let response: PlanResponse = serde_json::from_str(r#"{"run_id": "r2"}"#).unwrap();
        assert!(response.candidates.is_empty());
        assert!(response.clarifications.is_empty());
    }

    #[test]
    fn test_decode_execute_result() {
        let json = r#"{
            "rows": [{"count": 42}],
            "row_count": 1,
            "result_ref": "res-1"
        }"#;
        let result: ExecuteResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.result_ref, "res-1");
        assert_eq!(result.rows[0]["count"], 42);
    }
}
