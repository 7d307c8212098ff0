//! Integration tests for the conversation session state machine
//!
//! These drive the full plan -> approve -> execute flow with decoded wire
//! payloads, exercising the same path the TUI uses: `begin_*` followed by a
//! `finish_*` carrying the transport outcome.

use nl2sql_console_core::{ExecuteResult, Phase, PlanResponse, Role, Session};

/// Decode a plan response the way the API client does
fn plan_response(json: &str) -> PlanResponse {
    serde_json::from_str(json).expect("plan response should decode")
}

/// Decode an execute result the way the API client does
fn execute_result(json: &str) -> ExecuteResult {
    serde_json::from_str(json).expect("execute result should decode")
}

// ============================================
// Plan flow
// ============================================

#[test]
fn test_plan_flow_reaches_plan_ready() {
    let mut session = Session::default();

    session
        .begin_plan("How many orders yesterday?", "orders_db")
        .expect("valid question should start planning");
    assert_eq!(session.phase(), Phase::Planning);
    assert!(session.pending());

    session.finish_plan(Ok(plan_response(
        r#"{
            "run_id": "r1",
            "candidates": [{
                "sql": "SELECT COUNT(*) FROM orders WHERE placed_at >= CURRENT_DATE - 1",
                "rationale": "Count rows placed yesterday",
                "explain_summary": "Index range scan on placed_at",
                "est_cost": 12.3
            }],
            "clarifications": []
        }"#,
    )));

    assert_eq!(session.phase(), Phase::PlanReady);
    assert_eq!(session.run_id(), Some("r1"));
    assert_eq!(session.candidates().len(), 1);
    assert_eq!(session.candidates()[0].est_cost, 12.3);

    // Transcript gained the question and a summary
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[0].role, Role::User);
    assert_eq!(session.messages()[0].content, "How many orders yesterday?");
    assert_eq!(session.messages()[1].role, Role::Assistant);
    assert!(session.messages()[1].content.contains("r1"));
}

#[test]
fn test_replan_clears_stale_state() {
    let mut session = Session::default();

    session.begin_plan("first question", "orders_db").unwrap();
    session.finish_plan(Ok(plan_response(
        r#"{"run_id": "r1",
            "candidates": [{"sql": "SELECT 1", "rationale": "", "explain_summary": "", "est_cost": 0.0}],
            "clarifications": ["Which region?"]}"#,
    )));
    session.begin_execute("SELECT 1").unwrap();
    session.finish_execute(Ok(execute_result(
        r#"{"rows": [{"n": 1}], "row_count": 1, "result_ref": "res-0"}"#,
    )));
    assert_eq!(session.phase(), Phase::Executed);

    // A new successful plan leaves no residue from the previous run
    session.begin_plan("second question", "orders_db").unwrap();
    session.finish_plan(Ok(plan_response(
        r#"{"run_id": "r2",
            "candidates": [{"sql": "SELECT 2", "rationale": "", "explain_summary": "", "est_cost": 0.0}],
            "clarifications": []}"#,
    )));

    assert_eq!(session.run_id(), Some("r2"));
    assert_eq!(session.candidates().len(), 1);
    assert_eq!(session.candidates()[0].sql, "SELECT 2");
    assert!(session.clarifications().is_empty());
    assert!(session.last_result().is_none());
}

#[test]
fn test_plan_backend_rejection_returns_to_idle() {
    let mut session = Session::default();

    session.begin_plan("q", "orders_db").unwrap();
    session.finish_plan(Err("connector unreachable".to_string()));

    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.run_id().is_none());
    assert!(session.candidates().is_empty());
    assert_eq!(session.last_error(), Some("connector unreachable"));
}

// ============================================
// Execute flow
// ============================================

#[test]
fn test_execute_flow_reaches_executed() {
    let mut session = Session::default();
    session.begin_plan("q", "orders_db").unwrap();
    session.finish_plan(Ok(plan_response(
        r#"{"run_id": "r1",
            "candidates": [{"sql": "SELECT COUNT(*) FROM orders", "rationale": "", "explain_summary": "", "est_cost": 0.0}],
            "clarifications": []}"#,
    )));

    let run_id = session
        .begin_execute("SELECT COUNT(*) FROM orders")
        .expect("run exists, execute should start");
    assert_eq!(run_id, "r1");
    assert_eq!(session.phase(), Phase::Executing);

    session.finish_execute(Ok(execute_result(
        r#"{"rows": [{"count": 1}, {"count": 2}, {"count": 3}],
            "row_count": 3,
            "result_ref": "res-1"}"#,
    )));

    assert_eq!(session.phase(), Phase::Executed);
    let result = session.last_result().expect("result recorded");
    assert_eq!(result.row_count, 3);
    assert_eq!(result.row_count as usize, result.rows.len());

    // Transcript gained one assistant message referencing the result
    assert_eq!(session.messages().len(), 3);
    assert!(session.messages()[2].content.contains("res-1"));
    assert!(session.messages()[2].content.contains('3'));
}

#[test]
fn test_reexecute_replaces_result() {
    let mut session = Session::default();
    session.begin_plan("q", "orders_db").unwrap();
    session.finish_plan(Ok(plan_response(
        r#"{"run_id": "r1",
            "candidates": [
                {"sql": "SELECT 1", "rationale": "", "explain_summary": "", "est_cost": 0.0},
                {"sql": "SELECT 2", "rationale": "", "explain_summary": "", "est_cost": 0.0}
            ],
            "clarifications": []}"#,
    )));

    session.begin_execute("SELECT 1").unwrap();
    session.finish_execute(Ok(execute_result(
        r#"{"rows": [{"n": 1}], "row_count": 1, "result_ref": "res-1"}"#,
    )));

    // Approving another candidate of the same run is allowed
    session.begin_execute("SELECT 2").unwrap();
    session.finish_execute(Ok(execute_result(
        r#"{"rows": [{"n": 2}], "row_count": 1, "result_ref": "res-2"}"#,
    )));

    assert_eq!(session.phase(), Phase::Executed);
    assert_eq!(session.last_result().unwrap().result_ref, "res-2");
}

#[test]
fn test_execute_failure_restores_plan_ready() {
    let mut session = Session::default();
    session.begin_plan("q", "orders_db").unwrap();
    session.finish_plan(Ok(plan_response(
        r#"{"run_id": "r1",
            "candidates": [{"sql": "SELECT 1", "rationale": "", "explain_summary": "", "est_cost": 0.0}],
            "clarifications": ["Which timezone?"]}"#,
    )));

    session.begin_execute("SELECT 1").unwrap();
    session.finish_execute(Err("permission denied for table orders".to_string()));

    assert_eq!(session.phase(), Phase::PlanReady);
    assert_eq!(session.candidates().len(), 1);
    assert_eq!(session.clarifications().len(), 1);
    assert_eq!(session.run_id(), Some("r1"));
    assert_eq!(
        session.last_error(),
        Some("permission denied for table orders")
    );

    // The failed attempt appended nothing to the transcript
    assert_eq!(session.messages().len(), 2);
}

// ============================================
// Guards
// ============================================

#[test]
fn test_validation_failures_never_enter_flight() {
    let mut session = Session::default();

    assert!(session.begin_plan("   ", "orders_db").is_err());
    assert!(!session.pending());

    assert!(session.begin_execute("SELECT 1").is_err());
    assert!(!session.pending());

    // Transcript untouched by local rejections
    assert!(session.messages().is_empty());
}

#[test]
fn test_transcript_is_append_only_across_flow() {
    let mut session = Session::default();
    let mut lengths = vec![session.messages().len()];

    session.begin_plan("q1", "c").unwrap();
    session.finish_plan(Ok(plan_response(
        r#"{"run_id": "r1",
            "candidates": [{"sql": "SELECT 1", "rationale": "", "explain_summary": "", "est_cost": 0.0}],
            "clarifications": []}"#,
    )));
    lengths.push(session.messages().len());

    session.begin_execute("SELECT 1").unwrap();
    session.finish_execute(Ok(execute_result(
        r#"{"rows": [], "row_count": 0, "result_ref": "res-1"}"#,
    )));
    lengths.push(session.messages().len());

    session.begin_plan("q2", "c").unwrap();
    session.finish_plan(Err("planner offline".to_string()));
    lengths.push(session.messages().len());

    assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(lengths.last(), Some(&3));
}
