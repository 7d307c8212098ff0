//! Conversation session state machine
//!
//! Sans-IO: the session never touches the network. A caller pairs a
//! `begin_*` call with a `finish_*` call and delivers the transport outcome
//! as a plain `Result`, so the machine consumes a discriminated result
//! rather than inspecting response shapes. Successful updates are applied in
//! one place - a request either lands atomically or not at all.
//!
//! At most one request may be in flight: `begin_*` rejects re-entrant calls
//! without mutating anything, so the guard holds for any caller, not just a
//! disabled UI trigger.

use crate::error::{Error, Result};
use crate::types::{ExecuteResult, Message, PlanCandidate, PlanResponse};

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No run yet
    #[default]
    Idle,
    /// Plan request in flight
    Planning,
    /// Candidates and/or clarifications populated, run identity set
    PlanReady,
    /// Execute request in flight
    Executing,
    /// Result populated
    Executed,
}

/// Bookkeeping for the single in-flight request.
#[derive(Debug, Clone)]
enum InFlight {
    Plan { question: String, prior: Phase },
    Execute { prior: Phase },
}

/// The mutable aggregate for one plan -> execute conversation.
///
/// Owned by exactly one view for its lifetime; discarded with it.
#[derive(Debug, Default)]
pub struct Session {
    phase: Phase,
    run_id: Option<String>,
    candidates: Vec<PlanCandidate>,
    clarifications: Vec<String>,
    last_result: Option<ExecuteResult>,
    messages: Vec<Message>,
    last_error: Option<String>,
    in_flight: Option<InFlight>,
}

impl Session {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run identity of the current conversation, if a plan has succeeded.
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn candidates(&self) -> &[PlanCandidate] {
        &self.candidates
    }

    pub fn clarifications(&self) -> &[String] {
        &self.clarifications
    }

    pub fn last_result(&self) -> Option<&ExecuteResult> {
        self.last_result.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True while a plan or execute request is outstanding.
    pub fn pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start planning `question` against `connector`.
    ///
    /// Rejects re-entrant calls while a request is in flight (nothing is
    /// mutated). Validation failures set `last_error` and leave the rest of
    /// the session untouched - no network call should follow. On success the
    /// previous run's candidates, clarifications and result are discarded
    /// and the session enters [`Phase::Planning`]; deliver the transport
    /// outcome to [`Session::finish_plan`].
    pub fn begin_plan(&mut self, question: &str, connector: &str) -> Result<()> {
        if self.in_flight.is_some() {
            return Err(Error::Validation(
                "a request is already in flight".to_string(),
            ));
        }
        self.last_error = None;

        if question.trim().is_empty() {
            return self.reject("enter a question before planning");
        }
        if connector.trim().is_empty() {
            return self.reject("a connector is required for planning");
        }

        self.in_flight = Some(InFlight::Plan {
            question: question.to_string(),
            prior: self.phase,
        });
        self.candidates.clear();
        self.clarifications.clear();
        self.last_result = None;
        self.phase = Phase::Planning;
        Ok(())
    }

    /// Apply the outcome of the plan call started by
    /// [`Session::begin_plan`].
    ///
    /// Success replaces the candidate set and appends the question plus a
    /// synthesized summary to the transcript. Failure records the detail and
    /// restores the pre-call phase; a previously held run identity survives.
    pub fn finish_plan(&mut self, outcome: std::result::Result<PlanResponse, String>) {
        match self.in_flight.take() {
            Some(InFlight::Plan { question, prior }) => match outcome {
                Ok(response) => {
                    let summary = plan_summary(&response);
                    self.run_id = Some(response.run_id);
                    self.candidates = response.candidates;
                    self.clarifications = response.clarifications;
                    self.messages.push(Message::user(question));
                    self.messages.push(Message::assistant(summary));
                    self.phase = Phase::PlanReady;
                }
                Err(detail) => {
                    self.last_error = Some(detail);
                    self.phase = prior;
                }
            },
            other => {
                self.in_flight = other;
                tracing::warn!("finish_plan without a plan in flight; result dropped");
            }
        }
    }

    /// Start executing an approved candidate.
    ///
    /// Requires a run identity from a prior successful plan; without one
    /// this is a validation error and no network call may follow. Returns
    /// the run id to execute against. Valid from [`Phase::PlanReady`] or
    /// [`Phase::Executed`] - re-executing another candidate of the same run
    /// simply replaces the result.
    pub fn begin_execute(&mut self, approved_sql: &str) -> Result<String> {
        if self.in_flight.is_some() {
            return Err(Error::Validation(
                "a request is already in flight".to_string(),
            ));
        }
        self.last_error = None;

        let Some(run_id) = self.run_id.clone() else {
            return self.reject("no run to execute against; plan a question first");
        };
        if approved_sql.trim().is_empty() {
            return self.reject("cannot execute an empty SQL statement");
        }

        self.in_flight = Some(InFlight::Execute { prior: self.phase });
        self.phase = Phase::Executing;
        Ok(run_id)
    }

    /// Apply the outcome of the execute call started by
    /// [`Session::begin_execute`].
    pub fn finish_execute(&mut self, outcome: std::result::Result<ExecuteResult, String>) {
        match self.in_flight.take() {
            Some(InFlight::Execute { prior }) => match outcome {
                Ok(result) => {
                    self.messages.push(Message::assistant(execute_summary(&result)));
                    self.last_result = Some(result);
                    self.phase = Phase::Executed;
                }
                Err(detail) => {
                    self.last_error = Some(detail);
                    self.phase = prior;
                }
            },
            other => {
                self.in_flight = other;
                tracing::warn!("finish_execute without an execute in flight; result dropped");
            }
        }
    }

    fn reject<T>(&mut self, message: &str) -> Result<T> {
        self.last_error = Some(message.to_string());
        Err(Error::Validation(message.to_string()))
    }
}

/// Transcript summary for a successful plan response.
fn plan_summary(response: &PlanResponse) -> String {
    let mut summary = match response.candidates.len() {
        0 => format!("No SQL candidates proposed (run {}).", response.run_id),
        1 => format!(
            "Proposed 1 SQL candidate (run {}). Approve it to execute.",
            response.run_id
        ),
        n => format!(
            "Proposed {} SQL candidates (run {}). Approve one to execute.",
            n, response.run_id
        ),
    };
    if !response.clarifications.is_empty() {
        summary.push_str(&format!(
            " The planner asked {} clarification question(s).",
            response.clarifications.len()
        ));
    }
    summary
}

/// Transcript summary for a successful execute result.
fn execute_summary(result: &ExecuteResult) -> String {
    format!(
        "Returned {} row(s). Result reference: {}.",
        result.row_count, result.result_ref
    )
}
