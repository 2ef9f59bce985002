//! Submission protocol: validate, re-run the visible suite against the current
//! code, wait for an explicit confirmation, then submit for grading.
//!
//! ```text
//! Idle -> Validating -> Executing -> LocalFailure -> Idle
//!                                 -> AwaitingConfirmation -> Idle (cancel)
//!                                    AwaitingConfirmation -> Submitting
//!                                    Submitting -> Accepted | Rejected -> Idle
//! ```
//!
//! `Submitting` is only reachable from `AwaitingConfirmation`, which holds
//! the fingerprint and language of the code that passed every visible test.
//! A failed submit call ends in `Rejected` as well.

use crate::attempt::Attempt;
use crate::checks::{advisory_findings, is_blank};
use crate::execution::{ExecutionClient, RunReport, into_outcome};
use crate::model::{SubmissionStatus, TestOutcome};
use crate::runner::{CodingApi, FinalStatus, SubmitRequest};
use crate::telemetry::TelemetryRecorder;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

pub const EMPTY_CODE: &str = "Please write some code before submitting.";
pub const NO_TEST_CASES: &str = "No test cases are available to validate your code.";
pub const NOTHING_TO_CONFIRM: &str = "There is no validated submission to confirm.";
pub const CODE_CHANGED: &str =
    "Your code changed after it was validated. Submit again to re-run the tests.";
pub const LANGUAGE_CHANGED: &str =
    "The language changed after your code was validated. Submit again to re-run the tests.";
pub const GENERIC_SUBMIT_FAILURE: &str = "Failed to submit solution. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Validating,
    Executing,
    LocalFailure,
    AwaitingConfirmation,
    Submitting,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone)]
struct PendingSubmission {
    fingerprint: String,
    language: String,
    run: RunReport,
}

#[derive(Debug, Clone)]
enum GateState {
    Idle,
    Validating,
    Executing,
    AwaitingConfirmation(PendingSubmission),
    Submitting,
}

impl GateState {
    fn phase(&self) -> Phase {
        match self {
            GateState::Idle => Phase::Idle,
            GateState::Validating => Phase::Validating,
            GateState::Executing => Phase::Executing,
            GateState::AwaitingConfirmation(_) => Phase::AwaitingConfirmation,
            GateState::Submitting => Phase::Submitting,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct Submission {
    pub id: String,
    pub problem_id: String,
    pub code: String,
    pub language: String,
    pub session_id: Option<String>,
    #[schema(value_type = String)]
    pub status: SubmissionStatus,
    /// The local run that allowed this submission.
    pub justification: RunReport,
    /// Per-test results reported by the grader, hidden cases included.
    pub graded_results: Vec<TestOutcome>,
    pub execution_time_ms: Option<f64>,
    pub memory_kb: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct SubmissionReport {
    pub submission: Submission,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    ValidationFailed {
        message: String,
    },
    ExecutionFailed {
        message: String,
    },
    LocalFailure {
        message: String,
        run: RunReport,
        warnings: Vec<String>,
    },
    AwaitingConfirmation {
        run: RunReport,
        warnings: Vec<String>,
    },
    Cancelled {
        message: String,
    },
    Accepted {
        report: SubmissionReport,
    },
    Rejected {
        report: SubmissionReport,
    },
    SubmitFailed {
        message: String,
        run: RunReport,
    },
}

pub struct SubmissionGate {
    execution: ExecutionClient,
    api: Arc<dyn CodingApi>,
    timeout_secs: u64,
    state: GateState,
    trace: Vec<Phase>,
}

impl SubmissionGate {
    pub fn new(execution: ExecutionClient, api: Arc<dyn CodingApi>, timeout_secs: u64) -> Self {
        SubmissionGate {
            execution,
            api,
            timeout_secs,
            state: GateState::Idle,
            trace: vec![Phase::Idle],
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Phases visited since the last submit began.
    pub fn trace(&self) -> &[Phase] {
        &self.trace
    }

    fn enter(&mut self, state: GateState) {
        debug!("gate: {:?} -> {:?}", self.state.phase(), state.phase());
        self.trace.push(state.phase());
        self.state = state;
    }

    /// Records a terminal phase and returns to `Idle`.
    fn finish(&mut self, terminal: Phase) {
        debug!("gate: {:?} -> {terminal:?}", self.state.phase());
        self.trace.push(terminal);
        self.enter(GateState::Idle);
    }

    pub async fn submit(
        &mut self,
        attempt: &Attempt,
        telemetry: &mut TelemetryRecorder,
    ) -> GateOutcome {
        // a new submit discards any confirmation still pending
        self.state = GateState::Idle;
        self.trace = vec![Phase::Idle];
        self.enter(GateState::Validating);

        if is_blank(attempt.code()) {
            self.enter(GateState::Idle);
            return GateOutcome::ValidationFailed {
                message: EMPTY_CODE.to_string(),
            };
        }
        let warnings = advisory_findings(
            attempt.code(),
            attempt.language(),
            attempt.problem().starter_template(attempt.language()),
        );
        for finding in &warnings {
            debug!("advisory finding: {finding}");
        }

        self.enter(GateState::Executing);
        let fingerprint = attempt.code_fingerprint();
        let suite = attempt.problem().visible_test_cases();
        let run = match self
            .execution
            .run_suite(attempt.code(), attempt.language(), &suite, self.timeout_secs)
            .await
        {
            Ok(run) => run,
            Err(message) => {
                telemetry.on_run_failed(&message);
                self.enter(GateState::Idle);
                return GateOutcome::ExecutionFailed { message };
            }
        };
        telemetry.on_run(&run.summary);

        if !run.summary.all_passed() {
            let message = if run.summary.total == 0 {
                NO_TEST_CASES.to_string()
            } else {
                format!(
                    "Only {}/{} test cases passed. Fix the failing cases before submitting.",
                    run.summary.passed, run.summary.total
                )
            };
            self.finish(Phase::LocalFailure);
            return GateOutcome::LocalFailure {
                message,
                run,
                warnings,
            };
        }

        self.enter(GateState::AwaitingConfirmation(PendingSubmission {
            fingerprint,
            language: attempt.language().to_string(),
            run: run.clone(),
        }));
        GateOutcome::AwaitingConfirmation { run, warnings }
    }

    pub fn cancel(&mut self) -> GateOutcome {
        if !matches!(self.state, GateState::AwaitingConfirmation(_)) {
            return GateOutcome::ValidationFailed {
                message: NOTHING_TO_CONFIRM.to_string(),
            };
        }
        self.enter(GateState::Idle);
        GateOutcome::Cancelled {
            message: "Submission cancelled.".to_string(),
        }
    }

    pub async fn confirm(
        &mut self,
        attempt: &Attempt,
        telemetry: &mut TelemetryRecorder,
    ) -> GateOutcome {
        let GateState::AwaitingConfirmation(pending) = self.state.clone() else {
            return GateOutcome::ValidationFailed {
                message: NOTHING_TO_CONFIRM.to_string(),
            };
        };
        let stale = if pending.language != attempt.language() {
            Some(LANGUAGE_CHANGED)
        } else if pending.fingerprint != attempt.code_fingerprint() {
            Some(CODE_CHANGED)
        } else {
            None
        };
        if let Some(message) = stale {
            self.enter(GateState::Idle);
            return GateOutcome::ValidationFailed {
                message: message.to_string(),
            };
        }

        self.enter(GateState::Submitting);
        let request = SubmitRequest {
            problem_id: attempt.problem().id.clone(),
            code: attempt.code().to_string(),
            language: attempt.language().to_string(),
            session_id: attempt.session_id().map(str::to_string),
        };
        let response = self.api.submit(&request).await;

        let submitted = match response {
            Ok(res) if res.success => res.submission.ok_or(None),
            Ok(res) => Err(res.message.or(res.error)),
            Err(err) => {
                warn!("submission failed: {err}");
                Err(err.user_message().map(str::to_string))
            }
        };
        let wire = match submitted {
            Ok(wire) => wire,
            Err(message) => {
                let message = message.unwrap_or_else(|| GENERIC_SUBMIT_FAILURE.to_string());
                telemetry.on_error(&message);
                self.finish(Phase::Rejected);
                return GateOutcome::SubmitFailed {
                    message,
                    run: pending.run,
                };
            }
        };

        let status = SubmissionStatus::from(wire.status);
        let report = SubmissionReport {
            message: status.explanation(),
            submission: Submission {
                id: match wire.id {
                    Value::String(id) => id,
                    other => other.to_string(),
                },
                problem_id: request.problem_id,
                code: request.code,
                language: request.language,
                session_id: request.session_id,
                status: status.clone(),
                justification: pending.run,
                graded_results: wire.test_results.into_iter().map(into_outcome).collect(),
                execution_time_ms: wire.execution_time,
                memory_kb: wire.memory_used,
            },
        };
        info!(
            "Submission {} for problem {} graded {status}",
            report.submission.id, report.submission.problem_id
        );

        if status.is_accepted() {
            telemetry.on_submit(attempt, FinalStatus::Accepted);
            self.finish(Phase::Accepted);
            GateOutcome::Accepted { report }
        } else {
            telemetry.on_submit(attempt, FinalStatus::Failed);
            self.finish(Phase::Rejected);
            GateOutcome::Rejected { report }
        }
    }
}
