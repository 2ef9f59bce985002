use crate::attempt::Attempt;
use crate::checks::is_blank;
use crate::execution::{ExecutionClient, RunReport};
use crate::gate::{GateOutcome, Phase, SubmissionGate};
use crate::model::Problem;
use crate::runner::{CodingApi, StartSessionRequest};
use crate::stash::ResultStash;
use crate::telemetry::TelemetryRecorder;
use log::{info, warn};
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AttemptError {
    #[error("Please write some code before running.")]
    EmptyCode,
    #[error("No more hints are available for this problem.")]
    NoHintsLeft,
    #[error("{0}")]
    Execution(String),
}

/// Shared clients for every attempt served by this process.
#[derive(Clone)]
pub struct Orchestrator {
    api: Arc<dyn CodingApi>,
    execution: ExecutionClient,
    stash: Arc<ResultStash>,
    timeout_secs: u64,
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn CodingApi>,
        use_judge0: Option<bool>,
        timeout_secs: u64,
        stash: Arc<ResultStash>,
    ) -> Self {
        Orchestrator {
            execution: ExecutionClient::new(api.clone(), use_judge0),
            api,
            stash,
            timeout_secs,
        }
    }

    pub fn stash(&self) -> &ResultStash {
        &self.stash
    }

    /// Opens a problem. A session that fails to start only disables telemetry.
    pub async fn open(&self, problem: Problem, language: &str) -> ActiveAttempt {
        let request = StartSessionRequest {
            problem_id: problem.id.clone(),
            language: language.to_string(),
        };
        let session_id = match self.api.start_session(&request).await {
            Ok(res) if res.success => res.session_id,
            Ok(_) => {
                warn!("session start refused for problem {}", problem.id);
                None
            }
            Err(err) => {
                warn!("failed to start session for problem {}: {err}", problem.id);
                None
            }
        };
        info!(
            "Opened problem {} in {language} (session {})",
            problem.id,
            session_id.as_deref().unwrap_or("none")
        );

        let attempt = Attempt::new(Arc::new(problem), language, session_id.clone());
        ActiveAttempt {
            attempt,
            telemetry: TelemetryRecorder::new(self.api.clone(), session_id),
            gate: SubmissionGate::new(self.execution.clone(), self.api.clone(), self.timeout_secs),
            execution: self.execution.clone(),
            stash: self.stash.clone(),
            timeout_secs: self.timeout_secs,
            last_run: None,
        }
    }
}

/// An open attempt with its telemetry and submission gate.
pub struct ActiveAttempt {
    attempt: Attempt,
    telemetry: TelemetryRecorder,
    gate: SubmissionGate,
    execution: ExecutionClient,
    stash: Arc<ResultStash>,
    timeout_secs: u64,
    last_run: Option<RunReport>,
}

impl ActiveAttempt {
    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn phase(&self) -> Phase {
        self.gate.phase()
    }

    pub fn gate_trace(&self) -> &[Phase] {
        self.gate.trace()
    }

    pub fn last_run(&self) -> Option<&RunReport> {
        self.last_run.as_ref()
    }

    pub fn edit(&mut self, code: String) -> u64 {
        let keystrokes = self.attempt.edit(code);
        self.telemetry.on_edit(&self.attempt);
        keystrokes
    }

    pub fn set_language(&mut self, language: &str) {
        self.attempt.set_language(language);
    }

    pub fn reveal_hint(&mut self) -> Result<String, AttemptError> {
        let hint = self
            .attempt
            .reveal_hint()
            .map(str::to_string)
            .ok_or(AttemptError::NoHintsLeft)?;
        self.telemetry.on_hint(&self.attempt);
        Ok(hint)
    }

    pub async fn run(&mut self) -> Result<RunReport, AttemptError> {
        if is_blank(self.attempt.code()) {
            return Err(AttemptError::EmptyCode);
        }
        let suite = self.attempt.problem().visible_test_cases();
        let result = self
            .execution
            .run_suite(
                self.attempt.code(),
                self.attempt.language(),
                &suite,
                self.timeout_secs,
            )
            .await;
        match result {
            Ok(report) => {
                self.telemetry.on_run(&report.summary);
                self.stash.put(&report);
                self.last_run = Some(report.clone());
                Ok(report)
            }
            Err(message) => {
                self.telemetry.on_run_failed(&message);
                Err(AttemptError::Execution(message))
            }
        }
    }

    pub async fn submit(&mut self) -> GateOutcome {
        let outcome = self.gate.submit(&self.attempt, &mut self.telemetry).await;
        match &outcome {
            GateOutcome::LocalFailure { run, .. }
            | GateOutcome::AwaitingConfirmation { run, .. } => {
                self.stash.put(run);
                self.last_run = Some(run.clone());
            }
            _ => {}
        }
        outcome
    }

    pub async fn confirm(&mut self) -> GateOutcome {
        let outcome = self.gate.confirm(&self.attempt, &mut self.telemetry).await;
        if let GateOutcome::Accepted { report } | GateOutcome::Rejected { report } = &outcome {
            self.stash.put(report);
        }
        outcome
    }

    pub fn cancel(&mut self) -> GateOutcome {
        self.gate.cancel()
    }

    /// Waits for telemetry still in flight.
    pub async fn settle(&mut self) {
        self.telemetry.settle().await;
    }
}
