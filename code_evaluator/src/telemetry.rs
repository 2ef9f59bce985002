//! Best-effort session telemetry. Updates are pushed as detached tasks;
//! failures are logged and dropped, never returned to the caller.

use crate::aggregate::Summary;
use crate::attempt::Attempt;
use crate::runner::{CodingApi, FinalStatus, SessionEnd, SessionUpdate, TestRunSummary};
use futures::future::join_all;
use log::{debug, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Edits are flushed when the keystroke count is an exact multiple of this.
pub const EDIT_FLUSH_INTERVAL: u64 = 50;

pub struct TelemetryRecorder {
    api: Arc<dyn CodingApi>,
    session_id: Option<String>,
    test_runs: u32,
    pending: Vec<JoinHandle<()>>,
}

impl TelemetryRecorder {
    pub fn new(api: Arc<dyn CodingApi>, session_id: Option<String>) -> Self {
        TelemetryRecorder {
            api,
            session_id,
            test_runs: 0,
            pending: Vec::new(),
        }
    }

    pub fn test_runs(&self) -> u32 {
        self.test_runs
    }

    /// Returns whether an update was scheduled.
    pub fn on_edit(&mut self, attempt: &Attempt) -> bool {
        let keystrokes = attempt.keystroke_count();
        if keystrokes == 0 || keystrokes % EDIT_FLUSH_INTERVAL != 0 {
            return false;
        }
        self.push(SessionUpdate {
            keystrokes: Some(keystrokes),
            lines_of_code: Some(attempt.lines_of_code()),
            ..Default::default()
        })
    }

    pub fn on_run(&mut self, summary: &Summary) -> bool {
        self.test_runs += 1;
        self.push(SessionUpdate {
            test_runs: Some(self.test_runs),
            last_test_results: Some(TestRunSummary {
                passed: summary.passed,
                total: summary.total,
            }),
            last_error: Some(None),
            ..Default::default()
        })
    }

    /// A run that produced no results still counts as a run.
    pub fn on_run_failed(&mut self, error: &str) -> bool {
        self.test_runs += 1;
        self.push(SessionUpdate {
            test_runs: Some(self.test_runs),
            last_error: Some(Some(error.to_string())),
            ..Default::default()
        })
    }

    pub fn on_error(&mut self, error: &str) -> bool {
        self.push(SessionUpdate {
            last_error: Some(Some(error.to_string())),
            ..Default::default()
        })
    }

    pub fn on_hint(&mut self, attempt: &Attempt) -> bool {
        self.push(SessionUpdate {
            hints_used: Some(attempt.hints_revealed()),
            ..Default::default()
        })
    }

    pub fn on_submit(&mut self, attempt: &Attempt, final_status: FinalStatus) -> bool {
        let Some(session_id) = self.session_id.clone() else {
            debug!("No session to end");
            return false;
        };
        let end = SessionEnd {
            final_status,
            solution_code: attempt.code().to_string(),
            completion_time: attempt.elapsed().as_secs(),
        };
        let api = self.api.clone();
        self.spawn(async move {
            if let Err(err) = api.end_session(&session_id, &end).await {
                warn!("failed to end session {session_id}: {err}");
            }
        });
        true
    }

    /// Waits for updates still in flight.
    pub async fn settle(&mut self) {
        join_all(self.pending.drain(..)).await;
    }

    fn push(&mut self, update: SessionUpdate) -> bool {
        let Some(session_id) = self.session_id.clone() else {
            debug!("No session, dropping telemetry update");
            return false;
        };
        let api = self.api.clone();
        self.spawn(async move {
            if let Err(err) = api.update_session(&session_id, &update).await {
                warn!("failed to update session {session_id}: {err}");
            }
        });
        true
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.retain(|handle| !handle.is_finished());
        self.pending.push(tokio::spawn(task));
    }
}
