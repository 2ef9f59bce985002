use crate::aggregate::{Summary, aggregate};
use crate::model::{ExecutionResult, StructuredValue, TestCase, TestOutcome};
use crate::runner::{
    ApiError, CodingApi, ExecuteEnvelope, ExecuteRequest, WireExecutionResult, WireTestCase,
    WireTestResult,
};
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

pub const GENERIC_EXECUTION_FAILURE: &str = "Failed to execute code. Please try again.";
pub const MISSING_RESULTS: &str = "The execution service returned no results.";

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Ok(ExecutionResult),
    Failed(String),
}

/// An execution together with its aggregate.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct RunReport {
    pub result: ExecutionResult,
    pub summary: Summary,
}

/// Compatibility shim for the two response shapes of the execute endpoint:
/// the result wrapped in `execution_result`, or its fields at the top level.
pub fn adapt_execute_response(envelope: ExecuteEnvelope) -> ExecutionOutcome {
    if !envelope.success {
        return ExecutionOutcome::Failed(
            envelope
                .message
                .or(envelope.error)
                .unwrap_or_else(|| GENERIC_EXECUTION_FAILURE.to_string()),
        );
    }
    let raw = match (envelope.execution_result, envelope.results) {
        (Some(wrapped), _) => wrapped,
        (None, Some(results)) => WireExecutionResult {
            results,
            execution_time: envelope.execution_time.unwrap_or_default(),
            memory_used: envelope.memory_used.unwrap_or_default(),
        },
        (None, None) => return ExecutionOutcome::Failed(MISSING_RESULTS.to_string()),
    };
    ExecutionOutcome::Ok(ExecutionResult {
        outcomes: raw.results.into_iter().map(into_outcome).collect(),
        execution_time_ms: raw.execution_time,
        memory_kb: raw.memory_used,
    })
}

pub(crate) fn into_outcome(wire: WireTestResult) -> TestOutcome {
    TestOutcome {
        passed: wire.passed,
        input: StructuredValue::from(wire.input),
        actual_output: StructuredValue::from(wire.output),
        expected_output: StructuredValue::from(wire.expected),
        error: wire.error,
        execution_time_ms: wire.execution_time,
        memory_kb: wire.memory_used,
    }
}

fn describe_failure(err: &ApiError, timeout_secs: u64) -> String {
    if err.is_timeout() {
        return format!("Execution timed out after {timeout_secs} seconds.");
    }
    err.user_message()
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_EXECUTION_FAILURE.to_string())
}

/// Drives the remote execution service. Callers must not run two executions
/// for the same attempt at once.
#[derive(Clone)]
pub struct ExecutionClient {
    api: Arc<dyn CodingApi>,
    use_judge0: Option<bool>,
}

impl ExecutionClient {
    pub fn new(api: Arc<dyn CodingApi>, use_judge0: Option<bool>) -> Self {
        ExecutionClient { api, use_judge0 }
    }

    pub async fn execute(
        &self,
        code: &str,
        language: &str,
        test_cases: &[TestCase],
        timeout_secs: u64,
    ) -> ExecutionOutcome {
        let request = ExecuteRequest {
            code: code.to_string(),
            language: language.to_string(),
            test_cases: test_cases
                .iter()
                .map(|tc| WireTestCase {
                    input: tc.input.to_json(),
                    output: tc.expected_output.to_json(),
                })
                .collect(),
            timeout: timeout_secs,
            use_judge0: self.use_judge0,
        };
        debug!(
            "Executing {} test cases ({language}, timeout {timeout_secs}s)",
            request.test_cases.len()
        );
        match self.api.execute(&request).await {
            Ok(envelope) => adapt_execute_response(envelope),
            Err(err) => {
                warn!("execution request failed: {err}");
                ExecutionOutcome::Failed(describe_failure(&err, timeout_secs))
            }
        }
    }

    /// Executes and aggregates; the error is the message to show the learner.
    pub async fn run_suite(
        &self,
        code: &str,
        language: &str,
        test_cases: &[TestCase],
        timeout_secs: u64,
    ) -> Result<RunReport, String> {
        match self.execute(code, language, test_cases, timeout_secs).await {
            ExecutionOutcome::Ok(result) => {
                let summary = aggregate(&result.outcomes);
                Ok(RunReport { result, summary })
            }
            ExecutionOutcome::Failed(reason) => Err(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> ExecuteEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn wrapped_shape() {
        let outcome = adapt_execute_response(envelope(json!({
            "success": true,
            "execution_result": {
                "results": [
                    {"passed": true, "input": [1, 2], "output": 3, "expected": 3,
                     "execution_time": 4.0, "memory_used": 512.0},
                    {"passed": false, "input": [2, 2], "output": 5, "expected": 4,
                     "error": null, "execution_time": 6.0, "memory_used": 640.0},
                ],
                "execution_time": 10.0,
                "memory_used": 640.0,
            }
        })));
        let ExecutionOutcome::Ok(result) = outcome else {
            panic!("expected results");
        };
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes[1].actual_output, StructuredValue::from(5i64));
        assert_eq!(result.execution_time_ms, 10.0);
    }

    #[test]
    fn bare_shape() {
        let outcome = adapt_execute_response(envelope(json!({
            "results": [{"passed": true, "input": "a", "output": "A", "expected": "A"}],
            "execution_time": 2.0,
            "memory_used": 128.0,
        })));
        let ExecutionOutcome::Ok(result) = outcome else {
            panic!("expected results");
        };
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.memory_kb, 128.0);
        assert_eq!(result.outcomes[0].execution_time_ms, 0.0);
    }

    #[test]
    fn unsuccessful_body_uses_service_message() {
        let outcome = adapt_execute_response(envelope(json!({
            "success": false,
            "message": "Unsupported language: cobol",
        })));
        assert_eq!(
            outcome,
            ExecutionOutcome::Failed("Unsupported language: cobol".to_string())
        );

        let outcome = adapt_execute_response(envelope(json!({"success": false})));
        assert_eq!(
            outcome,
            ExecutionOutcome::Failed(GENERIC_EXECUTION_FAILURE.to_string())
        );
    }

    #[test]
    fn missing_payload_is_failure() {
        let outcome = adapt_execute_response(envelope(json!({"success": true})));
        assert_eq!(outcome, ExecutionOutcome::Failed(MISSING_RESULTS.to_string()));
    }

    #[test]
    fn status_errors_surface_service_text() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::BAD_REQUEST,
            message: Some("Code too long".to_string()),
        };
        assert_eq!(describe_failure(&err, 10), "Code too long");

        let err = ApiError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            message: None,
        };
        assert_eq!(describe_failure(&err, 10), GENERIC_EXECUTION_FAILURE);
    }

    #[test]
    fn timeout_names_the_limit() {
        assert_eq!(
            describe_failure(&ApiError::Timeout, 7),
            "Execution timed out after 7 seconds."
        );
    }
}
