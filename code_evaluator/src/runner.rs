use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// The remote coding API: execution service, grading endpoint and session store.
#[async_trait]
pub trait CodingApi: Send + Sync {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteEnvelope, ApiError>;
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError>;
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, ApiError>;
    async fn update_session(&self, session_id: &str, update: &SessionUpdate)
    -> Result<(), ApiError>;
    async fn end_session(&self, session_id: &str, end: &SessionEnd) -> Result<(), ApiError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected code {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("request timed out")]
    Timeout,
    #[error("invalid url: {0}")]
    Url(String),
}

impl ApiError {
    /// Message suitable for the learner: the service's own text when it sent one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ApiError::Timeout => true,
            ApiError::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireTestCase {
    pub input: Value,
    pub output: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExecuteRequest {
    pub code: String,
    pub language: String,
    pub test_cases: Vec<WireTestCase>,
    pub timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_judge0: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// Body of an execute response. The service answers either with the result
/// wrapped in `execution_result` or with the result fields at the top level;
/// [`crate::execution::adapt_execute_response`] folds both into one result.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExecuteEnvelope {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub execution_result: Option<WireExecutionResult>,
    #[serde(default)]
    pub results: Option<Vec<WireTestResult>>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub memory_used: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WireExecutionResult {
    #[serde(default)]
    pub results: Vec<WireTestResult>,
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub memory_used: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WireTestResult {
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub expected: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub memory_used: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmitRequest {
    pub problem_id: String,
    pub code: String,
    pub language: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubmitResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub submission: Option<WireSubmission>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireSubmission {
    pub id: Value,
    pub status: String,
    #[serde(default)]
    pub test_results: Vec<WireTestResult>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub memory_used: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StartSessionRequest {
    pub problem_id: String,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StartSessionResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TestRunSummary {
    pub passed: usize,
    pub total: usize,
}

/// Partial session update; only the fields that changed are sent.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keystrokes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_of_code: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_runs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints_used: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_test_results: Option<TestRunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Accepted,
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionEnd {
    pub final_status: FinalStatus,
    pub solution_code: String,
    pub completion_time: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    detail: Option<String>,
}

/// [`CodingApi`] over HTTP.
#[derive(Debug)]
pub struct HttpCodingApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
    request_timeout: Duration,
}

impl HttpCodingApi {
    pub fn new(base_url: Url, token: Option<String>, request_timeout: Duration) -> Self {
        HttpCodingApi {
            client: Client::new(),
            base_url,
            token,
            request_timeout,
        }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Url(e.to_string()))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path)?;
        debug!("{method} {url}");
        let mut req = self.client.request(method, url).timeout(timeout).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Transport(e)
            }
        })?;

        match res.error_for_status_ref() {
            Ok(_) => Ok(res),
            Err(_) => {
                let status = res.status();
                let message = res
                    .json::<ErrorBody>()
                    .await
                    .ok()
                    .and_then(|b| b.message.or(b.error).or(b.detail));
                Err(ApiError::Status { status, message })
            }
        }
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        Ok(self.send(method, path, body, timeout).await?.json().await?)
    }
}

#[async_trait]
impl CodingApi for HttpCodingApi {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteEnvelope, ApiError> {
        // the service enforces `request.timeout` itself
        let deadline = Duration::from_secs(request.timeout) + self.request_timeout;
        self.send_json(Method::POST, "api/coding/execute", request, deadline)
            .await
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        self.send_json(
            Method::POST,
            "api/coding/submit",
            request,
            self.request_timeout,
        )
        .await
    }

    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, ApiError> {
        self.send_json(
            Method::POST,
            "api/coding/sessions/start",
            request,
            self.request_timeout,
        )
        .await
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<(), ApiError> {
        self.send(
            Method::PUT,
            &format!("api/coding/sessions/{session_id}"),
            update,
            self.request_timeout,
        )
        .await?;
        Ok(())
    }

    async fn end_session(&self, session_id: &str, end: &SessionEnd) -> Result<(), ApiError> {
        self.send(
            Method::POST,
            &format!("api/coding/sessions/{session_id}/end"),
            end,
            self.request_timeout,
        )
        .await?;
        Ok(())
    }
}
