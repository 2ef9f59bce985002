use crate::execution::RunReport;
use crate::gate::{GateOutcome, Phase};
use crate::model::Problem;
use crate::orchestrator::AttemptError;
use crate::{AppState, SharedAttempt};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    pub location: &'static str,
    pub error: String,
}

type ErrorResponse = (StatusCode, Json<ErrorBody>);

fn err(status: StatusCode, location: &'static str, error: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(ErrorBody {
            location,
            error: error.into(),
        }),
    )
}

fn find(state: &AppState, id: u64) -> Result<SharedAttempt, ErrorResponse> {
    state
        .attempts
        .get(id)
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "attempt", format!("no open attempt {id}")))
}

fn busy() -> ErrorResponse {
    err(
        StatusCode::CONFLICT,
        "attempt",
        "another run or submission is still in progress",
    )
}

fn attempt_err_to_response(e: AttemptError) -> ErrorResponse {
    match e {
        AttemptError::EmptyCode => {
            err(StatusCode::UNPROCESSABLE_ENTITY, "validation", e.to_string())
        }
        AttemptError::NoHintsLeft => err(StatusCode::UNPROCESSABLE_ENTITY, "hints", e.to_string()),
        AttemptError::Execution(message) => {
            error!("Execution failed: {message}");
            err(StatusCode::BAD_GATEWAY, "execution", message)
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OpenRequest {
    pub problem: Problem,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttemptView {
    pub attempt_id: u64,
    pub session_id: Option<String>,
    pub language: String,
    pub code: String,
    pub phase: Phase,
}

#[utoipa::path(post, path = "/api/v1/attempts", request_body = OpenRequest, responses((status = OK, body = AttemptView)), description = "Open a problem and start a session")]
pub async fn open_attempt(state: State<AppState>, body: Json<OpenRequest>) -> Json<AttemptView> {
    let Json(OpenRequest { problem, language }) = body;
    let active = state.orchestrator.open(problem, &language).await;
    let mut view = AttemptView {
        attempt_id: 0,
        session_id: active.attempt().session_id().map(str::to_string),
        language: active.attempt().language().to_string(),
        code: active.attempt().code().to_string(),
        phase: active.phase(),
    };
    view.attempt_id = state.attempts.insert(active);
    Json(view)
}

#[utoipa::path(delete, path = "/api/v1/attempts/{id}", params(("id" = u64, Path, description = "Attempt id")), responses((status = NO_CONTENT), (status = NOT_FOUND, body = ErrorBody)), description = "Abandon an attempt")]
pub async fn abandon_attempt(
    state: State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ErrorResponse> {
    if state.attempts.remove(id) {
        info!("Attempt {id} abandoned");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(err(StatusCode::NOT_FOUND, "attempt", format!("no open attempt {id}")))
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CodeResponse {
    pub keystrokes: u64,
    pub lines_of_code: usize,
}

#[utoipa::path(put, path = "/api/v1/attempts/{id}/code", params(("id" = u64, Path, description = "Attempt id")), request_body = CodeRequest, responses((status = OK, body = CodeResponse), (status = NOT_FOUND, body = ErrorBody)), description = "Replace the code buffer")]
pub async fn edit_code(
    state: State<AppState>,
    Path(id): Path<u64>,
    body: Json<CodeRequest>,
) -> Result<Json<CodeResponse>, ErrorResponse> {
    let shared = find(&state, id)?;
    let mut active = shared.lock().await;
    let keystrokes = active.edit(body.0.code);
    Ok(Json(CodeResponse {
        keystrokes,
        lines_of_code: active.attempt().lines_of_code(),
    }))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LanguageRequest {
    pub language: String,
}

#[utoipa::path(put, path = "/api/v1/attempts/{id}/language", params(("id" = u64, Path, description = "Attempt id")), request_body = LanguageRequest, responses((status = OK, body = AttemptView), (status = NOT_FOUND, body = ErrorBody), (status = CONFLICT, body = ErrorBody)), description = "Switch language and load its starter template")]
pub async fn set_language(
    state: State<AppState>,
    Path(id): Path<u64>,
    body: Json<LanguageRequest>,
) -> Result<Json<AttemptView>, ErrorResponse> {
    let shared = find(&state, id)?;
    let mut active = shared.try_lock().map_err(|_| busy())?;
    active.set_language(&body.language);
    Ok(Json(AttemptView {
        attempt_id: id,
        session_id: active.attempt().session_id().map(str::to_string),
        language: active.attempt().language().to_string(),
        code: active.attempt().code().to_string(),
        phase: active.phase(),
    }))
}

#[utoipa::path(post, path = "/api/v1/attempts/{id}/run", params(("id" = u64, Path, description = "Attempt id")), responses((status = OK, body = RunReport), (status = NOT_FOUND, body = ErrorBody), (status = CONFLICT, body = ErrorBody), (status = UNPROCESSABLE_ENTITY, body = ErrorBody), (status = BAD_GATEWAY, body = ErrorBody)), description = "Run the visible test cases")]
pub async fn run_code(
    state: State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RunReport>, ErrorResponse> {
    let shared = find(&state, id)?;
    let mut active = shared.try_lock().map_err(|_| busy())?;
    active.run().await.map(Json).map_err(attempt_err_to_response)
}

#[utoipa::path(post, path = "/api/v1/attempts/{id}/submit", params(("id" = u64, Path, description = "Attempt id")), responses((status = OK, body = GateOutcome), (status = NOT_FOUND, body = ErrorBody), (status = CONFLICT, body = ErrorBody), (status = UNPROCESSABLE_ENTITY, body = ErrorBody)), description = "Validate against the visible test cases and await confirmation")]
pub async fn submit_code(
    state: State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<GateOutcome>, ErrorResponse> {
    let shared = find(&state, id)?;
    let mut active = shared.try_lock().map_err(|_| busy())?;
    match active.submit().await {
        GateOutcome::ValidationFailed { message } => {
            Err(err(StatusCode::UNPROCESSABLE_ENTITY, "validation", message))
        }
        outcome => Ok(Json(outcome)),
    }
}

#[utoipa::path(post, path = "/api/v1/attempts/{id}/confirm", params(("id" = u64, Path, description = "Attempt id")), responses((status = OK, body = GateOutcome), (status = NOT_FOUND, body = ErrorBody), (status = CONFLICT, body = ErrorBody)), description = "Confirm a validated submission and send it for grading")]
pub async fn confirm_submission(
    state: State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<GateOutcome>, ErrorResponse> {
    let shared = find(&state, id)?;
    let mut active = shared.try_lock().map_err(|_| busy())?;
    Ok(Json(active.confirm().await))
}

#[utoipa::path(post, path = "/api/v1/attempts/{id}/cancel", params(("id" = u64, Path, description = "Attempt id")), responses((status = OK, body = GateOutcome), (status = NOT_FOUND, body = ErrorBody), (status = CONFLICT, body = ErrorBody)), description = "Cancel a pending confirmation")]
pub async fn cancel_submission(
    state: State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<GateOutcome>, ErrorResponse> {
    let shared = find(&state, id)?;
    let mut active = shared.try_lock().map_err(|_| busy())?;
    Ok(Json(active.cancel()))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HintResponse {
    pub hint: String,
    pub hints_revealed: usize,
}

#[utoipa::path(post, path = "/api/v1/attempts/{id}/hints", params(("id" = u64, Path, description = "Attempt id")), responses((status = OK, body = HintResponse), (status = NOT_FOUND, body = ErrorBody), (status = UNPROCESSABLE_ENTITY, body = ErrorBody)), description = "Reveal the next hint")]
pub async fn reveal_hint(
    state: State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<HintResponse>, ErrorResponse> {
    let shared = find(&state, id)?;
    let mut active = shared.lock().await;
    let hint = active.reveal_hint().map_err(attempt_err_to_response)?;
    Ok(Json(HintResponse {
        hint,
        hints_revealed: active.attempt().hints_revealed(),
    }))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LastResultResponse {
    #[schema(value_type = Object)]
    pub payload: Value,
}

#[utoipa::path(get, path = "/api/v1/results/last", responses((status = OK, body = LastResultResponse), (status = NOT_FOUND, body = ErrorBody)), description = "Last computed result payload")]
pub async fn last_result(
    state: State<AppState>,
) -> Result<Json<LastResultResponse>, ErrorResponse> {
    state
        .orchestrator
        .stash()
        .last()
        .map(|payload| Json(LastResultResponse { payload }))
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "results", "no result computed yet"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Orchestrator;
    use crate::runner::{
        ApiError, CodingApi, ExecuteEnvelope, ExecuteRequest, SessionEnd, SessionUpdate,
        StartSessionRequest, StartSessionResponse, SubmitRequest, SubmitResponse,
    };
    use crate::stash::ResultStash;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    struct Offline;

    #[async_trait]
    impl CodingApi for Offline {
        async fn execute(&self, _: &ExecuteRequest) -> Result<ExecuteEnvelope, ApiError> {
            Err(ApiError::Timeout)
        }

        async fn submit(&self, _: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
            Err(ApiError::Timeout)
        }

        async fn start_session(
            &self,
            _: &StartSessionRequest,
        ) -> Result<StartSessionResponse, ApiError> {
            Err(ApiError::Timeout)
        }

        async fn update_session(&self, _: &str, _: &SessionUpdate) -> Result<(), ApiError> {
            Err(ApiError::Timeout)
        }

        async fn end_session(&self, _: &str, _: &SessionEnd) -> Result<(), ApiError> {
            Err(ApiError::Timeout)
        }
    }

    const IDLE: Duration = Duration::from_secs(600);

    fn state() -> AppState {
        AppState::new(
            Orchestrator::new(
                Arc::new(Offline),
                None,
                3,
                Arc::new(ResultStash::default()),
            ),
            IDLE,
        )
    }

    async fn open(state: &AppState) -> AttemptView {
        let problem = serde_json::from_value(json!({
            "id": "fizzbuzz",
            "examples": [{"input": "n = 3", "output": "'Fizz'"}],
            "hints": ["Check divisibility by 15 first."],
            "starter_code": {"python": "def fizzbuzz(n):\n    pass\n"}
        }))
        .unwrap();
        let Json(view) = open_attempt(
            State(state.clone()),
            Json(OpenRequest {
                problem,
                language: "python".to_string(),
            }),
        )
        .await;
        view
    }

    #[tokio::test]
    async fn open_without_session_loads_template() {
        let state = state();
        let view = open(&state).await;
        assert_eq!(view.attempt_id, 1);
        assert_eq!(view.session_id, None);
        assert_eq!(view.code, "def fizzbuzz(n):\n    pass\n");
        assert_eq!(view.phase, Phase::Idle);
    }

    #[tokio::test]
    async fn unknown_attempt_is_not_found() {
        let state = state();
        let (status, _) = run_code(State(state.clone()), Path(42)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = abandon_attempt(State(state), Path(42)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn run_maps_failures_to_status_codes() {
        let state = state();
        let id = open(&state).await.attempt_id;

        edit_code(
            State(state.clone()),
            Path(id),
            Json(CodeRequest {
                code: " ".to_string(),
            }),
        )
        .await
        .unwrap();
        let (status, Json(body)) = run_code(State(state.clone()), Path(id)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error, "Please write some code before running.");

        edit_code(
            State(state.clone()),
            Path(id),
            Json(CodeRequest {
                code: "def fizzbuzz(n):\n    return 'Fizz'\n".to_string(),
            }),
        )
        .await
        .unwrap();
        let (status, Json(body)) = run_code(State(state.clone()), Path(id)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "Execution timed out after 3 seconds.");

        let (status, _) = last_result(State(state)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn held_attempt_rejects_a_second_run() {
        let state = state();
        let id = open(&state).await.attempt_id;
        let shared = state.attempts.get(id).unwrap();
        let _held = shared.lock().await;

        let (status, _) = submit_code(State(state.clone()), Path(id)).await.unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn hints_run_out() {
        let state = state();
        let id = open(&state).await.attempt_id;

        let Json(hint) = reveal_hint(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(hint.hint, "Check divisibility by 15 first.");
        assert_eq!(hint.hints_revealed, 1);
        let (status, _) = reveal_hint(State(state), Path(id)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn abandon_removes_attempt() {
        let state = state();
        let id = open(&state).await.attempt_id;
        assert_eq!(
            abandon_attempt(State(state.clone()), Path(id)).await.unwrap(),
            StatusCode::NO_CONTENT
        );
        assert!(state.attempts.get(id).is_none());
    }

    #[tokio::test]
    async fn blank_submit_is_unprocessable() {
        let state = state();
        let id = open(&state).await.attempt_id;
        edit_code(
            State(state.clone()),
            Path(id),
            Json(CodeRequest {
                code: "\n".to_string(),
            }),
        )
        .await
        .unwrap();

        let (status, Json(body)) = submit_code(State(state), Path(id)).await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error, crate::gate::EMPTY_CODE);
    }

    #[tokio::test]
    async fn cancel_without_pending_submission() {
        let state = state();
        let id = open(&state).await.attempt_id;
        let Json(outcome) = cancel_submission(State(state), Path(id)).await.unwrap();
        assert_eq!(
            outcome,
            GateOutcome::ValidationFailed {
                message: crate::gate::NOTHING_TO_CONFIRM.to_string()
            }
        );
    }

    #[tokio::test]
    async fn idle_attempts_are_evicted() {
        let state = state();
        let stale = open(&state).await.attempt_id;
        let fresh = open(&state).await.attempt_id;
        let later = Instant::now() + IDLE + Duration::from_secs(1);

        assert_eq!(state.attempts.evict_idle_at(Instant::now()), 0);
        assert_eq!(state.attempts.len(), 2);

        let held = state.attempts.get(fresh).unwrap();
        let _guard = held.lock().await;
        assert_eq!(state.attempts.evict_idle_at(later), 1);
        assert!(state.attempts.get(stale).is_none());
        assert!(state.attempts.get(fresh).is_some());

        let (status, _) = run_code(State(state), Path(stale)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
