//! Routes for the Training Player bounded context.
//!
//! A session lives in the registry from `POST /sessions` until
//! `DELETE /sessions/{run_id}`. Every action responds with the refreshed
//! session view so the UI shell never has to reconcile state itself.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use skillpass_training::application::query_handlers::{
    self, TrainingRunView, TrainingSessionView, session_view,
};
use skillpass_training::application::session::{StartSession, TrainingSession};
use skillpass_training::domain::engine::{FinalizeOutcome, SceneChange};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /sessions.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// The candidate taking the module.
    pub candidate_id: Uuid,
    /// Module id or slug.
    pub module: String,
}

/// Request body for POST /sessions/{run_id}/navigate.
#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    /// Target scene index.
    pub index: usize,
}

/// Request body for POST /sessions/{run_id}/select-choice.
#[derive(Debug, Deserialize)]
pub struct SelectChoiceRequest {
    /// The option to select.
    pub choice_id: String,
}

/// Request body for POST /sessions/{run_id}/reflection.
#[derive(Debug, Deserialize)]
pub struct ReflectionRequest {
    /// The candidate's answer.
    pub text: String,
}

/// Request body for POST /sessions/{run_id}/quiz/answer.
#[derive(Debug, Deserialize)]
pub struct QuizAnswerRequest {
    /// Question index.
    pub question: usize,
    /// Option index within the question.
    pub option: usize,
}

/// Points awarded by a scored submission.
#[derive(Debug, Serialize)]
pub struct ScoreResult {
    /// Points recorded for the scene.
    pub points: u32,
}

/// Outcome of the finalize action.
#[derive(Debug, Serialize)]
pub struct CompletionResult {
    /// `false` when an earlier call already finalized the module.
    pub finalized: bool,
    /// Final score.
    pub total_score: u32,
    /// Whether the passing threshold was met.
    pub passed: bool,
}

/// Action result together with the refreshed session.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T> {
    /// What the action did.
    pub result: T,
    /// Session state after the action.
    pub session: TrainingSessionView,
}

fn respond<T>(result: T, session: &TrainingSession) -> ActionResponse<T> {
    ActionResponse {
        result,
        session: session_view(session),
    }
}

/// POST /sessions
#[instrument(skip(state, request), fields(candidate_id = %request.candidate_id, module = %request.module))]
async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<TrainingSessionView>), ApiError> {
    let command = StartSession {
        correlation_id: Uuid::new_v4(),
        candidate_id: request.candidate_id,
        module: request.module,
    };

    info!(correlation_id = %command.correlation_id, "handling start_session command");

    let session = TrainingSession::start(&state.services, command).await?;
    let view = session_view(&session);
    state.sessions.insert(session)?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /sessions/{run_id}
#[instrument(skip_all, fields(run_id = %run_id))]
async fn get_session(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<TrainingSessionView>, ApiError> {
    let view = state
        .sessions
        .with_session(run_id, |session| Ok(session_view(session)))?;
    Ok(Json(view))
}

/// DELETE /sessions/{run_id}
#[instrument(skip_all, fields(run_id = %run_id))]
async fn close_session(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.sessions.remove(run_id)?.close();
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/{run_id}/next
#[instrument(skip_all, fields(run_id = %run_id))]
async fn go_to_next(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ActionResponse<SceneChange>>, ApiError> {
    let correlation_id = Uuid::new_v4();
    let response = state.sessions.with_session(run_id, |session| {
        let change = session.go_to_next(correlation_id)?;
        Ok(respond(change, session))
    })?;
    Ok(Json(response))
}

/// POST /sessions/{run_id}/previous
#[instrument(skip_all, fields(run_id = %run_id))]
async fn go_to_previous(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ActionResponse<SceneChange>>, ApiError> {
    let correlation_id = Uuid::new_v4();
    let response = state.sessions.with_session(run_id, |session| {
        let change = session.go_to_previous(correlation_id)?;
        Ok(respond(change, session))
    })?;
    Ok(Json(response))
}

/// POST /sessions/{run_id}/navigate
#[instrument(skip_all, fields(run_id = %run_id, index = request.index))]
async fn navigate_to(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<ActionResponse<SceneChange>>, ApiError> {
    let correlation_id = Uuid::new_v4();
    let response = state.sessions.with_session(run_id, |session| {
        let change = session.navigate_to(request.index, correlation_id)?;
        Ok(respond(change, session))
    })?;
    Ok(Json(response))
}

/// POST /sessions/{run_id}/select-choice
#[instrument(skip_all, fields(run_id = %run_id, choice_id = %request.choice_id))]
async fn select_choice(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
    Json(request): Json<SelectChoiceRequest>,
) -> Result<Json<TrainingSessionView>, ApiError> {
    let view = state.sessions.with_session(run_id, |session| {
        session.select_choice(&request.choice_id)?;
        Ok(session_view(session))
    })?;
    Ok(Json(view))
}

/// POST /sessions/{run_id}/submit-choice
#[instrument(skip_all, fields(run_id = %run_id))]
async fn submit_choice(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ActionResponse<ScoreResult>>, ApiError> {
    let correlation_id = Uuid::new_v4();
    let response = state.sessions.with_session(run_id, |session| {
        let points = session.submit_choice(correlation_id)?;
        Ok(respond(ScoreResult { points }, session))
    })?;
    Ok(Json(response))
}

/// POST /sessions/{run_id}/reflection
///
/// Submits the text as the reflection. A rejected text does not replace the
/// draft. On success the session has already moved to the following scene,
/// if any.
#[instrument(skip_all, fields(run_id = %run_id, chars = request.text.chars().count()))]
async fn submit_reflection(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
    Json(request): Json<ReflectionRequest>,
) -> Result<Json<ActionResponse<Option<SceneChange>>>, ApiError> {
    let correlation_id = Uuid::new_v4();
    let response = state.sessions.with_session(run_id, |session| {
        let change = session.submit_reflection_text(&request.text, correlation_id)?;
        Ok(respond(change, session))
    })?;
    Ok(Json(response))
}

/// POST /sessions/{run_id}/quiz/answer
#[instrument(skip_all, fields(run_id = %run_id, question = request.question, option = request.option))]
async fn answer_question(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
    Json(request): Json<QuizAnswerRequest>,
) -> Result<Json<TrainingSessionView>, ApiError> {
    let view = state.sessions.with_session(run_id, |session| {
        session.answer_question(request.question, request.option)?;
        Ok(session_view(session))
    })?;
    Ok(Json(view))
}

/// POST /sessions/{run_id}/quiz/submit
#[instrument(skip_all, fields(run_id = %run_id))]
async fn submit_quiz(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ActionResponse<ScoreResult>>, ApiError> {
    let correlation_id = Uuid::new_v4();
    let response = state.sessions.with_session(run_id, |session| {
        let points = session.submit_quiz(correlation_id)?;
        Ok(respond(ScoreResult { points }, session))
    })?;
    Ok(Json(response))
}

/// POST /sessions/{run_id}/complete
#[instrument(skip_all, fields(run_id = %run_id))]
async fn complete_module(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ActionResponse<CompletionResult>>, ApiError> {
    let correlation_id = Uuid::new_v4();
    let response = state.sessions.with_session(run_id, |session| {
        let outcome = session.complete_module(correlation_id)?;
        let result = match outcome {
            FinalizeOutcome::Finalized {
                total_score,
                passed,
            } => CompletionResult {
                finalized: true,
                total_score,
                passed,
            },
            FinalizeOutcome::AlreadyFinalized => {
                let run = session.engine().run();
                CompletionResult {
                    finalized: false,
                    total_score: run.total_score(),
                    passed: run.passed(),
                }
            }
        };
        Ok(respond(result, session))
    })?;
    Ok(Json(response))
}

/// GET /runs/{run_id}
#[instrument(skip_all, fields(run_id = %run_id))]
async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<TrainingRunView>, ApiError> {
    let view = query_handlers::get_run_by_id(run_id, &*state.event_repository).await?;
    Ok(Json(view))
}

/// Returns the router for the training context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(start_session))
        .route("/sessions/{run_id}", get(get_session).delete(close_session))
        .route("/sessions/{run_id}/next", post(go_to_next))
        .route("/sessions/{run_id}/previous", post(go_to_previous))
        .route("/sessions/{run_id}/navigate", post(navigate_to))
        .route("/sessions/{run_id}/select-choice", post(select_choice))
        .route("/sessions/{run_id}/submit-choice", post(submit_choice))
        .route("/sessions/{run_id}/reflection", post(submit_reflection))
        .route("/sessions/{run_id}/quiz/answer", post(answer_question))
        .route("/sessions/{run_id}/quiz/submit", post(submit_quiz))
        .route("/sessions/{run_id}/complete", post(complete_module))
        .route("/runs/{run_id}", get(get_run))
}
