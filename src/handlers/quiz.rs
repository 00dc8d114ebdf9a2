// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::session::{AdvanceRequest, AnswerRequest},
    quiz::store::SessionStore,
};

/// Creates a new session and serves the first question with its countdown
/// armed.
pub async fn start_quiz(
    State(sessions): State<SessionStore>,
) -> Result<impl IntoResponse, AppError> {
    let started = sessions.start().await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Current session snapshot for page reloads: question, remaining seconds,
/// the result once finished.
pub async fn session_state(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.view(&session_id).await?))
}

/// Records the answer for the current question and reveals the verdict and
/// explanation. Advancing is a separate action.
pub async fn submit_answer(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        sessions
            .select_answer(&session_id, payload.option_index)
            .await?,
    ))
}

/// Moves on to the next question, or finishes the quiz on the last one.
/// `skip: true` discards any recorded answer for the current question.
pub async fn advance(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<String>,
    payload: Option<Json<AdvanceRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let skip = payload.map(|Json(p)| p.skip).unwrap_or(false);
    Ok(Json(sessions.advance(&session_id, skip).await?))
}

/// Explicit restart: back to question 0 with a cleared answer log.
pub async fn restart(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.restart(&session_id).await?))
}

/// Tears the session down and cancels its countdown.
pub async fn teardown(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    sessions.remove(&session_id).await;
    Ok(StatusCode::NO_CONTENT)
}
