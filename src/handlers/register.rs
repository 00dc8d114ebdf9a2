// src/handlers/register.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::participant::{Identity, RegisterRequest, RegisterResponse},
    quiz::store::SessionStore,
    registrar::Registrar,
};

/// Registers a finished session as a participant.
///
/// The session must have reached `Finished`; its result is read back from
/// the session store so clients cannot submit fabricated scores.
pub async fn register(
    State(sessions): State<SessionStore>,
    State(registrar): State<Registrar>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let result = sessions.finished_result(&payload.session_id).await?;

    let identity = Identity {
        name: payload.name.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        phone: payload
            .phone
            .as_deref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    };

    let participant = registrar
        .register(&identity, &result, payload.referral_code.as_deref())
        .await?;

    // The attempt is persisted; the in-memory session has served its purpose.
    sessions.remove(&payload.session_id).await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            referral_code: participant.own_referral_code.clone(),
            participant,
        }),
    ))
}
