// src/handlers/exam.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    exam::{ExamEvent, SessionView},
    models::question::OptionLabel,
    results::FeedbackGate,
    state::AppState,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub label: OptionLabel,
}

/// Starts an attempt, or resumes the one already running.
///
/// Refused with 403 until every study topic is completed, and while the
/// feedback gate keeps retakes closed.
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let store = &state.store;

    let topics = store.list_topics().await?;
    let progress = store.get_or_create_progress(user_id).await?;
    if !progress.all_completed(&topics) {
        return Err(AppError::Forbidden(
            "Complete all study notes before taking the exam".to_string(),
        ));
    }

    let attempts = store.count_results(user_id).await?;
    let feedback = store.get_feedback(user_id).await?;
    if !FeedbackGate::evaluate(attempts, feedback.as_ref()).retake_enabled {
        return Err(AppError::Forbidden(
            "Please leave feedback before retaking the exam".to_string(),
        ));
    }

    let view = state
        .exams
        .start(user_id, store, state.config.media_base_url.as_ref())
        .await?;

    Ok(Json(view))
}

/// Current state of the user's session.
pub async fn get_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let view = state
        .exams
        .view(user_id, state.config.media_base_url.as_ref())
        .await?;
    Ok(Json(view))
}

/// Records the answer for the current question. Does not advance.
pub async fn select_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    apply(&state, &claims, ExamEvent::Select(payload.label)).await
}

pub async fn next_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    apply(&state, &claims, ExamEvent::Next).await
}

pub async fn previous_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    apply(&state, &claims, ExamEvent::Previous).await
}

/// Finishes the attempt. Repeating the call returns the same result id.
pub async fn finish_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let result_id = state.exams.finish(user_id, &state.store).await?;
    Ok(Json(json!({ "result_id": result_id })))
}

/// Leaves the exam page: drops the session and stops its countdown.
pub async fn abandon_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    if !state.exams.abandon(user_id) {
        return Err(AppError::NotFound("No exam in progress".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn apply(
    state: &AppState,
    claims: &Claims,
    event: ExamEvent,
) -> Result<Json<SessionView>, AppError> {
    let user_id = claims.user_id()?;
    let view = state
        .exams
        .update(user_id, event, state.config.media_base_url.as_ref())
        .await?;
    Ok(Json(view))
}

