// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    config::PASSING_SCORE_PERCENTAGE,
    error::AppError,
    models::{
        exam_result::AttemptHistoryEntry,
        user::{MeResponse, UpdateProfileRequest},
    },
    state::AppState,
    store::DynStore,
    utils::{html::clean_html, jwt::Claims},
};

/// Get current user's profile, study progress and attempt history.
pub async fn get_me(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = store
        .find_user(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let topics = store.list_topics().await?;
    let progress = store.get_or_create_progress(user_id).await?;
    let summaries = store.list_results(user_id).await?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        role: user.role,
        dark_mode: user.dark_mode,
        progress_percentage: progress.percentage(&topics),
        results: AttemptHistoryEntry::from_summaries(summaries, PASSING_SCORE_PERCENTAGE),
    }))
}

/// Updates display name and/or theme preference.
pub async fn update_profile(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let display_name = payload
        .display_name
        .as_deref()
        .map(|name| clean_html(name.trim()));

    let user = store
        .update_profile(user_id, display_name.as_deref(), payload.dark_mode)
        .await?;

    Ok(Json(user))
}

/// Deletes the signed-in account together with its history.
/// A running exam is dropped first so its countdown cannot store a result.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    state.exams.abandon(user_id);
    state.store.delete_user(user_id).await?;

    tracing::info!(user_id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}
