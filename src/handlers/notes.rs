// src/handlers/notes.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::progress::NotesOverview,
    store::DynStore,
    utils::jwt::Claims,
};

/// Study topics with their lock state and the user's progress.
pub async fn list_notes(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let topics = store.list_topics().await?;
    let progress = store.get_or_create_progress(user_id).await?;
    Ok(Json(NotesOverview::build(&topics, &progress)))
}

/// Marks a topic as completed. Only unlocked topics can be completed.
pub async fn complete_topic(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let topics = store.list_topics().await?;

    if !topics.iter().any(|t| t.id == topic_id) {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }

    let progress = store.get_or_create_progress(user_id).await?;
    if !progress.is_unlocked(&topics, topic_id) {
        return Err(AppError::Forbidden(
            "Complete the previous topic first".to_string(),
        ));
    }

    let progress = store.complete_topic(user_id, topic_id).await?;
    tracing::debug!(user_id, topic_id, "Topic completed");

    Ok(Json(NotesOverview::build(&topics, &progress)))
}
