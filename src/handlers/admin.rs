// src/handlers/admin.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::{progress::CreateTopicRequest, question::CreateQuestionRequest},
    store::DynStore,
};

/// Adds a question to the exam bank.
/// Admin only.
pub async fn create_question(
    State(store): State<DynStore>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = store.insert_question(&payload).await.map_err(|e| {
        tracing::error!("Failed to create question: {}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Adds a study topic. Topics unlock in id order.
/// Admin only.
pub async fn create_topic(
    State(store): State<DynStore>,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let topic = store
        .insert_topic(payload.title.trim(), payload.content_path.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(topic)))
}

/// Low ratings copied aside for operators, newest first.
/// Admin only.
pub async fn list_low_rating_feedback(
    State(store): State<DynStore>,
) -> Result<impl IntoResponse, AppError> {
    let notes = store.list_low_rating_notes().await?;
    Ok(Json(notes))
}
