// src/handlers/feedback.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    models::feedback::SubmitFeedbackRequest,
    results::{FeedbackGate, submit_feedback},
    store::DynStore,
    utils::jwt::Claims,
};

/// The user's feedback (if any) with the current retake gate.
pub async fn get_feedback(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let attempts = store.count_results(user_id).await?;
    let feedback = store.get_feedback(user_id).await?;
    Ok(Json(FeedbackGate::evaluate(attempts, feedback.as_ref())))
}

/// Submits feedback. Once stored it is locked and cannot be changed.
pub async fn post_feedback(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let outcome = submit_feedback(store.as_ref(), user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
