// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    config::PASSING_SCORE_PERCENTAGE,
    error::AppError,
    models::exam_result::AttemptHistoryEntry,
    results::{ResultsEvent, ResultsPage},
    store::DynStore,
    utils::jwt::Claims,
};

#[derive(Debug, Default, Deserialize)]
pub struct ResultQuery {
    /// Include per-question review items.
    #[serde(default)]
    pub review: bool,
}

/// Attempt history of the current user, newest first.
pub async fn list_results(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let summaries = store.list_results(user_id).await?;
    Ok(Json(AttemptHistoryEntry::from_summaries(
        summaries,
        PASSING_SCORE_PERCENTAGE,
    )))
}

/// Results screen for one attempt.
///
/// Results of other users are reported as missing.
pub async fn get_result(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(query): Query<ResultQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let loaded = async {
        let result = store
            .get_result(id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Result not found".to_string()))?;
        let attempt_count = store.count_results(user_id).await?;
        let feedback = store.get_feedback(user_id).await?;
        Ok::<_, AppError>(ResultsEvent::Loaded {
            result,
            attempt_count,
            feedback,
        })
    }
    .await;

    let event = match loaded {
        Ok(event) => event,
        Err(AppError::NotFound(msg)) => return Err(AppError::NotFound(msg)),
        Err(e) => {
            tracing::error!(user_id, result_id = id, "Failed to load result: {}", e);
            ResultsEvent::LoadFailed("Unable to load this result right now".to_string())
        }
    };

    let mut page = ResultsPage::Loading.apply(event);
    if query.review {
        page = page.apply(ResultsEvent::ToggleReview);
    }

    match page {
        ResultsPage::Ready(ready) => Ok(Json(ready.view())),
        ResultsPage::Failed(msg) => Err(AppError::InternalServerError(msg)),
        ResultsPage::Loading => Err(AppError::InternalServerError(
            "Result page did not load".to_string(),
        )),
    }
}
