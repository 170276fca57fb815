// src/results/feedback.rs

use serde::Serialize;
use validator::Validate;

use super::presenter::FeedbackGate;
use crate::{
    config::LOW_RATING_THRESHOLD,
    error::AppError,
    models::feedback::{Feedback, SubmitFeedbackRequest},
    store::Store,
    utils::html::clean_html,
};

/// Public attribution used for every testimonial.
const TESTIMONIAL_NAME: &str = "Anonymous";

#[derive(Debug, Serialize)]
pub struct FeedbackOutcome {
    pub feedback: Feedback,
    /// Whether the rating was also copied to the low-rating channel.
    pub low_rating_noted: bool,
    pub gate: FeedbackGate,
}

/// Validates and stores the user's feedback, locking it.
///
/// * Validation happens before any store call.
/// * A locked testimonial is never rewritten.
/// * Ratings below the threshold also leave a note for operators, once the lock succeeded.
pub async fn submit_feedback(
    store: &dyn Store,
    user_id: i64,
    req: SubmitFeedbackRequest,
) -> Result<FeedbackOutcome, AppError> {
    req.validate()?;

    let message = clean_html(req.message.trim());
    if message.trim().is_empty() {
        return Err(AppError::BadRequest("Comment must not be empty.".to_string()));
    }

    if let Some(existing) = store.get_feedback(user_id).await? {
        if existing.locked {
            return Err(AppError::Conflict("Feedback has already been submitted".to_string()));
        }
    }

    // A concurrent submission may have locked the row since the read above;
    // the store then returns nothing and no note is written.
    let feedback = store
        .lock_feedback(user_id, TESTIMONIAL_NAME, req.rating, &message)
        .await?
        .ok_or_else(|| AppError::Conflict("Feedback has already been submitted".to_string()))?;

    let low_rating_noted = feedback.rating < LOW_RATING_THRESHOLD;
    if low_rating_noted {
        store
            .insert_low_rating_note(user_id, feedback.rating, &feedback.message)
            .await
            .map_err(|e| {
                tracing::error!(user_id, "Failed to record low-rating note: {}", e);
                AppError::from(e)
            })?;
    }

    let attempts = store.count_results(user_id).await?;
    tracing::info!(user_id, rating = feedback.rating, "Feedback locked");

    Ok(FeedbackOutcome {
        gate: FeedbackGate::evaluate(attempts, Some(&feedback)),
        feedback,
        low_rating_noted,
    })
}
