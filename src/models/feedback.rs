// src/models/feedback.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'testimonials' table.
/// At most one row per user; once `locked` is set the row is read-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    /// Public attribution, always "Anonymous".
    pub name: String,
    pub rating: i16,
    pub message: String,
    pub locked: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'dev_feedback' table: operator-only notes written for low ratings.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LowRatingNote {
    pub id: i64,
    pub user_id: i64,
    pub rating: i16,
    pub message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting feedback from the results screen.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitFeedbackRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: i16,

    #[validate(length(
        min = 1,
        max = 2000,
        message = "Comment must be between 1 and 2000 characters."
    ))]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_missing_rating_and_comment() {
        let req = SubmitFeedbackRequest { rating: 0, message: String::new() };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("rating"));
        assert!(fields.contains_key("message"));
    }

    #[test]
    fn test_accepts_valid_feedback() {
        let req = SubmitFeedbackRequest { rating: 5, message: "Great".to_string() };
        assert!(req.validate().is_ok());
    }
}
