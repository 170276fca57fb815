// src/store/mod.rs

//! Persistence seams. Handlers and the exam driver only see these traits;
//! `PgStore` backs them with Postgres and `MemoryStore` keeps everything in
//! process (tests, local runs without a database).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    exam_result::{ExamResult, NewExamResult, ResultSummary},
    feedback::{Feedback, LowRatingNote},
    progress::{StudyProgress, Topic},
    question::{CreateQuestionRequest, Question},
    user::User,
};

pub mod memory;
pub mod postgres;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors surfaced by store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("store call timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The question bank.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Up to `limit` questions whose ids are not in `excluded`, ascending by id.
    async fn fetch_questions(
        &self,
        excluded: &BTreeSet<i64>,
        limit: i64,
    ) -> Result<Vec<Question>, StoreError>;

    async fn insert_question(&self, req: &CreateQuestionRequest) -> Result<Question, StoreError>;
}

/// Append-only exam attempts.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Inserts one attempt and returns the stored row with id and timestamp.
    async fn insert_result(&self, new: &NewExamResult) -> Result<ExamResult, StoreError>;

    async fn get_result(&self, id: i64) -> Result<Option<ExamResult>, StoreError>;

    async fn count_results(&self, user_id: i64) -> Result<i64, StoreError>;

    /// Newest first.
    async fn list_results(&self, user_id: i64) -> Result<Vec<ResultSummary>, StoreError>;

    /// Union of the question ids of every prior attempt of the user.
    async fn attempted_question_ids(&self, user_id: i64) -> Result<BTreeSet<i64>, StoreError>;
}

/// Study topics and per-user completion.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// All topics ascending by id.
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError>;

    async fn insert_topic(&self, title: &str, content_path: &str) -> Result<Topic, StoreError>;

    /// Returns the user's progress, creating an empty row on first access.
    async fn get_or_create_progress(&self, user_id: i64) -> Result<StudyProgress, StoreError>;

    /// Appends `topic_id` unless already present.
    async fn complete_topic(&self, user_id: i64, topic_id: i64) -> Result<StudyProgress, StoreError>;
}

/// Testimonials and the low-rating operator channel.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn get_feedback(&self, user_id: i64) -> Result<Option<Feedback>, StoreError>;

    /// Inserts or updates the user's feedback and sets `locked`.
    /// Returns `None` when an existing row is already locked; it is left untouched.
    async fn lock_feedback(
        &self,
        user_id: i64,
        name: &str,
        rating: i16,
        message: &str,
    ) -> Result<Option<Feedback>, StoreError>;

    async fn insert_low_rating_note(
        &self,
        user_id: i64,
        rating: i16,
        message: &str,
    ) -> Result<LowRatingNote, StoreError>;

    async fn list_low_rating_notes(&self) -> Result<Vec<LowRatingNote>, StoreError>;
}

/// Accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Conflict` when the username is taken.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
        display_name: Option<&str>,
    ) -> Result<User, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;

    async fn update_profile(
        &self,
        id: i64,
        display_name: Option<&str>,
        dark_mode: Option<bool>,
    ) -> Result<User, StoreError>;

    /// Removes the account with its results, progress and feedback.
    async fn delete_user(&self, id: i64) -> Result<(), StoreError>;
}

/// Everything the application needs from persistence.
pub trait Store: QuestionStore + ResultStore + ProgressStore + FeedbackStore + UserStore {}

impl<T> Store for T where T: QuestionStore + ResultStore + ProgressStore + FeedbackStore + UserStore {}

pub type DynStore = Arc<dyn Store>;
