// src/store/testing.rs

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{
    FeedbackStore, MemoryStore, ProgressStore, QuestionStore, ResultStore, StoreError, UserStore,
};
use crate::models::{
    exam_result::{ExamResult, NewExamResult, ResultSummary},
    feedback::{Feedback, LowRatingNote},
    progress::{StudyProgress, Topic},
    question::{CreateQuestionRequest, Question},
    user::User,
};

/// `MemoryStore` with switchable faults for exercising failure paths.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// Number of upcoming `insert_result` calls that time out.
    failing_result_inserts: AtomicUsize,
    /// When set, `get_feedback` reports nothing, as a read that raced a writer would.
    stale_feedback_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_result_inserts(&self, count: usize) {
        self.failing_result_inserts.store(count, Ordering::SeqCst);
    }

    pub fn serve_stale_feedback(&self) {
        self.stale_feedback_reads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionStore for FlakyStore {
    async fn fetch_questions(
        &self,
        excluded: &BTreeSet<i64>,
        limit: i64,
    ) -> Result<Vec<Question>, StoreError> {
        self.inner.fetch_questions(excluded, limit).await
    }

    async fn insert_question(&self, req: &CreateQuestionRequest) -> Result<Question, StoreError> {
        self.inner.insert_question(req).await
    }
}

#[async_trait]
impl ResultStore for FlakyStore {
    async fn insert_result(&self, new: &NewExamResult) -> Result<ExamResult, StoreError> {
        let failing = self
            .failing_result_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Timeout);
        }
        self.inner.insert_result(new).await
    }

    async fn get_result(&self, id: i64) -> Result<Option<ExamResult>, StoreError> {
        self.inner.get_result(id).await
    }

    async fn count_results(&self, user_id: i64) -> Result<i64, StoreError> {
        self.inner.count_results(user_id).await
    }

    async fn list_results(&self, user_id: i64) -> Result<Vec<ResultSummary>, StoreError> {
        self.inner.list_results(user_id).await
    }

    async fn attempted_question_ids(&self, user_id: i64) -> Result<BTreeSet<i64>, StoreError> {
        self.inner.attempted_question_ids(user_id).await
    }
}

#[async_trait]
impl ProgressStore for FlakyStore {
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError> {
        self.inner.list_topics().await
    }

    async fn insert_topic(&self, title: &str, content_path: &str) -> Result<Topic, StoreError> {
        self.inner.insert_topic(title, content_path).await
    }

    async fn get_or_create_progress(&self, user_id: i64) -> Result<StudyProgress, StoreError> {
        self.inner.get_or_create_progress(user_id).await
    }

    async fn complete_topic(&self, user_id: i64, topic_id: i64) -> Result<StudyProgress, StoreError> {
        self.inner.complete_topic(user_id, topic_id).await
    }
}

#[async_trait]
impl FeedbackStore for FlakyStore {
    async fn get_feedback(&self, user_id: i64) -> Result<Option<Feedback>, StoreError> {
        if self.stale_feedback_reads.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get_feedback(user_id).await
    }

    async fn lock_feedback(
        &self,
        user_id: i64,
        name: &str,
        rating: i16,
        message: &str,
    ) -> Result<Option<Feedback>, StoreError> {
        self.inner.lock_feedback(user_id, name, rating, message).await
    }

    async fn insert_low_rating_note(
        &self,
        user_id: i64,
        rating: i16,
        message: &str,
    ) -> Result<LowRatingNote, StoreError> {
        self.inner.insert_low_rating_note(user_id, rating, message).await
    }

    async fn list_low_rating_notes(&self) -> Result<Vec<LowRatingNote>, StoreError> {
        self.inner.list_low_rating_notes().await
    }
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
        display_name: Option<&str>,
    ) -> Result<User, StoreError> {
        self.inner
            .create_user(username, password_hash, role, display_name)
            .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_username(username).await
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        self.inner.update_password(id, password_hash).await
    }

    async fn update_profile(
        &self,
        id: i64,
        display_name: Option<&str>,
        dark_mode: Option<bool>,
    ) -> Result<User, StoreError> {
        self.inner.update_profile(id, display_name, dark_mode).await
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        self.inner.delete_user(id).await
    }
}
