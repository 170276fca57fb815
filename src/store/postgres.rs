// src/store/postgres.rs

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use super::{FeedbackStore, ProgressStore, QuestionStore, ResultStore, StoreError, UserStore};
use crate::models::{
    exam_result::{ExamResult, NewExamResult, ResultSummary},
    feedback::{Feedback, LowRatingNote},
    progress::{StudyProgress, Topic},
    question::{CreateQuestionRequest, Question},
    user::User,
};

const QUESTION_COLUMNS: &str =
    "id, question, option_a, option_b, option_c, option_d, correct_answer, image_path";
const RESULT_COLUMNS: &str = "id, user_id, question_ids, selected_answers, correct_answers, \
     questions_data, score, time_taken, created_at";
const USER_COLUMNS: &str = "id, username, password, role, display_name, dark_mode, created_at";
const FEEDBACK_COLUMNS: &str = "id, user_id, name, rating, message, locked, created_at";

/// Postgres-backed store. Every call is bounded by `timeout`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                tracing::warn!("Store call exceeded {:?}", self.timeout);
                Err(StoreError::Timeout)
            }
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn fetch_questions(
        &self,
        excluded: &BTreeSet<i64>,
        limit: i64,
    ) -> Result<Vec<Question>, StoreError> {
        let excluded: Vec<i64> = excluded.iter().copied().collect();
        let sql = format!(
            "SELECT {} FROM exam_questions WHERE NOT (id = ANY($1)) ORDER BY id LIMIT $2",
            QUESTION_COLUMNS
        );

        self.timed(
            sqlx::query_as::<_, Question>(&sql)
                .bind(excluded)
                .bind(limit)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn insert_question(&self, req: &CreateQuestionRequest) -> Result<Question, StoreError> {
        let sql = format!(
            "INSERT INTO exam_questions
                (question, option_a, option_b, option_c, option_d, correct_answer, image_path)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            QUESTION_COLUMNS
        );

        self.timed(
            sqlx::query_as::<_, Question>(&sql)
                .bind(&req.question)
                .bind(&req.option_a)
                .bind(&req.option_b)
                .bind(&req.option_c)
                .bind(&req.option_d)
                .bind(req.correct_answer.as_str())
                .bind(&req.image_path)
                .fetch_one(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl ResultStore for PgStore {
    async fn insert_result(&self, new: &NewExamResult) -> Result<ExamResult, StoreError> {
        let sql = format!(
            "INSERT INTO results
                (user_id, question_ids, selected_answers, correct_answers, questions_data, score, time_taken)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            RESULT_COLUMNS
        );

        self.timed(
            sqlx::query_as::<_, ExamResult>(&sql)
                .bind(new.user_id)
                .bind(&new.question_ids)
                .bind(Json(&new.selected_answers))
                .bind(Json(&new.correct_answers))
                .bind(Json(&new.questions_data))
                .bind(new.score)
                .bind(new.time_taken)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn get_result(&self, id: i64) -> Result<Option<ExamResult>, StoreError> {
        let sql = format!("SELECT {} FROM results WHERE id = $1", RESULT_COLUMNS);

        self.timed(
            sqlx::query_as::<_, ExamResult>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn count_results(&self, user_id: i64) -> Result<i64, StoreError> {
        self.timed(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM results WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn list_results(&self, user_id: i64) -> Result<Vec<ResultSummary>, StoreError> {
        self.timed(
            sqlx::query_as::<_, ResultSummary>(
                "SELECT id, score, created_at FROM results
                 WHERE user_id = $1
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn attempted_question_ids(&self, user_id: i64) -> Result<BTreeSet<i64>, StoreError> {
        let ids = self
            .timed(
                sqlx::query_scalar::<_, i64>(
                    "SELECT DISTINCT unnest(question_ids) FROM results WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError> {
        self.timed(
            sqlx::query_as::<_, Topic>("SELECT id, title, content_path FROM study_notes ORDER BY id")
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn insert_topic(&self, title: &str, content_path: &str) -> Result<Topic, StoreError> {
        self.timed(
            sqlx::query_as::<_, Topic>(
                "INSERT INTO study_notes (title, content_path) VALUES ($1, $2)
                 RETURNING id, title, content_path",
            )
            .bind(title)
            .bind(content_path)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn get_or_create_progress(&self, user_id: i64) -> Result<StudyProgress, StoreError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        self.timed(
            sqlx::query_as::<_, StudyProgress>(
                "INSERT INTO study_progress (user_id) VALUES ($1)
                 ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
                 RETURNING user_id, completed_ids",
            )
            .bind(user_id)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn complete_topic(&self, user_id: i64, topic_id: i64) -> Result<StudyProgress, StoreError> {
        self.timed(
            sqlx::query_as::<_, StudyProgress>(
                "INSERT INTO study_progress (user_id, completed_ids) VALUES ($1, ARRAY[$2]::BIGINT[])
                 ON CONFLICT (user_id) DO UPDATE SET completed_ids =
                    CASE WHEN $2 = ANY(study_progress.completed_ids)
                         THEN study_progress.completed_ids
                         ELSE array_append(study_progress.completed_ids, $2)
                    END
                 RETURNING user_id, completed_ids",
            )
            .bind(user_id)
            .bind(topic_id)
            .fetch_one(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn get_feedback(&self, user_id: i64) -> Result<Option<Feedback>, StoreError> {
        let sql = format!("SELECT {} FROM testimonials WHERE user_id = $1", FEEDBACK_COLUMNS);

        self.timed(
            sqlx::query_as::<_, Feedback>(&sql)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn lock_feedback(
        &self,
        user_id: i64,
        name: &str,
        rating: i16,
        message: &str,
    ) -> Result<Option<Feedback>, StoreError> {
        // The WHERE on the conflict branch keeps a locked row untouched and
        // makes RETURNING empty, so concurrent submissions cannot unlock it.
        let sql = format!(
            "INSERT INTO testimonials (user_id, name, rating, message, locked)
             VALUES ($1, $2, $3, $4, TRUE)
             ON CONFLICT (user_id) DO UPDATE SET
                name = EXCLUDED.name,
                rating = EXCLUDED.rating,
                message = EXCLUDED.message,
                locked = TRUE
             WHERE testimonials.locked = FALSE
             RETURNING {}",
            FEEDBACK_COLUMNS
        );

        self.timed(
            sqlx::query_as::<_, Feedback>(&sql)
                .bind(user_id)
                .bind(name)
                .bind(rating)
                .bind(message)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_low_rating_note(
        &self,
        user_id: i64,
        rating: i16,
        message: &str,
    ) -> Result<LowRatingNote, StoreError> {
        self.timed(
            sqlx::query_as::<_, LowRatingNote>(
                "INSERT INTO dev_feedback (user_id, rating, message) VALUES ($1, $2, $3)
                 RETURNING id, user_id, rating, message, created_at",
            )
            .bind(user_id)
            .bind(rating)
            .bind(message)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn list_low_rating_notes(&self) -> Result<Vec<LowRatingNote>, StoreError> {
        self.timed(
            sqlx::query_as::<_, LowRatingNote>(
                "SELECT id, user_id, rating, message, created_at FROM dev_feedback
                 ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
        display_name: Option<&str>,
    ) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, password, role, display_name)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            USER_COLUMNS
        );

        let fut = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(password_hash)
            .bind(role)
            .bind(display_name)
            .fetch_one(&self.pool);

        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(user)) => Ok(user),
            Ok(Err(e)) if is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "Username '{}' already exists",
                username
            ))),
            Ok(Err(e)) => Err(StoreError::from(e)),
            Err(_) => Err(StoreError::Timeout),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);

        self.timed(
            sqlx::query_as::<_, User>(&sql)
                .bind(username)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        self.timed(
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let done = self
            .timed(
                sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
                    .bind(id)
                    .bind(password_hash)
                    .execute(&self.pool),
            )
            .await?;

        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: i64,
        display_name: Option<&str>,
        dark_mode: Option<bool>,
    ) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET
                display_name = COALESCE($2, display_name),
                dark_mode = COALESCE($3, dark_mode)
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );

        self.timed(
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .bind(display_name)
                .bind(dark_mode)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        // Results, progress and feedback go with the user through ON DELETE CASCADE.
        let done = self
            .timed(
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;

        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
