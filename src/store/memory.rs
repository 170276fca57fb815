// src/store/memory.rs

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::{FeedbackStore, ProgressStore, QuestionStore, ResultStore, StoreError, UserStore};
use crate::models::{
    exam_result::{ExamResult, NewExamResult, ResultSummary},
    feedback::{Feedback, LowRatingNote},
    progress::{StudyProgress, Topic},
    question::{CreateQuestionRequest, Question},
    user::User,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    questions: BTreeMap<i64, Question>,
    results: BTreeMap<i64, ExamResult>,
    topics: BTreeMap<i64, Topic>,
    progress: BTreeMap<i64, StudyProgress>,
    testimonials: BTreeMap<i64, Feedback>,
    dev_feedback: Vec<LowRatingNote>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store with the same semantics as `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a question with a caller-chosen id.
    pub async fn seed_question(&self, question: Question) {
        let mut tables = self.tables.write().await;
        tables.next_id = tables.next_id.max(question.id);
        tables.questions.insert(question.id, question);
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn fetch_questions(
        &self,
        excluded: &BTreeSet<i64>,
        limit: i64,
    ) -> Result<Vec<Question>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| !excluded.contains(&q.id))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_question(&self, req: &CreateQuestionRequest) -> Result<Question, StoreError> {
        let mut tables = self.tables.write().await;
        let question = Question {
            id: tables.next_id(),
            question: req.question.clone(),
            option_a: req.option_a.clone(),
            option_b: req.option_b.clone(),
            option_c: req.option_c.clone(),
            option_d: req.option_d.clone(),
            correct_answer: req.correct_answer,
            image_path: req.image_path.clone(),
        };
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn insert_result(&self, new: &NewExamResult) -> Result<ExamResult, StoreError> {
        let mut tables = self.tables.write().await;
        let result = ExamResult {
            id: tables.next_id(),
            user_id: new.user_id,
            question_ids: new.question_ids.clone(),
            selected_answers: Json(new.selected_answers.clone()),
            correct_answers: Json(new.correct_answers.clone()),
            questions_data: Json(new.questions_data.clone()),
            score: new.score,
            time_taken: new.time_taken,
            created_at: Utc::now(),
        };
        tables.results.insert(result.id, result.clone());
        Ok(result)
    }

    async fn get_result(&self, id: i64) -> Result<Option<ExamResult>, StoreError> {
        Ok(self.tables.read().await.results.get(&id).cloned())
    }

    async fn count_results(&self, user_id: i64) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.results.values().filter(|r| r.user_id == user_id).count() as i64)
    }

    async fn list_results(&self, user_id: i64) -> Result<Vec<ResultSummary>, StoreError> {
        let tables = self.tables.read().await;
        // Ids grow with insertion order, so reverse id order is newest first.
        Ok(tables
            .results
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .map(|r| ResultSummary {
                id: r.id,
                score: r.score,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn attempted_question_ids(&self, user_id: i64) -> Result<BTreeSet<i64>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .results
            .values()
            .filter(|r| r.user_id == user_id)
            .flat_map(|r| r.question_ids.iter().copied())
            .collect())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError> {
        Ok(self.tables.read().await.topics.values().cloned().collect())
    }

    async fn insert_topic(&self, title: &str, content_path: &str) -> Result<Topic, StoreError> {
        let mut tables = self.tables.write().await;
        let topic = Topic {
            id: tables.next_id(),
            title: title.to_string(),
            content_path: content_path.to_string(),
        };
        tables.topics.insert(topic.id, topic.clone());
        Ok(topic)
    }

    async fn get_or_create_progress(&self, user_id: i64) -> Result<StudyProgress, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .progress
            .entry(user_id)
            .or_insert_with(|| StudyProgress::empty(user_id))
            .clone())
    }

    async fn complete_topic(&self, user_id: i64, topic_id: i64) -> Result<StudyProgress, StoreError> {
        let mut tables = self.tables.write().await;
        let progress = tables
            .progress
            .entry(user_id)
            .or_insert_with(|| StudyProgress::empty(user_id));
        if !progress.completed_ids.contains(&topic_id) {
            progress.completed_ids.push(topic_id);
        }
        Ok(progress.clone())
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn get_feedback(&self, user_id: i64) -> Result<Option<Feedback>, StoreError> {
        Ok(self.tables.read().await.testimonials.get(&user_id).cloned())
    }

    async fn lock_feedback(
        &self,
        user_id: i64,
        name: &str,
        rating: i16,
        message: &str,
    ) -> Result<Option<Feedback>, StoreError> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.testimonials.get_mut(&user_id) {
            if existing.locked {
                return Ok(None);
            }
            existing.name = name.to_string();
            existing.rating = rating;
            existing.message = message.to_string();
            existing.locked = true;
            return Ok(Some(existing.clone()));
        }

        let feedback = Feedback {
            id: tables.next_id(),
            user_id,
            name: name.to_string(),
            rating,
            message: message.to_string(),
            locked: true,
            created_at: Utc::now(),
        };
        tables.testimonials.insert(user_id, feedback.clone());
        Ok(Some(feedback))
    }

    async fn insert_low_rating_note(
        &self,
        user_id: i64,
        rating: i16,
        message: &str,
    ) -> Result<LowRatingNote, StoreError> {
        let mut tables = self.tables.write().await;
        let note = LowRatingNote {
            id: tables.next_id(),
            user_id,
            rating,
            message: message.to_string(),
            created_at: Utc::now(),
        };
        tables.dev_feedback.push(note.clone());
        Ok(note)
    }

    async fn list_low_rating_notes(&self) -> Result<Vec<LowRatingNote>, StoreError> {
        Ok(self.tables.read().await.dev_feedback.iter().rev().cloned().collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
        display_name: Option<&str>,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }

        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.to_string(),
            display_name: display_name.map(str::to_string),
            dark_mode: false,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password = password_hash.to_string();
        Ok(())
    }

    async fn update_profile(
        &self,
        id: i64,
        display_name: Option<&str>,
        dark_mode: Option<bool>,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = display_name {
            user.display_name = Some(name.to_string());
        }
        if let Some(dark) = dark_mode {
            user.dark_mode = dark;
        }
        Ok(user.clone())
    }

    /// Mirrors the `ON DELETE CASCADE` foreign keys of the schema.
    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.users.remove(&id).ok_or(StoreError::NotFound)?;
        tables.results.retain(|_, r| r.user_id != id);
        tables.progress.remove(&id);
        tables.testimonials.remove(&id);
        tables.dev_feedback.retain(|n| n.user_id != id);
        Ok(())
    }
}
