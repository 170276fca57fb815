// src/models/progress.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'study_notes' table: one study topic.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    /// Object key of the note document in private storage.
    pub content_path: String,
}

/// Represents the 'study_progress' table. Created lazily; ids are only ever appended.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct StudyProgress {
    pub user_id: i64,
    pub completed_ids: Vec<i64>,
}

impl StudyProgress {
    pub fn empty(user_id: i64) -> Self {
        Self { user_id, completed_ids: Vec::new() }
    }

    pub fn is_completed(&self, topic_id: i64) -> bool {
        self.completed_ids.contains(&topic_id)
    }

    /// Whole-number percentage of topics completed, 0 when there are no topics.
    pub fn percentage(&self, topics: &[Topic]) -> u8 {
        if topics.is_empty() {
            return 0;
        }
        let done = topics.iter().filter(|t| self.is_completed(t.id)).count();
        ((done * 100) / topics.len()) as u8
    }

    /// A topic opens once the topic before it (by id order) is completed.
    /// The first topic is always open.
    pub fn is_unlocked(&self, topics: &[Topic], topic_id: i64) -> bool {
        match topics.iter().position(|t| t.id == topic_id) {
            Some(0) => true,
            Some(i) => self.is_completed(topics[i - 1].id),
            None => false,
        }
    }

    /// The exam opens when every topic is completed.
    pub fn all_completed(&self, topics: &[Topic]) -> bool {
        topics.iter().all(|t| self.is_completed(t.id))
    }
}

/// Topic entry of the notes listing.
#[derive(Debug, Serialize)]
pub struct TopicStatus {
    pub id: i64,
    pub title: String,
    pub unlocked: bool,
    pub completed: bool,
    /// Only revealed for unlocked topics.
    pub content_path: Option<String>,
}

/// Response body of the notes listing.
#[derive(Debug, Serialize)]
pub struct NotesOverview {
    pub topics: Vec<TopicStatus>,
    pub progress_percentage: u8,
    pub exam_unlocked: bool,
}

impl NotesOverview {
    pub fn build(topics: &[Topic], progress: &StudyProgress) -> Self {
        let statuses = topics
            .iter()
            .map(|t| {
                let unlocked = progress.is_unlocked(topics, t.id);
                TopicStatus {
                    id: t.id,
                    title: t.title.clone(),
                    unlocked,
                    completed: progress.is_completed(t.id),
                    content_path: unlocked.then(|| t.content_path.clone()),
                }
            })
            .collect();

        Self {
            topics: statuses,
            progress_percentage: progress.percentage(topics),
            exam_unlocked: progress.all_completed(topics),
        }
    }
}

/// DTO for authoring a topic.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 500))]
    pub content_path: String,
}
