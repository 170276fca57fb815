// src/models/exam_result.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::models::question::{OptionLabel, QuestionSnapshot};

/// Represents the 'results' table in the database.
/// One row per finished (or timed-out) exam attempt. Rows are never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,
    pub user_id: i64,

    /// Question ids in the order they were presented.
    pub question_ids: Vec<i64>,

    /// Candidate's selections. Unanswered questions have no entry.
    pub selected_answers: Json<BTreeMap<i64, OptionLabel>>,

    pub correct_answers: Json<BTreeMap<i64, OptionLabel>>,

    pub questions_data: Json<BTreeMap<i64, QuestionSnapshot>>,

    /// Percentage in 0..=100.
    pub score: f64,

    /// Seconds between batch arrival and finish.
    pub time_taken: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Fields of an attempt before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExamResult {
    pub user_id: i64,
    pub question_ids: Vec<i64>,
    pub selected_answers: BTreeMap<i64, OptionLabel>,
    pub correct_answers: BTreeMap<i64, OptionLabel>,
    pub questions_data: BTreeMap<i64, QuestionSnapshot>,
    pub score: f64,
    pub time_taken: i32,
}

/// Row of the attempt history list.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResultSummary {
    pub id: i64,
    pub score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// History entry as shown on the profile and "my results" screens.
#[derive(Debug, Serialize)]
pub struct AttemptHistoryEntry {
    pub id: i64,
    /// "Attempt N", oldest attempt is 1.
    pub label: String,
    pub score: f64,
    pub passed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AttemptHistoryEntry {
    /// Builds labelled entries from summaries ordered newest first.
    pub fn from_summaries(summaries: Vec<ResultSummary>, pass_mark: f64) -> Vec<Self> {
        let total = summaries.len();
        summaries
            .into_iter()
            .enumerate()
            .map(|(i, s)| AttemptHistoryEntry {
                id: s.id,
                label: format!("Attempt {}", total - i),
                score: s.score,
                passed: s.score >= pass_mark,
                created_at: s.created_at,
            })
            .collect()
    }
}
