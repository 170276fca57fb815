// src/exam/scoring.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::question::OptionLabel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
    /// 100 × correct / total.
    pub percentage: f64,
}

/// Scores an attempt over every question id in `question_ids`.
///
/// Unanswered questions (no entry in `selected`) count as incorrect.
/// Returns `None` for an empty attempt instead of dividing by zero.
pub fn calculate_score(
    question_ids: &[i64],
    selected: &BTreeMap<i64, OptionLabel>,
    correct: &BTreeMap<i64, OptionLabel>,
) -> Option<Score> {
    let total = question_ids.len();
    if total == 0 {
        return None;
    }

    let correct_count = question_ids
        .iter()
        .filter(|&&id| match (selected.get(&id), correct.get(&id)) {
            (Some(user_ans), Some(expected)) => user_ans == expected,
            _ => false,
        })
        .count();

    Some(Score {
        correct: correct_count,
        total,
        percentage: correct_count as f64 * 100.0 / total as f64,
    })
}
