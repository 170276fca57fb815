// src/results/presenter.rs

use serde::Serialize;

use crate::config::{FEEDBACK_REQUIRED_AFTER, PASSING_SCORE_PERCENTAGE};
use crate::models::{
    exam_result::ExamResult,
    feedback::Feedback,
    question::OptionLabel,
};

/// Feedback form state on the results screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedbackPanel {
    /// No feedback yet, form shown but not mandatory.
    Open,
    /// No feedback yet and enough attempts taken: form shown, retake blocked.
    Required,
    /// Feedback exists but is not locked.
    Editable { rating: i16, message: String },
    /// Feedback is locked; read-only acknowledgment.
    Acknowledged { rating: i16, message: String },
}

/// Retake availability and feedback panel derived from attempt count and feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackGate {
    pub retake_enabled: bool,
    pub feedback: FeedbackPanel,
}

impl FeedbackGate {
    pub fn evaluate(attempt_count: i64, feedback: Option<&Feedback>) -> Self {
        match feedback {
            None if attempt_count >= FEEDBACK_REQUIRED_AFTER => Self {
                retake_enabled: false,
                feedback: FeedbackPanel::Required,
            },
            None => Self {
                retake_enabled: true,
                feedback: FeedbackPanel::Open,
            },
            Some(f) if f.locked => Self {
                retake_enabled: true,
                feedback: FeedbackPanel::Acknowledged {
                    rating: f.rating,
                    message: f.message.clone(),
                },
            },
            Some(f) => Self {
                retake_enabled: true,
                feedback: FeedbackPanel::Editable {
                    rating: f.rating,
                    message: f.message.clone(),
                },
            },
        }
    }
}

/// Pie (correct vs incorrect) and bar (score) chart inputs.
#[derive(Debug, Clone, Serialize)]
pub struct Charts {
    pub labels: [&'static str; 2],
    pub correct_vs_incorrect: [usize; 2],
    pub score: f64,
}

/// One reviewed question.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewItem {
    pub question_id: i64,
    /// Absent when the result carries no snapshot for this id.
    pub question: Option<String>,
    pub selected: Option<OptionLabel>,
    pub selected_text: Option<String>,
    pub correct: OptionLabel,
    pub correct_text: Option<String>,
    pub is_correct: bool,
}

/// Results screen payload.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub id: i64,
    pub score: f64,
    pub passed: bool,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub time_taken: i32,
    pub time_taken_display: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub attempt_count: i64,
    #[serde(flatten)]
    pub gate: FeedbackGate,
    pub charts: Charts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Vec<ReviewItem>>,
}

/// Loaded page data.
#[derive(Debug, Clone)]
pub struct ReadyPage {
    result: ExamResult,
    attempt_count: i64,
    gate: FeedbackGate,
    review_open: bool,
}

impl ReadyPage {
    pub fn gate(&self) -> &FeedbackGate {
        &self.gate
    }

    pub fn review_open(&self) -> bool {
        self.review_open
    }

    pub fn view(&self) -> ResultView {
        let (correct_count, incorrect_count) = tally(&self.result);
        let score = self.result.score;

        ResultView {
            id: self.result.id,
            score,
            passed: score >= PASSING_SCORE_PERCENTAGE,
            correct_count,
            incorrect_count,
            time_taken: self.result.time_taken,
            time_taken_display: format!(
                "{}m {}s",
                self.result.time_taken / 60,
                self.result.time_taken % 60
            ),
            created_at: self.result.created_at,
            attempt_count: self.attempt_count,
            gate: self.gate.clone(),
            charts: Charts {
                labels: ["Correct", "Incorrect"],
                correct_vs_incorrect: [correct_count, incorrect_count],
                score,
            },
            review: self.review_open.then(|| review_items(&self.result)),
        }
    }
}

/// Results screen state machine.
#[derive(Debug, Clone)]
pub enum ResultsPage {
    Loading,
    Failed(String),
    Ready(Box<ReadyPage>),
}

#[derive(Debug, Clone)]
pub enum ResultsEvent {
    Loaded {
        result: ExamResult,
        attempt_count: i64,
        feedback: Option<Feedback>,
    },
    LoadFailed(String),
    ToggleReview,
    FeedbackSubmitted(Feedback),
}

impl ResultsPage {
    pub fn apply(self, event: ResultsEvent) -> Self {
        match (self, event) {
            (
                ResultsPage::Loading,
                ResultsEvent::Loaded {
                    result,
                    attempt_count,
                    feedback,
                },
            ) => ResultsPage::Ready(Box::new(ReadyPage {
                gate: FeedbackGate::evaluate(attempt_count, feedback.as_ref()),
                result,
                attempt_count,
                review_open: false,
            })),
            (ResultsPage::Loading, ResultsEvent::LoadFailed(msg)) => ResultsPage::Failed(msg),
            (ResultsPage::Ready(mut page), ResultsEvent::ToggleReview) => {
                page.review_open = !page.review_open;
                ResultsPage::Ready(page)
            }
            (ResultsPage::Ready(mut page), ResultsEvent::FeedbackSubmitted(feedback)) => {
                page.gate = FeedbackGate::evaluate(page.attempt_count, Some(&feedback));
                ResultsPage::Ready(page)
            }
            (state, _) => state,
        }
    }
}

/// Correct and incorrect counts over the answer key. Missing selections are incorrect.
pub fn tally(result: &ExamResult) -> (usize, usize) {
    let total = result.correct_answers.len();
    let correct = result
        .correct_answers
        .iter()
        .filter(|(id, expected)| result.selected_answers.get(*id) == Some(*expected))
        .count();
    (correct, total - correct)
}

/// Review items for every id in the answer key, ascending.
pub fn review_items(result: &ExamResult) -> Vec<ReviewItem> {
    result
        .correct_answers
        .iter()
        .map(|(&id, &correct)| {
            let snapshot = result.questions_data.get(&id);
            let selected = result.selected_answers.get(&id).copied();
            ReviewItem {
                question_id: id,
                question: snapshot.map(|s| s.question.clone()),
                selected,
                selected_text: snapshot
                    .zip(selected)
                    .map(|(s, label)| s.option_text(label).to_string()),
                correct,
                correct_text: snapshot.map(|s| s.option_text(correct).to_string()),
                is_correct: selected == Some(correct),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionSnapshot;
    use std::collections::BTreeMap;
    use sqlx::types::Json;

    fn snapshot(id: i64) -> QuestionSnapshot {
        QuestionSnapshot {
            id,
            question: format!("Question {}", id),
            option_a: "Stop".to_string(),
            option_b: "Go".to_string(),
            option_c: "Wait".to_string(),
            option_d: "Turn".to_string(),
            correct_answer: OptionLabel::A,
        }
    }

    fn result(score: f64) -> ExamResult {
        let correct: BTreeMap<i64, OptionLabel> =
            [(1, OptionLabel::A), (2, OptionLabel::B), (3, OptionLabel::C)].into_iter().collect();
        let selected: BTreeMap<i64, OptionLabel> =
            [(1, OptionLabel::A), (2, OptionLabel::D)].into_iter().collect();
        let data: BTreeMap<i64, QuestionSnapshot> = [(1, snapshot(1)), (2, snapshot(2))].into_iter().collect();

        ExamResult {
            id: 10,
            user_id: 1,
            question_ids: vec![1, 2, 3],
            selected_answers: Json(selected),
            correct_answers: Json(correct),
            questions_data: Json(data),
            score,
            time_taken: 125,
            created_at: chrono::Utc::now(),
        }
    }

    fn feedback(locked: bool) -> Feedback {
        Feedback {
            id: 1,
            user_id: 1,
            name: "Anonymous".to_string(),
            rating: 5,
            message: "Great".to_string(),
            locked,
            created_at: chrono::Utc::now(),
        }
    }

    fn ready(page: ResultsPage) -> Box<ReadyPage> {
        match page {
            ResultsPage::Ready(page) => page,
            other => panic!("expected ready page, got {:?}", other),
        }
    }

    #[test]
    fn test_gate_requires_feedback_after_three_attempts() {
        let gate = FeedbackGate::evaluate(3, None);
        assert!(!gate.retake_enabled);
        assert_eq!(gate.feedback, FeedbackPanel::Required);

        let gate = FeedbackGate::evaluate(2, None);
        assert!(gate.retake_enabled);
        assert_eq!(gate.feedback, FeedbackPanel::Open);
    }

    #[test]
    fn test_gate_with_existing_feedback() {
        let editable = FeedbackGate::evaluate(5, Some(&feedback(false)));
        assert!(editable.retake_enabled);
        assert!(matches!(editable.feedback, FeedbackPanel::Editable { .. }));

        let locked = FeedbackGate::evaluate(5, Some(&feedback(true)));
        assert!(locked.retake_enabled);
        assert!(matches!(locked.feedback, FeedbackPanel::Acknowledged { rating: 5, .. }));
    }

    #[test]
    fn test_view_tallies_and_pass_mark() {
        let page = ResultsPage::Loading.apply(ResultsEvent::Loaded {
            result: result(33.33),
            attempt_count: 1,
            feedback: None,
        });
        let view = ready(page).view();
        assert_eq!(view.correct_count, 1);
        assert_eq!(view.incorrect_count, 2);
        assert!(!view.passed);
        assert_eq!(view.time_taken_display, "2m 5s");
        assert!(view.review.is_none());

        let passing = ResultsPage::Loading.apply(ResultsEvent::Loaded {
            result: result(90.0),
            attempt_count: 1,
            feedback: None,
        });
        assert!(ready(passing).view().passed);
    }

    #[test]
    fn test_review_uses_snapshot_and_tolerates_missing_one() {
        let page = ResultsPage::Loading
            .apply(ResultsEvent::Loaded {
                result: result(33.33),
                attempt_count: 1,
                feedback: None,
            })
            .apply(ResultsEvent::ToggleReview);
        let review = ready(page).view().review.unwrap();

        assert_eq!(review.len(), 3);
        assert_eq!(review[0].selected_text.as_deref(), Some("Stop"));
        assert!(review[0].is_correct);
        assert_eq!(review[1].selected_text.as_deref(), Some("Turn"));
        assert_eq!(review[1].correct_text.as_deref(), Some("Go"));
        assert!(review[2].question.is_none());
        assert!(review[2].selected.is_none());
        assert!(review[2].correct_text.is_none());
        assert_eq!(review[2].correct, OptionLabel::C);
    }

    #[test]
    fn test_toggle_review_twice_closes_it() {
        let page = ResultsPage::Loading
            .apply(ResultsEvent::Loaded {
                result: result(0.0),
                attempt_count: 1,
                feedback: None,
            })
            .apply(ResultsEvent::ToggleReview)
            .apply(ResultsEvent::ToggleReview);
        assert!(!ready(page).review_open());
    }

    #[test]
    fn test_failed_load_ignores_later_events() {
        let page = ResultsPage::Loading
            .apply(ResultsEvent::LoadFailed("Result not found".to_string()))
            .apply(ResultsEvent::ToggleReview);
        assert!(matches!(page, ResultsPage::Failed(ref msg) if msg == "Result not found"));
    }

    #[test]
    fn test_feedback_submission_reopens_retake() {
        let page = ResultsPage::Loading
            .apply(ResultsEvent::Loaded {
                result: result(40.0),
                attempt_count: 3,
                feedback: None,
            });
        assert!(!ready(page.clone()).gate().retake_enabled);

        let page = page.apply(ResultsEvent::FeedbackSubmitted(feedback(true)));
        let gate = ready(page).gate().clone();
        assert!(gate.retake_enabled);
        assert!(matches!(gate.feedback, FeedbackPanel::Acknowledged { .. }));
    }
}
