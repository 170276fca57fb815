// src/exam/session.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use super::{ExamError, countdown::Countdown, scoring::calculate_score};
use crate::models::{
    exam_result::NewExamResult,
    question::{OptionLabel, PublicQuestion, Question},
};

/// Inputs of the exam state machine. Ticks and user actions are applied one
/// at a time by the owner of the session.
#[derive(Debug, Clone)]
pub enum ExamEvent {
    BatchArrived {
        questions: Vec<Question>,
        at: DateTime<Utc>,
    },
    Select(OptionLabel),
    Next,
    Previous,
    Tick {
        at: DateTime<Utc>,
    },
    Finish {
        at: DateTime<Utc>,
    },
}

/// What applying an event produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Updated,
    /// The attempt ended (explicitly or by timeout). Emitted once per session.
    Completed(NewExamResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamPhase {
    Loading,
    InProgress,
    Finished,
    /// Every question has already been used by the user's prior attempts.
    Exhausted,
}

#[derive(Debug)]
struct Attempt {
    questions: Vec<Question>,
    index: usize,
    countdown: Countdown,
    answers: BTreeMap<i64, OptionLabel>,
    started_at: DateTime<Utc>,
}

impl Attempt {
    fn current(&self) -> &Question {
        &self.questions[self.index]
    }

    fn is_last(&self) -> bool {
        self.index + 1 >= self.questions.len()
    }
}

#[derive(Debug)]
struct Completed {
    result: NewExamResult,
    result_id: Option<i64>,
    timed_out: bool,
}

#[derive(Debug)]
enum Phase {
    Loading,
    InProgress(Attempt),
    Finished(Completed),
    Exhausted,
}

/// One timed attempt, from question acquisition to the scored result.
#[derive(Debug)]
pub struct ExamSession {
    user_id: i64,
    duration_secs: u32,
    phase: Phase,
}

impl ExamSession {
    pub fn new(user_id: i64, duration_secs: u32) -> Self {
        Self {
            user_id,
            duration_secs,
            phase: Phase::Loading,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn phase(&self) -> ExamPhase {
        match self.phase {
            Phase::Loading => ExamPhase::Loading,
            Phase::InProgress(_) => ExamPhase::InProgress,
            Phase::Finished(_) => ExamPhase::Finished,
            Phase::Exhausted => ExamPhase::Exhausted,
        }
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        match &self.phase {
            Phase::InProgress(attempt) => Some(attempt.countdown.remaining()),
            _ => None,
        }
    }

    /// The finished attempt that has not been stored yet.
    pub fn pending_result(&self) -> Option<&NewExamResult> {
        match &self.phase {
            Phase::Finished(done) if done.result_id.is_none() => Some(&done.result),
            _ => None,
        }
    }

    pub fn result_id(&self) -> Option<i64> {
        match &self.phase {
            Phase::Finished(done) => done.result_id,
            _ => None,
        }
    }

    pub fn mark_persisted(&mut self, id: i64) {
        if let Phase::Finished(done) = &mut self.phase {
            done.result_id = Some(id);
        }
    }

    pub fn apply(&mut self, event: ExamEvent) -> Result<Transition, ExamError> {
        match event {
            ExamEvent::BatchArrived { questions, at } => self.load(questions, at),
            ExamEvent::Select(label) => {
                let attempt = self.attempt_mut()?;
                let id = attempt.current().id;
                attempt.answers.insert(id, label);
                Ok(Transition::Updated)
            }
            ExamEvent::Next => {
                let attempt = self.attempt_mut()?;
                if !attempt.is_last() {
                    attempt.index += 1;
                }
                Ok(Transition::Updated)
            }
            ExamEvent::Previous => {
                let attempt = self.attempt_mut()?;
                attempt.index = attempt.index.saturating_sub(1);
                Ok(Transition::Updated)
            }
            ExamEvent::Tick { at } => {
                if self.attempt_mut()?.countdown.tick() {
                    self.finish(at, true)
                } else {
                    Ok(Transition::Updated)
                }
            }
            ExamEvent::Finish { at } => self.finish(at, false),
        }
    }

    fn load(&mut self, questions: Vec<Question>, at: DateTime<Utc>) -> Result<Transition, ExamError> {
        match self.phase {
            Phase::Loading => {}
            Phase::InProgress(_) => return Err(ExamError::AlreadyLoaded),
            Phase::Finished(_) => return Err(ExamError::AlreadyFinished),
            Phase::Exhausted => return Err(ExamError::NoQuestionsAvailable),
        }

        self.phase = if questions.is_empty() {
            Phase::Exhausted
        } else {
            Phase::InProgress(Attempt {
                questions,
                index: 0,
                countdown: Countdown::new(self.duration_secs),
                answers: BTreeMap::new(),
                started_at: at,
            })
        };
        Ok(Transition::Updated)
    }

    fn attempt_mut(&mut self) -> Result<&mut Attempt, ExamError> {
        match &mut self.phase {
            Phase::InProgress(attempt) => Ok(attempt),
            Phase::Loading => Err(ExamError::NotInProgress),
            Phase::Finished(_) => Err(ExamError::AlreadyFinished),
            Phase::Exhausted => Err(ExamError::NoQuestionsAvailable),
        }
    }

    fn finish(&mut self, at: DateTime<Utc>, timed_out: bool) -> Result<Transition, ExamError> {
        self.attempt_mut()?;
        let Phase::InProgress(attempt) = std::mem::replace(&mut self.phase, Phase::Loading) else {
            return Err(ExamError::NotInProgress);
        };

        let result = build_result(self.user_id, self.duration_secs, attempt, at)?;
        self.phase = Phase::Finished(Completed {
            result: result.clone(),
            result_id: None,
            timed_out,
        });
        Ok(Transition::Completed(result))
    }

    pub fn view(&self, media_base: Option<&Url>) -> SessionView {
        match &self.phase {
            Phase::Loading => SessionView::Loading,
            Phase::Exhausted => SessionView::NoQuestions,
            Phase::InProgress(attempt) => {
                let current = attempt.current();
                SessionView::InProgress {
                    index: attempt.index,
                    total: attempt.questions.len(),
                    question: PublicQuestion::from_question(current, media_base),
                    selected: attempt.answers.get(&current.id).copied(),
                    answered: attempt.answers.len(),
                    remaining_seconds: attempt.countdown.remaining(),
                    time_left: attempt.countdown.display(),
                    is_first: attempt.index == 0,
                    is_last: attempt.is_last(),
                }
            }
            Phase::Finished(done) => SessionView::Finished {
                result_id: done.result_id,
                score: done.result.score,
                timed_out: done.timed_out,
            },
        }
    }
}

fn build_result(
    user_id: i64,
    duration_secs: u32,
    attempt: Attempt,
    at: DateTime<Utc>,
) -> Result<NewExamResult, ExamError> {
    let question_ids: Vec<i64> = attempt.questions.iter().map(|q| q.id).collect();
    let correct_answers: BTreeMap<i64, OptionLabel> = attempt
        .questions
        .iter()
        .map(|q| (q.id, q.correct_answer))
        .collect();
    let questions_data = attempt
        .questions
        .iter()
        .map(|q| (q.id, q.snapshot()))
        .collect();

    let score = calculate_score(&question_ids, &attempt.answers, &correct_answers)
        .ok_or(ExamError::NoQuestionsAvailable)?;

    let elapsed = (at - attempt.started_at)
        .num_seconds()
        .clamp(0, i64::from(duration_secs)) as i32;

    Ok(NewExamResult {
        user_id,
        question_ids,
        selected_answers: attempt.answers,
        correct_answers,
        questions_data,
        score: score.percentage,
        time_taken: elapsed,
    })
}

/// What the exam screen shows for the current session.
#[derive(Debug, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionView {
    Loading,
    InProgress {
        index: usize,
        total: usize,
        question: PublicQuestion,
        selected: Option<OptionLabel>,
        answered: usize,
        remaining_seconds: u32,
        time_left: String,
        is_first: bool,
        is_last: bool,
    },
    Finished {
        result_id: Option<i64>,
        score: f64,
        timed_out: bool,
    },
    NoQuestions,
}
