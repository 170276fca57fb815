// src/exam/mod.rs

//! Exam session lifecycle: question batch, countdown, answers, scoring.

use thiserror::Error;

use crate::store::StoreError;

pub mod countdown;
pub mod registry;
pub mod scoring;
pub mod session;

pub use registry::ExamRegistry;
pub use session::{ExamEvent, ExamPhase, ExamSession, SessionView, Transition};

#[derive(Debug, Error)]
pub enum ExamError {
    #[error("No exam in progress")]
    NoActiveExam,

    #[error("No questions available: every question has already been attempted")]
    NoQuestionsAvailable,

    #[error("Exam is not in progress")]
    NotInProgress,

    #[error("Exam already finished")]
    AlreadyFinished,

    #[error("Exam questions already loaded")]
    AlreadyLoaded,

    #[error(transparent)]
    Store(#[from] StoreError),
}
