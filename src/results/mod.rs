// src/results/mod.rs

//! Results screen: score summary, answer review, feedback gating.

pub mod feedback;
pub mod presenter;

pub use feedback::{FeedbackOutcome, submit_feedback};
pub use presenter::{FeedbackGate, FeedbackPanel, ResultView, ResultsEvent, ResultsPage};
