// src/state.rs

use axum::extract::FromRef;

use crate::{
    config::{Config, EXAM_DURATION_SECS, EXAM_QUESTION_COUNT},
    exam::ExamRegistry,
    store::DynStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Config,
    pub exams: ExamRegistry,
}

impl AppState {
    /// Builds the state with the standard exam length and batch size.
    pub fn new(store: DynStore, config: Config) -> Self {
        Self {
            store,
            config,
            exams: ExamRegistry::new(EXAM_DURATION_SECS, EXAM_QUESTION_COUNT),
        }
    }
}

impl FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ExamRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.exams.clone()
    }
}
