// src/exam/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::task::AbortHandle;
use tokio::time::{Instant, interval_at};
use url::Url;

use super::{
    ExamError,
    session::{ExamEvent, ExamSession, SessionView, Transition},
};
use crate::store::{DynStore, Store};

type SharedSession = Arc<tokio::sync::Mutex<ExamSession>>;

/// A live session and the task counting it down.
struct ActiveExam {
    session: SharedSession,
    ticker: Option<AbortHandle>,
}

impl Drop for ActiveExam {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Owns the exam sessions of all signed-in users, at most one per user.
///
/// Request handlers and the per-session ticker go through the same async
/// mutex, so a tick never interleaves with a selection or a finish.
#[derive(Clone)]
pub struct ExamRegistry {
    sessions: Arc<Mutex<HashMap<i64, ActiveExam>>>,
    duration_secs: u32,
    question_count: i64,
}

impl ExamRegistry {
    pub fn new(duration_secs: u32, question_count: i64) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            duration_secs,
            question_count,
        }
    }

    fn get(&self, user_id: i64) -> Option<SharedSession> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .map(|active| active.session.clone())
    }

    /// Removes the user's entry only if it still holds `session`.
    fn remove_if_current(&self, user_id: i64, session: &SharedSession) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if sessions
            .get(&user_id)
            .is_some_and(|active| Arc::ptr_eq(&active.session, session))
        {
            sessions.remove(&user_id);
        }
    }

    /// Starts a new attempt, or returns the one already in progress.
    /// An unsaved finished attempt is stored first; if that fails nothing new starts.
    pub async fn start(
        &self,
        user_id: i64,
        store: &DynStore,
        media_base: Option<&Url>,
    ) -> Result<SessionView, ExamError> {
        if let Some(existing) = self.get(user_id) {
            let mut guard = existing.lock().await;
            if guard.remaining_seconds().is_some() {
                return Ok(guard.view(media_base));
            }
            // A finished attempt whose save failed is stored before its
            // questions could be served again.
            if guard.pending_result().is_some() {
                persist(&mut guard, store.as_ref()).await?;
            }
        }

        let session: SharedSession =
            Arc::new(tokio::sync::Mutex::new(ExamSession::new(user_id, self.duration_secs)));
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                user_id,
                ActiveExam {
                    session: session.clone(),
                    ticker: None,
                },
            );

        let mut guard = session.lock().await;

        let batch = async {
            let excluded = store.attempted_question_ids(user_id).await?;
            store.fetch_questions(&excluded, self.question_count).await
        }
        .await;

        let questions = match batch {
            Ok(questions) => questions,
            Err(e) => {
                tracing::error!(user_id, "Failed to fetch exam questions: {}", e);
                drop(guard);
                self.remove_if_current(user_id, &session);
                return Err(ExamError::Store(e));
            }
        };

        let count = questions.len();
        guard.apply(ExamEvent::BatchArrived {
            questions,
            at: Utc::now(),
        })?;

        if count == 0 {
            tracing::info!(user_id, "No unseen questions left for user");
            drop(guard);
            self.remove_if_current(user_id, &session);
            return Err(ExamError::NoQuestionsAvailable);
        }

        let ticker = spawn_ticker(session.clone(), store.clone());
        {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            match sessions.get_mut(&user_id) {
                Some(active) if Arc::ptr_eq(&active.session, &session) => {
                    active.ticker = Some(ticker);
                }
                _ => ticker.abort(),
            }
        }

        tracing::info!(user_id, questions = count, "Exam started");
        Ok(guard.view(media_base))
    }

    pub async fn view(
        &self,
        user_id: i64,
        media_base: Option<&Url>,
    ) -> Result<SessionView, ExamError> {
        let session = self.get(user_id).ok_or(ExamError::NoActiveExam)?;
        let guard = session.lock().await;
        Ok(guard.view(media_base))
    }

    /// Applies a navigation or selection event to the user's session.
    pub async fn update(
        &self,
        user_id: i64,
        event: ExamEvent,
        media_base: Option<&Url>,
    ) -> Result<SessionView, ExamError> {
        let session = self.get(user_id).ok_or(ExamError::NoActiveExam)?;
        let mut guard = session.lock().await;
        guard.apply(event)?;
        Ok(guard.view(media_base))
    }

    /// Finishes the attempt and returns the stored result id.
    ///
    /// Repeated calls (or a call racing the timeout) return the same id and
    /// never store a second result.
    pub async fn finish(&self, user_id: i64, store: &DynStore) -> Result<i64, ExamError> {
        let session = self.get(user_id).ok_or(ExamError::NoActiveExam)?;
        let mut guard = session.lock().await;

        match guard.apply(ExamEvent::Finish { at: Utc::now() }) {
            Ok(_) | Err(ExamError::AlreadyFinished) => {}
            Err(e) => return Err(e),
        }

        let id = persist(&mut guard, store.as_ref()).await?;
        drop(guard);

        let ticker = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&user_id)
            .and_then(|active| active.ticker.take());
        if let Some(ticker) = ticker {
            ticker.abort();
        }

        Ok(id)
    }

    /// Drops the user's session and stops its countdown.
    pub fn abandon(&self, user_id: i64) -> bool {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id);
        if removed.is_some() {
            tracing::info!(user_id, "Exam session abandoned");
        }
        removed.is_some()
    }
}

/// Stores the finished attempt once and records its id on the session.
async fn persist(session: &mut ExamSession, store: &dyn Store) -> Result<i64, ExamError> {
    if let Some(id) = session.result_id() {
        return Ok(id);
    }

    let pending = session
        .pending_result()
        .cloned()
        .ok_or(ExamError::NotInProgress)?;
    let stored = store.insert_result(&pending).await?;
    session.mark_persisted(stored.id);

    tracing::info!(
        user_id = stored.user_id,
        result_id = stored.id,
        score = stored.score,
        "Exam result saved"
    );
    Ok(stored.id)
}

fn spawn_ticker(session: SharedSession, store: DynStore) -> AbortHandle {
    tokio::spawn(async move {
        let period = Duration::from_secs(1);
        let mut interval = interval_at(Instant::now() + period, period);

        loop {
            interval.tick().await;
            let mut guard = session.lock().await;

            match guard.apply(ExamEvent::Tick { at: Utc::now() }) {
                Ok(Transition::Updated) => {}
                Ok(Transition::Completed(_)) => {
                    tracing::info!(user_id = guard.user_id(), "Exam time is up, submitting");
                    if let Err(e) = persist(&mut guard, store.as_ref()).await {
                        tracing::error!(
                            user_id = guard.user_id(),
                            "Failed to save timed-out exam: {}",
                            e
                        );
                    }
                    break;
                }
                Err(_) => break,
            }
        }
    })
    .abort_handle()
}
