// tests/postgres_store_tests.rs
//
// Runs against the database named by DATABASE_URL and is skipped when it is
// unset. The database should be dedicated to tests: rows are added on every
// run and never cleaned up.

mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use common::{PASSWORD, spawn_app_with, unique_name};
use drive_prep::{
    models::{
        exam_result::NewExamResult,
        feedback::SubmitFeedbackRequest,
        question::{OptionLabel, QuestionSnapshot},
    },
    results::submit_feedback,
    store::{DynStore, PgStore, StoreError},
};
use sqlx::postgres::PgPoolOptions;

/// Connects and migrates, or returns `None` when no database is configured.
async fn pg_store() -> Option<DynStore> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(Arc::new(PgStore::new(pool, Duration::from_secs(5))))
}

async fn new_user(store: &DynStore) -> i64 {
    store
        .create_user(&unique_name("pg"), "not-a-real-hash", "user", None)
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn pg_duplicate_username_conflicts() {
    let Some(store) = pg_store().await else { return };
    let username = unique_name("dup");

    store.create_user(&username, "hash", "user", None).await.unwrap();
    let second = store.create_user(&username, "hash", "user", None).await;

    assert!(matches!(second, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn pg_locked_feedback_is_never_rewritten() {
    let Some(store) = pg_store().await else { return };
    let user_id = new_user(&store).await;

    let first = store
        .lock_feedback(user_id, "Anonymous", 5, "Great")
        .await
        .unwrap()
        .expect("first submission locks");
    assert!(first.locked);

    let second = store
        .lock_feedback(user_id, "Anonymous", 1, "Changed my mind")
        .await
        .unwrap();
    assert!(second.is_none());

    let stored = store.get_feedback(user_id).await.unwrap().unwrap();
    assert_eq!(stored.rating, 5);
    assert_eq!(stored.message, "Great");
}

#[tokio::test]
async fn pg_low_rating_submission_leaves_note() {
    let Some(store) = pg_store().await else { return };
    let user_id = new_user(&store).await;

    let outcome = submit_feedback(
        store.as_ref(),
        user_id,
        SubmitFeedbackRequest {
            rating: 2,
            message: "Too few questions".to_string(),
        },
    )
    .await
    .unwrap();
    assert!(outcome.low_rating_noted);

    let notes = store.list_low_rating_notes().await.unwrap();
    let mine: Vec<_> = notes.iter().filter(|n| n.user_id == user_id).collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].rating, 2);
    assert_eq!(mine[0].message, "Too few questions");
}

#[tokio::test]
async fn pg_result_round_trips_answer_maps() {
    let Some(store) = pg_store().await else { return };
    let user_id = new_user(&store).await;

    let snapshot = QuestionSnapshot {
        id: 11,
        question: "What does a red octagon mean?".to_string(),
        option_a: "Stop".to_string(),
        option_b: "Yield".to_string(),
        option_c: "No entry".to_string(),
        option_d: "Parking".to_string(),
        correct_answer: OptionLabel::A,
    };
    let stored = store
        .insert_result(&NewExamResult {
            user_id,
            question_ids: vec![11, 12],
            selected_answers: BTreeMap::from([(11, OptionLabel::C)]),
            correct_answers: BTreeMap::from([(11, OptionLabel::A), (12, OptionLabel::D)]),
            questions_data: BTreeMap::from([(11, snapshot.clone())]),
            score: 0.0,
            time_taken: 42,
        })
        .await
        .unwrap();

    let loaded = store.get_result(stored.id).await.unwrap().unwrap();
    assert_eq!(loaded.question_ids, vec![11, 12]);
    assert_eq!(loaded.selected_answers.get(&11), Some(&OptionLabel::C));
    assert!(loaded.selected_answers.get(&12).is_none());
    assert_eq!(loaded.correct_answers.get(&12), Some(&OptionLabel::D));
    assert_eq!(loaded.questions_data.get(&11), Some(&snapshot));
    assert_eq!(loaded.time_taken, 42);

    let attempted = store.attempted_question_ids(user_id).await.unwrap();
    assert_eq!(attempted, BTreeSet::from([11, 12]));
}

#[tokio::test]
async fn pg_deleting_user_cascades() {
    let Some(store) = pg_store().await else { return };
    let user_id = new_user(&store).await;

    let stored = store
        .insert_result(&NewExamResult {
            user_id,
            question_ids: vec![1],
            selected_answers: BTreeMap::new(),
            correct_answers: BTreeMap::from([(1, OptionLabel::A)]),
            questions_data: BTreeMap::new(),
            score: 0.0,
            time_taken: 5,
        })
        .await
        .unwrap();
    store.lock_feedback(user_id, "Anonymous", 1, "Bad").await.unwrap();
    store.insert_low_rating_note(user_id, 1, "Bad").await.unwrap();
    store.get_or_create_progress(user_id).await.unwrap();

    store.delete_user(user_id).await.unwrap();

    assert!(store.find_user(user_id).await.unwrap().is_none());
    assert!(store.get_result(stored.id).await.unwrap().is_none());
    assert!(store.get_feedback(user_id).await.unwrap().is_none());
    let notes = store.list_low_rating_notes().await.unwrap();
    assert!(notes.iter().all(|n| n.user_id != user_id));
    assert!(matches!(
        store.delete_user(user_id).await,
        Err(StoreError::NotFound)
    ));
}

// Topics and questions are shared by every user, so the flows that add them
// run in one test.
#[tokio::test]
async fn pg_notes_then_exams_over_http() {
    let Some(store) = pg_store().await else { return };
    let app = spawn_app_with(store).await;

    let username = unique_name("pg");
    let registered = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(registered.status().as_u16(), 201);
    let token = app.login(&username, PASSWORD).await;
    let user_id = app
        .store
        .find_user_by_username(&username)
        .await
        .unwrap()
        .unwrap()
        .id;

    // Notes: completing a topic twice records it once
    let topic = app
        .store
        .insert_topic("Road signs", "notes/signs.md")
        .await
        .unwrap();
    app.complete_all_notes(&token).await;
    let again = app
        .post(&format!("/api/notes/{}/complete", topic.id), &token)
        .await;
    assert_eq!(again.status().as_u16(), 200);

    let progress = app.store.get_or_create_progress(user_id).await.unwrap();
    let topics = app.store.list_topics().await.unwrap();
    assert_eq!(progress.completed_ids.len(), topics.len());
    assert_eq!(
        progress.completed_ids.iter().filter(|&&id| id == topic.id).count(),
        1
    );

    let notes: serde_json::Value = app.get("/api/notes", &token).await.json().await.unwrap();
    assert_eq!(notes["progress_percentage"], 100);
    assert_eq!(notes["exam_unlocked"], true);

    // First exam: everything right except the last question
    app.seed_questions(50).await;
    let first_id = app
        .take_exam(&token, |i| Some(if i == 24 { "B" } else { "A" }))
        .await;

    let review: serde_json::Value = app
        .get(&format!("/api/results/{}?review=true", first_id), &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(review["score"].as_f64().unwrap(), 96.0);
    assert_eq!(review["attempt_count"], 1);
    let items = review["review"].as_array().unwrap();
    assert_eq!(items.len(), 25);
    assert_eq!(items[24]["selected"], "B");
    assert_eq!(items[24]["selected_text"], "Go");
    assert_eq!(items[24]["correct_text"], "Stop");
    assert_eq!(items[24]["is_correct"], false);
    let first_ids: BTreeSet<i64> = items
        .iter()
        .map(|item| item["question_id"].as_i64().unwrap())
        .collect();

    // Second exam never repeats a question of the first
    let second_id = app.take_exam(&token, |_| None).await;
    let stored = app.store.get_result(second_id).await.unwrap().unwrap();
    assert_eq!(stored.question_ids.len(), 25);
    assert!(stored.question_ids.iter().all(|id| !first_ids.contains(id)));

    let attempted = app.store.attempted_question_ids(user_id).await.unwrap();
    assert_eq!(attempted.len(), 50);

    let history: Vec<serde_json::Value> =
        app.get("/api/results", &token).await.json().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["id"], second_id);
    assert_eq!(history[0]["label"], "Attempt 2");
}
