// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use drive_prep::{
    config::{Config, parse_media_base},
    models::question::{CreateQuestionRequest, OptionLabel},
    routes,
    state::AppState,
    store::{DynStore, MemoryStore},
    utils::hash::hash_password,
};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub store: DynStore,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port over a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(MemoryStore::new())).await
}

/// Spawns the app on a random port over `store`.
pub async fn spawn_app_with(store: DynStore) -> TestApp {
    let config = Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        media_base_url: Some(parse_media_base("https://cdn.example.com/exam-media").unwrap()),
        store_timeout: Duration::from_secs(5),
        admin_username: None,
        admin_password: None,
    };

    let app = routes::create_router(AppState::new(store.clone(), config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a user and returns a bearer token for it.
    pub async fn signup(&self) -> String {
        let username = unique_name("u");

        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(response.status().as_u16(), 201);

        self.login(&username, PASSWORD).await
    }

    /// Creates an admin account directly in the store and logs in.
    pub async fn admin(&self) -> String {
        let username = unique_name("admin");
        let hash = hash_password(PASSWORD).unwrap();
        self.store
            .create_user(&username, &hash, "admin", None)
            .await
            .unwrap();
        self.login(&username, PASSWORD).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let body = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json::<serde_json::Value>()
            .await
            .expect("Failed to parse login json");

        body["token"].as_str().expect("Token not found").to_string()
    }

    /// Adds `count` questions, each answered correctly by `A`. Every second
    /// one carries a picture. On a fresh in-memory store the ids run `1..=count`.
    pub async fn seed_questions(&self, count: i64) {
        for n in 1..=count {
            self.store
                .insert_question(&CreateQuestionRequest {
                    question: format!("Question {}", n),
                    option_a: "Stop".to_string(),
                    option_b: "Go".to_string(),
                    option_c: "Honk".to_string(),
                    option_d: "Reverse".to_string(),
                    correct_answer: OptionLabel::A,
                    image_path: (n % 2 == 0).then(|| format!("signs/{}.png", n)),
                })
                .await
                .unwrap();
        }
    }

    /// Completes every study topic in order so the exam unlocks.
    pub async fn complete_all_notes(&self, token: &str) {
        let notes: serde_json::Value = self.get("/api/notes", token).await.json().await.unwrap();
        for topic in notes["topics"].as_array().unwrap() {
            if topic["completed"] == true {
                continue;
            }
            let path = format!("/api/notes/{}/complete", topic["id"]);
            let response = self.post(&path, token).await;
            assert_eq!(response.status().as_u16(), 200);
        }
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post_json(
        &self,
        path: &str,
        token: &str,
        body: serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn put_json(
        &self,
        path: &str,
        token: &str,
        body: serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed")
    }

    /// Starts an exam, answers every question with `answer(index)` and finishes.
    /// Returns the result id.
    pub async fn take_exam<F>(&self, token: &str, answer: F) -> i64
    where
        F: Fn(usize) -> Option<&'static str>,
    {
        let start = self.post("/api/exam", token).await;
        assert_eq!(start.status().as_u16(), 200);
        let mut view: serde_json::Value = start.json().await.unwrap();
        assert_eq!(view["phase"], "in_progress");

        let total = view["total"].as_u64().unwrap() as usize;
        for index in 0..total {
            if let Some(label) = answer(index) {
                let response = self
                    .put_json("/api/exam/answer", token, serde_json::json!({ "label": label }))
                    .await;
                assert_eq!(response.status().as_u16(), 200);
            }
            if index + 1 < total {
                view = self.post("/api/exam/next", token).await.json().await.unwrap();
                assert_eq!(view["index"].as_u64().unwrap() as usize, index + 1);
            }
        }

        let finish: serde_json::Value = self
            .post("/api/exam/finish", token)
            .await
            .json()
            .await
            .unwrap();
        finish["result_id"].as_i64().expect("result_id missing")
    }
}
