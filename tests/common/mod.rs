// tests/common/mod.rs

#![allow(dead_code)]

use exam_prep_backend::{config::Config, routes, state::AppState, utils::jwt::Claims};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

/// Helper function to spawn the app on a random port for testing.
/// Each call gets its own in-memory database.
pub async fn spawn_app() -> TestApp {
    // 1. A single connection that never expires keeps the in-memory database alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        default_time_limit_minutes: 30,
        tick_interval_ms: 1000,
    };

    let state = AppState::new(pool.clone(), config);
    let app = routes::create_router(state);

    // 4. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 5. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

/// Mints a token as the identity provider would.
pub fn token(user_id: &str, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

pub fn admin_token() -> String {
    token("admin_1", "admin")
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates a test through the admin API and returns its id.
    pub async fn create_test(
        &self,
        name: &str,
        time_limit_minutes: Option<i64>,
        max_score: Option<i64>,
    ) -> String {
        let resp = self
            .post(
                "/api/admin/tests",
                &admin_token(),
                json!({
                    "name": name,
                    "time_limit_minutes": time_limit_minutes,
                    "max_score": max_score
                }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    /// Adds a four-option question with the given correct index.
    pub async fn add_question(&self, test_id: &str, text: &str, answer: i64) {
        let resp = self
            .post(
                &format!("/api/admin/tests/{}/questions", test_id),
                &admin_token(),
                json!({
                    "question": text,
                    "options": ["A", "B", "C", "D"],
                    "answer": answer
                }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);
    }

    /// Two questions whose correct indices are [1, 0] in presentation order.
    pub async fn seed_two_question_test(&self, max_score: Option<i64>) -> String {
        let test_id = self.create_test("Physics", Some(1), max_score).await;
        self.add_question(&test_id, "Q1: first", 1).await;
        self.add_question(&test_id, "Q2: second", 0).await;
        test_id
    }

    /// Starts a session and returns the full response body.
    pub async fn start(&self, test_id: &str, token: &str) -> (u16, Value) {
        let resp = self
            .post(&format!("/api/tests/{}/sessions", test_id), token, json!({}))
            .await;
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    pub async fn answer(&self, session_id: &str, token: &str, option: usize) -> reqwest::Response {
        let resp = self
            .post(
                &format!("/api/sessions/{}/select", session_id),
                token,
                json!({ "option": option }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 200);
        self.post(&format!("/api/sessions/{}/advance", session_id), token, json!({}))
            .await
    }
}
