// src/session/testing.rs

//! In-memory collaborators for session tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Notify;

use crate::{
    models::{
        attempt::{Attempt, NewAttempt},
        question::Question,
        test::Test,
    },
    store::{AttemptStore, QuestionSource, StoreError},
};

pub fn question(text: &str, answer: i64) -> Question {
    Question {
        id: format!("q-{}", text),
        test_id: "t1".to_string(),
        question: text.to_string(),
        options: Json(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
        answer,
    }
}

pub struct FakeSource {
    test: Arc<Mutex<Option<Test>>>,
    questions: Vec<Question>,
}

impl FakeSource {
    pub fn new(
        time_limit_minutes: Option<i64>,
        max_score: Option<i64>,
        questions: Vec<Question>,
    ) -> Self {
        let test = Test {
            id: "t1".to_string(),
            name: "Mock Test".to_string(),
            time_limit_minutes,
            max_score,
            created_at: Utc::now(),
        };
        Self {
            test: Arc::new(Mutex::new(Some(test))),
            questions,
        }
    }

    pub fn missing() -> Self {
        Self {
            test: Arc::new(Mutex::new(None)),
            questions: Vec::new(),
        }
    }

    /// Shared handle to the test record, for editing it mid-session.
    pub fn test_handle(&self) -> Arc<Mutex<Option<Test>>> {
        self.test.clone()
    }
}

#[async_trait]
impl QuestionSource for FakeSource {
    async fn fetch_test(&self, _test_id: &str) -> Result<Option<Test>, StoreError> {
        Ok(self.test.lock().unwrap().clone())
    }

    async fn fetch_questions(&self, _test_id: &str) -> Result<Vec<Question>, StoreError> {
        Ok(self.questions.clone())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum WriteMode {
    #[default]
    Accept,
    Fail,
    Conflict,
}

#[derive(Default)]
pub struct FakeStore {
    existing: Vec<(String, String)>,
    writes: Mutex<Vec<NewAttempt>>,
    calls: AtomicUsize,
    mode: Mutex<WriteMode>,
    gate: Option<Arc<Notify>>,
}

impl FakeStore {
    pub fn with_existing(user_id: &str, test_id: &str) -> Self {
        Self {
            existing: vec![(user_id.to_string(), test_id.to_string())],
            ..Self::default()
        }
    }

    /// Every write waits for `gate` to be notified before completing.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn set_mode(&self, mode: WriteMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn writes(&self) -> Vec<NewAttempt> {
        self.writes.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttemptStore for FakeStore {
    async fn find_attempt(
        &self,
        user_id: &str,
        test_id: &str,
    ) -> Result<Option<Attempt>, StoreError> {
        let found = self
            .existing
            .iter()
            .any(|(u, t)| u == user_id && t == test_id);

        Ok(found.then(|| Attempt {
            id: "existing".to_string(),
            user_id: user_id.to_string(),
            test_id: test_id.to_string(),
            answers: Json(vec![]),
            score: 0,
            total: 0,
            max_score: 1,
            admin_score: None,
            timed_out: false,
            created_at: Utc::now(),
        }))
    }

    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let mode = *self.mode.lock().unwrap();
        match mode {
            WriteMode::Fail => return Err(StoreError::Backend("connection reset".to_string())),
            WriteMode::Conflict => {
                return Err(StoreError::Conflict("UNIQUE constraint failed".to_string()));
            }
            WriteMode::Accept => {}
        }

        self.writes.lock().unwrap().push(attempt.clone());
        Ok(Attempt {
            id: "new".to_string(),
            user_id: attempt.user_id.clone(),
            test_id: attempt.test_id.clone(),
            answers: Json(
                attempt
                    .answers
                    .iter()
                    .map(|a| a.map(|i| i as i64))
                    .collect(),
            ),
            score: i64::from(attempt.score),
            total: i64::from(attempt.total),
            max_score: attempt.max_score,
            admin_score: None,
            timed_out: attempt.timed_out,
            created_at: Utc::now(),
        })
    }
}
