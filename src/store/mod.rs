// src/store/mod.rs

//! Collaborator boundaries consumed by attempt sessions.

pub mod sql;

use std::fmt;

use async_trait::async_trait;

use crate::models::{
    attempt::{Attempt, NewAttempt},
    question::Question,
    test::Test,
};

pub use sql::SqlStore;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A row with the same identity already exists.
    Conflict(String),

    /// Anything else the backend reported (I/O, pool, decode).
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "conflict: {}", msg),
            StoreError::Backend(msg) => write!(f, "backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Supplies test metadata and the ordered question list.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch_test(&self, test_id: &str) -> Result<Option<Test>, StoreError>;

    /// Must return the same order on every call for a given test.
    async fn fetch_questions(&self, test_id: &str) -> Result<Vec<Question>, StoreError>;
}

/// Append-only store of submitted attempts keyed by (user, test).
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn find_attempt(
        &self,
        user_id: &str,
        test_id: &str,
    ) -> Result<Option<Attempt>, StoreError>;

    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, StoreError>;
}
