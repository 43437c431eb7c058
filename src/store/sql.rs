// src/store/sql.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqlitePool, types::Json};
use uuid::Uuid;

use super::{AttemptStore, QuestionSource, StoreError};
use crate::models::{
    attempt::{Attempt, NewAttempt},
    question::Question,
    test::Test,
};

/// SQLite-backed implementation of both session collaborators.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionSource for SqlStore {
    async fn fetch_test(&self, test_id: &str) -> Result<Option<Test>, StoreError> {
        let test = sqlx::query_as::<_, Test>(
            r#"
            SELECT id, name, time_limit_minutes, max_score, created_at
            FROM tests
            WHERE id = ?
            "#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(test)
    }

    async fn fetch_questions(&self, test_id: &str) -> Result<Vec<Question>, StoreError> {
        // Ordered by text, then id so ties stay stable between fetches.
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, test_id, question, options, answer
            FROM questions
            WHERE test_id = ?
            ORDER BY question, id
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }
}

#[async_trait]
impl AttemptStore for SqlStore {
    async fn find_attempt(
        &self,
        user_id: &str,
        test_id: &str,
    ) -> Result<Option<Attempt>, StoreError> {
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT id, user_id, test_id, answers, score, total, max_score,
                   admin_score, timed_out, created_at
            FROM attempts
            WHERE user_id = ? AND test_id = ?
            "#,
        )
        .bind(user_id)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let answers: Vec<Option<i64>> = attempt
            .answers
            .iter()
            .map(|a| a.map(|idx| idx as i64))
            .collect();

        // The unique (user_id, test_id) index turns a lost race into a Conflict.
        sqlx::query(
            r#"
            INSERT INTO attempts
                (id, user_id, test_id, answers, score, total, max_score, timed_out, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&attempt.user_id)
        .bind(&attempt.test_id)
        .bind(Json(&answers))
        .bind(i64::from(attempt.score))
        .bind(i64::from(attempt.total))
        .bind(attempt.max_score)
        .bind(attempt.timed_out)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "Attempt {} recorded for user {} on test {} (score {}/{})",
            id,
            attempt.user_id,
            attempt.test_id,
            attempt.score,
            attempt.total
        );

        Ok(Attempt {
            id,
            user_id: attempt.user_id.clone(),
            test_id: attempt.test_id.clone(),
            answers: Json(answers),
            score: i64::from(attempt.score),
            total: i64::from(attempt.total),
            max_score: attempt.max_score,
            admin_score: None,
            timed_out: attempt.timed_out,
            created_at,
        })
    }
}
