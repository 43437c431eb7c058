// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'attempts' table in the database.
/// One row per (user, test); only `admin_score` changes after insert.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub user_id: String,
    pub test_id: String,

    /// Selected option index per question, `null` when unanswered.
    pub answers: Json<Vec<Option<i64>>>,

    pub score: i64,

    /// Number of questions in the test at submission time.
    pub total: i64,

    pub max_score: i64,

    /// Override assigned by an administrator.
    pub admin_score: Option<i64>,

    pub timed_out: bool,

    pub created_at: DateTime<Utc>,
}

/// Values written by a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttempt {
    pub user_id: String,
    pub test_id: String,
    pub answers: Vec<Option<usize>>,
    pub score: u32,
    pub total: u32,
    pub max_score: i64,
    pub timed_out: bool,
}

/// Sums shown on the student dashboard.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AttemptTotals {
    pub total_score: i64,
    pub total_admin_score: i64,
    pub total_max_score: i64,
}

impl AttemptTotals {
    pub fn from_attempts(attempts: &[Attempt]) -> Self {
        attempts.iter().fold(Self::default(), |mut acc, a| {
            acc.total_score += a.score;
            acc.total_admin_score += a.admin_score.unwrap_or(0);
            acc.total_max_score += a.max_score;
            acc
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MyAttemptsResponse {
    pub attempts: Vec<Attempt>,
    pub totals: AttemptTotals,
}

/// DTO for the administrator override score.
#[derive(Debug, Deserialize, Validate)]
pub struct SetAdminScoreRequest {
    #[validate(range(min = 0))]
    pub admin_score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(score: i64, admin_score: Option<i64>, max_score: i64) -> Attempt {
        Attempt {
            id: "a".to_string(),
            user_id: "u".to_string(),
            test_id: "t".to_string(),
            answers: Json(vec![]),
            score,
            total: 2,
            max_score,
            admin_score,
            timed_out: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn totals_sum_scores_and_skip_missing_overrides() {
        let attempts = vec![attempt(3, Some(8), 10), attempt(1, None, 5)];
        let totals = AttemptTotals::from_attempts(&attempts);
        assert_eq!(
            totals,
            AttemptTotals {
                total_score: 4,
                total_admin_score: 8,
                total_max_score: 15,
            }
        );
    }

    #[test]
    fn totals_of_nothing_are_zero() {
        assert_eq!(AttemptTotals::from_attempts(&[]), AttemptTotals::default());
    }
}
