// src/models/test.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'tests' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Test {
    pub id: String,

    /// Display name shown in the catalog.
    pub name: String,

    /// Countdown budget. Sessions fall back to the configured default when absent.
    pub time_limit_minutes: Option<i64>,

    /// Required before any attempt can be written.
    pub max_score: Option<i64>,

    pub created_at: DateTime<Utc>,
}

/// DTO for creating a test.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTestRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1, max = 600))]
    pub time_limit_minutes: Option<i64>,
    #[validate(range(min = 1))]
    pub max_score: Option<i64>,
}

/// DTO for updating a test. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTestRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub time_limit_minutes: Option<i64>,
    #[validate(range(min = 1))]
    pub max_score: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_empty_name() {
        let req = CreateTestRequest {
            name: String::new(),
            time_limit_minutes: Some(10),
            max_score: Some(10),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_request_allows_missing_limits() {
        let req = CreateTestRequest {
            name: "Physics".to_string(),
            time_limit_minutes: None,
            max_score: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn update_request_rejects_zero_max_score() {
        let req = UpdateTestRequest {
            name: None,
            time_limit_minutes: None,
            max_score: Some(0),
        };
        assert!(req.validate().is_err());
    }
}
