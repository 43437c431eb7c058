// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::config::OPTION_COUNT;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// Owning test. Rows are removed together with it.
    pub test_id: String,

    /// The text content of the question.
    pub question: String,

    /// Ordered option strings, stored as a JSON array.
    pub options: Json<Vec<String>>,

    /// Index into `options` of the correct option.
    pub answer: i64,
}

impl Question {
    pub fn is_correct(&self, selected: usize) -> bool {
        usize::try_from(self.answer).is_ok_and(|answer| answer == selected)
    }
}

/// DTO for sending a question to a student (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question: q.question.clone(),
            options: q.options.0.clone(),
        }
    }
}

/// DTO for creating or replacing a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3))]
    pub answer: i64,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTION_COUNT {
        return Err(validator::ValidationError::new("options_must_have_four_entries"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: &[&str], answer: i64) -> CreateQuestionRequest {
        CreateQuestionRequest {
            question: "2 + 2 = ?".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer,
        }
    }

    #[test]
    fn accepts_four_options() {
        assert!(request(&["1", "2", "3", "4"], 3).validate().is_ok());
    }

    #[test]
    fn rejects_wrong_option_count() {
        assert!(request(&["1", "2", "3"], 0).validate().is_err());
    }

    #[test]
    fn rejects_answer_out_of_range() {
        assert!(request(&["1", "2", "3", "4"], 4).validate().is_err());
    }

    #[test]
    fn is_correct_compares_index() {
        let q = Question {
            id: "q1".to_string(),
            test_id: "t1".to_string(),
            question: "?".to_string(),
            options: Json(vec!["a".into(), "b".into()]),
            answer: 1,
        };
        assert!(q.is_correct(1));
        assert!(!q.is_correct(0));
    }
}
