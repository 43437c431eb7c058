// src/session/scoring.rs

use crate::models::question::Question;

/// Counts answers matching their question's correct index.
/// Extra answers or questions beyond the shorter list are ignored.
pub fn score_answers(questions: &[Question], answers: &[Option<usize>]) -> u32 {
    questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| a.is_some_and(|idx| q.is_correct(idx)))
        .count() as u32
}

/// Formats a countdown as `mm:ss`. Minutes are not capped at 59.
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
