// src/session/controller.rs

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{SessionError, scoring};
use crate::{
    config::{Config, DEFAULT_TIME_LIMIT_MINUTES},
    models::{
        attempt::NewAttempt,
        question::{PublicQuestion, Question},
    },
    store::{AttemptStore, QuestionSource, StoreError},
};

/// Values applied when a test record leaves them out.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub time_limit_minutes: u32,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
        }
    }
}

impl From<&Config> for SessionDefaults {
    fn from(config: &Config) -> Self {
        Self {
            time_limit_minutes: config.default_time_limit_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    InProgress,
    /// Answers are frozen; the attempt write is pending or failed.
    Submitting,
    Terminal { final_score: u32 },
    /// A concurrent session won the write race.
    AlreadyAttempted,
}

/// Payload handed to the results view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub score: u32,
    pub total: u32,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        test_name: String,
        total: usize,
        remaining_seconds: u32,
    },
    QuestionAdvanced {
        index: usize,
        total: usize,
    },
    Completed(Completion),
    Errored {
        message: String,
    },
}

/// What happened after an answer or a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Idle,
    Moved(SessionEvent),
    /// Answers are frozen; the attempt still has to be written.
    Submit,
}

/// Final answers and score, captured once when submission begins.
/// Retries write this exact value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSnapshot {
    pub answers: Vec<Option<usize>>,
    pub score: u32,
    pub total: u32,
    pub timed_out: bool,
}

/// Read-only projection of a session for callers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub test_id: String,
    pub test_name: String,
    pub phase: Phase,
    /// 1-based position of the current question.
    pub question_number: usize,
    pub total: usize,
    pub question: Option<PublicQuestion>,
    pub selected: Option<usize>,
    pub remaining_seconds: u32,
    pub time_left: String,
    pub completion: Option<Completion>,
    pub last_error: Option<String>,
}

/// Result of opening a session.
pub enum Opened {
    /// The user already has an attempt for this test.
    AlreadyAttempted,
    /// The test has no questions. No countdown is started.
    Empty { test_name: String },
    Live(AttemptSession),
}

/// One user's timed pass through one test.
pub struct AttemptSession {
    test_id: String,
    user_id: String,
    test_name: String,
    max_score: Option<i64>,
    questions: Vec<Question>,
    current_index: usize,
    pending: Option<usize>,
    answers: Vec<Option<usize>>,
    running_score: u32,
    remaining_seconds: u32,
    phase: Phase,
    snapshot: Option<AttemptSnapshot>,
    completion: Option<Completion>,
    last_error: Option<String>,
    source: Arc<dyn QuestionSource>,
    store: Arc<dyn AttemptStore>,
}

impl fmt::Debug for AttemptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptSession")
            .field("test_id", &self.test_id)
            .field("user_id", &self.user_id)
            .field("phase", &self.phase)
            .field("current_index", &self.current_index)
            .field("remaining_seconds", &self.remaining_seconds)
            .finish_non_exhaustive()
    }
}

impl AttemptSession {
    /// Loads the test, its questions and any prior attempt, then decides how the
    /// session starts.
    ///
    /// The prior-attempt check is a plain read. Two sessions opened at the same
    /// time can both pass it; the store's unique key settles that on write.
    pub async fn open(
        test_id: &str,
        user_id: &str,
        source: Arc<dyn QuestionSource>,
        store: Arc<dyn AttemptStore>,
        defaults: &SessionDefaults,
    ) -> Result<Opened, SessionError> {
        let test = source
            .fetch_test(test_id)
            .await?
            .ok_or_else(|| SessionError::TestNotFound(test_id.to_string()))?;
        let questions = source.fetch_questions(test_id).await?;

        if store.find_attempt(user_id, test_id).await?.is_some() {
            tracing::info!("User {} already attempted test {}", user_id, test_id);
            return Ok(Opened::AlreadyAttempted);
        }

        if questions.is_empty() {
            return Ok(Opened::Empty {
                test_name: test.name,
            });
        }

        if test.max_score.is_none() {
            tracing::warn!(
                "Test {} has no max score; attempts on it cannot be recorded",
                test_id
            );
        }

        // A session always has a running countdown, even with a zero default.
        let minutes = test
            .time_limit_minutes
            .and_then(|m| u32::try_from(m).ok())
            .filter(|m| *m > 0)
            .or(Some(defaults.time_limit_minutes).filter(|m| *m > 0))
            .unwrap_or(DEFAULT_TIME_LIMIT_MINUTES);

        Ok(Opened::Live(AttemptSession {
            test_id: test_id.to_string(),
            user_id: user_id.to_string(),
            test_name: test.name,
            max_score: test.max_score,
            answers: vec![None; questions.len()],
            questions,
            current_index: 0,
            pending: None,
            running_score: 0,
            remaining_seconds: minutes.saturating_mul(60),
            phase: Phase::InProgress,
            snapshot: None,
            completion: None,
            last_error: None,
            source,
            store,
        }))
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The countdown only runs while the user can still answer.
    pub fn is_counting_down(&self) -> bool {
        self.phase == Phase::InProgress && self.remaining_seconds > 0
    }

    /// The question being answered, while the session is in progress.
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::InProgress => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn started_event(&self) -> SessionEvent {
        SessionEvent::Started {
            test_name: self.test_name.clone(),
            total: self.questions.len(),
            remaining_seconds: self.remaining_seconds,
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            test_id: self.test_id.clone(),
            test_name: self.test_name.clone(),
            phase: self.phase,
            question_number: self.current_index + 1,
            total: self.questions.len(),
            question: self.current_question().map(PublicQuestion::from),
            selected: self.pending,
            remaining_seconds: self.remaining_seconds,
            time_left: scoring::format_time(self.remaining_seconds),
            completion: self.completion,
            last_error: self.last_error.clone(),
        }
    }

    /// Records a tentative choice for the current question.
    pub fn select_option(&mut self, index: usize) -> Result<(), SessionError> {
        let question = self
            .current_question()
            .ok_or(SessionError::InvalidState("session is not accepting answers"))?;

        let len = question.options.len();
        if index >= len {
            return Err(SessionError::OptionOutOfRange { index, len });
        }

        self.pending = Some(index);
        Ok(())
    }

    /// Saves the pending choice and moves on. On the last question the answers
    /// are frozen and the caller must follow up with [`submit`](Self::submit).
    pub fn advance(&mut self) -> Result<Step, SessionError> {
        if self.phase != Phase::InProgress {
            return Err(SessionError::InvalidState("session is not accepting answers"));
        }
        if self.pending.is_none() {
            return Err(SessionError::NoSelection);
        }

        self.record_pending();

        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            return Ok(Step::Moved(SessionEvent::QuestionAdvanced {
                index: self.current_index,
                total: self.questions.len(),
            }));
        }

        self.begin_submission(false);
        Ok(Step::Submit)
    }

    /// One elapsed second. Reaching zero freezes whatever is pending.
    ///
    /// Outside `InProgress` this is a no-op, so a late tick can never cause a
    /// second write.
    pub fn tick(&mut self) -> Step {
        if self.phase != Phase::InProgress {
            return Step::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return Step::Idle;
        }

        tracing::info!(
            "Time is up for user {} on test {}; submitting",
            self.user_id,
            self.test_id
        );
        self.record_pending();
        self.begin_submission(true);
        Step::Submit
    }

    /// Re-reads the test record so a fixed configuration is picked up.
    /// The countdown budget is not changed mid-session.
    pub async fn reload_test(&mut self) -> Result<(), SessionError> {
        let test = self
            .source
            .fetch_test(&self.test_id)
            .await?
            .ok_or_else(|| SessionError::TestNotFound(self.test_id.clone()))?;

        self.test_name = test.name;
        self.max_score = test.max_score;
        Ok(())
    }

    fn record_pending(&mut self) {
        let selected = self.pending.take();
        self.answers[self.current_index] = selected;

        if let Some(idx) = selected
            && self.questions[self.current_index].is_correct(idx)
        {
            self.running_score += 1;
        }
    }

    fn begin_submission(&mut self, timed_out: bool) {
        debug_assert_eq!(
            self.running_score,
            scoring::score_answers(&self.questions, &self.answers)
        );
        self.snapshot = Some(AttemptSnapshot {
            answers: self.answers.clone(),
            score: self.running_score,
            total: self.questions.len() as u32,
            timed_out,
        });
        self.phase = Phase::Submitting;
    }

    /// Writes the frozen snapshot. Called once after [`Step::Submit`] and again
    /// for each manual retry after a failed write.
    pub async fn submit(&mut self) -> Result<SessionEvent, SessionError> {
        let snapshot = match (&self.phase, &self.snapshot) {
            (Phase::Submitting, Some(snapshot)) => snapshot.clone(),
            _ => return Err(SessionError::InvalidState("no submission to retry")),
        };

        let result = self.write_snapshot(&snapshot).await;
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }

    async fn write_snapshot(
        &mut self,
        snapshot: &AttemptSnapshot,
    ) -> Result<SessionEvent, SessionError> {
        let Some(max_score) = self.max_score else {
            tracing::warn!("Refusing to record attempt on test {} without max score", self.test_id);
            return Err(SessionError::Configuration(
                "This test does not have a max score set. Please contact the admin.".to_string(),
            ));
        };

        let record = NewAttempt {
            user_id: self.user_id.clone(),
            test_id: self.test_id.clone(),
            answers: snapshot.answers.clone(),
            score: snapshot.score,
            total: snapshot.total,
            max_score,
            timed_out: snapshot.timed_out,
        };

        match self.store.create_attempt(&record).await {
            Ok(_) => {
                let completion = Completion {
                    score: snapshot.score,
                    total: snapshot.total,
                    timed_out: snapshot.timed_out,
                };
                self.phase = Phase::Terminal {
                    final_score: snapshot.score,
                };
                self.completion = Some(completion);
                self.last_error = None;
                Ok(SessionEvent::Completed(completion))
            }
            Err(StoreError::Conflict(msg)) => {
                tracing::warn!(
                    "Duplicate attempt for user {} on test {}: {}",
                    self.user_id,
                    self.test_id,
                    msg
                );
                self.phase = Phase::AlreadyAttempted;
                Err(SessionError::RaceAlreadyAttempted)
            }
            Err(StoreError::Backend(msg)) => {
                tracing::error!("Failed to record attempt: {}", msg);
                Err(SessionError::TransientWrite(msg))
            }
        }
    }
}
