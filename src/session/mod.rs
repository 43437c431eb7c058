// src/session/mod.rs

//! Timed test attempts.
//!
//! An [`AttemptSession`] is the state machine for one user's pass through one
//! test. A [`SessionHandle`] runs it on its own task together with the
//! countdown, and the [`SessionRegistry`] keeps live handles for the HTTP layer.

pub mod controller;
pub mod registry;
pub mod runner;
pub mod scoring;

#[cfg(test)]
mod testing;

use std::fmt;

pub use controller::{
    AttemptSession, Completion, Opened, Phase, SessionDefaults, SessionEvent, SessionView, Step,
};
pub use registry::SessionRegistry;
pub use runner::SessionHandle;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    TestNotFound(String),

    /// The test is missing configuration required to record an attempt.
    Configuration(String),

    /// Writing the attempt failed. The snapshot is kept for a manual retry.
    TransientWrite(String),

    /// Another session for the same (user, test) already recorded an attempt.
    RaceAlreadyAttempted,

    /// The operation is not valid in the session's current phase.
    InvalidState(&'static str),

    NoSelection,

    OptionOutOfRange { index: usize, len: usize },

    /// A read from a collaborator failed.
    Source(String),

    /// The session task has stopped.
    Closed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::TestNotFound(id) => write!(f, "test '{}' not found", id),
            SessionError::Configuration(msg) => write!(f, "{}", msg),
            SessionError::TransientWrite(msg) => {
                write!(f, "failed to record attempt: {}", msg)
            }
            SessionError::RaceAlreadyAttempted => {
                write!(f, "an attempt for this test was already recorded")
            }
            SessionError::InvalidState(msg) => write!(f, "{}", msg),
            SessionError::NoSelection => write!(f, "select an option before continuing"),
            SessionError::OptionOutOfRange { index, len } => {
                write!(f, "option {} is out of range (0..{})", index, len)
            }
            SessionError::Source(msg) => write!(f, "failed to load test data: {}", msg),
            SessionError::Closed => write!(f, "session is no longer active"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Source(err.to_string())
    }
}
