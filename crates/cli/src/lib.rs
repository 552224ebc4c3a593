//! `storsync-cli` — command-line interface for the storage registry sync.

pub mod check;
pub mod exit_codes;
pub mod ingest;
pub mod sync;

use exit_codes::{EXIT_ERROR, EXIT_SOURCE_IO, EXIT_USAGE};

/// CLI-level error: exit code, message, optional hint.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_SOURCE_IO,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
