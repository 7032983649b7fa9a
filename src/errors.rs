//! Error types reported to the user.
//!
//! None of these end the session: they are written as a single line and the loop continues.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Built-in argument and environment errors.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}: too many arguments")]
    TooManyArguments(&'static str),
    #[error("cd: already at rock bottom")]
    NoParent,
    #[error("cd: directory \"{0}\" doesn't exist")]
    DirectoryNotFound(String),
    #[error("^: no arguments found")]
    NoArguments,
    #[error("^: illegal argument")]
    IllegalArgument,
    #[error("^: index \"{0}\" not found in history")]
    IndexNotFound(i64),
    #[error("^: replay depth limit ({0}) exceeded")]
    ReplayTooDeep(usize),
    #[error("list: cannot read directory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of the external process runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Illegal command")]
    EmptyCommand,
    #[error("Illegal command: {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Error: child {0} stream unavailable")]
    StreamUnavailable(&'static str),
    #[error("Error: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    /// Whether the failure happened before any process was created.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, RunError::EmptyCommand | RunError::Spawn { .. })
    }
}
