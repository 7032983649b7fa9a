use std::env;
use std::path::{self, PathBuf};

/// Default bound on nested `^` replays.
pub const DEFAULT_MAX_REPLAY_DEPTH: usize = 64;

/// Startup settings for an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial working directory of the session.
    pub working_dir: PathBuf,
    /// Directory a bare `cd` switches to.
    pub home_dir: PathBuf,
    /// How many `^` replays may be nested inside each other.
    pub max_replay_depth: usize,
}

impl Config {
    /// Capture the process working directory and `$HOME`.
    ///
    /// Falls back to `.` made absolute (or `/`) for the working directory, and to the
    /// working directory for home, when either is unavailable.
    pub fn from_process() -> Self {
        let working_dir = env::current_dir()
            .or_else(|_| path::absolute("."))
            .unwrap_or_else(|_| PathBuf::from("/"));
        let home_dir = env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| working_dir.clone());
        Self {
            working_dir,
            home_dir,
            max_replay_depth: DEFAULT_MAX_REPLAY_DEPTH,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_process()
    }
}
