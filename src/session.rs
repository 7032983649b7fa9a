use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Mutable state of one shell run.
///
/// The session contains:
/// - `working_dir`: directory built-ins operate on and children are started in.
/// - `home_dir`: target of a bare `cd`.
/// - `history`: every accepted input line, in entry order.
/// - `total_external_time`: time spent running external commands so far.
///
/// Nothing here touches the process-wide current directory; children get `working_dir`
/// explicitly when they are spawned.
#[derive(Debug, Clone)]
pub struct Session {
    /// The current working directory of the session.
    pub working_dir: PathBuf,
    /// Where `cd` without arguments goes.
    pub home_dir: PathBuf,
    /// Lines entered during this session, including built-ins and replays.
    pub history: History,
    /// Accumulated wall-clock time of external commands.
    pub total_external_time: Duration,
}

impl Session {
    pub fn new(working_dir: PathBuf, home_dir: PathBuf) -> Self {
        Self {
            working_dir,
            home_dir,
            history: History::default(),
            total_external_time: Duration::ZERO,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.working_dir.clone(), config.home_dir.clone())
    }

    /// Add the elapsed time of one external command (successful or not).
    pub fn record_external_time(&mut self, elapsed: Duration) {
        self.total_external_time += elapsed;
    }

    /// Total external time in seconds, at millisecond resolution.
    pub fn external_seconds(&self) -> f64 {
        self.total_external_time.as_millis() as f64 / 1000.0
    }
}

/// Append-only list of raw input lines, addressed from 1.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }

    /// Entry `index`, counting from 1.
    pub fn get(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(index, line)` pairs with 1-based indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_str()))
    }
}
