use crate::interpreter::Interpreter;
use anyhow::Result;
use std::io::{self, Write};
use std::process::Stdio;
use std::time::Duration;

/// What happened when a command ran, as far as the router is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A built-in finished; nothing to account for.
    Done,
    /// An external command ran (or tried to) for this long.
    Elapsed(Duration),
    /// The session should end now.
    Exit,
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command, writing any report for the user to `stdout`.
    fn execute(
        self: Box<Self>,
        shell: &mut Interpreter,
        stdout: &mut dyn Write,
    ) -> Result<Outcome>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[String]) -> Option<Box<dyn ExecutableCommand>>;
}

/// Source of the terminal-facing standard streams handed to spawned processes.
///
/// Each call produces a fresh [`Stdio`] since a handle is consumed by the spawn that uses it.
/// The interactive shell lets children inherit its own streams; tests redirect them.
pub trait Terminal: Send + Sync {
    fn stdin(&self) -> io::Result<Stdio>;
    fn stdout(&self) -> io::Result<Stdio>;
    fn stderr(&self) -> io::Result<Stdio>;
}
