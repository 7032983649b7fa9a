use crate::command::{CommandFactory, Outcome, Terminal};
use crate::config::Config;
use crate::errors::ShellError;
use crate::external::Runner;
use crate::io_adapters::InheritedTerminal;
use crate::lexer;
use crate::session::Session;
use anyhow::Result;
use std::io::Write;
use tracing::debug;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate — BuiltinCommand and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Whether the read loop should keep going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Routes input lines to built-in and external commands.
///
/// The interpreter owns the [`Session`] and a list of [`CommandFactory`] objects that are
/// queried in order; the first one recognizing the command name wins. See [`Default`] for
/// the factories included out of the box.
///
/// Example
/// ```
/// use minishell::{Flow, Interpreter};
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// assert_eq!(sh.route("history", &mut out).unwrap(), Flow::Continue);
/// assert!(String::from_utf8(out).unwrap().contains("1 : history"));
/// ```
pub struct Interpreter {
    session: Session,
    runner: Runner,
    commands: Vec<Box<dyn CommandFactory>>,
    max_replay_depth: usize,
    replay_depth: usize,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(
        config: &Config,
        terminal: Box<dyn Terminal>,
        commands: Vec<Box<dyn CommandFactory>>,
    ) -> Self {
        Self {
            session: Session::from_config(config),
            runner: Runner::new(terminal),
            commands,
            max_replay_depth: config.max_replay_depth,
            replay_depth: 0,
        }
    }

    /// Interpreter with the default command set whose children use `terminal`.
    pub fn with_terminal(config: &Config, terminal: Box<dyn Terminal>) -> Self {
        Self::new(config, terminal, default_commands())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Record `line` in the history and execute it.
    ///
    /// Reports for the user (built-in output and error messages) go to `stdout`; external
    /// programs write to the runner's terminal. Time spent in external commands is added to
    /// the session here. Blank lines are ignored and not recorded.
    pub fn route(&mut self, line: &str, stdout: &mut dyn Write) -> Result<Flow> {
        let tokens = lexer::split_into_tokens(line);
        let Some((name, args)) = tokens.split_first() else {
            return Ok(Flow::Continue);
        };
        self.session.history.push(line);
        debug!(command = %name, args = args.len(), "routing");

        let Some(cmd) = self
            .commands
            .iter()
            .find_map(|factory| factory.try_create(name, args))
        else {
            writeln!(stdout, "Illegal command: {name}")?;
            return Ok(Flow::Continue);
        };

        match cmd.execute(self, stdout)? {
            Outcome::Done => Ok(Flow::Continue),
            Outcome::Elapsed(elapsed) => {
                self.session.record_external_time(elapsed);
                Ok(Flow::Continue)
            }
            Outcome::Exit => Ok(Flow::Exit),
        }
    }

    /// Route a line taken from the history, one level deeper than the current call.
    pub(crate) fn replay(&mut self, line: &str, stdout: &mut dyn Write) -> Result<Flow> {
        if self.replay_depth >= self.max_replay_depth {
            return Err(ShellError::ReplayTooDeep(self.max_replay_depth).into());
        }
        self.replay_depth += 1;
        let flow = self.route(line, stdout);
        self.replay_depth -= 1;
        flow
    }
}

fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    use crate::external::ExternalCommand;
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<List>::default()),
        Box::new(Factory::<Ptime>::default()),
        Box::new(Factory::<History>::default()),
        Box::new(Factory::<Replay>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<ExternalCommand>::default()),
    ]
}

impl Default for Interpreter {
    /// Create an interpreter for the current process:
    /// - built-ins: `cd`, `list`, `ptime`, `history`, `^`, `exit`
    /// - external command launcher, inheriting the shell's terminal
    fn default() -> Self {
        Self::with_terminal(&Config::from_process(), Box::new(InheritedTerminal))
    }
}
