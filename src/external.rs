use crate::command::{CommandFactory, ExecutableCommand, Outcome, Terminal};
use crate::errors::RunError;
use crate::interpreter::{Factory, Interpreter};
use anyhow::Result;
use std::borrow::Cow;
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Separates the producer from the consumer.
pub const PIPE: &str = "|";
/// As the last token, runs the command line without waiting for it.
pub const BACKGROUND: &str = "&";

/// Command line that is not a builtin.
///
/// Holds every token including the program name and any `|` / `&` operators; the
/// [`Runner`] decides what they mean.
pub struct ExternalCommand {
    tokens: Vec<String>,
}

impl ExternalCommand {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    /// Accepts any name. Whether the program exists is only found out by the spawn.
    fn try_create(&self, name: &str, args: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        let mut tokens = Vec::with_capacity(args.len() + 1);
        tokens.push(name.to_owned());
        tokens.extend_from_slice(args);
        Some(Box::new(ExternalCommand::new(tokens)))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        shell: &mut Interpreter,
        stdout: &mut dyn Write,
    ) -> Result<Outcome> {
        let execution = shell
            .runner()
            .run(&self.tokens, &shell.session().working_dir);
        if let Err(e) = &execution.result {
            writeln!(stdout, "{e}")?;
        }
        Ok(Outcome::Elapsed(execution.elapsed))
    }
}

/// Result of one [`Runner::run`] call.
///
/// `elapsed` is meaningful even when `result` is an error: it is whatever was measured
/// before the failure.
#[derive(Debug)]
pub struct Execution {
    pub elapsed: Duration,
    pub result: Result<(), RunError>,
}

#[derive(Debug, PartialEq, Eq)]
enum Plan<'a> {
    Single(&'a [String]),
    Piped {
        producer: &'a [String],
        consumer: &'a [String],
    },
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation<'a> {
    plan: Plan<'a>,
    wait: bool,
}

/// Strip a trailing `&` and split at the first `|`.
fn plan(tokens: &[String]) -> Invocation<'_> {
    let (tokens, wait) = match tokens.split_last() {
        Some((last, rest)) if last == BACKGROUND => (rest, false),
        _ => (tokens, true),
    };
    let plan = match tokens.iter().position(|t| t == PIPE) {
        Some(i) => Plan::Piped {
            producer: &tokens[..i],
            consumer: &tokens[i + 1..],
        },
        None => Plan::Single(tokens),
    };
    Invocation { plan, wait }
}

/// Spawns external programs and times them.
///
/// Streams that are not part of a pipe come from the [`Terminal`] the runner was built with.
pub struct Runner {
    terminal: Box<dyn Terminal>,
}

impl Runner {
    pub fn new(terminal: Box<dyn Terminal>) -> Self {
        Self { terminal }
    }

    /// Run one external command line in `working_dir`.
    ///
    /// In the foreground the measured time covers spawn to exit of every process. With a
    /// trailing `&` it only covers starting them, and the processes are never waited on by
    /// the caller.
    pub fn run(&self, tokens: &[String], working_dir: &Path) -> Execution {
        let invocation = plan(tokens);
        let started = Instant::now();
        let result = match invocation.plan {
            Plan::Single(argv) => self.run_single(argv, working_dir, invocation.wait),
            Plan::Piped { producer, consumer } => {
                self.run_piped(producer, consumer, working_dir, invocation.wait)
            }
        };
        Execution {
            elapsed: started.elapsed(),
            result,
        }
    }

    fn command(&self, argv: &[String], working_dir: &Path) -> Result<Command, RunError> {
        let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;
        let program = resolve_program(working_dir, Path::new(program));
        let mut cmd = Command::new(program.as_os_str());
        cmd.args(args).current_dir(working_dir);
        Ok(cmd)
    }

    fn run_single(&self, argv: &[String], working_dir: &Path, wait: bool) -> Result<(), RunError> {
        let mut cmd = self.command(argv, working_dir)?;
        cmd.stdin(self.terminal.stdin()?)
            .stdout(self.terminal.stdout()?)
            .stderr(self.terminal.stderr()?);
        let mut child = spawn(&mut cmd)?;

        if wait {
            let status = child.wait()?;
            debug!(pid = child.id(), %status, "child exited");
        } else {
            detach(vec![child]);
        }
        Ok(())
    }

    /// Two processes with the producer's output relayed into the consumer's input.
    ///
    /// The relay always runs until the producer's output is exhausted; otherwise a producer
    /// writing more than a pipe buffer would block forever.
    fn run_piped(
        &self,
        producer_argv: &[String],
        consumer_argv: &[String],
        working_dir: &Path,
        wait: bool,
    ) -> Result<(), RunError> {
        let mut producer_cmd = self.command(producer_argv, working_dir)?;
        let mut consumer_cmd = self.command(consumer_argv, working_dir)?;
        producer_cmd
            .stdin(self.terminal.stdin()?)
            .stdout(Stdio::piped())
            .stderr(self.terminal.stderr()?);
        consumer_cmd
            .stdin(Stdio::piped())
            .stdout(self.terminal.stdout()?)
            .stderr(self.terminal.stderr()?);

        let mut producer = spawn(&mut producer_cmd)?;
        let mut consumer = match spawn(&mut consumer_cmd) {
            Ok(child) => child,
            Err(e) => {
                abandon(producer);
                return Err(e);
            }
        };

        let (Some(source), Some(sink)) = (producer.stdout.take(), consumer.stdin.take()) else {
            abandon(producer);
            abandon(consumer);
            return Err(RunError::StreamUnavailable("pipe"));
        };

        if wait {
            let relayed = relay(source, sink);
            let producer_status = producer.wait();
            let consumer_status = consumer.wait();
            debug!(?producer_status, ?consumer_status, "pipe exited");
            relayed?;
            producer_status?;
            consumer_status?;
        } else {
            thread::Builder::new()
                .name("pipe-relay".into())
                .spawn(move || {
                    if let Err(e) = relay(source, sink) {
                        warn!(error = %e, "background pipe relay failed");
                    }
                    reap(producer);
                    reap(consumer);
                })?;
        }
        Ok(())
    }
}

fn spawn(cmd: &mut Command) -> Result<Child, RunError> {
    let child = cmd.spawn().map_err(|source| RunError::Spawn {
        program: cmd.get_program().to_string_lossy().into_owned(),
        source,
    })?;
    debug!(pid = child.id(), program = ?cmd.get_program(), "spawned");
    Ok(child)
}

/// Copy everything from `source` into `sink`, then close `sink`.
///
/// A consumer that stops reading early is not an error.
fn relay(mut source: ChildStdout, mut sink: ChildStdin) -> io::Result<()> {
    match io::copy(&mut source, &mut sink) {
        Ok(bytes) => {
            debug!(bytes, "relay drained");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            debug!("consumer closed its input early");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Wait for `children` on a separate thread so they do not linger as zombies.
fn detach(children: Vec<Child>) {
    let spawned = thread::Builder::new()
        .name("reaper".into())
        .spawn(move || children.into_iter().for_each(reap));
    if let Err(e) = spawned {
        warn!(error = %e, "could not start reaper thread");
    }
}

fn reap(mut child: Child) {
    let pid = child.id();
    match child.wait() {
        Ok(status) => debug!(pid, %status, "background child exited"),
        Err(e) => warn!(pid, error = %e, "waiting on background child failed"),
    }
}

/// Kill a child whose pipe partner could not be set up.
fn abandon(mut child: Child) {
    if let Err(e) = child.kill() {
        debug!(pid = child.id(), error = %e, "kill failed");
    }
    reap(child);
}

/// Resolve a program path against the session working directory.
///
/// Behavior:
/// - Absolute path: used as is.
/// - Single path component (`ls`): left to the OS, which searches `PATH`.
/// - Relative path with several components (`./run.sh`, `bin/tool`): joined onto
///   `working_dir`, since the shell process itself is not running there.
/// - Empty path: returned as is and fails at spawn.
pub fn resolve_program<'a>(working_dir: &Path, program: &'a Path) -> Cow<'a, Path> {
    if program.is_absolute() {
        return Cow::Borrowed(program);
    }

    let mut components = program.components();
    match (components.next(), components.next()) {
        (Some(_), Some(_)) => Cow::Owned(working_dir.join(program)),
        _ => Cow::Borrowed(program),
    }
}
