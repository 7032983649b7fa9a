use crate::command::{CommandFactory, ExecutableCommand, Outcome};
use crate::errors::ShellError;
use crate::external::BACKGROUND;
use crate::interpreter::{Factory, Flow, Interpreter};
use crate::listing;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::fs;
use std::io::Write;
use std::iter;
use tracing::warn;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "^".
    fn name() -> &'static str;

    /// Executes the command against the shell's session.
    ///
    /// An error is shown to the user as one line; it never ends the session.
    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<Outcome>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        shell: &mut Interpreter,
        stdout: &mut dyn Write,
    ) -> Result<Outcome> {
        match <T as BuiltinCommand>::execute(*self, stdout, shell) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{e}")?;
                Ok(Outcome::Done)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _shell: &mut Interpreter,
        stdout: &mut dyn Write,
    ) -> Result<Outcome> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(Outcome::Done)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], &positional_argv(args)) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, .. }) => Box::new(InvalidArgs { output }),
            })
        } else {
            None
        }
    }
}

/// Arguments for argh with option parsing switched off, except for a lone `--help`.
///
/// Paths and history indices may legitimately start with `-`.
fn positional_argv(args: &[String]) -> Vec<&str> {
    match args {
        [only] if only == "--help" => vec![only.as_str()],
        _ => iter::once("--")
            .chain(args.iter().map(String::as_str))
            .collect(),
    }
}

/// Built-ins accept a trailing `&` and ignore it.
fn without_background(args: &[String]) -> &[String] {
    match args.split_last() {
        Some((last, rest)) if last == BACKGROUND => rest,
        _ => args,
    }
}

#[derive(FromArgs)]
/// Change the working directory.
/// Without a target, changes to the home directory.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory relative to the current one, or `..` for the parent.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<Outcome> {
        let session = shell.session_mut();
        let target = match without_background(&self.args) {
            [] => session.home_dir.clone(),
            [dir] if dir == ".." => session
                .working_dir
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .ok_or(ShellError::NoParent)?
                .to_path_buf(),
            [dir] => {
                let candidate = session.working_dir.join(dir);
                if !candidate.exists() {
                    return Err(ShellError::DirectoryNotFound(dir.clone()).into());
                }
                candidate
            }
            _ => return Err(ShellError::TooManyArguments("cd").into()),
        };
        session.working_dir = target;
        Ok(Outcome::Done)
    }
}

#[derive(FromArgs)]
/// List the entries of the working directory with access flags, size and modification time.
pub struct List {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for List {
    fn name() -> &'static str {
        "list"
    }

    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<Outcome> {
        let dir = &shell.session().working_dir;
        let entries = fs::read_dir(dir).map_err(|source| ShellError::Unreadable {
            path: dir.clone(),
            source,
        })?;
        for entry in entries {
            match entry.and_then(|entry| listing::describe(&entry)) {
                Ok(line) => writeln!(stdout, "{line}")?,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                    writeln!(stdout, "list: {e}")?;
                }
            }
        }
        Ok(Outcome::Done)
    }
}

#[derive(FromArgs)]
/// Print the total time spent in external commands during this session.
pub struct Ptime {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Ptime {
    fn name() -> &'static str {
        "ptime"
    }

    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<Outcome> {
        writeln!(
            stdout,
            "Total time spent in child processes: {:.4} seconds",
            shell.session().external_seconds()
        )?;
        Ok(Outcome::Done)
    }
}

#[derive(FromArgs)]
/// Print every line entered in this session, numbered from 1.
pub struct History {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<Outcome> {
        writeln!(stdout, "-- Command History --")?;
        for (index, line) in shell.session().history.iter() {
            writeln!(stdout, "{index} : {line}")?;
        }
        Ok(Outcome::Done)
    }
}

#[derive(FromArgs)]
/// Run the history entry with the given number again.
pub struct Replay {
    #[argh(positional, greedy)]
    /// history number, as shown by `history`.
    pub args: Vec<String>,
}

impl BuiltinCommand for Replay {
    fn name() -> &'static str {
        "^"
    }

    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<Outcome> {
        let index = match without_background(&self.args) {
            [] => return Err(ShellError::NoArguments.into()),
            [arg] => arg
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ShellError::IllegalArgument)?,
            _ => return Err(ShellError::TooManyArguments("^").into()),
        };

        // The `^` line itself was recorded last and is never a valid target.
        let history = &shell.session().history;
        let line = usize::try_from(index)
            .ok()
            .filter(|n| *n < history.len())
            .and_then(|n| history.get(n))
            .map(str::to_owned)
            .ok_or(ShellError::IndexNotFound(index))?;

        match shell.replay(&line, stdout)? {
            Flow::Continue => Ok(Outcome::Done),
            Flow::Exit => Ok(Outcome::Exit),
        }
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, _shell: &mut Interpreter) -> Result<Outcome> {
        Ok(Outcome::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::io_adapters::InheritedTerminal;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn shell_in(dir: &Path) -> Interpreter {
        let config = Config {
            working_dir: dir.to_path_buf(),
            home_dir: PathBuf::from("/"),
            max_replay_depth: 4,
        };
        Interpreter::with_terminal(&config, Box::new(InheritedTerminal))
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    /// Run through the factory, the same path the router takes.
    fn run<T: BuiltinCommand + 'static>(shell: &mut Interpreter, args: &[&str]) -> String {
        let cmd = Factory::<T>::default()
            .try_create(T::name(), &strings(args))
            .expect("factory must accept its own name");
        let mut out = Vec::new();
        cmd.execute(shell, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_factory_ignores_other_names() {
        assert!(Factory::<Cd>::default().try_create("CD", &[]).is_none());
        assert!(Factory::<Ptime>::default().try_create("cd", &[]).is_none());
    }

    #[test]
    fn test_cd_without_args_goes_home() {
        let temp = tempfile::tempdir().unwrap();
        let mut sh = shell_in(temp.path());
        sh.session_mut().home_dir = temp.path().join("home");

        assert_eq!(run::<Cd>(&mut sh, &[]), "");
        assert_eq!(sh.session().working_dir, temp.path().join("home"));
    }

    #[test]
    fn test_cd_into_child_and_back_to_parent() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("child")).unwrap();
        let mut sh = shell_in(temp.path());

        assert_eq!(run::<Cd>(&mut sh, &["child"]), "");
        assert_eq!(sh.session().working_dir, temp.path().join("child"));

        assert_eq!(run::<Cd>(&mut sh, &[".."]), "");
        assert_eq!(sh.session().working_dir, temp.path());
    }

    #[test]
    fn test_cd_parent_at_root_reports_rock_bottom() {
        let mut sh = shell_in(Path::new("/"));
        assert_eq!(run::<Cd>(&mut sh, &[".."]), "cd: already at rock bottom\n");
        assert_eq!(sh.session().working_dir, Path::new("/"));
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let temp = tempfile::tempdir().unwrap();
        let mut sh = shell_in(temp.path());

        assert_eq!(
            run::<Cd>(&mut sh, &["missing"]),
            "cd: directory \"missing\" doesn't exist\n"
        );
        assert_eq!(sh.session().working_dir, temp.path());
    }

    #[test]
    fn test_cd_parent_of_relative_root_reports_rock_bottom() {
        let mut sh = shell_in(Path::new("rel"));
        assert_eq!(run::<Cd>(&mut sh, &[".."]), "cd: already at rock bottom\n");
        assert_eq!(sh.session().working_dir, Path::new("rel"));
    }

    #[test]
    fn test_cd_accepts_any_existing_path() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();
        let mut sh = shell_in(temp.path());

        assert_eq!(run::<Cd>(&mut sh, &["notes.txt"]), "");
        assert_eq!(sh.session().working_dir, temp.path().join("notes.txt"));
    }

    #[test]
    fn test_cd_absolute_path_replaces_working_dir() {
        let temp = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let mut sh = shell_in(temp.path());
        let target = elsewhere.path().to_str().unwrap();

        assert_eq!(run::<Cd>(&mut sh, &[target]), "");
        assert_eq!(sh.session().working_dir, elsewhere.path());
    }

    #[test]
    fn test_cd_dash_argument_is_a_path_not_an_option() {
        let temp = tempfile::tempdir().unwrap();
        let mut sh = shell_in(temp.path());
        assert_eq!(
            run::<Cd>(&mut sh, &["-x"]),
            "cd: directory \"-x\" doesn't exist\n"
        );
    }

    #[test]
    fn test_cd_trailing_ampersand_is_ignored() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("child")).unwrap();
        let mut sh = shell_in(temp.path());

        assert_eq!(run::<Cd>(&mut sh, &["child", "&"]), "");
        assert_eq!(sh.session().working_dir, temp.path().join("child"));
    }

    #[test]
    fn test_cd_too_many_arguments() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        let mut sh = shell_in(temp.path());

        assert_eq!(run::<Cd>(&mut sh, &["a", "b"]), "cd: too many arguments\n");
        assert_eq!(run::<Cd>(&mut sh, &["a", "&", "b"]), "cd: too many arguments\n");
        assert_eq!(sh.session().working_dir, temp.path());
    }

    #[test]
    fn test_cd_help_prints_usage() {
        let mut sh = shell_in(Path::new("/"));
        assert!(run::<Cd>(&mut sh, &["--help"]).contains("Usage: cd"));
    }

    #[test]
    fn test_list_describes_each_entry() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("notes.txt"), b"hello").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        let mut sh = shell_in(temp.path());

        let out = run::<List>(&mut sh, &[]);
        let mut lines: Vec<&str> = out.lines().collect();
        lines.sort_by_key(|line| line.ends_with("sub"));
        assert_eq!(lines.len(), 2, "got {out:?}");

        let file = lines[0];
        assert!(file.starts_with("-rw- "), "got {file:?}");
        assert!(file.contains("          5 "), "got {file:?}");
        assert!(file.ends_with(" notes.txt"));

        let dir = lines[1];
        assert!(dir.starts_with("drwx "), "got {dir:?}");
        assert!(dir.ends_with(" sub"));
    }

    #[test]
    fn test_list_unreadable_directory_reports_error() {
        let temp = tempfile::tempdir().unwrap();
        let mut sh = shell_in(&temp.path().join("gone"));

        let out = run::<List>(&mut sh, &[]);
        assert!(out.starts_with("list: cannot read directory"), "got {out:?}");
    }

    #[test]
    fn test_ptime_formats_seconds() {
        let mut sh = shell_in(Path::new("/"));
        assert_eq!(
            run::<Ptime>(&mut sh, &["extra", "args"]),
            "Total time spent in child processes: 0.0000 seconds\n"
        );

        sh.session_mut()
            .record_external_time(Duration::from_millis(250));
        assert_eq!(
            run::<Ptime>(&mut sh, &[]),
            "Total time spent in child processes: 0.2500 seconds\n"
        );
    }

    #[test]
    fn test_history_lists_entries_in_order() {
        let mut sh = shell_in(Path::new("/"));
        for line in ["ls -l", "cd \"My Docs\"", "history"] {
            sh.session_mut().history.push(line);
        }

        assert_eq!(
            run::<History>(&mut sh, &[]),
            "-- Command History --\n1 : ls -l\n2 : cd \"My Docs\"\n3 : history\n"
        );
    }

    #[test]
    fn test_replay_argument_errors() {
        let mut sh = shell_in(Path::new("/"));
        sh.session_mut().history.push("ptime");
        sh.session_mut().history.push("^");

        assert_eq!(run::<Replay>(&mut sh, &[]), "^: no arguments found\n");
        assert_eq!(run::<Replay>(&mut sh, &["&"]), "^: no arguments found\n");
        assert_eq!(run::<Replay>(&mut sh, &["one"]), "^: illegal argument\n");
        assert_eq!(run::<Replay>(&mut sh, &["0"]), "^: illegal argument\n");
        assert_eq!(run::<Replay>(&mut sh, &["-1"]), "^: illegal argument\n");
        assert_eq!(run::<Replay>(&mut sh, &["1", "2"]), "^: too many arguments\n");
        assert_eq!(sh.session().history.len(), 2);
    }

    #[test]
    fn test_replay_out_of_range_changes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("child")).unwrap();
        let mut sh = shell_in(temp.path());
        sh.session_mut().history.push("cd child");
        sh.session_mut().history.push("^ 2");

        // Entry 2 is the replay line itself.
        assert_eq!(
            run::<Replay>(&mut sh, &["2"]),
            "^: index \"2\" not found in history\n"
        );
        assert_eq!(
            run::<Replay>(&mut sh, &["99"]),
            "^: index \"99\" not found in history\n"
        );
        assert_eq!(sh.session().working_dir, temp.path());
        assert_eq!(sh.session().total_external_time, Duration::ZERO);
        assert_eq!(sh.session().history.len(), 2);
    }

    #[test]
    fn test_replay_runs_stored_line() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("child")).unwrap();
        let mut sh = shell_in(temp.path());
        sh.session_mut().history.push("cd child");
        sh.session_mut().history.push("^ 1 &");

        assert_eq!(run::<Replay>(&mut sh, &["1", "&"]), "");
        assert_eq!(sh.session().working_dir, temp.path().join("child"));
        assert_eq!(sh.session().history.get(3), Some("cd child"));
    }

    #[test]
    fn test_exit_requests_exit() {
        let mut sh = shell_in(Path::new("/"));
        let cmd = Factory::<Exit>::default()
            .try_create("exit", &strings(&["now"]))
            .unwrap();
        let outcome = cmd.execute(&mut sh, &mut Vec::new()).unwrap();
        assert_eq!(outcome, Outcome::Exit);
    }
}
