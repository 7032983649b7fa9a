use anyhow::{Context, Result, ensure};
use argh::FromArgs;
use minishell::config::DEFAULT_MAX_REPLAY_DEPTH;
use minishell::io_adapters::InheritedTerminal;
use minishell::{Config, Flow, Interpreter};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};
use std::path::{self, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Interactive shell with history replay and timing of external commands.
struct Args {
    #[argh(option)]
    /// initial working directory; defaults to the current directory.
    dir: Option<PathBuf>,

    #[argh(option)]
    /// directory `cd` switches to without arguments; defaults to $HOME.
    home: Option<PathBuf>,

    #[argh(option, default = "DEFAULT_MAX_REPLAY_DEPTH")]
    /// how many `^` replays may be nested inside each other.
    max_replay_depth: usize,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = Config::from_process();
        if let Some(dir) = self.dir {
            let dir = path::absolute(&dir)
                .with_context(|| format!("can't resolve {}", dir.display()))?;
            ensure!(dir.is_dir(), "{} is not a directory", dir.display());
            config.working_dir = dir;
        }
        if let Some(home) = self.home {
            config.home_dir = path::absolute(&home)
                .with_context(|| format!("can't resolve {}", home.display()))?;
        }
        config.max_replay_depth = self.max_replay_depth;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = argh::from_env::<Args>().into_config()?;
    let mut shell = Interpreter::with_terminal(&config, Box::new(InheritedTerminal));
    repl(&mut shell)
}

/// Read lines until `exit` or end of input.
fn repl(shell: &mut Interpreter) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = format!("[{}]: ", shell.session().working_dir.display());
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;

                let mut stdout = io::stdout();
                match shell.route(&line, &mut stdout) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Exit) => return Ok(()),
                    Err(e) => writeln!(stdout, "Error: {e:#}")?,
                }
                stdout.flush()?;
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err).context("reading input"),
        }
    }
}
