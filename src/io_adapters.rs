use crate::command::Terminal;
use std::fs::File;
use std::io::Result as IoResult;
use std::process::Stdio;

/// Children share the shell's own terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct InheritedTerminal;

impl Terminal for InheritedTerminal {
    fn stdin(&self) -> IoResult<Stdio> {
        Ok(Stdio::inherit())
    }

    fn stdout(&self) -> IoResult<Stdio> {
        Ok(Stdio::inherit())
    }

    fn stderr(&self) -> IoResult<Stdio> {
        Ok(Stdio::inherit())
    }
}

/// File-backed terminal: no input, and both output streams appended to one file.
///
/// Used to capture what children would have printed.
#[derive(Debug)]
pub struct FileTerminal {
    output: File,
}

impl FileTerminal {
    pub fn new(output: File) -> Self {
        Self { output }
    }
}

impl Terminal for FileTerminal {
    /// Children see an immediate end-of-file instead of waiting on the real terminal.
    fn stdin(&self) -> IoResult<Stdio> {
        Ok(Stdio::null())
    }

    fn stdout(&self) -> IoResult<Stdio> {
        Ok(self.output.try_clone()?.into())
    }

    fn stderr(&self) -> IoResult<Stdio> {
        Ok(self.output.try_clone()?.into())
    }
}
