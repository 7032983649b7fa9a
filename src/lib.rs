//! A small interactive shell with a handful of built-ins and external command execution.
//!
//! Each input line is tokenized, recorded in the session history and routed either to a
//! built-in (`cd`, `list`, `ptime`, `history`, `^`, `exit`) or to the external process runner.
//! The runner can connect two programs with a single `|` and detach them with a trailing `&`,
//! and it measures how long external commands take.
//!
//! The main entry point is [`Interpreter`], which owns the [`Session`] state and routes lines.

mod builtin;
pub mod command;
pub mod config;
pub mod errors;
mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
mod listing;
pub mod session;

pub use config::Config;
pub use external::{Execution, Runner};
pub use interpreter::{Flow, Interpreter};
pub use session::Session;
