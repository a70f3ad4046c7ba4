//! Crate implementing the CLI commands.

mod cli;
mod config;
mod console;
mod run;

pub use self::cli::{CliAction, CliOpts};
pub use self::config::{Breakpoint, RunConfig};
pub use self::console::parse_command;
pub use self::run::{evaluate_convert, evaluate_exec, evaluate_run};
