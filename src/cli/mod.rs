//! Command line interface for relpack.
//!
//! Parses arguments, builds [`Settings`](crate::bundler::Settings) from them
//! and runs the `pack` or `clean` command with colored feedback.

mod args;
mod commands;
mod output;

pub use args::{Args, CleanArgs, Command, PackArgs};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub fn run(args: Args) -> Result<i32> {
    execute_command(args)
}

/// Parse arguments without executing
pub fn parse_args() -> Args {
    Args::parse_args()
}
