//! Library side of the `rets` command-line tool
//!
//! Argument definitions, subcommand handlers and JSON output live here so
//! they can be tested without spawning the binary.

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Command, ConnectionArgs};
