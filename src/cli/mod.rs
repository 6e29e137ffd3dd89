//! CLI module for recordfinder
//!
//! Provides command-line interface for:
//! - serve: Boot the service and serve HTTP and WebSocket requests
//! - find: One-shot find against the configured fixtures

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{boot, build_state, execute, find, run, run_command, serve, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_json, write_json_to};
