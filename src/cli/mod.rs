//! CLI module
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP server
//! - query: One-shot overlap request read from stdin
//! - check-config: Validate a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, load_config, query, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{params_from_value, read_params, write_json};
