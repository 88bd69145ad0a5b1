//! CLI module for optica
//!
//! Provides command-line interface for:
//! - serve: run the prescription API server
//! - check-config: validate configuration and exit

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
