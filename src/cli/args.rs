//! CLI argument definitions using clap
//!
//! Commands:
//! - optica serve --config <path> [--port <port>]
//! - optica check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Optica - HTTP API for optical prescriptions
#[derive(Parser, Debug)]
#[command(name = "optica")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./optica.json")]
        config: PathBuf,

        /// Port to listen on (overrides the configuration)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load and validate the configuration, then exit
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./optica.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["optica", "serve"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Serve {
                config: PathBuf::from("./optica.json"),
                port: None
            }
        );
    }

    #[test]
    fn test_serve_with_port() {
        let cli = Cli::try_parse_from(["optica", "serve", "--config", "/etc/optica.json", "--port", "8080"])
            .unwrap();
        assert_eq!(
            cli.command,
            Command::Serve {
                config: PathBuf::from("/etc/optica.json"),
                port: Some(8080)
            }
        );
    }

    #[test]
    fn test_check_config() {
        let cli = Cli::try_parse_from(["optica", "check-config"]).unwrap();
        assert!(matches!(cli.command, Command::CheckConfig { .. }));
    }

    #[test]
    fn test_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["optica", "migrate"]).is_err());
    }
}
