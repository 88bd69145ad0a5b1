//! CLI command implementations
//!
//! - serve: load configuration, build the data service client, run the HTTP
//!   server until ctrl-c
//! - check-config: load and validate the configuration only

use std::path::Path;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::data_service::RestDataService;
use crate::http_server::{AppState, HttpServer};
use crate::observability::Logger;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve { config, port } => serve(&config, port),
        Command::CheckConfig { config } => check_config(&config).map(|_| ()),
    }
}

/// Load configuration and apply CLI overrides
fn load_config(config_path: &Path, port: Option<u16>) -> CliResult<ServiceConfig> {
    let mut config = ServiceConfig::load(config_path)?;
    if let Some(port) = port {
        config.http.port = port;
        config.validate()?;
    }
    Logger::set_min_severity(config.severity()?);
    Ok(config)
}

/// Start the HTTP server
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let config = load_config(config_path, port)?;

    let data = RestDataService::from_config(&config.data_service)?;
    let state = AppState::new(Arc::new(data))
        .with_max_append_attempts(config.medical_details.max_append_attempts)
        .with_version_column(config.medical_details.version_column.as_str());
    let server = HttpServer::with_state(config.http.clone(), state);

    Logger::info(
        "SERVER_BOOT",
        &[
            ("addr", server.socket_addr().as_str()),
            ("data_service", config.data_service.url.as_str()),
        ],
    );

    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(server.start()).map_err(|e| {
        let message = format!("HTTP server failed: {}", e);
        Logger::fatal("SERVER_FAILED", &[("error", message.as_str())]);
        CliError::boot_failed(message)
    })
}

/// Validate configuration and report the effective settings
pub fn check_config(config_path: &Path) -> CliResult<ServiceConfig> {
    let config = load_config(config_path, None)?;
    Logger::info(
        "CONFIG_OK",
        &[
            ("addr", config.http.socket_addr().as_str()),
            ("data_service", config.data_service.url.as_str()),
            ("log_level", config.log_level.as_str()),
        ],
    );
    Ok(config)
}
