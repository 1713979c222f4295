//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::backend::{self, SearchBackend};
use crate::config::{ConfigError, ServiceConfig};
use crate::http_server::HttpServer;
use crate::join::{ErrorResponse, JoinOrchestrator};
use crate::observability;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_params, write_json};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Query { config } => query(&config),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Load the configuration file, or the defaults when it does not exist
pub fn load_config(path: &Path) -> CliResult<(ServiceConfig, bool)> {
    if path.exists() {
        Ok((ServiceConfig::load(path)?, true))
    } else {
        Ok((ServiceConfig::default(), false))
    }
}

fn build_orchestrator(config: &ServiceConfig) -> CliResult<JoinOrchestrator> {
    let backend: Arc<dyn SearchBackend> = backend::connect(&config.backend)?;
    Ok(JoinOrchestrator::new(backend, config.engine.clone()))
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// Run the HTTP server until it fails
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let (mut config, from_file) = load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
        config.server.validate()?;
    }

    observability::init(config.log_format);
    if from_file {
        info!(path = %config_path.display(), "configuration loaded");
    } else {
        info!(path = %config_path.display(), "configuration file not found, using defaults");
    }
    info!(backend = ?config.backend, "search backend configured");

    let rt = runtime()?;
    rt.block_on(async {
        let orchestrator = build_orchestrator(&config)?;
        let server = HttpServer::new(config.server.clone(), orchestrator);

        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Run one overlap request from stdin and write the response to stdout.
///
/// Request failures are written as a JSON error object and also returned,
/// so the process exits non-zero.
pub fn query(config_path: &Path) -> CliResult<()> {
    let (config, _) = load_config(config_path)?;
    observability::init(config.log_format);

    let params = read_params()?;

    let rt = runtime()?;
    rt.block_on(async {
        let orchestrator = build_orchestrator(&config)?;
        let timeout = config.server.request_timeout();

        let result = tokio::time::timeout(timeout, orchestrator.handle(&params))
            .await
            .unwrap_or(Err(crate::join::OverlapError::Timeout(timeout)));

        match result {
            Ok(response) => write_json(&response),
            Err(e) => {
                write_json(&ErrorResponse::from(&e))?;
                Err(CliError::query_failed(e.to_string()))
            }
        }
    })
}

/// Validate a configuration file and print the effective settings
pub fn check_config(config_path: &Path) -> CliResult<()> {
    if !config_path.exists() {
        return Err(ConfigError::Read {
            path: config_path.display().to_string(),
            reason: "file not found".to_string(),
        }
        .into());
    }

    let config = ServiceConfig::load(config_path)?;
    write_json(&config)
}
