use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use streamsim_config::{ConfigLoader, SimulatorConfig};
use streamsim_core::SimNow;
use streamsim_engine::{Engine, SimClock};
use streamsim_http::{HttpServiceClient, ServiceClientConfig};
use streamsim_logging::{init_logging, init_simple_tracing};
use streamsim_storage::InMemoryEntityStore;
use tracing::{error, info};

mod cli;
mod control;
use cli::{Cli, Commands, ConfigCommands};

/// Load configuration from the given file, or from defaults and environment
fn load_config(config_path: Option<&PathBuf>) -> Result<SimulatorConfig> {
    let loader = ConfigLoader::new();
    match config_path {
        Some(path) => loader
            .from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

/// Build the engine, serve the control routes and run until interrupted
async fn run_command(mut config: SimulatorConfig, no_warmup: bool, start: bool) -> Result<()> {
    if no_warmup {
        config.warmup.enabled = false;
    }

    let clock = Arc::new(SimClock::from_config(&config.clock, Utc::now())?);
    let now: Arc<dyn SimNow> = clock.clone();
    let client = HttpServiceClient::new(ServiceClientConfig::from(&config.backend), now)
        .context("Failed to create backend client")?;
    let store = Arc::new(InMemoryEntityStore::new());

    let addr = config.server.socket_addr();
    info!(
        backend = %config.backend.base_url,
        multiplier = config.clock.multiplier,
        warmup = config.warmup.enabled,
        control = %addr,
        "Starting simulator"
    );

    let engine = Engine::new(config, clock, Arc::new(client), store);
    let handle = engine.handle();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind control server to {}", addr))?;
    let app = control::router(handle.clone());
    let mut server = tokio::spawn(async move { axum::serve(listener, app).await });
    info!("Control server listening on {}", addr);

    if start {
        handle.start()?;
    }

    let outcome = tokio::select! {
        result = engine.run() => result.map_err(anyhow::Error::from),
        served = &mut server => match served {
            Ok(Ok(())) => Err(anyhow::anyhow!("Control server stopped")),
            Ok(Err(e)) => Err(anyhow::Error::from(e).context("Control server failed")),
            Err(e) => Err(anyhow::Error::from(e).context("Control server task failed")),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };
    server.abort();

    if let Err(e) = &outcome {
        error!(error = %e, "Simulator ended with an error");
    }
    info!(sim_time = %handle.status().sim_time, "Simulator stopped");
    outcome
}

fn handle_config_validate(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!("Configuration file not found: {:?}", config_file));
    }

    match ConfigLoader::new().from_file(config_file) {
        Ok(_) => {
            println!("Configuration file is valid");
            Ok(())
        }
        Err(e) => {
            println!("Configuration validation failed: {}", e);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            no_warmup,
            start,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(level) = cli.log_level.as_deref() {
                config.logging.level = level.parse().map_err(anyhow::Error::msg)?;
            }
            init_logging(&config.logging)?;
            run_command(config, no_warmup, start).await
        }
        Commands::Config { config_cmd } => {
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;
            match config_cmd {
                ConfigCommands::Sample => {
                    print!("{}", SimulatorConfig::generate_sample());
                    Ok(())
                }
                ConfigCommands::Validate { config } => handle_config_validate(&config),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_accepts_sample() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SimulatorConfig::generate_sample()).unwrap();
        handle_config_validate(file.path()).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_probability() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "user_agent:\n  prob_leave_session: 1.5").unwrap();
        assert!(handle_config_validate(file.path()).is_err());
    }

    #[test]
    fn test_validate_missing_file() {
        assert!(handle_config_validate(Path::new("/nonexistent/streamsim.yaml")).is_err());
    }
}
