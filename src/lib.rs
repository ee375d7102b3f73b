pub mod cli;
pub mod core;
pub mod providers;
pub mod server;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

/// Commands that run against a loaded configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Serve {
        bind: Option<String>,
    },
    Convert {
        base: String,
        target: String,
        amount: String,
        json: bool,
    },
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        bind = %config.server.bind,
        fiat_metadata = %config.fiat_metadata.display(),
        "Loaded config"
    );
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = server::AppState::from_config(&config)?;

    match command {
        AppCommand::Serve { bind } => {
            info!("coinfx server starting...");
            let addr = bind.as_deref().unwrap_or(&config.server.bind);
            server::serve(state, addr).await
        }
        AppCommand::Convert {
            base,
            target,
            amount,
            json,
        } => cli::convert::run(&state.converter, &base, &target, &amount, json).await,
    }
}
