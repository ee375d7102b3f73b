use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinfx::core::log::init_logging;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP conversion service
    Serve {
        /// Address to listen on, overrides the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Convert an amount between a crypto id and a fiat code
    Convert {
        /// Currency to convert from, e.g. bitcoin or eur
        base: String,
        /// Currency to convert to, e.g. usd or ethereum
        target: String,
        /// Amount of the base currency
        #[arg(short, long, default_value = "1")]
        amount: String,
        /// Print the raw JSON result
        #[arg(long)]
        json: bool,
    },
}

impl From<Commands> for coinfx::AppCommand {
    fn from(cmd: Commands) -> coinfx::AppCommand {
        match cmd {
            Commands::Serve { bind } => coinfx::AppCommand::Serve { bind },
            Commands::Convert {
                base,
                target,
                amount,
                json,
            } => coinfx::AppCommand::Convert {
                base,
                target,
                amount,
                json,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Some(Commands::Serve { .. }) => LevelFilter::INFO,
        _ => LevelFilter::WARN,
    };
    init_logging(cli.verbose, default_level);

    let result = match cli.command {
        Some(Commands::Setup) => coinfx::cli::setup::setup(),
        Some(cmd) => coinfx::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
