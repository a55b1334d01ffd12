//! Solarflow automation engine entry point.
//!
//! Binary name: `sflow`
//!
//! Parses CLI arguments, loads settings and the automation catalog, wires
//! the engine, then dispatches to the appropriate command handler.

mod cli;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,solarflow=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Validation works on a file, not the installed catalog; no state needed.
    if let Commands::Validate { file } = &cli.command {
        return cli::config::validate_file(file, cli.json).await;
    }

    let state = AppState::init(&cli.settings, &cli.catalog).await?;

    match cli.command {
        Commands::Run {
            workflow_id,
            context,
        } => {
            cli::run::run_workflow(&state, &workflow_id, context.as_deref(), cli.json).await?;
        }

        Commands::CheckAlerts => {
            cli::alerts::check_alerts(&state, cli.json).await?;
        }

        Commands::Daily => {
            cli::automation::run_daily(&state, cli.json).await?;
        }

        Commands::Weekly => {
            cli::automation::run_weekly(&state, cli.json).await?;
        }

        Commands::Config { action } => match action {
            ConfigCommand::Show => {
                cli::config::show_config(&state, cli.json).await?;
            }
        },

        Commands::Schedule => {
            cli::schedule::run_scheduler(&state, cli.json).await?;
        }

        Commands::Validate { .. } => unreachable!("handled above"),
    }

    Ok(())
}
