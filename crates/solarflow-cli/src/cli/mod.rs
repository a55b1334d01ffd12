//! CLI command definitions and dispatch for the `sflow` binary.
//!
//! Uses clap derive macros for argument parsing. Every command works
//! against the automation service; `--json` switches styled output to
//! machine-readable JSON.

pub mod alerts;
pub mod automation;
pub mod config;
pub mod run;
pub mod schedule;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Workflow and alert automation engine for the Solarflow platform.
#[derive(Parser)]
#[command(name = "sflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the automation catalog file.
    #[arg(long, global = true, default_value = "catalog.yaml")]
    pub catalog: PathBuf,

    /// Path to the engine settings file.
    #[arg(long, global = true, default_value = "settings.toml")]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow by id.
    Run {
        /// Workflow id from the catalog (e.g. "invoice_processing").
        workflow_id: String,

        /// JSON trigger context handed to the workflow.
        #[arg(long)]
        context: Option<String>,
    },

    /// Evaluate every enabled alert rule once against the current state.
    #[command(name = "check-alerts")]
    CheckAlerts,

    /// Run the daily automation sweep (distributor sync, overdue check).
    Daily,

    /// Run the weekly automation sweep (weekly report, approval expiry).
    Weekly,

    /// Inspect engine configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Parse and validate a catalog file without installing it.
    Validate {
        /// Path to the catalog YAML file.
        file: PathBuf,
    },

    /// Run the cron scheduler until Ctrl+C.
    Schedule,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Render the active catalog (workflows, alerts, schedules).
    Show,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command_parses() {
        let cli = Cli::try_parse_from([
            "sflow",
            "run",
            "invoice_processing",
            "--context",
            r#"{"invoice": {"amount": 100}}"#,
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                workflow_id,
                context,
            } => {
                assert_eq!(workflow_id, "invoice_processing");
                assert!(context.is_some());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sflow",
            "check-alerts",
            "--json",
            "--catalog",
            "/etc/solarflow/catalog.yaml",
            "-vv",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.catalog,
            PathBuf::from("/etc/solarflow/catalog.yaml")
        );
        assert!(matches!(cli.command, Commands::CheckAlerts));
    }
}
