//! `sflow schedule` handler: long-running cron scheduler mode.

use anyhow::Result;
use console::style;
use solarflow_infra::scheduler::{ScheduleHost, install_catalog_jobs};

use crate::state::AppState;

pub async fn run_scheduler(state: &AppState, json: bool) -> Result<()> {
    let host = ScheduleHost::new();
    host.start().await?;

    let installed = install_catalog_jobs(&host, &state.service, &state.settings).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "schedules": installed,
                "alert_check_interval_minutes": state.settings.alert_check_interval_minutes,
                "status": "running",
            }))?
        );
    } else {
        println!();
        println!(
            "  {} Scheduler running ({} schedule{}, alert sweep every {} min)",
            style("*").green().bold(),
            installed,
            if installed == 1 { "" } else { "s" },
            state.settings.alert_check_interval_minutes
        );
        println!("  {}", style("Press Ctrl+C to stop").dim());
    }

    let token = host.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });

    host.run_until_cancelled().await?;

    if !json {
        println!("\n  Scheduler stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
