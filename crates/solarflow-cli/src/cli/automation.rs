//! `sflow daily` / `sflow weekly` handlers: composite automation sweeps.

use anyhow::Result;
use console::style;
use serde_json::json;

use crate::state::AppState;

pub async fn run_daily(state: &AppState, json: bool) -> Result<()> {
    state.service.run_daily_automation().await;
    done("daily", json)
}

pub async fn run_weekly(state: &AppState, json: bool) -> Result<()> {
    state.service.run_weekly_automation().await;
    done("weekly", json)
}

/// Sub-steps are independent and log their own failures; reaching this
/// point means the sweep itself ran to completion.
fn done(kind: &str, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "automation": kind, "status": "completed" }))?
        );
        return Ok(());
    }

    println!();
    println!(
        "  {} {} automation completed",
        style("*").green().bold(),
        style(kind).cyan()
    );
    println!();

    Ok(())
}
