//! `sflow check-alerts` handler: one sweep over the alert rules.

use anyhow::Result;
use console::style;
use serde_json::json;

use crate::state::AppState;

pub async fn check_alerts(state: &AppState, json: bool) -> Result<()> {
    let triggered = state.service.check_alerts().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "triggered": triggered }))?
        );
        return Ok(());
    }

    println!();
    if triggered == 0 {
        println!("  {} No alerts triggered", style("*").green().bold());
    } else {
        println!(
            "  {} {} alert{} triggered",
            style("!").yellow().bold(),
            style(triggered).yellow(),
            if triggered == 1 { "" } else { "s" }
        );
    }
    println!();

    Ok(())
}
