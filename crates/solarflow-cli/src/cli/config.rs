//! `sflow config show` / `sflow validate` handlers.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::json;
use solarflow_core::catalog;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Show
// ---------------------------------------------------------------------------

pub async fn show_config(state: &AppState, json: bool) -> Result<()> {
    let config = state.service.get_config().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("Workflows").bold());
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Id").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Trigger"),
            Cell::new("Steps"),
            Cell::new("Enabled"),
        ]);
    for workflow in &config.workflows {
        table.add_row(vec![
            Cell::new(&workflow.id),
            Cell::new(&workflow.name),
            Cell::new(workflow.trigger.to_string()),
            Cell::new(workflow.steps.len()),
            enabled_cell(workflow.enabled),
        ]);
    }
    println!("{table}");

    println!();
    println!("  {}", style("Alerts").bold());
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Id").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Severity"),
            Cell::new("Condition"),
            Cell::new("Cooldown"),
            Cell::new("Enabled"),
        ]);
    for alert in &config.alerts {
        let condition: String = alert.condition.chars().take(40).collect();
        table.add_row(vec![
            Cell::new(&alert.id),
            Cell::new(&alert.name),
            Cell::new(alert.severity.to_string()),
            Cell::new(condition),
            Cell::new(format!("{} min", alert.cooldown_minutes)),
            enabled_cell(alert.enabled),
        ]);
    }
    println!("{table}");

    println!();
    println!("  {}", style("Schedules").bold());
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Id").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Cron"),
            Cell::new("Action"),
            Cell::new("Enabled"),
        ]);
    for schedule in &config.schedules {
        table.add_row(vec![
            Cell::new(&schedule.id),
            Cell::new(&schedule.name),
            Cell::new(&schedule.cron),
            Cell::new(&schedule.action),
            enabled_cell(schedule.enabled),
        ]);
    }
    println!("{table}");
    println!();

    Ok(())
}

fn enabled_cell(enabled: bool) -> Cell {
    if enabled {
        Cell::new("enabled").fg(Color::Green)
    } else {
        Cell::new("disabled").fg(Color::DarkGrey)
    }
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

/// Structural validation of a catalog file on disk. Action names are not
/// checked here; they resolve against the registry when the catalog is
/// installed.
pub async fn validate_file(file: &Path, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let config = catalog::parse_catalog(&content)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    catalog::validate_catalog(&config, None)
        .with_context(|| format!("Catalog {} is invalid", file.display()))?;

    if json {
        let out = json!({
            "valid": true,
            "workflows": config.workflows.len(),
            "alerts": config.alerts.len(),
            "schedules": config.schedules.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Catalog '{}' is valid",
        style("*").green().bold(),
        style(file.display()).cyan()
    );
    println!("  Workflows: {}", config.workflows.len());
    println!("  Alerts: {}", config.alerts.len());
    println!("  Schedules: {}", config.schedules.len());
    println!();

    Ok(())
}
