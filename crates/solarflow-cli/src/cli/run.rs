//! `sflow run` handler: execute a single workflow.

use anyhow::{Context, Result};
use console::style;
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn run_workflow(
    state: &AppState,
    workflow_id: &str,
    context: Option<&str>,
    json: bool,
) -> Result<()> {
    let trigger_context = match context {
        Some(raw) => {
            serde_json::from_str::<Value>(raw).with_context(|| "Invalid JSON context")?
        }
        None => json!({}),
    };

    let report = state
        .service
        .try_execute(workflow_id, trigger_context)
        .await
        .with_context(|| format!("Workflow '{workflow_id}' failed"))?;

    if json {
        let out = json!({
            "run_id": report.run_id.to_string(),
            "workflow_id": report.workflow_id,
            "executed_steps": report.executed_steps,
            "started_at": report.started_at.to_rfc3339(),
            "completed_at": report.completed_at.to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Workflow '{}' completed",
        style("*").green().bold(),
        style(workflow_id).cyan()
    );
    println!("  Run ID: {}", report.run_id);
    println!(
        "  Steps: {}",
        if report.executed_steps.is_empty() {
            "(none)".to_string()
        } else {
            report.executed_steps.join(" -> ")
        }
    );
    println!(
        "  Duration: {} ms",
        (report.completed_at - report.started_at).num_milliseconds()
    );
    println!();

    Ok(())
}
