//! Sequential workflow runner.
//!
//! Walks a workflow from its first step, following `on_true` / `on_false`
//! successors, until a step has no successor, a successor id does not
//! resolve, a step fails, or a step is revisited. Exactly one step runs at
//! a time; there is no parallel fan-out inside a run.

use std::collections::HashSet;

use chrono::Utc;
use solarflow_types::workflow::{RunReport, Workflow};
use thiserror::Error;
use uuid::Uuid;

use crate::notify::NotificationDispatcher;
use crate::store::RecordStore;

use super::context::ExecutionContext;
use super::step_runner::{StepError, StepRunner};

/// A workflow run could not start or was aborted.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("workflow '{0}' is disabled")]
    WorkflowDisabled(String),

    #[error("workflow '{0}' has no steps")]
    EmptyWorkflow(String),

    #[error("cycle detected in workflow '{workflow_id}' at step '{step_id}'")]
    CycleDetected {
        workflow_id: String,
        step_id: String,
    },

    #[error("step '{step_id}' failed")]
    Step {
        step_id: String,
        #[source]
        source: StepError,
    },
}

// ---------------------------------------------------------------------------
// WorkflowRunner
// ---------------------------------------------------------------------------

pub struct WorkflowRunner<S, N> {
    steps: StepRunner<S, N>,
}

impl<S, N> WorkflowRunner<S, N>
where
    S: RecordStore,
    N: NotificationDispatcher,
{
    pub fn new(steps: StepRunner<S, N>) -> Self {
        Self { steps }
    }

    /// Run the workflow against the given context.
    ///
    /// The report lists every executed step id in order. Revisiting a step
    /// aborts the run: catalog validation rejects cyclic graphs, so a
    /// revisit here means the workflow changed underneath us or validation
    /// was bypassed.
    pub async fn run(
        &self,
        workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<RunReport, RunError> {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        tracing::info!(%run_id, workflow = workflow.id.as_str(), "workflow run started");

        let entry = match workflow.entry_step() {
            Some(step) => step,
            None => return Err(RunError::EmptyWorkflow(workflow.id.clone())),
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut executed: Vec<String> = Vec::new();
        let mut current = entry;

        loop {
            if !visited.insert(current.id.as_str()) {
                tracing::warn!(
                    %run_id,
                    workflow = workflow.id.as_str(),
                    step = current.id.as_str(),
                    "step revisited, aborting run"
                );
                return Err(RunError::CycleDetected {
                    workflow_id: workflow.id.clone(),
                    step_id: current.id.clone(),
                });
            }
            executed.push(current.id.clone());

            let branch = self
                .steps
                .run(run_id, &workflow.id, current, ctx)
                .await
                .map_err(|source| RunError::Step {
                    step_id: current.id.clone(),
                    source,
                })?;

            let successor = if branch {
                current.next.on_true.as_deref()
            } else {
                current.next.on_false.as_deref()
            };

            match successor {
                Some(id) => match workflow.step(id) {
                    Some(step) => current = step,
                    None => {
                        tracing::debug!(
                            %run_id,
                            workflow = workflow.id.as_str(),
                            successor = id,
                            "successor not defined, ending run"
                        );
                        break;
                    }
                },
                None => break,
            }
        }

        let completed_at = Utc::now();
        tracing::info!(
            %run_id,
            workflow = workflow.id.as_str(),
            steps = executed.len(),
            "workflow run completed"
        );
        Ok(RunReport {
            run_id,
            workflow_id: workflow.id.clone(),
            executed_steps: executed,
            started_at,
            completed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
