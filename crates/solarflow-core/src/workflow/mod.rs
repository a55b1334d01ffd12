//! Workflow execution: context, condition evaluation, step execution, and
//! the sequential runner that walks a workflow's step chain.

pub mod condition;
pub mod context;
pub mod runner;
pub mod step_runner;

pub use context::ExecutionContext;
pub use runner::{RunError, WorkflowRunner};
pub use step_runner::{StepError, StepRunner};
