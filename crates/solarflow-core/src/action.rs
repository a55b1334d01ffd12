//! Action handlers and the registry that resolves them by name.
//!
//! [`Action`] uses native async fn / RPITIT, which makes it
//! non-object-safe. [`BoxAction`] wraps any handler behind a boxed
//! dyn-compatible shim trait so the registry can hold heterogeneous
//! handlers under their catalog names (`create_invoice`, `send_reminder`,
//! `sync_distributor_data`, ...).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use solarflow_types::error::ActionError;

use crate::workflow::ExecutionContext;

/// A named side effect invoked by action steps, alert rules and schedules.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait Action: Send + Sync {
    fn execute(
        &self,
        ctx: &ExecutionContext,
    ) -> impl Future<Output = Result<(), ActionError>> + Send;
}

// ---------------------------------------------------------------------------
// Object-safe shim
// ---------------------------------------------------------------------------

trait ActionDyn: Send + Sync {
    fn execute_boxed<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'a>>;
}

impl<T: Action> ActionDyn for T {
    fn execute_boxed<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'a>> {
        Box::pin(self.execute(ctx))
    }
}

/// A boxed, type-erased [`Action`].
pub struct BoxAction {
    inner: Box<dyn ActionDyn>,
}

impl BoxAction {
    pub fn new<T: Action + 'static>(action: T) -> Self {
        Self {
            inner: Box::new(action),
        }
    }

    /// Build an action from an async closure over a context snapshot.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Self::new(FnAction(f))
    }

    pub async fn execute(&self, ctx: &ExecutionContext) -> Result<(), ActionError> {
        self.inner.execute_boxed(ctx).await
    }
}

impl std::fmt::Debug for BoxAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoxAction")
    }
}

struct FnAction<F>(F);

impl<F, Fut> Action for FnAction<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ActionError>> + Send,
{
    fn execute(
        &self,
        ctx: &ExecutionContext,
    ) -> impl Future<Output = Result<(), ActionError>> + Send {
        (self.0)(ctx.clone())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name-indexed action handlers.
///
/// The registry is assembled once at startup and shared read-only; catalog
/// validation checks action references against it so an unknown name is
/// caught at load time rather than mid-run.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, BoxAction>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, action: BoxAction) {
        self.handlers.insert(name.into(), action);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered action names, sorted for stable output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn invoke(&self, name: &str, ctx: &ExecutionContext) -> Result<(), ActionError> {
        match self.handlers.get(name) {
            Some(action) => action.execute(ctx).await,
            None => Err(ActionError::UnknownAction(name.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
