//! Execution context threaded through a workflow run.
//!
//! The context wraps the trigger payload as a JSON document. Steps read
//! from it with dot-separated paths (`customer.email`, `invoice.items.0`)
//! and notification templates interpolate `{path}` placeholders against it.

use serde_json::Value;

/// Resolve a dot-separated path against a JSON document.
///
/// Each segment indexes into an object by key; a segment that parses as an
/// integer indexes into an array. Returns `None` as soon as a segment does
/// not resolve.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Render a JSON value as template text.
///
/// Strings are used as-is (no surrounding quotes); scalars use their JSON
/// form; objects and arrays fall back to compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// The data a workflow run operates on.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    data: Value,
}

impl ExecutionContext {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Look up a dot-separated path in the context data.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.data, path)
    }

    /// Snapshot of the raw context payload.
    pub fn snapshot(&self) -> Value {
        self.data.clone()
    }

    /// Interpolate `{path}` placeholders in a template.
    ///
    /// Placeholders whose path does not resolve are left verbatim, so a
    /// template typo shows up in the delivered message rather than
    /// silently vanishing. Output is never re-scanned, so context values
    /// containing braces cannot trigger further substitution.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after_open = &rest[open + 1..];
            match after_open.find('}') {
                Some(close) => {
                    let key = after_open[..close].trim();
                    match self.get(key) {
                        Some(value) => out.push_str(&value_to_string(value)),
                        None => {
                            out.push('{');
                            out.push_str(&after_open[..close]);
                            out.push('}');
                        }
                    }
                    rest = &after_open[close + 1..];
                }
                None => {
                    // Unbalanced brace: keep the tail as-is.
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
