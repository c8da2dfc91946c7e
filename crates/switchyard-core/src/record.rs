use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audit entry for one step invocation.
///
/// Built by the runner right after a step completes and never mutated
/// afterwards; fields are private and only exposed through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    step_name: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    route_key: Option<String>,
}

impl ExecutionRecord {
    /// Record for a router step: no output, the decided route key.
    pub fn routed(
        step_name: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        input: Value,
        route_key: impl Into<String>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            started_at,
            finished_at,
            input,
            output: None,
            route_key: Some(route_key.into()),
        }
    }

    /// Record for an action step: its output (if any), no route key.
    pub fn acted(
        step_name: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        input: Value,
        output: Option<Value>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            started_at,
            finished_at,
            input,
            output,
            route_key: None,
        }
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// The value the step actually consumed.
    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn route_key(&self) -> Option<&str> {
        self.route_key.as_deref()
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
