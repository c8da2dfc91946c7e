use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SwitchyardError};
use crate::record::ExecutionRecord;
use crate::types::{value_kind, value_text, ChatMessage, Role, RunId};

/// Per-run state: the original input, the latest output and route key,
/// and the ordered audit trail of every step executed.
///
/// A context belongs to exactly one run and is never shared between runs.
#[derive(Debug, Clone)]
pub struct Context {
    run_id: RunId,
    input: Value,
    output: Option<Value>,
    route_key: Option<String>,
    records: Vec<ExecutionRecord>,
    history: Vec<ChatMessage>,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl Context {
    /// Create a context for a new run. Null and blank-string inputs are rejected.
    pub fn new(input: impl Into<Value>) -> Result<Self> {
        let input = input.into();
        let blank = match &input {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        };
        if blank {
            return Err(SwitchyardError::EmptyInput);
        }

        Ok(Self {
            run_id: RunId::new(),
            input,
            output: None,
            route_key: None,
            records: Vec::new(),
            history: Vec::new(),
            started_at: Utc::now(),
            cancel: CancellationToken::new(),
        })
    }

    /// Attach prior conversation history.
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Attach a cancellation token that steps may observe.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build the context for the next conversational turn.
    ///
    /// This run's exchange (input, and output when present) is appended to the
    /// history, which is then trimmed to its last `history_limit` messages.
    /// The cancellation token carries over.
    pub fn next_turn(&self, input: impl Into<Value>, history_limit: usize) -> Result<Self> {
        let mut history = self.history.clone();
        history.push(ChatMessage::user(value_text(&self.input)));
        if let Some(ref output) = self.output {
            history.push(ChatMessage::assistant(value_text(output)));
        }
        if history.len() > history_limit {
            history.drain(..history.len() - history_limit);
        }

        Ok(Self::new(input)?
            .with_history(history)
            .with_cancellation(self.cancel.clone()))
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// The original input supplied at creation.
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// The last output produced by any executed action.
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    /// The last route key decided by any executed router.
    pub fn route_key(&self) -> Option<&str> {
        self.route_key.as_deref()
    }

    /// Execution records, in execution order.
    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Finish time of the most recent record, if any step has run.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.records.last().map(|r| r.finished_at())
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The value the next step will consume. See [`latest_output_or_input`].
    pub fn working_input(&self) -> &Value {
        latest_output_or_input(self)
    }

    /// Deserialize the original input into `T`.
    pub fn input_as<T: DeserializeOwned>(&self) -> Result<T> {
        convert(&self.input)
    }

    /// Deserialize the current output into `T`. `Ok(None)` when there is no output.
    pub fn output_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.output.as_ref().map(convert).transpose()
    }

    /// History rendered as `role: content` lines, oldest first.
    pub fn history_for_prompt(&self) -> String {
        self.history
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                format!("{}: {}", role, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn set_output(&mut self, output: Option<Value>) {
        self.output = output;
    }

    pub fn set_route_key(&mut self, route_key: impl Into<String>) {
        self.route_key = Some(route_key.into());
    }

    /// Append a record. Records are never removed or rewritten.
    pub fn push_record(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }
}

/// The input for the next step: the output of the most recent record that
/// produced one, or the context's original input when none has.
pub fn latest_output_or_input(ctx: &Context) -> &Value {
    ctx.records
        .iter()
        .rev()
        .find_map(|r| r.output())
        .unwrap_or(&ctx.input)
}

fn convert<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|_| SwitchyardError::ValueType {
        expected: short_type_name::<T>().to_string(),
        actual: value_kind(value).to_string(),
    })
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
