use serde::Serialize;
use serde_json::Value;

use crate::traits::StepKind;
use crate::types::RunId;

/// Structured event emitted by the runner while it walks a plan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlanEvent {
    /// A run started.
    RunStarted { run_id: RunId, input: Value },
    /// A step is about to be invoked.
    StepStarted {
        run_id: RunId,
        step: String,
        #[serde(serialize_with = "serialize_kind")]
        kind: StepKind,
    },
    /// A router decided a route key.
    RouteDecided {
        run_id: RunId,
        step: String,
        route_key: String,
    },
    /// An action finished.
    ActionCompleted {
        run_id: RunId,
        step: String,
        has_output: bool,
    },
    /// The run reached a terminal action.
    RunCompleted { run_id: RunId, steps: usize },
    /// The run failed.
    RunFailed { run_id: RunId, error: String },
}

impl PlanEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StepStarted { run_id, .. }
            | Self::RouteDecided { run_id, .. }
            | Self::ActionCompleted { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. } => run_id,
        }
    }

    /// Whether this is the last event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunCompleted { .. } | Self::RunFailed { .. })
    }
}

fn serialize_kind<S: serde::Serializer>(kind: &StepKind, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(kind)
}

/// Receiver of plan events, passed explicitly to each run.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PlanEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PlanEvent) {}
}

impl<F> EventSink for F
where
    F: Fn(PlanEvent) + Send + Sync,
{
    fn emit(&self, event: PlanEvent) {
        self(event)
    }
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<PlanEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: PlanEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PlanEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: PlanEvent) {
        self.publish(event);
    }
}
