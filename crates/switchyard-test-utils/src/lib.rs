//! Fake steps and fixtures shared by Switchyard tests.
//!
//! The keyword routers and canned actions mirror the demo conversation:
//! "hi" falls back to small talk, "support" goes to support, and season
//! questions go through a business router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use switchyard_core::context::Context;
use switchyard_core::error::{Result, SwitchyardError};
use switchyard_core::event::{EventSink, PlanEvent};
use switchyard_core::traits::{ActionStep, RouterStep, Step};
use switchyard_engine::StepRegistry;

fn text(input: &Value) -> String {
    input.as_str().unwrap_or_default().to_lowercase()
}

/// Routes on keywords in the input; order matters.
pub struct KeywordRouter {
    name: String,
    rules: Vec<(String, String)>,
}

impl KeywordRouter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Route to `route_key` when the input contains `keyword` (case-insensitive).
    pub fn rule(mut self, keyword: impl Into<String>, route_key: impl Into<String>) -> Self {
        self.rules.push((keyword.into().to_lowercase(), route_key.into()));
        self
    }
}

impl RouterStep for KeywordRouter {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide<'a>(
        &'a self,
        input: &'a Value,
        _ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let input = text(input);
            Ok(self
                .rules
                .iter()
                .find(|(keyword, _)| input.contains(keyword.as_str()))
                .map(|(_, key)| key.clone()))
        })
    }
}

/// Always routes to the same key.
pub struct FixedRouter {
    name: String,
    route_key: Option<String>,
}

impl FixedRouter {
    pub fn new(name: impl Into<String>, route_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route_key: Some(route_key.into()),
        }
    }

    /// A router that never determines a route.
    pub fn undetermined(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route_key: None,
        }
    }
}

impl RouterStep for FixedRouter {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide<'a>(
        &'a self,
        _input: &'a Value,
        _ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move { Ok(self.route_key.clone()) })
    }
}

/// Returns a fixed output (or none) and counts its invocations.
pub struct CannedAction {
    name: String,
    output: Option<Value>,
    calls: Arc<AtomicUsize>,
}

impl CannedAction {
    pub fn new(name: impl Into<String>, output: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            output: Some(output.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An action that produces no output.
    pub fn silent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared invocation counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl ActionStep for CannedAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn act<'a>(&'a self, _input: &'a Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        })
    }
}

/// Echoes its input, upper-cased when it is a string.
pub struct ShoutAction;

impl ActionStep for ShoutAction {
    fn name(&self) -> &str {
        "ShoutAction"
    }

    fn act<'a>(&'a self, input: &'a Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move {
            Ok(Some(match input.as_str() {
                Some(s) => Value::from(s.to_uppercase()),
                None => input.clone(),
            }))
        })
    }
}

/// Always fails with a step error.
pub struct FailingAction;

impl ActionStep for FailingAction {
    fn name(&self) -> &str {
        "FailingAction"
    }

    fn act<'a>(&'a self, _input: &'a Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async { Err(SwitchyardError::step("FailingAction", "backend unavailable")) })
    }
}

/// Waits until the context's cancellation token fires, then reports it.
pub struct WaitForCancelAction;

impl ActionStep for WaitForCancelAction {
    fn name(&self) -> &str {
        "WaitForCancelAction"
    }

    fn act<'a>(&'a self, _input: &'a Value, ctx: &'a Context) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move {
            ctx.cancellation().cancelled().await;
            Ok(Some(Value::from("cancelled")))
        })
    }
}

pub fn fake_root_router() -> KeywordRouter {
    KeywordRouter::new("FakeRootRouterStep")
        .rule("hi", "fallback")
        .rule("support", "support")
        .rule("in-season", "business")
        .rule("pre-season", "business")
}

pub fn fake_business_router() -> KeywordRouter {
    KeywordRouter::new("FakeBusinessRouterStep")
        .rule("in-season", "in-season")
        .rule("pre-season", "pre-season")
}

/// Registry with every fake step registered under its name.
pub fn fake_registry() -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.register_router(fake_root_router());
    registry.register_router(fake_business_router());
    registry.register_router(FixedRouter::new("FakeSupportRouterStep", "level-1"));
    registry.register_router(FixedRouter::undetermined("FakeRouterStepWithoutRouteKey"));
    registry.register_action(CannedAction::new("FakeFallbackStep", "How are you?"));
    registry.register_action(CannedAction::new(
        "FakeSupportStep",
        "Hi, how can I help you with support?",
    ));
    registry.register_action(CannedAction::new(
        "FakeFirstLevelSupportStep",
        "Hi, how can I help you with level-1 support?",
    ));
    registry.register_action(CannedAction::new(
        "FakeInSeasonStep",
        "Hi, how can I help you with in-season?",
    ));
    registry.register_action(CannedAction::new(
        "FakePreSeasonStep",
        "Hi, how can I help you with pre-season?",
    ));
    registry.register_action(CannedAction::silent("FakeSilentStep"));
    registry.register_action(ShoutAction);
    registry.register_action(FailingAction);
    registry
}

/// The demo routing tree using the fake step keys.
pub const FAKE_PLAN_JSON: &str = r#"{
  "step": "FakeRootRouterStep",
  "children": [
    {
      "step": "FakeFallbackStep",
      "route_key": "fallback"
    },
    {
      "step": "FakeSupportStep",
      "route_key": "support",
      "children": [
        {
          "step": "FakeFirstLevelSupportStep"
        }
      ]
    },
    {
      "step": "FakeBusinessRouterStep",
      "route_key": "business",
      "children": [
        {
          "step": "FakeInSeasonStep",
          "route_key": "in-season"
        },
        {
          "step": "FakePreSeasonStep",
          "route_key": "pre-season"
        }
      ]
    }
  ]
}"#;

/// Collects every event a run emits.
#[derive(Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<PlanEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PlanEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PlanEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
