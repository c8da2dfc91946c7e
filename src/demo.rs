//! Built-in demo steps and plan.
//!
//! Keyword routers and canned answers for a small customer-service bot:
//! support questions go through a support router, marketing, billing and
//! season questions through the business router, and everything else gets
//! small talk.

use futures::future::BoxFuture;
use serde_json::Value;

use switchyard_core::context::Context;
use switchyard_core::error::Result;
use switchyard_core::traits::{ActionStep, RouterStep};
use switchyard_engine::StepRegistry;

/// Routes on the first rule whose keywords appear in the input.
struct KeywordRouter {
    name: &'static str,
    rules: &'static [(&'static [&'static str], &'static str)],
    otherwise: Option<&'static str>,
}

impl RouterStep for KeywordRouter {
    fn name(&self) -> &str {
        self.name
    }

    fn decide<'a>(
        &'a self,
        input: &'a Value,
        _ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let text = input.as_str().unwrap_or_default().to_lowercase();
            let key = self
                .rules
                .iter()
                .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
                .map(|(_, key)| *key)
                .or(self.otherwise);
            Ok(key.map(str::to_string))
        })
    }
}

/// Answers with a fixed reply.
struct CannedReply {
    name: &'static str,
    reply: &'static str,
}

impl ActionStep for CannedReply {
    fn name(&self) -> &str {
        self.name
    }

    fn act<'a>(&'a self, _input: &'a Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move { Ok(Some(Value::from(self.reply))) })
    }
}

/// Opens a support conversation, mentioning the earlier turns it saw.
struct SupportStep;

impl ActionStep for SupportStep {
    fn name(&self) -> &str {
        "SupportStep"
    }

    fn act<'a>(&'a self, _input: &'a Value, ctx: &'a Context) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move {
            let reply = match ctx.history().len() {
                0 => "Hi, how can I help you with support?".to_string(),
                n => format!("Hi, how can I help you with support? ({} earlier messages)", n),
            };
            Ok(Some(Value::from(reply)))
        })
    }
}

const ROOT_RULES: &[(&[&str], &str)] = &[
    (&["support", "help"], "support"),
    (&["marketing", "billing", "in-season", "pre-season"], "business"),
];

const BUSINESS_RULES: &[(&[&str], &str)] = &[
    (&["marketing"], "marketing"),
    (&["billing"], "billing"),
    (&["in-season"], "in-season"),
    (&["pre-season"], "pre-season"),
];

/// Registry holding every demo step under its name.
pub fn registry() -> StepRegistry {
    let mut registry = StepRegistry::new();

    registry.register_router(KeywordRouter {
        name: "RootRouterStep",
        rules: ROOT_RULES,
        otherwise: Some("fallback"),
    });
    registry.register_router(KeywordRouter {
        name: "BusinessRouterStep",
        rules: BUSINESS_RULES,
        otherwise: None,
    });
    registry.register_router(KeywordRouter {
        name: "SupportRouterStep",
        rules: &[],
        otherwise: Some("level-1"),
    });

    registry.register_action(SupportStep);
    for (name, reply) in [
        ("FirstLevelSupportStep", "Hi, how can I help you with level-1 support?"),
        ("MarketingStep", "Hi! How can I assist you with marketing?"),
        ("BillingStep", "Hi, how can I assist you with your billing?"),
        ("InSeasonStep", "Hi, how can I help you with in-season?"),
        ("PreSeasonStep", "Hi, how can I help you with pre-season?"),
        ("FallbackStep", "How are you?"),
    ] {
        registry.register_action(CannedReply { name, reply });
    }

    registry
}

/// Plan used when no plan file is configured.
pub const DEFAULT_PLAN_JSON: &str = r#"{
  "step": "RootRouterStep",
  "children": [
    {
      "step": "SupportStep",
      "route_key": "support",
      "children": [
        {
          "step": "SupportRouterStep",
          "children": [
            { "step": "FirstLevelSupportStep", "route_key": "level-1" }
          ]
        }
      ]
    },
    {
      "step": "BusinessRouterStep",
      "route_key": "business",
      "children": [
        { "step": "MarketingStep", "route_key": "marketing" },
        { "step": "BillingStep", "route_key": "billing" },
        { "step": "InSeasonStep", "route_key": "in-season" },
        { "step": "PreSeasonStep", "route_key": "pre-season" }
      ]
    },
    { "step": "FallbackStep", "route_key": "fallback" }
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::event::NullSink;
    use switchyard_engine::{PlanLoader, Runner};

    async fn answer(input: &str) -> Result<(String, Vec<String>)> {
        let plan = PlanLoader::from_json(DEFAULT_PLAN_JSON, &registry())?;
        let mut ctx = Context::new(input)?;
        Runner::new().execute(&mut ctx, &plan, &NullSink).await?;
        let steps = ctx.records().iter().map(|r| r.step_name().to_string()).collect();
        Ok((ctx.output_as::<String>()?.unwrap_or_default(), steps))
    }

    #[test]
    fn default_plan_loads() {
        let plan = PlanLoader::from_json(DEFAULT_PLAN_JSON, &registry()).unwrap();
        assert_eq!(plan.node_count(), 10);
        assert_eq!(plan.root().key(), "RootRouterStep");
    }

    #[test]
    fn every_step_is_registered() {
        assert_eq!(registry().len(), 10);
    }

    #[tokio::test]
    async fn support_goes_to_first_level() {
        let (output, steps) = answer("I need support").await.unwrap();
        assert_eq!(output, "Hi, how can I help you with level-1 support?");
        assert_eq!(
            steps,
            ["RootRouterStep", "SupportStep", "SupportRouterStep", "FirstLevelSupportStep"]
        );
    }

    #[tokio::test]
    async fn business_questions() {
        let (output, _) = answer("A billing question").await.unwrap();
        assert_eq!(output, "Hi, how can I assist you with your billing?");

        let (output, steps) = answer("What about PRE-SEASON?").await.unwrap();
        assert_eq!(output, "Hi, how can I help you with pre-season?");
        assert_eq!(steps[1], "BusinessRouterStep");
    }

    #[tokio::test]
    async fn anything_else_is_small_talk() {
        let (output, steps) = answer("hello there").await.unwrap();
        assert_eq!(output, "How are you?");
        assert_eq!(steps, ["RootRouterStep", "FallbackStep"]);
    }
}
