use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;

/// Router: decides which child branch a run continues down.
pub trait RouterStep: Send + Sync + 'static {
    /// Stable step name (recorded in the audit trail).
    fn name(&self) -> &str;

    /// Decide a route key for the given input.
    ///
    /// `Ok(None)` (or a blank key) means no route could be determined and
    /// aborts the run.
    fn decide<'a>(
        &'a self,
        input: &'a Value,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<String>>>;
}

/// Action: produces an output value.
pub trait ActionStep: Send + Sync + 'static {
    /// Stable step name (recorded in the audit trail).
    fn name(&self) -> &str;

    /// Produce an output for the given input. `Ok(None)` means no output.
    fn act<'a>(&'a self, input: &'a Value, ctx: &'a Context) -> BoxFuture<'a, Result<Option<Value>>>;
}

/// Which of the two step variants a step is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Router,
    Action,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Router => write!(f, "router"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// A resolved step: either a router or an action.
///
/// Cloning is cheap; the same instance may be shared by many plans and by
/// concurrent runs, so any interior state must synchronize itself.
#[derive(Clone)]
pub enum Step {
    Router(Arc<dyn RouterStep>),
    Action(Arc<dyn ActionStep>),
}

impl Step {
    pub fn router(step: impl RouterStep) -> Self {
        Self::Router(Arc::new(step))
    }

    pub fn action(step: impl ActionStep) -> Self {
        Self::Action(Arc::new(step))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Router(r) => r.name(),
            Self::Action(a) => a.name(),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::Router(_) => StepKind::Router,
            Self::Action(_) => StepKind::Action,
        }
    }

    pub fn is_router(&self) -> bool {
        matches!(self, Self::Router(_))
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Step resolver: looks a step up by its registration key.
pub trait StepResolver: Send + Sync {
    /// Resolve `key`, failing with `UnknownStepKey` if nothing is registered.
    fn resolve(&self, key: &str) -> Result<Step>;
}

impl<F> StepResolver for F
where
    F: Fn(&str) -> Result<Step> + Send + Sync,
{
    fn resolve(&self, key: &str) -> Result<Step> {
        self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwitchyardError;

    struct Always(&'static str);

    impl RouterStep for Always {
        fn name(&self) -> &str {
            "Always"
        }

        fn decide<'a>(
            &'a self,
            _input: &'a Value,
            _ctx: &'a Context,
        ) -> BoxFuture<'a, Result<Option<String>>> {
            Box::pin(async move { Ok(Some(self.0.to_string())) })
        }
    }

    struct Echo;

    impl ActionStep for Echo {
        fn name(&self) -> &str {
            "Echo"
        }

        fn act<'a>(&'a self, input: &'a Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Option<Value>>> {
            Box::pin(async move { Ok(Some(input.clone())) })
        }
    }

    #[test]
    fn step_kind_and_name() {
        let r = Step::router(Always("x"));
        assert!(r.is_router());
        assert_eq!(r.kind(), StepKind::Router);
        assert_eq!(r.name(), "Always");

        let a = Step::action(Echo);
        assert_eq!(a.kind(), StepKind::Action);
        assert_eq!(format!("{:?}", a), r#"Step { name: "Echo", kind: Action }"#);
    }

    #[tokio::test]
    async fn step_invocation() {
        let ctx = Context::new("hello").unwrap();
        let input = serde_json::json!("hello");

        let Step::Router(r) = Step::router(Always("support")) else {
            panic!("expected router");
        };
        assert_eq!(r.decide(&input, &ctx).await.unwrap().as_deref(), Some("support"));

        let Step::Action(a) = Step::action(Echo) else {
            panic!("expected action");
        };
        assert_eq!(a.act(&input, &ctx).await.unwrap(), Some(input.clone()));
    }

    #[test]
    fn closure_resolver() {
        let resolver = |key: &str| -> Result<Step> {
            match key {
                "Echo" => Ok(Step::action(Echo)),
                other => Err(SwitchyardError::UnknownStepKey(other.to_string())),
            }
        };
        assert!(resolver.resolve("Echo").is_ok());
        assert!(matches!(
            resolver.resolve("Nope"),
            Err(SwitchyardError::UnknownStepKey(k)) if k == "Nope"
        ));
    }
}
