use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwitchyardError {
    // Plan load errors
    #[error("No step registered for key: {0}")]
    UnknownStepKey(String),

    #[error("Router step {0} is missing children")]
    RouterMissingChildren(String),

    #[error("Child {child} missing route key for parent {parent}")]
    ChildMissingRouteKey { parent: String, child: String },

    #[error("Action step {step} can chain to at most one step, found {count} children")]
    ActionInvalidChildCardinality { step: String, count: usize },

    #[error("Plan definition parse error: {0}")]
    PlanParse(String),

    #[error("Plan references node {0}, which it does not contain")]
    DanglingNode(String),

    // Run errors
    #[error("{0} could not determine a valid route key")]
    UndeterminedRoute(String),

    #[error("Router {0} has no registered children")]
    RouterHasNoBranches(String),

    #[error("Route key '{route_key}' not found for router '{router}'")]
    UnmatchedRouteKey { router: String, route_key: String },

    #[error("Step {step} failed: {message}")]
    Step { step: String, message: String },

    // Context errors
    #[error("Context input must not be empty")]
    EmptyInput,

    #[error("Expected value of type '{expected}', but was '{actual}'")]
    ValueType { expected: String, actual: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SwitchyardError {
    /// Wrap a step implementation's own failure.
    pub fn step(step: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Step {
            step: step.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error was raised while compiling a plan definition.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownStepKey(_)
                | Self::RouterMissingChildren(_)
                | Self::ChildMissingRouteKey { .. }
                | Self::ActionInvalidChildCardinality { .. }
                | Self::PlanParse(_)
                | Self::DanglingNode(_)
        )
    }

    /// Whether the error was raised by the interpreter's routing checks.
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            Self::UndeterminedRoute(_)
                | Self::RouterHasNoBranches(_)
                | Self::UnmatchedRouteKey { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SwitchyardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_step() {
        let err = SwitchyardError::UnmatchedRouteKey {
            router: "RootRouterStep".into(),
            route_key: "support".into(),
        };
        assert_eq!(
            err.to_string(),
            "Route key 'support' not found for router 'RootRouterStep'"
        );

        let err = SwitchyardError::RouterHasNoBranches("RootRouterStep".into());
        assert_eq!(err.to_string(), "Router RootRouterStep has no registered children");
    }

    #[test]
    fn classification() {
        assert!(SwitchyardError::UnknownStepKey("x".into()).is_load_error());
        assert!(!SwitchyardError::UnknownStepKey("x".into()).is_routing_error());
        assert!(SwitchyardError::UndeterminedRoute("r".into()).is_routing_error());
        assert!(!SwitchyardError::step("a", "boom").is_load_error());
        assert!(SwitchyardError::DanglingNode("#4".into()).is_load_error());
    }
}
