use std::collections::HashMap;

use switchyard_core::error::{Result, SwitchyardError};
use switchyard_core::traits::{ActionStep, RouterStep, Step, StepResolver};

/// Registry of available steps, keyed by registration key.
pub struct StepRegistry {
    steps: HashMap<String, Step>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }

    /// Register a step under its own name.
    pub fn register(&mut self, step: Step) {
        let name = step.name().to_string();
        self.steps.insert(name, step);
    }

    /// Register a step under an explicit key.
    pub fn register_as(&mut self, key: impl Into<String>, step: Step) {
        self.steps.insert(key.into(), step);
    }

    pub fn register_router(&mut self, router: impl RouterStep) {
        self.register(Step::router(router));
    }

    pub fn register_action(&mut self, action: impl ActionStep) {
        self.register(Step::action(action));
    }

    /// Unregister a step by key.
    pub fn unregister(&mut self, key: &str) -> bool {
        self.steps.remove(key).is_some()
    }

    /// Get a step by key.
    pub fn get(&self, key: &str) -> Option<Step> {
        self.steps.get(key).cloned()
    }

    /// List all registration keys, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.steps.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StepResolver for StepRegistry {
    fn resolve(&self, key: &str) -> Result<Step> {
        self.get(key)
            .ok_or_else(|| SwitchyardError::UnknownStepKey(key.to_string()))
    }
}
