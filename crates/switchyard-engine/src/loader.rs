use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, warn};

use switchyard_core::error::{Result, SwitchyardError};
use switchyard_core::traits::{StepKind, StepResolver};

use crate::definition::PlanDefinition;
use crate::plan::{NodeId, Plan, PlanBuilder};

/// Compiles plan definitions into executable plans.
///
/// Loading either returns a complete plan or fails; there is no partially
/// usable result.
pub struct PlanLoader;

impl PlanLoader {
    /// Resolve every node of `definition` and validate the tree structure.
    pub fn load<R>(definition: &PlanDefinition, resolver: &R) -> Result<Plan>
    where
        R: StepResolver + ?Sized,
    {
        if let Some(ref key) = definition.route_key {
            warn!(step = %definition.step, route_key = %key, "Ignoring route key on plan root");
        }

        let mut builder = Plan::builder();
        let root = Self::build(definition, resolver, &mut builder)?;
        let plan = builder.build(root)?;

        debug!(root = %definition.step, nodes = plan.node_count(), "Plan loaded");
        Ok(plan)
    }

    pub fn from_json<R>(json: &str, resolver: &R) -> Result<Plan>
    where
        R: StepResolver + ?Sized,
    {
        Self::load(&PlanDefinition::from_json(json)?, resolver)
    }

    pub fn from_toml<R>(text: &str, resolver: &R) -> Result<Plan>
    where
        R: StepResolver + ?Sized,
    {
        Self::load(&PlanDefinition::from_toml(text)?, resolver)
    }

    /// Load a plan file; `.toml` files are read as TOML, anything else as JSON.
    pub fn from_path<R>(path: &Path, resolver: &R) -> Result<Plan>
    where
        R: StepResolver + ?Sized,
    {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content, resolver),
            _ => Self::from_json(&content, resolver),
        }
    }

    fn build<R>(
        definition: &PlanDefinition,
        resolver: &R,
        builder: &mut PlanBuilder,
    ) -> Result<NodeId>
    where
        R: StepResolver + ?Sized,
    {
        let step = resolver.resolve(&definition.step)?;
        let kind = step.kind();
        let id = builder.add(definition.step.clone(), step);
        let children = definition.children();

        match kind {
            StepKind::Router => {
                if children.is_empty() {
                    return Err(SwitchyardError::RouterMissingChildren(
                        definition.step.clone(),
                    ));
                }

                // Later children replace earlier ones with the same key but
                // keep the first position. Replaced subtrees are never built.
                let mut branches: IndexMap<&str, &PlanDefinition> = IndexMap::new();
                for child in children {
                    let route_key = match child.route_key.as_deref() {
                        Some(key) if !key.trim().is_empty() => key,
                        _ => {
                            return Err(SwitchyardError::ChildMissingRouteKey {
                                parent: definition.step.clone(),
                                child: child.step.clone(),
                            })
                        }
                    };

                    if let Some(replaced) = branches.insert(route_key, child) {
                        warn!(
                            router = %definition.step,
                            route_key = %route_key,
                            replaced = %replaced.step,
                            "Duplicate route key, later branch replaces earlier one"
                        );
                    }
                }

                for (route_key, child) in branches {
                    let child_id = Self::build(child, resolver, builder)?;
                    builder.branch(id, route_key, child_id);
                }
            }
            StepKind::Action => match children {
                [] => {}
                [next] => {
                    if let Some(ref key) = next.route_key {
                        warn!(
                            step = %next.step,
                            route_key = %key,
                            "Ignoring route key on chained step"
                        );
                    }
                    let next_id = Self::build(next, resolver, builder)?;
                    builder.chain(id, next_id);
                }
                _ => {
                    return Err(SwitchyardError::ActionInvalidChildCardinality {
                        step: definition.step.clone(),
                        count: children.len(),
                    })
                }
            },
        }

        Ok(id)
    }
}
