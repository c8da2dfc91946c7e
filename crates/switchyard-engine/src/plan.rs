use std::collections::HashMap;

use indexmap::IndexMap;

use switchyard_core::error::{Result, SwitchyardError};
use switchyard_core::traits::Step;

use crate::definition::PlanDefinition;

/// Identifier of a node within one plan, assigned at build time.
///
/// The same step may appear at several places in a tree, so the lookup
/// tables are keyed by node rather than by step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved step at a position in the plan.
#[derive(Debug, Clone)]
pub struct PlanNode {
    id: NodeId,
    key: String,
    step: Step,
}

impl PlanNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The resolver key the step was loaded from.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn step(&self) -> &Step {
        &self.step
    }
}

/// Compiled, immutable routing tree.
///
/// `branches` maps each router node to its route-key table, `chain` maps an
/// action node to the node that follows it unconditionally. A plan is
/// read-only once built and can be shared by concurrent runs.
#[derive(Debug, Clone)]
pub struct Plan {
    nodes: Vec<PlanNode>,
    root: NodeId,
    branches: HashMap<NodeId, IndexMap<String, NodeId>>,
    chain: HashMap<NodeId, NodeId>,
}

impl Plan {
    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    pub fn root(&self) -> &PlanNode {
        &self.nodes[self.root.0]
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&PlanNode> {
        self.nodes.get(id.0)
    }

    /// Route-key table of a router node.
    pub fn branches(&self, id: NodeId) -> Option<&IndexMap<String, NodeId>> {
        self.branches.get(&id)
    }

    /// The node a router continues to for `route_key`.
    pub fn branch(&self, id: NodeId, route_key: &str) -> Option<NodeId> {
        self.branches.get(&id)?.get(route_key).copied()
    }

    /// The node chained after an action.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.chain.get(&id).copied()
    }

    /// First node (in load order, root first) whose key is `key`.
    pub fn find(&self, key: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serialize back into a definition: a router emits its branches with
    /// their route keys, an action emits its chained successor without one.
    pub fn to_definition(&self) -> PlanDefinition {
        self.definition_of(self.root, None)
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_definition().to_json()
    }

    fn definition_of(&self, id: NodeId, route_key: Option<&str>) -> PlanDefinition {
        let node = &self.nodes[id.0];
        let children = if let Some(branches) = self.branches.get(&id) {
            Some(
                branches
                    .iter()
                    .map(|(key, child)| self.definition_of(*child, Some(key)))
                    .collect::<Vec<_>>(),
            )
        } else {
            self.chain
                .get(&id)
                .map(|next| vec![self.definition_of(*next, None)])
        };

        PlanDefinition {
            step: node.key.clone(),
            route_key: route_key.map(str::to_string),
            children: children.filter(|c| !c.is_empty()),
        }
    }
}

/// Assembles a [`Plan`] node by node.
///
/// Only node ids are checked here: `build` rejects a root, branch or chain
/// target the builder never issued. Step-level rules (routers need
/// branches, actions chain at most once) are left to `PlanLoader`.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    nodes: Vec<PlanNode>,
    branches: HashMap<NodeId, IndexMap<String, NodeId>>,
    chain: HashMap<NodeId, NodeId>,
}

impl PlanBuilder {
    /// Add a step under an explicit resolver key.
    pub fn add(&mut self, key: impl Into<String>, step: Step) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(PlanNode {
            id,
            key: key.into(),
            step,
        });
        id
    }

    /// Add a step keyed by its own name.
    pub fn add_step(&mut self, step: Step) -> NodeId {
        let key = step.name().to_string();
        self.add(key, step)
    }

    /// Register `child` under `route_key` for `router`. Returns the child
    /// previously registered under that key, if any.
    pub fn branch(
        &mut self,
        router: NodeId,
        route_key: impl Into<String>,
        child: NodeId,
    ) -> Option<NodeId> {
        self.branches
            .entry(router)
            .or_default()
            .insert(route_key.into(), child)
    }

    /// Chain `next` after `action`, replacing any previous successor.
    pub fn chain(&mut self, action: NodeId, next: NodeId) -> &mut Self {
        self.chain.insert(action, next);
        self
    }

    /// Finish the plan rooted at `root`.
    ///
    /// Fails with `DanglingNode` if `root` or any branch or chain target is
    /// not a node of this builder.
    pub fn build(self, root: NodeId) -> Result<Plan> {
        let known = |id: &NodeId| id.0 < self.nodes.len();
        let targets = self
            .branches
            .iter()
            .flat_map(|(router, table)| std::iter::once(router).chain(table.values()))
            .chain(self.chain.iter().flat_map(|(from, to)| [from, to]));

        if let Some(id) = std::iter::once(&root).chain(targets).find(|id| !known(id)) {
            return Err(SwitchyardError::DanglingNode(id.to_string()));
        }

        Ok(Plan {
            nodes: self.nodes,
            root,
            branches: self.branches,
            chain: self.chain,
        })
    }
}
