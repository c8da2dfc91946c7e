use serde::{Deserialize, Serialize};

use switchyard_core::error::{Result, SwitchyardError};

/// Declarative plan node, as written in a plan file.
///
/// `route_key` is required when the parent is a router and absent otherwise;
/// `children` are either a router's branches or an action's single chained
/// successor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDefinition {
    /// Resolver key of the step.
    #[serde(alias = "ServiceKey", alias = "serviceKey", alias = "service_key")]
    pub step: String,
    #[serde(
        default,
        alias = "RouteKey",
        alias = "routeKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub route_key: Option<String>,
    #[serde(default, alias = "Children", skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<PlanDefinition>>,
}

impl PlanDefinition {
    pub fn new(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            route_key: None,
            children: None,
        }
    }

    /// Set the route key under which the parent router reaches this node.
    pub fn with_route(mut self, route_key: impl Into<String>) -> Self {
        self.route_key = Some(route_key.into());
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: PlanDefinition) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn children(&self) -> &[PlanDefinition] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Structural equality: same step keys, route keys and shape.
    /// A missing `children` list equals an empty one.
    pub fn is_equivalent(&self, other: &PlanDefinition) -> bool {
        self.step == other.step
            && self.route_key == other.route_key
            && self.children().len() == other.children().len()
            && self
                .children()
                .iter()
                .zip(other.children())
                .all(|(a, b)| a.is_equivalent(b))
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Self::node_count).sum::<usize>()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SwitchyardError::PlanParse(e.to_string()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SwitchyardError::PlanParse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SwitchyardError::PlanParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pascal_case_keys() {
        let json = r#"{
            "ServiceKey": "RootRouterStep",
            "Children": [
                { "ServiceKey": "FallbackStep", "RouteKey": "fallback" }
            ]
        }"#;
        let def = PlanDefinition::from_json(json).unwrap();
        assert_eq!(def.step, "RootRouterStep");
        assert_eq!(def.children().len(), 1);
        assert_eq!(def.children()[0].route_key.as_deref(), Some("fallback"));
    }

    #[test]
    fn serializes_without_empty_fields() {
        let def = PlanDefinition::new("FallbackStep");
        assert_eq!(
            serde_json::to_string(&def).unwrap(),
            r#"{"step":"FallbackStep"}"#
        );
    }

    #[test]
    fn parses_toml_tree() {
        let text = r#"
step = "RootRouterStep"

[[children]]
step = "SupportStep"
route_key = "support"

[[children.children]]
step = "FirstLevelSupportStep"
"#;
        let def = PlanDefinition::from_toml(text).unwrap();
        let expected = PlanDefinition::new("RootRouterStep").with_child(
            PlanDefinition::new("SupportStep")
                .with_route("support")
                .with_child(PlanDefinition::new("FirstLevelSupportStep")),
        );
        assert_eq!(def, expected);
        assert_eq!(def.node_count(), 3);
    }

    #[test]
    fn empty_children_equivalent_to_none() {
        let a = PlanDefinition::new("A");
        let mut b = PlanDefinition::new("A");
        b.children = Some(vec![]);
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&PlanDefinition::new("A").with_route("x")));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            PlanDefinition::from_json(r#"{"children": []}"#),
            Err(SwitchyardError::PlanParse(_))
        ));
    }
}
