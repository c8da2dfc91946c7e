use std::io::Write;

use switchyard_core::error::SwitchyardError;
use switchyard_core::traits::StepKind;
use switchyard_engine::{PlanDefinition, PlanLoader};
use switchyard_test_utils::{fake_registry, FAKE_PLAN_JSON};

#[test]
fn load_plan_from_json_round_trips() {
    let registry = fake_registry();
    let plan = PlanLoader::from_json(FAKE_PLAN_JSON, &registry).expect("load plan");

    assert_eq!(plan.node_count(), 7);
    assert_eq!(plan.root().key(), "FakeRootRouterStep");

    let source = PlanDefinition::from_json(FAKE_PLAN_JSON).unwrap();
    assert!(plan.to_definition().is_equivalent(&source));
    assert_eq!(plan.to_json().unwrap(), FAKE_PLAN_JSON);
}

#[test]
fn round_trip_of_chains_and_nested_routers() {
    let registry = fake_registry();
    let definitions = vec![
        PlanDefinition::new("FakeFallbackStep"),
        PlanDefinition::new("FakeSupportStep")
            .with_child(PlanDefinition::new("ShoutAction").with_child(PlanDefinition::new("FakeSilentStep"))),
        PlanDefinition::new("FakeSupportStep").with_child(
            PlanDefinition::new("FakeBusinessRouterStep")
                .with_child(PlanDefinition::new("FakeInSeasonStep").with_route("in-season"))
                .with_child(
                    PlanDefinition::new("FakeSupportRouterStep")
                        .with_route("pre-season")
                        .with_child(PlanDefinition::new("FakeFirstLevelSupportStep").with_route("level-1")),
                ),
        ),
    ];

    for def in definitions {
        let plan = PlanLoader::load(&def, &registry).expect("load plan");
        assert_eq!(plan.to_definition(), def);
        assert_eq!(plan.node_count(), def.node_count());
    }
}

#[test]
fn accepts_pascal_case_property_names() {
    let json = r#"{
        "ServiceKey": "FakeRootRouterStep",
        "Children": [
            { "ServiceKey": "FakeFallbackStep", "RouteKey": "fallback" }
        ]
    }"#;
    let plan = PlanLoader::from_json(json, &fake_registry()).expect("load plan");
    let root = plan.root_id();
    let child = plan.branch(root, "fallback").expect("fallback branch");
    assert_eq!(plan.node(child).unwrap().key(), "FakeFallbackStep");
}

#[test]
fn unknown_step_key_fails() {
    let def = PlanDefinition::new("FakeRootRouterStep")
        .with_child(PlanDefinition::new("NoSuchStep").with_route("fallback"));
    let err = PlanLoader::load(&def, &fake_registry()).unwrap_err();
    assert!(matches!(err, SwitchyardError::UnknownStepKey(ref k) if k == "NoSuchStep"));
    assert!(err.is_load_error());
}

#[test]
fn router_without_children_fails() {
    let registry = fake_registry();

    let err = PlanLoader::load(&PlanDefinition::new("FakeRootRouterStep"), &registry).unwrap_err();
    assert!(matches!(err, SwitchyardError::RouterMissingChildren(ref k) if k == "FakeRootRouterStep"));

    let mut empty = PlanDefinition::new("FakeRootRouterStep");
    empty.children = Some(vec![]);
    let err = PlanLoader::load(&empty, &registry).unwrap_err();
    assert!(matches!(err, SwitchyardError::RouterMissingChildren(_)));
}

#[test]
fn nested_router_without_children_fails() {
    let def = PlanDefinition::new("FakeRootRouterStep")
        .with_child(PlanDefinition::new("FakeFallbackStep").with_route("fallback"))
        .with_child(PlanDefinition::new("FakeBusinessRouterStep").with_route("business"));
    let err = PlanLoader::load(&def, &fake_registry()).unwrap_err();
    assert!(matches!(err, SwitchyardError::RouterMissingChildren(ref k) if k == "FakeBusinessRouterStep"));
}

#[test]
fn router_child_without_route_key_fails() {
    let registry = fake_registry();

    let def = PlanDefinition::new("FakeRootRouterStep").with_child(PlanDefinition::new("FakeFallbackStep"));
    let err = PlanLoader::load(&def, &registry).unwrap_err();
    assert!(matches!(
        err,
        SwitchyardError::ChildMissingRouteKey { ref parent, ref child }
            if parent == "FakeRootRouterStep" && child == "FakeFallbackStep"
    ));

    let def = PlanDefinition::new("FakeRootRouterStep")
        .with_child(PlanDefinition::new("FakeFallbackStep").with_route("   "));
    assert!(matches!(
        PlanLoader::load(&def, &registry),
        Err(SwitchyardError::ChildMissingRouteKey { .. })
    ));
}

#[test]
fn action_with_two_children_fails() {
    let def = PlanDefinition::new("FakeSupportStep")
        .with_child(PlanDefinition::new("FakeFallbackStep"))
        .with_child(PlanDefinition::new("ShoutAction"));
    let err = PlanLoader::load(&def, &fake_registry()).unwrap_err();
    assert!(matches!(
        err,
        SwitchyardError::ActionInvalidChildCardinality { ref step, count: 2 } if step == "FakeSupportStep"
    ));
}

#[test]
fn action_with_one_child_chains() {
    let def = PlanDefinition::new("FakeSupportStep").with_child(PlanDefinition::new("FakeFirstLevelSupportStep"));
    let plan = PlanLoader::load(&def, &fake_registry()).expect("load plan");

    let root = plan.root_id();
    assert_eq!(plan.root().step().kind(), StepKind::Action);
    assert!(plan.branches(root).is_none());
    let next = plan.next(root).expect("chained step");
    assert_eq!(plan.node(next).unwrap().key(), "FakeFirstLevelSupportStep");
}

#[test]
fn route_key_on_chained_child_is_dropped() {
    let def = PlanDefinition::new("FakeSupportStep")
        .with_child(PlanDefinition::new("FakeFirstLevelSupportStep").with_route("ignored"));
    let plan = PlanLoader::load(&def, &fake_registry()).expect("load plan");
    assert_eq!(
        plan.to_definition(),
        PlanDefinition::new("FakeSupportStep").with_child(PlanDefinition::new("FakeFirstLevelSupportStep"))
    );
}

#[test]
fn same_step_at_two_positions_gets_two_nodes() {
    let def = PlanDefinition::new("FakeRootRouterStep")
        .with_child(PlanDefinition::new("FakeFallbackStep").with_route("fallback"))
        .with_child(PlanDefinition::new("FakeFallbackStep").with_route("support"));
    let plan = PlanLoader::load(&def, &fake_registry()).expect("load plan");

    let root = plan.root_id();
    let a = plan.branch(root, "fallback").unwrap();
    let b = plan.branch(root, "support").unwrap();
    assert_ne!(a, b);
    assert_eq!(plan.find("FakeFallbackStep").unwrap().id(), a);
}

#[test]
fn duplicate_route_key_keeps_only_the_later_child() {
    let def = PlanDefinition::new("FakeRootRouterStep")
        .with_child(PlanDefinition::new("FakeFallbackStep").with_route("k"))
        .with_child(PlanDefinition::new("FakeInSeasonStep").with_route("other"))
        .with_child(PlanDefinition::new("FakeSupportStep").with_route("k"));
    let plan = PlanLoader::load(&def, &fake_registry()).expect("load plan");

    let root = plan.root_id();
    let k = plan.branch(root, "k").unwrap();
    assert_eq!(plan.node(k).unwrap().key(), "FakeSupportStep");
    let keys: Vec<&str> = plan.branches(root).unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["k", "other"]);

    assert_eq!(plan.node_count(), 3);
    assert_eq!(plan.node_count(), plan.to_definition().node_count());
    assert!(plan.find("FakeFallbackStep").is_none());
}

#[test]
fn load_from_toml_file() {
    let toml_content = r#"
step = "FakeRootRouterStep"

[[children]]
step = "FakeFallbackStep"
route_key = "fallback"

[[children]]
step = "FakeSupportStep"
route_key = "support"

[[children.children]]
step = "FakeFirstLevelSupportStep"
"#;

    let mut tmp = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let plan = PlanLoader::from_path(tmp.path(), &fake_registry()).expect("load plan");
    assert_eq!(plan.node_count(), 4);
    let support = plan.branch(plan.root_id(), "support").unwrap();
    assert!(plan.next(support).is_some());
}

#[test]
fn load_from_json_file() {
    let mut tmp = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("create temp file");
    tmp.write_all(FAKE_PLAN_JSON.as_bytes()).expect("write json");

    let plan = PlanLoader::from_path(tmp.path(), &fake_registry()).expect("load plan");
    assert_eq!(plan.node_count(), 7);
}

#[test]
fn missing_file_is_io_error() {
    let err = PlanLoader::from_path(std::path::Path::new("/nonexistent/plan.json"), &fake_registry()).unwrap_err();
    assert!(matches!(err, SwitchyardError::Io(_)));
}
