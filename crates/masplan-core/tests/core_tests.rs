//! Tests for masplan-core: aliases, tuples, atoms, registry and errors

use masplan_core::*;
use serde_json::{json, Map, Value};

fn id(n: u32) -> InstanceId {
    InstanceId::new(n).unwrap()
}

// ===========================================================================
// TypeAlias
// ===========================================================================

#[test]
fn alias_from_str_and_string_agree() {
    let a: TypeAlias = "topic".into();
    let b: TypeAlias = String::from("topic").into();
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "topic");
    assert_eq!(format!("{}", a), "topic");
}

#[test]
fn alias_serializes_as_plain_string() {
    let a = TypeAlias::new("sentence");
    assert_eq!(serde_json::to_string(&a).unwrap(), r#""sentence""#);
    let back: TypeAlias = serde_json::from_str(r#""sentence""#).unwrap();
    assert_eq!(back, a);
}

// ===========================================================================
// ResourceTuple
// ===========================================================================

#[test]
fn tuple_generalizes_to_wildcard() {
    let t = ResourceTuple::concrete("topic", id(7));
    assert_eq!(t.to_string(), "topic_7");
    assert_eq!(t.raw_id(), 7);
    let g = t.generalize();
    assert!(g.is_wildcard());
    assert_eq!(g.raw_id(), 0);
    assert_eq!(g.to_string(), "topic_0");
    assert_eq!(g.generalize(), g);
}

#[test]
fn tuples_are_hashable_keys() {
    use std::collections::HashSet;
    let mut set = HashSet::new();
    set.insert(ResourceTuple::concrete("topic", id(1)));
    set.insert(ResourceTuple::concrete("topic", id(1)));
    set.insert(ResourceTuple::wildcard("topic"));
    assert_eq!(set.len(), 2);
}

#[test]
fn instance_id_parse_reports_context() {
    let err = InstanceId::parse(0, "output sentence").unwrap_err();
    assert!(err.to_string().contains("output sentence"));
    assert_eq!(InstanceId::parse(3, "x").unwrap().get(), 3);
}

// ===========================================================================
// Atom
// ===========================================================================

#[test]
fn atom_subject_for_every_shape() {
    let r = ResourceTuple::concrete("recipe", id(2));
    assert_eq!(Atom::resource(r.clone()).subject(), &r);
    assert_eq!(Atom::property("title", r.clone()).subject(), &r);
    assert_eq!(Atom::AllDependencies(r.clone()).subject(), &r);
    assert!(Atom::property("title", r.clone()).as_resource().is_none());
    assert_eq!(Atom::from(r.clone()).as_resource(), Some(&r));
}

#[test]
fn atom_serializes_with_kind_tag() {
    let atom = Atom::property("title", ResourceTuple::concrete("recipe", id(2)));
    let v = serde_json::to_value(&atom).unwrap();
    assert_eq!(v["kind"], "property");
    assert_eq!(v["predicate"], "title");
}

// ===========================================================================
// Resource
// ===========================================================================

#[test]
fn resource_json_shape() {
    let r = Resource::new("topic").with("topic", "cats");
    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v, json!({"ty": "topic", "fields": {"topic": "cats"}}));
}

#[test]
fn annotate_later_fields_win() {
    let mut r = Resource::new("recipe").with("title", "draft");
    r.annotate(Resource::new("recipe").with("title", "final"));
    assert_eq!(r.get_str("title"), Some("final"));
}

// ===========================================================================
// ResourceRegistry
// ===========================================================================

fn registry() -> ResourceRegistry {
    let mut reg = ResourceRegistry::new();
    reg.register(
        "topic",
        ResourceType::new("Topic").with_field("topic"),
    )
    .unwrap();
    reg.register("sentence", ResourceType::new("Sentence")).unwrap();
    reg.register("recipe", ResourceType::new("Recipe")).unwrap();
    reg
}

#[test]
fn entries_follow_registration_order() {
    let reg = registry();
    let aliases: Vec<&str> = reg.entries().map(|(a, _)| a.as_str()).collect();
    assert_eq!(aliases, vec!["topic", "sentence", "recipe"]);
    assert_eq!(reg.len(), 3);
    assert!(!reg.is_empty());
}

#[test]
fn instantiate_checks_declared_fields() {
    let reg = registry();
    let mut args = Map::new();
    args.insert("subject".into(), Value::from("cats"));
    let err = reg.instantiate("topic", &args).unwrap_err();
    assert!(matches!(err, Error::InvalidArguments { ref alias, .. } if alias == "topic"));

    args.insert("topic".into(), Value::from("cats"));
    let r = reg.instantiate("topic", &args).unwrap();
    assert_eq!(r.ty.as_str(), "topic");
    assert_eq!(r.get_str("subject"), Some("cats"));
}

#[test]
fn instantiate_unknown_alias() {
    let reg = registry();
    assert!(matches!(
        reg.instantiate("poem", &Map::new()),
        Err(Error::UnknownAlias(_))
    ));
}

#[test]
fn atom_for_matches_tuple_display() {
    let reg = registry();
    let t = ResourceTuple::concrete("recipe", id(12));
    assert_eq!(reg.atom_for(&t), "recipe_12");
    assert_eq!(reg.atom_for(&t.generalize()), "recipe_0");
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn cyclic_dependency_message_joins_path() {
    let err = Error::CyclicDependency {
        path: vec!["a_1".into(), "b_1".into(), "a_1".into()],
    };
    assert_eq!(err.to_string(), "cyclic dependency: a_1 -> b_1 -> a_1");
    assert!(err.is_resolution_error());
    assert!(!err.is_compile_error());
}

#[test]
fn task_execution_keeps_source() {
    use std::error::Error as _;
    let err = Error::task_execution("WriteSentence", "rate limited");
    assert!(err.to_string().contains("WriteSentence"));
    assert_eq!(err.source().unwrap().to_string(), "rate limited");
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: Error = io.into();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn compile_errors_are_classified() {
    assert!(Error::unresolved_alias("poem", "output").is_compile_error());
    assert!(Error::reserved_id("input topic").is_compile_error());
    assert!(!Error::EmptyPlan.is_compile_error());
}
