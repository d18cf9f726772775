//! End-to-end tests for masplan-planner: compile, resolve, linearize, execute

use masplan_core::{Error, Resource, ResourceRegistry, ResourceType};
use masplan_planner::*;
use serde_json::{Map, Value};

fn registry() -> ResourceRegistry {
    let mut reg = ResourceRegistry::new();
    reg.register("topic", ResourceType::new("Topic").with_field("topic"))
        .unwrap();
    reg.register("sentence", ResourceType::new("Sentence")).unwrap();
    reg.register("paragraph", ResourceType::new("Paragraph")).unwrap();
    reg.register("recipe", ResourceType::new("Recipe")).unwrap();
    reg.register("image", ResourceType::new("Image")).unwrap();
    reg.register("left", ResourceType::new("Left")).unwrap();
    reg.register("right", ResourceType::new("Right")).unwrap();
    reg
}

fn catalog() -> Catalog {
    let mut c = Catalog::new();
    c.register_task(Task::new("WriteSentence", "topic", "sentence", |r: &Resource| {
        let topic = r.get_str("topic").unwrap_or("nothing");
        Ok(Resource::new("sentence").with("text", format!("{} are wonderful.", topic)))
    }))
    .unwrap();
    c.register_task(Task::new("Expand", "sentence", "paragraph", |r: &Resource| {
        let text = r.get_str("text").unwrap_or_default();
        Ok(Resource::new("paragraph").with("text", format!("{} {}", text, text)))
    }))
    .unwrap();
    c.register_descriptor(
        "title",
        Task::new("NameDish", "topic", "recipe", |r: &Resource| {
            let topic = r.get_str("topic").unwrap_or_default();
            Ok(Resource::new("recipe").with("title", format!("{} soup", topic)))
        }),
    )
    .unwrap();
    c.register_descriptor(
        "ingredients",
        Task::new("ListIngredients", "topic", "recipe", |r: &Resource| {
            let topic = r.get_str("topic").unwrap_or_default();
            Ok(Resource::new("recipe").with("ingredients", Value::from(vec![topic, "water"])))
        }),
    )
    .unwrap();
    c.register_descriptor(
        "mirror_left",
        Task::new("MirrorLeft", "right", "left", |_: &Resource| Ok(Resource::new("left"))),
    )
    .unwrap();
    c.register_descriptor(
        "mirror_right",
        Task::new("MirrorRight", "left", "right", |_: &Resource| Ok(Resource::new("right"))),
    )
    .unwrap();
    c
}

fn planner() -> Planner {
    Planner::new(registry(), catalog())
}

fn args(topic: &str) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("topic".into(), topic.into());
    m
}

fn cats_to(output: &str) -> MasQuery {
    MasQuery::default()
        .with_input("topic", 1, args("cats"))
        .with_output(output, 1)
}

fn recipe_query(descriptors: &[&str]) -> MasQuery {
    let mut recipe = ResourceSpec::new(2).depends_on("topic", 1);
    for name in descriptors {
        recipe = recipe.describe(name, &[("source", "topic", 1)]);
    }
    MasQuery::default()
        .with_input("topic", 1, args("leek"))
        .with_resource("recipe", recipe)
        .with_output("recipe", 2)
}

// ===========================================================================
// Wildcard fallback
// ===========================================================================

#[test]
fn sentence_from_topic_is_one_step() {
    let solution = planner().solve(&cats_to("sentence")).unwrap();
    let plan = &solution.plan;
    assert_eq!(plan.task_names(), vec!["WriteSentence"]);
    assert_eq!(plan.input_type().as_str(), "topic");
    assert_eq!(plan.output_type().as_str(), "sentence");
    assert_eq!(plan.steps[0].to_string(), "WriteSentence: topic_1 -> sentence_0");

    let out = plan
        .execute_seeded(solution.clauses.seed())
        .unwrap();
    assert_eq!(out.get_str("text"), Some("cats are wonderful."));
}

#[test]
fn proof_goes_through_generalized_input() {
    let solution = planner().solve(&cats_to("sentence")).unwrap();
    let (output, tree) = &solution.derivations[0];
    assert_eq!(output.to_string(), "sentence_1");
    assert_eq!(
        tree.render(),
        "sentence_1 [assignment]\n  sentence_0 [task]\n    topic_0 [generalization]\n      topic_1 [input]\n"
    );
}

#[test]
fn chained_tasks_run_in_dependency_order() {
    let solution = planner().solve(&cats_to("paragraph")).unwrap();
    assert_eq!(solution.plan.task_names(), vec!["WriteSentence", "Expand"]);
    let out = solution
        .plan
        .execute(Resource::new("topic").with("topic", "owls"))
        .unwrap();
    assert_eq!(out.ty.as_str(), "paragraph");
    assert_eq!(
        out.get_str("text"),
        Some("owls are wonderful. owls are wonderful.")
    );
}

#[test]
fn shared_subproofs_contribute_one_step() {
    let doc = cats_to("sentence").with_output("paragraph", 1);
    let plan = planner().solve(&doc).unwrap().plan;
    assert_eq!(plan.task_names(), vec!["WriteSentence", "Expand"]);
    assert_eq!(plan.output_type().as_str(), "paragraph");
}

// ===========================================================================
// Soundness and determinism
// ===========================================================================

#[test]
fn resolved_plans_verify() {
    let p = planner();
    for doc in [cats_to("sentence"), cats_to("paragraph"), recipe_query(&["title"])] {
        let plan = p.solve(&doc).unwrap().plan;
        plan.verify(plan.input_type()).unwrap();
    }
}

#[test]
fn resolve_matches_solve() {
    let p = planner();
    let doc = cats_to("paragraph");
    let db = p.compile(&doc).unwrap();
    let plan = p.resolve(&db).unwrap();
    assert_eq!(plan.task_names(), p.solve(&doc).unwrap().plan.task_names());
    assert_eq!(plan.to_string(), p.solve(&doc).unwrap().plan.to_string());
}

#[test]
fn solving_twice_gives_the_same_plan() {
    let p = planner();
    let doc = recipe_query(&["title", "ingredients"]);
    let a = p.solve(&doc).unwrap();
    let b = p.solve(&doc).unwrap();
    assert_eq!(a.plan.task_names(), b.plan.task_names());
    assert_eq!(a.derivations[0].1.render(), b.derivations[0].1.render());
}

#[test]
fn compiling_twice_gives_the_same_clauses() {
    let p = planner();
    let doc = recipe_query(&["title", "ingredients"]);
    let a = p.compile(&doc).unwrap();
    let b = p.compile(&doc).unwrap();
    assert_eq!(a.clause_set(), b.clause_set());
    assert_eq!(a.to_program(), b.to_program());
}

// ===========================================================================
// Descriptors and all_dependencies
// ===========================================================================

#[test]
fn descriptors_annotate_one_recipe() {
    let solution = planner().solve(&recipe_query(&["title", "ingredients"])).unwrap();
    let set = solution.clauses.clause_set();
    assert!(set.contains("title(recipe_2) :- topic_1."));
    assert!(set.contains(
        "all_dependencies(recipe_2) :- title(recipe_2), ingredients(recipe_2), topic_1."
    ));
    assert!(set.contains("recipe_2 :- all_dependencies(recipe_2)."));

    assert_eq!(solution.plan.task_names(), vec!["NameDish", "ListIngredients"]);
    let out = solution
        .plan
        .execute_seeded(solution.clauses.seed())
        .unwrap();
    assert_eq!(out.get_str("title"), Some("leek soup"));
    assert_eq!(out.get("ingredients").and_then(|v| v.as_array()).map(|a| a.len()), Some(2));
}

#[test]
fn descriptors_read_the_instance_they_name() {
    let recipe = ResourceSpec::new(3)
        .describe("title", &[("source", "topic", 2)])
        .describe("ingredients", &[("source", "topic", 1)]);
    let doc = MasQuery::default()
        .with_input("topic", 1, args("cats"))
        .with_input("topic", 2, args("dogs"))
        .with_resource("recipe", recipe)
        .with_output("recipe", 3);
    let (report, result) = planner().run(&doc, "two-topics").unwrap();
    let out = result.unwrap();
    assert_eq!(out.get_str("title"), Some("dogs soup"));
    let ingredients: Vec<&str> = out
        .get("ingredients")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ingredients, vec!["cats", "water"]);
    assert_eq!(report.steps[0].binding, "NameDish [title]: topic_2 -> recipe_3");
    assert_eq!(report.steps[1].binding, "ListIngredients [ingredients]: topic_1 -> recipe_3");
}

#[test]
fn unknown_descriptor_makes_resource_unprovable() {
    let p = planner();
    assert!(p.solve(&recipe_query(&["title"])).is_ok());

    let err = p.solve(&recipe_query(&["title", "steps"])).unwrap_err();
    match err {
        Error::OutputUnreachable { output, atom } => {
            assert_eq!(output, "recipe_2");
            assert_eq!(atom, "steps(recipe_2)");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn descriptor_on_wrong_resource_type_is_rejected() {
    let doc = MasQuery::default()
        .with_input("topic", 1, args("leek"))
        .with_resource("sentence", ResourceSpec::new(3).describe("title", &[("source", "topic", 1)]))
        .with_output("sentence", 3);
    let err = planner().compile(&doc).unwrap_err();
    assert!(matches!(err, Error::DescriptorTypeMismatch { ref descriptor, .. } if descriptor == "title"));
    assert!(err.is_compile_error());
}

// ===========================================================================
// Failures
// ===========================================================================

#[test]
fn type_without_producer_is_unreachable() {
    let err = planner().solve(&cats_to("image")).unwrap_err();
    match err {
        Error::OutputUnreachable { output, atom } => {
            assert_eq!(output, "image_1");
            assert_eq!(atom, "image_0");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn held_instance_is_not_another_instance() {
    let doc = MasQuery::default()
        .with_input("topic", 1, args("cats"))
        .with_output("topic", 2);
    match planner().solve(&doc).unwrap_err() {
        Error::OutputUnreachable { output, atom } => {
            assert_eq!(output, "topic_2");
            assert_eq!(atom, "topic_2");
        }
        other => panic!("unexpected error: {other}"),
    }

    let recipe = ResourceSpec::new(2).describe("title", &[("source", "topic", 3)]);
    let doc = MasQuery::default()
        .with_input("topic", 1, args("cats"))
        .with_resource("recipe", recipe)
        .with_output("recipe", 2);
    assert!(matches!(
        planner().solve(&doc),
        Err(Error::OutputUnreachable { ref atom, .. }) if atom == "topic_3"
    ));
}

#[test]
fn mutually_dependent_descriptors_are_a_cycle() {
    let doc = MasQuery::default()
        .with_input("topic", 1, args("mirrors"))
        .with_resource(
            "left",
            ResourceSpec::new(1).describe("mirror_left", &[("source", "right", 1)]),
        )
        .with_resource(
            "right",
            ResourceSpec::new(1).describe("mirror_right", &[("source", "left", 1)]),
        )
        .with_output("left", 1);
    let err = planner().solve(&doc).unwrap_err();
    match &err {
        Error::CyclicDependency { path } => {
            assert_eq!(path.first().map(String::as_str), Some("left_1"));
            assert_eq!(path.last().map(String::as_str), Some("left_1"));
            assert!(path.iter().any(|a| a == "right_1"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_resolution_error());
}

#[test]
fn depth_limit_is_configurable() {
    let p = planner().with_config(PlannerConfig { max_depth: 2 });
    assert!(matches!(
        p.solve(&cats_to("paragraph")),
        Err(Error::DepthLimitExceeded { limit: 2, .. })
    ));
    let p = planner().with_config(PlannerConfig { max_depth: 4 });
    assert!(p.solve(&cats_to("sentence")).is_ok());
}

#[test]
fn failing_task_is_reported_not_retried() {
    let mut c = Catalog::new();
    c.register_task(Task::new("WriteSentence", "topic", "sentence", |_: &Resource| {
        Err("model unavailable".into())
    }))
    .unwrap();
    let p = Planner::new(registry(), c);
    let (report, result) = p.run(&cats_to("sentence"), "cats").unwrap();
    assert!(matches!(result, Err(Error::TaskExecution { .. })));
    assert_eq!(report.outcome, Outcome::Failure);
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].status, StepState::Failed);
}

// ===========================================================================
// Documents on disk
// ===========================================================================

#[test]
fn yaml_and_json_files_solve_alike() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("cats.yaml");
    std::fs::write(
        &yaml,
        "input:\n  - topic: {id: 1, args: {topic: cats}}\noutput:\n  - paragraph: {id: 1}\n",
    )
    .unwrap();
    let json = dir.path().join("cats.json");
    std::fs::write(
        &json,
        r#"{"input": [{"topic": {"id": 1, "args": {"topic": "cats"}}}], "output": [{"paragraph": {"id": 1}}]}"#,
    )
    .unwrap();

    let p = planner();
    let a = p.solve(&MasQuery::load(&yaml).unwrap()).unwrap();
    let b = p.solve(&MasQuery::load(&json).unwrap()).unwrap();
    assert_eq!(a.plan.task_names(), b.plan.task_names());
    assert_eq!(a.clauses.clause_set(), b.clauses.clause_set());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MasQuery::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
