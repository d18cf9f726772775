//! Built-in demonstration catalog: topics, sentences, paragraphs, images and
//! recipes. Every task is deterministic so plans can be run offline.

use masplan_core::{BoxError, Resource, ResourceRegistry, ResourceType, Result};
use masplan_planner::{Catalog, Planner, PlannerConfig, Task};
use serde_json::Value;

pub fn registry() -> Result<ResourceRegistry> {
    let mut reg = ResourceRegistry::new();
    reg.register("topic", ResourceType::new("Topic").with_field("topic"))?;
    reg.register("sentence", ResourceType::new("Sentence"))?;
    reg.register("paragraph", ResourceType::new("Paragraph"))?;
    reg.register("image", ResourceType::new("Image"))?;
    reg.register("recipe", ResourceType::new("Recipe"))?;
    Ok(reg)
}

fn topic_of(r: &Resource) -> std::result::Result<&str, BoxError> {
    r.get_str("topic")
        .ok_or_else(|| format!("{} has no 'topic' field", r.ty).into())
}

fn text_of(r: &Resource) -> std::result::Result<&str, BoxError> {
    r.get_str("text")
        .ok_or_else(|| format!("{} has no 'text' field", r.ty).into())
}

pub fn catalog() -> Result<Catalog> {
    let mut c = Catalog::new();

    c.register_task(
        Task::new("WriteSentence", "topic", "sentence", |r: &Resource| {
            let topic = topic_of(r)?;
            Ok(Resource::new("sentence")
                .with("text", format!("{} are worth writing about.", capitalize(topic))))
        })
        .describe("One sentence about a topic"),
    )?;
    c.register_task(
        Task::new("ExpandParagraph", "sentence", "paragraph", |r: &Resource| {
            let text = text_of(r)?;
            Ok(Resource::new("paragraph").with(
                "text",
                format!("{} There is always more to say. {}", text, text),
            ))
        })
        .describe("Grow a sentence into a paragraph"),
    )?;
    c.register_task(
        Task::new("Summarize", "paragraph", "sentence", |r: &Resource| {
            let text = text_of(r)?;
            let first = text.split_inclusive('.').next().unwrap_or(text).trim();
            Ok(Resource::new("sentence").with("text", first))
        })
        .describe("Keep the first sentence of a paragraph"),
    )?;
    c.register_task(
        Task::new("Illustrate", "sentence", "image", |r: &Resource| {
            let text = text_of(r)?;
            Ok(Resource::new("image")
                .with("prompt", text)
                .with("width", 512)
                .with("height", 512))
        })
        .describe("Render a sentence as an image prompt"),
    )?;

    c.register_descriptor(
        "title",
        Task::new("NameDish", "topic", "recipe", |r: &Resource| {
            let topic = topic_of(r)?;
            Ok(Resource::new("recipe").with("title", format!("{} soup", capitalize(topic))))
        })
        .describe("Title a recipe after its topic"),
    )?;
    c.register_descriptor(
        "ingredients",
        Task::new("ListIngredients", "topic", "recipe", |r: &Resource| {
            let topic = topic_of(r)?;
            let items: Vec<Value> = [topic, "onion", "stock", "salt"]
                .into_iter()
                .map(Value::from)
                .collect();
            Ok(Resource::new("recipe").with("ingredients", items))
        })
        .describe("List what goes into a recipe"),
    )?;
    c.register_descriptor(
        "steps",
        Task::new("WriteSteps", "topic", "recipe", |r: &Resource| {
            let topic = topic_of(r)?;
            let steps: Vec<Value> = vec![
                format!("Chop the {}.", topic).into(),
                "Sweat the onion.".into(),
                "Add stock and simmer.".into(),
                "Season with salt.".into(),
            ];
            Ok(Resource::new("recipe").with("steps", steps))
        })
        .describe("Write the method of a recipe"),
    )?;

    Ok(c)
}

pub fn planner(config: PlannerConfig) -> Result<Planner> {
    Ok(Planner::new(registry()?, catalog()?).with_config(config))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
