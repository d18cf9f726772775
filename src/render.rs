//! Rendering of plans, proofs and results for the CLI.

use crate::config::OutputFormat;
use masplan_core::{Resource, ResourceRegistry};
use masplan_planner::{Catalog, Plan, QueryPlan, StepKind};
use serde::Serialize;

/// Serializable view of a plan.
#[derive(Debug, Serialize)]
pub struct PlanView {
    pub input_type: String,
    pub output_type: String,
    pub steps: Vec<StepView>,
}

#[derive(Debug, Serialize)]
pub struct StepView {
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    pub input: String,
    pub output: String,
}

impl From<&Plan> for PlanView {
    fn from(plan: &Plan) -> Self {
        Self {
            input_type: plan.input_type().to_string(),
            output_type: plan.output_type().to_string(),
            steps: plan
                .steps
                .iter()
                .map(|s| StepView {
                    task: s.name().to_string(),
                    descriptor: match &s.kind {
                        StepKind::Task => None,
                        StepKind::Descriptor(alias) => Some(alias.clone()),
                    },
                    input: s.input.to_string(),
                    output: s.output.to_string(),
                })
                .collect(),
        }
    }
}

/// Serialize `value` in the requested format; `text` renders the human form.
pub fn emit<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: impl FnOnce() -> String,
) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => text(),
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(value)?),
    })
}

pub fn program(db: &QueryPlan, format: OutputFormat) -> anyhow::Result<String> {
    let clauses: Vec<String> = db.clauses().iter().map(ToString::to_string).collect();
    emit(&clauses, format, || db.to_program())
}

pub fn plan(plan: &Plan, format: OutputFormat) -> anyhow::Result<String> {
    emit(&PlanView::from(plan), format, || plan.to_string())
}

pub fn resource(value: &Resource, format: OutputFormat) -> anyhow::Result<String> {
    emit(value, format, || {
        let mut out = format!("{}\n", value.ty);
        for (k, v) in &value.fields {
            out.push_str(&format!("  {}: {}\n", k, v));
        }
        out
    })
}

pub fn catalog(registry: &ResourceRegistry, catalog: &Catalog) -> String {
    let mut out = String::from("types:\n");
    for (alias, ty) in registry.entries() {
        if ty.fields.is_empty() {
            out.push_str(&format!("  {:<10} {}\n", alias, ty.name));
        } else {
            out.push_str(&format!("  {:<10} {} ({})\n", alias, ty.name, ty.fields.join(", ")));
        }
    }
    out.push_str("tasks:\n");
    for t in catalog.tasks() {
        out.push_str(&format!(
            "  {:<16} {} -> {}  {}\n",
            t.name, t.input, t.output, t.description
        ));
    }
    out.push_str("descriptors:\n");
    for d in catalog.descriptors() {
        out.push_str(&format!(
            "  {:<16} {} -> {}  ({})\n",
            d.alias, d.task.input, d.task.output, d.task.name
        ));
    }
    out
}
