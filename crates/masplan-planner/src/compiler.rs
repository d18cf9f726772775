//! Query Compiler: turns a MASQuery document into a clause database.
//!
//! The compiler walks the document once, section by section:
//! 1. `input`: instantiate each resource, emit its fact and a generalization
//!    so generic clauses can consume it.
//! 2. `resources`: bind descriptors to instances, aggregate descriptors and
//!    dependencies into `all_dependencies`, or fall back to an assignment.
//! 3. `output`: fall back to an assignment for anything not declared above.
//! 4. seed task clauses for every catalog task on the type lineage of the
//!    requested resources.
//!
//! Nothing in the returned [`QueryPlan`] borrows from the document.

use crate::catalog::{Catalog, DependentTask, Task};
use crate::clause::{ClauseKind, HornClause};
use crate::query::{Entry, MasQuery, RefSpec};
use masplan_core::{
    Atom, Error, InstanceId, Resource, ResourceRegistry, ResourceTuple, Result, TypeAlias,
};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The compiled clause database for one query.
#[derive(Clone, Debug, Default)]
pub struct QueryPlan {
    clauses: Vec<HornClause>,
    keys: HashSet<(Atom, Vec<Atom>)>,
    inputs: Vec<(ResourceTuple, Resource)>,
    outputs: Vec<ResourceTuple>,
}

impl QueryPlan {
    /// Add a clause unless an identical (head, body) pair is already present.
    pub fn push(&mut self, clause: HornClause) -> bool {
        if !self.keys.insert(clause.key()) {
            return false;
        }
        self.clauses.push(clause);
        true
    }

    pub fn clauses(&self) -> &[HornClause] {
        &self.clauses
    }

    pub fn clause(&self, index: usize) -> &HornClause {
        &self.clauses[index]
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Instantiated inputs in declaration order.
    pub fn inputs(&self) -> &[(ResourceTuple, Resource)] {
        &self.inputs
    }

    /// Every input keyed by its tuple, ready to seed an execution.
    pub fn seed(&self) -> Vec<(ResourceTuple, Resource)> {
        self.inputs.clone()
    }

    pub fn outputs(&self) -> &[ResourceTuple] {
        &self.outputs
    }

    pub fn count(&self, kind: ClauseKind) -> usize {
        self.clauses.iter().filter(|c| c.kind == kind).count()
    }

    /// Order-insensitive view of the database, for comparisons.
    pub fn clause_set(&self) -> BTreeSet<String> {
        self.clauses.iter().map(ToString::to_string).collect()
    }

    /// Render the database as a logic program, one clause per line.
    pub fn to_program(&self) -> String {
        let mut out = String::new();
        let mut last: Option<ClauseKind> = None;
        for clause in &self.clauses {
            if last != Some(clause.kind) {
                if last.is_some() {
                    out.push('\n');
                }
                out.push_str(&format!("% {}\n", clause.kind));
                last = Some(clause.kind);
            }
            out.push_str(&clause.to_string());
            out.push('\n');
        }
        out
    }
}

pub struct QueryCompiler<'a> {
    registry: &'a ResourceRegistry,
    catalog: &'a Catalog,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(registry: &'a ResourceRegistry, catalog: &'a Catalog) -> Self {
        Self { registry, catalog }
    }

    pub fn compile(&self, doc: &MasQuery) -> Result<QueryPlan> {
        let mut plan = QueryPlan::default();
        let mut held: HashSet<ResourceTuple> = HashSet::new();
        let mut declared: HashSet<ResourceTuple> = HashSet::new();
        // Concrete tuples the query refers to without holding or declaring them.
        let mut referenced: Vec<ResourceTuple> = Vec::new();
        // Types whose generic producers the proof may need.
        let mut roots: Vec<TypeAlias> = Vec::new();

        // ── 1. inputs ──
        for entry in &doc.input {
            let tuple = self.tuple(&entry.alias, entry.spec.id, "input")?;
            let args = match &entry.spec.args {
                Some(args) if !args.is_empty() => args,
                _ => {
                    return Err(Error::EmptyArguments {
                        alias: entry.alias.clone(),
                        id: entry.spec.id,
                    })
                }
            };
            let value = self.registry.instantiate(&entry.alias, args)?;
            plan.push(HornClause::input_fact(tuple.clone()));
            plan.push(HornClause::generalization(tuple.clone()));
            held.insert(tuple.clone());
            plan.inputs.push((tuple, value));
        }

        // ── 2. resources ──
        for entry in &doc.resources {
            let subject = self.tuple(&entry.alias, entry.spec.id, "resources")?;
            let context = format!("resource {}", subject);
            let mut requirements = Vec::new();

            for (name, spec) in entry.spec.descriptors.iter() {
                let params = spec
                    .params
                    .iter()
                    .map(|(_, r)| self.reference(r, &context))
                    .collect::<Result<Vec<_>>>()?;
                referenced.extend(params.iter().cloned());
                requirements.push(Atom::property(name, subject.clone()));

                let Some(descriptor) = self.catalog.descriptor(name) else {
                    warn!(descriptor = name, resource = %subject, "descriptor not in catalog; property stays unprovable");
                    continue;
                };
                let task = &descriptor.task;
                if task.output != subject.ty {
                    return Err(Error::DescriptorTypeMismatch {
                        descriptor: name.to_string(),
                        resource: subject.to_string(),
                        expected: task.output.to_string(),
                        found: subject.ty.to_string(),
                    });
                }
                let Some(pos) = params.iter().position(|p| p.ty == task.input) else {
                    return Err(Error::DescriptorTypeMismatch {
                        descriptor: name.to_string(),
                        resource: subject.to_string(),
                        expected: task.input.to_string(),
                        found: params
                            .iter()
                            .map(|p| p.ty.to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                };
                let mut params = params;
                let input = params.remove(pos);
                let extra = params.into_iter().map(Atom::Resource).collect();
                let step = DependentTask::descriptor(descriptor, input, subject.clone());
                plan.push(HornClause::dependent_descriptor(step, name, extra));
            }

            let has_descriptors = !requirements.is_empty();
            for dep in &entry.spec.dependencies {
                let tuple = self.reference(dep, &context)?;
                referenced.push(tuple.clone());
                requirements.push(Atom::Resource(tuple));
            }

            if requirements.is_empty() {
                plan.push(HornClause::assignment(subject.clone()));
                roots.push(subject.ty.clone());
            } else {
                plan.push(HornClause::all_dependencies(subject.clone(), requirements));
                plan.push(HornClause::completion(subject.clone(), !has_descriptors));
                if !has_descriptors {
                    roots.push(subject.ty.clone());
                }
            }
            declared.insert(subject);
        }

        // ── 3. outputs ──
        for entry in &doc.output {
            let tuple = self.tuple(&entry.alias, entry.spec.id, "output")?;
            plan.outputs.push(tuple.clone());
            referenced.push(tuple);
        }

        for tuple in referenced {
            if held.contains(&tuple) || declared.contains(&tuple) {
                continue;
            }
            roots.push(tuple.ty.clone());
            plan.push(HornClause::assignment(tuple));
        }

        // ── 4. generic task clauses on the lineage ──
        for task in self.lineage_tasks(&roots)? {
            plan.push(HornClause::task(task));
        }

        info!(
            clauses = plan.len(),
            facts = plan.count(ClauseKind::InputFact),
            tasks = plan.count(ClauseKind::Task),
            descriptors = plan.count(ClauseKind::DependentDescriptor),
            aggregates = plan.count(ClauseKind::AllDependencies),
            assignments = plan.count(ClauseKind::Assignment),
            "compiled query"
        );
        Ok(plan)
    }

    fn tuple(&self, alias: &str, id: u32, section: &str) -> Result<ResourceTuple> {
        if !self.registry.contains(alias) {
            return Err(Error::unresolved_alias(alias, section));
        }
        let id = InstanceId::parse(id, format!("{} {}", section, alias))?;
        Ok(ResourceTuple::concrete(alias, id))
    }

    fn reference(&self, entry: &Entry<RefSpec>, context: &str) -> Result<ResourceTuple> {
        self.tuple(&entry.alias, entry.spec.id, context)
    }

    /// Catalog tasks that can contribute to producing any root type, in
    /// catalog order. Walks producers backwards from the roots.
    fn lineage_tasks(&self, roots: &[TypeAlias]) -> Result<Vec<Arc<Task>>> {
        let mut lineage: HashSet<TypeAlias> = HashSet::new();
        let mut queue: VecDeque<TypeAlias> = roots.iter().cloned().collect();
        while let Some(ty) = queue.pop_front() {
            if !lineage.insert(ty.clone()) {
                continue;
            }
            for task in self.catalog.producers_of(&ty) {
                if !lineage.contains(&task.input) {
                    queue.push_back(task.input.clone());
                }
            }
        }

        let mut tasks = Vec::new();
        for task in self.catalog.tasks() {
            if !lineage.contains(&task.output) {
                continue;
            }
            for alias in [&task.input, &task.output] {
                if !self.registry.contains(alias.as_str()) {
                    return Err(Error::unresolved_alias(
                        alias.as_str(),
                        format!("task {}", task.name),
                    ));
                }
            }
            debug!(task = %task.name, "task on lineage");
            tasks.push(task.clone());
        }
        Ok(tasks)
    }
}
