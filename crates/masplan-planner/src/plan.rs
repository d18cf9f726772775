//! Execution plan and executor.
//!
//! A plan is the ordered list of bound tasks pulled out of a derivation. Every
//! step names the tuple it reads and the tuple it writes, and the executor
//! keeps one live value per tuple: a task step stores its result under its
//! output tuple, a descriptor step annotates the value already stored there.
//! For a plain chain of generic tasks that is the fold `value = task.invoke(value)`.

use crate::catalog::{DependentTask, StepKind};
use masplan_core::{Error, Resource, ResourceTuple, Result, TypeAlias};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One executable step: a task bound to the tuples it reads and produces.
pub type PlanStep = DependentTask;

#[derive(Clone, Debug)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    /// Slot a single starting value is seeded into.
    pub input: ResourceTuple,
    /// Slot the result is read from once every step has run.
    pub output: ResourceTuple,
}

/// What happened to one step during execution.
#[derive(Debug)]
pub struct StepEvent<'a> {
    pub index: usize,
    pub step: &'a DependentTask,
    pub elapsed: Duration,
    pub error: Option<&'a Error>,
}

impl Plan {
    /// A plan over generic steps, reading and writing wildcard slots.
    pub fn new(steps: Vec<PlanStep>, input_type: TypeAlias, output_type: TypeAlias) -> Self {
        Self::bound(
            steps,
            ResourceTuple::wildcard(input_type),
            ResourceTuple::wildcard(output_type),
        )
    }

    pub fn bound(steps: Vec<PlanStep>, input: ResourceTuple, output: ResourceTuple) -> Self {
        Self {
            steps,
            input,
            output,
        }
    }

    pub fn input_type(&self) -> &TypeAlias {
        &self.input.ty
    }

    pub fn output_type(&self) -> &TypeAlias {
        &self.output.ty
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Check the plan can run when its input slot starts with a value of type
    /// `initial`.
    pub fn verify(&self, initial: &TypeAlias) -> Result<()> {
        let seed = ResourceTuple {
            ty: initial.clone(),
            id: self.input.id,
        };
        self.verify_from(std::slice::from_ref(&seed))
    }

    /// Check the plan can run when the given slots start filled: every step's
    /// input slot must be held before it runs, and the output slot must be
    /// held at the end.
    pub fn verify_from(&self, initial: &[ResourceTuple]) -> Result<()> {
        let mut held: Vec<&ResourceTuple> = Vec::new();
        for tuple in initial {
            if !held.contains(&tuple) {
                held.push(tuple);
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if !held.contains(&&step.input) {
                return Err(Error::PlanTypeMismatch {
                    step: index,
                    task: step.name().to_string(),
                    expected: step.input.to_string(),
                    found: describe_held(&held),
                });
            }
            if !held.contains(&&step.output) {
                held.push(&step.output);
            }
        }
        if !held.contains(&&self.output) {
            return Err(Error::PlanTypeMismatch {
                step: self.steps.len(),
                task: "<output>".into(),
                expected: self.output.to_string(),
                found: describe_held(&held),
            });
        }
        Ok(())
    }

    pub fn execute(&self, input: Resource) -> Result<Resource> {
        self.execute_seeded(vec![(self.input.clone(), input)])
    }

    /// Execute starting from several filled slots (e.g. every query input).
    pub fn execute_seeded(&self, inputs: Vec<(ResourceTuple, Resource)>) -> Result<Resource> {
        self.execute_observed(inputs, |_| {})
    }

    /// Execute, reporting every attempted step to `observe`.
    pub fn execute_observed<F>(
        &self,
        inputs: Vec<(ResourceTuple, Resource)>,
        mut observe: F,
    ) -> Result<Resource>
    where
        F: FnMut(StepEvent<'_>),
    {
        if self.steps.is_empty() {
            return Err(Error::EmptyPlan);
        }
        let seeded: Vec<ResourceTuple> = inputs.iter().map(|(t, _)| t.clone()).collect();
        self.verify_from(&seeded)?;

        let mut values: HashMap<ResourceTuple, Resource> = HashMap::new();
        for (tuple, value) in inputs {
            values.entry(tuple).or_insert(value);
        }

        for (index, step) in self.steps.iter().enumerate() {
            let start = Instant::now();
            let outcome = run_step(index, step, &mut values);
            let elapsed = start.elapsed();
            observe(StepEvent {
                index,
                step,
                elapsed,
                error: outcome.as_ref().err(),
            });
            if let Err(e) = outcome {
                warn!(step = index, task = %step.name(), error = %e, "step failed");
                return Err(e);
            }
            debug!(step = index, task = %step.name(), ms = elapsed.as_millis() as u64, "step done");
        }

        let Some(output) = values.remove(&self.output) else {
            let mut held: Vec<&ResourceTuple> = values.keys().collect();
            held.sort();
            return Err(Error::PlanTypeMismatch {
                step: self.steps.len(),
                task: "<output>".into(),
                expected: self.output.to_string(),
                found: describe_held(&held),
            });
        };
        info!(steps = self.steps.len(), output = %self.output, "plan executed");
        Ok(output)
    }
}

fn describe_held(held: &[&ResourceTuple]) -> String {
    if held.is_empty() {
        return "nothing".into();
    }
    held.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn run_step(
    index: usize,
    step: &PlanStep,
    values: &mut HashMap<ResourceTuple, Resource>,
) -> Result<()> {
    let task = &step.task;
    let input = values.get(&step.input).ok_or_else(|| Error::PlanTypeMismatch {
        step: index,
        task: task.name.clone(),
        expected: step.input.to_string(),
        found: "nothing".into(),
    })?;
    // a seeded slot may hold a value of some other type
    if input.ty != task.input {
        return Err(Error::type_mismatch(&task.name, task.input.as_str(), input.ty.as_str()));
    }
    let output = task.invoke(input)?;
    match &step.kind {
        StepKind::Task => {
            values.insert(step.output.clone(), output);
        }
        StepKind::Descriptor(_) => match values.get_mut(&step.output) {
            Some(existing) => existing.annotate(output),
            None => {
                values.insert(step.output.clone(), output);
            }
        },
    }
    Ok(())
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "plan: {} -> {}", self.input.ty, self.output.ty)?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, step)?;
        }
        Ok(())
    }
}
