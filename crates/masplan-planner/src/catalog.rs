//! Task / Descriptor catalog: typed units of work the planner composes.
//!
//! A [`Task`] turns one resource type into another. A [`Descriptor`] is a task
//! whose output annotates the resource it describes instead of standing for a
//! new resource. Tasks are stored as (input tag, output tag, work) triples; the
//! planner never inspects what the work-function does.

use masplan_core::{BoxError, Error, Resource, ResourceTuple, Result, TypeAlias};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The work-function behind a task. Implement this to plug in a new capability,
/// or pass a closure.
pub trait Work: Send + Sync {
    fn run(&self, input: &Resource) -> std::result::Result<Resource, BoxError>;
}

impl<F> Work for F
where
    F: Fn(&Resource) -> std::result::Result<Resource, BoxError> + Send + Sync,
{
    fn run(&self, input: &Resource) -> std::result::Result<Resource, BoxError> {
        self(input)
    }
}

#[derive(Clone)]
pub struct Task {
    pub name: String,
    pub description: String,
    pub input: TypeAlias,
    pub output: TypeAlias,
    work: Arc<dyn Work>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl Task {
    pub fn new<F>(
        name: impl Into<String>,
        input: impl Into<TypeAlias>,
        output: impl Into<TypeAlias>,
        work: F,
    ) -> Self
    where
        F: Fn(&Resource) -> std::result::Result<Resource, BoxError> + Send + Sync + 'static,
    {
        Self::with_work(name, input, output, work)
    }

    /// Build a task around any [`Work`] implementation.
    pub fn with_work(
        name: impl Into<String>,
        input: impl Into<TypeAlias>,
        output: impl Into<TypeAlias>,
        work: impl Work + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input: input.into(),
            output: output.into(),
            work: Arc::new(work),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Run the work-function. The caller has already checked that `input` is
    /// of type `self.input`; a result of the wrong type is reported here.
    pub fn invoke(&self, input: &Resource) -> Result<Resource> {
        let output = self
            .work
            .run(input)
            .map_err(|e| Error::task_execution(&self.name, e))?;
        if output.ty != self.output {
            return Err(Error::type_mismatch(
                &self.name,
                self.output.as_str(),
                output.ty.as_str(),
            ));
        }
        Ok(output)
    }
}

/// A task whose output is a property of the resource it produces.
#[derive(Clone, Debug)]
pub struct Descriptor {
    /// Name used in query documents (`descriptors: {alias: ...}`).
    pub alias: String,
    pub task: Arc<Task>,
}

/// How a bound task's output is folded into the execution state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Replaces the current value of the output type.
    Task,
    /// Annotates the current value of the described type.
    Descriptor(String),
}

/// A task bound to concrete (or wildcard) input/output tuples.
#[derive(Clone, Debug)]
pub struct DependentTask {
    pub task: Arc<Task>,
    pub kind: StepKind,
    pub input: ResourceTuple,
    pub output: ResourceTuple,
}

impl DependentTask {
    /// Generic form: wildcard input to wildcard output.
    pub fn generic(task: Arc<Task>) -> Self {
        let input = ResourceTuple::wildcard(task.input.clone());
        let output = ResourceTuple::wildcard(task.output.clone());
        Self {
            task,
            kind: StepKind::Task,
            input,
            output,
        }
    }

    pub fn descriptor(descriptor: &Descriptor, input: ResourceTuple, output: ResourceTuple) -> Self {
        Self {
            task: descriptor.task.clone(),
            kind: StepKind::Descriptor(descriptor.alias.clone()),
            input,
            output,
        }
    }

    pub fn name(&self) -> &str {
        &self.task.name
    }
}

impl fmt::Display for DependentTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StepKind::Task => write!(f, "{}: {} -> {}", self.task.name, self.input, self.output),
            StepKind::Descriptor(alias) => write!(
                f,
                "{} [{}]: {} -> {}",
                self.task.name, alias, self.input, self.output
            ),
        }
    }
}

/// All tasks and descriptors available to the compiler, in registration order.
#[derive(Default, Clone, Debug)]
pub struct Catalog {
    tasks: Vec<Arc<Task>>,
    task_index: HashMap<String, usize>,
    descriptors: Vec<Arc<Descriptor>>,
    descriptor_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_task(&mut self, task: Task) -> Result<()> {
        if self.task_index.contains_key(&task.name) {
            return Err(Error::DuplicateTask(task.name));
        }
        tracing::debug!(task = %task.name, input = %task.input, output = %task.output, "registered task");
        self.task_index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(Arc::new(task));
        Ok(())
    }

    pub fn register_descriptor(&mut self, alias: impl Into<String>, task: Task) -> Result<()> {
        let alias = alias.into();
        if self.descriptor_index.contains_key(&alias) {
            return Err(Error::DuplicateDescriptor(alias));
        }
        tracing::debug!(descriptor = %alias, task = %task.name, "registered descriptor");
        self.descriptor_index.insert(alias.clone(), self.descriptors.len());
        self.descriptors.push(Arc::new(Descriptor {
            alias,
            task: Arc::new(task),
        }));
        Ok(())
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.task_index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn descriptor(&self, alias: &str) -> Option<&Arc<Descriptor>> {
        self.descriptor_index.get(alias).map(|&i| &self.descriptors[i])
    }

    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn descriptors(&self) -> &[Arc<Descriptor>] {
        &self.descriptors
    }

    /// Generic tasks producing the given type.
    pub fn producers_of<'a>(&'a self, ty: &'a TypeAlias) -> impl Iterator<Item = &'a Arc<Task>> {
        self.tasks.iter().filter(move |t| &t.output == ty)
    }
}
