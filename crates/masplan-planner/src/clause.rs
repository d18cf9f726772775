//! Horn clause model: `head :- body` over resource atoms.
//!
//! Each constructor below produces one canonical clause shape. The shape is
//! kept on the clause because the resolver ranks candidates by it.

use crate::catalog::{DependentTask, Task};
use masplan_core::{Atom, ResourceTuple};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    /// `topic_1.`: a resource the query already holds.
    InputFact,
    /// `sentence_0 :- topic_0.`: a generic catalog task.
    Task,
    /// `sentence_1 :- sentence_0.`: a concrete id falls back to the generic one.
    Assignment,
    /// `topic_0 :- topic_1.`: a held concrete input satisfies the generic atom.
    Generalization,
    /// `ingredients(recipe_2) :- topic_1.`: a descriptor bound to instances.
    DependentDescriptor,
    /// `all_dependencies(recipe_2) :- ingredients(recipe_2), steps(recipe_2).`
    AllDependencies,
    /// `recipe_2 :- all_dependencies(recipe_2).`
    Completion,
}

impl ClauseKind {
    /// Lower ranks are tried first. Specific shapes beat generic fallbacks.
    pub fn rank(self) -> u8 {
        match self {
            Self::InputFact => 0,
            Self::DependentDescriptor => 1,
            Self::AllDependencies | Self::Completion => 2,
            Self::Task => 3,
            Self::Assignment | Self::Generalization => 4,
        }
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InputFact => "input",
            Self::Task => "task",
            Self::Assignment => "assignment",
            Self::Generalization => "generalization",
            Self::DependentDescriptor => "descriptor",
            Self::AllDependencies => "all-dependencies",
            Self::Completion => "completion",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug)]
pub struct HornClause {
    pub head: Atom,
    pub body: Vec<Atom>,
    pub kind: ClauseKind,
    /// Executable step contributed when this clause is used in a proof.
    pub step: Option<DependentTask>,
}

impl HornClause {
    pub fn input_fact(tuple: ResourceTuple) -> Self {
        Self {
            head: Atom::Resource(tuple),
            body: Vec::new(),
            kind: ClauseKind::InputFact,
            step: None,
        }
    }

    pub fn task(task: Arc<Task>) -> Self {
        let step = DependentTask::generic(task);
        Self {
            head: Atom::Resource(step.output.clone()),
            body: vec![Atom::Resource(step.input.clone())],
            kind: ClauseKind::Task,
            step: Some(step),
        }
    }

    pub fn assignment(tuple: ResourceTuple) -> Self {
        Self {
            body: vec![Atom::Resource(tuple.generalize())],
            head: Atom::Resource(tuple),
            kind: ClauseKind::Assignment,
            step: None,
        }
    }

    pub fn generalization(tuple: ResourceTuple) -> Self {
        Self {
            head: Atom::Resource(tuple.generalize()),
            body: vec![Atom::Resource(tuple)],
            kind: ClauseKind::Generalization,
            step: None,
        }
    }

    /// `predicate(output) :- input, extra...` where `predicate` is the
    /// descriptor alias carried by `step`.
    pub fn dependent_descriptor(step: DependentTask, predicate: &str, extra: Vec<Atom>) -> Self {
        let mut body = vec![Atom::Resource(step.input.clone())];
        body.extend(extra);
        Self {
            head: Atom::property(predicate, step.output.clone()),
            body,
            kind: ClauseKind::DependentDescriptor,
            step: Some(step),
        }
    }

    pub fn all_dependencies(subject: ResourceTuple, requirements: Vec<Atom>) -> Self {
        Self {
            head: Atom::AllDependencies(subject),
            body: requirements,
            kind: ClauseKind::AllDependencies,
            step: None,
        }
    }

    /// Ties a concrete resource to its aggregate. With `needs_producer`, a
    /// generic producer of the type must also be derivable.
    pub fn completion(subject: ResourceTuple, needs_producer: bool) -> Self {
        let mut body = Vec::with_capacity(2);
        if needs_producer {
            body.push(Atom::Resource(subject.generalize()));
        }
        body.push(Atom::AllDependencies(subject.clone()));
        Self {
            head: Atom::Resource(subject),
            body,
            kind: ClauseKind::Completion,
            step: None,
        }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// (head, body) identity used for de-duplication.
    pub fn key(&self) -> (Atom, Vec<Atom>) {
        (self.head.clone(), self.body.clone())
    }
}

impl fmt::Display for HornClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            return write!(f, "{}.", self.head);
        }
        let body = self
            .body
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} :- {}.", self.head, body)
    }
}
