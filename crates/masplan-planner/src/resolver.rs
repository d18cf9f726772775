//! Resolution Engine: backward chaining over the clause database.
//!
//! Goals are proved depth-first, body atoms left to right. Candidate clauses
//! for a goal are tried by shape rank, then by database order, so a proof over
//! an unchanged database is always the same proof.
//!
//! Atoms are interned into an arena up front; the goals on the active path are
//! tracked as arena ids so a re-entered goal is reported as a cycle instead of
//! recursing.

use crate::catalog::DependentTask;
use crate::clause::ClauseKind;
use crate::compiler::QueryPlan;
use crate::plan::Plan;
use masplan_core::{Atom, Error, ResourceTuple, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Deepest goal nesting a proof may reach before giving up.
    pub max_depth: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(usize);

/// Interned atoms of one clause database.
#[derive(Default, Debug)]
pub struct AtomArena {
    atoms: Vec<Atom>,
    ids: HashMap<Atom, AtomId>,
}

impl AtomArena {
    pub fn intern(&mut self, atom: &Atom) -> AtomId {
        if let Some(&id) = self.ids.get(atom) {
            return id;
        }
        let id = AtomId(self.atoms.len());
        self.atoms.push(atom.clone());
        self.ids.insert(atom.clone(), id);
        id
    }

    pub fn get(&self, atom: &Atom) -> Option<AtomId> {
        self.ids.get(atom).copied()
    }

    pub fn atom(&self, id: AtomId) -> &Atom {
        &self.atoms[id.0]
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

/// A successful proof of one atom.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub atom: Atom,
    /// Index of the clause used, into [`QueryPlan::clauses`].
    pub clause: usize,
    pub kind: ClauseKind,
    pub children: Vec<Arc<Derivation>>,
}

impl Derivation {
    /// Indented proof tree, one atom per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let _ = writeln!(out, "{}{} [{}]", "  ".repeat(depth), self.atom, self.kind);
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }
}

enum Failure {
    /// No clause proves this atom.
    Underivable(AtomId),
    /// Goal re-entered; path from the first occurrence back to itself.
    Cycle(Vec<AtomId>),
    DepthExceeded(AtomId),
}

pub struct Resolver<'a> {
    db: &'a QueryPlan,
    config: PlannerConfig,
    arena: AtomArena,
    /// fact atom -> its clause index
    facts: HashMap<AtomId, usize>,
    /// head -> candidate clause indices, best first
    candidates: HashMap<AtomId, Vec<usize>>,
    path: Vec<AtomId>,
    on_path: HashSet<AtomId>,
    proven: HashMap<AtomId, Arc<Derivation>>,
}

impl<'a> Resolver<'a> {
    pub fn new(db: &'a QueryPlan, config: PlannerConfig) -> Self {
        let mut arena = AtomArena::default();
        let mut facts = HashMap::new();
        let mut candidates: HashMap<AtomId, Vec<usize>> = HashMap::new();
        for (index, clause) in db.clauses().iter().enumerate() {
            let head = arena.intern(&clause.head);
            for atom in &clause.body {
                arena.intern(atom);
            }
            if clause.kind == ClauseKind::InputFact {
                facts.entry(head).or_insert(index);
            } else {
                candidates.entry(head).or_default().push(index);
            }
        }
        for list in candidates.values_mut() {
            // stable: database order breaks ties within a rank
            list.sort_by_key(|&i| db.clause(i).kind.rank());
        }
        debug!(atoms = arena.len(), facts = facts.len(), "resolver ready");
        Self {
            db,
            config,
            arena,
            facts,
            candidates,
            path: Vec::new(),
            on_path: HashSet::new(),
            proven: HashMap::new(),
        }
    }

    /// Prove every declared output, in declaration order.
    pub fn derive(&mut self) -> Result<Vec<(ResourceTuple, Arc<Derivation>)>> {
        let outputs = self.db.outputs().to_vec();
        let mut derivations = Vec::with_capacity(outputs.len());
        for output in outputs {
            let atom = Atom::Resource(output.clone());
            let id = self.arena.intern(&atom);
            let derivation = self.prove(id, 0).map_err(|f| self.surface(&output, f))?;
            info!(output = %output, nodes = derivation.size(), "output derived");
            derivations.push((output, derivation));
        }
        Ok(derivations)
    }

    /// Prove all outputs and linearize the proofs into a plan.
    pub fn resolve(&mut self) -> Result<Plan> {
        let derivations = self.derive()?;
        let plan = linearize(self.db, &derivations)?;
        info!(steps = plan.len(), input = %plan.input, output = %plan.output, "plan resolved");
        Ok(plan)
    }

    /// Prove a single atom, outside of the declared outputs.
    pub fn prove_atom(&mut self, atom: &Atom) -> Result<Arc<Derivation>> {
        let id = self.arena.intern(atom);
        self.prove(id, 0).map_err(|f| match f {
            Failure::Underivable(_) => Error::UnderivableResource(atom.to_string()),
            other => self.surface(atom.subject(), other),
        })
    }

    fn prove(&mut self, goal: AtomId, depth: usize) -> std::result::Result<Arc<Derivation>, Failure> {
        if let Some(done) = self.proven.get(&goal) {
            return Ok(done.clone());
        }
        if let Some(&clause) = self.facts.get(&goal) {
            let leaf = Arc::new(Derivation {
                atom: self.arena.atom(goal).clone(),
                clause,
                kind: ClauseKind::InputFact,
                children: Vec::new(),
            });
            self.proven.insert(goal, leaf.clone());
            return Ok(leaf);
        }
        if self.on_path.contains(&goal) {
            let start = self.path.iter().position(|&a| a == goal).unwrap_or(0);
            let mut cycle = self.path[start..].to_vec();
            cycle.push(goal);
            trace!(atom = %self.arena.atom(goal), "cycle");
            return Err(Failure::Cycle(cycle));
        }
        if depth >= self.config.max_depth {
            return Err(Failure::DepthExceeded(goal));
        }
        let Some(options) = self.candidates.get(&goal).cloned() else {
            trace!(atom = %self.arena.atom(goal), "no clause");
            return Err(Failure::Underivable(goal));
        };

        self.path.push(goal);
        self.on_path.insert(goal);
        let outcome = self.try_candidates(goal, &options, depth);
        self.path.pop();
        self.on_path.remove(&goal);

        if let Ok(derivation) = &outcome {
            self.proven.insert(goal, derivation.clone());
        }
        outcome
    }

    fn try_candidates(
        &mut self,
        goal: AtomId,
        options: &[usize],
        depth: usize,
    ) -> std::result::Result<Arc<Derivation>, Failure> {
        let db = self.db;
        let mut first_cycle: Option<Vec<AtomId>> = None;
        let mut first_underivable: Option<AtomId> = None;

        'clauses: for &index in options {
            let clause = db.clause(index);
            trace!(goal = %self.arena.atom(goal), clause = %clause, "trying clause");
            let body: Vec<AtomId> = clause
                .body
                .iter()
                .map(|a| self.arena.intern(a))
                .collect();
            let mut children = Vec::with_capacity(body.len());
            for atom in body {
                match self.prove(atom, depth + 1) {
                    Ok(child) => children.push(child),
                    Err(Failure::DepthExceeded(a)) => return Err(Failure::DepthExceeded(a)),
                    Err(Failure::Cycle(path)) => {
                        first_cycle.get_or_insert(path);
                        continue 'clauses;
                    }
                    Err(Failure::Underivable(a)) => {
                        first_underivable.get_or_insert(a);
                        continue 'clauses;
                    }
                }
            }
            // `x_k :- x_0` needs a produced x, not another held instance of it
            let bridges_input = matches!(clause.kind, ClauseKind::Assignment | ClauseKind::Completion)
                && children
                    .first()
                    .is_some_and(|c| c.kind == ClauseKind::Generalization);
            if bridges_input {
                trace!(goal = %self.arena.atom(goal), "generic atom only held as another instance");
                first_underivable.get_or_insert(goal);
                continue 'clauses;
            }
            return Ok(Arc::new(Derivation {
                atom: self.arena.atom(goal).clone(),
                clause: index,
                kind: clause.kind,
                children,
            }));
        }

        debug!(atom = %self.arena.atom(goal), "all candidates failed");
        match (first_underivable, first_cycle) {
            (Some(atom), _) => Err(Failure::Underivable(atom)),
            (None, Some(path)) => Err(Failure::Cycle(path)),
            (None, None) => Err(Failure::Underivable(goal)),
        }
    }

    fn surface(&self, output: &ResourceTuple, failure: Failure) -> Error {
        match failure {
            Failure::Underivable(atom) => Error::OutputUnreachable {
                output: output.to_string(),
                atom: self.arena.atom(atom).to_string(),
            },
            Failure::Cycle(path) => Error::CyclicDependency {
                path: path
                    .into_iter()
                    .map(|a| self.arena.atom(a).to_string())
                    .collect(),
            },
            Failure::DepthExceeded(atom) => Error::DepthLimitExceeded {
                atom: self.arena.atom(atom).to_string(),
                limit: self.config.max_depth,
            },
        }
    }
}

/// Flatten proofs into dependency order: a node's sub-proofs come before its
/// own step. Clauses shared between proofs contribute their step once.
///
/// Every step is rebound to the slot its input value will live in at run
/// time: a generic `x_0` proved through `x_0 :- x_k` reads the held `x_k`.
pub fn linearize(db: &QueryPlan, derivations: &[(ResourceTuple, Arc<Derivation>)]) -> Result<Plan> {
    let mut walk = Linearizer::default();
    for (_, derivation) in derivations {
        walk.visit(db, derivation);
    }
    let Some((last, _)) = derivations.last() else {
        return Err(Error::EmptyPlan);
    };
    let output = walk.slot(last);
    let input = walk.first_input.unwrap_or_else(|| output.clone());
    Ok(Plan::bound(walk.steps, input, output))
}

#[derive(Default)]
struct Linearizer {
    steps: Vec<DependentTask>,
    emitted: HashSet<usize>,
    /// proved resource tuple -> slot holding its value
    slots: HashMap<ResourceTuple, ResourceTuple>,
    first_input: Option<ResourceTuple>,
}

impl Linearizer {
    fn slot(&self, tuple: &ResourceTuple) -> ResourceTuple {
        self.slots.get(tuple).cloned().unwrap_or_else(|| tuple.clone())
    }

    fn visit(&mut self, db: &QueryPlan, node: &Derivation) {
        for child in &node.children {
            self.visit(db, child);
        }
        if let Atom::Resource(tuple) = &node.atom {
            let slot = match node.kind {
                ClauseKind::Generalization | ClauseKind::Assignment | ClauseKind::Completion => node
                    .children
                    .first()
                    .and_then(|c| c.atom.as_resource())
                    .map(|t| self.slot(t))
                    .unwrap_or_else(|| tuple.clone()),
                _ => tuple.clone(),
            };
            if node.kind == ClauseKind::InputFact && self.first_input.is_none() {
                self.first_input = Some(tuple.clone());
            }
            self.slots.insert(tuple.clone(), slot);
        }
        if let Some(step) = &db.clause(node.clause).step {
            if self.emitted.insert(node.clause) {
                let mut bound = step.clone();
                bound.input = self.slot(&step.input);
                self.steps.push(bound);
            }
        }
    }
}
