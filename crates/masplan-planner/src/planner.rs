//! Planner: the registry, the catalog and resolver settings in one place.

use crate::catalog::Catalog;
use crate::compiler::{QueryCompiler, QueryPlan};
use crate::plan::Plan;
use crate::query::MasQuery;
use crate::report::{execute_with_report, RunReport};
use crate::resolver::{Derivation, PlannerConfig, Resolver};
use masplan_core::{ResourceRegistry, ResourceTuple, Result};
use std::sync::Arc;

pub struct Planner {
    registry: ResourceRegistry,
    catalog: Catalog,
    config: PlannerConfig,
}

/// Everything a solved query produced: the clause database, the proofs and
/// the plan pulled out of them.
#[derive(Debug)]
pub struct Solution {
    pub clauses: QueryPlan,
    pub derivations: Vec<(ResourceTuple, Arc<Derivation>)>,
    pub plan: Plan,
}

impl Planner {
    pub fn new(registry: ResourceRegistry, catalog: Catalog) -> Self {
        Self {
            registry,
            catalog,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn compile(&self, doc: &MasQuery) -> Result<QueryPlan> {
        QueryCompiler::new(&self.registry, &self.catalog).compile(doc)
    }

    pub fn derive(&self, db: &QueryPlan) -> Result<Vec<(ResourceTuple, Arc<Derivation>)>> {
        Resolver::new(db, self.config.clone()).derive()
    }

    pub fn resolve(&self, db: &QueryPlan) -> Result<Plan> {
        Resolver::new(db, self.config.clone()).resolve()
    }

    /// Compile, prove and linearize in one go.
    pub fn solve(&self, doc: &MasQuery) -> Result<Solution> {
        let clauses = self.compile(doc)?;
        let derivations = self.derive(&clauses)?;
        let plan = crate::resolver::linearize(&clauses, &derivations)?;
        Ok(Solution {
            clauses,
            derivations,
            plan,
        })
    }

    /// Solve, then execute the plan seeded with every query input.
    pub fn run(&self, doc: &MasQuery, label: &str) -> Result<(RunReport, Result<masplan_core::Resource>)> {
        let solution = self.solve(doc)?;
        let inputs = solution.clauses.seed();
        Ok(execute_with_report(&solution.plan, label, inputs))
    }
}
