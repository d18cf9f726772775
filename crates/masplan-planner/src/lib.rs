//! masplan planner - compiles MASQuery documents into Horn clauses, proves
//! the requested outputs by backward chaining and executes the resulting plan.

pub mod catalog;
pub mod clause;
pub mod compiler;
pub mod plan;
pub mod planner;
pub mod query;
pub mod report;
pub mod resolver;

pub use catalog::{Catalog, DependentTask, Descriptor, StepKind, Task, Work};
pub use clause::{ClauseKind, HornClause};
pub use compiler::{QueryCompiler, QueryPlan};
pub use plan::{Plan, PlanStep, StepEvent};
pub use planner::{Planner, Solution};
pub use query::{DescriptorSpec, Entry, InputSpec, MasQuery, RefSpec, ResourceSpec};
pub use report::{execute_with_report, Outcome, RunReport, StepRecord, StepState};
pub use resolver::{linearize, Derivation, PlannerConfig, Resolver};
