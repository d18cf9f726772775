//! Error types for masplan

use thiserror::Error;

/// Boxed failure returned by task work-functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    // -- registry / catalog --
    #[error("unknown resource alias: {0}")]
    UnknownAlias(String),

    #[error("alias already registered: {0}")]
    DuplicateAlias(String),

    #[error("resource type {name} already registered under alias {alias}")]
    DuplicateResourceType { name: String, alias: String },

    #[error("task already registered: {0}")]
    DuplicateTask(String),

    #[error("descriptor already registered: {0}")]
    DuplicateDescriptor(String),

    // -- query compilation --
    #[error("input {alias}_{id} declares no args")]
    EmptyArguments { alias: String, id: u32 },

    #[error("invalid args for {alias}: {reason}")]
    InvalidArguments { alias: String, reason: String },

    #[error("alias {alias} referenced by {context} is not registered")]
    UnresolvedAlias { alias: String, context: String },

    #[error("instance id 0 is reserved for the wildcard ({context})")]
    ReservedInstanceId { context: String },

    #[error("descriptor {descriptor} on {resource}: expected {expected}, found {found}")]
    DescriptorTypeMismatch {
        descriptor: String,
        resource: String,
        expected: String,
        found: String,
    },

    #[error("query document error: {0}")]
    Document(String),

    // -- resolution --
    #[error("no derivation for {0}")]
    UnderivableResource(String),

    #[error("cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("output {output} is unreachable: no derivation for {atom}")]
    OutputUnreachable { output: String, atom: String },

    #[error("proof of {atom} exceeded depth limit {limit}")]
    DepthLimitExceeded { atom: String, limit: usize },

    // -- execution --
    #[error("plan type mismatch at step {step} ({task}): expects {expected}, found {found}")]
    PlanTypeMismatch {
        step: usize,
        task: String,
        expected: String,
        found: String,
    },

    #[error("plan has no tasks")]
    EmptyPlan,

    #[error("task {task} failed: {source}")]
    TaskExecution {
        task: String,
        #[source]
        source: BoxError,
    },

    #[error("type mismatch for {task}: expected {expected}, got {found}")]
    TypeMismatch {
        task: String,
        expected: String,
        found: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn unknown_alias(alias: impl Into<String>) -> Self {
        Self::UnknownAlias(alias.into())
    }

    pub fn unresolved_alias(alias: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnresolvedAlias {
            alias: alias.into(),
            context: context.into(),
        }
    }

    pub fn reserved_id(context: impl Into<String>) -> Self {
        Self::ReservedInstanceId {
            context: context.into(),
        }
    }

    pub fn task_execution(task: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::TaskExecution {
            task: task.into(),
            source: source.into(),
        }
    }

    pub fn type_mismatch(
        task: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            task: task.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Failures raised while compiling a query document against the catalog.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAlias(_)
                | Self::EmptyArguments { .. }
                | Self::InvalidArguments { .. }
                | Self::UnresolvedAlias { .. }
                | Self::ReservedInstanceId { .. }
                | Self::DescriptorTypeMismatch { .. }
                | Self::Document(_)
        )
    }

    /// Failures raised by proof search.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnderivableResource(_)
                | Self::CyclicDependency { .. }
                | Self::OutputUnreachable { .. }
                | Self::DepthLimitExceeded { .. }
        )
    }
}
