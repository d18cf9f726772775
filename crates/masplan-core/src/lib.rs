//! masplan core - resource model, logic atoms, registry and error handling

pub mod error;
pub mod registry;
pub mod types;

pub use error::{BoxError, Error, Result};
pub use registry::ResourceRegistry;
pub use types::*;
