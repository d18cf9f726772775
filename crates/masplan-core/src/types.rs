//! Core types for masplan: resource types, instances, tuples and logic atoms.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Alias a resource type is registered under (e.g. `topic`) - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TypeAlias(Arc<str>);

impl TypeAlias {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TypeAlias {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TypeAlias {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<TypeAlias> for String {
    fn from(alias: TypeAlias) -> Self {
        alias.0.to_string()
    }
}

/// A named, schema-bearing kind of data.
///
/// `fields` lists the argument keys an instance must carry when it is built
/// from a query document. The payload itself stays opaque to the planner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }
}

/// Concrete instance id. Zero is not representable: it is the wildcard,
/// modelled as `None` in [`ResourceTuple`].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(NonZeroU32);

impl InstanceId {
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// Like [`InstanceId::new`], but reports a written `0` as an error.
    pub fn parse(id: u32, context: impl Into<String>) -> Result<Self> {
        Self::new(id).ok_or_else(|| Error::reserved_id(context))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// (type, id) pair. `id == None` is the wildcard "any instance of this type".
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ResourceTuple {
    pub ty: TypeAlias,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InstanceId>,
}

impl ResourceTuple {
    pub fn concrete(ty: impl Into<TypeAlias>, id: InstanceId) -> Self {
        Self {
            ty: ty.into(),
            id: Some(id),
        }
    }

    pub fn wildcard(ty: impl Into<TypeAlias>) -> Self {
        Self {
            ty: ty.into(),
            id: None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.id.is_none()
    }

    /// The wildcard tuple of the same type.
    pub fn generalize(&self) -> Self {
        Self::wildcard(self.ty.clone())
    }

    /// Numeric id as written in atoms; the wildcard renders as 0.
    pub fn raw_id(&self) -> u32 {
        self.id.map_or(0, InstanceId::get)
    }
}

impl fmt::Display for ResourceTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.ty, self.raw_id())
    }
}

/// Unit of proof in the clause database.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Atom {
    /// `topic_1`
    Resource(ResourceTuple),
    /// `descriptor(recipe_2)`
    Property {
        predicate: String,
        subject: ResourceTuple,
    },
    /// `all_dependencies(recipe_2)`
    AllDependencies(ResourceTuple),
}

impl Atom {
    pub const ALL_DEPENDENCIES: &'static str = "all_dependencies";

    pub fn resource(tuple: ResourceTuple) -> Self {
        Self::Resource(tuple)
    }

    pub fn property(predicate: impl Into<String>, subject: ResourceTuple) -> Self {
        Self::Property {
            predicate: predicate.into(),
            subject,
        }
    }

    /// The resource tuple this atom talks about.
    pub fn subject(&self) -> &ResourceTuple {
        match self {
            Self::Resource(t) | Self::AllDependencies(t) => t,
            Self::Property { subject, .. } => subject,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceTuple> {
        match self {
            Self::Resource(t) => Some(t),
            _ => None,
        }
    }
}

impl From<ResourceTuple> for Atom {
    fn from(tuple: ResourceTuple) -> Self {
        Self::Resource(tuple)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(t) => write!(f, "{}", t),
            Self::Property { predicate, subject } => write!(f, "{}({})", predicate, subject),
            Self::AllDependencies(t) => write!(f, "{}({})", Self::ALL_DEPENDENCIES, t),
        }
    }
}

/// A value of some resource type. The payload is an opaque field map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub ty: TypeAlias,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Resource {
    pub fn new(ty: impl Into<TypeAlias>) -> Self {
        Self {
            ty: ty.into(),
            fields: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Overlay another value's fields onto this one (descriptor annotation).
    pub fn annotate(&mut self, other: Resource) {
        self.fields.extend(other.fields);
    }
}
