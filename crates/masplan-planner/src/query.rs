//! MASQuery document: the declarative request a query is compiled from.
//!
//! ```yaml
//! input:
//!   - topic: {id: 1, args: {topic: cats}}
//! resources:
//!   - recipe:
//!       id: 2
//!       descriptors:
//!         ingredients: {params: {source: {topic: {id: 1}}}}
//!       dependencies:
//!         - topic: {id: 1}
//! output:
//!   - recipe: {id: 2}
//! ```
//!
//! Every section is an ordered list of single-key maps. Map order is kept as
//! written, since it fixes clause and plan order.

use masplan_core::{Error, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MasQuery {
    #[serde(default)]
    pub input: Vec<Entry<InputSpec>>,
    #[serde(default)]
    pub resources: Vec<Entry<ResourceSpec>>,
    #[serde(default)]
    pub output: Vec<Entry<RefSpec>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputSpec {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Ordered::is_empty")]
    pub descriptors: Ordered<DescriptorSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Entry<RefSpec>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DescriptorSpec {
    /// role -> referenced resource
    #[serde(default)]
    pub params: Ordered<Entry<RefSpec>>,
}

/// `{id: N}` reference to a resource declared elsewhere in the query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefSpec {
    pub id: u32,
}

/// A single-key map `{alias: spec}`.
#[derive(Clone, Debug)]
pub struct Entry<V> {
    pub alias: String,
    pub spec: V,
}

impl<V> Entry<V> {
    pub fn new(alias: impl Into<String>, spec: V) -> Self {
        Self {
            alias: alias.into(),
            spec,
        }
    }
}

impl<V: Serialize> Serialize for Entry<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.alias, &self.spec)?;
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entry<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntryVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntryVisitor<V> {
            type Value = Entry<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a single-key map {alias: {...}}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Entry<V>, A::Error> {
                let (alias, spec) = map
                    .next_entry::<String, V>()?
                    .ok_or_else(|| de::Error::custom("empty entry, expected {alias: {...}}"))?;
                if let Some(extra) = map.next_key::<String>()? {
                    return Err(de::Error::custom(format!(
                        "entry '{}' has a second key '{}'; write one alias per list item",
                        alias, extra
                    )));
                }
                Ok(Entry { alias, spec })
            }
        }

        deserializer.deserialize_map(EntryVisitor(PhantomData))
    }
}

/// A map whose key order is preserved as written.
#[derive(Clone, Debug)]
pub struct Ordered<V>(pub Vec<(String, V)>);

impl<V> Default for Ordered<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> Ordered<V> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }
}

impl<V: Serialize> Serialize for Ordered<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Ordered<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = Ordered<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Ordered<V>, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, V>()? {
                    if entries.iter().any(|(existing, _): &(String, V)| existing == &k) {
                        return Err(de::Error::custom(format!("duplicate key '{}'", k)));
                    }
                    entries.push((k, v));
                }
                Ok(Ordered(entries))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Ordered<V>, E> {
                Ok(Ordered(Vec::new()))
            }
        }

        deserializer.deserialize_any(OrderedVisitor(PhantomData))
    }
}

impl MasQuery {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Document(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Document(e.to_string()))
    }

    /// Load a document, picking the format from the file extension
    /// (`.json` is JSON, anything else YAML).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let doc = if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }?;
        tracing::debug!(
            path = %path.display(),
            inputs = doc.input.len(),
            resources = doc.resources.len(),
            outputs = doc.output.len(),
            "loaded query document"
        );
        Ok(doc)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Document(e.to_string()))
    }

    // -- builder helpers, mostly for programmatic queries and tests --

    pub fn with_input(mut self, alias: &str, id: u32, args: Map<String, Value>) -> Self {
        self.input.push(Entry::new(
            alias,
            InputSpec {
                id,
                args: Some(args),
            },
        ));
        self
    }

    pub fn with_resource(mut self, alias: &str, spec: ResourceSpec) -> Self {
        self.resources.push(Entry::new(alias, spec));
        self
    }

    pub fn with_output(mut self, alias: &str, id: u32) -> Self {
        self.output.push(Entry::new(alias, RefSpec { id }));
        self
    }
}

impl ResourceSpec {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Add a descriptor whose params are `(role, alias, id)` references.
    pub fn describe(mut self, descriptor: &str, params: &[(&str, &str, u32)]) -> Self {
        let mut spec = DescriptorSpec::default();
        for (role, alias, id) in params {
            spec.params
                .insert(*role, Entry::new(*alias, RefSpec { id: *id }));
        }
        self.descriptors.insert(descriptor, spec);
        self
    }

    pub fn depends_on(mut self, alias: &str, id: u32) -> Self {
        self.dependencies.push(Entry::new(alias, RefSpec { id }));
        self
    }
}
