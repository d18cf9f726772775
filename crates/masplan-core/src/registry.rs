//! Resource Type Registry: binds human-facing aliases to resource types.
//!
//! Every type is registered exactly once, under exactly one alias, so the
//! atom `alias_id` is injective over (type, id) pairs.

use crate::error::{Error, Result};
use crate::types::{Resource, ResourceTuple, ResourceType, TypeAlias};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Default, Clone, Debug)]
pub struct ResourceRegistry {
    types: HashMap<TypeAlias, ResourceType>,
    /// Registration order, for listing.
    order: Vec<TypeAlias>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, alias: impl Into<TypeAlias>, ty: ResourceType) -> Result<()> {
        let alias = alias.into();
        if self.types.contains_key(&alias) {
            return Err(Error::DuplicateAlias(alias.to_string()));
        }
        if let Some((existing, _)) = self.types.iter().find(|(_, t)| t.name == ty.name) {
            return Err(Error::DuplicateResourceType {
                name: ty.name,
                alias: existing.to_string(),
            });
        }
        tracing::debug!(alias = %alias, name = %ty.name, "registered resource type");
        self.order.push(alias.clone());
        self.types.insert(alias, ty);
        Ok(())
    }

    pub fn resolve(&self, alias: &str) -> Result<&ResourceType> {
        self.types
            .get(&TypeAlias::from(alias))
            .ok_or_else(|| Error::unknown_alias(alias))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.types.contains_key(&TypeAlias::from(alias))
    }

    /// Canonical atom string for a tuple: `alias_id`, wildcard as `alias_0`.
    pub fn atom_for(&self, tuple: &ResourceTuple) -> String {
        tuple.to_string()
    }

    /// Build a resource value from query `args`, checking the declared fields.
    pub fn instantiate(&self, alias: &str, args: &Map<String, Value>) -> Result<Resource> {
        let ty = self.resolve(alias)?;
        if let Some(missing) = ty.fields.iter().find(|f| !args.contains_key(f.as_str())) {
            return Err(Error::InvalidArguments {
                alias: alias.to_string(),
                reason: format!("missing field '{}' required by {}", missing, ty.name),
            });
        }
        Ok(Resource {
            ty: TypeAlias::from(alias),
            fields: args.clone(),
        })
    }

    /// Registered (alias, type) pairs in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&TypeAlias, &ResourceType)> {
        self.order.iter().filter_map(|a| self.types.get(a).map(|t| (a, t)))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InstanceId;

    fn registry() -> ResourceRegistry {
        let mut reg = ResourceRegistry::new();
        reg.register("topic", ResourceType::new("Topic").with_field("topic"))
            .unwrap();
        reg.register("sentence", ResourceType::new("Sentence")).unwrap();
        reg
    }

    #[test]
    fn duplicate_alias_rejected() {
        let mut reg = registry();
        let err = reg
            .register("topic", ResourceType::new("Other"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateAlias(a) if a == "topic"));
    }

    #[test]
    fn same_type_under_second_alias_rejected() {
        let mut reg = registry();
        let err = reg
            .register("subject", ResourceType::new("Topic"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateResourceType { .. }));
    }

    #[test]
    fn resolve_unknown_alias() {
        let reg = registry();
        assert!(matches!(reg.resolve("recipe"), Err(Error::UnknownAlias(_))));
        assert_eq!(reg.resolve("topic").unwrap().name, "Topic");
    }

    #[test]
    fn atom_for_is_alias_underscore_id() {
        let reg = registry();
        let one = ResourceTuple::concrete("topic", InstanceId::new(1).unwrap());
        assert_eq!(reg.atom_for(&one), "topic_1");
        assert_eq!(reg.atom_for(&one.generalize()), "topic_0");
    }

    #[test]
    fn instantiate_checks_fields() {
        let reg = registry();
        let mut args = Map::new();
        assert!(matches!(
            reg.instantiate("topic", &args),
            Err(Error::InvalidArguments { .. })
        ));
        args.insert("topic".into(), "cats".into());
        let r = reg.instantiate("topic", &args).unwrap();
        assert_eq!(r.get_str("topic"), Some("cats"));
    }

    #[test]
    fn entries_keep_registration_order() {
        let reg = registry();
        let aliases: Vec<&str> = reg.entries().map(|(a, _)| a.as_str()).collect();
        assert_eq!(aliases, vec!["topic", "sentence"]);
    }
}
