//! Parameter registry - per-type catalog of named, typed, defaulted values
//!
//! A `RegistryBuilder` collects parameter specs for one owning type (plus
//! anything inherited from related types) and freezes them into an immutable
//! `ParamRegistry`. Duplicate names within the owning type are a
//! configuration error; on collisions with inherited entries the first
//! occurrence wins - own entries first, then inherited registries in the
//! order they were passed to `inherit`.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{ModelError, ModelResult};
use crate::params::value::{ParamKind, ParamValue};

/// Descriptor of one registered parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Display section, stored as `"{owner}:{section}"` once registered
    pub section: String,
    pub name: String,
    pub kind: ParamKind,
    pub default: ParamValue,
    pub description: String,
    /// Short name of the type that registered this parameter
    pub owner: String,
}

impl ParamSpec {
    /// New spec in section `"main"` with the kind inferred from the default.
    pub fn new(name: impl Into<String>, default: impl Into<ParamValue>) -> Self {
        let default = default.into();
        Self {
            section: "main".to_string(),
            name: name.into(),
            kind: default.kind(),
            default,
            description: String::new(),
            owner: String::new(),
        }
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Override the inferred kind (e.g. an `Int` parameter whose default
    /// happens to be written as a float).
    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Immutable, ordered catalog of parameter specs for one type
#[derive(Debug, Clone, Default)]
pub struct ParamRegistry {
    specs: Vec<ParamSpec>,
    index: HashMap<String, usize>,
}

impl ParamRegistry {
    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn default_of(&self, name: &str) -> Option<&ParamValue> {
        self.spec(name).map(|spec| &spec.default)
    }

    pub fn kind_of(&self, name: &str) -> Option<ParamKind> {
        self.spec(name).map(|spec| spec.kind)
    }

    /// Specs in registration order (own entries before inherited ones).
    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Builder for a type's parameter registry
#[derive(Debug)]
pub struct RegistryBuilder {
    owner: String,
    own: Vec<ParamSpec>,
    inherited: Vec<ParamSpec>,
}

impl RegistryBuilder {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            own: Vec::new(),
            inherited: Vec::new(),
        }
    }

    /// Register one parameter for the owning type. Registering the same name
    /// twice for the same owner is a configuration error.
    pub fn param(mut self, mut spec: ParamSpec) -> ModelResult<Self> {
        if let Some(existing) = self.own.iter().find(|p| p.name == spec.name) {
            return Err(ModelError::configuration(format!(
                "parameter '{}' already defined in {}",
                spec.name, existing.owner
            )));
        }
        spec.owner = self.owner.clone();
        spec.section = format!("{}:{}", self.owner, spec.section);
        self.own.push(spec);
        Ok(self)
    }

    /// Merge another type's registry. Entries whose names are already taken
    /// (by own entries or an earlier `inherit`) lose to the first occurrence.
    pub fn inherit(mut self, parent: &ParamRegistry) -> Self {
        self.inherited.extend(parent.iter().cloned());
        self
    }

    /// Freeze into an immutable registry.
    pub fn build(self) -> ParamRegistry {
        let mut specs = Vec::new();
        let mut index = HashMap::new();
        for spec in self.own.into_iter().chain(self.inherited) {
            if index.contains_key(&spec.name) {
                continue;
            }
            index.insert(spec.name.clone(), specs.len());
            specs.push(spec);
        }
        ParamRegistry { specs, index }
    }
}

/// Last path segment of a type name, used as the registry owner label and
/// the `class_name` of version counters. Generic arguments are dropped, so
/// every instantiation of a generic type shares one label.
pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_registry() -> ParamRegistry {
        RegistryBuilder::new("BaseRecord")
            .param(ParamSpec::new("retries", 3i64).description("attempts before giving up"))
            .unwrap()
            .param(ParamSpec::new("timeout", 30.0).section("limits"))
            .unwrap()
            .build()
    }

    #[test]
    fn test_spec_defaults() {
        let spec = ParamSpec::new("enabled", true);
        assert_eq!(spec.section, "main");
        assert_eq!(spec.kind, ParamKind::Bool);
        assert_eq!(spec.default, ParamValue::Bool(true));
    }

    #[test]
    fn test_registered_section_is_owner_prefixed() {
        let registry = base_registry();
        assert_eq!(registry.spec("retries").unwrap().section, "BaseRecord:main");
        assert_eq!(registry.spec("timeout").unwrap().section, "BaseRecord:limits");
    }

    #[test]
    fn test_duplicate_name_is_a_configuration_error() {
        let result = RegistryBuilder::new("BaseRecord")
            .param(ParamSpec::new("retries", 3i64))
            .unwrap()
            .param(ParamSpec::new("retries", 5i64));
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_inherit_merges_with_first_occurrence_winning() {
        let base = base_registry();
        let registry = RegistryBuilder::new("ChildRecord")
            .param(ParamSpec::new("retries", 10i64))
            .unwrap()
            .param(ParamSpec::new("batch_size", 500i64))
            .unwrap()
            .inherit(&base)
            .build();

        // one descriptor per name, own registration shadows the inherited one
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.default_of("retries"),
            Some(&ParamValue::Int(10))
        );
        assert_eq!(registry.spec("retries").unwrap().owner, "ChildRecord");
        // inherited entry kept untouched
        assert_eq!(registry.spec("timeout").unwrap().owner, "BaseRecord");
    }

    #[test]
    fn test_inherit_order_resolves_cross_parent_collisions() {
        let first = RegistryBuilder::new("First")
            .param(ParamSpec::new("mode", "fast"))
            .unwrap()
            .build();
        let second = RegistryBuilder::new("Second")
            .param(ParamSpec::new("mode", "safe"))
            .unwrap()
            .build();

        let registry = RegistryBuilder::new("Child")
            .inherit(&first)
            .inherit(&second)
            .build();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.spec("mode").unwrap().owner, "First");
    }

    #[test]
    fn test_explicit_kind_override() {
        let registry = RegistryBuilder::new("BaseRecord")
            .param(ParamSpec::new("threshold", 1.0).kind(ParamKind::Float))
            .unwrap()
            .build();
        assert_eq!(registry.kind_of("threshold"), Some(ParamKind::Float));
        assert_eq!(registry.kind_of("missing"), None);
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<ParamRegistry>(), "ParamRegistry");
        assert_eq!(short_type_name::<String>(), "String");
    }

    #[test]
    fn test_short_type_name_drops_generic_arguments() {
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
        assert_eq!(short_type_name::<Option<Vec<i64>>>(), "Option");
        assert_eq!(
            short_type_name::<HashMap<String, Vec<u8>>>(),
            "HashMap"
        );
    }
}
