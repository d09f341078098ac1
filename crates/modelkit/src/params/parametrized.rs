//! Parametrized records - a persisted key/value document validated against
//! the owning type's registry
//!
//! The document lives in a JSON column (`ParamSet` serializes transparently
//! to that column's value). Reads go through a lazily parsed, typed view of
//! the document; writes validate name and kind against the registry, rewrite
//! the document, and drop the cached view so the next read reparses.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::lazy::{CacheSlot, LazyCache};
use crate::params::registry::{short_type_name, ParamRegistry, RegistryBuilder};
use crate::params::value::{ParamKind, ParamValue};

/// Cache slots of a `ParamSet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSlot {
    /// The parsed, typed view of the raw document
    Parsed,
}

impl CacheSlot for ParamSlot {
    fn name(&self) -> &'static str {
        match self {
            ParamSlot::Parsed => "parsed_parameters",
        }
    }
}

type ParsedParams = HashMap<String, ParamValue>;

/// The persisted parameter document plus its lazily parsed view.
///
/// Embed this as a model field backed by a JSON column; it serializes to the
/// raw document and deserializes with a cold cache.
#[derive(Debug, Clone)]
pub struct ParamSet {
    raw: Value,
    cache: LazyCache<ParamSlot>,
}

impl ParamSet {
    /// Empty document.
    pub fn new() -> Self {
        Self::from_raw(Value::Object(serde_json::Map::new()))
    }

    /// Wrap a raw document as loaded from the database. `null` is treated as
    /// an empty document; any other non-object payload fails on first parse.
    pub fn from_raw(raw: Value) -> Self {
        Self {
            raw,
            cache: LazyCache::new(),
        }
    }

    /// The raw document as it would be persisted.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// The parsed view, computed on first access and cached until a write
    /// invalidates it.
    fn parsed(&mut self) -> ModelResult<&ParsedParams> {
        let raw = self.raw.clone();
        self.cache
            .get_or_compute(ParamSlot::Parsed, move || parse_document(&raw))
    }

    /// Value for `name`: document entry if present, else the registered
    /// default, else `None`.
    pub fn get(&mut self, registry: &ParamRegistry, name: &str) -> ModelResult<Option<ParamValue>> {
        self.get_or(registry, name, None)
    }

    /// Value for `name` with a caller-supplied fallback taking precedence
    /// over the registered default (document > fallback > registered).
    pub fn get_or(
        &mut self,
        registry: &ParamRegistry,
        name: &str,
        fallback: Option<ParamValue>,
    ) -> ModelResult<Option<ParamValue>> {
        if let Some(value) = self.parsed()?.get(name) {
            return Ok(Some(value.clone()));
        }
        Ok(fallback.or_else(|| registry.default_of(name).cloned()))
    }

    /// Assign `value` to `name`. Fails with a validation error when the name
    /// is not registered or the value's kind does not match the registered
    /// kind; failures leave the document unchanged.
    pub fn set(
        &mut self,
        registry: &ParamRegistry,
        name: &str,
        value: ParamValue,
    ) -> ModelResult<()> {
        let spec = registry.spec(name).ok_or_else(|| {
            ModelError::validation(format!("parameter '{}' is not registered", name))
        })?;
        if value.kind() != spec.kind {
            return Err(ModelError::validation(format!(
                "value '{}' for parameter '{}' has kind {}, registered kind is {}",
                value,
                name,
                value.kind(),
                spec.kind
            )));
        }

        let mut updated = self.parsed()?.clone();
        updated.insert(name.to_string(), value);

        let mut document = serde_json::Map::new();
        for (key, entry) in &updated {
            document.insert(key.clone(), entry.to_json());
        }
        self.raw = Value::Object(document);
        self.cache.invalidate(ParamSlot::Parsed);
        Ok(())
    }

    /// Drop the cached parsed view; the next read reparses the document.
    pub fn invalidate(&mut self) {
        self.cache.invalidate_all();
    }
}

impl Default for ParamSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ParamSet {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Serialize for ParamSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ParamSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(ParamSet::from_raw(Value::deserialize(deserializer)?))
    }
}

fn parse_document(raw: &Value) -> ModelResult<ParsedParams> {
    match raw {
        Value::Null => Ok(HashMap::new()),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| (key.clone(), ParamValue::from_json(value.clone())))
            .collect()),
        other => Err(ModelError::validation(format!(
            "parameter document must be a JSON object, got {}",
            other
        ))),
    }
}

/// Types carrying a registered parameter document.
pub trait Parametrized: Sized + 'static {
    /// Register this type's parameters (and inherit related registries).
    /// Runs once per process; the built registry is immutable afterwards.
    fn define_parameters(builder: RegistryBuilder) -> ModelResult<RegistryBuilder>;

    fn params(&self) -> &ParamSet;

    fn params_mut(&mut self) -> &mut ParamSet;

    /// The type's registry, built on first use and cached process-wide.
    fn registered_parameters() -> ModelResult<Arc<ParamRegistry>> {
        registry_for::<Self>()
    }

    /// Registered default for `name`, if any.
    fn parameter_default(name: &str) -> ModelResult<Option<ParamValue>> {
        Ok(Self::registered_parameters()?.default_of(name).cloned())
    }

    /// Registered kind for `name`, if any.
    fn parameter_kind(name: &str) -> ModelResult<Option<ParamKind>> {
        Ok(Self::registered_parameters()?.kind_of(name))
    }

    fn get_param(&mut self, name: &str) -> ModelResult<Option<ParamValue>> {
        let registry = Self::registered_parameters()?;
        self.params_mut().get(&registry, name)
    }

    fn get_param_or(
        &mut self,
        name: &str,
        fallback: Option<ParamValue>,
    ) -> ModelResult<Option<ParamValue>> {
        let registry = Self::registered_parameters()?;
        self.params_mut().get_or(&registry, name, fallback)
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()> {
        let registry = Self::registered_parameters()?;
        self.params_mut().set(&registry, name, value)
    }
}

// Process-wide table of built registries, keyed by the owning type. Built
// registries are never recomputed or torn down.
static REGISTRIES: Lazy<DashMap<TypeId, Arc<ParamRegistry>>> = Lazy::new(DashMap::new);

/// Look up (building on first use) the registry for `T`.
pub fn registry_for<T: Parametrized>() -> ModelResult<Arc<ParamRegistry>> {
    if let Some(existing) = REGISTRIES.get(&TypeId::of::<T>()) {
        return Ok(Arc::clone(&existing));
    }

    // Built outside the map entry so a nested lookup (inheriting another
    // type's registry) cannot deadlock on the same shard.
    let builder = T::define_parameters(RegistryBuilder::new(short_type_name::<T>()))?;
    let registry = Arc::new(builder.build());

    let entry = REGISTRIES
        .entry(TypeId::of::<T>())
        .or_insert_with(|| Arc::clone(&registry));
    Ok(Arc::clone(entry.value()))
}
