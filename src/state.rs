//! Declarative state
//!
//! `ResourceData` holds the field values of one resource instance together
//! with its identity. Every write is checked against the schema, so a
//! mapper can never leave a field holding a value of the wrong kind.

use crate::error::ProviderError;
use crate::schema::Schema;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key under which the identity travels in serialized state
pub const ID_KEY: &str = "id";

/// Field values plus identity of one resource instance
#[derive(Debug, Clone)]
pub struct ResourceData {
    schema: Arc<Schema>,
    values: BTreeMap<String, Value>,
    id: Option<String>,
}

impl PartialEq for ResourceData {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.id == other.id
    }
}

impl ResourceData {
    /// Empty state for the given schema
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
            id: None,
        }
    }

    /// Build state from a JSON object, validating every field.
    ///
    /// An `id` key, when present and non-empty, becomes the identity.
    /// Absent attributes with a default (env or literal) take it.
    pub fn from_json(schema: Arc<Schema>, value: Value) -> Result<Self, ProviderError> {
        let object = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProviderError::InvalidState(format!(
                    "expected an object, got {}",
                    other
                )))
            }
        };

        let mut data = Self::new(schema);
        for (key, value) in object {
            if key == ID_KEY {
                data.id = value.as_str().filter(|s| !s.is_empty()).map(str::to_string);
                continue;
            }
            data.set(&key, value)
                .map_err(|e| ProviderError::InvalidState(e.to_string()))?;
        }

        let defaults: Vec<(&'static str, Value)> = data
            .schema
            .attributes
            .iter()
            .filter(|(name, _)| !data.values.contains_key(**name))
            .filter_map(|(name, attr)| attr.resolve_default().map(|v| (*name, v)))
            .collect();
        for (name, value) in defaults {
            data.values.insert(name.to_string(), value);
        }

        Ok(data)
    }

    /// Check that every required attribute carries a value
    pub fn validate_required(&self) -> Result<(), ProviderError> {
        let missing: Vec<&str> = self
            .schema
            .required()
            .filter(|name| self.get(name).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::InvalidState(format!(
                "missing required attribute(s): {}",
                missing.join(", ")
            )))
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Set a field. Fails on unknown fields and on type mismatches.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ProviderError> {
        let value = value.into();
        let Some(attr) = self.schema.attribute(key) else {
            return Err(ProviderError::Mapping(format!(
                "Invalid address to set: {:?}",
                key
            )));
        };
        if !attr.ty.accepts(&value) {
            return Err(ProviderError::Mapping(format!(
                "{}: expected {:?}, got {}",
                key, attr.ty, value
            )));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Raw value of a field; `None` when unset or null
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// String field; empty strings count as unset
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// List field; `None` when unset, possibly empty otherwise
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Drop the identity; the host treats the object as gone
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// Attributes whose value differs from `prior`
    pub fn changed_keys(&self, prior: &ResourceData) -> Vec<&'static str> {
        self.schema
            .attributes
            .keys()
            .copied()
            .filter(|key| normalized(self.get(key)) != normalized(prior.get(key)))
            .collect()
    }

    pub fn has_change(&self, prior: &ResourceData, key: &str) -> bool {
        normalized(self.get(key)) != normalized(prior.get(key))
    }

    /// Fill computed attributes left unset with their value from `prior`.
    /// An unconfigured computed attribute keeps whatever the server chose.
    pub fn carry_computed(&mut self, prior: &ResourceData) {
        let carried: Vec<(&'static str, Value)> = self
            .schema
            .attributes
            .iter()
            .filter(|(_, attr)| attr.computed)
            .filter(|(key, _)| normalized(self.get(key)).is_none())
            .filter_map(|(key, _)| normalized(prior.get(key)).map(|v| (*key, v.clone())))
            .collect();

        for (key, value) in carried {
            self.values.insert(key.to_string(), value);
        }
    }

    /// Serialize to a JSON object including the identity
    pub fn to_json(&self) -> Value {
        let mut map: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert(
            ID_KEY.to_string(),
            self.id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        Value::Object(map)
    }
}

/// Treat empty strings and empty lists like unset when comparing
fn normalized(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    })
}
