//! Declarative schema
//!
//! Describes the attributes a provider, resource or data source accepts.
//! Schemas are built once when the registry is constructed and are shared
//! read-only afterwards.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Kind of value an attribute holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    Bool,
    /// Ordered list of strings
    StringList,
}

impl AttributeType {
    /// Check whether a JSON value fits this attribute type.
    /// `null` is accepted for every type and means "unset".
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (AttributeType::String, Value::String(_)) => true,
            (AttributeType::Int, Value::Number(n)) => n.is_i64(),
            (AttributeType::Bool, Value::Bool(_)) => true,
            (AttributeType::StringList, Value::Array(items)) => items.iter().all(Value::is_string),
            _ => false,
        }
    }

    /// Zero value written when the remote side has nothing for this attribute
    pub fn zero(&self) -> Value {
        match self {
            AttributeType::String => Value::String(String::new()),
            AttributeType::Int => Value::from(0),
            AttributeType::Bool => Value::Bool(false),
            AttributeType::StringList => Value::Array(Vec::new()),
        }
    }
}

/// A single schema attribute
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub ty: AttributeType,
    pub required: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value requires replacing the remote object
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Environment variable consulted when the value is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_default: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl Attribute {
    fn new(ty: AttributeType, required: bool) -> Self {
        Self {
            ty,
            required,
            computed: false,
            sensitive: false,
            force_new: false,
            default: None,
            env_default: None,
            description: None,
        }
    }

    pub fn required_string() -> Self {
        Self::new(AttributeType::String, true)
    }

    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, false)
    }

    pub fn required_list() -> Self {
        Self::new(AttributeType::StringList, true)
    }

    pub fn optional_list() -> Self {
        Self::new(AttributeType::StringList, false)
    }

    pub fn optional_int() -> Self {
        Self::new(AttributeType::Int, false)
    }

    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, false)
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn env_default(mut self, var: &'static str) -> Self {
        self.env_default = Some(var);
        self
    }

    pub fn description(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }

    /// Resolve the value to use when the attribute is absent from input
    pub fn resolve_default(&self) -> Option<Value> {
        if let Some(var) = self.env_default {
            if let Ok(value) = std::env::var(var) {
                return match self.ty {
                    AttributeType::Bool => Some(Value::Bool(matches!(
                        value.to_ascii_lowercase().as_str(),
                        "1" | "true" | "yes"
                    ))),
                    AttributeType::Int => value.parse::<i64>().ok().map(Value::from),
                    _ => Some(Value::String(value)),
                };
            }
        }
        self.default.clone()
    }
}

/// Attribute set of a provider, resource or data source
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Names of required attributes
    pub fn required(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.required)
            .map(|(name, _)| *name)
    }

    /// Names of attributes that cannot be updated in place
    pub fn force_new(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.force_new)
            .map(|(name, _)| *name)
    }
}

/// Full schema exposed by the provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: BTreeMap<&'static str, Schema>,
    pub data_sources: BTreeMap<&'static str, Schema>,
}
