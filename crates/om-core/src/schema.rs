//! # Request Schemas
//!
//! Declarative field lists describing what the configurator accepts for
//! each resource. [`Schema::shape`] turns loosely typed form input into a
//! request body: unknown fields are dropped (unless the schema is open),
//! absent optional fields are omitted, required fields are enforced and
//! common coercions are applied.

use crate::model::{ObjectKey, ResourceKind, DEFAULT_GROUP};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Value type expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// A single `{name, group}` object key.
    Key,
    /// A list of object keys.
    Keys,
    Any,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "a string",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Array => "an array",
            Self::Object => "an object",
            Self::Key => "an object key",
            Self::Keys => "a list of object keys",
            Self::Any => "any value",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required field `{0}`")]
    Missing(String),
    #[error("field `{field}` expects {expected}")]
    Type { field: String, expected: FieldType },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
        }
    }
}

/// The accepted fields of one request body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    open: bool,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            open: false,
        }
    }

    /// Let fields outside the list pass through untouched.
    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Adds a field unless one with the same name is already declared.
    pub fn with_field(mut self, spec: FieldSpec) -> Self {
        if self.field(&spec.name).is_none() {
            self.fields.push(spec);
        }
        self
    }

    /// Widens the schema with the optional fields a service advertises.
    pub fn extend(mut self, definitions: &[SettingDefinition]) -> Self {
        for def in definitions {
            self = self.with_field(FieldSpec::optional(def.key.clone(), def.field_type()));
        }
        self
    }

    /// Builds a request body from `params`.
    pub fn shape(&self, params: &Map<String, Value>) -> Result<Map<String, Value>, SchemaError> {
        let mut body = Map::new();

        for spec in &self.fields {
            match params.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(SchemaError::Missing(spec.name.clone()));
                    }
                }
                Some(value) => {
                    body.insert(spec.name.clone(), coerce(spec, value)?);
                }
            }
        }

        if self.open {
            for (name, value) in params {
                if value.is_null() || body.contains_key(name) || self.field(name).is_some() {
                    continue;
                }
                body.insert(name.clone(), value.clone());
            }
        }

        Ok(body)
    }
}

fn coerce(spec: &FieldSpec, value: &Value) -> Result<Value, SchemaError> {
    let mismatch = || SchemaError::Type {
        field: spec.name.clone(),
        expected: spec.ty,
    };

    match (spec.ty, value) {
        (FieldType::Any, v) => Ok(v.clone()),

        (FieldType::String, Value::String(_)) => Ok(value.clone()),
        (FieldType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),

        (FieldType::Number, Value::Number(_)) => Ok(value.clone()),
        (FieldType::Number, Value::String(s)) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(Value::from(i))
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(mismatch)
            }
        }

        (FieldType::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (FieldType::Boolean, Value::String(s)) => match s.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },

        (FieldType::Array, Value::Array(_)) => Ok(value.clone()),
        (FieldType::Array, Value::String(s)) => Ok(Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),

        (FieldType::Object, Value::Object(_)) => Ok(value.clone()),

        (FieldType::Key, v) => coerce_key(v).ok_or_else(mismatch),

        (FieldType::Keys, Value::Array(items)) => items
            .iter()
            .map(|item| coerce_key(item).ok_or_else(mismatch))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (FieldType::Keys, v @ (Value::String(_) | Value::Object(_))) => coerce_key(v)
            .map(|key| Value::Array(vec![key]))
            .ok_or_else(mismatch),

        _ => Err(mismatch()),
    }
}

fn coerce_key(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => s
            .parse::<ObjectKey>()
            .ok()
            .and_then(|key| serde_json::to_value(key).ok()),
        Value::Object(map) => {
            let name = map.get("name")?.as_str()?;
            let group = map
                .get("group")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_GROUP);
            serde_json::to_value(ObjectKey::new(name, group)).ok()
        }
        _ => None,
    }
}

// =============================================================================
// Setting definitions (advertised by `/v0/inspect/{kind}`)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDefinition {
    pub key: String,
    #[serde(default)]
    pub value_type: String,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub necessary: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl SettingDefinition {
    pub fn field_type(&self) -> FieldType {
        match self.value_type.as_str() {
            "STRING" | "PASSWORD" | "CLASS" | "JDBC_TABLE" | "DURATION" | "REMOTE_PORT" => {
                FieldType::String
            }
            "INT" | "LONG" | "SHORT" | "DOUBLE" | "POSITIVE_INT" | "POSITIVE_LONG"
            | "POSITIVE_SHORT" | "POSITIVE_DOUBLE" | "PORT" | "BINDING_PORT" => FieldType::Number,
            "BOOLEAN" => FieldType::Boolean,
            "ARRAY" | "TABLE" => FieldType::Array,
            "TAGS" => FieldType::Object,
            "OBJECT_KEY" => FieldType::Key,
            "OBJECT_KEYS" => FieldType::Keys,
            _ => FieldType::Any,
        }
    }
}

/// Default values declared by `definitions`, keyed by setting name.
pub fn defaults(definitions: &[SettingDefinition]) -> Map<String, Value> {
    definitions
        .iter()
        .filter_map(|def| match &def.default_value {
            Some(v) if !v.is_null() => Some((def.key.clone(), v.clone())),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Per-resource request schemas
// =============================================================================

fn service_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::required("name", FieldType::String),
        FieldSpec::required("group", FieldType::String),
        FieldSpec::optional("tags", FieldType::Object),
    ]
}

/// Request schema for creating (or updating) a resource of `kind`.
pub fn request_schema(kind: ResourceKind) -> Schema {
    use FieldSpec as F;
    use FieldType as T;

    match kind {
        ResourceKind::Node => Schema::new(vec![
            F::required("hostname", T::String),
            F::optional("port", T::Number),
            F::optional("user", T::String),
            F::optional("password", T::String),
            F::optional("tags", T::Object),
        ]),
        ResourceKind::Zookeeper => {
            let mut fields = service_fields();
            fields.push(F::required("nodeNames", T::Array));
            Schema::new(fields)
        }
        ResourceKind::Broker => {
            let mut fields = service_fields();
            fields.push(F::required("nodeNames", T::Array));
            fields.push(F::required("zookeeperClusterKey", T::Key));
            Schema::new(fields)
        }
        ResourceKind::Worker => {
            let mut fields = service_fields();
            fields.push(F::required("nodeNames", T::Array));
            fields.push(F::required("brokerClusterKey", T::Key));
            fields.push(F::optional("freePorts", T::Array));
            fields.push(F::optional("pluginKeys", T::Keys));
            fields.push(F::optional("sharedJarKeys", T::Keys));
            Schema::new(fields)
        }
        ResourceKind::Topic => {
            let mut fields = service_fields();
            fields.push(F::required("brokerClusterKey", T::Key));
            fields.push(F::optional("nodeNames", T::Array));
            fields.push(F::optional("numberOfPartitions", T::Number));
            fields.push(F::optional("numberOfReplications", T::Number));
            Schema::new(fields)
        }
        ResourceKind::Connector => {
            let mut fields = service_fields();
            fields.push(F::required("connector.class", T::String));
            fields.push(F::required("workerClusterKey", T::Key));
            fields.push(F::optional("topicKeys", T::Keys));
            fields.push(F::optional("tasks.max", T::Number));
            Schema::new(fields).open()
        }
        ResourceKind::Stream => {
            let mut fields = service_fields();
            fields.push(F::required("jarKey", T::Key));
            fields.push(F::required("brokerClusterKey", T::Key));
            fields.push(F::optional("nodeNames", T::Array));
            fields.push(F::optional("from", T::Keys));
            fields.push(F::optional("to", T::Keys));
            Schema::new(fields).open()
        }
        ResourceKind::Pipeline => {
            let mut fields = service_fields();
            fields.push(F::optional("endpoints", T::Array));
            Schema::new(fields)
        }
    }
}

/// Update bodies carry no identity fields and nothing is required.
pub fn update_schema(kind: ResourceKind) -> Schema {
    let base = request_schema(kind);
    let open = base.is_open();
    let fields = base
        .fields
        .into_iter()
        .filter(|f| !matches!(f.name.as_str(), "name" | "group" | "hostname"))
        .map(|f| FieldSpec::optional(f.name, f.ty))
        .collect();
    Schema { fields, open }
}
