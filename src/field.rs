//! Field types
//!
//! Every field variant implements the same three operations:
//! `validate` checks a value, `serialize` turns it into its wire slot and
//! `deserialize` turns a wire slot back into a value.
//!
//! | Variant | Wire slot |
//! |---------|-----------|
//! | string, number, integer, json, buffer | value as-is |
//! | boolean | `1` / `0` |
//! | float | exact decimal string |
//! | enum | label index |
//! | foreign | payload of the target model's `encode` |

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::enums::Enum;
use crate::error::{PicobufError, Result};
use crate::model::Model;
use crate::value::Value;

/// The static table of field variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Number,
    Integer,
    Float,
    Enum,
    Json,
    Buffer,
    Foreign,
}

impl FieldType {
    pub const ALL: [FieldType; 9] = [
        FieldType::String,
        FieldType::Boolean,
        FieldType::Number,
        FieldType::Integer,
        FieldType::Float,
        FieldType::Enum,
        FieldType::Json,
        FieldType::Buffer,
        FieldType::Foreign,
    ];

    /// Registered class name, e.g. `StringField`
    pub fn class_name(&self) -> &'static str {
        match self {
            FieldType::String => "StringField",
            FieldType::Boolean => "BooleanField",
            FieldType::Number => "NumberField",
            FieldType::Integer => "IntegerField",
            FieldType::Float => "FloatField",
            FieldType::Enum => "EnumField",
            FieldType::Json => "JsonField",
            FieldType::Buffer => "BufferField",
            FieldType::Foreign => "ForeignField",
        }
    }

    /// Canonical type name: the class name lower-cased without its `field` suffix
    pub fn key(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Enum => "enum",
            FieldType::Json => "json",
            FieldType::Buffer => "buffer",
            FieldType::Foreign => "foreign",
        }
    }

    /// Alternative type tokens, matched case-sensitively
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            FieldType::String => &["str"],
            FieldType::Boolean => &["bool"],
            FieldType::Number => &["num"],
            FieldType::Integer => &["int"],
            FieldType::Float => &["decimal"],
            FieldType::Json => &["obj", "object", "arr", "array"],
            FieldType::Buffer => &["buff", "buf"],
            FieldType::Enum | FieldType::Foreign => &[],
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Resolve a type token against a field-type table.
///
/// The token is first capitalized and matched against class names
/// (`"integer"` → `IntegerField`), then matched against every alias.
/// Returns the canonical type name with the variant, or `None` when the
/// token names no variant and should be tried as a foreign model.
pub fn resolve_type(token: &str, table: &[FieldType]) -> Option<(String, FieldType)> {
    let class_name = format!("{}Field", upper_first(token));
    if let Some(found) = table.iter().find(|t| t.class_name() == class_name) {
        return Some((found.key().to_string(), *found));
    }
    table
        .iter()
        .find(|t| t.aliases().contains(&token))
        .map(|found| (found.key().to_string(), *found))
}

fn upper_first(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Behaviour of a field, with the enum or model it is bound to
#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Boolean,
    Number,
    Integer,
    Float,
    Enum(Arc<Enum>),
    Json,
    Buffer,
    Foreign(Arc<Model>),
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::String => FieldType::String,
            FieldKind::Boolean => FieldType::Boolean,
            FieldKind::Number => FieldType::Number,
            FieldKind::Integer => FieldType::Integer,
            FieldKind::Float => FieldType::Float,
            FieldKind::Enum(_) => FieldType::Enum,
            FieldKind::Json => FieldType::Json,
            FieldKind::Buffer => FieldType::Buffer,
            FieldKind::Foreign(_) => FieldType::Foreign,
        }
    }
}

/// A named, typed slot of a model
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    type_name: String,
    required: bool,
    default: Option<Value>,
    list: bool,
    kind: FieldKind,
}

impl Field {
    /// A required, non-list field
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let type_name = match &kind {
            FieldKind::Foreign(model) => model.name().to_string(),
            other => other.field_type().key().to_string(),
        };
        Self {
            name: name.into(),
            type_name,
            required: true,
            default: None,
            list: false,
            kind,
        }
    }

    /// Build a field from normalized options, rejecting a default on a required field
    pub(crate) fn from_parts(
        name: impl Into<String>,
        type_name: impl Into<String>,
        kind: FieldKind,
        required: bool,
        default: Option<Value>,
        list: bool,
    ) -> Result<Self> {
        let name = name.into();
        if required && default.is_some() {
            return Err(PicobufError::DefaultAndRequired { field: name });
        }
        Ok(Self {
            name,
            type_name: type_name.into(),
            required,
            default,
            list,
            kind,
        })
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.list = true;
        self
    }

    /// Set a default. The field becomes optional.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self.required = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type name: a variant key, or the target model for foreign fields
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_list(&self) -> bool {
        self.list
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Bound enum, for enum fields
    pub fn enum_ref(&self) -> Option<&Arc<Enum>> {
        match &self.kind {
            FieldKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Target model, for foreign fields
    pub fn foreign_model(&self) -> Option<&Arc<Model>> {
        match &self.kind {
            FieldKind::Foreign(model) => Some(model),
            _ => None,
        }
    }

    /// Validate a slot as found in a record: presence, list shape, then each value
    pub fn validate_slot(&self, value: Option<&Value>) -> Result<()> {
        let Some(value) = value else {
            if self.required {
                return Err(PicobufError::Required {
                    field: self.name.clone(),
                });
            }
            return Ok(());
        };
        if self.list {
            let items = value.as_array().ok_or_else(|| PicobufError::NotAList {
                field: self.name.clone(),
                expected: self.type_name.clone(),
            })?;
            items.iter().try_for_each(|item| self.validate(item))
        } else {
            self.validate(value)
        }
    }

    /// Validate a single (non-list) value
    pub fn validate(&self, value: &Value) -> Result<()> {
        let ok = match &self.kind {
            FieldKind::String => matches!(value, Value::String(_)),
            FieldKind::Boolean => matches!(value, Value::Bool(_)),
            FieldKind::Number => match value {
                Value::Int(_) => true,
                Value::Float(f) => f.is_finite(),
                _ => false,
            },
            FieldKind::Integer => value.as_i64().is_some(),
            FieldKind::Float => match value {
                Value::Int(_) => true,
                Value::Float(f) => !f.is_nan(),
                _ => false,
            },
            FieldKind::Enum(e) => {
                let label = value.as_str().ok_or_else(|| self.type_error(value))?;
                if !e.has_value(label) {
                    return Err(PicobufError::InvalidEnumValue(label.to_string()));
                }
                true
            }
            FieldKind::Json => matches!(value, Value::Map(_) | Value::Array(_)),
            FieldKind::Buffer => matches!(value, Value::Bytes(_)),
            FieldKind::Foreign(model) => return model.validate(value),
        };
        if ok {
            Ok(())
        } else {
            Err(self.type_error(value))
        }
    }

    /// Turn a single value into its wire slot
    pub fn serialize(&self, value: &Value) -> Result<Value> {
        match &self.kind {
            FieldKind::Boolean => Ok(Value::Int(i64::from(value.as_bool() == Some(true)))),
            FieldKind::Float => match value {
                Value::Int(i) => Ok(Value::String(i.to_string())),
                Value::Float(f) => Ok(Value::String(f.to_string())),
                other => Err(self.type_error(other)),
            },
            FieldKind::Enum(e) => {
                let label = value.as_str().ok_or_else(|| self.type_error(value))?;
                e.get_index(label)
                    .map(Value::from)
                    .ok_or_else(|| PicobufError::InvalidEnumValue(label.to_string()))
            }
            FieldKind::Foreign(model) => model.encode(value),
            _ => Ok(value.clone()),
        }
    }

    /// Turn a wire slot back into a single value
    pub fn deserialize(&self, slot: &Value) -> Result<Value> {
        match &self.kind {
            FieldKind::Boolean => Ok(Value::Bool(slot.as_i64() == Some(1))),
            FieldKind::Float => match slot {
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| self.type_error(slot)),
                Value::Int(_) | Value::Float(_) => Ok(slot.clone()),
                other => Err(self.type_error(other)),
            },
            FieldKind::Enum(e) => slot
                .as_i64()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| e.get_value(i))
                .map(Value::String)
                .ok_or_else(|| PicobufError::InvalidEnumValue(slot.to_string())),
            FieldKind::Foreign(model) => model.decode(slot),
            _ => Ok(slot.clone()),
        }
    }

    fn type_error(&self, value: &Value) -> PicobufError {
        PicobufError::InvalidType {
            field: self.name.clone(),
            expected: self.type_name.clone(),
            actual: value.type_name().to_string(),
        }
    }
}
