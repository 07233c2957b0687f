//! Model building
//!
//! Turns a raw model definition into a [`Shape`], an ordered list of
//! [`Field`]s and a bound [`Encoder`]. Definitions come in three forms:
//!
//! ```text
//! "integer"                              scalar: one value
//! {"fieldType": "integer", "default": 0} scalar: one value with options
//! {"id": "*integer", "tags": ["string"]} record: named fields in key order
//! ["integer", ["string", "n/a"]]         positional: fields named "0", "1", ...
//! ```
//!
//! A field spec is either a type token or a map with any of `type`,
//! `required`, `default`, `list`, `repeated`, `enum` and `values`.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::Domain;
use crate::encoder::Encoder;
use crate::enums::Enum;
use crate::error::{PicobufError, Result};
use crate::field::{resolve_type, Field, FieldKind, FieldType};
use crate::model::Shape;
use crate::value::Value;

/// Where an enum field gets its labels from
#[derive(Debug, Clone)]
pub enum EnumSource {
    /// An enum already registered in the domain
    Named(String),
    /// Labels for a new enum owned by the field
    Values(Vec<String>),
    /// An enum instance, used as-is
    Existing(Arc<Enum>),
}

/// A field spec before normalization
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    pub type_token: Option<String>,
    pub required: Option<bool>,
    pub default: Option<Value>,
    pub list: bool,
    pub repeated: bool,
    pub enum_source: Option<EnumSource>,
    pub values: Option<Vec<String>>,
}

impl FieldSpec {
    /// Spec with just a type token
    pub fn of(type_token: impl Into<String>) -> Self {
        Self {
            type_token: Some(type_token.into()),
            ..Self::default()
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn with_enum(mut self, enum_ref: Arc<Enum>) -> Self {
        self.enum_source = Some(EnumSource::Existing(enum_ref));
        self
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// True when the spec carries its own labels rather than naming an enum
    fn declares_enum(&self) -> bool {
        match &self.enum_source {
            Some(EnumSource::Values(_)) => true,
            Some(_) => false,
            None => self.values.is_some(),
        }
    }

    /// Parse a spec from its JSON form: a type token or a map of options
    pub fn from_json(raw: &serde_json::Value) -> Result<Self> {
        match raw {
            serde_json::Value::String(token) => Ok(Self::of(token.clone())),
            serde_json::Value::Array(_) => {
                let mut wrapped = serde_json::Map::new();
                wrapped.insert("type".to_string(), raw.clone());
                Self::from_json(&serde_json::Value::Object(wrapped))
            }
            serde_json::Value::Object(map) => {
                let mut spec = Self::default();
                match map.get("type") {
                    None | Some(serde_json::Value::Null) => {}
                    Some(serde_json::Value::String(token)) => spec.type_token = Some(token.clone()),
                    // `["number"]` is a list of numbers
                    Some(serde_json::Value::Array(items)) => {
                        spec.list = true;
                        spec.type_token = items.first().and_then(|t| t.as_str()).map(String::from);
                    }
                    Some(other) => {
                        return Err(PicobufError::InvalidDefinition(format!(
                            "field type must be a string, got {}",
                            other
                        )))
                    }
                }
                spec.required = map.get("required").and_then(|r| r.as_bool());
                spec.default = map
                    .get("default")
                    .filter(|d| !d.is_null())
                    .cloned()
                    .map(Value::from);
                if map.get("list").and_then(|l| l.as_bool()) == Some(true) {
                    spec.list = true;
                }
                spec.repeated = map.get("repeated").and_then(|r| r.as_bool()).unwrap_or(false);
                spec.enum_source = match map.get("enum") {
                    None | Some(serde_json::Value::Null) => None,
                    Some(serde_json::Value::String(name)) => Some(EnumSource::Named(name.clone())),
                    Some(serde_json::Value::Array(items)) => Some(EnumSource::Values(labels(items)?)),
                    Some(other) => {
                        return Err(PicobufError::InvalidDefinition(format!(
                            "enum must be a name or a list of labels, got {}",
                            other
                        )))
                    }
                };
                spec.values = match map.get("values") {
                    Some(serde_json::Value::Array(items)) => Some(labels(items)?),
                    _ => None,
                };
                Ok(spec)
            }
            other => Err(PicobufError::InvalidDefinition(format!(
                "field spec must be a type name or an object, got {}",
                other
            ))),
        }
    }
}

fn labels(items: &[serde_json::Value]) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| match item {
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Err(PicobufError::InvalidDefinition(format!(
                "enum labels must be strings, got {}",
                other
            ))),
        })
        .collect()
}

/// Output of a build: everything a [`crate::Model`] needs besides its name
#[derive(Debug)]
pub struct BuiltModel {
    pub shape: Shape,
    pub fields: Vec<Field>,
    pub encoder: Arc<dyn Encoder>,
    /// Enums declared inline by the model's fields, registered with the model
    pub enums: Vec<Arc<Enum>>,
}

/// Normalizes raw definitions against a config and domain
pub struct ModelBuilder<'a> {
    model_name: String,
    config: &'a Config,
    domain: &'a Domain,
}

enum SlotName {
    Position(usize),
    Named(String),
}

impl<'a> ModelBuilder<'a> {
    pub fn new(model_name: impl Into<String>, config: &'a Config, domain: &'a Domain) -> Self {
        Self {
            model_name: model_name.into(),
            config,
            domain,
        }
    }

    /// Build from a raw JSON definition
    pub fn build(&self, definition: &serde_json::Value) -> Result<BuiltModel> {
        let encoder = self.resolve_encoder()?;
        let (shape, specs) = self.classify(definition)?;
        let (fields, enums) = self.normalize_fields(specs)?;
        Ok(BuiltModel {
            shape,
            fields,
            encoder,
            enums,
        })
    }

    /// Build a record model from already-parsed field specs
    pub fn build_fields(&self, specs: Vec<(String, FieldSpec)>) -> Result<BuiltModel> {
        let encoder = self.resolve_encoder()?;
        let (fields, enums) = self.normalize_fields(specs)?;
        Ok(BuiltModel {
            shape: Shape::Record,
            fields,
            encoder,
            enums,
        })
    }

    /// Pick the encoder: explicit instance, then the configured name, then the default name
    pub fn resolve_encoder(&self) -> Result<Arc<dyn Encoder>> {
        if let Some(instance) = &self.config.encoder_instance {
            return Ok(Arc::clone(instance));
        }
        let requested = self
            .config
            .encoder
            .as_deref()
            .unwrap_or(&self.config.default_encoder);
        if let Some(encoder) = self.config.encoders.resolve(requested) {
            debug!(model = %self.model_name, encoder = encoder.name(), "resolved encoder");
            return Ok(encoder);
        }
        warn!(
            model = %self.model_name,
            requested,
            fallback = %self.config.default_encoder,
            "unknown encoder, falling back to default"
        );
        self.config
            .encoders
            .resolve(&self.config.default_encoder)
            .ok_or_else(|| PicobufError::EncoderNotFound(self.config.default_encoder.clone()))
    }

    fn classify(&self, definition: &serde_json::Value) -> Result<(Shape, Vec<(String, FieldSpec)>)> {
        match definition {
            serde_json::Value::String(token) => {
                Ok((Shape::Scalar, vec![("0".to_string(), FieldSpec::of(token.clone()))]))
            }
            serde_json::Value::Object(map) if map.contains_key(&self.config.single_prop) => {
                let mut options = map.clone();
                match options.remove(&self.config.single_prop) {
                    Some(serde_json::Value::Object(inner)) => {
                        for (k, v) in inner {
                            options.entry(k).or_insert(v);
                        }
                    }
                    Some(token) => {
                        options.entry("type").or_insert(token);
                    }
                    None => {}
                }
                let spec = FieldSpec::from_json(&serde_json::Value::Object(options))?;
                Ok((Shape::Scalar, vec![("0".to_string(), spec)]))
            }
            serde_json::Value::Object(map) => {
                let specs = map
                    .iter()
                    .map(|(name, raw)| Ok((name.clone(), FieldSpec::from_json(raw)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok((Shape::Record, specs))
            }
            serde_json::Value::Array(entries) => self.classify_positional(entries),
            other => Err(PicobufError::InvalidDefinition(format!(
                "model {} must be defined by a type name, an object or a list, got {}",
                self.model_name, other
            ))),
        }
    }

    /// Positional definitions. An entry written as `[name, type, default]` whose
    /// first element is not a type token carries an explicit name; any such
    /// entry turns the whole model into a record. This reclassification is kept
    /// for compatibility with existing definitions and is deprecated.
    fn classify_positional(
        &self,
        entries: &[serde_json::Value],
    ) -> Result<(Shape, Vec<(String, FieldSpec)>)> {
        let mut shape = Shape::Positional;
        let mut specs = Vec::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            let (slot, spec) = match entry {
                serde_json::Value::String(_) | serde_json::Value::Object(_) => {
                    (SlotName::Position(i), FieldSpec::from_json(entry)?)
                }
                serde_json::Value::Array(tuple) => self.positional_tuple(i, tuple)?,
                other => {
                    return Err(PicobufError::InvalidDefinition(format!(
                        "positional entry {} of model {} must be a type, an object or a tuple, got {}",
                        i, self.model_name, other
                    )))
                }
            };
            let name = match slot {
                SlotName::Position(i) => i.to_string(),
                SlotName::Named(name) => {
                    if shape == Shape::Positional {
                        warn!(
                            model = %self.model_name,
                            field = %name,
                            "named entry in positional definition, treating model as a record (deprecated)"
                        );
                    }
                    shape = Shape::Record;
                    name
                }
            };
            specs.push((name, spec));
        }
        Ok((shape, specs))
    }

    fn positional_tuple(&self, i: usize, tuple: &[serde_json::Value]) -> Result<(SlotName, FieldSpec)> {
        let Some(first) = tuple.first() else {
            return Ok((SlotName::Position(i), FieldSpec::default()));
        };
        let first = first.as_str().ok_or_else(|| {
            PicobufError::InvalidDefinition(format!(
                "tuple entry {} of model {} must start with a type or a name",
                i, self.model_name
            ))
        })?;

        let is_type = resolve_type(first.trim_start_matches('*'), &self.config.field_types).is_some();
        let (slot, rest) = if is_type {
            (SlotName::Position(i), tuple)
        } else {
            (SlotName::Named(first.to_string()), &tuple[1..])
        };

        let mut raw = serde_json::Map::new();
        if let Some(ty) = rest.first() {
            raw.insert("type".to_string(), ty.clone());
        }
        if let Some(default) = rest.get(1) {
            raw.insert("default".to_string(), default.clone());
        }
        Ok((slot, FieldSpec::from_json(&serde_json::Value::Object(raw))?))
    }

    fn normalize_fields(&self, specs: Vec<(String, FieldSpec)>) -> Result<(Vec<Field>, Vec<Arc<Enum>>)> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(specs.len());
        let mut inline_enums = Vec::new();
        for (name, spec) in specs {
            if !seen.insert(name.clone()) {
                return Err(PicobufError::InvalidDefinition(format!(
                    "field {} declared twice in model {}",
                    name, self.model_name
                )));
            }
            let declares_enum = spec.declares_enum();
            let field = self.normalize_field(&name, spec)?;
            if let Some(e) = field.enum_ref().filter(|_| declares_enum) {
                inline_enums.push(Arc::clone(e));
            }
            fields.push(field);
        }
        Ok((fields, inline_enums))
    }

    fn inline_enum_name(&self, field_name: &str) -> String {
        format!("{}.{}", self.model_name, field_name)
    }

    fn normalize_field(&self, name: &str, spec: FieldSpec) -> Result<Field> {
        let mut token = spec
            .type_token
            .clone()
            .unwrap_or_else(|| self.config.default_field_type.clone());
        let has_default = spec.default.is_some();

        if has_default && spec.required == Some(true) {
            return Err(PicobufError::DefaultAndRequired {
                field: name.to_string(),
            });
        }
        let mut required = spec.required.unwrap_or(self.config.strict);
        if has_default {
            required = false;
        }

        let list = spec.list || spec.repeated;

        if let Some(stripped) = token.strip_prefix('*') {
            token = stripped.to_string();
            required = true;
        }

        let enum_ref = if spec.enum_source.is_some() || spec.values.is_some() {
            token = FieldType::Enum.key().to_string();
            Some(self.resolve_enum(name, &spec)?)
        } else {
            None
        };

        let (type_name, kind) = match resolve_type(&token, &self.config.field_types) {
            Some((key, ty)) => {
                let kind = match ty {
                    FieldType::String => FieldKind::String,
                    FieldType::Boolean => FieldKind::Boolean,
                    FieldType::Number => FieldKind::Number,
                    FieldType::Integer => FieldKind::Integer,
                    FieldType::Float => FieldKind::Float,
                    FieldType::Json => FieldKind::Json,
                    FieldType::Buffer => FieldKind::Buffer,
                    FieldType::Enum => FieldKind::Enum(match enum_ref {
                        Some(e) => e,
                        None => self.resolve_enum(name, &spec)?,
                    }),
                    FieldType::Foreign => FieldKind::Foreign(self.resolve_foreign(&token)?),
                };
                let type_name = if ty == FieldType::Foreign { token.clone() } else { key };
                (type_name, kind)
            }
            None => (token.clone(), FieldKind::Foreign(self.resolve_foreign(&token)?)),
        };

        Field::from_parts(name, type_name, kind, required, spec.default, list)
    }

    fn resolve_enum(&self, field_name: &str, spec: &FieldSpec) -> Result<Arc<Enum>> {
        match (&spec.enum_source, &spec.values) {
            (Some(EnumSource::Existing(e)), _) => Ok(Arc::clone(e)),
            (Some(EnumSource::Named(enum_name)), _) => self
                .domain
                .get_enum(enum_name)
                .ok_or_else(|| PicobufError::EnumNotFound(enum_name.clone())),
            // Registered by the domain once the whole model has built
            (Some(EnumSource::Values(values)), _) | (None, Some(values)) => {
                Ok(Arc::new(Enum::new(self.inline_enum_name(field_name), values.clone())?))
            }
            (None, None) => Err(PicobufError::InvalidDefinition(format!(
                "enum field {} of model {} declares no values",
                field_name, self.model_name
            ))),
        }
    }

    fn resolve_foreign(&self, model_name: &str) -> Result<Arc<crate::model::Model>> {
        self.domain.get_model(model_name).ok_or_else(|| {
            PicobufError::ForeignModelNotFound {
                name: model_name.to_string(),
                suggestions: self.domain.search_models(model_name, 3),
            }
        })
    }
}
