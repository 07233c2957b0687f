//! Models
//!
//! A [`Model`] is a named, ordered list of fields plus a bound encoder. The
//! field order fixed at build time is the wire order: `encode` writes one slot
//! per field in that order and `decode` reads them back the same way.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::builder::BuiltModel;
use crate::checksum::Checksum;
use crate::config::Config;
use crate::domain::Domain;
use crate::encoder::Encoder;
use crate::error::{PicobufError, Result};
use crate::field::Field;
use crate::value::{Map, Value};

/// Structural classification of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// A single bare value
    Scalar,
    /// A map of named fields
    Record,
    /// An array of fields addressed by position
    Positional,
}

/// A built schema
#[derive(Debug)]
pub struct Model {
    name: String,
    shape: Shape,
    fields: Vec<Field>,
    encoder: Arc<dyn Encoder>,
    config: Arc<Config>,
    domain: Weak<Domain>,
}

impl Model {
    pub(crate) fn from_built(
        name: impl Into<String>,
        built: BuiltModel,
        config: Arc<Config>,
        domain: Weak<Domain>,
    ) -> Self {
        Self {
            name: name.into(),
            shape: built.shape,
            fields: built.fields,
            encoder: built.encoder,
            config,
            domain,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Fields in wire order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The domain this model was built in, if it is still alive
    pub fn domain(&self) -> Option<Arc<Domain>> {
        self.domain.upgrade()
    }

    /// SHA-256 over the ordered field layout. Two builds with the same
    /// fingerprint read each other's payloads.
    pub fn fingerprint(&self) -> Checksum {
        let layout: Vec<serde_json::Value> = self
            .fields
            .iter()
            .map(|f| serde_json::json!([f.name(), f.type_name(), f.is_list()]))
            .collect();
        Checksum::from_json(&serde_json::json!({
            "shape": self.shape,
            "fields": layout,
        }))
    }

    fn slot<'v>(&self, position: usize, field: &Field, data: &'v Value) -> Option<&'v Value> {
        match self.shape {
            Shape::Record => data.get(field.name()),
            Shape::Positional => data.get_index(position),
            Shape::Scalar => Some(data).filter(|v| !v.is_null()),
        }
    }

    fn check_container(&self, data: &Value) -> Result<()> {
        let expected = match self.shape {
            Shape::Record if data.as_map().is_none() => "object",
            Shape::Positional if data.as_array().is_none() => "array",
            _ => return Ok(()),
        };
        Err(PicobufError::InvalidType {
            field: self.name.clone(),
            expected: expected.to_string(),
            actual: data.type_name().to_string(),
        })
    }

    /// Check a record against every field, in field order
    pub fn validate(&self, data: &Value) -> Result<()> {
        self.check_container(data)?;
        for (position, field) in self.fields.iter().enumerate() {
            field.validate_slot(self.slot(position, field, data))?;
        }
        Ok(())
    }

    /// Assemble a record, filling absent fields with their defaults.
    ///
    /// Record models read `data` as a map. Positional models take `data` as
    /// slot 0 and `extra` as the following slots. Scalar models take `data`
    /// as the value.
    pub fn create(&self, data: &Value, extra: &[Value]) -> Result<Value> {
        let pick = |given: Option<&Value>, field: &Field| {
            given
                .filter(|v| !v.is_null())
                .cloned()
                .or_else(|| field.default_value().cloned())
        };

        let record = match self.shape {
            Shape::Record => {
                let mut map = Map::new();
                for field in &self.fields {
                    if let Some(value) = pick(data.get(field.name()), field) {
                        map.insert(field.name().to_string(), value);
                    }
                }
                Value::Map(map)
            }
            Shape::Positional => {
                let inputs: Vec<&Value> = std::iter::once(data).chain(extra.iter()).collect();
                let items = self
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| pick(inputs.get(i).copied(), field).unwrap_or_default())
                    .collect();
                Value::Array(items)
            }
            Shape::Scalar => match self.fields.first() {
                Some(field) => pick(Some(data), field).unwrap_or_default(),
                None => Value::Null,
            },
        };

        self.validate(&record)?;
        Ok(record)
    }

    /// Validate and encode a record into the bound encoder's payload.
    /// In object mode the record itself is returned and the encoder is not used.
    pub fn encode(&self, data: &Value) -> Result<Value> {
        self.validate(data)?;
        if self.config.object_mode {
            return Ok(data.clone());
        }

        let mut slots = Vec::with_capacity(self.fields.len());
        for (position, field) in self.fields.iter().enumerate() {
            let slot = match self.slot(position, field, data) {
                None => Value::Null,
                Some(Value::Array(items)) if field.is_list() => Value::Array(
                    items
                        .iter()
                        .map(|item| field.serialize(item))
                        .collect::<Result<_>>()?,
                ),
                Some(value) => field.serialize(value)?,
            };
            slots.push(slot);
        }

        trace!(model = %self.name, slots = slots.len(), "encoding");
        self.encoder.encode(slots)
    }

    /// Decode a payload back into a record and validate the result.
    /// In object mode the payload is validated and returned as-is.
    ///
    /// The wire has no separate marker for an absent slot, so absent optional
    /// fields come back in canonical form: left out of a record, `null` in a
    /// positional array. A positional record shorter than its field list
    /// therefore decodes padded with `null`s.
    pub fn decode(&self, payload: &Value) -> Result<Value> {
        if self.config.object_mode {
            self.validate(payload)?;
            return Ok(payload.clone());
        }

        let slots = self.encoder.decode(payload)?;
        if slots.len() > self.fields.len() {
            trace!(
                model = %self.name,
                extra = slots.len() - self.fields.len(),
                "ignoring trailing slots"
            );
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for (position, field) in self.fields.iter().enumerate() {
            let value = match slots.get(position).filter(|s| !s.is_null()) {
                None => None,
                Some(slot) if field.is_list() => {
                    let items = slot.as_array().ok_or_else(|| PicobufError::NotAList {
                        field: field.name().to_string(),
                        expected: field.type_name().to_string(),
                    })?;
                    Some(Value::Array(
                        items
                            .iter()
                            .map(|item| field.deserialize(item))
                            .collect::<Result<_>>()?,
                    ))
                }
                Some(slot) => Some(field.deserialize(slot)?),
            };
            values.push(value);
        }

        let record = match self.shape {
            Shape::Record => Value::Map(
                self.fields
                    .iter()
                    .zip(values)
                    .filter_map(|(field, value)| value.map(|v| (field.name().to_string(), v)))
                    .collect(),
            ),
            Shape::Positional => Value::Array(values.into_iter().map(Option::unwrap_or_default).collect()),
            Shape::Scalar => values.into_iter().next().flatten().unwrap_or_default(),
        };

        self.validate(&record)?;
        Ok(record)
    }

    /// Encode and require a byte payload
    pub fn encode_to_bytes(&self, data: &Value) -> Result<Vec<u8>> {
        match self.encode(data)? {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(PicobufError::UnexpectedEncoding {
                expected: "buffer".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    pub fn decode_from_bytes(&self, bytes: &[u8]) -> Result<Value> {
        self.decode(&Value::Bytes(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn domain_with(config: Config) -> Arc<Domain> {
        Domain::new(config.shared())
    }

    fn record(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_shapes() {
        let domain = domain_with(Config::default());
        let user = domain.create_model("User", &json!({"name": "string"})).unwrap();
        assert_eq!(user.shape(), Shape::Record);

        let pair = domain.create_model("Pair", &json!([["string"]])).unwrap();
        assert_eq!(pair.shape(), Shape::Positional);

        let single = domain.create_model("Single", &json!({"fieldType": "string"})).unwrap();
        assert_eq!(single.shape(), Shape::Scalar);

        let bare = domain.create_model("Bare", &json!("integer")).unwrap();
        assert_eq!(bare.shape(), Shape::Scalar);
        assert_eq!(bare.fields()[0].type_name(), "integer");
    }

    #[test]
    fn test_passthrough_encoding_is_positional() {
        let domain = domain_with(Config::default().with_encoder("none"));
        let model = domain
            .create_model("TestModel", &json!({"field1": "number", "field2": "string"}))
            .unwrap();
        let data = record(json!({"field1": 123, "field2": "abc"}));

        let encoded = model.encode(&data).unwrap();
        assert_eq!(encoded, record(json!([123, "abc"])));
        assert_eq!(model.decode(&record(json!([123, "abc"]))).unwrap(), data);
    }

    #[test]
    fn test_msgpack_round_trip() {
        let domain = domain_with(Config::default());
        let model = domain
            .create_model(
                "TestModel",
                &json!({"field1": "number", "field2": "string", "field3": "boolean"}),
            )
            .unwrap();
        let data = record(json!({"field1": 123, "field2": "abc", "field3": true}));

        let encoded = model.encode(&data).unwrap();
        assert!(encoded.as_bytes().is_some());
        assert_eq!(model.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_object_mode_skips_encoder() {
        let domain = domain_with(Config::default().with_object_mode(true));
        let model = domain.create_model("Obj", &json!({"n": "integer"})).unwrap();
        let data = record(json!({"n": 5}));

        assert_eq!(model.encode(&data).unwrap(), data);
        assert_eq!(model.decode(&data).unwrap(), data);
        assert!(model.decode(&record(json!({"n": "five"}))).is_err());
    }

    #[test]
    fn test_validate_reports_first_field_in_order() {
        let domain = domain_with(Config::default());
        let model = domain
            .create_model(
                "TestModel",
                &json!({"field1": "number", "field2": "string", "field3": "boolean"}),
            )
            .unwrap();
        let err = model
            .validate(&record(json!({"field1": 123, "field2": "abc", "field3": "true"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type for field field3. Expected boolean, got string"
        );

        let err = model.validate(&record(json!({"field3": 1}))).unwrap_err();
        assert_eq!(err.to_string(), "Field field1 is required");
    }

    #[test]
    fn test_create_fills_defaults() {
        let domain = domain_with(Config::default());
        let model = domain
            .create_model(
                "WithDefaults",
                &json!({"name": "string", "role": {"type": "string", "default": "member"}}),
            )
            .unwrap();
        let created = model.create(&record(json!({"name": "ann"})), &[]).unwrap();
        assert_eq!(created, record(json!({"name": "ann", "role": "member"})));
    }

    #[test]
    fn test_create_positional_and_scalar() {
        let domain = domain_with(Config::default());
        let point = domain
            .create_model("Point", &json!(["number", ["number", 0]]))
            .unwrap();
        let created = point.create(&Value::Int(3), &[]).unwrap();
        assert_eq!(created, record(json!([3, 0])));
        let created = point.create(&Value::Int(3), &[Value::Int(4)]).unwrap();
        assert_eq!(created, record(json!([3, 4])));

        let count = domain
            .create_model("Count", &json!({"fieldType": "integer", "default": 1}))
            .unwrap();
        assert_eq!(count.create(&Value::Null, &[]).unwrap(), Value::Int(1));
        assert_eq!(count.create(&Value::Int(9), &[]).unwrap(), Value::Int(9));
    }

    #[test]
    fn test_scalar_round_trip() {
        let domain = domain_with(Config::default());
        let model = domain.create_model("Price", &json!("float")).unwrap();
        let encoded = model.encode(&Value::Float(25.5)).unwrap();
        assert_eq!(model.decode(&encoded).unwrap(), Value::Float(25.5));
    }

    #[test]
    fn test_optional_fields_stay_absent() {
        let domain = domain_with(Config::default().with_strict(false));
        let model = domain
            .create_model("Loose", &json!({"a": "string", "b": "integer"}))
            .unwrap();
        let data = record(json!({"b": 2}));
        let encoded = model.encode(&data).unwrap();
        assert_eq!(model.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_short_positional_record_decodes_padded() {
        let domain = domain_with(Config::default());
        let model = domain
            .create_model("Pair", &json!(["number", {"type": "string", "required": false}]))
            .unwrap();

        let encoded = model.encode(&record(json!([1]))).unwrap();
        assert_eq!(model.decode(&encoded).unwrap(), record(json!([1, null])));

        let padded = record(json!([1, null]));
        let encoded = model.encode(&padded).unwrap();
        assert_eq!(model.decode(&encoded).unwrap(), padded);
    }

    #[test]
    fn test_decode_rejects_tampered_payload() {
        let domain = domain_with(Config::default().with_encoder("none"));
        let model = domain
            .create_model("T", &json!({"flag": "boolean", "n": "integer"}))
            .unwrap();
        let err = model.decode(&record(json!([1, "not a number"]))).unwrap_err();
        assert!(matches!(err, PicobufError::InvalidType { .. }));

        let err = model.decode(&record(json!([1]))).unwrap_err();
        assert_eq!(err.to_string(), "Field n is required");
    }

    #[test]
    fn test_encode_to_bytes_requires_byte_encoder() {
        let domain = domain_with(Config::default().with_encoder("none"));
        let model = domain.create_model("T", &json!({"n": "integer"})).unwrap();
        let err = model.encode_to_bytes(&record(json!({"n": 1}))).unwrap_err();
        assert!(matches!(err, PicobufError::UnexpectedEncoding { .. }));
    }

    #[test]
    fn test_fingerprint_tracks_field_order() {
        let domain = domain_with(Config::default());
        let a = domain.create_model("A", &json!({"x": "integer", "y": "string"})).unwrap();
        let b = domain.create_model("B", &json!({"x": "integer", "y": "string"})).unwrap();
        let c = domain.create_model("C", &json!({"y": "string", "x": "integer"})).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_model_keeps_domain_reference() {
        let domain = domain_with(Config::default());
        let model = domain.create_model("T", &json!({"n": "integer"})).unwrap();
        assert!(Arc::ptr_eq(&model.domain().unwrap(), &domain));
        assert_eq!(model.get_field("n").unwrap().type_name(), "integer");
        assert!(model.get_field("missing").is_none());
    }
}
