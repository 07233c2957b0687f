//! Byte encoders
//!
//! A model flattens a record into an ordered list of serialized slots and hands
//! it to an [`Encoder`]. The encoder owns the byte layout; models never look
//! inside the payload it produces.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{PicobufError, Result};
use crate::value::Value;

/// Turns ordered slot values into a payload and back
pub trait Encoder: fmt::Debug + Send + Sync {
    /// Registered class name, e.g. `MsgPackEncoder`
    fn name(&self) -> &'static str;

    fn encode(&self, values: Vec<Value>) -> Result<Value>;

    fn decode(&self, payload: &Value) -> Result<Vec<Value>>;
}

/// Passthrough encoder: the payload is the slot array itself
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneEncoder;

impl Encoder for NoneEncoder {
    fn name(&self) -> &'static str {
        "NoneEncoder"
    }

    fn encode(&self, values: Vec<Value>) -> Result<Value> {
        Ok(Value::Array(values))
    }

    fn decode(&self, payload: &Value) -> Result<Vec<Value>> {
        match payload {
            Value::Array(items) => Ok(items.clone()),
            other => Err(PicobufError::UnexpectedEncoding {
                expected: "array".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }
}

/// MessagePack encoder: the payload is a MessagePack array in [`Value::Bytes`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackEncoder;

impl Encoder for MsgPackEncoder {
    fn name(&self) -> &'static str {
        "MsgPackEncoder"
    }

    fn encode(&self, values: Vec<Value>) -> Result<Value> {
        Ok(Value::Bytes(rmp_serde::to_vec(&values)?))
    }

    fn decode(&self, payload: &Value) -> Result<Vec<Value>> {
        match payload {
            Value::Bytes(bytes) => Ok(rmp_serde::from_slice(bytes)?),
            other => Err(PicobufError::UnexpectedEncoding {
                expected: "buffer".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }
}

/// Constructor for a registered encoder
pub type EncoderFactory = fn() -> Arc<dyn Encoder>;

/// Encoder classes keyed by class name
#[derive(Debug, Clone)]
pub struct EncoderTable {
    factories: IndexMap<String, EncoderFactory>,
}

impl Default for EncoderTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register("NoneEncoder", none_encoder);
        table.register("MsgPackEncoder", msgpack_encoder);
        table
    }
}

impl EncoderTable {
    pub fn empty() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Register an encoder class. An existing class of the same name is replaced.
    pub fn register(&mut self, class_name: impl Into<String>, factory: EncoderFactory) {
        self.factories.insert(class_name.into(), factory);
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Find an encoder by name, ignoring case and an `Encoder` suffix on either side
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Encoder>> {
        let wanted = short_name(name);
        self.factories
            .iter()
            .find(|(class, _)| short_name(class) == wanted)
            .map(|(_, factory)| factory())
    }
}

fn none_encoder() -> Arc<dyn Encoder> {
    Arc::new(NoneEncoder)
}

fn msgpack_encoder() -> Arc<dyn Encoder> {
    Arc::new(MsgPackEncoder)
}

fn short_name(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.strip_suffix("encoder") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => lower,
    }
}
