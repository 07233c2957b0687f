//! Picobuf
//!
//! Compact schema definitions and positional encoding for structured records.
//!
//! ## Features
//!
//! - **Loose Definitions**: Models are declared as strings, maps or arrays and
//!   normalized into an ordered field list
//! - **Positional Wire Format**: Records encode as one slot per field in field
//!   order, without field names on the wire
//! - **Pluggable Encoders**: MessagePack by default, or a plain array passthrough
//! - **Enums and Nested Models**: Enum labels travel as indices and foreign
//!   models nest as their own encoded payload
//! - **Validation**: Records are checked against their model on both encode
//!   and decode
//!
//! ## Architecture
//!
//! ```text
//! definition ──► ModelBuilder ──► Model ──► Domain
//!                                  │
//!   record ──► validate ──► serialize fields ──► Encoder ──► payload
//!   payload ──► Encoder ──► deserialize fields ──► validate ──► record
//! ```

pub mod builder;
pub mod checksum;
pub mod config;
pub mod domain;
pub mod encoder;
pub mod enums;
pub mod error;
pub mod field;
pub mod loader;
pub mod model;
pub mod service;
pub mod value;

pub use builder::{EnumSource, FieldSpec};
pub use checksum::Checksum;
pub use config::Config;
pub use domain::Domain;
pub use encoder::{Encoder, EncoderTable, MsgPackEncoder, NoneEncoder};
pub use enums::Enum;
pub use error::{ErrorKind, PicobufError, Result};
pub use field::{Field, FieldKind, FieldType};
pub use loader::Picobuf;
pub use model::{Model, Shape};
pub use service::{Method, ModelRef, Service};
pub use value::{Map, Value};
