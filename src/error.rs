//! Error types for model construction, validation and encoding

use thiserror::Error;

/// Result type for picobuf operations
pub type Result<T> = std::result::Result<T, PicobufError>;

/// Broad classification of a [`PicobufError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A schema definition or configuration is malformed. Fatal to the model being built.
    Configuration,
    /// Data does not satisfy a built model.
    Validation,
    /// The byte encoder rejected the input or output.
    Encoding,
}

/// Picobuf errors
#[derive(Error, Debug)]
pub enum PicobufError {
    #[error("Field cannot both have a default and be required: {field}")]
    DefaultAndRequired { field: String },

    #[error("Foreign model {name} could not be found{}", did_you_mean(.suggestions))]
    ForeignModelNotFound { name: String, suggestions: Vec<String> },

    #[error("Enum {0} could not be found")]
    EnumNotFound(String),

    #[error("Encoder {0} could not be resolved")]
    EncoderNotFound(String),

    #[error("Invalid model definition: {0}")]
    InvalidDefinition(String),

    #[error("Value \"{value}\" already exists in enum {name}")]
    DuplicateEnumValue { name: String, value: String },

    #[error("Field {field} is required")]
    Required { field: String },

    #[error("Invalid type for field {field}. Expected {expected}, got {actual}")]
    InvalidType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Field \"{field}\" should be an array of type {expected}")]
    NotAList { field: String, expected: String },

    #[error("Invalid enum value {0}")]
    InvalidEnumValue(String),

    #[error("enum \"{0}\" does not exist")]
    UnknownEnumLabel(String),

    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Unexpected encoded payload: expected {expected}, got {actual}")]
    UnexpectedEncoding { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl PicobufError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PicobufError::DefaultAndRequired { .. }
            | PicobufError::ForeignModelNotFound { .. }
            | PicobufError::EnumNotFound(_)
            | PicobufError::EncoderNotFound(_)
            | PicobufError::InvalidDefinition(_)
            | PicobufError::DuplicateEnumValue { .. }
            | PicobufError::Io(_)
            | PicobufError::Json(_)
            | PicobufError::Toml(_)
            | PicobufError::Config(_) => ErrorKind::Configuration,

            PicobufError::Required { .. }
            | PicobufError::InvalidType { .. }
            | PicobufError::NotAList { .. }
            | PicobufError::InvalidEnumValue(_)
            | PicobufError::UnknownEnumLabel(_) => ErrorKind::Validation,

            PicobufError::Encode(_)
            | PicobufError::Decode(_)
            | PicobufError::UnexpectedEncoding { .. } => ErrorKind::Encoding,
        }
    }
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}
