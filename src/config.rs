//! Configuration for model construction and encoding
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (picobuf.toml)
//! - Environment variables (PICOBUF_*)
//!
//! ## Example config file (picobuf.toml):
//! ```toml
//! object_mode = false
//! strict = true
//! default_field_type = "string"
//! default_encoder = "msgpack"
//! single_prop = "fieldType"
//! encoder = "none"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use config_crate::{Config as Layered, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::encoder::{Encoder, EncoderTable};
use crate::field::FieldType;

const CONFIG_FILE: &str = "picobuf.toml";
const ENV_PREFIX: &str = "PICOBUF";

/// Options consumed by the model builder and by models at encode time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Models only validate; encode/decode return records untouched
    #[serde(default)]
    pub object_mode: bool,

    /// Fields are required unless stated otherwise
    #[serde(default = "default_true")]
    pub strict: bool,

    /// Type used when a field spec names none
    #[serde(default = "default_field_type")]
    pub default_field_type: String,

    /// Encoder used when `encoder` is unset or unresolvable
    #[serde(default = "default_encoder")]
    pub default_encoder: String,

    /// Key marking a scalar model definition
    #[serde(default = "default_single_prop")]
    pub single_prop: String,

    /// Encoder name for models built with this config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<String>,

    /// Explicit encoder instance, used verbatim when set
    #[serde(skip)]
    pub encoder_instance: Option<Arc<dyn Encoder>>,

    /// Field variants the type resolver may pick from
    #[serde(skip, default = "default_field_types")]
    pub field_types: Vec<FieldType>,

    /// Encoder classes available by name
    #[serde(skip)]
    pub encoders: EncoderTable,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_field_type() -> String {
    "string".to_string()
}

fn default_encoder() -> String {
    "msgpack".to_string()
}

fn default_single_prop() -> String {
    "fieldType".to_string()
}

fn default_field_types() -> Vec<FieldType> {
    FieldType::ALL.to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            object_mode: false,
            strict: default_true(),
            default_field_type: default_field_type(),
            default_encoder: default_encoder(),
            single_prop: default_single_prop(),
            encoder: None,
            encoder_instance: None,
            field_types: default_field_types(),
            encoders: EncoderTable::default(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, optionally from a specific file.
    ///
    /// Later layers win: the optional files from [`Config::search_paths`],
    /// then `config_path` (which must exist), then `PICOBUF_*` variables
    /// with `__` separating nested keys.
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let optional = Self::search_paths()
            .into_iter()
            .map(|path| File::from(path).required(false));
        let explicit = config_path.map(|path| File::with_name(path).required(true));

        optional
            .chain(explicit)
            .fold(Layered::builder(), |layers, file| layers.add_source(file))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Optional config files, lowest precedence first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = ["", ".", "config/"]
            .iter()
            .map(|prefix| PathBuf::from(format!("{}{}", prefix, CONFIG_FILE)))
            .collect();
        if let Some(dirs) = directories::ProjectDirs::from("dev", "picobuf", "picobuf") {
            let user_file = dirs.config_dir().join(CONFIG_FILE);
            if user_file.exists() {
                paths.push(user_file);
            }
        }
        paths
    }

    /// Save the serializable options to a TOML file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn with_object_mode(mut self, object_mode: bool) -> Self {
        self.object_mode = object_mode;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_default_field_type(mut self, field_type: impl Into<String>) -> Self {
        self.default_field_type = field_type.into();
        self
    }

    pub fn with_encoder(mut self, name: impl Into<String>) -> Self {
        self.encoder = Some(name.into());
        self
    }

    pub fn with_encoder_instance(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder_instance = Some(encoder);
        self
    }

    pub fn with_field_types(mut self, field_types: Vec<FieldType>) -> Self {
        self.field_types = field_types;
        self
    }

    pub fn with_encoders(mut self, encoders: EncoderTable) -> Self {
        self.encoders = encoders;
        self
    }

    /// Wrap for sharing between a domain and its models
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
