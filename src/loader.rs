//! Bulk loading of definitions
//!
//! A definitions document groups enums, models and services:
//!
//! ```json
//! {
//!   "enums":    { "Rank": ["ROOKIE", "VETERAN"] },
//!   "models":   { "Player": { "name": "string", "rank": { "enum": "Rank" } } },
//!   "services": { "Players": { "get": { "request": { "id": "integer" }, "response": "Player" } } }
//! }
//! ```
//!
//! A document with none of those three keys is read as a bare models map.
//! Enums load first, then models in declaration order, then services, so a
//! model may only reference models declared before it.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::info;

use crate::config::Config;
use crate::domain::Domain;
use crate::enums::Enum;
use crate::error::{PicobufError, Result};
use crate::model::Model;
use crate::service::Service;

const SECTIONS: [&str; 3] = ["models", "enums", "services"];

/// A domain plus the services defined over it
#[derive(Debug)]
pub struct Picobuf {
    domain: Arc<Domain>,
    services: IndexMap<String, Service>,
}

impl Picobuf {
    pub fn new(domain: Arc<Domain>) -> Self {
        Self {
            domain,
            services: IndexMap::new(),
        }
    }

    /// A fresh domain using `config`
    pub fn with_config(config: Config) -> Self {
        Self::new(Domain::new(config.shared()))
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    /// Load a definitions document
    pub fn load(&mut self, definitions: &serde_json::Value) -> Result<()> {
        let doc = definitions.as_object().ok_or_else(|| {
            PicobufError::InvalidDefinition("definitions must be an object".to_string())
        })?;

        let empty = serde_json::Map::new();
        let (enums, models, services) = if SECTIONS.iter().any(|s| doc.contains_key(*s)) {
            (
                section(doc, "enums", &empty)?,
                section(doc, "models", &empty)?,
                section(doc, "services", &empty)?,
            )
        } else {
            (&empty, doc, &empty)
        };

        for (name, values) in enums {
            let labels = serde_json::from_value::<Vec<String>>(values.clone())?;
            self.create_enum(name, labels)?;
        }
        for (name, definition) in models {
            self.create_model(name, definition)?;
        }
        for (name, definition) in services {
            self.create_service(name, definition)?;
        }

        info!(
            enums = enums.len(),
            models = models.len(),
            services = services.len(),
            "loaded definitions"
        );
        Ok(())
    }

    /// Load a `.json` or `.toml` definitions file
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let definitions: serde_json::Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(PicobufError::InvalidDefinition(format!(
                    "unsupported definitions file {}, expected .json or .toml",
                    path.display()
                )))
            }
        };
        self.load(&definitions)
    }

    pub fn create_model(&self, name: &str, definition: &serde_json::Value) -> Result<Arc<Model>> {
        self.domain.create_model(name, definition)
    }

    pub fn create_enum(&self, name: &str, values: Vec<String>) -> Result<Arc<Enum>> {
        self.domain.create_enum(name, values)
    }

    pub fn create_service(&mut self, name: &str, definition: &serde_json::Value) -> Result<&Service> {
        let service = Service::from_definition(name, definition, Arc::clone(&self.domain))?;
        self.services.insert(name.to_string(), service);
        Ok(&self.services[name])
    }

    pub fn get_model(&self, name: &str) -> Option<Arc<Model>> {
        self.domain.get_model(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<Arc<Enum>> {
        self.domain.get_enum(name)
    }

    pub fn get_service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }
}

fn section<'a>(
    doc: &'a serde_json::Map<String, serde_json::Value>,
    key: &str,
    empty: &'a serde_json::Map<String, serde_json::Value>,
) -> Result<&'a serde_json::Map<String, serde_json::Value>> {
    match doc.get(key) {
        None | Some(serde_json::Value::Null) => Ok(empty),
        Some(serde_json::Value::Object(map)) => Ok(map),
        Some(other) => Err(PicobufError::InvalidDefinition(format!(
            "{} must be an object, got {}",
            key, other
        ))),
    }
}
