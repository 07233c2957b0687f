//! Domains
//!
//! A [`Domain`] is the namespace models and enums are registered in. Names
//! are case-insensitive and registering under an existing name replaces the
//! previous entry. Foreign fields and named enum references resolve against
//! the domain of the model being built.
//!
//! Registration is expected to happen before encode/decode traffic starts;
//! the maps are guarded by locks held only for the duration of a lookup.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use parking_lot::RwLock;
use tracing::debug;

use crate::builder::{BuiltModel, FieldSpec, ModelBuilder};
use crate::config::Config;
use crate::enums::Enum;
use crate::error::Result;
use crate::model::Model;

static GLOBAL: OnceLock<Arc<Domain>> = OnceLock::new();

/// Registry of models and enums
#[derive(Debug)]
pub struct Domain {
    config: Arc<Config>,
    models: RwLock<HashMap<String, Arc<Model>>>,
    enums: RwLock<HashMap<String, Arc<Enum>>>,
}

impl Domain {
    /// Create a domain whose models default to `config`
    pub fn new(config: Arc<Config>) -> Arc<Self> {
        Arc::new(Self {
            config,
            models: RwLock::new(HashMap::new()),
            enums: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(Arc::new(Config::default()))
    }

    /// Install the process-wide default domain. Fails, returning the
    /// argument, if one is already installed.
    pub fn install_global(domain: Arc<Domain>) -> std::result::Result<(), Arc<Domain>> {
        GLOBAL.set(domain)
    }

    /// The process-wide default domain, if installed
    pub fn global() -> Option<Arc<Domain>> {
        GLOBAL.get().cloned()
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Build a model with the domain's config and register it
    pub fn create_model(self: &Arc<Self>, name: &str, definition: &serde_json::Value) -> Result<Arc<Model>> {
        self.create_model_with_config(name, definition, Arc::clone(&self.config))
    }

    /// Build a model with its own config and register it
    pub fn create_model_with_config(
        self: &Arc<Self>,
        name: &str,
        definition: &serde_json::Value,
        config: Arc<Config>,
    ) -> Result<Arc<Model>> {
        let built = ModelBuilder::new(name, &config, self).build(definition)?;
        Ok(self.register_built(name, built, config))
    }

    /// Build a record model from typed field specs and register it
    pub fn create_model_from_fields(
        self: &Arc<Self>,
        name: &str,
        specs: Vec<(String, FieldSpec)>,
    ) -> Result<Arc<Model>> {
        let config = Arc::clone(&self.config);
        let built = ModelBuilder::new(name, &config, self).build_fields(specs)?;
        Ok(self.register_built(name, built, config))
    }

    /// Register a successful build together with the enums its fields declared
    fn register_built(self: &Arc<Self>, name: &str, mut built: BuiltModel, config: Arc<Config>) -> Arc<Model> {
        for enum_ref in std::mem::take(&mut built.enums) {
            self.set_enum(enum_ref.name(), Arc::clone(&enum_ref));
        }
        let model = Arc::new(Model::from_built(name, built, config, Arc::downgrade(self)));
        self.set_model(name, Arc::clone(&model));
        model
    }

    pub fn set_model(&self, name: &str, model: Arc<Model>) {
        debug!(model = name, fields = model.fields().len(), "registered model");
        self.models.write().insert(name.to_lowercase(), model);
    }

    pub fn get_model(&self, name: &str) -> Option<Arc<Model>> {
        self.models.read().get(&name.to_lowercase()).cloned()
    }

    /// Create an enum and register it
    pub fn create_enum<I, S>(&self, name: &str, values: I) -> Result<Arc<Enum>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let enum_ref = Arc::new(Enum::new(name, values)?);
        self.set_enum(name, Arc::clone(&enum_ref));
        Ok(enum_ref)
    }

    pub fn set_enum(&self, name: &str, enum_ref: Arc<Enum>) {
        debug!(enum_name = name, labels = enum_ref.len(), "registered enum");
        self.enums.write().insert(name.to_lowercase(), enum_ref);
    }

    pub fn get_enum(&self, name: &str) -> Option<Arc<Enum>> {
        self.enums.read().get(&name.to_lowercase()).cloned()
    }

    /// Registered model names, sorted
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.models.read().values().map(|m| m.name().to_string()).collect();
        names.sort();
        names
    }

    /// Registered enum names, sorted
    pub fn enum_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.enums.read().values().map(|e| e.name().to_string()).collect();
        names.sort();
        names
    }

    /// Model names fuzzily matching `query`, best first
    pub fn search_models(&self, query: &str, limit: usize) -> Vec<String> {
        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, String)> = self
            .models
            .read()
            .values()
            .filter_map(|m| {
                matcher
                    .fuzzy_match(m.name(), query)
                    .map(|score| (score, m.name().to_string()))
            })
            .collect();

        results.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        results.into_iter().take(limit).map(|(_, name)| name).collect()
    }
}
