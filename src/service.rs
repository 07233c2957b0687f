//! Services: named request/response model pairs

use std::sync::Arc;

use indexmap::IndexMap;

use crate::domain::Domain;
use crate::error::{PicobufError, Result};
use crate::model::Model;

/// How a method refers to its request or response model
#[derive(Debug, Clone)]
pub enum ModelRef {
    /// A model registered in the domain. Missing names leave the slot empty.
    Name(String),
    /// An inline definition, built as `<service>.<method>.<request|response>`
    Definition(serde_json::Value),
    /// A built model, registered in the domain if its name is free
    Model(Arc<Model>),
}

impl ModelRef {
    /// Strings name a model, anything else is an inline definition
    pub fn from_json(raw: &serde_json::Value) -> Self {
        match raw {
            serde_json::Value::String(name) => ModelRef::Name(name.clone()),
            other => ModelRef::Definition(other.clone()),
        }
    }
}

impl From<&str> for ModelRef {
    fn from(name: &str) -> Self {
        ModelRef::Name(name.to_string())
    }
}

impl From<Arc<Model>> for ModelRef {
    fn from(model: Arc<Model>) -> Self {
        ModelRef::Model(model)
    }
}

/// A method of a service
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub request: Option<Arc<Model>>,
    pub response: Option<Arc<Model>>,
}

/// A named group of methods
#[derive(Debug)]
pub struct Service {
    name: String,
    domain: Arc<Domain>,
    methods: IndexMap<String, Method>,
}

impl Service {
    pub fn new(name: impl Into<String>, domain: Arc<Domain>) -> Self {
        Self {
            name: name.into(),
            domain,
            methods: IndexMap::new(),
        }
    }

    /// Build a service from `{method: {request, response}}`
    pub fn from_definition(
        name: impl Into<String>,
        definition: &serde_json::Value,
        domain: Arc<Domain>,
    ) -> Result<Self> {
        let mut service = Self::new(name, domain);
        let methods = match definition {
            serde_json::Value::Null => return Ok(service),
            serde_json::Value::Object(methods) => methods,
            other => {
                return Err(PicobufError::InvalidDefinition(format!(
                    "service {} must map method names to request/response pairs, got {}",
                    service.name, other
                )))
            }
        };
        for (method_name, pair) in methods {
            let side = |key: &str| pair.get(key).map(ModelRef::from_json);
            service.create_method(method_name, side("request"), side("response"))?;
        }
        Ok(service)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a method, resolving or building its models
    pub fn create_method(
        &mut self,
        name: &str,
        request: Option<ModelRef>,
        response: Option<ModelRef>,
    ) -> Result<&Method> {
        let request = self.resolve(name, "request", request)?;
        let response = self.resolve(name, "response", response)?;
        let method = Method {
            name: name.to_string(),
            request,
            response,
        };
        self.methods.insert(name.to_string(), method);
        Ok(&self.methods[name])
    }

    pub fn get_method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    fn resolve(&self, method: &str, side: &str, model: Option<ModelRef>) -> Result<Option<Arc<Model>>> {
        match model {
            None => Ok(None),
            Some(ModelRef::Name(name)) => Ok(self.domain.get_model(&name)),
            Some(ModelRef::Definition(definition)) => {
                let model_name = format!("{}.{}.{}", self.name, method, side);
                self.domain.create_model(&model_name, &definition).map(Some)
            }
            Some(ModelRef::Model(model)) => {
                if self.domain.get_model(model.name()).is_none() {
                    self.domain.set_model(model.name(), Arc::clone(&model));
                }
                Ok(Some(model))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_service_with_methods() {
        let domain = Domain::with_defaults();
        domain.create_model("TestModel", &json!({"field": "string"})).unwrap();
        let service = Service::from_definition(
            "TestService",
            &json!({
                "method1": {"request": "TestModel", "response": "TestModel"},
                "method2": {"request": "InvalidModel", "response": "TestModel"},
            }),
            Arc::clone(&domain),
        )
        .unwrap();

        let method1 = service.get_method("method1").unwrap();
        let data = Value::from(json!({"field": "value"}));
        let request = method1.request.as_ref().unwrap();
        let encoded = request.encode(&data).unwrap();
        assert_eq!(request.decode(&encoded).unwrap(), data);

        let method2 = service.get_method("method2").unwrap();
        assert!(method2.request.is_none());
        assert!(method2.response.is_some());
        assert_eq!(service.methods().count(), 2);
    }

    #[test]
    fn test_inline_definitions_are_registered() {
        let domain = Domain::with_defaults();
        let mut service = Service::new("Users", Arc::clone(&domain));
        let method = service
            .create_method(
                "get",
                Some(ModelRef::from_json(&json!({"id": "integer"}))),
                Some(ModelRef::from_json(&json!({"name": "string"}))),
            )
            .unwrap();
        assert_eq!(method.request.as_ref().unwrap().name(), "Users.get.request");
        assert!(domain.get_model("users.get.response").is_some());
    }

    #[test]
    fn test_foreign_domain_model_is_adopted() {
        let source = Domain::with_defaults();
        let model = source.create_model("Shared", &json!({"n": "integer"})).unwrap();

        let domain = Domain::with_defaults();
        let mut service = Service::new("Svc", Arc::clone(&domain));
        service
            .create_method("call", Some(ModelRef::from(Arc::clone(&model))), None)
            .unwrap();
        assert!(Arc::ptr_eq(&domain.get_model("Shared").unwrap(), &model));
    }
}
