//! Registry: a namespace of named model declarations.
//!
//! Declarations are resolved lazily, once per model, into shared
//! [`ModelDescriptor`]s. A resolved descriptor is immutable.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::debug;

use super::field::FieldDescriptor;
use super::model::{ModelDecl, ModelDescriptor};
use super::type_ref::{ModelRef, TypeRef};
use super::SchemaError;
use crate::instance::Instance;
use crate::validation::rules;

#[derive(Debug, Default)]
struct RegistryInner {
    decls: HashMap<ModelRef, ModelDecl>,
    resolved: HashMap<ModelRef, Arc<ModelDescriptor>>,
}

/// Shared model registry.
///
/// Cloning is cheap; clones share the same declarations and resolved
/// descriptors.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model declaration.
    ///
    /// Re-registering a name replaces the previous declaration, unless that
    /// model was already resolved.
    pub fn register(&self, decl: ModelDecl) -> Result<ModelRef, SchemaError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let name = decl.name.clone();
        if inner.resolved.contains_key(&name) {
            return Err(SchemaError::AlreadyResolved(name.name().to_string()));
        }
        inner.decls.insert(name.clone(), decl);
        Ok(name)
    }

    /// Check whether a model with this name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.decls.contains_key(&ModelRef::new(name))
    }

    /// Resolve a model into its descriptor, validating the declaration on
    /// first use.
    pub fn resolve(&self, name: &str) -> Result<Arc<ModelDescriptor>, SchemaError> {
        let model = ModelRef::new(name);
        let descriptor = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(found) = inner.resolved.get(&model) {
                return Ok(Arc::clone(found));
            }
            let decl = inner
                .decls
                .get(&model)
                .ok_or_else(|| SchemaError::UnknownModel(name.to_string()))?;
            build_descriptor(decl, |m| inner.decls.contains_key(m))?
        };

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have resolved concurrently; the first one wins.
        let entry = inner
            .resolved
            .entry(model)
            .or_insert_with(|| Arc::new(descriptor));
        debug!(model = name, fields = entry.len(), "resolved model descriptor");
        Ok(Arc::clone(entry))
    }

    /// Create a new, empty and clean instance of a model.
    pub fn instance(&self, name: &str) -> Result<Instance, SchemaError> {
        Ok(Instance::new(self.resolve(name)?))
    }
}

fn build_descriptor(
    decl: &ModelDecl,
    is_registered: impl Fn(&ModelRef) -> bool,
) -> Result<ModelDescriptor, SchemaError> {
    let model = decl.name.name();
    let mut fields: IndexMap<String, FieldDescriptor> = IndexMap::with_capacity(decl.fields.len());
    let mut identity: Option<String> = None;

    for field in &decl.fields {
        if fields.contains_key(&field.key) {
            return Err(SchemaError::DuplicateField {
                model: model.to_string(),
                key: field.key.clone(),
            });
        }

        if field.is_identity {
            if let Some(first) = &identity {
                return Err(SchemaError::DuplicateIdentity {
                    model: model.to_string(),
                    first: first.clone(),
                    second: field.key.clone(),
                });
            }
            identity = Some(field.key.clone());
        }

        if field.is_array() && field.array_element_type.is_none() {
            return Err(SchemaError::MissingElementType {
                model: model.to_string(),
                key: field.key.clone(),
            });
        }

        let linked = field
            .array_element_type
            .as_ref()
            .unwrap_or(&field.value_type);
        let embedded_model = match linked {
            TypeRef::Model(m) if is_registered(m) => Some(m.clone()),
            _ => None,
        };

        let mut validators = Vec::with_capacity(field.validators.len() + 1);
        if field.required {
            validators.push(rules::required());
        }
        validators.extend(field.validators.iter().cloned());

        fields.insert(
            field.key.clone(),
            FieldDescriptor {
                key: field.key.clone(),
                value_type: field.value_type.clone(),
                array_element_type: field.array_element_type.clone(),
                is_identity: field.is_identity,
                embedded_model,
                validators,
                required: field.required,
            },
        );
    }

    Ok(ModelDescriptor {
        model: decl.name.clone(),
        fields,
        identity,
    })
}
