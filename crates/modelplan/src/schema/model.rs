//! Model declarations and resolved model descriptors.

use indexmap::IndexMap;

use super::field::{FieldDecl, FieldDescriptor};
use super::type_ref::ModelRef;

/// A model as declared by the caller: a name and an ordered field list.
#[derive(Debug, Clone)]
pub struct ModelDecl {
    pub name: ModelRef,
    pub fields: Vec<FieldDecl>,
}

impl ModelDecl {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: ModelRef::new(name),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

/// The resolved shape of a model. Field order is declaration order and is
/// significant to the binary codec.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub model: ModelRef,
    pub fields: IndexMap<String, FieldDescriptor>,
    pub(crate) identity: Option<String>,
}

impl ModelDescriptor {
    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.get(key)
    }

    pub fn identity_field(&self) -> Option<&FieldDescriptor> {
        self.identity.as_deref().and_then(|key| self.fields.get(key))
    }

    pub fn is_identity(&self, key: &str) -> bool {
        self.identity.as_deref() == Some(key)
    }

    /// Position of `key` in declaration order.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.fields.get_index_of(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
