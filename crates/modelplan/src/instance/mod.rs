//! Model instances: a private field-value store plus a mutation record.

mod canonical;
pub mod mutation;
pub mod tracked;

pub use mutation::{ArrayOp, Mutation, MutationRecord};
pub use tracked::{TrackedArray, TrackedCollection};

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::schema::ModelDescriptor;
use crate::value::Value;

/// Errors from field access on an instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("{model} has no field `{key}`")]
    UnknownField { model: String, key: String },
    #[error("field {model}.{key} does not hold an array")]
    NotAnArray { model: String, key: String },
    #[error("index {index} out of bounds for `{key}` (len {len})")]
    IndexOutOfBounds { key: String, index: usize, len: usize },
    #[error("{model}.{key}: {value} does not fit {number_type}")]
    OutOfRange {
        model: String,
        key: String,
        number_type: &'static str,
        value: String,
    },
}

/// One model instance.
///
/// Equality compares the model and the defined field values; mutation state
/// is ignored.
#[derive(Debug, Clone)]
pub struct Instance {
    descriptor: Arc<ModelDescriptor>,
    data: IndexMap<String, Value>,
    mutations: MutationRecord,
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.model == other.descriptor.model && self.data == other.data
    }
}

impl Instance {
    /// A new instance with every field undefined and no mutations.
    pub fn new(descriptor: Arc<ModelDescriptor>) -> Self {
        Self {
            descriptor,
            data: IndexMap::new(),
            mutations: MutationRecord::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<ModelDescriptor> {
        &self.descriptor
    }

    pub fn model_name(&self) -> &str {
        self.descriptor.name()
    }

    /// Current value of a field; `None` when undefined.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn is_defined(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Defined fields, in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Mutable access to an embedded model. Changes are tracked by the
    /// embedded instance itself.
    pub fn model_mut(&mut self, key: &str) -> Option<&mut Instance> {
        self.data.get_mut(key).and_then(Value::as_instance_mut)
    }

    /// Assigns a field.
    ///
    /// The value is first brought into the form the codecs decode for the
    /// field's declared type: `Number` and float widths become `Float`,
    /// integer widths `Int` or `Uint` (out-of-range values are rejected),
    /// dates are truncated to milliseconds and a single value assigned to an
    /// array field is wrapped. Identity fields are never marked
    /// dirty. Array fields are marked dirty on every assignment; other
    /// fields only when the value changes.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), InstanceError> {
        let field = self.descriptor.field(key).ok_or_else(|| self.unknown(key))?;
        let value = canonical::canonical_field(self.descriptor.name(), field, value.into())?;
        let is_identity = field.is_identity;
        let is_array = field.is_array();

        if is_identity {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }
        if !is_array && self.data.get(key) == Some(&value) {
            return Ok(());
        }
        self.data.insert(key.to_string(), value);
        self.mutations.mark_dirty(key);
        Ok(())
    }

    /// Makes a field undefined again, returning the previous value.
    pub fn unset(&mut self, key: &str) -> Result<Option<Value>, InstanceError> {
        if self.descriptor.field(key).is_none() {
            return Err(self.unknown(key));
        }
        let previous = self.data.shift_remove(key);
        if previous.is_some() && !self.descriptor.is_identity(key) {
            self.mutations.mark_dirty(key);
        }
        Ok(previous)
    }

    /// Tracked handle over an array field's current value. Items added
    /// through the handle are canonicalized like [`Instance::set`].
    pub fn array_mut(&mut self, key: &str) -> Result<TrackedArray<'_>, InstanceError> {
        let descriptor: &ModelDescriptor = &self.descriptor;
        let Some(field) = descriptor.field(key) else {
            return Err(self.unknown(key));
        };
        let record = (!field.is_identity).then_some(&mut self.mutations);
        match self.data.get_mut(key) {
            Some(Value::Array(items)) => Ok(TrackedArray::new(descriptor.name(), field, items, record)),
            _ => Err(InstanceError::NotAnArray {
                model: descriptor.name().to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Stores a value without touching the mutation record.
    pub(crate) fn store(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    /// Read-only view of the mutation record.
    pub fn mutations(&self) -> &MutationRecord {
        &self.mutations
    }

    /// Marks a field wholly dirty. No-op for the identity field.
    pub fn mark_dirty(&mut self, key: &str) {
        if !self.descriptor.is_identity(key) {
            self.mutations.mark_dirty(key);
        }
    }

    /// Records an array operation performed outside a [`TrackedArray`].
    pub fn record_array_op(&mut self, key: &str, op: ArrayOp) {
        if !self.descriptor.is_identity(key) {
            self.mutations.record_array_op(key, op);
        }
    }

    /// Clears mutation entries for `fields`, or all of them.
    pub fn clear_mutations(&mut self, fields: Option<&[&str]>) {
        self.mutations.clear(fields);
    }

    /// True if any field is dirty, including inside embedded models and
    /// arrays of embedded models. The identity field is not inspected.
    pub fn has_mutations(&self) -> bool {
        if !self.mutations.is_empty() {
            return true;
        }
        self.data
            .iter()
            .filter(|(key, _)| !self.descriptor.is_identity(key))
            .any(|(_, value)| value_has_mutations(value))
    }

    fn unknown(&self, key: &str) -> InstanceError {
        InstanceError::UnknownField {
            model: self.descriptor.name().to_string(),
            key: key.to_string(),
        }
    }
}

fn value_has_mutations(value: &Value) -> bool {
    match value {
        Value::Model(inner) => inner.has_mutations(),
        Value::Array(items) => items
            .iter()
            .any(|item| matches!(item, Value::Model(inner) if inner.has_mutations())),
        _ => false,
    }
}
