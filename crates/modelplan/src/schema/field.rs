//! Field declarations and resolved field descriptors.

use std::fmt;

use super::type_ref::{ModelRef, NumberType, TypeRef};
use crate::validation::SharedValidator;

/// A field as declared by the caller, before resolution.
#[derive(Clone)]
pub struct FieldDecl {
    pub key: String,
    pub value_type: TypeRef,
    pub array_element_type: Option<TypeRef>,
    pub is_identity: bool,
    pub required: bool,
    pub validators: Vec<SharedValidator>,
}

impl FieldDecl {
    pub fn new(key: impl Into<String>, value_type: TypeRef) -> Self {
        Self {
            key: key.into(),
            value_type,
            array_element_type: None,
            is_identity: false,
            required: false,
            validators: Vec::new(),
        }
    }

    pub fn string(key: impl Into<String>) -> Self {
        Self::new(key, TypeRef::String)
    }

    pub fn bool(key: impl Into<String>) -> Self {
        Self::new(key, TypeRef::Bool)
    }

    pub fn number(key: impl Into<String>) -> Self {
        Self::new(key, TypeRef::Number)
    }

    pub fn date(key: impl Into<String>) -> Self {
        Self::new(key, TypeRef::Date)
    }

    pub fn object(key: impl Into<String>) -> Self {
        Self::new(key, TypeRef::Object)
    }

    pub fn fixed(key: impl Into<String>, number_type: NumberType) -> Self {
        Self::new(key, TypeRef::Fixed(number_type))
    }

    pub fn model(key: impl Into<String>, model: impl AsRef<str>) -> Self {
        Self::new(key, TypeRef::model(model))
    }

    /// An array field with the given element type.
    pub fn array(key: impl Into<String>, element: TypeRef) -> Self {
        Self::new(key, TypeRef::Array).element(element)
    }

    /// Declares the array element type; the field becomes an array field.
    pub fn element(mut self, element: TypeRef) -> Self {
        self.value_type = TypeRef::Array;
        self.array_element_type = Some(element);
        self
    }

    /// Marks the field as the model's identity field.
    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Appends a validator to the field's chain.
    pub fn validate(mut self, validator: SharedValidator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn is_array(&self) -> bool {
        self.value_type == TypeRef::Array || self.array_element_type.is_some()
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("key", &self.key)
            .field("value_type", &self.value_type)
            .field("array_element_type", &self.array_element_type)
            .field("is_identity", &self.is_identity)
            .field("required", &self.required)
            .field("validators_count", &self.validators.len())
            .finish()
    }
}

/// A resolved, immutable field descriptor.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub key: String,
    pub value_type: TypeRef,
    pub array_element_type: Option<TypeRef>,
    pub is_identity: bool,
    /// Set when the value type (or array element type) is a registered model.
    pub embedded_model: Option<ModelRef>,
    pub validators: Vec<SharedValidator>,
    pub required: bool,
}

impl FieldDescriptor {
    pub fn is_array(&self) -> bool {
        self.array_element_type.is_some()
    }

    /// The type a codec handler is resolved against: the element type for
    /// arrays, the value type otherwise.
    pub fn item_type(&self) -> &TypeRef {
        self.array_element_type.as_ref().unwrap_or(&self.value_type)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("key", &self.key)
            .field("value_type", &self.value_type)
            .field("array_element_type", &self.array_element_type)
            .field("is_identity", &self.is_identity)
            .field("embedded_model", &self.embedded_model)
            .field("required", &self.required)
            .field("validators_count", &self.validators.len())
            .finish()
    }
}
