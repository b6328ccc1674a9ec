//! Field and model descriptors, and the registry that resolves them.

pub mod field;
pub mod model;
pub mod registry;
pub mod type_ref;

pub use field::{FieldDecl, FieldDescriptor};
pub use model::{ModelDecl, ModelDescriptor};
pub use registry::Registry;
pub use type_ref::{ModelRef, NumberType, TypeRef};

use thiserror::Error;

/// Errors raised while resolving a model declaration. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{model} cannot have more than one identity field (got `{first}` and `{second}`)")]
    DuplicateIdentity {
        model: String,
        first: String,
        second: String,
    },
    #[error("array field {model}.{key} has no element type")]
    MissingElementType { model: String, key: String },
    #[error("field {model}.{key} is declared more than once")]
    DuplicateField { model: String, key: String },
    #[error("model not registered: {0}")]
    UnknownModel(String),
    #[error("model {0} is already resolved and cannot be redeclared")]
    AlreadyResolved(String),
}
