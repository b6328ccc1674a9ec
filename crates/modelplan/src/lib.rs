//! Schema-driven models with compiled codecs.
//!
//! Models are declared with [`ModelDecl`]/[`FieldDecl`] and registered in a
//! [`Registry`]. Each codec compiles one plan per model on first use:
//!
//! - [`TaggedCodec`] - to and from `serde_json::Value`, optionally only the
//!   mutated fields
//! - [`BinaryCodec`] - dense big-endian bytes with a presence list
//!
//! [`Instance`]s track which fields changed since the last clean checkpoint,
//! including array operation logs, and [`validation::validate`] runs async
//! validator chains over them.
//!
//! # Example
//!
//! ```
//! use modelplan::{BinaryCodec, FieldDecl, ModelDecl, Registry, TaggedCodec, TypeRef};
//! use serde_json::json;
//!
//! let registry = Registry::new();
//! registry
//!     .register(
//!         ModelDecl::new("User")
//!             .field(FieldDecl::string("_id").identity())
//!             .field(FieldDecl::string("name"))
//!             .field(FieldDecl::array("tags", TypeRef::String)),
//!     )
//!     .unwrap();
//!
//! let tagged = TaggedCodec::new(registry.clone());
//! let mut user = tagged
//!     .deserialize("User", &json!({"_id": "u1", "name": "Ann"}))
//!     .unwrap();
//! assert!(!user.has_mutations());
//!
//! user.set("tags", vec!["admin"]).unwrap();
//! let dirty = tagged
//!     .serialize_with(&user, modelplan::SerializeOptions { mutations_only: true })
//!     .unwrap();
//! assert_eq!(dirty, json!({"tags": ["admin"]}));
//!
//! let binary = BinaryCodec::new(registry);
//! let bytes = binary.encode(&user).unwrap();
//! assert_eq!(binary.decode("User", &bytes).unwrap(), user);
//! ```

pub mod codec;
mod error;
pub mod instance;
pub mod plan;
pub mod schema;
pub mod validation;
pub mod value;

pub use codec::{BinaryCodec, DecodeError, DeserializeOptions, EncodeError, SerializeOptions, TaggedCodec};
pub use error::{Error, Result};
pub use instance::{ArrayOp, Instance, InstanceError, Mutation, MutationRecord, TrackedArray, TrackedCollection};
pub use plan::{PlanCache, PlanError};
pub use schema::{
    FieldDecl, FieldDescriptor, ModelDecl, ModelDescriptor, ModelRef, NumberType, Registry, SchemaError, TypeRef,
};
pub use validation::{validate, ValidateError, ValidationFailure, ValidationResult};
pub use value::Value;

pub use modelplan_buffers as buffers;
