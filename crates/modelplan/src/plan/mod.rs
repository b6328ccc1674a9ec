//! Codec plans: per-model tables of compiled field handlers.
//!
//! A plan is built once per model and codec, then shared read-only. Both
//! codecs resolve field handlers through [`resolve_handler`], so a field is
//! typed the same way by the tagged and the binary codec.

pub mod cache;

pub use cache::PlanCache;

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use thiserror::Error;

use crate::schema::{FieldDescriptor, ModelDescriptor, ModelRef, NumberType, SchemaError, TypeRef};

/// Plan build errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("no codec handler for {model}.{key} of type {type_name}")]
    UnsupportedType {
        model: String,
        key: String,
        type_name: String,
    },
}

/// Leaf value kinds with a direct codec representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Bool,
    Number,
    Date,
    Object,
    Fixed(NumberType),
}

/// How one field is encoded, before it is compiled for a codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldHandler {
    Primitive(Primitive),
    /// Whole-instance encoding through the embedded model's plan.
    Model(ModelRef),
    /// Element handler applied to each item. Never nested.
    Array(Box<FieldHandler>),
}

/// Resolves the handler for a field.
///
/// Rules apply in order: primitive, fixed-width number, embedded model.
/// Array fields wrap the element handler once. Anything else is
/// [`PlanError::UnsupportedType`].
pub fn resolve_handler(
    model: &ModelDescriptor,
    field: &FieldDescriptor,
) -> Result<FieldHandler, PlanError> {
    let item = field.item_type();
    let handler = match item {
        TypeRef::String => FieldHandler::Primitive(Primitive::String),
        TypeRef::Bool => FieldHandler::Primitive(Primitive::Bool),
        TypeRef::Number => FieldHandler::Primitive(Primitive::Number),
        TypeRef::Date => FieldHandler::Primitive(Primitive::Date),
        TypeRef::Object => FieldHandler::Primitive(Primitive::Object),
        TypeRef::Fixed(n) => FieldHandler::Primitive(Primitive::Fixed(*n)),
        TypeRef::Model(m) if field.embedded_model.as_ref() == Some(m) => {
            FieldHandler::Model(m.clone())
        }
        TypeRef::Model(_) | TypeRef::Array | TypeRef::Untyped => {
            return Err(PlanError::UnsupportedType {
                model: model.name().to_string(),
                key: field.key.clone(),
                type_name: item.kind().to_string(),
            })
        }
    };
    Ok(if field.is_array() {
        FieldHandler::Array(Box::new(handler))
    } else {
        handler
    })
}

/// A codec that plans can be compiled for.
///
/// Implementations turn handlers into encode/decode closures. Closures for
/// embedded models receive a [`PlanLink`] that is bound once the embedded
/// plan finishes building, which may be after the closure is created.
pub trait Codec: Sized + Send + Sync + 'static {
    /// Codec name used in logs.
    const NAME: &'static str;

    type Encode: Clone + Send + Sync;
    type Decode: Clone + Send + Sync;

    fn primitive(primitive: Primitive) -> (Self::Encode, Self::Decode);

    fn model(link: PlanLink<Self>) -> (Self::Encode, Self::Decode);

    fn array(element: (Self::Encode, Self::Decode)) -> (Self::Encode, Self::Decode);
}

pub(crate) type PlanCell<C> = Arc<OnceLock<Arc<Plan<C>>>>;

/// Late-bound reference from a compiled handler to an embedded model's plan.
pub struct PlanLink<C: Codec> {
    model: ModelRef,
    cell: Weak<OnceLock<Arc<Plan<C>>>>,
}

impl<C: Codec> PlanLink<C> {
    pub(crate) fn new(model: ModelRef, cell: &PlanCell<C>) -> Self {
        Self {
            model,
            cell: Arc::downgrade(cell),
        }
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// The bound plan. `None` only if its cache was dropped.
    pub fn plan(&self) -> Option<Arc<Plan<C>>> {
        self.cell.upgrade().and_then(|cell| cell.get().cloned())
    }
}

impl<C: Codec> Clone for PlanLink<C> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<C: Codec> fmt::Debug for PlanLink<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanLink")
            .field("model", &self.model)
            .field("bound", &self.plan().is_some())
            .finish()
    }
}

/// Compiled serialize and deserialize tables for one model, in declaration
/// order.
pub struct Plan<C: Codec> {
    descriptor: Arc<ModelDescriptor>,
    serialize: IndexMap<String, C::Encode>,
    deserialize: IndexMap<String, C::Decode>,
}

impl<C: Codec> Plan<C> {
    pub(crate) fn new(
        descriptor: Arc<ModelDescriptor>,
        serialize: IndexMap<String, C::Encode>,
        deserialize: IndexMap<String, C::Decode>,
    ) -> Self {
        Self {
            descriptor,
            serialize,
            deserialize,
        }
    }

    pub fn descriptor(&self) -> &Arc<ModelDescriptor> {
        &self.descriptor
    }

    pub fn serializer(&self, key: &str) -> Option<&C::Encode> {
        self.serialize.get(key)
    }

    pub fn deserializer(&self, key: &str) -> Option<&C::Decode> {
        self.deserialize.get(key)
    }

    pub fn serializers(&self) -> impl Iterator<Item = (&str, &C::Encode)> {
        self.serialize.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn deserializers(&self) -> impl Iterator<Item = (&str, &C::Decode)> {
        self.deserialize.iter().map(|(k, f)| (k.as_str(), f))
    }

    /// Deserializer by declaration index.
    pub fn deserializer_at(&self, index: usize) -> Option<(&str, &C::Decode)> {
        self.deserialize
            .get_index(index)
            .map(|(k, f)| (k.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.serialize.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serialize.is_empty()
    }
}

impl<C: Codec> fmt::Debug for Plan<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("codec", &C::NAME)
            .field("model", &self.descriptor.model)
            .field("fields", &self.serialize.keys().collect::<Vec<_>>())
            .finish()
    }
}
