//! Tagged-value and binary codecs over compiled plans.

pub mod binary;
pub mod tagged;

pub use binary::{BinaryCodec, BinaryPlan};
pub use tagged::{TaggedCodec, TaggedPlan};

use modelplan_buffers::BufferError;
use thiserror::Error;

use crate::instance::InstanceError;
use crate::plan::PlanError;
use crate::schema::NumberType;
use crate::value::Value;

/// A numeric value checked against a fixed-width type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FixedNumber {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl From<FixedNumber> for Value {
    fn from(n: FixedNumber) -> Self {
        match n {
            FixedNumber::Signed(v) => Value::Int(v),
            FixedNumber::Unsigned(v) => Value::Uint(v),
            FixedNumber::Float(v) => Value::Float(v),
        }
    }
}

/// Narrows a numeric value to `number_type`. `None` when it is not
/// numeric or does not fit.
pub(crate) fn fit_fixed(number_type: NumberType, value: &Value) -> Option<FixedNumber> {
    let bits = number_type.size() * 8;
    if number_type.is_float() {
        value.as_f64().map(FixedNumber::Float)
    } else if number_type.is_signed_int() {
        value
            .as_i64()
            .filter(|v| bits == 64 || (-(1i64 << (bits - 1))..(1i64 << (bits - 1))).contains(v))
            .map(FixedNumber::Signed)
    } else {
        value
            .as_u64()
            .filter(|v| bits == 64 || *v < (1u64 << bits))
            .map(FixedNumber::Unsigned)
    }
}

pub(crate) fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Uint(_) | Value::Float(_))
}

/// Text of a numeric value for range errors.
pub(crate) fn numeric_text(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Uint(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        other => other.kind().to_string(),
    }
}

/// Checks a value against a fixed-width type for encoding.
pub(crate) fn encode_fixed(number_type: NumberType, value: &Value) -> Result<FixedNumber, EncodeError> {
    if !is_numeric(value) {
        return Err(EncodeError::TypeMismatch {
            expected: number_type.name(),
            found: value.kind(),
        });
    }
    fit_fixed(number_type, value).ok_or_else(|| EncodeError::OutOfRange {
        number_type: number_type.name(),
        value: numeric_text(value),
    })
}

/// Options for [`TaggedCodec::serialize_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Emit only fields present in the mutation record.
    pub mutations_only: bool,
}

/// Options for [`TaggedCodec::deserialize_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeserializeOptions {
    /// Clear the new instance's mutations after assignment.
    pub clear_mutations: bool,
}

impl Default for DeserializeOptions {
    fn default() -> Self {
        Self {
            clear_mutations: true,
        }
    }
}

/// Errors while encoding an instance.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("{model}.{key}: {source}")]
    Field {
        model: String,
        key: String,
        #[source]
        source: Box<EncodeError>,
    },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{value} does not fit {number_type}")]
    OutOfRange {
        number_type: &'static str,
        value: String,
    },
    #[error("non-finite number {0} has no tagged representation")]
    NonFinite(f64),
    #[error("{model} has {count} fields; a binary payload indexes at most 256")]
    TooManyFields { model: String, count: usize },
    #[error("plan for {0} is no longer available")]
    PlanUnavailable(String),
    #[error("object field is not serializable: {0}")]
    Json(#[from] serde_json::Error),
}

impl EncodeError {
    pub(crate) fn in_field(self, model: &str, key: &str) -> Self {
        Self::Field {
            model: model.to_string(),
            key: key.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any field context.
    pub fn root_cause(&self) -> &EncodeError {
        match self {
            Self::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Errors while decoding tagged or binary input.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("{model}.{key}: {source}")]
    Field {
        model: String,
        key: String,
        #[source]
        source: Box<DecodeError>,
    },
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("invalid base64 string: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("invalid JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("presence index {index} out of range for {model} ({len} fields)")]
    UnknownFieldIndex {
        model: String,
        index: usize,
        len: usize,
    },
    #[error("presence index {index} of {model} does not follow {previous}")]
    UnorderedFieldIndex {
        model: String,
        index: usize,
        previous: usize,
    },
    #[error("{model} nested deeper than {limit} levels")]
    TooDeep { model: String, limit: usize },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{value} does not fit {number_type}")]
    OutOfRange {
        number_type: &'static str,
        value: String,
    },
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("plan for {0} is no longer available")]
    PlanUnavailable(String),
    #[error(transparent)]
    Instance(#[from] InstanceError),
}

impl DecodeError {
    pub(crate) fn in_field(self, model: &str, key: &str) -> Self {
        Self::Field {
            model: model.to_string(),
            key: key.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any field context.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            Self::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
