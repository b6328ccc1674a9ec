//! Type references used by field declarations.

use std::fmt;
use std::sync::Arc;

/// A fixed-width numeric type. The width only matters to the binary codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

impl NumberType {
    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    pub const fn is_signed_int(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

/// Reference to a model type by its registered name.
///
/// The name is the type identity: plans and descriptors are cached by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelRef(Arc<str>);

impl ModelRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModelRef {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The declared type of a field or of an array element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    String,
    Bool,
    /// Untyped number; 64-bit float on the wire.
    Number,
    Date,
    /// Free-form JSON-like object.
    Object,
    Fixed(NumberType),
    Model(ModelRef),
    /// Array marker. The element type lives on the field declaration.
    Array,
    /// No type information. No codec handles it.
    Untyped,
}

impl TypeRef {
    pub fn model(name: impl AsRef<str>) -> Self {
        Self::Model(ModelRef::new(name))
    }

    /// Returns the kind string used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Date => "date",
            Self::Object => "object",
            Self::Fixed(n) => n.name(),
            Self::Model(m) => m.name(),
            Self::Array => "array",
            Self::Untyped => "untyped",
        }
    }

    pub fn as_model(&self) -> Option<&ModelRef> {
        match self {
            Self::Model(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
