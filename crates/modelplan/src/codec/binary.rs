//! Binary codec: dense big-endian encoding with a leading presence list.
//!
//! ```text
//! [u32 count][u8 index]*count [field bytes in index order]
//! ```
//!
//! Only defined, non-null fields are present. Strings are UTF-8 re-encoded
//! as standard base64 and stored as `u32` length plus ASCII bytes; objects
//! are JSON text stored the same way. Dates and untyped numbers are `f64`.
//! Arrays are a `u32` count followed by each element. The layout carries no
//! version; reordering fields breaks compatibility, see
//! [`BinaryCodec::fingerprint`].

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use modelplan_buffers::{BufferError, Reader, Writer};

use super::{encode_fixed, DecodeError, EncodeError, FixedNumber};
use crate::instance::Instance;
use crate::plan::{Codec, Plan, PlanCache, PlanError, PlanLink, Primitive};
use crate::schema::{NumberType, Registry};
use crate::value::{date_from_millis, date_to_millis, Value};

/// Largest field count addressable by a `u8` presence index.
pub const MAX_FIELDS: usize = 256;

/// Deepest embedded-model nesting accepted when decoding.
pub const MAX_DEPTH: usize = 128;

/// A compiled binary encoder for one field.
pub type BinaryEncodeFn = Arc<dyn Fn(&Value, &mut Writer) -> Result<(), EncodeError> + Send + Sync>;

/// A compiled binary decoder for one field. The `usize` is the nesting
/// depth of the instance that owns the field.
pub type BinaryDecodeFn = Arc<dyn Fn(&mut Reader<'_>, usize) -> Result<Value, DecodeError> + Send + Sync>;

/// Marker type selecting binary handlers.
#[derive(Debug, Clone, Copy)]
pub struct Binary;

pub type BinaryPlan = Plan<Binary>;

impl Codec for Binary {
    const NAME: &'static str = "binary";

    type Encode = BinaryEncodeFn;
    type Decode = BinaryDecodeFn;

    fn primitive(primitive: Primitive) -> (BinaryEncodeFn, BinaryDecodeFn) {
        (encoder(primitive), decoder(primitive))
    }

    fn model(link: PlanLink<Self>) -> (BinaryEncodeFn, BinaryDecodeFn) {
        let encode_link = link.clone();
        let encode: BinaryEncodeFn = Arc::new(move |value: &Value, writer: &mut Writer| {
            let instance = value.as_instance().ok_or(EncodeError::TypeMismatch {
                expected: "model",
                found: value.kind(),
            })?;
            let plan = encode_link
                .plan()
                .ok_or_else(|| EncodeError::PlanUnavailable(encode_link.model().to_string()))?;
            encode_instance(&plan, instance, writer)
        });
        let decode: BinaryDecodeFn = Arc::new(move |reader: &mut Reader<'_>, depth: usize| {
            if depth >= MAX_DEPTH {
                return Err(DecodeError::TooDeep {
                    model: link.model().to_string(),
                    limit: MAX_DEPTH,
                });
            }
            let plan = link
                .plan()
                .ok_or_else(|| DecodeError::PlanUnavailable(link.model().to_string()))?;
            decode_instance(&plan, reader, depth + 1).map(Value::Model)
        });
        (encode, decode)
    }

    fn array((encode, decode): (BinaryEncodeFn, BinaryDecodeFn)) -> (BinaryEncodeFn, BinaryDecodeFn) {
        let encode: BinaryEncodeFn = Arc::new(move |value: &Value, writer: &mut Writer| {
            let items = match value {
                Value::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            writer.u32(length(items.len())?);
            items.iter().try_for_each(|item| encode(item, writer))
        });
        let decode: BinaryDecodeFn = Arc::new(move |reader: &mut Reader<'_>, depth: usize| {
            let count = reader.u32()? as usize;
            let mut items = Vec::with_capacity(count.min(reader.size()));
            for _ in 0..count {
                items.push(decode(reader, depth)?);
            }
            Ok(Value::Array(items))
        });
        (encode, decode)
    }
}

fn length(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::OutOfRange {
        number_type: NumberType::Uint32.name(),
        value: len.to_string(),
    })
}

fn mismatch(expected: &'static str, value: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected,
        found: value.kind(),
    }
}

fn write_string(writer: &mut Writer, s: &str) -> Result<(), EncodeError> {
    let encoded = STANDARD.encode(s.as_bytes());
    writer.u32(length(encoded.len())?);
    writer.ascii(&encoded);
    Ok(())
}

fn read_string(reader: &mut Reader<'_>) -> Result<String, DecodeError> {
    let len = reader.u32()? as usize;
    let encoded = reader.ascii(len)?;
    let bytes = STANDARD.decode(encoded)?;
    String::from_utf8(bytes).map_err(|_| DecodeError::Buffer(BufferError::InvalidUtf8))
}

fn encoder(primitive: Primitive) -> BinaryEncodeFn {
    match primitive {
        Primitive::String => Arc::new(|value: &Value, writer: &mut Writer| match value {
            Value::String(s) => write_string(writer, s),
            other => Err(mismatch("string", other)),
        }),
        Primitive::Bool => Arc::new(|value: &Value, writer: &mut Writer| match value {
            Value::Bool(b) => {
                writer.u8(u8::from(*b));
                Ok(())
            }
            other => Err(mismatch("bool", other)),
        }),
        Primitive::Number => Arc::new(|value: &Value, writer: &mut Writer| {
            let n = value.as_f64().ok_or_else(|| mismatch("number", value))?;
            writer.f64(n);
            Ok(())
        }),
        Primitive::Date => Arc::new(|value: &Value, writer: &mut Writer| match value {
            Value::Date(d) => {
                writer.f64(date_to_millis(d));
                Ok(())
            }
            other => Err(mismatch("date", other)),
        }),
        Primitive::Object => Arc::new(|value: &Value, writer: &mut Writer| match value {
            Value::Object(o) => write_string(writer, &serde_json::to_string(o)?),
            other => Err(mismatch("object", other)),
        }),
        Primitive::Fixed(number_type) => Arc::new(move |value: &Value, writer: &mut Writer| {
            match encode_fixed(number_type, value)? {
                FixedNumber::Signed(v) => match number_type.size() {
                    1 => writer.i8(v as i8),
                    2 => writer.i16(v as i16),
                    4 => writer.i32(v as i32),
                    _ => writer.i64(v),
                },
                FixedNumber::Unsigned(v) => match number_type.size() {
                    1 => writer.u8(v as u8),
                    2 => writer.u16(v as u16),
                    4 => writer.u32(v as u32),
                    _ => writer.u64(v),
                },
                FixedNumber::Float(v) if number_type.size() == 4 => writer.f32(v as f32),
                FixedNumber::Float(v) => writer.f64(v),
            }
            Ok(())
        }),
    }
}

fn read_fixed(number_type: NumberType, reader: &mut Reader<'_>) -> Result<Value, BufferError> {
    Ok(match number_type {
        NumberType::Int8 => Value::Int(i64::from(reader.i8()?)),
        NumberType::Int16 => Value::Int(i64::from(reader.i16()?)),
        NumberType::Int32 => Value::Int(i64::from(reader.i32()?)),
        NumberType::Int64 => Value::Int(reader.i64()?),
        NumberType::Uint8 => Value::Uint(u64::from(reader.u8()?)),
        NumberType::Uint16 => Value::Uint(u64::from(reader.u16()?)),
        NumberType::Uint32 => Value::Uint(u64::from(reader.u32()?)),
        NumberType::Uint64 => Value::Uint(reader.u64()?),
        NumberType::Float32 => Value::Float(f64::from(reader.f32()?)),
        NumberType::Float64 => Value::Float(reader.f64()?),
    })
}

fn decoder(primitive: Primitive) -> BinaryDecodeFn {
    match primitive {
        Primitive::String => Arc::new(|reader: &mut Reader<'_>, _| read_string(reader).map(Value::String)),
        Primitive::Bool => Arc::new(|reader: &mut Reader<'_>, _| Ok(Value::Bool(reader.u8()? != 0))),
        Primitive::Number => Arc::new(|reader: &mut Reader<'_>, _| Ok(Value::Float(reader.f64()?))),
        Primitive::Date => Arc::new(|reader: &mut Reader<'_>, _| {
            let millis = reader.f64()?;
            date_from_millis(millis)
                .map(Value::Date)
                .ok_or_else(|| DecodeError::InvalidDate(millis.to_string()))
        }),
        Primitive::Object => Arc::new(|reader: &mut Reader<'_>, _| {
            let text = read_string(reader)?;
            Ok(Value::Object(serde_json::from_str(&text)?))
        }),
        Primitive::Fixed(number_type) => {
            Arc::new(move |reader: &mut Reader<'_>, _| Ok(read_fixed(number_type, reader)?))
        }
    }
}

fn encode_instance(plan: &BinaryPlan, instance: &Instance, writer: &mut Writer) -> Result<(), EncodeError> {
    let model = plan.descriptor().name();
    if plan.len() > MAX_FIELDS {
        return Err(EncodeError::TooManyFields {
            model: model.to_string(),
            count: plan.len(),
        });
    }

    let present: Vec<_> = plan
        .serializers()
        .enumerate()
        .filter_map(|(index, (key, encode))| match instance.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some((index, key, encode, value)),
        })
        .collect();

    writer.u32(length(present.len())?);
    for (index, ..) in &present {
        writer.u8(*index as u8);
    }
    for (_, key, encode, value) in present {
        encode(value, writer).map_err(|e| e.in_field(model, key))?;
    }
    Ok(())
}

/// Decodes one instance at nesting `depth`. Presence indices must be in
/// range and strictly increasing.
fn decode_instance(plan: &BinaryPlan, reader: &mut Reader<'_>, depth: usize) -> Result<Instance, DecodeError> {
    let model = plan.descriptor().name();
    let unknown = |index: usize| DecodeError::UnknownFieldIndex {
        model: model.to_string(),
        index,
        len: plan.len(),
    };

    let count = reader.u32()? as usize;
    let mut indices: Vec<usize> = Vec::with_capacity(count.min(reader.size()));
    for _ in 0..count {
        let index = usize::from(reader.u8()?);
        if index >= plan.len() {
            return Err(unknown(index));
        }
        if let Some(&previous) = indices.last() {
            if index <= previous {
                return Err(DecodeError::UnorderedFieldIndex {
                    model: model.to_string(),
                    index,
                    previous,
                });
            }
        }
        indices.push(index);
    }

    let mut instance = Instance::new(Arc::clone(plan.descriptor()));
    for index in indices {
        let (key, decode) = plan.deserializer_at(index).ok_or_else(|| unknown(index))?;
        let value = decode(reader, depth).map_err(|e| e.in_field(model, key))?;
        instance.store(key, value);
    }
    Ok(instance)
}

/// Hash of a space-joined key list, 31-multiplier over UTF-16 units.
fn hash_keys<'a>(keys: impl Iterator<Item = &'a str>) -> u32 {
    let mut state: i32 = 0;
    let mut first = true;
    for key in keys {
        if !first {
            state = state.wrapping_mul(31).wrapping_add(i32::from(b' '));
        }
        first = false;
        for unit in key.encode_utf16() {
            state = state.wrapping_mul(31).wrapping_add(i32::from(unit));
        }
    }
    state as u32
}

/// Converts instances to and from the binary form, caching one plan per
/// model.
#[derive(Debug)]
pub struct BinaryCodec {
    plans: PlanCache<Binary>,
}

impl BinaryCodec {
    pub fn new(registry: Registry) -> Self {
        Self {
            plans: PlanCache::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.plans.registry()
    }

    /// The compiled plan for `model`.
    pub fn plan(&self, model: &str) -> Result<Arc<BinaryPlan>, PlanError> {
        self.plans.get(model)
    }

    pub fn encode(&self, instance: &Instance) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::new();
        self.encode_into(instance, &mut writer)?;
        Ok(writer.flush())
    }

    /// Appends the encoding of `instance` to `writer`.
    pub fn encode_into(&self, instance: &Instance, writer: &mut Writer) -> Result<(), EncodeError> {
        let plan = self.plan(instance.model_name())?;
        encode_instance(&plan, instance, writer)
    }

    /// Decodes one instance from the start of `bytes`. The instance is clean.
    pub fn decode(&self, model: &str, bytes: &[u8]) -> Result<Instance, DecodeError> {
        self.decode_at(model, bytes, 0).map(|(instance, _)| instance)
    }

    /// Decodes one instance starting at `offset`, returning it with the
    /// number of bytes consumed.
    pub fn decode_at(&self, model: &str, bytes: &[u8], offset: usize) -> Result<(Instance, usize), DecodeError> {
        let plan = self.plan(model)?;
        let mut reader = Reader::from_slice(bytes, offset, bytes.len());
        let start = reader.x;
        let instance = decode_instance(&plan, &mut reader, 0)?;
        Ok((instance, reader.x - start))
    }

    /// Stable hash of `model`'s ordered field keys. Payloads are only
    /// compatible between schemas with equal fingerprints.
    pub fn fingerprint(&self, model: &str) -> Result<u32, PlanError> {
        let descriptor = self.registry().resolve(model)?;
        Ok(hash_keys(descriptor.keys()))
    }
}
