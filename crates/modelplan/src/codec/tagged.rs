//! Tagged-value codec: instances to and from `serde_json::Value` objects.
//!
//! Output keys follow declaration order. Undefined fields are omitted and
//! explicit nulls are kept. Dates travel as epoch milliseconds.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as Json};

use super::{
    encode_fixed, fit_fixed, numeric_text, DecodeError, DeserializeOptions, EncodeError, FixedNumber,
    SerializeOptions,
};
use crate::instance::Instance;
use crate::plan::{Codec, Plan, PlanCache, PlanError, PlanLink, Primitive};
use crate::schema::Registry;
use crate::value::{date_from_millis, Value};

/// A compiled tagged-value encoder for one field.
pub type TaggedEncodeFn = Arc<dyn Fn(&Value) -> Result<Json, EncodeError> + Send + Sync>;

/// A compiled tagged-value decoder for one field.
pub type TaggedDecodeFn = Arc<dyn Fn(&Json) -> Result<Value, DecodeError> + Send + Sync>;

/// Marker type selecting tagged-value handlers.
#[derive(Debug, Clone, Copy)]
pub struct Tagged;

pub type TaggedPlan = Plan<Tagged>;

impl Codec for Tagged {
    const NAME: &'static str = "tagged";

    type Encode = TaggedEncodeFn;
    type Decode = TaggedDecodeFn;

    fn primitive(primitive: Primitive) -> (TaggedEncodeFn, TaggedDecodeFn) {
        (encoder(primitive), decoder(primitive))
    }

    fn model(link: PlanLink<Self>) -> (TaggedEncodeFn, TaggedDecodeFn) {
        let encode_link = link.clone();
        let encode: TaggedEncodeFn = Arc::new(move |value: &Value| {
            let instance = value.as_instance().ok_or(EncodeError::TypeMismatch {
                expected: "model",
                found: value.kind(),
            })?;
            let plan = encode_link
                .plan()
                .ok_or_else(|| EncodeError::PlanUnavailable(encode_link.model().to_string()))?;
            encode_instance(&plan, instance, false)
        });
        let decode: TaggedDecodeFn = Arc::new(move |json: &Json| {
            let plan = link
                .plan()
                .ok_or_else(|| DecodeError::PlanUnavailable(link.model().to_string()))?;
            decode_instance(&plan, json, true).map(Value::Model)
        });
        (encode, decode)
    }

    fn array((encode, decode): (TaggedEncodeFn, TaggedDecodeFn)) -> (TaggedEncodeFn, TaggedDecodeFn) {
        let encode_item = move |item: &Value| match item {
            Value::Null => Ok(Json::Null),
            item => encode(item),
        };
        let decode_item = move |item: &Json| match item {
            Json::Null => Ok(Value::Null),
            item => decode(item),
        };
        let encode: TaggedEncodeFn = Arc::new(move |value: &Value| match value {
            Value::Array(items) => items
                .iter()
                .map(&encode_item)
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            single => Ok(Json::Array(vec![encode_item(single)?])),
        });
        let decode: TaggedDecodeFn = Arc::new(move |json: &Json| match json {
            Json::Array(items) => items
                .iter()
                .map(&decode_item)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![decode_item(single)?])),
        });
        (encode, decode)
    }
}

fn mismatch(expected: &'static str, value: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected,
        found: value.kind(),
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn expected(expected: &'static str, json: &Json) -> DecodeError {
    DecodeError::TypeMismatch {
        expected,
        found: json_kind(json),
    }
}

fn finite(n: f64) -> Result<Json, EncodeError> {
    serde_json::Number::from_f64(n)
        .map(Json::Number)
        .ok_or(EncodeError::NonFinite(n))
}

fn encoder(primitive: Primitive) -> TaggedEncodeFn {
    match primitive {
        Primitive::String => Arc::new(|value: &Value| match value {
            Value::String(s) => Ok(Json::String(s.clone())),
            other => Err(mismatch("string", other)),
        }),
        Primitive::Bool => Arc::new(|value: &Value| match value {
            Value::Bool(b) => Ok(Json::Bool(*b)),
            other => Err(mismatch("bool", other)),
        }),
        Primitive::Number => Arc::new(|value: &Value| match value {
            Value::Int(n) => Ok(Json::from(*n)),
            Value::Uint(n) => Ok(Json::from(*n)),
            Value::Float(n) => finite(*n),
            other => Err(mismatch("number", other)),
        }),
        Primitive::Date => Arc::new(|value: &Value| match value {
            Value::Date(d) => Ok(Json::from(d.timestamp_millis())),
            other => Err(mismatch("date", other)),
        }),
        Primitive::Object => Arc::new(|value: &Value| match value {
            Value::Object(o) => Ok(o.clone()),
            other => Err(mismatch("object", other)),
        }),
        Primitive::Fixed(number_type) => Arc::new(move |value: &Value| {
            match encode_fixed(number_type, value)? {
                FixedNumber::Signed(n) => Ok(Json::from(n)),
                FixedNumber::Unsigned(n) => Ok(Json::from(n)),
                FixedNumber::Float(n) => finite(n),
            }
        }),
    }
}

fn json_number(json: &Json) -> Option<Value> {
    let Json::Number(n) = json else {
        return None;
    };
    n.as_i64()
        .map(Value::Int)
        .or_else(|| n.as_u64().map(Value::Uint))
        .or_else(|| n.as_f64().map(Value::Float))
}

fn decoder(primitive: Primitive) -> TaggedDecodeFn {
    match primitive {
        Primitive::String => Arc::new(|json: &Json| match json {
            Json::String(s) => Ok(Value::String(s.clone())),
            other => Err(expected("string", other)),
        }),
        Primitive::Bool => Arc::new(|json: &Json| match json {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(expected("bool", other)),
        }),
        Primitive::Number => Arc::new(|json: &Json| {
            json.as_f64()
                .map(Value::Float)
                .ok_or_else(|| expected("number", json))
        }),
        Primitive::Date => Arc::new(|json: &Json| match json {
            Json::Number(n) => n
                .as_f64()
                .and_then(date_from_millis)
                .map(Value::Date)
                .ok_or_else(|| DecodeError::InvalidDate(n.to_string())),
            Json::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|d| Value::Date(d.with_timezone(&Utc)))
                .map_err(|_| DecodeError::InvalidDate(s.clone())),
            other => Err(expected("date", other)),
        }),
        Primitive::Object => Arc::new(|json: &Json| Ok(Value::Object(json.clone()))),
        Primitive::Fixed(number_type) => Arc::new(move |json: &Json| {
            let value = json_number(json).ok_or_else(|| expected(number_type.name(), json))?;
            fit_fixed(number_type, &value)
                .map(Value::from)
                .ok_or_else(|| DecodeError::OutOfRange {
                    number_type: number_type.name(),
                    value: numeric_text(&value),
                })
        }),
    }
}

fn encode_instance(plan: &TaggedPlan, instance: &Instance, mutations_only: bool) -> Result<Json, EncodeError> {
    let model = plan.descriptor().name();
    let mut out = Map::with_capacity(plan.len());
    for (key, encode) in plan.serializers() {
        if mutations_only && !instance.mutations().contains(key) {
            continue;
        }
        let json = match instance.get(key) {
            None => continue,
            Some(Value::Null) => Json::Null,
            Some(value) => encode(value).map_err(|e| e.in_field(model, key))?,
        };
        out.insert(key.to_string(), json);
    }
    Ok(Json::Object(out))
}

fn decode_instance(plan: &TaggedPlan, input: &Json, clear_mutations: bool) -> Result<Instance, DecodeError> {
    let object = input.as_object().ok_or_else(|| expected("object", input))?;
    let model = plan.descriptor().name();
    let mut instance = Instance::new(Arc::clone(plan.descriptor()));
    for (key, decode) in plan.deserializers() {
        let value = match object.get(key) {
            None => continue,
            Some(Json::Null) => Value::Null,
            Some(json) => decode(json).map_err(|e| e.in_field(model, key))?,
        };
        instance.set(key, value)?;
    }
    if clear_mutations {
        instance.clear_mutations(None);
    }
    Ok(instance)
}

/// Converts instances to and from tagged values, caching one plan per model.
#[derive(Debug)]
pub struct TaggedCodec {
    plans: PlanCache<Tagged>,
}

impl TaggedCodec {
    pub fn new(registry: Registry) -> Self {
        Self {
            plans: PlanCache::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.plans.registry()
    }

    /// The compiled plan for `model`.
    pub fn plan(&self, model: &str) -> Result<Arc<TaggedPlan>, PlanError> {
        self.plans.get(model)
    }

    /// Serializes every defined field.
    pub fn serialize(&self, instance: &Instance) -> Result<Json, EncodeError> {
        self.serialize_with(instance, SerializeOptions::default())
    }

    pub fn serialize_with(&self, instance: &Instance, options: SerializeOptions) -> Result<Json, EncodeError> {
        let plan = self.plan(instance.model_name())?;
        encode_instance(&plan, instance, options.mutations_only)
    }

    /// Builds a clean instance of `model` from a tagged object.
    pub fn deserialize(&self, model: &str, input: &Json) -> Result<Instance, DecodeError> {
        self.deserialize_with(model, input, DeserializeOptions::default())
    }

    pub fn deserialize_with(
        &self,
        model: &str,
        input: &Json,
        options: DeserializeOptions,
    ) -> Result<Instance, DecodeError> {
        let plan = self.plan(model)?;
        decode_instance(&plan, input, options.clear_mutations)
    }
}
