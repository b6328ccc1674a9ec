//! Canonical value forms: what the codecs would decode for a declared type.
//!
//! `Number` and float widths hold `Float`, signed widths `Int`, unsigned
//! widths `Uint`, and dates whole milliseconds. Array fields hold arrays;
//! a single non-null value is wrapped. Values of the wrong kind are left
//! alone for the codecs to reject.

use chrono::DateTime;

use super::InstanceError;
use crate::codec::{fit_fixed, is_numeric, numeric_text, FixedNumber};
use crate::schema::{FieldDescriptor, NumberType, TypeRef};
use crate::value::Value;

/// Canonical form of a whole field value.
pub(crate) fn canonical_field(model: &str, field: &FieldDescriptor, value: Value) -> Result<Value, InstanceError> {
    if !field.is_array() {
        return canonical_item(model, field, value);
    }
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => canonical_items(model, field, items).map(Value::Array),
        single => Ok(Value::Array(vec![canonical_item(model, field, single)?])),
    }
}

pub(crate) fn canonical_items(
    model: &str,
    field: &FieldDescriptor,
    items: Vec<Value>,
) -> Result<Vec<Value>, InstanceError> {
    items
        .into_iter()
        .map(|item| canonical_item(model, field, item))
        .collect()
}

/// Canonical form of one value against the field's item type.
pub(crate) fn canonical_item(model: &str, field: &FieldDescriptor, value: Value) -> Result<Value, InstanceError> {
    match (field.item_type(), value) {
        (TypeRef::Number, value) if is_numeric(&value) => Ok(value.as_f64().map_or(value, Value::Float)),
        (TypeRef::Fixed(number_type), value) if is_numeric(&value) => {
            fit(*number_type, &value).ok_or_else(|| InstanceError::OutOfRange {
                model: model.to_string(),
                key: field.key.clone(),
                number_type: number_type.name(),
                value: numeric_text(&value),
            })
        }
        (TypeRef::Date, Value::Date(date)) => Ok(Value::Date(
            DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or(date),
        )),
        (_, value) => Ok(value),
    }
}

fn fit(number_type: NumberType, value: &Value) -> Option<Value> {
    fit_fixed(number_type, value).map(|n| match n {
        FixedNumber::Float(v) if number_type == NumberType::Float32 => Value::Float(f64::from(v as f32)),
        other => Value::from(other),
    })
}
