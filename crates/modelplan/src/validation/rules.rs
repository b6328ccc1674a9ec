//! Built-in validator rules.
//!
//! Apart from [`required`] and [`one_of`] none of these rules fire on an
//! explicit null; pair them with `required` to reject missing values.

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::json;

use super::result::ValidationResult;
use super::validator::{Rejection, SharedValidator, Validator, ValidatorFuture};
use super::{validate, ExtraValidators};
use crate::instance::Instance;
use crate::value::Value;

fn ready<'a>(outcome: Result<(), Rejection>) -> ValidatorFuture<'a> {
    Box::pin(std::future::ready(outcome))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

#[derive(Debug)]
struct Required;

/// Fails on undefined or null. Forces validation.
pub fn required() -> SharedValidator {
    Arc::new(Required)
}

impl Validator for Required {
    fn name(&self) -> &str {
        "Required"
    }

    fn force(&self) -> bool {
        true
    }

    fn validate<'a>(&'a self, _target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        ready(match present(value) {
            Some(_) => Ok(()),
            None => Err(Rejection::failure(self.name(), key, value, "field is required")),
        })
    }
}

#[derive(Debug)]
struct Pattern(Regex);

/// String values must match `regex`.
pub fn pattern(regex: Regex) -> SharedValidator {
    Arc::new(Pattern(regex))
}

impl Validator for Pattern {
    fn name(&self) -> &str {
        "Pattern"
    }

    fn validate<'a>(&'a self, _target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        let outcome = match present(value) {
            None => Ok(()),
            Some(Value::String(s)) if self.0.is_match(s) => Ok(()),
            Some(Value::String(s)) => Err(Rejection::failure(
                self.name(),
                key,
                value,
                format!("\"{s}\" does not match pattern {}", self.0.as_str()),
            )),
            Some(other) => Err(Rejection::failure(
                self.name(),
                key,
                value,
                format!("expected a string, found {}", other.kind()),
            )),
        };
        ready(outcome)
    }
}

#[derive(Debug)]
struct Range {
    min: Option<f64>,
    max: Option<f64>,
}

/// Numeric values must lie within `min..=max`; either bound may be omitted.
pub fn range(min: Option<f64>, max: Option<f64>) -> SharedValidator {
    Arc::new(Range { min, max })
}

impl Validator for Range {
    fn name(&self) -> &str {
        "Range"
    }

    fn validate<'a>(&'a self, _target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        let Some(present) = present(value) else {
            return ready(Ok(()));
        };
        let context = match present.as_f64() {
            None => format!("expected a number, found {}", present.kind()),
            Some(n) if self.min.is_some_and(|min| n < min) => "below minimum value".to_string(),
            Some(n) if self.max.is_some_and(|max| n > max) => "above maximum value".to_string(),
            Some(_) => return ready(Ok(())),
        };
        ready(Err(Rejection::failure(self.name(), key, value, context)))
    }
}

#[derive(Debug)]
enum LengthBound {
    Min(usize),
    Max(usize),
}

#[derive(Debug)]
struct Length(LengthBound);

/// Strings (in chars) and arrays must have at least `min` items.
pub fn min_length(min: usize) -> SharedValidator {
    Arc::new(Length(LengthBound::Min(min)))
}

/// Strings (in chars) and arrays must have at most `max` items.
pub fn max_length(max: usize) -> SharedValidator {
    Arc::new(Length(LengthBound::Max(max)))
}

impl Validator for Length {
    fn name(&self) -> &str {
        match self.0 {
            LengthBound::Min(_) => "MinLength",
            LengthBound::Max(_) => "MaxLength",
        }
    }

    fn validate<'a>(&'a self, _target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        let Some(present) = present(value) else {
            return ready(Ok(()));
        };
        let context = match (present.len(), &self.0) {
            (None, _) => format!("{} has no length", present.kind()),
            (Some(len), LengthBound::Min(min)) if len < *min => "below minimum length".to_string(),
            (Some(len), LengthBound::Max(max)) if len > *max => "above maximum length".to_string(),
            (Some(_), _) => return ready(Ok(())),
        };
        ready(Err(Rejection::failure(self.name(), key, value, context)))
    }
}

#[derive(Debug)]
struct OneOf(Vec<Value>);

/// The value must equal one of `values`. Null passes only when listed.
pub fn one_of(values: Vec<Value>) -> SharedValidator {
    Arc::new(OneOf(values))
}

impl Validator for OneOf {
    fn name(&self) -> &str {
        "OneOf"
    }

    fn validate<'a>(&'a self, _target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        let outcome = match value {
            Some(v) if self.0.contains(v) => Ok(()),
            _ => Err(Rejection::failure(
                self.name(),
                key,
                value,
                json!({
                    "msg": "must be one of specified values",
                    "values": self.0.iter().map(Value::to_json_lossy).collect::<Vec<_>>(),
                }),
            )),
        };
        ready(outcome)
    }
}

#[derive(Debug)]
struct Prohibited;

/// Fails on any defined, non-null value.
pub fn prohibited() -> SharedValidator {
    Arc::new(Prohibited)
}

impl Validator for Prohibited {
    fn name(&self) -> &str {
        "Prohibited"
    }

    fn validate<'a>(&'a self, _target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        ready(match present(value) {
            None => Ok(()),
            Some(_) => Err(Rejection::failure(
                self.name(),
                key,
                value,
                json!({ "msg": "field is prohibited" }),
            )),
        })
    }
}

struct ValidateModel {
    extra: ExtraValidators,
}

/// Validates an embedded model (or each model in an array) and attaches the
/// nested result. `extra` applies to every embedded instance.
pub fn validate_model(extra: ExtraValidators) -> SharedValidator {
    Arc::new(ValidateModel { extra })
}

impl std::fmt::Debug for ValidateModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidateModel")
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ValidateModel {
    async fn check(&self, instance: &Instance) -> Result<Option<ValidationResult>, Rejection> {
        let result = validate(instance, &self.extra)
            .await
            .map_err(Rejection::defect)?;
        Ok((!result.valid()).then_some(result))
    }
}

impl Validator for ValidateModel {
    fn name(&self) -> &str {
        "ValidateModel"
    }

    fn validate<'a>(&'a self, _target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        Box::pin(async move {
            match present(value) {
                None => Ok(()),
                Some(Value::Model(instance)) => match self.check(instance).await? {
                    Some(nested) => Err(Rejection::Nested(nested)),
                    None => Ok(()),
                },
                Some(Value::Array(items)) => {
                    let mut children = IndexMap::new();
                    for (index, item) in items.iter().enumerate() {
                        if let Value::Model(instance) = item {
                            if let Some(nested) = self.check(instance).await? {
                                children.insert(index.to_string(), nested);
                            }
                        }
                    }
                    if children.is_empty() {
                        Ok(())
                    } else {
                        Err(Rejection::Nested(ValidationResult {
                            failures: Vec::new(),
                            children,
                        }))
                    }
                }
                Some(other) => Err(Rejection::failure(
                    self.name(),
                    key,
                    value,
                    format!("expected a model, found {}", other.kind()),
                )),
            }
        })
    }
}
