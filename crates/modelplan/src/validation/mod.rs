//! Asynchronous validation engine.
//!
//! Each field's chain is the model's validators followed by any extras for
//! that key. Fields run in declaration order, then extra-only keys. A
//! validator is skipped while its field is undefined unless it forces
//! validation.

pub mod result;
pub mod rules;
pub mod validator;

pub use result::{FlatFailure, ValidationFailure, ValidationResult};
pub use validator::{
    validator_async, validator_fn, AsyncFnValidator, FnValidator, Rejection, SharedValidator, Validator,
    ValidatorFuture,
};

use std::error::Error;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use crate::instance::Instance;

/// Extra validators by field key, run after the model's own.
pub type ExtraValidators = IndexMap<String, Vec<SharedValidator>>;

/// A validator raised something other than a failure.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("validator {validator} on {model}.{key} raised an error: {source}")]
    Defect {
        model: String,
        key: String,
        validator: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Validates `target` against its model's validators plus `extra`.
///
/// Validators are awaited one at a time, field by field. The first defect
/// aborts the call.
pub async fn validate(target: &Instance, extra: &ExtraValidators) -> Result<ValidationResult, ValidateError> {
    let descriptor = target.descriptor();
    let mut chains: IndexMap<&str, Vec<&SharedValidator>> = IndexMap::new();
    for field in descriptor.fields.values() {
        chains.insert(field.key.as_str(), field.validators.iter().collect());
    }
    for (key, validators) in extra {
        chains.entry(key.as_str()).or_default().extend(validators);
    }

    let mut result = ValidationResult::new();
    for (key, chain) in chains {
        let value = target.get(key);
        for validator in chain {
            if value.is_none() && !validator.force() {
                continue;
            }
            match validator.validate(target, key, value).await {
                Ok(()) => {}
                Err(Rejection::Failure(failure)) => {
                    trace!(
                        model = descriptor.name(),
                        key,
                        validator = failure.validator.as_str(),
                        "validation failure"
                    );
                    result.failures.push(failure);
                }
                Err(Rejection::Nested(child)) => {
                    result.children.entry(key.to_string()).or_default().merge(child);
                }
                Err(Rejection::Defect(source)) => {
                    return Err(ValidateError::Defect {
                        model: descriptor.name().to_string(),
                        key: key.to_string(),
                        validator: validator.name().to_string(),
                        source,
                    });
                }
            }
        }
    }
    Ok(result)
}
