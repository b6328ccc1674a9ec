//! The validator seam.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::result::{ValidationFailure, ValidationResult};
use crate::instance::Instance;
use crate::value::Value;

/// Future returned by [`Validator::validate`].
pub type ValidatorFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Rejection>> + Send + 'a>>;

/// Why a validator did not accept a value.
pub enum Rejection {
    /// The value broke a rule. Collected into the result.
    Failure(ValidationFailure),
    /// An embedded model failed validation. Attached as a child result.
    Nested(ValidationResult),
    /// Anything else. Aborts the whole validation.
    Defect(Box<dyn Error + Send + Sync>),
}

impl Rejection {
    pub fn failure(validator: &str, key: &str, value: Option<&Value>, context: impl Into<serde_json::Value>) -> Self {
        Self::Failure(ValidationFailure::new(validator, key, value, context))
    }

    pub fn defect(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Defect(err.into())
    }
}

impl fmt::Debug for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure(failure) => f.debug_tuple("Failure").field(failure).finish(),
            Self::Nested(result) => f.debug_tuple("Nested").field(result).finish(),
            Self::Defect(err) => f.debug_tuple("Defect").field(&err.to_string()).finish(),
        }
    }
}

impl From<ValidationFailure> for Rejection {
    fn from(failure: ValidationFailure) -> Self {
        Self::Failure(failure)
    }
}

/// A field validator.
///
/// Validators run in declaration order and are awaited one at a time.
pub trait Validator: Send + Sync {
    /// Name reported in failures and used as the key in flattened errors.
    fn name(&self) -> &str;

    /// Run even when the field is undefined.
    fn force(&self) -> bool {
        false
    }

    /// Checks `value` (the current value of `key` on `target`; `None` when
    /// undefined).
    fn validate<'a>(&'a self, target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a>;
}

pub type SharedValidator = Arc<dyn Validator>;

type SyncCheck = dyn Fn(&Instance, &str, Option<&Value>) -> Result<(), Rejection> + Send + Sync;

/// Adapter turning a synchronous closure into a [`Validator`].
pub struct FnValidator {
    name: String,
    force: bool,
    check: Box<SyncCheck>,
}

impl FnValidator {
    /// Run the closure even when the field is undefined.
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn shared(self) -> SharedValidator {
        Arc::new(self)
    }
}

impl fmt::Debug for FnValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator")
            .field("name", &self.name)
            .field("force", &self.force)
            .finish()
    }
}

impl Validator for FnValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn force(&self) -> bool {
        self.force
    }

    fn validate<'a>(&'a self, target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        let outcome = (self.check)(target, key, value);
        Box::pin(async move { outcome })
    }
}

/// Wraps a synchronous check.
pub fn validator_fn<F>(name: impl Into<String>, check: F) -> FnValidator
where
    F: Fn(&Instance, &str, Option<&Value>) -> Result<(), Rejection> + Send + Sync + 'static,
{
    FnValidator {
        name: name.into(),
        force: false,
        check: Box::new(check),
    }
}

type CheckFuture = Pin<Box<dyn Future<Output = Result<(), Rejection>> + Send>>;

type AsyncCheck = dyn Fn(String, Option<Value>) -> CheckFuture + Send + Sync;

/// Adapter turning an async closure into a [`Validator`]. The closure gets
/// owned copies of the key and value.
pub struct AsyncFnValidator {
    name: String,
    check: Box<AsyncCheck>,
}

impl fmt::Debug for AsyncFnValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFnValidator")
            .field("name", &self.name)
            .finish()
    }
}

impl Validator for AsyncFnValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate<'a>(&'a self, _target: &'a Instance, key: &'a str, value: Option<&'a Value>) -> ValidatorFuture<'a> {
        (self.check)(key.to_string(), value.cloned())
    }
}

/// Wraps an async check.
pub fn validator_async<F, Fut>(name: impl Into<String>, check: F) -> SharedValidator
where
    F: Fn(String, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Rejection>> + Send + 'static,
{
    Arc::new(AsyncFnValidator {
        name: name.into(),
        check: Box::new(move |key: String, value: Option<Value>| -> CheckFuture {
            Box::pin(check(key, value))
        }),
    })
}
