//! Validation results and failures.

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::value::Value;

/// One broken rule on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub validator: String,
    pub key: String,
    /// The offending value; `None` when the field was undefined.
    pub value: Option<Value>,
    pub context: Json,
}

impl ValidationFailure {
    pub fn new(validator: &str, key: &str, value: Option<&Value>, context: impl Into<Json>) -> Self {
        Self {
            validator: validator.to_string(),
            key: key.to_string(),
            value: value.cloned(),
            context: context.into(),
        }
    }
}

/// Failures of one flattened path, keyed by validator name.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatFailure {
    pub path: Vec<String>,
    pub errors: IndexMap<String, Json>,
}

/// Outcome of validating one instance, with nested results for embedded
/// models keyed by field (or by index for arrays of models).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub failures: Vec<ValidationFailure>,
    pub children: IndexMap<String, ValidationResult>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// No local failures and every child valid.
    pub fn valid(&self) -> bool {
        self.failures.is_empty() && self.children.values().all(ValidationResult::valid)
    }

    pub fn child(&self, key: &str) -> Option<&ValidationResult> {
        self.children.get(key)
    }

    /// Folds `other` into this result. Failures are appended; children under
    /// the same key are merged recursively.
    pub fn merge(&mut self, other: ValidationResult) {
        self.failures.extend(other.failures);
        for (key, child) in other.children {
            self.children.entry(key).or_default().merge(child);
        }
    }

    /// One entry per failing field path, local fields first, then children
    /// depth-first.
    pub fn flatten(&self) -> Vec<FlatFailure> {
        let mut out = Vec::new();
        self.flatten_into(&mut Vec::new(), &mut out);
        out
    }

    fn flatten_into(&self, prefix: &mut Vec<String>, out: &mut Vec<FlatFailure>) {
        let mut by_key: IndexMap<&str, IndexMap<String, Json>> = IndexMap::new();
        for failure in &self.failures {
            by_key
                .entry(failure.key.as_str())
                .or_default()
                .insert(failure.validator.clone(), failure.context.clone());
        }
        for (key, errors) in by_key {
            let mut path = prefix.clone();
            path.push(key.to_string());
            out.push(FlatFailure { path, errors });
        }
        for (key, child) in &self.children {
            prefix.push(key.clone());
            child.flatten_into(prefix, out);
            prefix.pop();
        }
    }
}
