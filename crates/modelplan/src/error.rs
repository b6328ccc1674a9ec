use thiserror::Error;

use crate::codec::{DecodeError, EncodeError};
use crate::instance::InstanceError;
use crate::plan::PlanError;
use crate::schema::SchemaError;
use crate::validation::ValidateError;

/// Any error raised by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Instance(#[from] InstanceError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Validate(#[from] ValidateError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_missing() -> Result<()> {
        crate::schema::Registry::new().resolve("Missing")?;
        Ok(())
    }

    #[test]
    fn question_mark_converts() {
        match resolve_missing() {
            Err(Error::Schema(SchemaError::UnknownModel(name))) => assert_eq!(name, "Missing"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn display_is_transparent() {
        let err = Error::from(SchemaError::UnknownModel("X".into()));
        assert_eq!(err.to_string(), "model not registered: X");
    }
}
