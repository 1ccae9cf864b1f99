//! Non-fatal errors.
//!
//! Broken invariants inside the tracking engine panic; these errors cover
//! misuse of the property API that a caller can reasonably handle.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("type `{type_name}` has no property `{property}`")]
    UnknownProperty { type_name: String, property: String },

    #[error("property `{type_name}.{property}` holds a value object, not a plain value")]
    NotAValue { type_name: String, property: String },

    #[error("property `{type_name}.{property}` is not a value-object property")]
    NotAnObject { type_name: String, property: String },

    #[error("property `{property}` expects `{expected}`, got `{actual}`")]
    TypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },
}

impl SchemaError {
    #[must_use]
    pub fn unknown(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            type_name: type_name.into(),
            property: property.into(),
        }
    }
}
