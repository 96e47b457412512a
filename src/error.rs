//! Error types for schema trees, the portable codec and references

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid typename: {0:?}")]
    InvalidTypename(String),

    #[error("Invalid DXN {input:?}: {reason}")]
    InvalidDxn { input: String, reason: String },

    #[error("Invalid property path: {0:?}")]
    InvalidPath(String),

    #[error("Object type schema has no id property: {typename}")]
    MissingIdentityField { typename: String },

    #[error("Missing definition for {0}")]
    MissingDefinition(String),

    #[error("Unsupported schema: {0}")]
    Unsupported(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Reference target must be an object type")]
    NotAnObjectType,

    #[error("Expected a struct schema: {0}")]
    NotAStruct(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Field already exists: {0}")]
    FieldExists(String),

    #[error("Identity field of {typename} cannot be changed ({operation})")]
    IdentityField { typename: String, operation: String },

    #[error("Schema already registered: {typename}")]
    AlreadyRegistered { typename: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn invalid_dxn(input: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidDxn {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
