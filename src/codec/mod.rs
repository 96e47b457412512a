//! Portable codec
//!
//! Lossless translation between schema trees and JSON Schema (draft-07 shaped)
//! documents. Annotations that JSON Schema cannot express are carried in a
//! single extension property, `$echo`, on the node they annotate:
//!
//! ```json
//! {
//!   "type": "object",
//!   "required": ["id"],
//!   "properties": {
//!     "id": { "type": "string" },
//!     "name": { "type": "string", "$echo": { "fieldMeta": { "ui": { "label": "Name" } } } }
//!   },
//!   "additionalProperties": false,
//!   "$echo": { "type": { "typename": "example.Person", "version": "0.1.0" } }
//! }
//! ```
//!
//! Validators that don't know `$echo` ignore it and still validate the
//! document structurally (see [`structural_validator`]).

mod export;
mod import;

pub use export::{to_json_schema, to_json_schema_with, ExportOptions};
pub use import::from_json_schema;

use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::annotation::{Annotations, FieldMeta, ObjectTypeDescriptor, ReferenceDescriptor};
use crate::error::{Result, SchemaError};

/// Reserved extension property
pub const ECHO_EXTENSION_KEY: &str = "$echo";

/// Default `$schema` of exported documents
pub const JSON_SCHEMA_DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// `$id` markers of the catch-all types
pub const ANY_ID: &str = "/schemas/any";
pub const UNKNOWN_ID: &str = "/schemas/unknown";
pub const OBJECT_ID: &str = "/schemas/object";
pub const EMPTY_OBJECT_ID: &str = "/schemas/{}";

/// Payload of the `$echo` extension property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoExtension {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectTypeDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_meta: Option<FieldMeta>,
    /// Brand name of a `$defs` entry whose key differs from it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl EchoExtension {
    /// Extension for the codec-carried annotations of a node, if any.
    pub fn from_annotations(annotations: &Annotations) -> Option<Self> {
        if !annotations.has_any_kind() {
            return None;
        }
        Some(Self {
            object_type: annotations.object_type.clone(),
            reference: annotations.reference.clone(),
            field_meta: annotations.field_meta.clone(),
            brand: None,
        })
    }

    pub fn to_annotations(&self) -> Annotations {
        Annotations {
            object_type: self.object_type.clone(),
            reference: self.reference.clone(),
            field_meta: self.field_meta.clone(),
            ..Annotations::default()
        }
    }

    /// Read the extension of a document node.
    pub fn read(node: &serde_json::Map<String, Json>) -> Result<Option<Self>> {
        match node.get(ECHO_EXTENSION_KEY) {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }
}

/// `$ref` pointer to a `$defs` entry (RFC 6901 escaping).
pub(crate) fn definition_pointer(key: &str) -> String {
    format!("#/$defs/{}", key.replace('~', "~0").replace('/', "~1"))
}

/// `$defs` key named by a `$ref` pointer.
pub(crate) fn definition_key(pointer: &str) -> String {
    match pointer.strip_prefix("#/$defs/") {
        Some(escaped) => escaped.replace("~1", "/").replace("~0", "~"),
        None => pointer.rsplit('/').next().unwrap_or(pointer).to_string(),
    }
}

/// Compile a portable document for plain structural validation.
pub fn structural_validator(document: &Json) -> Result<JSONSchema> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(document)
        .map_err(|e| SchemaError::InvalidFormat(e.to_string()))
}

/// Structural validation errors of an instance, as `path: message` lines.
pub fn structural_errors(document: &Json, instance: &Json) -> Result<Vec<String>> {
    let compiled = structural_validator(document)?;
    let errors = match compiled.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect(),
    };
    Ok(errors)
}
