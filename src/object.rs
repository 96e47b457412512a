//! Object types and stored schemas
//!
//! An object type is a struct schema annotated with an
//! [`ObjectTypeDescriptor`] and an immutable `id` property. Schema definitions
//! are themselves records: [`StoredSchemaRecord`] is described by the
//! hand-written bootstrap schema [`stored_schema_node`].

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::annotation::ObjectTypeDescriptor;
use crate::ast::{self, PropertySignature, SchemaNode};
use crate::error::Result;

/// Typename of stored schema records
pub const STORED_SCHEMA_TYPENAME: &str = "echo.schema.StoredSchema";

/// Version of the stored schema record type
pub const STORED_SCHEMA_VERSION: &str = "0.1.0";

/// Identity property of every object type
pub const IDENTITY_FIELD: &str = "id";

/// Options of [`object_type`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectTypeOptions {
    /// Make every declared field optional
    pub partial: bool,
    /// Allow arbitrary extra string keys
    pub record: bool,
}

/// Build an object type schema from its fields.
///
/// The typename is validated; a required `id: string` is appended.
pub fn object_type(
    descriptor: ObjectTypeDescriptor,
    fields: Vec<PropertySignature>,
    options: ObjectTypeOptions,
) -> Result<SchemaNode> {
    descriptor.validate()?;

    let mut schema = if options.record {
        ast::struct_with_index(fields, ast::any())
    } else {
        ast::struct_of(fields)
    };
    if options.partial {
        schema = schema.partial()?;
    }
    let schema = schema.extend(&ast::struct_of(vec![PropertySignature::required(
        IDENTITY_FIELD,
        ast::string(),
    )]))?;
    Ok(schema.with_object_type(descriptor))
}

/// Descriptor of the stored schema record type.
pub fn stored_schema_descriptor() -> ObjectTypeDescriptor {
    ObjectTypeDescriptor::new(STORED_SCHEMA_TYPENAME, STORED_SCHEMA_VERSION)
}

/// Bootstrap schema of [`StoredSchemaRecord`].
pub fn stored_schema_node() -> SchemaNode {
    ast::struct_of(vec![
        PropertySignature::required("typename", ast::string()),
        PropertySignature::required("version", ast::string()),
        PropertySignature::required("jsonSchema", ast::any()),
        PropertySignature::required(IDENTITY_FIELD, ast::string()),
    ])
    .with_object_type(stored_schema_descriptor())
}

/// A persisted schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSchemaRecord {
    /// Record id
    pub id: String,
    /// Typename of the described type
    pub typename: String,
    /// Version of the described type
    pub version: String,
    /// Portable document of the described type
    pub json_schema: Json,
}

impl StoredSchemaRecord {
    /// Create a new stored schema
    pub fn new(
        id: impl Into<String>,
        typename: impl Into<String>,
        version: impl Into<String>,
        json_schema: Json,
    ) -> Self {
        Self {
            id: id.into(),
            typename: typename.into(),
            version: version.into(),
            json_schema,
        }
    }

    /// Descriptor of the described type; the record id is its schema id.
    pub fn descriptor(&self) -> ObjectTypeDescriptor {
        ObjectTypeDescriptor::new(self.typename.clone(), self.version.clone())
            .with_schema_id(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::value::Value;
    use crate::validate::is_valid;

    fn person_fields() -> Vec<PropertySignature> {
        vec![
            PropertySignature::required("name", ast::string()),
            PropertySignature::optional("age", ast::number()),
        ]
    }

    #[test]
    fn test_object_type_appends_id() {
        let schema = object_type(
            ObjectTypeDescriptor::new("example.Person", "0.1.0"),
            person_fields(),
            ObjectTypeOptions::default(),
        )
        .unwrap();
        let names: Vec<_> = schema.property_signatures().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "id"]);
        assert_eq!(schema.object_type().unwrap().typename, "example.Person");
    }

    #[test]
    fn test_object_type_options() {
        let schema = object_type(
            ObjectTypeDescriptor::new("example.Person", "0.1.0"),
            person_fields(),
            ObjectTypeOptions { partial: true, record: true },
        )
        .unwrap();
        let literal = schema.as_struct().unwrap();
        assert!(literal.get("name").unwrap().optional);
        assert!(!literal.get("id").unwrap().optional);
        assert!(literal.index.is_some());
    }

    #[test]
    fn test_invalid_typename() {
        let err = object_type(
            ObjectTypeDescriptor::new("bad:name", "0.1.0"),
            vec![],
            ObjectTypeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidTypename(_)));
    }

    #[test]
    fn test_stored_schema_record_matches_bootstrap() {
        let record = StoredSchemaRecord::new("01HSCHEMA", "example.Person", "0.1.0", serde_json::json!({}));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("jsonSchema").is_some());
        assert!(is_valid(&stored_schema_node(), &Value::from(&json)));
        assert_eq!(record.descriptor().match_id(), "01HSCHEMA");
    }
}
