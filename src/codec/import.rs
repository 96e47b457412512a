//! Portable document -> schema tree

use serde_json::{Map, Value as Json};
use std::borrow::Cow;

use super::{definition_key, EchoExtension, ANY_ID, EMPTY_OBJECT_ID, OBJECT_ID, UNKNOWN_ID};
use crate::ast::{self, LiteralValue, PropertySignature, SchemaKind, SchemaNode, TypeLiteral};
use crate::error::{Result, SchemaError};
use crate::object::IDENTITY_FIELD;
use crate::reference::build_reference_schema;

type Defs = Map<String, Json>;

/// Import a portable document.
///
/// `definitions` are inherited `$defs`; the document's own `$defs` extend and
/// override them.
pub fn from_json_schema(root: &Json, definitions: Option<&Defs>) -> Result<SchemaNode> {
    let node = match root {
        Json::Object(node) => node,
        Json::Bool(true) => return Ok(ast::unknown()),
        Json::Bool(false) => return Ok(SchemaKind::Never.into()),
        other => {
            return Err(SchemaError::InvalidFormat(format!(
                "schema must be an object, got {other}"
            )))
        }
    };

    let merged_defs: Cow<'_, Defs> = match (node.get("$defs").and_then(Json::as_object), definitions) {
        (Some(local), Some(inherited)) => {
            let mut merged = inherited.clone();
            merged.extend(local.clone());
            Cow::Owned(merged)
        }
        (Some(local), None) => Cow::Borrowed(local),
        (None, Some(inherited)) => Cow::Borrowed(inherited),
        (None, None) => Cow::Owned(Map::new()),
    };
    let defs: &Defs = &merged_defs;
    let extension = EchoExtension::read(node)?;

    let mut result = if node.get("type").and_then(Json::as_str) == Some("object") {
        import_struct(node, defs, extension.as_ref())?
    } else if let Some(well_known) = import_well_known(node, extension.as_ref()) {
        well_known
    } else if let Some(value) = node.get("const") {
        ast::literal(import_literal(value)?)
    } else if let Some(values) = node.get("enum") {
        let values = values
            .as_array()
            .ok_or_else(|| SchemaError::InvalidFormat("enum must be an array".to_string()))?;
        let members = values
            .iter()
            .map(|v| import_literal(v).map(ast::literal))
            .collect::<Result<Vec<_>>>()?;
        ast::union(members)
    } else if let Some(members) = node.get("anyOf") {
        let members = members
            .as_array()
            .ok_or_else(|| SchemaError::InvalidFormat("anyOf must be an array".to_string()))?;
        let members = members
            .iter()
            .map(|m| from_json_schema(m, Some(defs)))
            .collect::<Result<Vec<_>>>()?;
        ast::union(members)
    } else if let Some(ty) = node.get("type") {
        import_typed(node, ty, defs)?
    } else if let Some(reference) = node.get("$ref").and_then(Json::as_str) {
        let key = definition_key(reference);
        let definition = defs
            .get(&key)
            .ok_or_else(|| SchemaError::MissingDefinition(reference.to_string()))?;
        let name = match definition.as_object() {
            Some(definition) => EchoExtension::read(definition)?.and_then(|e| e.brand),
            None => None,
        };
        from_json_schema(definition, Some(defs))?.brand(name.unwrap_or(key))
    } else if node.get("not").and_then(Json::as_object).is_some_and(|not| not.is_empty()) {
        SchemaKind::Never.into()
    } else {
        ast::unknown()
    };

    if let Some(extension) = &extension {
        result.annotations.overlay_kinds(&extension.to_annotations());
    }
    if let Some(title) = node.get("title").and_then(Json::as_str) {
        result.annotations.title = Some(title.to_string());
    }
    if let Some(description) = node.get("description").and_then(Json::as_str) {
        result.annotations.description = Some(description.to_string());
    }
    Ok(result)
}

/// `$id` markers of the catch-all types. `any` with a reference extension is a
/// reference schema.
fn import_well_known(node: &Map<String, Json>, extension: Option<&EchoExtension>) -> Option<SchemaNode> {
    match node.get("$id").and_then(Json::as_str)? {
        ANY_ID => Some(
            match extension.and_then(|e| e.reference.as_ref()) {
                Some(reference) => build_reference_schema(reference),
                None => ast::any(),
            },
        ),
        UNKNOWN_ID => Some(ast::unknown()),
        OBJECT_ID | EMPTY_OBJECT_ID => Some(ast::object_keyword()),
        _ => None,
    }
}

fn import_literal(value: &Json) -> Result<LiteralValue> {
    LiteralValue::from_json(value)
        .ok_or_else(|| SchemaError::Unsupported(format!("non-primitive literal {value}")))
}

fn import_typed(node: &Map<String, Json>, ty: &Json, defs: &Defs) -> Result<SchemaNode> {
    let result = match ty.as_str() {
        Some("string") => ast::string(),
        Some("number") => ast::number(),
        Some("integer") => ast::integer(),
        Some("boolean") => ast::boolean(),
        Some("null") => ast::literal(LiteralValue::Null),
        Some("array") => match node.get("items") {
            Some(Json::Array(items)) => {
                let elements = items
                    .iter()
                    .map(|item| from_json_schema(item, Some(defs)))
                    .collect::<Result<Vec<_>>>()?;
                let rest = match node.get("additionalItems") {
                    Some(rest @ Json::Object(_)) => Some(Box::new(from_json_schema(rest, Some(defs))?)),
                    _ => None,
                };
                SchemaKind::Tuple { elements, rest }.into()
            }
            Some(item) => ast::array(from_json_schema(item, Some(defs))?),
            None => {
                return Err(SchemaError::InvalidFormat(
                    "array schema without items".to_string(),
                ))
            }
        },
        _ => ast::unknown(),
    };
    Ok(result)
}

/// Object documents. With a type extension the `id` property is the identity
/// field: it is required and always placed last.
fn import_struct(
    node: &Map<String, Json>,
    defs: &Defs,
    extension: Option<&EchoExtension>,
) -> Result<SchemaNode> {
    if node.contains_key("patternProperties") {
        return Err(SchemaError::Unsupported(
            "patternProperties (template literal keys)".to_string(),
        ));
    }

    let required: Vec<&str> = node
        .get("required")
        .and_then(Json::as_array)
        .map(|r| r.iter().filter_map(Json::as_str).collect())
        .unwrap_or_default();
    let object_type = extension.and_then(|e| e.object_type.as_ref());

    let mut properties = Vec::new();
    let mut id_field = None;
    if let Some(declared) = node.get("properties").and_then(Json::as_object) {
        for (key, value) in declared {
            let property = from_json_schema(value, Some(defs))?;
            if object_type.is_some() && key == IDENTITY_FIELD {
                id_field = Some(property);
            } else if required.contains(&key.as_str()) {
                properties.push(PropertySignature::required(key.clone(), property));
            } else {
                properties.push(PropertySignature::optional(key.clone(), property));
            }
        }
    }

    let index = match node.get("additionalProperties") {
        Some(value @ Json::Object(_)) => Some(Box::new(from_json_schema(value, Some(defs))?)),
        _ => None,
    };

    if let Some(descriptor) = object_type {
        let id = id_field.ok_or_else(|| SchemaError::MissingIdentityField {
            typename: descriptor.typename.clone(),
        })?;
        properties.push(PropertySignature::required(IDENTITY_FIELD, id));
    }

    Ok(SchemaKind::Struct(TypeLiteral { properties, index }).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::MetaValue;
    use crate::ast::Refinement;
    use serde_json::json;

    fn import(doc: Json) -> Result<SchemaNode> {
        from_json_schema(&doc, None)
    }

    #[test]
    fn test_primitives_and_literals() {
        assert_eq!(import(json!({"type": "string"})).unwrap(), ast::string());
        assert_eq!(import(json!({"type": "integer"})).unwrap(), ast::integer());
        assert_eq!(import(json!({"const": "a"})).unwrap(), ast::literal("a"));
        assert_eq!(
            import(json!({"enum": ["a", "b"]})).unwrap(),
            ast::union(vec![ast::literal("a"), ast::literal("b")])
        );
        assert_eq!(import(json!({})).unwrap(), ast::unknown());
        assert_eq!(import(json!({"$id": "/schemas/{}"})).unwrap(), ast::object_keyword());
    }

    #[test]
    fn test_any_with_reference_extension() {
        let node = import(json!({
            "$id": "/schemas/any",
            "$echo": {"reference": {"typename": "Person", "version": "0.1.0"}}
        }))
        .unwrap();
        assert!(matches!(
            node.kind,
            SchemaKind::Refinement { refinement: Refinement::Reference(_), .. }
        ));
        assert_eq!(node.reference().map(|r| r.typename.as_str()), Some("Person"));
    }

    #[test]
    fn test_struct_optionality_and_index() {
        let node = import(json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}, "age": {"type": "number"}},
            "additionalProperties": {"type": "string"}
        }))
        .unwrap();
        let literal = node.as_struct().unwrap();
        assert!(!literal.get("name").unwrap().optional);
        assert!(literal.get("age").unwrap().optional);
        assert_eq!(literal.index.as_deref(), Some(&ast::string()));

        let record = import(json!({"type": "object", "additionalProperties": {"type": "number"}})).unwrap();
        assert_eq!(record, ast::record(ast::number()));
    }

    #[test]
    fn test_identity_field_is_last_and_required() {
        let node = import(json!({
            "type": "object",
            "required": [],
            "properties": {"id": {"type": "string"}, "name": {"type": "string"}},
            "$echo": {"type": {"typename": "Person", "version": "0.1.0"}}
        }))
        .unwrap();
        let names: Vec<_> = node.property_signatures().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "id"]);
        assert!(!node.property_signatures()[1].optional);
        assert_eq!(node.object_type().map(|d| d.typename.as_str()), Some("Person"));
    }

    #[test]
    fn test_missing_identity_field() {
        let err = import(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "$echo": {"type": {"typename": "Person", "version": "0.1.0"}}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::MissingIdentityField { .. }));
    }

    #[test]
    fn test_pattern_properties_unsupported() {
        let err = import(json!({"type": "object", "patternProperties": {"^a": {}}})).unwrap_err();
        assert!(matches!(err, SchemaError::Unsupported(_)));
    }

    #[test]
    fn test_refs() {
        let doc = json!({
            "type": "object",
            "required": ["email"],
            "properties": {"email": {"$ref": "#/$defs/Email"}},
            "$defs": {"Email": {"type": "string"}}
        });
        let node = import(doc).unwrap();
        assert_eq!(node.property_signatures()[0].node, ast::string().brand("Email"));

        let err = import(json!({"$ref": "#/$defs/Missing"})).unwrap_err();
        assert!(matches!(err, SchemaError::MissingDefinition(_)));

        // inherited definitions are visible, local ones override them
        let inherited = json!({"Id": {"type": "number"}});
        let node = from_json_schema(&json!({"$ref": "#/$defs/Id"}), inherited.as_object()).unwrap();
        assert_eq!(node, ast::number().brand("Id"));
        let node = from_json_schema(
            &json!({"$ref": "#/$defs/Id", "$defs": {"Id": {"type": "string"}}}),
            inherited.as_object(),
        )
        .unwrap();
        assert_eq!(node, ast::string().brand("Id"));
    }

    #[test]
    fn test_numbered_brand_key_restores_name() {
        let doc = json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {"a": {"$ref": "#/$defs/Id"}, "b": {"$ref": "#/$defs/Id2"}},
            "$defs": {
                "Id": {"type": "string"},
                "Id2": {"type": "number", "$echo": {"brand": "Id"}}
            }
        });
        let node = import(doc).unwrap();
        assert_eq!(node.property_signatures()[0].node, ast::string().brand("Id"));
        assert_eq!(node.property_signatures()[1].node, ast::number().brand("Id"));
    }

    #[test]
    fn test_escaped_ref() {
        let node = import(json!({"$ref": "#/$defs/ns~1Id", "$defs": {"ns/Id": {"type": "string"}}})).unwrap();
        assert_eq!(node, ast::string().brand("ns/Id"));
    }

    #[test]
    fn test_empty_not_is_never() {
        assert_eq!(import(json!({"not": {}})).unwrap().kind, SchemaKind::Never);
        assert_eq!(import(json!({"not": {"type": "string"}})).unwrap(), ast::unknown());
    }

    #[test]
    fn test_field_meta_reattached() {
        let node = import(json!({
            "type": "string",
            "$echo": {"fieldMeta": {"ui": {"label": "Name", "order": 1}}}
        }))
        .unwrap();
        let meta = node.annotations.field_meta.unwrap();
        assert_eq!(meta.namespace("ui").unwrap().get("order"), Some(&MetaValue::Number(1.0)));
    }

    #[test]
    fn test_array_requires_items() {
        assert!(import(json!({"type": "array"})).is_err());
        assert_eq!(
            import(json!({"type": "array", "items": [{"type": "string"}]})).unwrap(),
            ast::tuple(vec![ast::string()])
        );
    }
}
