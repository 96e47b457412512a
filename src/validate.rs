//! Acceptance checks of runtime values against schema trees
//!
//! This is the small structural check the reference model needs, not a
//! general parsing engine: no coercion, no transformations, excess struct
//! properties are ignored unless an index signature constrains them.

use thiserror::Error;

use crate::ast::{LiteralValue, Refinement, SchemaKind, SchemaNode};
use crate::reference::accepts_reference;
use crate::value::Value;

/// A value rejected by a schema
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// Dot path of the rejected value (`$` for the root)
    pub path: String,
    pub message: String,
}

/// Check a value against a schema.
pub fn validate(schema: &SchemaNode, value: &Value) -> Result<(), ValidationError> {
    check(schema, value, "$")
}

pub fn is_valid(schema: &SchemaNode, value: &Value) -> bool {
    validate(schema, value).is_ok()
}

fn fail(path: &str, message: impl Into<String>) -> Result<(), ValidationError> {
    Err(ValidationError {
        path: path.to_string(),
        message: message.into(),
    })
}

fn expected(path: &str, what: &str, value: &Value) -> Result<(), ValidationError> {
    fail(path, format!("expected {what}, got {}", value.type_name()))
}

fn check(schema: &SchemaNode, value: &Value, path: &str) -> Result<(), ValidationError> {
    match &schema.kind {
        SchemaKind::Any | SchemaKind::Unknown => Ok(()),
        SchemaKind::Never => fail(path, "no value is allowed"),
        SchemaKind::String => match value {
            Value::String(_) => Ok(()),
            other => expected(path, "string", other),
        },
        SchemaKind::Number => match value {
            Value::Number(_) => Ok(()),
            other => expected(path, "number", other),
        },
        SchemaKind::Boolean => match value {
            Value::Bool(_) => Ok(()),
            other => expected(path, "boolean", other),
        },
        SchemaKind::ObjectKeyword => match value {
            Value::Map(_) | Value::Object(_) | Value::Array(_) | Value::Schema(_) => Ok(()),
            other => expected(path, "object", other),
        },
        SchemaKind::Literal(literal) => {
            let matches = match (literal, value) {
                (LiteralValue::String(a), Value::String(b)) => a == b,
                (LiteralValue::Number(a), Value::Number(b)) => a == b,
                (LiteralValue::Bool(a), Value::Bool(b)) => a == b,
                (LiteralValue::Null, Value::Null) => true,
                _ => false,
            };
            if matches {
                Ok(())
            } else {
                fail(path, format!("expected literal {}", literal.to_json()))
            }
        }
        SchemaKind::Struct(literal) => {
            let fields: Vec<(String, Value)> = match value {
                Value::Map(fields) => fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                Value::Object(object) => object
                    .keys()
                    .into_iter()
                    .filter_map(|k| object.get(&k).map(|v| (k, v)))
                    .collect(),
                other => return expected(path, "object", other),
            };
            let field = |name: &str| fields.iter().find(|(k, _)| k == name).map(|(_, v)| v);

            for property in &literal.properties {
                let property_path = format!("{path}.{}", property.name);
                match field(&property.name) {
                    None => {
                        if !property.optional {
                            return fail(&property_path, "missing required property");
                        }
                    }
                    Some(Value::Undefined) if property.optional => {}
                    Some(v) => check(&property.node, v, &property_path)?,
                }
            }
            if let Some(index) = &literal.index {
                for (key, v) in &fields {
                    if literal.get(key).is_none() {
                        check(index, v, &format!("{path}.{key}"))?;
                    }
                }
            }
            Ok(())
        }
        SchemaKind::Union(members) => {
            if members.iter().any(|m| check(m, value, path).is_ok()) {
                Ok(())
            } else {
                fail(path, format!("{} matches no union member", value.type_name()))
            }
        }
        SchemaKind::Tuple { elements, rest } => {
            let Value::Array(items) = value else {
                return expected(path, "tuple", value);
            };
            if items.len() < elements.len() {
                return fail(path, format!("expected at least {} elements", elements.len()));
            }
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                match (elements.get(i), rest) {
                    (Some(element), _) => check(element, item, &item_path)?,
                    (None, Some(rest)) => check(rest, item, &item_path)?,
                    (None, None) => return fail(&item_path, "unexpected element"),
                }
            }
            Ok(())
        }
        SchemaKind::Array(item_schema) => {
            let Value::Array(items) = value else {
                return expected(path, "array", value);
            };
            for (i, item) in items.iter().enumerate() {
                check(item_schema, item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        SchemaKind::Refinement { from, refinement } => match refinement {
            Refinement::Int => {
                check(from, value, path)?;
                match value.as_f64() {
                    Some(n) if n.fract() != 0.0 => fail(path, "expected an integer"),
                    _ => Ok(()),
                }
            }
            Refinement::Reference(descriptor) => {
                if accepts_reference(descriptor, value) {
                    Ok(())
                } else {
                    fail(path, format!("expected a reference to {}", descriptor.typename))
                }
            }
            Refinement::Brand(_) | Refinement::Extension(_) => check(from, value, path),
        },
    }
}
