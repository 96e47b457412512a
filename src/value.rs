//! Runtime values checked against schema trees

use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::number_to_json;
use crate::dynamic::DynamicSchema;
use crate::reactive::ReactiveObject;

/// A live value: JSON data, a wrapped record, or a dynamic schema instance.
///
/// `Undefined` is distinct from `Null`; an undefined reference is a pending
/// reference.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Plain, unwrapped object
    Map(BTreeMap<String, Value>),
    /// Record behind an interception wrapper
    Object(ReactiveObject),
    /// Dynamic schema instance
    Schema(Rc<RefCell<DynamicSchema>>),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "object",
            Value::Object(_) => "record",
            Value::Schema(_) => "schema",
        }
    }

    /// JSON form; undefined becomes `null`, records serialize their fields.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(fields) => Json::Object(
                fields
                    .iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Object(object) => Json::Object(
                object
                    .keys()
                    .into_iter()
                    .filter_map(|k| {
                        let v = object.get(&k)?;
                        (!v.is_undefined()).then(|| (k, v.to_json()))
                    })
                    .collect(),
            ),
            Value::Schema(schema) => schema
                .try_borrow()
                .ok()
                .and_then(|schema| serde_json::to_value(schema.stored()).ok())
                .unwrap_or(Json::Null),
        }
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            Json::Object(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from(&json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<ReactiveObject> for Value {
    fn from(object: ReactiveObject) -> Self {
        Value::Object(object)
    }
}

impl PartialEq for Value {
    /// Data compares structurally; records and schemas by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Schema(a), Value::Schema(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Object(object) => write!(f, "{object:?}"),
            Value::Schema(schema) => match schema.try_borrow() {
                Ok(schema) => write!(f, "DynamicSchema({})", schema.typename()),
                Err(_) => write!(f, "DynamicSchema(<borrowed>)"),
            },
            other => write!(f, "{}", other.to_json()),
        }
    }
}
