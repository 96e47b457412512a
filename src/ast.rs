//! Schema tree
//!
//! A recursive structural type description. Every node carries
//! [`Annotations`]; the portable codec and the reference model read and write
//! them, the tree itself never interprets them.
//!
//! ```text
//! Struct { name: String, address?: Struct { zip: String } , id: String }
//!   └─ annotations.object_type = { typename: "example.Person", version: "0.1.0" }
//! ```

use serde_json::Value as Json;

use crate::annotation::{Annotations, FieldMetaValue, ObjectTypeDescriptor, ReferenceDescriptor};
use crate::error::{Result, SchemaError};

/// Literal type values
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl LiteralValue {
    pub fn from_json(value: &Json) -> Option<Self> {
        match value {
            Json::String(s) => Some(Self::String(s.clone())),
            Json::Number(n) => n.as_f64().map(Self::Number),
            Json::Bool(b) => Some(Self::Bool(*b)),
            Json::Null => Some(Self::Null),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Self::String(s) => Json::String(s.clone()),
            Self::Number(n) => number_to_json(*n),
            Self::Bool(b) => Json::Bool(*b),
            Self::Null => Json::Null,
        }
    }
}

/// Largest magnitude at which every whole `f64` is exactly representable
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// JSON number for an `f64`; whole values come out as integers (`1`, not
/// `1.0`), non-finite values as `null`.
pub(crate) fn number_to_json(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<f64> for LiteralValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A named property of a struct node
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    pub name: String,
    pub node: SchemaNode,
    /// Optional properties may be absent; they are never nullable unions
    pub optional: bool,
}

impl PropertySignature {
    pub fn required(name: impl Into<String>, node: SchemaNode) -> Self {
        Self {
            name: name.into(),
            node,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, node: SchemaNode) -> Self {
        Self {
            name: name.into(),
            node,
            optional: true,
        }
    }
}

/// Struct body: declared properties plus an optional string-keyed index
/// signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeLiteral {
    pub properties: Vec<PropertySignature>,
    pub index: Option<Box<SchemaNode>>,
}

impl TypeLiteral {
    pub fn get(&self, name: &str) -> Option<&PropertySignature> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Insert or replace a property by name, keeping its position.
    pub fn upsert(&mut self, property: PropertySignature) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }
}

/// Refinements narrow a base node.
#[derive(Debug, Clone, PartialEq)]
pub enum Refinement {
    /// Whole numbers only
    Int,
    /// Nominal brand; exported as a `$defs` entry
    Brand(String),
    /// Reference acceptance predicate (see `reference::build_reference_schema`)
    Reference(ReferenceDescriptor),
    /// JSON Schema keywords merged into the base node's output
    Extension(serde_json::Map<String, Json>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String,
    Number,
    Boolean,
    Any,
    Unknown,
    /// Any non-primitive value
    ObjectKeyword,
    /// Empty union
    Never,
    Literal(LiteralValue),
    Struct(TypeLiteral),
    Union(Vec<SchemaNode>),
    Tuple {
        elements: Vec<SchemaNode>,
        rest: Option<Box<SchemaNode>>,
    },
    Array(Box<SchemaNode>),
    Refinement {
        from: Box<SchemaNode>,
        refinement: Refinement,
    },
}

/// A node of the schema tree
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub annotations: Annotations,
}

impl From<SchemaKind> for SchemaNode {
    fn from(kind: SchemaKind) -> Self {
        Self {
            kind,
            annotations: Annotations::default(),
        }
    }
}

pub fn string() -> SchemaNode {
    SchemaKind::String.into()
}

pub fn number() -> SchemaNode {
    SchemaKind::Number.into()
}

/// A number refined to whole values
pub fn integer() -> SchemaNode {
    number().refine(Refinement::Int)
}

pub fn boolean() -> SchemaNode {
    SchemaKind::Boolean.into()
}

pub fn any() -> SchemaNode {
    SchemaKind::Any.into()
}

pub fn unknown() -> SchemaNode {
    SchemaKind::Unknown.into()
}

pub fn object_keyword() -> SchemaNode {
    SchemaKind::ObjectKeyword.into()
}

pub fn literal(value: impl Into<LiteralValue>) -> SchemaNode {
    SchemaKind::Literal(value.into()).into()
}

/// Union of members; a single member collapses to itself, none to `never`.
pub fn union(mut members: Vec<SchemaNode>) -> SchemaNode {
    match members.len() {
        0 => SchemaKind::Never.into(),
        1 => members.remove(0),
        _ => SchemaKind::Union(members).into(),
    }
}

pub fn tuple(elements: Vec<SchemaNode>) -> SchemaNode {
    SchemaKind::Tuple {
        elements,
        rest: None,
    }
    .into()
}

pub fn array(item: SchemaNode) -> SchemaNode {
    SchemaKind::Array(Box::new(item)).into()
}

pub fn struct_of(properties: Vec<PropertySignature>) -> SchemaNode {
    SchemaKind::Struct(TypeLiteral {
        properties,
        index: None,
    })
    .into()
}

/// Struct with declared properties and a string-keyed index signature
pub fn struct_with_index(properties: Vec<PropertySignature>, value: SchemaNode) -> SchemaNode {
    SchemaKind::Struct(TypeLiteral {
        properties,
        index: Some(Box::new(value)),
    })
    .into()
}

/// Pure index signature (`Record<string, value>`)
pub fn record(value: SchemaNode) -> SchemaNode {
    struct_with_index(Vec::new(), value)
}

impl SchemaNode {
    /// Wrap this node in a refinement.
    pub fn refine(self, refinement: Refinement) -> SchemaNode {
        SchemaKind::Refinement {
            from: Box::new(self),
            refinement,
        }
        .into()
    }

    /// Nominal brand (exported as `$ref` into `$defs`)
    pub fn brand(self, name: impl Into<String>) -> SchemaNode {
        self.refine(Refinement::Brand(name.into()))
    }

    pub fn with_object_type(mut self, descriptor: ObjectTypeDescriptor) -> Self {
        self.annotations.object_type = Some(descriptor);
        self
    }

    pub fn with_reference(mut self, descriptor: ReferenceDescriptor) -> Self {
        self.annotations.reference = Some(descriptor);
        self
    }

    /// Merge field metadata for a namespace into this node.
    pub fn with_field_meta(mut self, namespace: &str, entries: FieldMetaValue) -> Self {
        self.annotations.set_field_meta(namespace, entries);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.annotations.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.annotations.description = Some(description.into());
        self
    }

    pub fn object_type(&self) -> Option<&ObjectTypeDescriptor> {
        self.annotations.object_type.as_ref()
    }

    pub fn reference(&self) -> Option<&ReferenceDescriptor> {
        self.annotations.reference.as_ref()
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, SchemaKind::Struct(_))
    }

    pub fn as_struct(&self) -> Option<&TypeLiteral> {
        match &self.kind {
            SchemaKind::Struct(literal) => Some(literal),
            _ => None,
        }
    }

    /// Property signatures of a struct, looking through refinements.
    pub fn property_signatures(&self) -> &[PropertySignature] {
        match &self.kind {
            SchemaKind::Struct(literal) => &literal.properties,
            SchemaKind::Refinement { from, .. } => from.property_signatures(),
            _ => &[],
        }
    }

    fn require_struct(&self, op: &str) -> Result<&TypeLiteral> {
        self.as_struct()
            .ok_or_else(|| SchemaError::NotAStruct(format!("{op} on {}", self.kind_name())))
    }

    /// Struct with the properties of `self` followed by those of `other`.
    /// Properties of `other` replace same-named ones; annotations of `self`
    /// are kept.
    pub fn extend(&self, other: &SchemaNode) -> Result<SchemaNode> {
        let base = self.require_struct("extend")?;
        let extension = other.require_struct("extend")?;
        let mut merged = base.clone();
        for property in &extension.properties {
            merged.upsert(property.clone());
        }
        if merged.index.is_none() {
            merged.index = extension.index.clone();
        }
        Ok(SchemaNode {
            kind: SchemaKind::Struct(merged),
            annotations: self.annotations.clone(),
        })
    }

    /// Same struct with every property optional.
    pub fn partial(&self) -> Result<SchemaNode> {
        let mut literal = self.require_struct("partial")?.clone();
        for property in &mut literal.properties {
            property.optional = true;
        }
        Ok(SchemaNode {
            kind: SchemaKind::Struct(literal),
            annotations: self.annotations.clone(),
        })
    }

    /// Same struct without the named properties.
    pub fn omit<S: AsRef<str>>(&self, names: &[S]) -> Result<SchemaNode> {
        let mut literal = self.require_struct("omit")?.clone();
        literal
            .properties
            .retain(|p| !names.iter().any(|name| name.as_ref() == p.name));
        Ok(SchemaNode {
            kind: SchemaKind::Struct(literal),
            annotations: self.annotations.clone(),
        })
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Any => "any",
            SchemaKind::Unknown => "unknown",
            SchemaKind::ObjectKeyword => "object",
            SchemaKind::Never => "never",
            SchemaKind::Literal(_) => "literal",
            SchemaKind::Struct(_) => "struct",
            SchemaKind::Union(_) => "union",
            SchemaKind::Tuple { .. } => "tuple",
            SchemaKind::Array(_) => "array",
            SchemaKind::Refinement { .. } => "refinement",
        }
    }
}
