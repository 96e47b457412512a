//! Annotation model
//!
//! Typed metadata attached to schema tree nodes. There are exactly three kinds
//! that survive the portable codec:
//!
//! - **Type**: the node is a named record type ([`ObjectTypeDescriptor`])
//! - **Reference**: the node accepts references to a record type
//! - **FieldMeta**: per-namespace key/value metadata on a field
//!
//! Nodes also carry plain `title` / `description` documentation which the JSON
//! Schema generator emits as standard keywords.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ast::number_to_json;
use crate::error::{Result, SchemaError};

/// Declares a schema node as a named record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeDescriptor {
    /// Fully qualified type name (non-empty, no `:`)
    pub typename: String,
    /// Type version (e.g., "0.1.0")
    pub version: String,
    /// Registered schema id; overrides `typename` when matching references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
}

impl ObjectTypeDescriptor {
    /// Create a descriptor without a schema id
    pub fn new(typename: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            typename: typename.into(),
            version: version.into(),
            schema_id: None,
        }
    }

    /// Set the schema id
    pub fn with_schema_id(mut self, schema_id: impl Into<String>) -> Self {
        self.schema_id = Some(schema_id.into());
        self
    }

    /// The id references to this type are matched against.
    pub fn match_id(&self) -> &str {
        self.schema_id.as_deref().unwrap_or(&self.typename)
    }

    /// Check the typename invariant.
    pub fn validate(&self) -> Result<()> {
        validate_typename(&self.typename)
    }
}

/// "This node accepts references to objects of this type."
pub type ReferenceDescriptor = ObjectTypeDescriptor;

/// Typenames must be non-empty and must not contain `:` (the DXN delimiter).
pub fn validate_typename(typename: &str) -> Result<()> {
    if typename.is_empty() || typename.contains(':') {
        return Err(SchemaError::InvalidTypename(typename.to_string()));
    }
    Ok(())
}

/// A single field metadata value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Number(f64),
    String(String),
    /// Explicitly unset; dropped on serialization
    #[serde(skip)]
    Undefined,
}

impl MetaValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, MetaValue::Undefined)
    }
}

impl Serialize for MetaValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            MetaValue::Bool(b) => serializer.serialize_bool(*b),
            MetaValue::Number(n) => number_to_json(*n).serialize(serializer),
            MetaValue::String(s) => serializer.serialize_str(s),
            MetaValue::Undefined => serializer.serialize_unit(),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::String(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::String(s)
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        MetaValue::Number(n)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

/// Entries of one field metadata namespace.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FieldMetaValue(pub BTreeMap<String, MetaValue>);

impl Serialize for FieldMetaValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        for (k, v) in self.0.iter().filter(|(_, v)| !v.is_undefined()) {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl FieldMetaValue {
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }
}

impl<K: Into<String>, V: Into<MetaValue>> FromIterator<(K, V)> for FieldMetaValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Field metadata keyed by namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMeta(pub BTreeMap<String, FieldMetaValue>);

impl FieldMeta {
    /// Merge entries into a namespace; existing keys are overwritten, other
    /// keys and other namespaces are kept.
    pub fn merge(&mut self, namespace: &str, entries: FieldMetaValue) {
        let slot = self.0.entry(namespace.to_string()).or_default();
        for (key, value) in entries.0 {
            slot.0.insert(key, value);
        }
    }

    pub fn namespace(&self, namespace: &str) -> Option<&FieldMetaValue> {
        self.0.get(namespace)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The annotation kinds carried through the portable codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Type,
    Reference,
    FieldMeta,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 3] = [
        AnnotationKind::Type,
        AnnotationKind::Reference,
        AnnotationKind::FieldMeta,
    ];

    /// Sub-key used inside the `$echo` extension object
    pub fn extension_key(&self) -> &'static str {
        match self {
            AnnotationKind::Type => "type",
            AnnotationKind::Reference => "reference",
            AnnotationKind::FieldMeta => "fieldMeta",
        }
    }
}

/// Annotations attached to a schema node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub object_type: Option<ObjectTypeDescriptor>,
    pub reference: Option<ReferenceDescriptor>,
    pub field_meta: Option<FieldMeta>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Annotations {
    /// Whether any of the codec-carried kinds is present
    pub fn has(&self, kind: AnnotationKind) -> bool {
        match kind {
            AnnotationKind::Type => self.object_type.is_some(),
            AnnotationKind::Reference => self.reference.is_some(),
            AnnotationKind::FieldMeta => self.field_meta.is_some(),
        }
    }

    pub fn has_any_kind(&self) -> bool {
        AnnotationKind::ALL.iter().any(|kind| self.has(*kind))
    }

    /// Merge field metadata for a namespace into these annotations.
    pub fn set_field_meta(&mut self, namespace: &str, entries: FieldMetaValue) {
        self.field_meta
            .get_or_insert_with(FieldMeta::default)
            .merge(namespace, entries);
    }

    /// Take the three codec-carried kinds from `other`, keeping everything
    /// else from `self`.
    pub(crate) fn overlay_kinds(&mut self, other: &Annotations) {
        if other.object_type.is_some() {
            self.object_type = other.object_type.clone();
        }
        if other.reference.is_some() {
            self.reference = other.reference.clone();
        }
        if other.field_meta.is_some() {
            self.field_meta = other.field_meta.clone();
        }
    }
}
