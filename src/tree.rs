//! Traversal and lookup over schema trees
//!
//! Paths are dot-separated property names (`address.zip`). Only struct nodes
//! are walked into; unions and refinements are looked through with
//! [`leaf_type`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::annotation::FieldMetaValue;
use crate::ast::{PropertySignature, SchemaKind, SchemaNode};
use crate::error::{Result, SchemaError};
use crate::reference::Reference;

static PROP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_$][\w$]*$").expect("valid property regex"));
static PATH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_$][\w$]*(?:\.[a-zA-Z_$][\w$]*)*$").expect("valid path regex")
});

/// A single property name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonProp(String);

impl JsonProp {
    pub fn parse(prop: &str) -> Result<Self> {
        if !PROP_REGEX.is_match(prop) {
            return Err(SchemaError::InvalidPath(prop.to_string()));
        }
        Ok(Self(prop.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A dot-separated property path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPath(String);

impl JsonPath {
    pub fn parse(path: &str) -> Result<Self> {
        if !PATH_REGEX.is_match(path) {
            return Err(SchemaError::InvalidPath(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self> {
        let joined = segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(".");
        Self::parse(&joined)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// First concrete type reachable from a node.
///
/// Unions yield their first member with a concrete type, refinements recurse
/// into their base, everything else is its own leaf.
pub fn leaf_type(node: &SchemaNode) -> Option<&SchemaNode> {
    match &node.kind {
        SchemaKind::Union(members) => members.iter().find_map(leaf_type),
        SchemaKind::Refinement { from, .. } => leaf_type(from),
        _ => Some(node),
    }
}

/// Resolve a dot path to a property node.
///
/// Every intermediate segment must resolve to a struct; the leaf type of the
/// final property is returned.
pub fn get_property<'a>(tree: &'a SchemaNode, path: &str) -> Option<&'a SchemaNode> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut node = tree;
    for (i, part) in parts.iter().enumerate() {
        let property = node.property_signatures().iter().find(|p| p.name == *part)?;
        let ty = leaf_type(&property.node)?;
        if i < parts.len() - 1 && !ty.is_struct() {
            return None;
        }
        node = ty;
    }
    Some(node)
}

/// Depth-first visit of leaf properties (non-struct property types).
///
/// The visitor receives the leaf type and its path; returning `false` stops
/// the traversal.
pub fn visit_leaves<F>(tree: &SchemaNode, mut visitor: F)
where
    F: FnMut(&SchemaNode, &[String]) -> bool,
{
    let mut path = Vec::new();
    visit_node(tree, &mut visitor, &mut path);
}

fn visit_node<F>(node: &SchemaNode, visitor: &mut F, path: &mut Vec<String>) -> bool
where
    F: FnMut(&SchemaNode, &[String]) -> bool,
{
    for property in node.property_signatures() {
        let Some(ty) = leaf_type(&property.node) else {
            continue;
        };
        path.push(property.name.clone());
        let keep_going = if ty.is_struct() {
            visit_node(ty, visitor, path)
        } else {
            visitor(ty, path)
        };
        path.pop();
        if !keep_going {
            return false;
        }
    }
    true
}

/// Typename of an object type node, looking through refinements.
pub fn typename_of(node: &SchemaNode) -> Option<&str> {
    if let Some(descriptor) = node.object_type() {
        return Some(&descriptor.typename);
    }
    match &node.kind {
        SchemaKind::Refinement { from, .. } => typename_of(from),
        _ => None,
    }
}

/// Type reference of an object type node (`schemaId`, else typename).
pub fn type_reference_of(node: &SchemaNode) -> Option<Reference> {
    node.object_type()
        .map(|descriptor| Reference::new(descriptor.match_id()))
}

/// Field metadata of a property for one namespace.
pub fn field_meta_of<'a>(
    property: &'a PropertySignature,
    namespace: &str,
) -> Option<&'a FieldMetaValue> {
    property
        .node
        .annotations
        .field_meta
        .as_ref()
        .and_then(|meta| meta.namespace(namespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::MetaValue;
    use crate::ast::{self, PropertySignature as Prop};

    fn tree() -> SchemaNode {
        ast::struct_of(vec![
            Prop::optional("name", ast::string()),
            Prop::optional(
                "address",
                ast::struct_of(vec![Prop::optional("zip", ast::string())]),
            ),
        ])
    }

    #[test]
    fn test_leaf_type_through_union_and_refinement() {
        let node = ast::union(vec![ast::integer(), ast::string()]);
        assert_eq!(leaf_type(&node), Some(&ast::number()));

        let empty: SchemaNode = SchemaKind::Union(vec![]).into();
        assert_eq!(leaf_type(&empty), None);
    }

    #[test]
    fn test_get_property() {
        let t = ast::struct_of(vec![Prop::required(
            "a",
            ast::struct_of(vec![Prop::required("b", ast::string())]),
        )]);
        assert_eq!(get_property(&t, "a.b"), Some(&ast::string()));
        assert_eq!(get_property(&t, "a.c"), None);
        assert_eq!(get_property(&t, "a.b.c"), None);
        assert!(get_property(&t, "a").unwrap().is_struct());
    }

    #[test]
    fn test_visit_leaves_order() {
        let mut paths = Vec::new();
        visit_leaves(&tree(), |_, path| {
            paths.push(path.to_vec());
            true
        });
        assert_eq!(
            paths,
            vec![vec!["name".to_string()], vec!["address".to_string(), "zip".to_string()]]
        );
    }

    #[test]
    fn test_visit_leaves_stops_early() {
        let mut count = 0;
        visit_leaves(&tree(), |_, _| {
            count += 1;
            false
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn test_json_path_validation() {
        assert!(JsonPath::parse("address.zip").is_ok());
        assert!(JsonPath::parse("address..zip").is_err());
        assert!(JsonProp::parse("zip").is_ok());
        assert!(JsonProp::parse("a.b").is_err());
        assert_eq!(
            JsonPath::from_segments(&["a", "b"]).unwrap().segments().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_field_meta_of() {
        let prop = Prop::optional(
            "name",
            ast::string().with_field_meta("ui", [("label", "Name")].into_iter().collect()),
        );
        assert_eq!(
            field_meta_of(&prop, "ui").and_then(|m| m.get("label")),
            Some(&MetaValue::from("Name"))
        );
        assert!(field_meta_of(&prop, "db").is_none());
    }
}
