//! Schema tree -> portable document
//!
//! Two passes: annotated nodes are first wrapped in extension refinements
//! (bottom-up), then a plain JSON Schema generator renders the tree.

use serde_json::{json, Map, Value as Json};

use super::{
    definition_pointer, EchoExtension, ANY_ID, ECHO_EXTENSION_KEY, JSON_SCHEMA_DRAFT_07, OBJECT_ID,
    UNKNOWN_ID,
};
use crate::ast::{PropertySignature, Refinement, SchemaKind, SchemaNode, TypeLiteral};

/// Export options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// `$schema` of the root document; omitted when `None`
    pub schema_uri: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            schema_uri: Some(JSON_SCHEMA_DRAFT_07.to_string()),
        }
    }
}

/// Export a schema tree with default options.
pub fn to_json_schema(node: &SchemaNode) -> Json {
    to_json_schema_with(node, &ExportOptions::default())
}

/// Export a schema tree.
pub fn to_json_schema_with(node: &SchemaNode, options: &ExportOptions) -> Json {
    let marked = with_extension_markers(node);
    let mut generator = Generator::default();
    let body = generator.generate(&marked);

    let mut root = Map::new();
    if let Some(uri) = &options.schema_uri {
        root.insert("$schema".to_string(), Json::String(uri.clone()));
    }
    if let Json::Object(body) = body {
        root.extend(body);
    }
    if !generator.defs.is_empty() {
        root.insert("$defs".to_string(), Json::Object(generator.defs));
    }
    Json::Object(root)
}

/// Rewrite children first, then wrap the node itself if it carries any of the
/// codec-carried annotations.
fn with_extension_markers(node: &SchemaNode) -> SchemaNode {
    let kind = match &node.kind {
        SchemaKind::Struct(literal) => SchemaKind::Struct(TypeLiteral {
            properties: literal
                .properties
                .iter()
                .map(|p| PropertySignature {
                    name: p.name.clone(),
                    node: with_extension_markers(&p.node),
                    optional: p.optional,
                })
                .collect(),
            index: literal
                .index
                .as_ref()
                .map(|index| Box::new(with_extension_markers(index))),
        }),
        SchemaKind::Union(members) => {
            SchemaKind::Union(members.iter().map(with_extension_markers).collect())
        }
        SchemaKind::Tuple { elements, rest } => SchemaKind::Tuple {
            elements: elements.iter().map(with_extension_markers).collect(),
            rest: rest.as_ref().map(|r| Box::new(with_extension_markers(r))),
        },
        SchemaKind::Array(item) => SchemaKind::Array(Box::new(with_extension_markers(item))),
        SchemaKind::Refinement { from, refinement } => SchemaKind::Refinement {
            from: Box::new(with_extension_markers(from)),
            refinement: refinement.clone(),
        },
        other => other.clone(),
    };
    let rewritten = SchemaNode {
        kind,
        annotations: node.annotations.clone(),
    };

    match EchoExtension::from_annotations(&node.annotations) {
        None => rewritten,
        Some(extension) => {
            let mut marker = Map::new();
            // EchoExtension only holds serializable data.
            if let Ok(payload) = serde_json::to_value(&extension) {
                marker.insert(ECHO_EXTENSION_KEY.to_string(), payload);
            }
            rewritten.refine(Refinement::Extension(marker))
        }
    }
}

#[derive(Default)]
struct Generator {
    defs: Map<String, Json>,
    /// `$defs` key, brand name and branded node of every emitted brand
    brands: Vec<(String, String, SchemaNode)>,
}

impl Generator {
    fn generate(&mut self, node: &SchemaNode) -> Json {
        let mut out = match &node.kind {
            SchemaKind::String => json!({ "type": "string" }),
            SchemaKind::Number => json!({ "type": "number" }),
            SchemaKind::Boolean => json!({ "type": "boolean" }),
            SchemaKind::Any => json!({ "$id": ANY_ID }),
            SchemaKind::Unknown => json!({ "$id": UNKNOWN_ID }),
            SchemaKind::ObjectKeyword => json!({
                "$id": OBJECT_ID,
                "anyOf": [{ "type": "object" }, { "type": "array" }],
            }),
            SchemaKind::Never => json!({ "not": {} }),
            SchemaKind::Literal(value) => json!({ "const": value.to_json() }),
            SchemaKind::Struct(literal) => self.generate_struct(literal),
            SchemaKind::Union(members) => self.generate_union(members),
            SchemaKind::Tuple { elements, rest } => {
                let items: Vec<Json> = elements.iter().map(|e| self.generate(e)).collect();
                let additional = match rest {
                    Some(rest) => self.generate(rest),
                    None => Json::Bool(false),
                };
                json!({
                    "type": "array",
                    "minItems": elements.len(),
                    "items": items,
                    "additionalItems": additional,
                })
            }
            SchemaKind::Array(item) => json!({ "type": "array", "items": self.generate(item) }),
            SchemaKind::Refinement { from, refinement } => self.generate_refinement(from, refinement),
        };

        if let Json::Object(map) = &mut out {
            if let Some(title) = &node.annotations.title {
                map.insert("title".to_string(), Json::String(title.clone()));
            }
            if let Some(description) = &node.annotations.description {
                map.insert("description".to_string(), Json::String(description.clone()));
            }
        }
        out
    }

    fn generate_struct(&mut self, literal: &TypeLiteral) -> Json {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for property in &literal.properties {
            properties.insert(property.name.clone(), self.generate(&property.node));
            if !property.optional {
                required.push(Json::String(property.name.clone()));
            }
        }
        let additional = match &literal.index {
            Some(index) => self.generate(index),
            None => Json::Bool(false),
        };
        json!({
            "type": "object",
            "required": required,
            "properties": properties,
            "additionalProperties": additional,
        })
    }

    fn generate_union(&mut self, members: &[SchemaNode]) -> Json {
        let literals: Option<Vec<Json>> = members
            .iter()
            .map(|m| match &m.kind {
                SchemaKind::Literal(value) if m.annotations == Default::default() => {
                    Some(value.to_json())
                }
                _ => None,
            })
            .collect();
        match literals {
            Some(values) => json!({ "enum": values }),
            None => {
                let any_of: Vec<Json> = members.iter().map(|m| self.generate(m)).collect();
                json!({ "anyOf": any_of })
            }
        }
    }

    fn generate_refinement(&mut self, from: &SchemaNode, refinement: &Refinement) -> Json {
        match refinement {
            Refinement::Int => self.generate_integer(from),
            Refinement::Brand(name) => self.generate_brand(name, from),
            Refinement::Extension(keywords) => {
                let mut out = self.generate(from);
                if let Json::Object(map) = &mut out {
                    for (key, value) in keywords {
                        map.insert(key.clone(), value.clone());
                    }
                }
                out
            }
            Refinement::Reference(_) => self.generate(from),
        }
    }

    /// `integer` for numbers, looking through extension markers of the
    /// refined node.
    fn generate_integer(&mut self, from: &SchemaNode) -> Json {
        let mut markers = Vec::new();
        let mut base = from;
        while let SchemaKind::Refinement {
            from: inner,
            refinement: Refinement::Extension(keywords),
        } = &base.kind
        {
            markers.push(keywords);
            base = inner;
        }
        if !matches!(base.kind, SchemaKind::Number) {
            return self.generate(from);
        }

        let mut out = self.generate(base);
        if let Json::Object(map) = &mut out {
            map.insert("type".to_string(), json!("integer"));
            for keywords in markers.into_iter().rev() {
                for (key, value) in keywords {
                    map.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }

    /// Brands live in `$defs`. Equal brands share one entry; a name already
    /// used for a different node gets a numbered key and records the name in
    /// the entry's extension.
    fn generate_brand(&mut self, name: &str, from: &SchemaNode) -> Json {
        let existing = self
            .brands
            .iter()
            .find(|(_, brand, node)| brand == name && node == from)
            .map(|(key, _, _)| key.clone());

        let key = match existing {
            Some(key) => key,
            None => {
                let key = self.unused_key(name);
                self.brands.push((key.clone(), name.to_string(), from.clone()));
                // Reserve the slot first so nested brands of the same name
                // pick another key.
                self.defs.insert(key.clone(), Json::Bool(true));
                let mut body = self.generate(from);
                if key != name {
                    if let Json::Object(map) = &mut body {
                        let extension = map
                            .entry(ECHO_EXTENSION_KEY.to_string())
                            .or_insert_with(|| json!({}));
                        if let Json::Object(extension) = extension {
                            extension.insert("brand".to_string(), json!(name));
                        }
                    }
                }
                self.defs.insert(key.clone(), body);
                key
            }
        };
        json!({ "$ref": definition_pointer(&key) })
    }

    fn unused_key(&self, name: &str) -> String {
        if !self.defs.contains_key(name) {
            return name.to_string();
        }
        (2..)
            .map(|n| format!("{name}{n}"))
            .find(|key| !self.defs.contains_key(key))
            .unwrap_or_else(|| name.to_string())
    }
}
