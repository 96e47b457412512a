//! Echo Schema
//!
//! Structural schemas for records in the Echo object store.
//!
//! ## Features
//!
//! - **Annotated schema trees**: object type, reference and field metadata
//!   annotations on any node
//! - **Portable codec**: lossless JSON Schema (draft-07) export and import,
//!   with annotations carried in a `$echo` extension property
//! - **Dynamic schemas**: stored schema records that can gain, lose and
//!   rename fields at runtime
//! - **Typed references**: reference schemas, DXNs and reference resolution
//! - **Reactive objects**: records behind a swappable access handler
//!
//! ## Architecture
//!
//! ```text
//! ast / annotation ──► tree (paths, leaves)
//!        │
//!        ├──► codec ──► export: tree -> { ..., "$echo": {...} }
//!        │         └──► import: document -> tree
//!        │
//!        ├──► object ──► dynamic (StoredSchemaRecord + cached tree)
//!        │                  └──► registry
//!        │
//!        └──► reference ◄── dxn
//!                 └──► validate ◄── value ◄── reactive
//! ```

pub mod annotation;
pub mod ast;
pub mod codec;
pub mod config;
pub mod dxn;
pub mod dynamic;
pub mod error;
pub mod object;
pub mod reactive;
pub mod reference;
pub mod registry;
pub mod tree;
pub mod validate;
pub mod value;

pub use annotation::{
    AnnotationKind, Annotations, FieldMeta, FieldMetaValue, MetaValue, ObjectTypeDescriptor,
    ReferenceDescriptor,
};
pub use ast::{LiteralValue, PropertySignature, Refinement, SchemaKind, SchemaNode, TypeLiteral};
pub use codec::{from_json_schema, to_json_schema, to_json_schema_with, ExportOptions};
pub use config::EchoConfig;
pub use dxn::Dxn;
pub use dynamic::DynamicSchema;
pub use error::{Result, SchemaError};
pub use object::{object_type, ObjectTypeOptions, StoredSchemaRecord};
pub use reactive::{ReactiveHandler, ReactiveObject};
pub use reference::{accepts_reference, build_reference_schema, reference_to, Reference};
pub use registry::{RegisteredSchema, SchemaRegistry};
pub use tree::{get_property, visit_leaves, JsonPath, JsonProp};
pub use validate::{is_valid, validate, ValidationError};
pub use value::Value;
