//! Schema Registry
//!
//! Runtime registry of object type schemas, keyed by typename. Static schemas
//! are registered as trees; stored schemas are registered as shared
//! [`DynamicSchema`] instances so that later mutations are visible to every
//! holder.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{info, warn};

use crate::annotation::validate_typename;
use crate::ast::SchemaNode;
use crate::dxn::Dxn;
use crate::dynamic::DynamicSchema;
use crate::error::{Result, SchemaError};
use crate::object::StoredSchemaRecord;
use crate::reference::Reference;

/// A registered schema
#[derive(Debug, Clone)]
pub enum RegisteredSchema {
    /// Schema defined in code
    Static(SchemaNode),
    /// Schema backed by a stored record
    Dynamic(Rc<RefCell<DynamicSchema>>),
}

impl RegisteredSchema {
    /// Current schema tree; dynamic schemas are compiled if needed.
    pub fn schema(&self) -> Result<SchemaNode> {
        match self {
            RegisteredSchema::Static(node) => Ok(node.clone()),
            RegisteredSchema::Dynamic(dynamic) => dynamic.borrow_mut().schema().cloned(),
        }
    }

    pub fn as_dynamic(&self) -> Option<&Rc<RefCell<DynamicSchema>>> {
        match self {
            RegisteredSchema::Dynamic(dynamic) => Some(dynamic),
            RegisteredSchema::Static(_) => None,
        }
    }

    /// Stored record id of a dynamic schema
    fn schema_id(&self) -> Option<String> {
        match self {
            RegisteredSchema::Static(node) => node.object_type()?.schema_id.clone(),
            RegisteredSchema::Dynamic(dynamic) => Some(dynamic.borrow().id().to_string()),
        }
    }
}

/// Registry of object type schemas
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, RegisteredSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object type schema.
    pub fn register(&mut self, schema: SchemaNode) -> Result<()> {
        let typename = schema
            .object_type()
            .ok_or(SchemaError::NotAnObjectType)?
            .typename
            .clone();
        validate_typename(&typename)?;
        self.insert(typename, RegisteredSchema::Static(schema))
    }

    /// Register a stored schema, returning the shared dynamic schema.
    pub fn register_stored(&mut self, record: StoredSchemaRecord) -> Result<Rc<RefCell<DynamicSchema>>> {
        validate_typename(&record.typename)?;
        let typename = record.typename.clone();
        let dynamic = Rc::new(RefCell::new(DynamicSchema::new(record)));
        self.insert(typename, RegisteredSchema::Dynamic(Rc::clone(&dynamic)))?;
        Ok(dynamic)
    }

    fn insert(&mut self, typename: String, entry: RegisteredSchema) -> Result<()> {
        if self.schemas.contains_key(&typename) {
            warn!(%typename, "Schema already registered");
            return Err(SchemaError::AlreadyRegistered { typename });
        }
        info!(
            %typename,
            dynamic = entry.as_dynamic().is_some(),
            "Registered schema"
        );
        self.schemas.insert(typename, entry);
        Ok(())
    }

    pub fn get(&self, typename: &str) -> Option<&RegisteredSchema> {
        self.schemas.get(typename)
    }

    /// Resolve a reference: type references by typename, others by stored
    /// schema id.
    pub fn get_by_reference(&self, reference: &Reference) -> Option<&RegisteredSchema> {
        if reference.is_type() {
            return self.get(&reference.object_id);
        }
        self.schemas
            .values()
            .find(|entry| entry.schema_id().as_deref() == Some(reference.object_id.as_str()))
    }

    pub fn get_by_dxn(&self, dxn: &Dxn) -> Option<&RegisteredSchema> {
        let reference = Reference::from_dxn(dxn).ok()?;
        self.get_by_reference(&reference)
    }

    pub fn contains(&self, typename: &str) -> bool {
        self.schemas.contains_key(typename)
    }

    /// Registered typenames, sorted
    pub fn typenames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ObjectTypeDescriptor;
    use crate::ast::{self, PropertySignature};
    use crate::codec::to_json_schema;
    use crate::object::{object_type, ObjectTypeOptions};

    fn person() -> SchemaNode {
        object_type(
            ObjectTypeDescriptor::new("example.Person", "0.1.0"),
            vec![PropertySignature::required("name", ast::string())],
            ObjectTypeOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = SchemaRegistry::new();
        registry.register(person()).unwrap();
        assert!(registry.contains("example.Person"));
        assert_eq!(registry.typenames(), vec!["example.Person"]);

        let dxn = Dxn::type_of("example.Person").unwrap();
        let found = registry.get_by_dxn(&dxn).unwrap().schema().unwrap();
        assert_eq!(found, person());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = SchemaRegistry::new();
        registry.register(person()).unwrap();
        let err = registry.register(person()).unwrap_err();
        assert!(matches!(err, SchemaError::AlreadyRegistered { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_untyped_schema_rejected() {
        let mut registry = SchemaRegistry::new();
        let err = registry.register(ast::string()).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObjectType));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stored_schema_is_shared() {
        let mut registry = SchemaRegistry::new();
        let record = StoredSchemaRecord::new("01HSCHEMA", "example.Task", "0.1.0", to_json_schema(&person()));
        let dynamic = registry.register_stored(record).unwrap();

        dynamic
            .borrow_mut()
            .add_fields(vec![PropertySignature::required("done", ast::boolean())])
            .unwrap();

        let entry = registry.get_by_dxn(&Dxn::parse("dxn:echo:@:01HSCHEMA").unwrap()).unwrap();
        let schema = entry.schema().unwrap();
        assert!(schema.as_struct().unwrap().get("done").is_some());
    }
}
