//! Reference schemas, DXNs and reactive records

use std::collections::BTreeMap;
use std::rc::Rc;

use echo_schema::reactive::ObjectMeta;
use echo_schema::reference::EXPANDO_TYPENAME;
use echo_schema::tree::type_reference_of;
use echo_schema::{
    ast, build_reference_schema, is_valid, object_type, reference_to, validate, Dxn,
    ObjectTypeDescriptor, ObjectTypeOptions, PropertySignature, ReactiveHandler,
    ReactiveObject, Reference, SchemaNode, SchemaRegistry, Value,
};
use serde_json::json;

/// Handler typing every record with the schema it was built for.
struct SchemaHandler {
    schema: SchemaNode,
}

impl SchemaHandler {
    fn wrap(schema: &SchemaNode, fields: serde_json::Value) -> Value {
        let object = ReactiveObject::from_json(&fields);
        object.attach_handler(Rc::new(SchemaHandler {
            schema: schema.clone(),
        }));
        Value::Object(object)
    }
}

impl ReactiveHandler for SchemaHandler {
    fn init(&self, _target: &ReactiveObject) {}

    fn is_deleted(&self, _target: &ReactiveObject) -> bool {
        false
    }

    fn schema(&self, _target: &ReactiveObject) -> Option<SchemaNode> {
        Some(self.schema.clone())
    }

    fn type_reference(&self, _target: &ReactiveObject) -> Option<Reference> {
        type_reference_of(&self.schema)
    }

    fn meta(&self, _target: &ReactiveObject) -> ObjectMeta {
        ObjectMeta::default()
    }
}

fn person() -> SchemaNode {
    object_type(
        ObjectTypeDescriptor::new("example.com/type/Person", "0.1.0"),
        vec![PropertySignature::required("name", ast::string())],
        ObjectTypeOptions::default(),
    )
    .unwrap()
}

fn company() -> SchemaNode {
    object_type(
        ObjectTypeDescriptor::new("example.com/type/Company", "0.1.0"),
        vec![PropertySignature::required("name", ast::string())],
        ObjectTypeOptions::default(),
    )
    .unwrap()
}

#[test]
fn test_reference_schema_acceptance() {
    let person_ref = reference_to(&person()).unwrap();

    assert!(is_valid(&person_ref, &Value::Undefined));
    assert!(is_valid(&person_ref, &SchemaHandler::wrap(&person(), json!({"name": "Ada", "id": "1"}))));
    assert!(!is_valid(&person_ref, &SchemaHandler::wrap(&company(), json!({"name": "ACME", "id": "2"}))));
    assert!(!is_valid(&person_ref, &Value::from(json!({"name": "Ada", "id": "1"}))));
    assert!(!is_valid(&person_ref, &Value::Null));
}

#[test]
fn test_reference_matches_schema_id_first() {
    let descriptor = ObjectTypeDescriptor::new("example.com/type/Person", "0.1.0").with_schema_id("01HSCHEMA");
    let stored_person = ast::struct_of(vec![PropertySignature::required("id", ast::string())])
        .with_object_type(descriptor.clone());
    let reference = build_reference_schema(&descriptor);

    assert!(is_valid(&reference, &SchemaHandler::wrap(&stored_person, json!({"id": "1"}))));
    // same typename, but typed by name rather than by stored schema id
    assert!(!is_valid(&reference, &SchemaHandler::wrap(&person(), json!({"id": "1"}))));
}

#[test]
fn test_reference_property_in_struct() {
    let employee = ast::struct_of(vec![
        PropertySignature::required("name", ast::string()),
        PropertySignature::required("employer", reference_to(&company()).unwrap()),
    ]);

    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), Value::from("Ada"));
    fields.insert(
        "employer".to_string(),
        SchemaHandler::wrap(&company(), json!({"name": "ACME", "id": "2"})),
    );
    assert!(is_valid(&employee, &Value::Map(fields.clone())));

    fields.insert("employer".to_string(), SchemaHandler::wrap(&person(), json!({"name": "Bob"})));
    let err = validate(&employee, &Value::Map(fields)).unwrap_err();
    assert_eq!(err.path, "$.employer");
}

#[test]
fn test_expando_reference_accepts_anything() {
    let expando = build_reference_schema(&ObjectTypeDescriptor::new(EXPANDO_TYPENAME, "0.1.0"));
    assert!(is_valid(&expando, &Value::from("not a record")));
    assert!(is_valid(&expando, &SchemaHandler::wrap(&company(), json!({}))));
}

#[test]
fn test_handler_swap_changes_resolved_type() {
    let person_ref = reference_to(&person()).unwrap();
    let record = ReactiveObject::from_json(&json!({"name": "Ada", "id": "1"}));
    let value = Value::Object(record.clone());
    assert!(!is_valid(&person_ref, &value));

    record.attach_handler(Rc::new(SchemaHandler { schema: person() }));
    assert!(is_valid(&person_ref, &value));

    record.attach_handler(Rc::new(SchemaHandler { schema: company() }));
    assert!(!is_valid(&person_ref, &value));
}

#[test]
fn test_dxn_resolution() {
    let local = Dxn::parse("dxn:echo:@:01J00J9B45YHYSGZQTQMSKMGJ6").unwrap();
    let reference = Reference::from_dxn(&local).unwrap();
    assert_eq!(reference.host, None);
    assert_eq!(reference.object_id, "01J00J9B45YHYSGZQTQMSKMGJ6");
    assert_eq!(reference.to_dxn().unwrap(), local);

    let mut registry = SchemaRegistry::new();
    registry.register(person()).unwrap();
    let found = registry
        .get_by_dxn(&Dxn::parse("dxn:type:example.com/type/Person").unwrap())
        .unwrap();
    assert_eq!(found.schema().unwrap(), person());

    assert!(Dxn::parse("dxn:echo:only-one-part").is_err());
    assert!(Dxn::parse("urn:echo:@:1").is_err());
}

#[test]
fn test_reference_to_dxn_is_lossless_or_fails() {
    let hosted = Reference::new("01J00").with_host("BA25QRC2");
    let back = Reference::from_dxn(&Dxn::parse(&hosted.to_dxn().unwrap().to_string()).unwrap()).unwrap();
    assert_eq!(back, hosted);

    let typed = Reference::for_type("example.com/type/Person");
    assert_eq!(Reference::from_dxn(&typed.to_dxn().unwrap()).unwrap(), typed);

    assert!(Reference::new("01J00").with_protocol("custom").with_host("H").to_dxn().is_err());
    assert!(Reference::for_type("example.com/type/Person").with_host("H").to_dxn().is_err());
}

#[test]
fn test_reference_serde() {
    let reference = Reference::new("01J00").with_host("BA25QRC2");
    let json = serde_json::to_value(&reference).unwrap();
    assert_eq!(json, json!({"objectId": "01J00", "host": "BA25QRC2"}));
    let back: Reference = serde_json::from_value(json).unwrap();
    assert_eq!(back, reference);
}
