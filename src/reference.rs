//! Typed references between records
//!
//! A [`Reference`] names a target record by object id, optionally scoped by
//! host (space key) and protocol. References convert to and from DXNs.
//! Reference schemas accept:
//!
//! - `undefined` (pending reference, not yet resolved)
//! - a dynamic schema instance, when the target type is the stored schema type
//! - a reactive object whose resolved type matches the target type
//!
//! A reference to [`EXPANDO_TYPENAME`] accepts any value.

use serde::{Deserialize, Serialize};

use crate::annotation::ReferenceDescriptor;
use crate::ast::{self, Refinement, SchemaNode};
use crate::dxn::{Dxn, LOCAL_SPACE_TAG};
use crate::error::{Result, SchemaError};
use crate::object::STORED_SCHEMA_TYPENAME;
use crate::value::Value;

/// Typename that matches any record type.
pub const EXPANDO_TYPENAME: &str = "echo.schema.Expando";

/// Runtime representation of an object reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Reference {
    /// Protocol of references to runtime registered types.
    pub const TYPE_PROTOCOL: &'static str = "type";

    /// Reference in the local scope.
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            protocol: None,
            host: None,
        }
    }

    /// Reference to a registered type.
    pub fn for_type(typename: impl Into<String>) -> Self {
        Self::new(typename).with_protocol(Self::TYPE_PROTOCOL)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn is_type(&self) -> bool {
        self.protocol.as_deref() == Some(Self::TYPE_PROTOCOL)
    }

    /// Resolve from a DXN; `@` in place of the host means no host.
    pub fn from_dxn(dxn: &Dxn) -> Result<Self> {
        match dxn.kind() {
            Dxn::ECHO => {
                let [host, object_id] = dxn.parts() else {
                    return Err(SchemaError::invalid_dxn(&dxn.to_string(), "expected 2 parts"));
                };
                let reference = Self::new(object_id.clone());
                if host == LOCAL_SPACE_TAG {
                    Ok(reference)
                } else {
                    Ok(reference.with_host(host.clone()))
                }
            }
            Dxn::TYPE => Ok(Self::for_type(dxn.parts()[0].clone())),
            kind => Err(SchemaError::invalid_dxn(
                &dxn.to_string(),
                format!("unsupported kind {kind:?}"),
            )),
        }
    }

    /// Canonical DXN. The host is assumed to be the space key.
    ///
    /// Fails for references a DXN cannot carry: protocols other than
    /// [`Self::TYPE_PROTOCOL`], and type references with a host.
    pub fn to_dxn(&self) -> Result<Dxn> {
        match (self.protocol.as_deref(), self.host.as_deref()) {
            (None, host) => Dxn::echo(host, &self.object_id),
            (Some(Self::TYPE_PROTOCOL), None) => Dxn::type_of(&self.object_id),
            (Some(Self::TYPE_PROTOCOL), Some(host)) => Err(SchemaError::invalid_dxn(
                &self.object_id,
                format!("type reference cannot have host {host:?}"),
            )),
            (Some(protocol), _) => Err(SchemaError::invalid_dxn(
                &self.object_id,
                format!("unsupported protocol {protocol:?}"),
            )),
        }
    }
}

/// Schema accepting references to records of the described type.
pub fn build_reference_schema(descriptor: &ReferenceDescriptor) -> SchemaNode {
    ast::any()
        .refine(Refinement::Reference(descriptor.clone()))
        .with_reference(descriptor.clone())
}

/// Reference schema for a target object type schema.
pub fn reference_to(target: &SchemaNode) -> Result<SchemaNode> {
    let descriptor = target.object_type().ok_or(SchemaError::NotAnObjectType)?;
    Ok(build_reference_schema(descriptor))
}

/// Acceptance predicate of a reference schema.
pub fn accepts_reference(descriptor: &ReferenceDescriptor, value: &Value) -> bool {
    if descriptor.typename == EXPANDO_TYPENAME {
        return true;
    }
    match value {
        Value::Undefined => true,
        Value::Schema(_) => descriptor.typename == STORED_SCHEMA_TYPENAME,
        Value::Object(object) => object
            .type_reference()
            .is_some_and(|r| r.object_id == descriptor.match_id()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ObjectTypeDescriptor;

    #[test]
    fn test_local_dxn_has_no_host() {
        let dxn = Dxn::parse("dxn:echo:@:01J00").unwrap();
        let reference = Reference::from_dxn(&dxn).unwrap();
        assert_eq!(reference, Reference::new("01J00"));
        assert_eq!(reference.to_dxn().unwrap(), dxn);
    }

    #[test]
    fn test_hosted_round_trip() {
        let reference = Reference::new("01J00").with_host("BA25QRC2");
        let dxn = reference.to_dxn().unwrap();
        assert_eq!(dxn.to_string(), "dxn:echo:BA25QRC2:01J00");
        let back = Reference::from_dxn(&Dxn::parse(&dxn.to_string()).unwrap()).unwrap();
        assert_eq!(back, reference);
    }

    #[test]
    fn test_type_reference_round_trip() {
        let reference = Reference::for_type("example.com/type/Person");
        let dxn = reference.to_dxn().unwrap();
        assert!(dxn.is_type_dxn_of("example.com/type/Person"));
        assert_eq!(Reference::from_dxn(&dxn).unwrap(), reference);
    }

    #[test]
    fn test_unsupported_kind() {
        let dxn = Dxn::parse("dxn:plugin:functions").unwrap();
        assert!(Reference::from_dxn(&dxn).is_err());
    }

    #[test]
    fn test_fields_without_dxn_form_are_rejected() {
        let custom = Reference::new("01J00").with_protocol("custom").with_host("H");
        assert!(matches!(custom.to_dxn(), Err(SchemaError::InvalidDxn { .. })));

        let hosted_type = Reference::for_type("Person").with_host("H");
        assert!(matches!(hosted_type.to_dxn(), Err(SchemaError::InvalidDxn { .. })));
    }

    #[test]
    fn test_object_id_with_colon_is_rejected() {
        assert!(Reference::new("a:b").to_dxn().is_err());
    }

    #[test]
    fn test_reference_to_requires_object_type() {
        assert!(matches!(reference_to(&ast::string()), Err(SchemaError::NotAnObjectType)));

        let target = ast::struct_of(vec![])
            .with_object_type(ObjectTypeDescriptor::new("Person", "0.1.0"));
        let schema = reference_to(&target).unwrap();
        assert_eq!(schema.reference().map(|d| d.typename.as_str()), Some("Person"));
    }

    #[test]
    fn test_expando_accepts_anything() {
        let expando = ObjectTypeDescriptor::new(EXPANDO_TYPENAME, "0.1.0");
        assert!(accepts_reference(&expando, &Value::from("anything")));
        let person = ObjectTypeDescriptor::new("Person", "0.1.0");
        assert!(!accepts_reference(&person, &Value::from("anything")));
        assert!(accepts_reference(&person, &Value::Undefined));
    }
}
