//! DXN: canonical resource names
//!
//! A DXN unambiguously names a resource such as an Echo record or a schema
//! type. It starts with the `dxn` prefix followed by a resource kind; `:`
//! delimits parts. `@` in place of the space key means "resolve in the local
//! space".
//!
//! ```text
//! dxn:echo:<space key>:<object id>
//! dxn:echo:BA25QRC2FEWCSAMRP4RZL65LWJ7352CKE:01J00J9B45YHYSGZQTQMSKMGJ6
//! dxn:echo:@:01J00J9B45YHYSGZQTQMSKMGJ6
//! dxn:type:example.com/type/Calendar
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchemaError};

/// Marker for "the current space" in place of a host.
pub const LOCAL_SPACE_TAG: &str = "@";

const PREFIX: &str = "dxn";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dxn {
    kind: String,
    parts: Vec<String>,
}

impl Dxn {
    /// Echo record: `[host | @, object id]`
    pub const ECHO: &'static str = "echo";
    /// Schema type: `[typename]`
    pub const TYPE: &'static str = "type";

    /// Build a DXN, validating parts and the per-kind part count.
    pub fn new(kind: impl Into<String>, parts: Vec<String>) -> Result<Self> {
        let kind = kind.into();
        let display = || format!("{PREFIX}:{kind}:{}", parts.join(":"));
        if kind.is_empty() || kind.contains(':') {
            return Err(SchemaError::invalid_dxn(&display(), "invalid kind"));
        }
        if parts.is_empty() {
            return Err(SchemaError::invalid_dxn(&display(), "no parts"));
        }
        if let Some(part) = parts.iter().find(|p| p.is_empty() || p.contains(':')) {
            return Err(SchemaError::invalid_dxn(
                &display(),
                format!("invalid part {part:?}"),
            ));
        }

        let expected = match kind.as_str() {
            Self::ECHO => Some(2),
            Self::TYPE => Some(1),
            _ => None,
        };
        if let Some(expected) = expected {
            if parts.len() != expected {
                return Err(SchemaError::invalid_dxn(
                    &display(),
                    format!("{kind} takes {expected} part(s), got {}", parts.len()),
                ));
            }
        }

        Ok(Self { kind, parts })
    }

    /// Parse the canonical string form.
    pub fn parse(input: &str) -> Result<Self> {
        let mut segments = input.split(':');
        if segments.next() != Some(PREFIX) {
            return Err(SchemaError::invalid_dxn(input, "missing dxn prefix"));
        }
        let kind = match segments.next() {
            Some(kind) if !kind.is_empty() => kind,
            _ => return Err(SchemaError::invalid_dxn(input, "empty kind")),
        };
        let parts: Vec<String> = segments.map(String::from).collect();
        Self::new(kind, parts).map_err(|e| match e {
            SchemaError::InvalidDxn { reason, .. } => SchemaError::invalid_dxn(input, reason),
            other => other,
        })
    }

    /// DXN of a schema type.
    pub fn type_of(typename: &str) -> Result<Self> {
        Self::new(Self::TYPE, vec![typename.to_string()])
    }

    /// DXN of an Echo record; `None` host means the local space.
    pub fn echo(host: Option<&str>, object_id: &str) -> Result<Self> {
        Self::new(
            Self::ECHO,
            vec![
                host.unwrap_or(LOCAL_SPACE_TAG).to_string(),
                object_id.to_string(),
            ],
        )
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Whether this is `dxn:type:<typename>`.
    pub fn is_type_dxn_of(&self, typename: &str) -> bool {
        self.kind == Self::TYPE && self.parts.len() == 1 && self.parts[0] == typename
    }
}

impl fmt::Display for Dxn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}:{}:{}", self.kind, self.parts.join(":"))
    }
}

impl FromStr for Dxn {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Dxn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dxn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_echo() {
        let dxn = Dxn::parse("dxn:echo:@:01J00").unwrap();
        assert_eq!(dxn.kind(), Dxn::ECHO);
        assert_eq!(dxn.parts(), &["@".to_string(), "01J00".to_string()]);
        assert_eq!(dxn.to_string(), "dxn:echo:@:01J00");
    }

    #[test]
    fn test_round_trip() {
        for name in [
            "dxn:echo:BA25QRC2FEWCSAMRP4RZL65LWJ7352CKE:01J00J9B45YHYSGZQTQMSKMGJ6",
            "dxn:type:example.com/type/Calendar",
            "dxn:plugin:/agent/plugin/functions",
            "dxn:custom:a:b:c",
        ] {
            assert_eq!(Dxn::parse(name).unwrap().to_string(), name);
        }
    }

    #[test]
    fn test_malformed() {
        for name in [
            "",
            "urn:echo:@:01J00",
            "dxn::@:01J00",
            "dxn:echo",
            "dxn:echo:01J00",
            "dxn:echo:@:01J00:extra",
            "dxn:type:a:b",
            "dxn:echo:@:",
            "dxn:type",
        ] {
            assert!(
                matches!(Dxn::parse(name), Err(SchemaError::InvalidDxn { .. })),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn test_construction_validates_parts() {
        assert!(Dxn::new(Dxn::TYPE, vec!["a:b".to_string()]).is_err());
        assert!(Dxn::new(Dxn::ECHO, vec!["@".to_string()]).is_err());
        assert!(Dxn::type_of("Person").unwrap().is_type_dxn_of("Person"));
        assert!(!Dxn::echo(None, "01J00").unwrap().is_type_dxn_of("01J00"));
    }

    #[test]
    fn test_serde_as_string() {
        let dxn = Dxn::parse("dxn:type:Person").unwrap();
        let json = serde_json::to_value(&dxn).unwrap();
        assert_eq!(json, serde_json::json!("dxn:type:Person"));
        let back: Dxn = serde_json::from_value(json).unwrap();
        assert_eq!(back, dxn);
        assert!(serde_json::from_value::<Dxn>(serde_json::json!("dxn:type")).is_err());
    }
}
