//! Dynamic schemas
//!
//! A [`DynamicSchema`] wraps a persisted [`StoredSchemaRecord`] and keeps a
//! compiled schema tree derived from its portable document. The tree is
//! rebuilt lazily: mutations rewrite the document through the codec and mark
//! the cache dirty, and the next read recompiles it.

use tracing::debug;

use crate::ast::{self, PropertySignature, SchemaNode};
use crate::codec::{from_json_schema, to_json_schema};
use crate::error::{Result, SchemaError};
use crate::object::{StoredSchemaRecord, IDENTITY_FIELD};

/// Runtime-mutable schema over a stored record
#[derive(Debug, Clone)]
pub struct DynamicSchema {
    stored: StoredSchemaRecord,
    cached: Option<SchemaNode>,
    dirty: bool,
}

impl DynamicSchema {
    pub fn new(stored: StoredSchemaRecord) -> Self {
        Self {
            stored,
            cached: None,
            dirty: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.stored.id
    }

    pub fn typename(&self) -> &str {
        &self.stored.typename
    }

    pub fn version(&self) -> &str {
        &self.stored.version
    }

    /// The persisted record, including the current portable document.
    pub fn stored(&self) -> &StoredSchemaRecord {
        &self.stored
    }

    pub fn into_stored(self) -> StoredSchemaRecord {
        self.stored
    }

    /// Force recompilation on the next read.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Compiled schema tree, recompiled from the stored document if dirty.
    pub fn schema(&mut self) -> Result<&SchemaNode> {
        if self.dirty || self.cached.is_none() {
            debug!(typename = %self.stored.typename, "Compiling dynamic schema");
            let compiled = from_json_schema(&self.stored.json_schema, None)?;
            self.cached = Some(compiled);
            self.dirty = false;
        }
        self.cached
            .as_ref()
            .ok_or_else(|| SchemaError::InvalidFormat("schema cache is empty".to_string()))
    }

    /// Declared properties other than the identity field.
    pub fn properties(&mut self) -> Result<Vec<PropertySignature>> {
        Ok(self
            .schema()?
            .property_signatures()
            .iter()
            .filter(|p| p.name != IDENTITY_FIELD)
            .cloned()
            .collect())
    }

    /// Add fields; added fields are optional.
    pub fn add_fields(&mut self, fields: Vec<PropertySignature>) -> Result<()> {
        self.guard_identity(fields.iter().map(|f| f.name.as_str()), "add")?;
        let added = ast::struct_of(fields).partial()?;
        let next = self.schema()?.extend(&added)?;
        self.commit(&next, "add")
    }

    /// Replace fields by name, appending unknown ones; every updated field is
    /// optional.
    pub fn update_fields(&mut self, fields: Vec<PropertySignature>) -> Result<()> {
        self.guard_identity(fields.iter().map(|f| f.name.as_str()), "update")?;
        let mut next = self.schema()?.clone();
        let kind = next.kind_name();
        let literal = match &mut next.kind {
            ast::SchemaKind::Struct(literal) => literal,
            _ => return Err(SchemaError::NotAStruct(format!("update on {kind}"))),
        };
        for mut field in fields {
            field.optional = true;
            literal.upsert(field);
        }
        self.commit(&next, "update")
    }

    /// Remove fields by name; unknown names are ignored.
    pub fn remove_fields<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        self.guard_identity(names.iter().map(|name| name.as_ref()), "remove")?;
        let next = self.schema()?.omit(names)?;
        self.commit(&next, "remove")
    }

    /// Rename a field in place, keeping its position and signature.
    pub fn rename_field(&mut self, before: &str, after: &str) -> Result<()> {
        self.guard_identity([before, after].into_iter(), "rename")?;
        let mut next = self.schema()?.clone();
        let kind = next.kind_name();
        let literal = match &mut next.kind {
            ast::SchemaKind::Struct(literal) => literal,
            _ => return Err(SchemaError::NotAStruct(format!("rename on {kind}"))),
        };
        if before != after && literal.get(after).is_some() {
            return Err(SchemaError::FieldExists(after.to_string()));
        }
        let property = literal
            .properties
            .iter_mut()
            .find(|p| p.name == before)
            .ok_or_else(|| SchemaError::FieldNotFound(before.to_string()))?;
        property.name = after.to_string();
        self.commit(&next, "rename")
    }

    /// Object types keep their identity field as declared.
    fn guard_identity<'a>(
        &mut self,
        mut names: impl Iterator<Item = &'a str>,
        operation: &str,
    ) -> Result<()> {
        let Some(descriptor) = self.schema()?.object_type() else {
            return Ok(());
        };
        if names.any(|name| name == IDENTITY_FIELD) {
            return Err(SchemaError::IdentityField {
                typename: descriptor.typename.clone(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Write a derived tree back into the stored document. The document must
    /// import again, otherwise the stored record is left untouched.
    fn commit(&mut self, next: &SchemaNode, operation: &str) -> Result<()> {
        let document = to_json_schema(next);
        from_json_schema(&document, None)?;
        self.stored.json_schema = document;
        self.invalidate();
        debug!(
            typename = %self.stored.typename,
            operation,
            "Updated dynamic schema document"
        );
        Ok(())
    }
}
