//! Reactive objects
//!
//! A [`ReactiveObject`] wraps a live record with a replaceable
//! [`ReactiveHandler`]. The wrapper is created once and shared by every holder
//! of the record; attaching, replacing or detaching the handler never changes
//! its identity, so a record can be used before its store/change-tracking
//! behavior is known.
//!
//! Every access goes through the handler slot:
//!
//! ```text
//! object.get("name")
//!   └─ slot.handler?
//!        ├─ Some(h) -> h.get(object, "name")   (default: raw field access)
//!        └─ None    -> raw field access
//! ```

use serde_json::Value as Json;
use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::annotation::ObjectTypeDescriptor;
use crate::ast::SchemaNode;
use crate::reference::Reference;
use crate::value::Value;

/// Free-form per-instance metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMeta {
    pub entries: serde_json::Map<String, Json>,
}

/// Access-handling behavior attached to reactive objects.
///
/// The capability methods have no default. Trap methods default to raw access
/// on the target; override only the ones that need custom behavior. Trap
/// implementations must use the `raw_*` accessors of the target, not the
/// trapped ones.
pub trait ReactiveHandler {
    /// Called when the handler is attached to an object.
    fn init(&self, target: &ReactiveObject);

    fn is_deleted(&self, target: &ReactiveObject) -> bool;

    fn schema(&self, target: &ReactiveObject) -> Option<SchemaNode>;

    /// Type of the object. Stored with every object even when the schema
    /// has not been registered yet.
    fn type_reference(&self, target: &ReactiveObject) -> Option<Reference>;

    fn meta(&self, target: &ReactiveObject) -> ObjectMeta;

    fn get(&self, target: &ReactiveObject, key: &str) -> Option<Value> {
        target.raw_get(key)
    }

    fn set(&self, target: &ReactiveObject, key: &str, value: Value) -> bool {
        target.raw_set(key, value);
        true
    }

    fn delete(&self, target: &ReactiveObject, key: &str) -> bool {
        target.raw_delete(key)
    }

    fn has(&self, target: &ReactiveObject, key: &str) -> bool {
        target.raw_has(key)
    }

    fn keys(&self, target: &ReactiveObject) -> Vec<String> {
        target.raw_keys()
    }
}

/// Mutable slot for the current handler.
#[derive(Default, Clone)]
pub struct HandlerSlot {
    pub handler: Option<Rc<dyn ReactiveHandler>>,
}

impl HandlerSlot {
    pub fn is_attached(&self) -> bool {
        self.handler.is_some()
    }
}

struct Inner {
    fields: RefCell<BTreeMap<String, Value>>,
    slot: RefCell<HandlerSlot>,
}

/// Identity-preserving wrapper around a live record.
#[derive(Clone)]
pub struct ReactiveObject {
    inner: Rc<Inner>,
}

/// Non-owning handle, for handlers that keep per-object state.
#[derive(Clone)]
pub struct WeakReactiveObject {
    inner: Weak<Inner>,
}

impl WeakReactiveObject {
    pub fn upgrade(&self) -> Option<ReactiveObject> {
        self.inner.upgrade().map(|inner| ReactiveObject { inner })
    }
}

impl ReactiveObject {
    /// Wrap a record with no handler (pass-through).
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self {
            inner: Rc::new(Inner {
                fields: RefCell::new(fields),
                slot: RefCell::new(HandlerSlot::default()),
            }),
        }
    }

    /// Wrap a JSON object; non-object JSON yields an empty record.
    pub fn from_json(json: &Json) -> Self {
        let fields = match Value::from(json) {
            Value::Map(fields) => fields,
            _ => BTreeMap::new(),
        };
        Self::new(fields)
    }

    /// Attach or replace the handler; last write wins. Calls
    /// [`ReactiveHandler::init`].
    pub fn attach_handler(&self, handler: Rc<dyn ReactiveHandler>) {
        self.inner.slot.borrow_mut().handler = Some(handler.clone());
        handler.init(self);
    }

    /// Detach the handler, returning to pass-through behavior.
    pub fn detach_handler(&self) -> Option<Rc<dyn ReactiveHandler>> {
        self.inner.slot.borrow_mut().handler.take()
    }

    pub fn handler(&self) -> Option<Rc<dyn ReactiveHandler>> {
        self.inner.slot.borrow().handler.clone()
    }

    /// Introspection path to the handler slot, independent of the handler.
    pub fn slot(&self) -> Ref<'_, HandlerSlot> {
        self.inner.slot.borrow()
    }

    /// Whether both handles are the same wrapper.
    pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakReactiveObject {
        WeakReactiveObject {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        match self.handler() {
            Some(handler) => handler.get(self, key),
            None => self.raw_get(key),
        }
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        match self.handler() {
            Some(handler) => handler.set(self, key, value),
            None => {
                self.raw_set(key, value);
                true
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        match self.handler() {
            Some(handler) => handler.delete(self, key),
            None => self.raw_delete(key),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        match self.handler() {
            Some(handler) => handler.has(self, key),
            None => self.raw_has(key),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match self.handler() {
            Some(handler) => handler.keys(self),
            None => self.raw_keys(),
        }
    }

    /// Logically deleted; objects without a handler never are.
    pub fn is_deleted(&self) -> bool {
        self.handler().is_some_and(|h| h.is_deleted(self))
    }

    pub fn schema(&self) -> Option<SchemaNode> {
        self.handler().and_then(|h| h.schema(self))
    }

    pub fn type_reference(&self) -> Option<Reference> {
        self.handler().and_then(|h| h.type_reference(self))
    }

    pub fn meta(&self) -> ObjectMeta {
        self.handler().map(|h| h.meta(self)).unwrap_or_default()
    }

    pub fn raw_get(&self, key: &str) -> Option<Value> {
        self.inner.fields.borrow().get(key).cloned()
    }

    pub fn raw_set(&self, key: &str, value: Value) {
        self.inner.fields.borrow_mut().insert(key.to_string(), value);
    }

    pub fn raw_delete(&self, key: &str) -> bool {
        self.inner.fields.borrow_mut().remove(key).is_some()
    }

    pub fn raw_has(&self, key: &str) -> bool {
        self.inner.fields.borrow().contains_key(key)
    }

    pub fn raw_keys(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }
}

impl PartialEq for ReactiveObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveObject")
            .field("keys", &self.raw_keys())
            .field("handler", &self.slot().is_attached())
            .finish()
    }
}

/// Whether a value is a record behind a reactive wrapper.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Object(_))
}

/// Schema of a value, if it is a reactive object with a handler that knows it.
pub fn schema_of(value: &Value) -> Option<SchemaNode> {
    match value {
        Value::Object(object) => object.schema(),
        _ => None,
    }
}

/// Resolved type reference of a value.
pub fn type_reference_of_object(value: &Value) -> Option<Reference> {
    match value {
        Value::Object(object) => object.type_reference(),
        _ => None,
    }
}

/// Whether a value is a reactive object of the given type.
pub fn is_instance_of(value: &Value, descriptor: &ObjectTypeDescriptor) -> bool {
    type_reference_of_object(value).is_some_and(|r| r.object_id == descriptor.match_id())
}
