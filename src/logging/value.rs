//! Argument values accepted by the logger
//!
//! Log calls take a list of [`Value`]s. Scalars are stored inline; maps and arrays
//! live behind a shared [`ObjectRef`] so they keep an identity, can be mutated after
//! the call, and can refer to themselves.

use std::fmt;
use std::sync::{Arc, RwLock};

/// A single log argument
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// A shared map or array
    Object(ObjectRef),
    /// A value that cannot be inspected; only its type name is known
    Opaque(String),
}

impl Value {
    /// Build an opaque placeholder for a type that should not be inspected
    pub fn opaque<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        // Tuples, references, slices and trait objects keep their full name
        let is_path = full
            .chars()
            .next()
            .map_or(false, |c| c.is_alphabetic() || c == '_');
        if !is_path {
            return Value::Opaque(full.to_string());
        }
        // Keep generics intact but drop the module path of the outer type
        let head = full.split('<').next().unwrap_or(full);
        let short = match head.rfind("::") {
            Some(pos) => &full[pos + 2..],
            None => full,
        };
        Value::Opaque(short.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! int_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

int_from!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(Value::Int)
            .unwrap_or(Value::Float(v as f64))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl From<&ObjectRef> for Value {
    fn from(v: &ObjectRef) -> Self {
        Value::Object(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        let array = ObjectRef::array();
        for item in items {
            array.push(item);
        }
        Value::Object(array)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::from(items),
            serde_json::Value::Object(fields) => {
                let map = ObjectRef::map();
                for (key, field) in fields {
                    map.insert(key, field);
                }
                Value::Object(map)
            }
        }
    }
}

/// Which kind of structure an [`ObjectRef`] holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Map,
    Array,
}

impl ObjectKind {
    /// Get the display name for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Map => "Map",
            ObjectKind::Array => "Array",
        }
    }
}

/// Contents of a shared object
#[derive(Debug, Clone)]
pub enum Structure {
    /// Key/value pairs in insertion order
    Map(Vec<(String, Value)>),
    Array(Vec<Value>),
}

/// Shared handle to a map or array
///
/// Clones point at the same object. Two handles are the same object exactly when
/// [`ObjectRef::ptr_eq`] holds, which is what cycle detection keys on.
#[derive(Clone)]
pub struct ObjectRef {
    kind: ObjectKind,
    pub(super) inner: Arc<RwLock<Structure>>,
}

impl ObjectRef {
    /// Create an empty map
    pub fn map() -> Self {
        Self {
            kind: ObjectKind::Map,
            inner: Arc::new(RwLock::new(Structure::Map(Vec::new()))),
        }
    }

    /// Create an empty array
    pub fn array() -> Self {
        Self {
            kind: ObjectKind::Array,
            inner: Arc::new(RwLock::new(Structure::Array(Vec::new()))),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Set a field on a map, replacing an existing field with the same key
    ///
    /// Returns false (and does nothing) when called on an array.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &mut *guard {
            Structure::Map(fields) => {
                if let Some(slot) = fields.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = value;
                } else {
                    fields.push((key, value));
                }
                true
            }
            Structure::Array(_) => false,
        }
    }

    /// Append an element to an array
    ///
    /// Returns false (and does nothing) when called on a map.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &mut *guard {
            Structure::Array(items) => {
                items.push(value);
                true
            }
            Structure::Map(_) => false,
        }
    }

    /// Number of fields or elements
    pub fn len(&self) -> usize {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        match &*guard {
            Structure::Map(fields) => fields.len(),
            Structure::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether two handles refer to the same object
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Address-based identity, stable for the lifetime of the object
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    /// Run `f` over the contents, waiting for any writer to finish
    ///
    /// Returns `Err` when a writer panicked while holding the lock.
    pub(crate) fn read<R>(
        &self,
        f: impl FnOnce(&Structure) -> R,
    ) -> Result<R, std::sync::PoisonError<()>> {
        match self.inner.read() {
            Ok(guard) => Ok(f(&guard)),
            Err(_) => Err(std::sync::PoisonError::new(())),
        }
    }
}

// Contents may contain the object itself, so never recurse here.
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({} @ {:#x})", self.kind.as_str(), self.identity())
    }
}

/// Build a `Vec<Value>` from a list of convertible expressions
///
/// ```
/// use devlog::args;
/// let values = args!["user", 42, true];
/// assert_eq!(values.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::logging::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::logging::Value::from($value)),+]
    };
}
