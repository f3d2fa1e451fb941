//! Property values carried by event records
//!
//! Callers attach properties as [`PropertyValue`]s. Primitive values are stored
//! as they are; [`PropertyValue::Object`] and [`PropertyValue::Fault`] carry
//! arbitrary values that the logger's renderer map may turn into a printable
//! representation before the record reaches a writer.

use super::error::Fault;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Property map of an event record
pub type Properties = HashMap<String, PropertyValue>;

/// An opaque caller value, keyed by its concrete type for renderer lookup
#[derive(Clone)]
pub struct ObjectValue {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl ObjectValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// Concrete type of the wrapped value
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object<{}>", self.type_name)
    }
}

/// Value type for event properties
#[derive(Clone)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    Null,
    /// A fault value; rendered by the default fault renderer when one is configured
    Fault(Fault),
    /// Any other value; rendered by a renderer registered for its type
    Object(ObjectValue),
}

impl PropertyValue {
    /// Wrap an arbitrary value for type-keyed rendering
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        PropertyValue::Object(ObjectValue::new(value))
    }

    /// Wrap an error as a fault property
    pub fn fault<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        PropertyValue::Fault(Arc::new(error))
    }

    /// Type used for renderer lookup
    pub fn type_id(&self) -> TypeId {
        match self {
            PropertyValue::String(_) => TypeId::of::<String>(),
            PropertyValue::Int(_) => TypeId::of::<i64>(),
            PropertyValue::Float(_) => TypeId::of::<f64>(),
            PropertyValue::Bool(_) => TypeId::of::<bool>(),
            PropertyValue::Duration(_) => TypeId::of::<Duration>(),
            PropertyValue::Null => TypeId::of::<()>(),
            PropertyValue::Fault(_) => TypeId::of::<Fault>(),
            PropertyValue::Object(object) => object.type_id(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, PropertyValue::Fault(_))
    }

    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Int(i) => serde_json::Value::Number((*i).into()),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Duration(d) => {
                serde_json::Number::from_f64(d.as_secs_f64() * 1000.0)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
            PropertyValue::Null => serde_json::Value::Null,
            PropertyValue::Fault(_) | PropertyValue::Object(_) => {
                serde_json::Value::String(self.to_string())
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Duration(d) => write!(f, "{:?}", d),
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Fault(fault) => write!(f, "{}", fault),
            PropertyValue::Object(object) => write!(f, "<{}>", object.type_name()),
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.debug_tuple("String").field(s).finish(),
            PropertyValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            PropertyValue::Float(fl) => f.debug_tuple("Float").field(fl).finish(),
            PropertyValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            PropertyValue::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            PropertyValue::Null => f.write_str("Null"),
            PropertyValue::Fault(fault) => f.debug_tuple("Fault").field(&fault.to_string()).finish(),
            PropertyValue::Object(object) => object.fmt(f),
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::String(a), PropertyValue::String(b)) => a == b,
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a == b,
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a == b,
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
            (PropertyValue::Duration(a), PropertyValue::Duration(b)) => a == b,
            (PropertyValue::Null, PropertyValue::Null) => true,
            (PropertyValue::Fault(a), PropertyValue::Fault(b)) => Arc::ptr_eq(a, b),
            (PropertyValue::Object(a), PropertyValue::Object(b)) => Arc::ptr_eq(&a.value, &b.value),
            _ => false,
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Int(i as i64)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        PropertyValue::Int(i as i64)
    }
}

impl From<usize> for PropertyValue {
    fn from(i: usize) -> Self {
        PropertyValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<Duration> for PropertyValue {
    fn from(d: Duration) -> Self {
        PropertyValue::Duration(d)
    }
}

impl From<Fault> for PropertyValue {
    fn from(fault: Fault) -> Self {
        PropertyValue::Fault(fault)
    }
}
