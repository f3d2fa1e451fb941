//! Explicit ambient properties shared across calls
//!
//! A [`LoggerContext`] holds properties that should be attached to every event
//! a logger writes (service name, request id, tenant). It is consumed by
//! [`ContextPropertiesProvider`](super::provider::ContextPropertiesProvider).
//! Nothing propagates implicitly between threads: take a [`snapshot`] and move
//! it into spawned work when the values should follow.
//!
//! [`snapshot`]: LoggerContext::snapshot

use super::property::{Properties, PropertyValue};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Thread-safe, clonable bag of context properties
///
/// Clones share the same underlying map.
///
/// # Example
///
/// ```
/// use rust_event_logger::core::context::LoggerContext;
///
/// let ctx = LoggerContext::new();
/// ctx.set("service", "api-gateway");
/// ctx.set("version", "1.2.3");
///
/// {
///     let _guard = ctx.scoped("request_id", "abc-123");
///     assert_eq!(ctx.len(), 3);
/// }
/// assert_eq!(ctx.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggerContext {
    fields: Arc<RwLock<HashMap<String, PropertyValue>>>,
}

impl LoggerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, overwriting any previous value
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        self.fields.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        self.fields.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<PropertyValue> {
        self.fields.write().remove(key)
    }

    pub fn clear(&self) {
        self.fields.write().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    /// Copy of the current fields
    pub fn fields(&self) -> Properties {
        self.fields.read().clone()
    }

    /// Independent context holding a copy of the current fields
    ///
    /// Later changes to either context are not seen by the other.
    pub fn snapshot(&self) -> LoggerContext {
        LoggerContext {
            fields: Arc::new(RwLock::new(self.fields())),
        }
    }

    /// Set a field for the lifetime of the returned guard
    ///
    /// Dropping the guard restores the previous value, or removes the field if
    /// there was none.
    pub fn scoped<K, V>(&self, key: K, value: V) -> ContextGuard
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let key = key.into();
        let previous = self.fields.write().insert(key.clone(), value.into());
        ContextGuard {
            fields: Arc::clone(&self.fields),
            key,
            previous,
        }
    }

    /// Insert context fields into `properties` without overwriting existing keys
    pub fn merge_into(&self, properties: &mut Properties) {
        let fields = self.fields.read();
        for (key, value) in fields.iter() {
            if !properties.contains_key(key) {
                properties.insert(key.clone(), value.clone());
            }
        }
    }

    /// Visit each field under the read lock
    pub(crate) fn for_each<F>(&self, mut visit: F) -> super::error::Result<()>
    where
        F: FnMut(&str, &PropertyValue) -> super::error::Result<()>,
    {
        let fields = self.fields.read();
        for (key, value) in fields.iter() {
            visit(key, value)?;
        }
        Ok(())
    }
}

/// RAII guard for a scoped context field
#[must_use = "the field is removed as soon as the guard is dropped"]
pub struct ContextGuard {
    fields: Arc<RwLock<HashMap<String, PropertyValue>>>,
    key: String,
    previous: Option<PropertyValue>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let mut fields = self.fields.write();
        match self.previous.take() {
            Some(previous) => {
                fields.insert(std::mem::take(&mut self.key), previous);
            }
            None => {
                fields.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let ctx = LoggerContext::new();
        ctx.set("service", "api");
        ctx.set("port", 8080);

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get("service"), Some(PropertyValue::from("api")));
        assert_eq!(ctx.remove("service"), Some(PropertyValue::from("api")));
        assert!(ctx.get("service").is_none());

        ctx.clear();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_clones_share_fields() {
        let ctx = LoggerContext::new();
        let clone = ctx.clone();
        clone.set("region", "eu-west-1");
        assert_eq!(ctx.get("region"), Some(PropertyValue::from("eu-west-1")));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let ctx = LoggerContext::new();
        ctx.set("request_id", "r-1");

        let snapshot = ctx.snapshot();
        ctx.set("request_id", "r-2");
        snapshot.set("worker", 3);

        assert_eq!(snapshot.get("request_id"), Some(PropertyValue::from("r-1")));
        assert!(ctx.get("worker").is_none());
    }

    #[test]
    fn test_scoped_guard_restores_previous_value() {
        let ctx = LoggerContext::new();
        ctx.set("user", "outer");
        {
            let _guard = ctx.scoped("user", "inner");
            assert_eq!(ctx.get("user"), Some(PropertyValue::from("inner")));
        }
        assert_eq!(ctx.get("user"), Some(PropertyValue::from("outer")));

        {
            let _guard = ctx.scoped("trace", true);
            assert!(ctx.get("trace").is_some());
        }
        assert!(ctx.get("trace").is_none());
    }

    #[test]
    fn test_merge_keeps_existing_keys() {
        let ctx = LoggerContext::new();
        ctx.set("key", "context");
        ctx.set("service", "api");

        let mut properties = Properties::new();
        properties.insert("key".to_string(), "event".into());
        ctx.merge_into(&mut properties);

        assert_eq!(properties.len(), 2);
        assert_eq!(properties["key"], PropertyValue::from("event"));
    }
}
