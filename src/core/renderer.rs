//! Type-keyed property renderers
//!
//! Property values attached to an event are passed through the logger's
//! [`RendererMap`] before the record is enriched and dispatched. Lookup is by
//! the value's concrete type; fault values fall back to the map's default fault
//! renderer; anything else is stored as supplied.
//!
//! # Example
//!
//! ```
//! use rust_event_logger::core::property::PropertyValue;
//! use rust_event_logger::core::renderer::RendererMap;
//!
//! struct Money { cents: i64 }
//!
//! let renderers = RendererMap::new()
//!     .with_object_renderer(|m: &Money| format!("${}.{:02}", m.cents / 100, m.cents % 100).into());
//!
//! let rendered = renderers.render(PropertyValue::object(Money { cents: 1250 })).unwrap();
//! assert_eq!(rendered, PropertyValue::from("$12.50"));
//! ```

use super::error::{Fault, Result};
use super::property::PropertyValue;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::error::Error as _;
use std::fmt;
use std::sync::Arc;

/// Converts a property value into its logged representation
pub trait PropertyRenderer: Send + Sync {
    fn render(&self, value: &PropertyValue) -> Result<PropertyValue>;
}

impl<F> PropertyRenderer for F
where
    F: Fn(&PropertyValue) -> Result<PropertyValue> + Send + Sync,
{
    fn render(&self, value: &PropertyValue) -> Result<PropertyValue> {
        self(value)
    }
}

/// Renders a fault and its source chain as `outer: cause: root cause`
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultRenderer;

impl FaultRenderer {
    pub fn render_fault(fault: &Fault) -> String {
        let mut rendered = fault.to_string();
        let mut source = fault.source();
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

impl PropertyRenderer for FaultRenderer {
    fn render(&self, value: &PropertyValue) -> Result<PropertyValue> {
        match value {
            PropertyValue::Fault(fault) => Ok(PropertyValue::String(Self::render_fault(fault))),
            other => Ok(other.clone()),
        }
    }
}

/// Adapter rendering `PropertyValue::Object` values of one concrete type
struct ObjectRenderer<T, F> {
    render: F,
    _marker: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> PropertyRenderer for ObjectRenderer<T, F>
where
    T: Any,
    F: Fn(&T) -> PropertyValue + Send + Sync,
{
    fn render(&self, value: &PropertyValue) -> Result<PropertyValue> {
        match value {
            PropertyValue::Object(object) => match object.downcast_ref::<T>() {
                Some(inner) => Ok((self.render)(inner)),
                None => Ok(value.clone()),
            },
            other => Ok(other.clone()),
        }
    }
}

/// Registry of renderers keyed by value type
#[derive(Clone, Default)]
pub struct RendererMap {
    by_type: HashMap<TypeId, Arc<dyn PropertyRenderer>>,
    fault_renderer: Option<Arc<dyn PropertyRenderer>>,
}

impl RendererMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer for values whose lookup type is `T`
    pub fn register<T: Any>(&mut self, renderer: impl PropertyRenderer + 'static) {
        self.by_type.insert(TypeId::of::<T>(), Arc::new(renderer));
    }

    /// Register a renderer for `PropertyValue::Object` values wrapping a `T`
    pub fn register_object<T, F>(&mut self, render: F)
    where
        T: Any,
        F: Fn(&T) -> PropertyValue + Send + Sync + 'static,
    {
        self.register::<T>(ObjectRenderer {
            render,
            _marker: std::marker::PhantomData,
        });
    }

    #[must_use]
    pub fn with_renderer<T: Any>(mut self, renderer: impl PropertyRenderer + 'static) -> Self {
        self.register::<T>(renderer);
        self
    }

    #[must_use]
    pub fn with_object_renderer<T, F>(mut self, render: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> PropertyValue + Send + Sync + 'static,
    {
        self.register_object::<T, F>(render);
        self
    }

    /// Use `renderer` for fault values with no type-specific renderer
    #[must_use]
    pub fn with_fault_renderer(mut self, renderer: impl PropertyRenderer + 'static) -> Self {
        self.fault_renderer = Some(Arc::new(renderer));
        self
    }

    /// Use [`FaultRenderer`] as the default fault renderer
    #[must_use]
    pub fn with_default_fault_renderer(self) -> Self {
        self.with_fault_renderer(FaultRenderer)
    }

    pub fn get_renderer(&self, type_id: TypeId) -> Option<&dyn PropertyRenderer> {
        self.by_type.get(&type_id).map(|r| r.as_ref())
    }

    pub fn fault_renderer(&self) -> Option<&dyn PropertyRenderer> {
        self.fault_renderer.as_deref()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.fault_renderer.is_none()
    }

    /// Render one value: type-keyed renderer, then fault fallback, then raw
    pub fn render(&self, value: PropertyValue) -> Result<PropertyValue> {
        if let Some(renderer) = self.by_type.get(&value.type_id()) {
            return renderer.render(&value);
        }
        if value.is_fault() {
            if let Some(renderer) = &self.fault_renderer {
                return renderer.render(&value);
            }
        }
        Ok(value)
    }
}

impl fmt::Debug for RendererMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererMap")
            .field("renderers", &self.by_type.len())
            .field("fault_renderer", &self.fault_renderer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoggerError;

    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_unregistered_value_is_stored_raw() {
        let map = RendererMap::new();
        let value = PropertyValue::from(12);
        assert_eq!(map.render(value.clone()).unwrap(), value);
    }

    #[test]
    fn test_object_renderer_by_type() {
        let map = RendererMap::new()
            .with_object_renderer(|p: &Point| format!("({}, {})", p.x, p.y).into());
        let rendered = map.render(PropertyValue::object(Point { x: 1, y: 2 })).unwrap();
        assert_eq!(rendered, PropertyValue::from("(1, 2)"));
        assert!(map.get_renderer(TypeId::of::<Point>()).is_some());
        assert!(map.get_renderer(TypeId::of::<String>()).is_none());
    }

    #[test]
    fn test_primitive_renderer() {
        let map = RendererMap::new().with_renderer::<bool>(|v: &PropertyValue| -> Result<PropertyValue> {
            Ok(if v == &PropertyValue::Bool(true) { "yes" } else { "no" }.into())
        });
        assert_eq!(map.render(true.into()).unwrap(), PropertyValue::from("yes"));
    }

    #[test]
    fn test_fault_falls_back_to_default_fault_renderer() {
        let fault = PropertyValue::fault(Outer(std::io::Error::other("connection reset")));

        let raw = RendererMap::new().render(fault.clone()).unwrap();
        assert!(raw.is_fault());

        let map = RendererMap::new().with_default_fault_renderer();
        let rendered = map.render(fault).unwrap();
        assert_eq!(rendered, PropertyValue::from("request failed: connection reset"));
    }

    #[test]
    fn test_renderer_fault_propagates() {
        let map = RendererMap::new().with_renderer::<i64>(|_: &PropertyValue| -> Result<PropertyValue> {
            Err(LoggerError::other("cannot render"))
        });
        assert!(map.render(PropertyValue::from(1)).is_err());
    }
}
