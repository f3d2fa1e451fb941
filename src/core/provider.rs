//! Context providers that enrich records before dispatch
//!
//! Providers run in registration order after a record has been populated. A
//! provider may carry its own [`EventFilter`]; when that filter rejects the
//! record the provider is skipped, but the record continues down the pipeline.

use super::context::LoggerContext;
use super::error::Result;
use super::event_record::EventRecord;
use super::filter::EventFilter;
use super::property::{Properties, PropertyValue};
use super::renderer::RendererMap;
use std::fmt;

pub trait ContextProvider: Send + Sync {
    /// Filter deciding whether this provider runs for a record
    fn filter(&self) -> Option<&dyn EventFilter> {
        None
    }

    /// Add properties to `record`, rendering values through `renderers`
    fn add_properties(&self, record: &mut EventRecord, renderers: &RendererMap) -> Result<()>;
}

impl<F> ContextProvider for F
where
    F: Fn(&mut EventRecord, &RendererMap) -> Result<()> + Send + Sync,
{
    fn add_properties(&self, record: &mut EventRecord, renderers: &RendererMap) -> Result<()> {
        self(record, renderers)
    }
}

fn insert_rendered(
    record: &mut EventRecord,
    renderers: &RendererMap,
    key: &str,
    value: &PropertyValue,
    overwrite: bool,
) -> Result<()> {
    if !overwrite && record.properties.contains_key(key) {
        return Ok(());
    }
    let rendered = renderers.render(value.clone())?;
    record.properties.insert(key.to_string(), rendered);
    Ok(())
}

/// Adds a fixed set of properties to every record
///
/// Used by child loggers and job loggers to tag everything they write. Keys the
/// caller already set on the event are left alone unless
/// [`overwrite`](Self::overwrite) is enabled.
pub struct StaticPropertiesProvider {
    properties: Properties,
    overwrite: bool,
    filter: Option<Box<dyn EventFilter>>,
}

impl StaticPropertiesProvider {
    pub fn new() -> Self {
        Self {
            properties: Properties::new(),
            overwrite: false,
            filter: None,
        }
    }

    pub fn from_properties(properties: Properties) -> Self {
        Self {
            properties,
            ..Self::new()
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Replace values the caller already set under the same key
    #[must_use = "builder methods return a new value"]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_filter(mut self, filter: impl EventFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

impl Default for StaticPropertiesProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextProvider for StaticPropertiesProvider {
    fn filter(&self) -> Option<&dyn EventFilter> {
        self.filter.as_deref()
    }

    fn add_properties(&self, record: &mut EventRecord, renderers: &RendererMap) -> Result<()> {
        for (key, value) in &self.properties {
            insert_rendered(record, renderers, key, value, self.overwrite)?;
        }
        Ok(())
    }
}

impl fmt::Debug for StaticPropertiesProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticPropertiesProvider")
            .field("properties", &self.properties)
            .field("overwrite", &self.overwrite)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// Adds the current fields of a [`LoggerContext`] to every record
///
/// # Example
///
/// ```
/// use rust_event_logger::prelude::*;
///
/// let ctx = LoggerContext::new();
/// ctx.set("service", "billing");
///
/// let memory = MemoryWriter::new();
/// let logger = Logger::builder()
///     .writer(WriterHandle::concurrent(memory.clone()))
///     .context_provider(ContextPropertiesProvider::new(ctx.clone()))
///     .build()
///     .unwrap();
///
/// logger.information("invoice issued").unwrap();
/// assert_eq!(
///     memory.records()[0].property("service"),
///     Some(&PropertyValue::from("billing"))
/// );
/// ```
pub struct ContextPropertiesProvider {
    context: LoggerContext,
    filter: Option<Box<dyn EventFilter>>,
}

impl ContextPropertiesProvider {
    pub fn new(context: LoggerContext) -> Self {
        Self {
            context,
            filter: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_filter(mut self, filter: impl EventFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn context(&self) -> &LoggerContext {
        &self.context
    }
}

impl ContextProvider for ContextPropertiesProvider {
    fn filter(&self) -> Option<&dyn EventFilter> {
        self.filter.as_deref()
    }

    fn add_properties(&self, record: &mut EventRecord, renderers: &RendererMap) -> Result<()> {
        self.context
            .for_each(|key, value| insert_rendered(record, renderers, key, value, false))
    }
}

impl fmt::Debug for ContextPropertiesProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPropertiesProvider")
            .field("context", &self.context)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
