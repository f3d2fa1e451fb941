//! Event record structure

use super::error::Fault;
use super::pool::Recyclable;
use super::property::{Properties, PropertyValue};
use super::severity::Severity;
use chrono::{DateTime, Utc};

/// A single structured log event.
///
/// Records are pooled by the logger: the same instance is cleared and refilled
/// for many events, so `set_*` methods reuse the existing string buffers and
/// property map capacity.
#[derive(Debug, Clone, Default)]
pub struct EventRecord {
    pub name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub severity: Severity,
    pub category: String,
    pub source: String,
    pub source_method: Option<String>,
    pub source_line: Option<u32>,
    pub properties: Properties,
    pub fault: Option<Fault>,
}

impl EventRecord {
    pub fn new(severity: Severity, name: &str) -> Self {
        let mut record = Self {
            severity,
            ..Default::default()
        };
        record.set_name(name);
        record
    }

    /// Set the event name, escaping line breaks and tabs.
    ///
    /// Prevents a caller-controlled name from forging extra lines in
    /// line-oriented destinations.
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for ch in name.chars() {
            match ch {
                '\n' => self.name.push_str("\\n"),
                '\r' => self.name.push_str("\\r"),
                '\t' => self.name.push_str("\\t"),
                _ => self.name.push(ch),
            }
        }
    }

    pub fn set_category(&mut self, category: &str) {
        self.category.clear();
        self.category.push_str(category);
    }

    pub fn set_source(&mut self, source: &str) {
        self.source.clear();
        self.source.push_str(source);
    }

    pub fn set_source_method(&mut self, method: Option<&str>) {
        match (method, self.source_method.as_mut()) {
            (Some(method), Some(existing)) => {
                existing.clear();
                existing.push_str(method);
            }
            (Some(method), None) => self.source_method = Some(method.to_string()),
            (None, _) => self.source_method = None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: &str) -> Self {
        self.set_category(category);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: &str) -> Self {
        self.set_source(source);
        self
    }

    #[must_use]
    pub fn with_location(mut self, method: &str, line: u32) -> Self {
        self.source_method = Some(method.to_string());
        self.source_line = Some(line);
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Reset every field, keeping allocated capacity for reuse
    pub fn clear(&mut self) {
        self.name.clear();
        self.timestamp = None;
        self.severity = Severity::default();
        self.category.clear();
        self.source.clear();
        self.source_method = None;
        self.source_line = None;
        self.properties.clear();
        self.fault = None;
    }

    /// Overwrite this record with the contents of `other`
    pub fn copy_from(&mut self, other: &EventRecord) {
        self.name.clone_from(&other.name);
        self.timestamp = other.timestamp;
        self.severity = other.severity;
        self.category.clone_from(&other.category);
        self.source.clone_from(&other.source);
        self.source_method.clone_from(&other.source_method);
        self.source_line = other.source_line;
        self.properties.clone_from(&other.properties);
        self.fault.clone_from(&other.fault);
    }

    /// Format properties as key=value pairs, sorted by key
    pub fn format_properties(&self) -> String {
        let mut pairs: Vec<_> = self.properties.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serialize to a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json_value()))
            .collect();

        serde_json::json!({
            "name": self.name,
            "timestamp": self.timestamp.map(|ts| ts.to_rfc3339()),
            "severity": self.severity.to_str(),
            "category": self.category,
            "source": self.source,
            "source_method": self.source_method,
            "source_line": self.source_line,
            "properties": properties,
            "fault": self.fault.as_ref().map(|f| f.to_string()),
        })
    }
}

impl Recyclable for EventRecord {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_name_sanitization() {
        let record = EventRecord::new(Severity::Information, "login\nERROR fake\tentry\r");
        assert_eq!(record.name, "login\\nERROR fake\\tentry\\r");
        assert!(!record.name.contains('\n'));
    }

    #[test]
    fn test_clear_resets_fields_and_keeps_capacity() {
        let mut record = EventRecord::new(Severity::Error, "request failed")
            .with_category("http")
            .with_source("gateway")
            .with_location("handle", 42)
            .with_property("status", 500)
            .with_fault(Arc::new(std::io::Error::other("timeout")));

        let capacity = record.properties.capacity();
        record.clear();

        assert!(record.name.is_empty());
        assert!(record.category.is_empty());
        assert!(record.source.is_empty());
        assert!(record.source_method.is_none());
        assert!(record.source_line.is_none());
        assert!(record.fault.is_none());
        assert!(record.timestamp.is_none());
        assert_eq!(record.severity, Severity::Information);
        assert!(record.properties.is_empty());
        assert_eq!(record.properties.capacity(), capacity);
    }

    #[test]
    fn test_copy_from_is_independent() {
        let original = EventRecord::new(Severity::Warning, "disk low").with_property("free_mb", 12);
        let mut copy = EventRecord::default();
        copy.copy_from(&original);
        copy.set_property("free_mb", 10);

        assert_eq!(copy.name, "disk low");
        assert_eq!(copy.severity, Severity::Warning);
        assert_eq!(original.property("free_mb"), Some(&PropertyValue::Int(12)));
        assert_eq!(copy.property("free_mb"), Some(&PropertyValue::Int(10)));
    }

    #[test]
    fn test_format_properties_sorted() {
        let record = EventRecord::new(Severity::Debug, "x")
            .with_property("b", 2)
            .with_property("a", "one");
        assert_eq!(record.format_properties(), "a=one b=2");
    }

    #[test]
    fn test_to_json() {
        let record = EventRecord::new(Severity::Error, "db error")
            .with_category("storage")
            .with_property("code", 7);
        let json = record.to_json();
        assert_eq!(json["name"], "db error");
        assert_eq!(json["severity"], "ERROR");
        assert_eq!(json["category"], "storage");
        assert_eq!(json["properties"]["code"], 7);
        assert!(json["fault"].is_null());
    }
}
