//! Console writer

use crate::core::{EventRecord, EventWriter, Result, Severity};
use chrono::SecondsFormat;
use colored::Colorize;
use std::io::Write;

/// Line format used by [`ConsoleWriter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleFormat {
    /// `[timestamp] [LEVEL] category source - name key=value ...`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Writes one line per event to stdout, Error and Critical to stderr
///
/// Requires synchronization so lines from concurrent producers never
/// interleave; wrap it with [`WriterHandle::exclusive`](crate::core::WriterHandle::exclusive).
pub struct ConsoleWriter {
    use_colors: bool,
    format: ConsoleFormat,
}

impl ConsoleWriter {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            format: ConsoleFormat::default(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    /// Set the line format
    ///
    /// # Example
    ///
    /// ```
    /// use rust_event_logger::writers::{ConsoleFormat, ConsoleWriter};
    ///
    /// let writer = ConsoleWriter::new().with_format(ConsoleFormat::Json);
    /// ```
    #[must_use]
    pub fn with_format(mut self, format: ConsoleFormat) -> Self {
        self.format = format;
        self
    }

    fn format_text(&self, record: &EventRecord) -> String {
        let severity = if self.use_colors {
            format!("{:8}", record.severity.to_str())
                .color(record.severity.color_code())
                .to_string()
        } else {
            format!("{:8}", record.severity.to_str())
        };

        let timestamp = record
            .timestamp
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();

        let mut line = format!("[{}] [{}]", timestamp, severity);
        if !record.category.is_empty() {
            line.push(' ');
            line.push_str(&record.category);
        }
        if !record.source.is_empty() {
            line.push(' ');
            line.push_str(&record.source);
        }
        line.push_str(" - ");
        line.push_str(&record.name);

        if !record.properties.is_empty() {
            line.push(' ');
            line.push_str(&record.format_properties());
        }
        if let Some(fault) = &record.fault {
            line.push_str(" fault=\"");
            line.push_str(&fault.to_string());
            line.push('"');
        }
        line
    }

    fn format(&self, record: &EventRecord) -> String {
        match self.format {
            ConsoleFormat::Text => self.format_text(record),
            ConsoleFormat::Json => record.to_json().to_string(),
        }
    }
}

impl Default for ConsoleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventWriter for ConsoleWriter {
    fn write(&mut self, record: &EventRecord) -> Result<()> {
        let line = self.format(record);
        match record.severity {
            Severity::Error | Severity::Critical => writeln!(std::io::stderr().lock(), "{}", line)?,
            _ => writeln!(std::io::stdout().lock(), "{}", line)?,
        }
        Ok(())
    }

    fn write_batch(&mut self, records: &[EventRecord]) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        for record in records {
            let line = self.format(record);
            match record.severity {
                Severity::Error | Severity::Critical => writeln!(std::io::stderr().lock(), "{}", line)?,
                _ => writeln!(stdout, "{}", line)?,
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_text_line_layout() {
        let writer = ConsoleWriter::with_colors(false);
        let record = EventRecord::new(Severity::Warning, "disk low")
            .with_category("storage")
            .with_source("node-1")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .with_property("free_mb", 12);

        assert_eq!(
            writer.format(&record),
            "[2024-01-02T03:04:05.000Z] [WARN    ] storage node-1 - disk low free_mb=12"
        );
    }

    #[test]
    fn test_json_line() {
        let writer = ConsoleWriter::new().with_format(ConsoleFormat::Json);
        let line = writer.format(&EventRecord::new(Severity::Error, "boom"));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["severity"], "ERROR");
        assert_eq!(parsed["name"], "boom");
    }

    #[test]
    fn test_write_succeeds() {
        let mut writer = ConsoleWriter::with_colors(false);
        writer.write(&EventRecord::new(Severity::Debug, "console test")).unwrap();
        writer.flush().unwrap();
    }
}
