//! Console sink used for dry runs
//!
//! Prints one line per record: `labels timestamp message metadata`.

use crate::core::{LabelSet, Logger, Metadata, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::io::Write;

#[cfg(feature = "console")]
use crate::core::{labels::LEVEL_LABEL, LogLevel};
#[cfg(feature = "console")]
use colored::Colorize;

pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
    #[cfg_attr(not(feature = "console"), allow(dead_code))]
    use_colors: bool,
}

impl ConsoleSink {
    /// Sink writing to standard output, without colors
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Sink writing to any writer, e.g. a buffer in tests
    ///
    /// # Example
    ///
    /// ```
    /// use rust_log_generator::sinks::ConsoleSink;
    ///
    /// let sink = ConsoleSink::with_writer(Box::new(std::io::sink()));
    /// ```
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            use_colors: false,
        }
    }

    /// Color the `level` value in the label set
    #[cfg(feature = "console")]
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn format_line(
        &self,
        labels: &LabelSet,
        timestamp: DateTime<Utc>,
        message: &str,
        metadata: &Metadata,
    ) -> String {
        format!(
            "{} {} {} {}",
            self.format_labels(labels),
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            message,
            metadata
        )
    }

    #[cfg(feature = "console")]
    fn format_labels(&self, labels: &LabelSet) -> String {
        let rendered = labels.to_string();
        if !self.use_colors {
            return rendered;
        }
        match labels.get(LEVEL_LABEL).and_then(LogLevel::from_label) {
            Some(level) => rendered.color(level.color_code()).to_string(),
            None => rendered,
        }
    }

    #[cfg(not(feature = "console"))]
    fn format_labels(&self, labels: &LabelSet) -> String {
        labels.to_string()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Logger for ConsoleSink {
    fn handle_with_metadata(
        &self,
        labels: &LabelSet,
        timestamp: DateTime<Utc>,
        message: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        let line = self.format_line(labels, timestamp, message, metadata);
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_line_format() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::with_writer(Box::new(buffer.clone()));
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();

        sink.handle_with_metadata(
            &LabelSet::from([("level", "info"), ("service_name", "nginx")]),
            ts,
            "GET /health 200",
            &Metadata::from([("pod", "nginx-7c9f")]),
        )
        .unwrap();
        sink.handle(&LabelSet::new(), ts, "bare").unwrap();

        let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            r#"{level="info", service_name="nginx"} 2024-06-01T12:30:00.000Z GET /health 200 [pod="nginx-7c9f"]"#
        );
        assert_eq!(lines[1], "{} 2024-06-01T12:30:00.000Z bare []");
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colors_keep_content() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::with_writer(Box::new(buffer.clone())).with_colors(true);

        sink.handle(&LabelSet::from([("level", "error")]), Utc::now(), "boom")
            .unwrap();

        let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert!(output.contains("level"));
        assert!(output.contains("boom"));
    }
}
