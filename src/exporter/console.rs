//! Console exporter

use eyre::{Context, Result};
use std::io::{self, Write};

use super::Exporter;
use crate::config::{ConsoleFormat, ConsoleStream, ExporterArgs};
use crate::event::EventRecord;

pub struct ConsoleExporter {
    writer: Box<dyn Write + Send>,
    format: ConsoleFormat,
}

impl ConsoleExporter {
    pub fn from_args(args: &ExporterArgs) -> Self {
        let writer: Box<dyn Write + Send> = match args.stream {
            ConsoleStream::Stdout => Box::new(io::stdout()),
            ConsoleStream::Stderr => Box::new(io::stderr()),
        };
        Self::with_writer(writer, args.format)
    }

    pub fn with_writer(writer: Box<dyn Write + Send>, format: ConsoleFormat) -> Self {
        Self { writer, format }
    }
}

impl Exporter for ConsoleExporter {
    fn send(&mut self, record: &EventRecord) -> Result<()> {
        let line = match self.format {
            ConsoleFormat::Json => record.to_json_line().context("Failed to serialize record")?,
            ConsoleFormat::Pretty => record.format_display(),
        };
        writeln!(self.writer, "{}", line).context("Failed to write to console")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush console")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Operation;
    use crate::exporter::testing::SharedBuffer;
    use crate::session::SessionContext;

    fn record() -> EventRecord {
        let session = SessionContext::new("m", "local", true, vec!["file".to_string()]);
        EventRecord::new("saveTextDocument", Operation::Save, &session)
            .with_resource("file:///a.rs", 1)
            .with_content("body")
    }

    #[test]
    fn test_json_line_output() {
        let buffer = SharedBuffer::default();
        let mut exporter = ConsoleExporter::with_writer(Box::new(buffer.clone()), ConsoleFormat::Json);
        exporter.send(&record()).unwrap();
        exporter.send(&record()).unwrap();

        let output = buffer.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["eventName"], "saveTextDocument");
        assert_eq!(value["content"], "body");
    }

    #[test]
    fn test_pretty_output() {
        let buffer = SharedBuffer::default();
        let mut exporter = ConsoleExporter::with_writer(Box::new(buffer.clone()), ConsoleFormat::Pretty);
        exporter.send(&record()).unwrap();

        let output = buffer.contents();
        assert!(output.contains("saveTextDocument"));
        assert!(output.contains("file:///a.rs"));
        assert!(output.ends_with('\n'));
    }
}
