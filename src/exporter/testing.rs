//! Test doubles for exporters

use eyre::Result;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use super::Exporter;
use crate::event::EventRecord;

pub type Received = Arc<Mutex<Vec<EventRecord>>>;

/// Keeps every record it is sent
pub struct RecordingExporter {
    received: Received,
}

impl RecordingExporter {
    pub fn new() -> (Self, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                received: Arc::clone(&received),
            },
            received,
        )
    }
}

impl Exporter for RecordingExporter {
    fn send(&mut self, record: &EventRecord) -> Result<()> {
        self.received.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Always fails to deliver
pub struct FailingExporter;

impl Exporter for FailingExporter {
    fn send(&mut self, _record: &EventRecord) -> Result<()> {
        eyre::bail!("connection refused")
    }
}

/// Panics on every delivery
pub struct PanickingExporter;

impl Exporter for PanickingExporter {
    fn send(&mut self, _record: &EventRecord) -> Result<()> {
        panic!("sink exploded")
    }
}

/// In-memory writer whose contents stay readable after it is moved into an exporter
#[derive(Clone, Default)]
pub struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
