//! Serializer Tracing
//!
//! Structured trace of a serialization run, useful for:
//! - Debugging descriptor mismatches
//! - Diffing two blobs record by record
//!
//! A trace sink is injected per run and finished exactly once when the run
//! succeeds. Nothing here is process-wide.
//!
//! Ambient diagnostics go through the `log` facade instead:
//! - DEBUG: run start/end
//! - TRACE: per-object and per-reference operations

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serializer trace events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Run started; the root's record is reserved at offset 0
    RunStarted {
        root: usize,
        root_size: usize,
        convention: &'static str,
    },

    /// A record was appended; `file_position` is its token field
    ObjectWritten {
        token: usize,
        file_position: u64,
        size: usize,
        padding: usize,
    },

    /// A reference slot was rewritten on disk
    ReferencePatched {
        /// File position of the patched slot
        from: u64,
        /// Offset written into it
        to: u64,
        /// Slot offset from the object address
        offset: usize,
    },

    /// Run completed
    RunFinished {
        objects: u64,
        bytes: u64,
        types: usize,
        fixups: usize,
    },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::RunStarted {
                root,
                root_size,
                convention,
            } => write!(
                f,
                "[FRZ] Run started (root {:#x}, {} bytes, {})",
                root, root_size, convention
            ),
            TraceEvent::ObjectWritten {
                token,
                file_position,
                size,
                padding,
            } => write!(
                f,
                "[FRZ] Object token {} at {} ({} bytes + {} padding)",
                token, file_position, size, padding
            ),
            TraceEvent::ReferencePatched { from, to, offset } => {
                write!(f, "[FRZ] Patched {} -> {} (field +{})", from, to, offset)
            },
            TraceEvent::RunFinished {
                objects,
                bytes,
                types,
                fixups,
            } => write!(
                f,
                "[FRZ] Run finished: {} objects, {} bytes, {} types, {} fixups",
                objects, bytes, types, fixups
            ),
        }
    }
}

/// Receives the trace of one run
pub trait TraceSink {
    /// Record one event
    fn record(&mut self, event: &TraceEvent) -> io::Result<()>;

    /// Called once after the last event of a successful run
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes the trace as a JSON array, one event per line
pub struct JsonTraceSink<W: Write> {
    out: W,
    records: usize,
    finished: bool,
}

impl JsonTraceSink<BufWriter<File>> {
    /// Create (truncating) a trace file
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonTraceSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            records: 0,
            finished: false,
        }
    }

    /// Number of events written so far
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for JsonTraceSink<W> {
    fn record(&mut self, event: &TraceEvent) -> io::Result<()> {
        let separator: &[u8] = if self.records == 0 { b"[\n" } else { b",\n" };
        self.out.write_all(separator)?;
        serde_json::to_writer(&mut self.out, event)?;
        self.records += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        if self.records == 0 {
            self.out.write_all(b"[")?;
        }
        self.out.write_all(b"\n]\n")?;
        self.out.flush()?;
        self.finished = true;
        Ok(())
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    pub events: Vec<TraceEvent>,
    pub finished: bool,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events of one kind, in order
    pub fn patches(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events
            .iter()
            .filter(|event| matches!(event, TraceEvent::ReferencePatched { .. }))
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&mut self, event: &TraceEvent) -> io::Result<()> {
        self.events.push(event.clone());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Forwards every event to the `log` facade
#[derive(Debug, Clone, Copy)]
pub struct LogTraceSink {
    level: log::Level,
}

impl LogTraceSink {
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LogTraceSink {
    fn default() -> Self {
        Self::new(log::Level::Trace)
    }
}

impl TraceSink for LogTraceSink {
    fn record(&mut self, event: &TraceEvent) -> io::Result<()> {
        log::log!(self.level, "{}", event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_events() -> Vec<TraceEvent> {
        vec![
            TraceEvent::ObjectWritten {
                token: 0,
                file_position: 8,
                size: 32,
                padding: 0,
            },
            TraceEvent::ReferencePatched {
                from: 16,
                to: 40,
                offset: 8,
            },
        ]
    }

    #[test]
    fn test_json_sink_writes_valid_array() {
        let mut sink = JsonTraceSink::new(Vec::new());
        for event in sample_events() {
            sink.record(&event).unwrap();
        }
        sink.finish().unwrap();
        assert_eq!(sink.records(), 2);

        let parsed: Vec<serde_json::Value> = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["event"], "object_written");
        assert_eq!(parsed[0]["file_position"], 8);
        assert_eq!(parsed[1]["event"], "reference_patched");
        assert_eq!(parsed[1]["to"], 40);
    }

    #[test]
    fn test_json_sink_empty_trace_is_empty_array() {
        let mut sink = JsonTraceSink::new(Vec::new());
        sink.finish().unwrap();
        sink.finish().unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_memory_sink_collects_events() {
        let mut sink = MemoryTraceSink::new();
        for event in sample_events() {
            sink.record(&event).unwrap();
        }
        sink.finish().unwrap();
        assert!(sink.finished);
        assert_eq!(sink.events, sample_events());
        assert_eq!(sink.patches().count(), 1);
    }

    #[test]
    fn test_display_is_human_readable() {
        let text = TraceEvent::RunFinished {
            objects: 3,
            bytes: 96,
            types: 2,
            fixups: 0,
        }
        .to_string();
        assert!(text.contains("3 objects"));
        assert!(text.contains("96 bytes"));
    }
}
