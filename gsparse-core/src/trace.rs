//! Call tracing.
//!
//! Every numeric routine reports its arguments to the handle's [`Tracer`]
//! before validating them. A tracer that fails is logged and ignored.

use parking_lot::Mutex;
use std::fmt::{self, Display};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One traced call: the routine name and its rendered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    routine: String,
    args: Vec<String>,
}

impl TraceRecord {
    pub fn new(routine: impl Into<String>) -> Self {
        Self {
            routine: routine.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    /// Renders an absent argument as `null`.
    pub fn opt_arg<T: Display>(self, value: Option<T>) -> Self {
        match value {
            Some(value) => self.arg(value),
            None => self.arg("null"),
        }
    }

    pub fn routine(&self) -> &str {
        &self.routine
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.routine)?;
        for arg in &self.args {
            write!(f, ",{}", arg)?;
        }
        Ok(())
    }
}

/// Sink for traced calls, carried by each handle.
pub trait Tracer: Send + Sync + fmt::Debug {
    fn trace(&self, record: &TraceRecord) -> io::Result<()>;
}

/// Forwards records to the `log` facade under target `gsparse::trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn trace(&self, record: &TraceRecord) -> io::Result<()> {
        log::trace!(target: "gsparse::trace", "{}", record);
        Ok(())
    }
}

/// Appends one line per record to a file.
#[derive(Debug)]
pub struct FileTracer {
    writer: Mutex<BufWriter<File>>,
}

impl FileTracer {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        log::debug!("Tracing calls to {}", path.as_ref().display());
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl Tracer for FileTracer {
    fn trace(&self, record: &TraceRecord) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", record)?;
        writer.flush()
    }
}

/// Keeps records in memory; useful for inspecting what a routine reported.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    records: Mutex<Vec<TraceRecord>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Tracer for RecordingTracer {
    fn trace(&self, record: &TraceRecord) -> io::Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rendering() {
        let record = TraceRecord::new("gsparse_sroti")
            .arg(3)
            .opt_arg(Some(0.5))
            .opt_arg(None::<f32>);
        assert_eq!(record.to_string(), "gsparse_sroti,3,0.5,null");
        assert_eq!(record.args().len(), 3);
    }

    #[test]
    fn test_file_tracer_appends_lines() {
        let path = std::env::temp_dir().join(format!("gsparse-trace-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let tracer = FileTracer::open(&path).unwrap();
            tracer.trace(&TraceRecord::new("first").arg(1)).unwrap();
            tracer.trace(&TraceRecord::new("second").arg(2)).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first,1\nsecond,2\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_recording_tracer() {
        let tracer = RecordingTracer::new();
        tracer.trace(&TraceRecord::new("a")).unwrap();
        assert_eq!(tracer.records().len(), 1);
        tracer.clear();
        assert!(tracer.records().is_empty());
    }
}
