use crate::shelf::util::now_epoch_secs;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl EventLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
            EventLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestEvent {
    pub level: EventLevel,
    pub code: &'static str,
    pub partition: Option<String>,
    pub message: String,
}

impl IngestEvent {
    pub fn info(code: &'static str, partition: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Info,
            code,
            partition,
            message: message.into(),
        }
    }

    pub fn warn(code: &'static str, partition: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Warn,
            code,
            partition,
            message: message.into(),
        }
    }

    pub fn error(code: &'static str, partition: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Error,
            code,
            partition,
            message: message.into(),
        }
    }
}

/// Destination for ingestion events. Implementations must not fail the
/// caller; a sink that cannot write drops the event.
pub trait EventSink {
    fn emit(&self, event: &IngestEvent);
}

/// Appends one JSON line per event to a log file.
#[derive(Debug, Clone)]
pub struct AuditLogSink {
    path: PathBuf,
}

#[derive(Serialize)]
struct AuditLine<'a> {
    at_epoch_secs: u64,
    #[serde(flatten)]
    event: &'a IngestEvent,
}

impl AuditLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, event: &IngestEvent) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let line = AuditLine {
            at_epoch_secs: now_epoch_secs()?,
            event,
        };
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{}\n", serde_json::to_string(&line)?).as_bytes())?;
        Ok(())
    }
}

impl EventSink for AuditLogSink {
    fn emit(&self, event: &IngestEvent) {
        if let Err(err) = self.append(event) {
            eprintln!(
                "jobshelf log warning: failed to append {}: {err:#}",
                self.path.display()
            );
        }
    }
}

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `JOBSHELF_EVENT level=.. code=.. partition=.. msg=..` lines on stderr.
#[derive(Debug, Clone, Copy)]
pub struct StderrSink {
    min_level: EventLevel,
}

impl StderrSink {
    pub fn new(min_level: EventLevel) -> Self {
        Self { min_level }
    }

    pub fn render(event: &IngestEvent) -> String {
        format!(
            "JOBSHELF_EVENT level={} code={} partition={} msg={}",
            event.level.as_str(),
            sanitize_value(event.code),
            sanitize_value(event.partition.as_deref().unwrap_or("")),
            sanitize_value(&event.message),
        )
    }
}

impl EventSink for StderrSink {
    fn emit(&self, event: &IngestEvent) {
        if event.level >= self.min_level {
            eprintln!("{}", Self::render(event));
        }
    }
}

#[derive(Default)]
pub struct TeeSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl TeeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for TeeSink {
    fn emit(&self, event: &IngestEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::cell::RefCell<Vec<IngestEvent>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn codes(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(|e| e.code).collect()
    }

    pub fn count(&self, code: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.code == code).count()
    }
}

#[cfg(test)]
impl EventSink for MemorySink {
    fn emit(&self, event: &IngestEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
