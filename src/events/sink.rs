//! Event sinks.
//!
//! A sink receives every [`HookEvent`] produced by the progress emitter. Sinks
//! are shared between the emitter and its heartbeat tasks, so `emit` takes
//! `&self` and must be safe to call from many tasks at once.

use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;
use tracing::warn;

use super::types::HookEvent;

/// Destination for progress events.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: HookEvent);
}

/// JSON envelope written for each event.
#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "@level")]
    level: &'static str,
    #[serde(rename = "@message")]
    message: String,
    #[serde(rename = "@module")]
    module: &'static str,
    #[serde(rename = "@timestamp")]
    timestamp: String,
    #[serde(flatten)]
    event: &'a HookEvent,
}

/// Writes one JSON object per event and line.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Creates a sink writing to `out`.
    pub const fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn encode(event: &HookEvent) -> serde_json::Result<Vec<u8>> {
        let envelope = Envelope {
            level: "info",
            message: event.message(),
            module: "tofu.ui",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            event,
        };
        let mut line = serde_json::to_vec(&envelope)?;
        line.push(b'\n');
        Ok(line)
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, event: HookEvent) {
        let line = match Self::encode(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode {} event: {}", event.kind(), e);
                return;
            }
        };

        let mut out = self.out.lock();
        if let Err(e) = out.write_all(&line).and_then(|()| out.flush()) {
            warn!("Failed to write {} event: {}", event.kind(), e);
        }
    }
}

/// Writes one colored human-readable line per event.
#[derive(Debug)]
pub struct HumanSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> HumanSink<W> {
    /// Creates a sink writing to `out`.
    pub const fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    /// Renders an event the way this sink prints it, without the newline.
    #[must_use]
    pub fn render(event: &HookEvent) -> String {
        let addr = event.resource().addr.as_str().bold();
        let summary = event.summary();
        if event.is_error() {
            format!("{}: {}", addr, summary.red())
        } else {
            format!("{addr}: {summary}")
        }
    }
}

impl<W: Write + Send> EventSink for HumanSink<W> {
    fn emit(&self, event: HookEvent) {
        let line = Self::render(&event);
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!("Failed to write {} event: {}", event.kind(), e);
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<HookEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }

    /// Type tags of the events received so far, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(HookEvent::kind).collect()
    }

    /// Number of events received so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no event was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Removes and returns every event received so far.
    pub fn take(&self) -> Vec<HookEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: HookEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::ResourceInstanceAddr;
    use crate::events::types::{ApplyProgress, ApplyStart, ResourceAddr};
    use crate::planner::ChangeAction;
    use serde_json::Value;
    use std::io;

    fn start_event() -> HookEvent {
        HookEvent::ApplyStart(ApplyStart {
            resource: ResourceAddr::from(&ResourceInstanceAddr::managed("test_instance", "boop")),
            action: ChangeAction::Create,
            id_key: None,
            id_value: None,
        })
    }

    fn errored_event() -> HookEvent {
        HookEvent::ApplyErrored(ApplyProgress {
            resource: ResourceAddr::from(&ResourceInstanceAddr::managed("test_instance", "boop")),
            action: ChangeAction::Delete,
            elapsed_seconds: 3,
        })
    }

    #[test]
    fn test_json_lines_envelope() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.emit(start_event());
        sink.emit(errored_event());

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["@level"], "info");
        assert_eq!(lines[0]["@module"], "tofu.ui");
        assert_eq!(lines[0]["@message"], "test_instance.boop: Creating...");
        assert_eq!(lines[0]["type"], "apply_start");
        assert_eq!(lines[0]["hook"]["resource"]["addr"], "test_instance.boop");
        assert!(lines[0]["@timestamp"].as_str().is_some());
        assert_eq!(lines[1]["type"], "apply_errored");
        assert_eq!(lines[1]["hook"]["elapsed_seconds"], 3);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failures_are_swallowed() {
        let sink = JsonLinesSink::new(BrokenPipe);
        sink.emit(start_event());

        let human = HumanSink::new(BrokenPipe);
        human.emit(start_event());
    }

    #[test]
    fn test_human_render() {
        colored::control::set_override(false);

        assert_eq!(
            HumanSink::<Vec<u8>>::render(&start_event()),
            "test_instance.boop: Creating..."
        );
        assert_eq!(
            HumanSink::<Vec<u8>>::render(&errored_event()),
            "test_instance.boop: Destruction errored after 3s"
        );

        let sink = HumanSink::new(Vec::new());
        sink.emit(start_event());
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "test_instance.boop: Creating...\n");
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(start_event());
        sink.emit(errored_event());

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.kinds(), vec!["apply_start", "apply_errored"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }
}
