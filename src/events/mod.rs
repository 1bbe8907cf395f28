//! Progress events and the sinks that receive them.

mod sink;
mod types;

#[cfg(test)]
pub use sink::MockEventSink;
pub use sink::{EventSink, HumanSink, JsonLinesSink, MemorySink};
pub use types::{
    format_elapsed, ApplyComplete, ApplyProgress, ApplyStart, EphemeralAction, HookEvent,
    ProvisionProgress, ProvisionStep, Refresh, ResourceAddr,
};
