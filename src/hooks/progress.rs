//! Per-resource progress events and heartbeats.
//!
//! The [`ProgressEmitter`] turns hook callbacks into [`HookEvent`]s. Every
//! apply operation that changes something gets a heartbeat task which emits
//! `apply_progress` once per interval until the operation's `post_apply`
//! arrives. The heartbeat only ever emits while its own in-flight entry is
//! present, and `post_apply` removes that entry before reporting the
//! outcome, so no heartbeat can follow a completion event.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::addrs::ResourceInstanceAddr;
use crate::error::{ProgressError, Result};
use crate::events::{
    ApplyComplete, ApplyProgress, ApplyStart, EphemeralAction, EventSink, HookEvent,
    ProvisionProgress, ProvisionStep, Refresh, ResourceAddr,
};
use crate::planner::ChangeAction;

use super::clock::{Clock, SystemClock};
use super::hook::{Hook, HookAction, HookResult};

/// Default time between two heartbeats of one operation.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

// Heartbeats beyond this many unread ones are not reported to the observer.
const ELAPSED_BUFFER: usize = 64;

/// Receiving ends of one in-flight operation's heartbeat.
#[derive(Debug)]
pub struct HeartbeatObserver {
    /// Elapsed time of every heartbeat, in order. Closed when the heartbeat
    /// task stops. Holds a bounded backlog; heartbeats that find it full are
    /// still emitted but not queued here.
    pub elapsed: mpsc::Receiver<Duration>,
    /// Resolves once the heartbeat task has stopped.
    pub heartbeat_done: oneshot::Receiver<()>,
}

struct InFlight {
    id: u64,
    action: ChangeAction,
    start: DateTime<Utc>,
    // Dropping or sending stops the heartbeat.
    done: Option<oneshot::Sender<()>>,
    observer: Option<HeartbeatObserver>,
}

struct Shared {
    sink: Arc<dyn EventSink>,
    applying: Mutex<HashMap<ResourceInstanceAddr, InFlight>>,
}

/// Hook that reports resource progress to an [`EventSink`].
pub struct ProgressEmitter {
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
    heartbeat_interval: Duration,
    runtime: Handle,
    next_id: AtomicU64,
}

impl fmt::Debug for ProgressEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEmitter")
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl ProgressEmitter {
    /// Creates an emitter that spawns heartbeats on the current tokio
    /// runtime and reads time from the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new(sink: Arc<dyn EventSink>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            ProgressError::runtime(format!("progress emitter needs a tokio runtime: {e}"))
        })?;
        Ok(Self::with_runtime(sink, runtime))
    }

    /// Creates an emitter that spawns heartbeats on `runtime`.
    #[must_use]
    pub fn with_runtime(sink: Arc<dyn EventSink>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                sink,
                applying: Mutex::new(HashMap::new()),
            }),
            clock: Arc::new(SystemClock),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            runtime,
            next_id: AtomicU64::new(0),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the time between two heartbeats.
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Number of operations between `pre_apply` and `post_apply`.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.applying.lock().len()
    }

    /// Hands out the heartbeat receivers of an in-flight operation.
    ///
    /// Returns `None` if `addr` is not in flight, if its action is a no-op,
    /// or if the receivers were already taken.
    pub fn heartbeat_observer(&self, addr: &ResourceInstanceAddr) -> Option<HeartbeatObserver> {
        self.shared
            .applying
            .lock()
            .get_mut(addr)
            .and_then(|entry| entry.observer.take())
    }

    fn emit(&self, event: HookEvent) {
        self.shared.sink.emit(event);
    }

    /// Builds the in-flight entry of an operation and the heartbeat that
    /// watches it. The heartbeat must only be spawned once the entry is in
    /// the map.
    fn new_heartbeat(
        &self,
        addr: &ResourceInstanceAddr,
        id: u64,
        action: ChangeAction,
        start: DateTime<Utc>,
    ) -> (InFlight, Heartbeat) {
        let (done_tx, done_rx) = oneshot::channel();
        let (elapsed_tx, elapsed_rx) = mpsc::channel(ELAPSED_BUFFER);
        let (finished_tx, finished_rx) = oneshot::channel();

        let heartbeat = Heartbeat {
            shared: Arc::downgrade(&self.shared),
            clock: Arc::clone(&self.clock),
            interval: self.heartbeat_interval,
            addr: addr.clone(),
            id,
            action,
            start,
            done: done_rx,
            elapsed: elapsed_tx,
            finished: finished_tx,
        };

        let entry = InFlight {
            id,
            action,
            start,
            done: Some(done_tx),
            observer: Some(HeartbeatObserver {
                elapsed: elapsed_rx,
                heartbeat_done: finished_rx,
            }),
        };
        (entry, heartbeat)
    }
}

struct Heartbeat {
    shared: Weak<Shared>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    addr: ResourceInstanceAddr,
    id: u64,
    action: ChangeAction,
    start: DateTime<Utc>,
    done: oneshot::Receiver<()>,
    elapsed: mpsc::Sender<Duration>,
    finished: oneshot::Sender<()>,
}

impl Heartbeat {
    async fn run(mut self) {
        debug!("Heartbeat started for {}", self.addr);
        loop {
            tokio::select! {
                biased;
                _ = &mut self.done => break,
                () = self.clock.after(self.interval) => {}
            }

            let Some(shared) = self.shared.upgrade() else {
                break;
            };
            let elapsed = elapsed_between(self.start, self.clock.now());
            {
                let applying = shared.applying.lock();
                if !applying.get(&self.addr).is_some_and(|entry| entry.id == self.id) {
                    break;
                }
                shared.sink.emit(HookEvent::ApplyProgress(ApplyProgress {
                    resource: ResourceAddr::from(&self.addr),
                    action: self.action,
                    elapsed_seconds: elapsed.as_secs(),
                }));
            }
            let _ = self.elapsed.try_send(elapsed);
        }

        debug!("Heartbeat stopped for {}", self.addr);
        drop(self.elapsed);
        let _ = self.finished.send(());
    }
}

fn round_to_second(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_round(TimeDelta::seconds(1)).unwrap_or(time)
}

/// Whole seconds between two instants, each rounded to the nearest second.
/// Negative spans are zero.
fn elapsed_between(start: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (round_to_second(now) - round_to_second(start))
        .to_std()
        .unwrap_or(Duration::ZERO)
}

fn string_attr<'a>(state: &'a Value, key: &str) -> Option<&'a str> {
    state.get(key).and_then(Value::as_str)
}

/// The `id` attribute of an object.
fn object_value_id(state: &Value) -> Option<(String, String)> {
    string_attr(state, "id").map(|id| ("id".to_string(), id.to_string()))
}

/// The `id` attribute of an object, falling back to `name` and `tags.Name`.
fn object_value_id_or_name(state: &Value) -> Option<(String, String)> {
    object_value_id(state)
        .or_else(|| string_attr(state, "name").map(|name| ("name".to_string(), name.to_string())))
        .or_else(|| {
            state
                .get("tags")
                .and_then(|tags| string_attr(tags, "Name"))
                .map(|name| ("tags.Name".to_string(), name.to_string()))
        })
}

fn split_id(id: Option<(String, String)>) -> (Option<String>, Option<String>) {
    id.map_or((None, None), |(key, value)| (Some(key), Some(value)))
}

/// Non-empty lines of a chunk of provisioner output, trailing whitespace
/// removed. `\n`, `\r\n` and a lone `\r` all end a line.
fn output_lines(output: &str) -> impl Iterator<Item = &str> {
    output
        .split(['\n', '\r'])
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
}

impl Hook for ProgressEmitter {
    fn pre_apply(
        &self,
        addr: &ResourceInstanceAddr,
        action: ChangeAction,
        prior_state: &Value,
        _planned_new_state: &Value,
    ) -> HookResult {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let start = round_to_second(self.clock.now());

        let (entry, heartbeat) = if action == ChangeAction::NoOp {
            let entry = InFlight {
                id,
                action,
                start,
                done: None,
                observer: None,
            };
            (entry, None)
        } else {
            let (id_key, id_value) = split_id(object_value_id_or_name(prior_state));
            self.emit(HookEvent::ApplyStart(ApplyStart {
                resource: ResourceAddr::from(addr),
                action,
                id_key,
                id_value,
            }));
            let (entry, heartbeat) = self.new_heartbeat(addr, id, action, start);
            (entry, Some(heartbeat))
        };

        let previous = self.shared.applying.lock().insert(addr.clone(), entry);
        if previous.is_some() {
            debug!("Replaced in-flight entry for {addr}");
        }
        if let Some(heartbeat) = heartbeat {
            self.runtime.spawn(heartbeat.run());
        }

        Ok(HookAction::Continue)
    }

    fn post_apply(
        &self,
        addr: &ResourceInstanceAddr,
        new_state: &Value,
        error: Option<&dyn Error>,
    ) -> HookResult {
        let Some(mut entry) = self.shared.applying.lock().remove(addr) else {
            debug!("post_apply for {addr} without an in-flight entry");
            return Ok(HookAction::Continue);
        };
        if let Some(done) = entry.done.take() {
            let _ = done.send(());
        }

        if entry.action == ChangeAction::NoOp {
            return Ok(HookAction::Continue);
        }

        let elapsed_seconds = elapsed_between(entry.start, self.clock.now()).as_secs();
        let resource = ResourceAddr::from(addr);
        if error.is_some() {
            self.emit(HookEvent::ApplyErrored(ApplyProgress {
                resource,
                action: entry.action,
                elapsed_seconds,
            }));
        } else {
            let (id_key, id_value) = split_id(object_value_id(new_state));
            self.emit(HookEvent::ApplyComplete(ApplyComplete {
                resource,
                action: entry.action,
                id_key,
                id_value,
                elapsed_seconds,
            }));
        }

        Ok(HookAction::Continue)
    }

    fn pre_provision_instance_step(
        &self,
        addr: &ResourceInstanceAddr,
        provisioner: &str,
    ) -> HookResult {
        self.emit(HookEvent::ProvisionStart(ProvisionStep {
            resource: ResourceAddr::from(addr),
            provisioner: provisioner.to_string(),
        }));
        Ok(HookAction::Continue)
    }

    fn post_provision_instance_step(
        &self,
        addr: &ResourceInstanceAddr,
        provisioner: &str,
        error: Option<&dyn Error>,
    ) -> HookResult {
        let step = ProvisionStep {
            resource: ResourceAddr::from(addr),
            provisioner: provisioner.to_string(),
        };
        self.emit(if error.is_some() {
            HookEvent::ProvisionErrored(step)
        } else {
            HookEvent::ProvisionComplete(step)
        });
        Ok(HookAction::Continue)
    }

    fn provision_output(&self, addr: &ResourceInstanceAddr, provisioner: &str, output: &str) {
        for line in output_lines(output) {
            self.emit(HookEvent::ProvisionProgress(ProvisionProgress {
                resource: ResourceAddr::from(addr),
                provisioner: provisioner.to_string(),
                output: line.to_string(),
            }));
        }
    }

    fn pre_refresh(&self, addr: &ResourceInstanceAddr, prior_state: &Value) -> HookResult {
        let (id_key, id_value) = split_id(object_value_id(prior_state));
        self.emit(HookEvent::RefreshStart(Refresh {
            resource: ResourceAddr::from(addr),
            id_key,
            id_value,
        }));
        Ok(HookAction::Continue)
    }

    fn post_refresh(
        &self,
        addr: &ResourceInstanceAddr,
        _prior_state: &Value,
        new_state: &Value,
    ) -> HookResult {
        let (id_key, id_value) = split_id(object_value_id(new_state));
        self.emit(HookEvent::RefreshComplete(Refresh {
            resource: ResourceAddr::from(addr),
            id_key,
            id_value,
        }));
        Ok(HookAction::Continue)
    }

    fn pre_open(&self, addr: &ResourceInstanceAddr) -> HookResult {
        self.ephemeral_started(addr, "Opening...")
    }

    fn post_open(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        self.ephemeral_complete(addr, "Open complete", error)
    }

    fn pre_renew(&self, addr: &ResourceInstanceAddr) -> HookResult {
        self.ephemeral_started(addr, "Renewing...")
    }

    fn post_renew(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        self.ephemeral_complete(addr, "Renew complete", error)
    }

    fn pre_close(&self, addr: &ResourceInstanceAddr) -> HookResult {
        self.ephemeral_started(addr, "Closing...")
    }

    fn post_close(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        self.ephemeral_complete(addr, "Close complete", error)
    }
}

impl ProgressEmitter {
    fn ephemeral_started(&self, addr: &ResourceInstanceAddr, msg: &str) -> HookResult {
        self.emit(HookEvent::EphemeralActionStarted(EphemeralAction {
            resource: ResourceAddr::from(addr),
            msg: msg.to_string(),
        }));
        Ok(HookAction::Continue)
    }

    // Failures are reported through diagnostics, not progress.
    fn ephemeral_complete(
        &self,
        addr: &ResourceInstanceAddr,
        msg: &str,
        error: Option<&dyn Error>,
    ) -> HookResult {
        if error.is_none() {
            self.emit(HookEvent::EphemeralActionComplete(EphemeralAction {
                resource: ResourceAddr::from(addr),
                msg: msg.to_string(),
            }));
        }
        Ok(HookAction::Continue)
    }
}
