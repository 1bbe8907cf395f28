//! Wiring of the progress hooks for one replayed walk.

use std::sync::Arc;
use tracing::debug;

use crate::config::WalkScript;
use crate::error::Result;
use crate::events::{EventSink, HumanSink, JsonLinesSink};
use crate::hooks::{ChangeCounter, ChangeCounts, HookSet, ProgressEmitter};
use crate::walker::{WalkExecutor, WalkReport};

use super::commands::OutputFormat;

/// A change counter and a progress emitter registered together on one walk.
#[derive(Debug)]
pub struct Replay {
    counter: Arc<ChangeCounter>,
    executor: WalkExecutor,
}

impl Replay {
    /// Builds the hooks for `script`, sending progress events to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new(script: &WalkScript, sink: Arc<dyn EventSink>) -> Result<Self> {
        let interval = script.heartbeat_interval();
        debug!("Heartbeat interval: {:?}", interval);

        let counter = Arc::new(ChangeCounter::new());
        let emitter = Arc::new(ProgressEmitter::new(sink)?.with_heartbeat_interval(interval));
        let hooks = HookSet::new().with(counter.clone()).with(emitter);
        let executor = WalkExecutor::new(Arc::new(hooks)).with_parallelism(script.parallelism);

        Ok(Self { counter, executor })
    }

    /// Replays the plan phase of `script` and returns the planned counts.
    ///
    /// # Errors
    ///
    /// Returns an error if a walk task panics.
    pub async fn plan(&self, script: &WalkScript) -> Result<(WalkReport, ChangeCounts)> {
        self.counter.reset();
        let report = self.executor.plan(script).await?;
        Ok((report, self.counter.counts()))
    }

    /// Replays the apply phase of `script` and returns the applied counts.
    ///
    /// # Errors
    ///
    /// Returns an error if a walk task panics.
    pub async fn apply(&self, script: &WalkScript) -> Result<(WalkReport, ChangeCounts)> {
        self.counter.reset();
        let report = self.executor.apply(script).await?;
        Ok((report, self.counter.counts()))
    }
}

/// The stdout sink for an output format.
#[must_use]
pub fn stdout_sink(output: OutputFormat) -> Arc<dyn EventSink> {
    match output {
        OutputFormat::Json => Arc::new(JsonLinesSink::new(std::io::stdout())),
        OutputFormat::Text => Arc::new(HumanSink::new(std::io::stdout())),
    }
}
