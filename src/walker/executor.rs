//! Replay of a walk script against a set of hooks.
//!
//! Every resource runs in its own task. A task first waits on the shared
//! [`CompletionTracker`] for its dependencies, then for a parallelism
//! permit, and then drives the hook callbacks its script step describes.
//! Every task reports completion whatever its outcome, so no dependent is
//! left waiting.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::addrs::ResourceInstanceAddr;
use crate::config::{ResourceStep, WalkScript, DEFAULT_PARALLELISM};
use crate::error::{ProgressError, Result, WalkError};
use crate::hooks::{Hook, HookAction, HookResult};
use crate::planner::ChangeAction;
use crate::sync::CompletionTracker;

/// Which phase a walk replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkMode {
    /// Diff every resource.
    Plan,
    /// Apply every resource.
    Apply,
}

/// A resource that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedResource {
    /// The resource.
    pub address: ResourceInstanceAddr,
    /// Why it failed.
    pub message: String,
}

/// Outcome of a whole walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    /// Resources whose operation succeeded.
    pub succeeded: Vec<ResourceInstanceAddr>,
    /// Resources whose operation failed.
    pub failed: Vec<FailedResource>,
    /// Resources never started because a dependency did not succeed or the
    /// walk was halted.
    pub skipped: Vec<ResourceInstanceAddr>,
    /// Whether a hook halted the walk.
    pub halted: bool,
}

impl WalkReport {
    /// Returns true if every resource succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && !self.halted
    }

    /// Number of resources in the report.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }
}

#[derive(Debug)]
enum Outcome {
    Succeeded,
    Failed(String),
    Skipped,
}

struct WalkContext {
    hooks: Arc<dyn Hook>,
    mode: WalkMode,
    tracker: CompletionTracker<ResourceInstanceAddr>,
    permits: Semaphore,
    // Resources whose dependents must not run.
    blocked: Mutex<HashSet<ResourceInstanceAddr>>,
    halted: AtomicBool,
}

impl WalkContext {
    fn halt(&self) {
        if !self.halted.swap(true, Ordering::SeqCst) {
            info!("Walk halted by hook");
            self.hooks.stopping();
        }
    }

    fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Runs a hook callback, turning `Halt` into a stop signal.
    fn call(&self, result: HookResult) -> std::result::Result<(), Stop> {
        match result {
            Ok(HookAction::Continue) => Ok(()),
            Ok(HookAction::Halt) => {
                self.halt();
                Err(Stop::Halted)
            }
            Err(e) => Err(Stop::Failed(e.to_string())),
        }
    }
}

enum Stop {
    Halted,
    Failed(String),
}

impl Stop {
    fn reason(&self) -> &str {
        match self {
            Self::Halted => "walk halted",
            Self::Failed(message) => message,
        }
    }
}

impl From<Stop> for Outcome {
    fn from(stop: Stop) -> Self {
        match stop {
            Stop::Halted => Self::Skipped,
            Stop::Failed(message) => Self::Failed(message),
        }
    }
}

/// Executor replaying walk scripts.
#[derive(Clone)]
pub struct WalkExecutor {
    /// Hooks receiving every callback.
    hooks: Arc<dyn Hook>,
    /// Maximum number of operations running at once.
    parallelism: usize,
}

impl std::fmt::Debug for WalkExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkExecutor")
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

impl WalkExecutor {
    /// Creates an executor invoking `hooks`.
    #[must_use]
    pub fn new(hooks: Arc<dyn Hook>) -> Self {
        Self {
            hooks,
            parallelism: DEFAULT_PARALLELISM,
        }
    }

    /// Sets the maximum number of operations running at once. Zero is
    /// treated as one.
    #[must_use]
    pub const fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = if parallelism == 0 { 1 } else { parallelism };
        self
    }

    /// Replays the plan phase of `script`.
    ///
    /// # Errors
    ///
    /// Returns an error if a walk task panics.
    pub async fn plan(&self, script: &WalkScript) -> Result<WalkReport> {
        self.walk(script, WalkMode::Plan).await
    }

    /// Replays the apply phase of `script`.
    ///
    /// # Errors
    ///
    /// Returns an error if a walk task panics.
    pub async fn apply(&self, script: &WalkScript) -> Result<WalkReport> {
        self.walk(script, WalkMode::Apply).await
    }

    /// Replays one phase of `script`.
    ///
    /// # Errors
    ///
    /// Returns an error if a walk task panics.
    pub async fn walk(&self, script: &WalkScript, mode: WalkMode) -> Result<WalkReport> {
        info!(
            "Starting {:?} walk of {} with {} resources",
            mode,
            script.name,
            script.resources.len()
        );

        let ctx = Arc::new(WalkContext {
            hooks: Arc::clone(&self.hooks),
            mode,
            tracker: CompletionTracker::new(),
            permits: Semaphore::new(self.parallelism),
            blocked: Mutex::new(HashSet::new()),
            halted: AtomicBool::new(false),
        });

        let handles: Vec<_> = script
            .resources
            .iter()
            .map(|step| {
                let ctx = Arc::clone(&ctx);
                let step = step.clone();
                tokio::spawn(async move {
                    let outcome = run_step(&ctx, &step).await;
                    (step.address, outcome)
                })
            })
            .collect();

        let mut report = WalkReport::default();
        let mut opened = Vec::new();
        for handle in handles {
            let (address, outcome) = handle.await.map_err(|e| {
                ProgressError::Walk(WalkError::TaskFailed {
                    message: e.to_string(),
                })
            })?;
            match outcome {
                Outcome::Succeeded => {
                    if mode == WalkMode::Apply && address.is_ephemeral() {
                        opened.push(address.clone());
                    }
                    report.succeeded.push(address);
                }
                Outcome::Failed(message) => report.failed.push(FailedResource { address, message }),
                Outcome::Skipped => report.skipped.push(address),
            }
        }

        // Ephemeral resources stay open until everything else has finished.
        for address in opened.iter().rev() {
            close_ephemeral(&ctx, address);
        }

        report.halted = ctx.is_halted();
        info!(
            "Finished {:?} walk: {} succeeded, {} failed, {} skipped",
            mode,
            report.succeeded.len(),
            report.failed.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

async fn run_step(ctx: &WalkContext, step: &ResourceStep) -> Outcome {
    ctx.tracker
        .new_waiter_for(step.depends_on.iter().cloned())
        .await;

    let outcome = if let Some(dependency) = blocked_dependency(ctx, step) {
        warn!(
            "Skipping {} because {} did not succeed",
            step.address, dependency
        );
        Outcome::Skipped
    } else if ctx.is_halted() {
        debug!("Skipping {} after halt", step.address);
        Outcome::Skipped
    } else {
        match ctx.permits.acquire().await {
            Ok(_permit) => perform(ctx, step).await,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    };

    if !matches!(outcome, Outcome::Succeeded) {
        ctx.blocked.lock().insert(step.address.clone());
    }
    ctx.tracker.report_completion(step.address.clone());
    outcome
}

fn blocked_dependency(ctx: &WalkContext, step: &ResourceStep) -> Option<ResourceInstanceAddr> {
    let blocked = ctx.blocked.lock();
    step.depends_on.iter().find(|d| blocked.contains(*d)).cloned()
}

async fn perform(ctx: &WalkContext, step: &ResourceStep) -> Outcome {
    let result = match (ctx.mode, step.address.is_ephemeral()) {
        (WalkMode::Plan, _) => plan_resource(ctx, step),
        (WalkMode::Apply, true) => open_ephemeral(ctx, step).await,
        (WalkMode::Apply, false) if step.forget => forget_resource(ctx, step),
        (WalkMode::Apply, false) => apply_resource(ctx, step).await,
    };
    match result {
        Ok(outcome) => outcome,
        Err(stop) => stop.into(),
    }
}

type StepResult = std::result::Result<Outcome, Stop>;

fn plan_resource(ctx: &WalkContext, step: &ResourceStep) -> StepResult {
    let hooks = &ctx.hooks;
    let addr = &step.address;
    let prior = step.prior_state();
    let planned = step.new_state();

    if addr.is_data() {
        ctx.call(hooks.pre_refresh(addr, &prior))?;
        ctx.call(hooks.post_refresh(addr, &prior, &planned))?;
    }
    ctx.call(hooks.pre_diff(addr, &prior, &planned))?;
    ctx.call(hooks.post_diff(addr, step.action, &prior, &planned))?;
    Ok(Outcome::Succeeded)
}

fn forget_resource(ctx: &WalkContext, step: &ResourceStep) -> StepResult {
    ctx.call(ctx.hooks.pre_apply_forget(&step.address))?;
    ctx.call(ctx.hooks.post_apply_forget(&step.address))?;
    Ok(Outcome::Succeeded)
}

async fn apply_resource(ctx: &WalkContext, step: &ResourceStep) -> StepResult {
    let hooks = &ctx.hooks;
    let addr = &step.address;

    if let Some(import_id) = &step.import_id {
        ctx.call(hooks.pre_apply_import(addr, import_id))?;
        ctx.call(hooks.post_apply_import(addr, import_id))?;
    }

    let action = if addr.is_data() {
        ChangeAction::Read
    } else {
        step.action
    };
    ctx.call(hooks.pre_apply(addr, action, &step.prior_state(), &step.new_state()))?;

    tokio::time::sleep(step.duration()).await;

    let mut failure = step
        .error
        .as_ref()
        .map(|message| WalkError::operation(addr.to_string(), message));

    let mut stopped = None;
    if failure.is_none() && step.runs_provisioners() {
        match run_provisioners(ctx, step) {
            Ok(error) => failure = error,
            Err(stop) => {
                failure = Some(WalkError::operation(addr.to_string(), stop.reason()));
                stopped = Some(stop);
            }
        }
    }

    // post_apply always closes a started operation.
    let new_state = if failure.is_some() {
        step.prior_state()
    } else {
        step.new_state()
    };
    let closed = ctx.call(hooks.post_apply(
        addr,
        &new_state,
        failure.as_ref().map(|e| e as &dyn Error),
    ));
    if let Some(stop) = stopped {
        return Err(stop);
    }
    closed?;

    Ok(failure.map_or(Outcome::Succeeded, |e| Outcome::Failed(e.to_string())))
}

/// Runs the provisioners of a step until the first one fails, returning
/// that failure.
fn run_provisioners(
    ctx: &WalkContext,
    step: &ResourceStep,
) -> std::result::Result<Option<WalkError>, Stop> {
    let hooks = &ctx.hooks;
    let addr = &step.address;

    for provisioner in &step.provisioners {
        ctx.call(hooks.pre_provision_instance_step(addr, &provisioner.kind))?;
        if let Some(output) = &provisioner.output {
            hooks.provision_output(addr, &provisioner.kind, output);
        }
        let error = provisioner.error.as_ref().map(|message| WalkError::ProvisionerFailed {
            address: addr.to_string(),
            provisioner: provisioner.kind.clone(),
            message: message.clone(),
        });
        ctx.call(hooks.post_provision_instance_step(
            addr,
            &provisioner.kind,
            error.as_ref().map(|e| e as &dyn Error),
        ))?;
        if error.is_some() {
            return Ok(error);
        }
    }
    Ok(None)
}

async fn open_ephemeral(ctx: &WalkContext, step: &ResourceStep) -> StepResult {
    let hooks = &ctx.hooks;
    let addr = &step.address;

    ctx.call(hooks.pre_open(addr))?;
    let failure = step
        .error
        .as_ref()
        .map(|message| WalkError::operation(addr.to_string(), message));
    ctx.call(hooks.post_open(addr, failure.as_ref().map(|e| e as &dyn Error)))?;
    if let Some(e) = failure {
        return Ok(Outcome::Failed(e.to_string()));
    }

    if step.duration_ms > 0 {
        tokio::time::sleep(step.duration()).await;
        ctx.call(hooks.pre_renew(addr))?;
        ctx.call(hooks.post_renew(addr, None))?;
    }

    Ok(Outcome::Succeeded)
}

fn close_ephemeral(ctx: &WalkContext, addr: &ResourceInstanceAddr) {
    let closed = ctx
        .call(ctx.hooks.pre_close(addr))
        .and_then(|()| ctx.call(ctx.hooks.post_close(addr, None)));
    if let Err(Stop::Failed(message)) = closed {
        warn!("Closing {addr} failed: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptParser;
    use crate::events::MemorySink;
    use crate::hooks::{ChangeCounter, HookSet, ProgressEmitter};
    use serde_json::Value;
    use std::time::Duration;

    /// Records callbacks as `name:address`.
    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        halt_on: Option<ResourceInstanceAddr>,
        halt_provisioning: Option<ResourceInstanceAddr>,
        stopping: Mutex<usize>,
    }

    impl Recorder {
        fn record(&self, name: &str, addr: &ResourceInstanceAddr) {
            self.log.lock().push(format!("{name}:{addr}"));
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().clone()
        }

        fn position(&self, entry: &str) -> usize {
            self.log()
                .iter()
                .position(|e| e == entry)
                .unwrap_or_else(|| panic!("{entry} not recorded"))
        }

        fn mentions(&self, addr: &str) -> bool {
            self.log().iter().any(|e| e.ends_with(&format!(":{addr}")))
        }
    }

    impl Hook for Recorder {
        fn pre_apply(
            &self,
            addr: &ResourceInstanceAddr,
            _action: ChangeAction,
            _prior_state: &Value,
            _planned_new_state: &Value,
        ) -> HookResult {
            self.record("pre_apply", addr);
            if self.halt_on.as_ref() == Some(addr) {
                return Ok(HookAction::Halt);
            }
            Ok(HookAction::Continue)
        }

        fn post_apply(
            &self,
            addr: &ResourceInstanceAddr,
            _new_state: &Value,
            error: Option<&dyn Error>,
        ) -> HookResult {
            let name = if error.is_some() { "post_apply_err" } else { "post_apply" };
            self.record(name, addr);
            Ok(HookAction::Continue)
        }

        fn pre_diff(&self, addr: &ResourceInstanceAddr, _prior: &Value, _proposed: &Value) -> HookResult {
            self.record("pre_diff", addr);
            Ok(HookAction::Continue)
        }

        fn pre_refresh(&self, addr: &ResourceInstanceAddr, _prior_state: &Value) -> HookResult {
            self.record("pre_refresh", addr);
            Ok(HookAction::Continue)
        }

        fn pre_provision_instance_step(&self, addr: &ResourceInstanceAddr, _provisioner: &str) -> HookResult {
            self.record("pre_provision", addr);
            if self.halt_provisioning.as_ref() == Some(addr) {
                return Ok(HookAction::Halt);
            }
            Ok(HookAction::Continue)
        }

        fn provision_output(&self, addr: &ResourceInstanceAddr, _provisioner: &str, _output: &str) {
            self.record("output", addr);
        }

        fn post_provision_instance_step(
            &self,
            addr: &ResourceInstanceAddr,
            _provisioner: &str,
            error: Option<&dyn Error>,
        ) -> HookResult {
            let name = if error.is_some() { "post_provision_err" } else { "post_provision" };
            self.record(name, addr);
            Ok(HookAction::Continue)
        }

        fn pre_open(&self, addr: &ResourceInstanceAddr) -> HookResult {
            self.record("pre_open", addr);
            Ok(HookAction::Continue)
        }

        fn pre_renew(&self, addr: &ResourceInstanceAddr) -> HookResult {
            self.record("pre_renew", addr);
            Ok(HookAction::Continue)
        }

        fn post_close(&self, addr: &ResourceInstanceAddr, _error: Option<&dyn Error>) -> HookResult {
            self.record("post_close", addr);
            Ok(HookAction::Continue)
        }

        fn pre_apply_import(&self, addr: &ResourceInstanceAddr, _import_id: &str) -> HookResult {
            self.record("pre_import", addr);
            Ok(HookAction::Continue)
        }

        fn pre_apply_forget(&self, addr: &ResourceInstanceAddr) -> HookResult {
            self.record("pre_forget", addr);
            Ok(HookAction::Continue)
        }

        fn stopping(&self) {
            *self.stopping.lock() += 1;
        }
    }

    fn script(yaml: &str) -> WalkScript {
        ScriptParser::new().parse_yaml(yaml, None).unwrap()
    }

    fn addr(s: &str) -> ResourceInstanceAddr {
        s.parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_dependencies_run_in_order() {
        let recorder = Arc::new(Recorder::default());
        let walk = script(
            r"
resources:
  - address: test_instance.b
    action: create
    depends_on: [test_instance.a]
  - address: test_instance.a
    action: create
    duration_ms: 500
",
        );

        let report = WalkExecutor::new(recorder.clone()).apply(&walk).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.succeeded, vec![addr("test_instance.b"), addr("test_instance.a")]);
        assert!(
            recorder.position("post_apply:test_instance.a")
                < recorder.position("pre_apply:test_instance.b")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_skips_dependents() {
        let recorder = Arc::new(Recorder::default());
        let walk = script(
            r"
resources:
  - address: test_instance.a
    action: create
    error: provider was sad
  - address: test_instance.b
    action: create
    depends_on: [test_instance.a]
  - address: test_instance.c
    action: update
    depends_on: [test_instance.b]
  - address: test_instance.d
    action: delete
",
        );

        let report = WalkExecutor::new(recorder.clone()).apply(&walk).await.unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].address, addr("test_instance.a"));
        assert!(report.failed[0].message.contains("provider was sad"));
        assert_eq!(report.skipped, vec![addr("test_instance.b"), addr("test_instance.c")]);
        assert_eq!(report.succeeded, vec![addr("test_instance.d")]);
        assert_eq!(report.total(), 4);
        assert!(recorder.log().contains(&"post_apply_err:test_instance.a".to_string()));
        assert!(!recorder.mentions("test_instance.b"));
        assert!(!recorder.mentions("test_instance.c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_stops_scheduling() {
        let recorder = Arc::new(Recorder {
            halt_on: Some(addr("test_instance.a")),
            ..Recorder::default()
        });
        let walk = script(
            r"
resources:
  - address: test_instance.a
    action: create
  - address: test_instance.b
    action: create
    depends_on: [test_instance.a]
",
        );

        let report = WalkExecutor::new(recorder.clone()).apply(&walk).await.unwrap();

        assert!(report.halted);
        assert!(!report.is_success());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(*recorder.stopping.lock(), 1);
        assert!(!recorder.mentions("test_instance.b"));
        assert!(!recorder.log().contains(&"post_apply:test_instance.a".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_while_provisioning_still_closes_apply() {
        let recorder = Arc::new(Recorder {
            halt_provisioning: Some(addr("test_instance.web")),
            ..Recorder::default()
        });
        let counter = Arc::new(ChangeCounter::new());
        let sink = Arc::new(MemorySink::new());
        let emitter = Arc::new(ProgressEmitter::new(sink.clone()).unwrap());
        let hooks = HookSet::new()
            .with(counter.clone())
            .with(emitter.clone())
            .with(recorder.clone());
        let walk = script(
            r"
resources:
  - address: test_instance.web
    action: create
    duration_ms: 1000
    provisioners:
      - type: local-exec
",
        );

        let report = WalkExecutor::new(Arc::new(hooks)).apply(&walk).await.unwrap();

        assert!(report.halted);
        assert_eq!(report.skipped, vec![addr("test_instance.web")]);
        assert_eq!(
            recorder.log(),
            vec![
                "pre_apply:test_instance.web",
                "pre_provision:test_instance.web",
                "post_apply_err:test_instance.web",
            ]
        );
        assert_eq!(counter.pending(), 0);
        assert_eq!(counter.counts().added, 0);
        assert_eq!(emitter.in_flight(), 0);
        assert_eq!(sink.kinds().last(), Some(&"apply_errored"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_sequence_for_one_resource() {
        let recorder = Arc::new(Recorder::default());
        let walk = script(
            r#"
resources:
  - address: test_instance.web
    action: create
    import_id: i-123
    provisioners:
      - type: local-exec
        output: "hello\n"
      - type: remote-exec
        error: connection refused
      - type: never-runs
"#,
        );

        let report = WalkExecutor::new(recorder.clone()).apply(&walk).await.unwrap();

        assert_eq!(
            recorder.log(),
            vec![
                "pre_import:test_instance.web",
                "pre_apply:test_instance.web",
                "pre_provision:test_instance.web",
                "output:test_instance.web",
                "post_provision:test_instance.web",
                "pre_provision:test_instance.web",
                "post_provision_err:test_instance.web",
                "post_apply_err:test_instance.web",
            ]
        );
        assert!(report.failed[0].message.contains("remote-exec"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_only_runs_forget_hooks() {
        let recorder = Arc::new(Recorder::default());
        let walk = script(
            r"
resources:
  - address: test_instance.kept
    action: delete
    forget: true
",
        );

        WalkExecutor::new(recorder.clone()).apply(&walk).await.unwrap();

        assert_eq!(recorder.log(), vec!["pre_forget:test_instance.kept"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ephemeral_open_renew_close() {
        let recorder = Arc::new(Recorder::default());
        let walk = script(
            r"
resources:
  - address: ephemeral.vault_secret.token
    duration_ms: 100
  - address: test_instance.app
    action: create
    duration_ms: 5000
    depends_on: [ephemeral.vault_secret.token]
",
        );

        let report = WalkExecutor::new(recorder.clone())
            .with_parallelism(1)
            .apply(&walk)
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(
            recorder.log(),
            vec![
                "pre_open:ephemeral.vault_secret.token",
                "pre_renew:ephemeral.vault_secret.token",
                "pre_apply:test_instance.app",
                "post_apply:test_instance.app",
                "post_close:ephemeral.vault_secret.token",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_walk_counts_changes() {
        let counter = Arc::new(ChangeCounter::new());
        let recorder = Arc::new(Recorder::default());
        let hooks = HookSet::new().with(counter.clone()).with(recorder.clone());
        let walk = script(
            r"
resources:
  - address: data.aws_ami.ubuntu
    action: read
  - address: aws_instance.a
    action: create
  - address: aws_instance.b
    action: delete_then_create
  - address: aws_instance.c
    action: update
  - address: aws_instance.d
    action: delete
    error: ignored during plan
",
        );

        let report = WalkExecutor::new(Arc::new(hooks)).plan(&walk).await.unwrap();

        assert!(report.is_success());
        assert!(recorder.log().contains(&"pre_refresh:data.aws_ami.ubuntu".to_string()));
        assert!(recorder.log().contains(&"pre_diff:data.aws_ami.ubuntu".to_string()));
        assert_eq!(
            counter.counts().plan_summary(),
            "Plan: 2 to add, 1 to change, 2 to destroy."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_walk_counts_changes() {
        let counter = Arc::new(ChangeCounter::new());
        let walk = script(
            r"
parallelism: 2
resources:
  - address: data.aws_ami.ubuntu
    action: read
  - address: aws_instance.a
    action: create
    import_id: i-1
  - address: aws_instance.b
    action: create_then_delete
  - address: aws_instance.c
    action: update
    error: provider was sad
  - address: aws_instance.d
    forget: true
",
        );

        let report = WalkExecutor::new(counter.clone())
            .with_parallelism(walk.parallelism)
            .apply(&walk)
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(counter.pending(), 0);
        assert_eq!(
            counter.counts().apply_summary(),
            "Apply complete! Resources: 1 imported, 2 added, 0 changed, 1 destroyed, 1 forgotten."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_with_progress_emitter() {
        let sink = Arc::new(MemorySink::new());
        let emitter = ProgressEmitter::new(sink.clone())
            .unwrap()
            .with_heartbeat_interval(Duration::from_secs(10));
        let emitter = Arc::new(emitter);
        let walk = script(
            r"
resources:
  - address: test_instance.slow
    action: create
    id: i-slow
    duration_ms: 25000
",
        );

        let report = WalkExecutor::new(emitter.clone()).apply(&walk).await.unwrap();

        assert!(report.is_success());
        assert_eq!(emitter.in_flight(), 0);
        assert_eq!(
            sink.kinds(),
            vec!["apply_start", "apply_progress", "apply_progress", "apply_complete"]
        );
        assert!(
            sink.events()
                .last()
                .is_some_and(|e| e.message().ends_with("[id=i-slow]"))
        );
    }

    #[tokio::test]
    async fn test_empty_script() {
        let recorder = Arc::new(Recorder::default());
        let report = WalkExecutor::new(recorder).apply(&script("resources: []")).await.unwrap();
        assert_eq!(report, WalkReport::default());
        assert!(report.is_success());
    }
}
