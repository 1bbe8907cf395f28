//! Walk script types.
//!
//! A walk script describes the resource operations a replayed walk performs:
//! which action each resource takes, how long it runs, what it depends on
//! and how it ends. These types map one to one onto the YAML file.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::addrs::ResourceInstanceAddr;
use crate::planner::ChangeAction;

/// Default number of resource operations running at once.
pub const DEFAULT_PARALLELISM: usize = 10;

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// The root of a walk script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalkScript {
    /// Name shown in summaries.
    #[serde(default = "default_name")]
    pub name: String,
    /// Maximum number of operations running at once.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Seconds between two heartbeats of one operation.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Resource operations, in declaration order.
    #[serde(default)]
    pub resources: Vec<ResourceStep>,
}

/// One scripted resource operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceStep {
    /// Resource instance address.
    pub address: ResourceInstanceAddr,
    /// Planned action.
    #[serde(default)]
    pub action: ChangeAction,
    /// How long the operation runs, in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
    /// Addresses that must finish first.
    #[serde(default)]
    pub depends_on: Vec<ResourceInstanceAddr>,
    /// Object id after the operation.
    #[serde(default)]
    pub id: Option<String>,
    /// If set, the operation fails with this message.
    #[serde(default)]
    pub error: Option<String>,
    /// Provisioners run after a creating action.
    #[serde(default)]
    pub provisioners: Vec<ProvisionerStep>,
    /// If set, the object is imported with this id before the action.
    #[serde(default)]
    pub import_id: Option<String>,
    /// Remove the object from state without destroying it.
    #[serde(default)]
    pub forget: bool,
}

/// One scripted provisioner run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionerStep {
    /// Provisioner type, e.g. `local-exec`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Output written by the provisioner, possibly several lines.
    #[serde(default)]
    pub output: Option<String>,
    /// If set, the provisioner fails with this message.
    #[serde(default)]
    pub error: Option<String>,
}

impl WalkScript {
    /// Heartbeat interval as a duration.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Finds a step by address.
    #[must_use]
    pub fn step(&self, address: &ResourceInstanceAddr) -> Option<&ResourceStep> {
        self.resources.iter().find(|r| &r.address == address)
    }
}

impl ResourceStep {
    /// Creates a step with no duration, dependencies or outcome.
    #[must_use]
    pub const fn new(address: ResourceInstanceAddr, action: ChangeAction) -> Self {
        Self {
            address,
            action,
            duration_ms: 0,
            depends_on: Vec::new(),
            id: None,
            error: None,
            provisioners: Vec::new(),
            import_id: None,
            forget: false,
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_depends_on(mut self, depends_on: Vec<ResourceInstanceAddr>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Sets the scripted failure.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the object id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let millis = duration.as_millis() as u64;
        self.duration_ms = millis;
        self
    }

    /// How long the operation runs.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Whether provisioners run for this step.
    #[must_use]
    pub const fn runs_provisioners(&self) -> bool {
        self.action.creates() && !self.forget
    }

    /// State of the object before the operation.
    #[must_use]
    pub fn prior_state(&self) -> Value {
        match (self.action, &self.id) {
            (ChangeAction::Create, _) | (_, None) => Value::Null,
            (_, Some(id)) => json!({ "id": id }),
        }
    }

    /// State of the object after the operation.
    #[must_use]
    pub fn new_state(&self) -> Value {
        match (self.action, &self.id) {
            (ChangeAction::Delete, _) | (_, None) => Value::Null,
            (_, Some(id)) => json!({ "id": id }),
        }
    }
}

fn default_name() -> String {
    String::from("walk")
}

const fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

const fn default_heartbeat_interval_secs() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}
