//! Structured progress events.

use serde::Serialize;

use crate::addrs::{InstanceKey, ResourceInstanceAddr};
use crate::planner::ChangeAction;

/// The resource an event is about, in the shape consumers of the JSON
/// stream expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAddr {
    /// Full instance address.
    pub addr: String,
    /// Module instance path, empty for the root module.
    pub module: String,
    /// Resource instance address without the module path.
    pub resource: String,
    /// Provider type implied by the resource type.
    pub implied_provider: String,
    /// Resource type.
    pub resource_type: String,
    /// Resource name.
    pub resource_name: String,
    /// Instance key, `null` when the resource has none.
    pub resource_key: Option<InstanceKey>,
}

impl From<&ResourceInstanceAddr> for ResourceAddr {
    fn from(addr: &ResourceInstanceAddr) -> Self {
        let mut resource = addr.resource_path();
        if let Some(key) = &addr.key {
            resource.push_str(&key.to_string());
        }
        Self {
            addr: addr.to_string(),
            module: addr.module_path(),
            resource,
            implied_provider: addr.implied_provider().to_string(),
            resource_type: addr.resource_type.clone(),
            resource_name: addr.name.clone(),
            resource_key: addr.key.clone(),
        }
    }
}

/// Payload of `apply_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyStart {
    /// The resource.
    pub resource: ResourceAddr,
    /// The planned action.
    pub action: ChangeAction,
    /// Name of the identifying attribute, if one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_key: Option<String>,
    /// Value of the identifying attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_value: Option<String>,
}

/// Payload of `apply_progress` and `apply_errored`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyProgress {
    /// The resource.
    pub resource: ResourceAddr,
    /// The planned action.
    pub action: ChangeAction,
    /// Whole seconds since the operation started.
    pub elapsed_seconds: u64,
}

/// Payload of `apply_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyComplete {
    /// The resource.
    pub resource: ResourceAddr,
    /// The planned action.
    pub action: ChangeAction,
    /// Name of the identifying attribute, if one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_key: Option<String>,
    /// Value of the identifying attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_value: Option<String>,
    /// Whole seconds since the operation started.
    pub elapsed_seconds: u64,
}

/// Payload of the provisioner step events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionStep {
    /// The resource.
    pub resource: ResourceAddr,
    /// Provisioner type, e.g. `local-exec`.
    pub provisioner: String,
}

/// Payload of `provision_progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionProgress {
    /// The resource.
    pub resource: ResourceAddr,
    /// Provisioner type, e.g. `local-exec`.
    pub provisioner: String,
    /// One line of provisioner output.
    pub output: String,
}

/// Payload of the refresh events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refresh {
    /// The resource.
    pub resource: ResourceAddr,
    /// Name of the identifying attribute, if one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_key: Option<String>,
    /// Value of the identifying attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_value: Option<String>,
}

/// Payload of the ephemeral resource events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EphemeralAction {
    /// The resource.
    pub resource: ResourceAddr,
    /// Progress text, e.g. `Opening...`.
    pub msg: String,
}

/// One progress event.
///
/// Serializes as `{"type": "<kind>", "hook": {..payload..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "hook", rename_all = "snake_case")]
pub enum HookEvent {
    /// An apply operation started.
    ApplyStart(ApplyStart),
    /// Heartbeat of a running apply operation.
    ApplyProgress(ApplyProgress),
    /// An apply operation succeeded.
    ApplyComplete(ApplyComplete),
    /// An apply operation failed.
    ApplyErrored(ApplyProgress),
    /// A provisioner started.
    ProvisionStart(ProvisionStep),
    /// A line of provisioner output.
    ProvisionProgress(ProvisionProgress),
    /// A provisioner succeeded.
    ProvisionComplete(ProvisionStep),
    /// A provisioner failed.
    ProvisionErrored(ProvisionStep),
    /// A refresh started.
    RefreshStart(Refresh),
    /// A refresh finished.
    RefreshComplete(Refresh),
    /// An ephemeral resource operation started.
    EphemeralActionStarted(EphemeralAction),
    /// An ephemeral resource operation finished.
    EphemeralActionComplete(EphemeralAction),
}

impl HookEvent {
    /// The event's type tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ApplyStart(_) => "apply_start",
            Self::ApplyProgress(_) => "apply_progress",
            Self::ApplyComplete(_) => "apply_complete",
            Self::ApplyErrored(_) => "apply_errored",
            Self::ProvisionStart(_) => "provision_start",
            Self::ProvisionProgress(_) => "provision_progress",
            Self::ProvisionComplete(_) => "provision_complete",
            Self::ProvisionErrored(_) => "provision_errored",
            Self::RefreshStart(_) => "refresh_start",
            Self::RefreshComplete(_) => "refresh_complete",
            Self::EphemeralActionStarted(_) => "ephemeral_action_started",
            Self::EphemeralActionComplete(_) => "ephemeral_action_complete",
        }
    }

    /// The resource the event is about.
    #[must_use]
    pub const fn resource(&self) -> &ResourceAddr {
        match self {
            Self::ApplyStart(e) => &e.resource,
            Self::ApplyProgress(e) | Self::ApplyErrored(e) => &e.resource,
            Self::ApplyComplete(e) => &e.resource,
            Self::ProvisionStart(e) | Self::ProvisionComplete(e) | Self::ProvisionErrored(e) => {
                &e.resource
            }
            Self::ProvisionProgress(e) => &e.resource,
            Self::RefreshStart(e) | Self::RefreshComplete(e) => &e.resource,
            Self::EphemeralActionStarted(e) | Self::EphemeralActionComplete(e) => &e.resource,
        }
    }

    /// Returns true for events that report a failure.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::ApplyErrored(_) | Self::ProvisionErrored(_))
    }

    /// The message text without the leading address.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::ApplyStart(e) => format!(
                "{}...{}",
                e.action.start_verb(),
                id_suffix(e.id_key.as_deref(), e.id_value.as_deref())
            ),
            Self::ApplyProgress(e) => format!(
                "Still {}... [{} elapsed]",
                e.action.progress_verb(),
                format_elapsed(e.elapsed_seconds)
            ),
            Self::ApplyComplete(e) => format!(
                "{} complete after {}{}",
                e.action.noun(),
                format_elapsed(e.elapsed_seconds),
                id_suffix(e.id_key.as_deref(), e.id_value.as_deref())
            ),
            Self::ApplyErrored(e) => format!(
                "{} errored after {}",
                e.action.noun(),
                format_elapsed(e.elapsed_seconds)
            ),
            Self::ProvisionStart(e) => format!("Provisioning with '{}'...", e.provisioner),
            Self::ProvisionProgress(e) => format!("({}): {}", e.provisioner, e.output),
            Self::ProvisionComplete(e) => format!("({}) Provisioning complete", e.provisioner),
            Self::ProvisionErrored(e) => format!("({}) Provisioning errored", e.provisioner),
            Self::RefreshStart(e) => format!(
                "Refreshing state...{}",
                id_suffix(e.id_key.as_deref(), e.id_value.as_deref())
            ),
            Self::RefreshComplete(e) => format!(
                "Refresh complete{}",
                id_suffix(e.id_key.as_deref(), e.id_value.as_deref())
            ),
            Self::EphemeralActionStarted(e) | Self::EphemeralActionComplete(e) => e.msg.clone(),
        }
    }

    /// Human-readable message, e.g. `test_instance.boop: Creating...`.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{}: {}", self.resource().addr, self.summary())
    }
}

fn id_suffix(key: Option<&str>, value: Option<&str>) -> String {
    match (key, value) {
        (Some(key), Some(value)) if !key.is_empty() && !value.is_empty() => {
            format!(" [{key}={value}]")
        }
        _ => String::new(),
    }
}

/// Renders whole seconds the way durations are shown to users:
/// `0s`, `22s`, `1m30s`, `1h0m5s`.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::ModuleInstanceStep;
    use serde_json::json;

    fn boop() -> ResourceAddr {
        ResourceAddr::from(&ResourceInstanceAddr::managed("test_instance", "boop"))
    }

    #[test]
    fn test_resource_addr_shape() {
        let json = serde_json::to_value(boop()).unwrap();
        assert_eq!(
            json,
            json!({
                "addr": "test_instance.boop",
                "implied_provider": "test",
                "module": "",
                "resource": "test_instance.boop",
                "resource_key": null,
                "resource_name": "boop",
                "resource_type": "test_instance",
            })
        );
    }

    #[test]
    fn test_resource_addr_in_module_with_key() {
        let addr = ResourceInstanceAddr::data("aws_ami", "ubuntu")
            .with_key(InstanceKey::Str("eu".into()))
            .in_module(vec![ModuleInstanceStep {
                name: "net".into(),
                key: Some(InstanceKey::Int(0)),
            }]);

        let resource = ResourceAddr::from(&addr);

        assert_eq!(resource.addr, "module.net[0].data.aws_ami.ubuntu[\"eu\"]");
        assert_eq!(resource.module, "module.net[0]");
        assert_eq!(resource.resource, "data.aws_ami.ubuntu[\"eu\"]");
        assert_eq!(resource.implied_provider, "aws");
        assert_eq!(
            serde_json::to_value(&resource.resource_key).unwrap(),
            json!("eu")
        );
    }

    #[test]
    fn test_apply_complete_serialization() {
        let event = HookEvent::ApplyComplete(ApplyComplete {
            resource: boop(),
            action: ChangeAction::Create,
            id_key: Some("id".into()),
            id_value: Some("test".into()),
            elapsed_seconds: 22,
        });

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "apply_complete");
        assert_eq!(json["hook"]["action"], "create");
        assert_eq!(json["hook"]["elapsed_seconds"], 22);
        assert_eq!(json["hook"]["id_key"], "id");
        assert_eq!(json["hook"]["id_value"], "test");
        assert_eq!(event.kind(), "apply_complete");
        assert_eq!(
            event.message(),
            "test_instance.boop: Creation complete after 22s [id=test]"
        );
    }

    #[test]
    fn test_apply_start_without_id_omits_fields() {
        let event = HookEvent::ApplyStart(ApplyStart {
            resource: boop(),
            action: ChangeAction::DeleteThenCreate,
            id_key: None,
            id_value: None,
        });

        let json = serde_json::to_value(&event).unwrap();

        assert!(json["hook"].get("id_key").is_none());
        assert_eq!(json["hook"]["action"], "replace");
        assert_eq!(event.message(), "test_instance.boop: Replacing...");
    }

    #[test]
    fn test_messages() {
        let progress = HookEvent::ApplyProgress(ApplyProgress {
            resource: boop(),
            action: ChangeAction::Create,
            elapsed_seconds: 10,
        });
        assert_eq!(
            progress.message(),
            "test_instance.boop: Still creating... [10s elapsed]"
        );

        let errored = HookEvent::ApplyErrored(ApplyProgress {
            resource: boop(),
            action: ChangeAction::Delete,
            elapsed_seconds: 0,
        });
        assert_eq!(errored.message(), "test_instance.boop: Destruction errored after 0s");
        assert!(errored.is_error());

        let output = HookEvent::ProvisionProgress(ProvisionProgress {
            resource: boop(),
            provisioner: "local-exec".into(),
            output: "hello".into(),
        });
        assert_eq!(output.message(), "test_instance.boop: (local-exec): hello");

        let step = ProvisionStep {
            resource: boop(),
            provisioner: "local-exec".into(),
        };
        assert_eq!(
            HookEvent::ProvisionStart(step.clone()).message(),
            "test_instance.boop: Provisioning with 'local-exec'..."
        );
        assert_eq!(
            HookEvent::ProvisionErrored(step).message(),
            "test_instance.boop: (local-exec) Provisioning errored"
        );

        let refresh = HookEvent::RefreshStart(Refresh {
            resource: boop(),
            id_key: Some("id".into()),
            id_value: Some("honk".into()),
        });
        assert_eq!(
            refresh.message(),
            "test_instance.boop: Refreshing state... [id=honk]"
        );
    }

    #[test]
    fn test_ephemeral_serialization() {
        let event = HookEvent::EphemeralActionStarted(EphemeralAction {
            resource: ResourceAddr::from(&ResourceInstanceAddr::ephemeral("test_instance", "foo")),
            msg: "Opening...".into(),
        });

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "ephemeral_action_started");
        assert_eq!(json["hook"]["msg"], "Opening...");
        assert_eq!(event.message(), "ephemeral.test_instance.foo: Opening...");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(22), "22s");
        assert_eq!(format_elapsed(90), "1m30s");
        assert_eq!(format_elapsed(3605), "1h0m5s");
    }
}
