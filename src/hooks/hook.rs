//! The hook callback surface invoked by a graph walk.

use serde_json::Value;
use std::error::Error;

use crate::addrs::ResourceInstanceAddr;
use crate::error::Result;
use crate::planner::ChangeAction;

/// What the walk should do after a hook callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookAction {
    /// Continue processing as usual.
    #[default]
    Continue,
    /// Stop: no further hooks run for this callback and the walk should not
    /// start the operation it was about to perform.
    Halt,
}

/// Outcome of a hook callback.
pub type HookResult = Result<HookAction>;

/// Callbacks invoked at the lifecycle points of resource operations.
///
/// Every method has a default that does nothing and continues, so an
/// implementation only overrides the callbacks it cares about. Callbacks
/// may be invoked concurrently from many tasks, for different addresses at
/// once.
///
/// Resource states are passed as JSON values, `Value::Null` when there is
/// no object. Operation failures arrive as the `error` argument of the
/// `post_*` callbacks; they are not a failure of the hook.
#[allow(unused_variables)]
pub trait Hook: Send + Sync {
    /// Called before an action is applied to a single instance.
    fn pre_apply(
        &self,
        addr: &ResourceInstanceAddr,
        action: ChangeAction,
        prior_state: &Value,
        planned_new_state: &Value,
    ) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after an action was applied to a single instance.
    fn post_apply(
        &self,
        addr: &ResourceInstanceAddr,
        new_state: &Value,
        error: Option<&dyn Error>,
    ) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called before the provider plans a change.
    fn pre_diff(
        &self,
        addr: &ResourceInstanceAddr,
        prior_state: &Value,
        proposed_new_state: &Value,
    ) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after the provider planned a change.
    fn post_diff(
        &self,
        addr: &ResourceInstanceAddr,
        action: ChangeAction,
        prior_state: &Value,
        planned_new_state: &Value,
    ) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called before one provisioner runs for an instance.
    fn pre_provision_instance_step(
        &self,
        addr: &ResourceInstanceAddr,
        provisioner: &str,
    ) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after one provisioner ran for an instance.
    fn post_provision_instance_step(
        &self,
        addr: &ResourceInstanceAddr,
        provisioner: &str,
        error: Option<&dyn Error>,
    ) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called with output produced by a running provisioner. The output is
    /// an arbitrary chunk of the provisioner's stream.
    fn provision_output(&self, addr: &ResourceInstanceAddr, provisioner: &str, output: &str) {}

    /// Called before an instance's state is refreshed.
    fn pre_refresh(&self, addr: &ResourceInstanceAddr, prior_state: &Value) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after an instance's state was refreshed.
    fn post_refresh(
        &self,
        addr: &ResourceInstanceAddr,
        prior_state: &Value,
        new_state: &Value,
    ) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called before an ephemeral resource is opened.
    fn pre_open(&self, addr: &ResourceInstanceAddr) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after an ephemeral resource was opened.
    fn post_open(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called before an ephemeral resource is renewed.
    fn pre_renew(&self, addr: &ResourceInstanceAddr) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after an ephemeral resource was renewed.
    fn post_renew(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called before an ephemeral resource is closed.
    fn pre_close(&self, addr: &ResourceInstanceAddr) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after an ephemeral resource was closed.
    fn post_close(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called before an instance is imported during apply.
    fn pre_apply_import(&self, addr: &ResourceInstanceAddr, import_id: &str) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after an instance was imported during apply.
    fn post_apply_import(&self, addr: &ResourceInstanceAddr, import_id: &str) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called before an instance is removed from state without being destroyed.
    fn pre_apply_forget(&self, addr: &ResourceInstanceAddr) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called after an instance was removed from state without being destroyed.
    fn post_apply_forget(&self, addr: &ResourceInstanceAddr) -> HookResult {
        Ok(HookAction::Continue)
    }

    /// Called when the walk was asked to stop gracefully.
    fn stopping(&self) {}
}
