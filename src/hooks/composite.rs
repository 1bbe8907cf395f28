//! Broadcasting one callback stream to several hooks.

use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::addrs::ResourceInstanceAddr;
use crate::planner::ChangeAction;

use super::hook::{Hook, HookAction, HookResult};

/// An ordered set of hooks invoked as one.
///
/// Each callback is delivered to the hooks in registration order. The first
/// hook that halts or fails ends delivery of that callback, and its result is
/// returned.
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook to the end of the set.
    #[must_use]
    pub fn with(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Adds a hook to the end of the set.
    pub fn push(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn each(&self, mut f: impl FnMut(&dyn Hook) -> HookResult) -> HookResult {
        for hook in &self.hooks {
            if f(hook.as_ref())? == HookAction::Halt {
                return Ok(HookAction::Halt);
            }
        }
        Ok(HookAction::Continue)
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl Hook for HookSet {
    fn pre_apply(
        &self,
        addr: &ResourceInstanceAddr,
        action: ChangeAction,
        prior_state: &Value,
        planned_new_state: &Value,
    ) -> HookResult {
        self.each(|h| h.pre_apply(addr, action, prior_state, planned_new_state))
    }

    fn post_apply(
        &self,
        addr: &ResourceInstanceAddr,
        new_state: &Value,
        error: Option<&dyn Error>,
    ) -> HookResult {
        self.each(|h| h.post_apply(addr, new_state, error))
    }

    fn pre_diff(
        &self,
        addr: &ResourceInstanceAddr,
        prior_state: &Value,
        proposed_new_state: &Value,
    ) -> HookResult {
        self.each(|h| h.pre_diff(addr, prior_state, proposed_new_state))
    }

    fn post_diff(
        &self,
        addr: &ResourceInstanceAddr,
        action: ChangeAction,
        prior_state: &Value,
        planned_new_state: &Value,
    ) -> HookResult {
        self.each(|h| h.post_diff(addr, action, prior_state, planned_new_state))
    }

    fn pre_provision_instance_step(
        &self,
        addr: &ResourceInstanceAddr,
        provisioner: &str,
    ) -> HookResult {
        self.each(|h| h.pre_provision_instance_step(addr, provisioner))
    }

    fn post_provision_instance_step(
        &self,
        addr: &ResourceInstanceAddr,
        provisioner: &str,
        error: Option<&dyn Error>,
    ) -> HookResult {
        self.each(|h| h.post_provision_instance_step(addr, provisioner, error))
    }

    fn provision_output(&self, addr: &ResourceInstanceAddr, provisioner: &str, output: &str) {
        for hook in &self.hooks {
            hook.provision_output(addr, provisioner, output);
        }
    }

    fn pre_refresh(&self, addr: &ResourceInstanceAddr, prior_state: &Value) -> HookResult {
        self.each(|h| h.pre_refresh(addr, prior_state))
    }

    fn post_refresh(
        &self,
        addr: &ResourceInstanceAddr,
        prior_state: &Value,
        new_state: &Value,
    ) -> HookResult {
        self.each(|h| h.post_refresh(addr, prior_state, new_state))
    }

    fn pre_open(&self, addr: &ResourceInstanceAddr) -> HookResult {
        self.each(|h| h.pre_open(addr))
    }

    fn post_open(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        self.each(|h| h.post_open(addr, error))
    }

    fn pre_renew(&self, addr: &ResourceInstanceAddr) -> HookResult {
        self.each(|h| h.pre_renew(addr))
    }

    fn post_renew(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        self.each(|h| h.post_renew(addr, error))
    }

    fn pre_close(&self, addr: &ResourceInstanceAddr) -> HookResult {
        self.each(|h| h.pre_close(addr))
    }

    fn post_close(&self, addr: &ResourceInstanceAddr, error: Option<&dyn Error>) -> HookResult {
        self.each(|h| h.post_close(addr, error))
    }

    fn pre_apply_import(&self, addr: &ResourceInstanceAddr, import_id: &str) -> HookResult {
        self.each(|h| h.pre_apply_import(addr, import_id))
    }

    fn post_apply_import(&self, addr: &ResourceInstanceAddr, import_id: &str) -> HookResult {
        self.each(|h| h.post_apply_import(addr, import_id))
    }

    fn pre_apply_forget(&self, addr: &ResourceInstanceAddr) -> HookResult {
        self.each(|h| h.pre_apply_forget(addr))
    }

    fn post_apply_forget(&self, addr: &ResourceInstanceAddr) -> HookResult {
        self.each(|h| h.post_apply_forget(addr))
    }

    fn stopping(&self) {
        for hook in &self.hooks {
            hook.stopping();
        }
    }
}
