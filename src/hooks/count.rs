//! Resource change counting for plan and apply summaries.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::Write;
use tracing::debug;

use crate::addrs::ResourceInstanceAddr;
use crate::planner::ChangeAction;

use super::hook::{Hook, HookAction, HookResult};

/// Snapshot of the counters kept by a [`ChangeCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChangeCounts {
    /// Objects created.
    pub added: usize,
    /// Objects updated in place.
    pub changed: usize,
    /// Objects destroyed.
    pub removed: usize,
    /// Objects imported.
    pub imported: usize,
    /// Objects removed from state without being destroyed.
    pub forgotten: usize,
    /// Planned creations.
    pub to_add: usize,
    /// Planned in-place updates.
    pub to_change: usize,
    /// Planned destructions.
    pub to_remove: usize,
    /// Planned replacements.
    pub to_remove_and_add: usize,
}

impl ChangeCounts {
    /// The line printed when an apply finishes.
    #[must_use]
    pub fn apply_summary(&self) -> String {
        let mut line = String::from("Apply complete! Resources: ");
        if self.imported > 0 {
            let _ = write!(line, "{} imported, ", self.imported);
        }
        let _ = write!(
            line,
            "{} added, {} changed, {} destroyed",
            self.added, self.changed, self.removed
        );
        if self.forgotten > 0 {
            let _ = write!(line, ", {} forgotten", self.forgotten);
        }
        line.push('.');
        line
    }

    /// The line printed when a plan finishes. Replacements count both as an
    /// addition and as a destruction.
    #[must_use]
    pub fn plan_summary(&self) -> String {
        format!(
            "Plan: {} to add, {} to change, {} to destroy.",
            self.to_add + self.to_remove_and_add,
            self.to_change,
            self.to_remove + self.to_remove_and_add
        )
    }

    /// Returns true if the plan phase found nothing to do.
    #[must_use]
    pub const fn plan_is_empty(&self) -> bool {
        self.to_add == 0 && self.to_change == 0 && self.to_remove == 0 && self.to_remove_and_add == 0
    }
}

#[derive(Debug, Default)]
struct CounterState {
    counts: ChangeCounts,
    pending: HashMap<ResourceInstanceAddr, ChangeAction>,
}

/// Hook that counts confirmed and planned resource changes.
///
/// An applied change is only counted once its `post_apply` reports success;
/// the action is remembered from `pre_apply` so the right bucket can be
/// chosen. Data and ephemeral resources never contribute to any count.
#[derive(Debug, Default)]
pub struct ChangeCounter {
    state: Mutex<CounterState>,
}

impl ChangeCounter {
    /// Creates a counter with every count at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes every count and forgets pending actions.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.counts = ChangeCounts::default();
        state.pending.clear();
    }

    /// Returns a snapshot of the current counts.
    #[must_use]
    pub fn counts(&self) -> ChangeCounts {
        self.state.lock().counts
    }

    /// Number of applies that have started but not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }
}

const fn counted(addr: &ResourceInstanceAddr) -> bool {
    !(addr.is_data() || addr.is_ephemeral())
}

impl Hook for ChangeCounter {
    fn pre_apply(
        &self,
        addr: &ResourceInstanceAddr,
        action: ChangeAction,
        _prior_state: &Value,
        _planned_new_state: &Value,
    ) -> HookResult {
        if counted(addr) {
            self.state.lock().pending.insert(addr.clone(), action);
        }
        Ok(HookAction::Continue)
    }

    fn post_apply(
        &self,
        addr: &ResourceInstanceAddr,
        _new_state: &Value,
        error: Option<&dyn Error>,
    ) -> HookResult {
        let mut state = self.state.lock();
        let Some(action) = state.pending.remove(addr) else {
            debug!("post_apply for {addr} without a pending action");
            return Ok(HookAction::Continue);
        };

        if error.is_some() {
            return Ok(HookAction::Continue);
        }

        let counts = &mut state.counts;
        match action {
            ChangeAction::Create => counts.added += 1,
            ChangeAction::Delete => counts.removed += 1,
            ChangeAction::Update => counts.changed += 1,
            ChangeAction::CreateThenDelete | ChangeAction::DeleteThenCreate => {
                counts.added += 1;
                counts.removed += 1;
            }
            ChangeAction::Read | ChangeAction::NoOp => {}
        }

        Ok(HookAction::Continue)
    }

    fn post_diff(
        &self,
        addr: &ResourceInstanceAddr,
        action: ChangeAction,
        _prior_state: &Value,
        _planned_new_state: &Value,
    ) -> HookResult {
        if !counted(addr) {
            return Ok(HookAction::Continue);
        }

        let counts = &mut self.state.lock().counts;
        match action {
            ChangeAction::CreateThenDelete | ChangeAction::DeleteThenCreate => {
                counts.to_remove_and_add += 1;
            }
            ChangeAction::Create => counts.to_add += 1,
            ChangeAction::Delete => counts.to_remove += 1,
            ChangeAction::Update => counts.to_change += 1,
            ChangeAction::Read | ChangeAction::NoOp => {}
        }

        Ok(HookAction::Continue)
    }

    fn post_apply_import(&self, _addr: &ResourceInstanceAddr, _import_id: &str) -> HookResult {
        self.state.lock().counts.imported += 1;
        Ok(HookAction::Continue)
    }

    fn post_apply_forget(&self, _addr: &ResourceInstanceAddr) -> HookResult {
        self.state.lock().counts.forgotten += 1;
        Ok(HookAction::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalkError;
    use std::sync::Arc;

    fn apply(counter: &ChangeCounter, addr: &ResourceInstanceAddr, action: ChangeAction) {
        counter
            .pre_apply(addr, action, &Value::Null, &Value::Null)
            .unwrap();
        counter.post_apply(addr, &Value::Null, None).unwrap();
    }

    #[test]
    fn test_create_counts_added() {
        let counter = ChangeCounter::new();
        let addr = ResourceInstanceAddr::managed("test_instance", "a");

        apply(&counter, &addr, ChangeAction::Create);

        let counts = counter.counts();
        assert_eq!(counts.added, 1);
        assert_eq!(counts.changed, 0);
        assert_eq!(counts.removed, 0);
        assert_eq!(counter.pending(), 0);
    }

    #[test]
    fn test_replace_counts_added_and_removed() {
        for action in [ChangeAction::CreateThenDelete, ChangeAction::DeleteThenCreate] {
            let counter = ChangeCounter::new();
            let addr = ResourceInstanceAddr::managed("test_instance", "a");

            apply(&counter, &addr, action);

            let counts = counter.counts();
            assert_eq!(counts.added, 1);
            assert_eq!(counts.removed, 1);
            assert_eq!(counts.changed, 0);
        }
    }

    #[test]
    fn test_update_and_delete() {
        let counter = ChangeCounter::new();
        apply(&counter, &ResourceInstanceAddr::managed("test_instance", "a"), ChangeAction::Update);
        apply(&counter, &ResourceInstanceAddr::managed("test_instance", "b"), ChangeAction::Delete);
        apply(&counter, &ResourceInstanceAddr::managed("test_instance", "c"), ChangeAction::NoOp);

        let counts = counter.counts();
        assert_eq!(counts.changed, 1);
        assert_eq!(counts.removed, 1);
        assert_eq!(counts.added, 0);
    }

    #[test]
    fn test_error_counts_nothing_and_clears_pending() {
        let counter = ChangeCounter::new();
        let addr = ResourceInstanceAddr::managed("test_instance", "a");
        let failure = WalkError::operation(addr.to_string(), "provider was sad");

        counter
            .pre_apply(&addr, ChangeAction::Create, &Value::Null, &Value::Null)
            .unwrap();
        counter.post_apply(&addr, &Value::Null, Some(&failure)).unwrap();

        assert_eq!(counter.counts(), ChangeCounts::default());
        assert_eq!(counter.pending(), 0);

        // A retry after the failure is attributed on its own.
        apply(&counter, &addr, ChangeAction::Create);
        assert_eq!(counter.counts().added, 1);
    }

    #[test]
    fn test_post_apply_without_pending_is_ignored() {
        let counter = ChangeCounter::new();
        let addr = ResourceInstanceAddr::managed("test_instance", "a");

        let action = counter.post_apply(&addr, &Value::Null, None).unwrap();

        assert_eq!(action, HookAction::Continue);
        assert_eq!(counter.counts(), ChangeCounts::default());
    }

    #[test]
    fn test_data_and_ephemeral_are_never_pending() {
        let counter = ChangeCounter::new();
        for addr in [
            ResourceInstanceAddr::data("test_data_source", "d"),
            ResourceInstanceAddr::ephemeral("test_instance", "e"),
        ] {
            counter
                .pre_apply(&addr, ChangeAction::Read, &Value::Null, &Value::Null)
                .unwrap();
        }
        assert_eq!(counter.pending(), 0);
    }

    #[test]
    fn test_post_diff_buckets() {
        let counter = ChangeCounter::new();
        let actions = [
            ChangeAction::Create,
            ChangeAction::Create,
            ChangeAction::Update,
            ChangeAction::Delete,
            ChangeAction::DeleteThenCreate,
            ChangeAction::NoOp,
        ];
        for (i, action) in actions.into_iter().enumerate() {
            let addr = ResourceInstanceAddr::managed("test_instance", format!("r{i}"));
            counter
                .post_diff(&addr, action, &Value::Null, &Value::Null)
                .unwrap();
        }

        let counts = counter.counts();
        assert_eq!(counts.to_add, 2);
        assert_eq!(counts.to_change, 1);
        assert_eq!(counts.to_remove, 1);
        assert_eq!(counts.to_remove_and_add, 1);
        assert_eq!(counts.plan_summary(), "Plan: 3 to add, 1 to change, 2 to destroy.");
    }

    #[test]
    fn test_post_diff_skips_data_and_ephemeral() {
        let counter = ChangeCounter::new();
        for action in [ChangeAction::Create, ChangeAction::Update, ChangeAction::Delete] {
            counter
                .post_diff(
                    &ResourceInstanceAddr::data("test_data_source", "d"),
                    action,
                    &Value::Null,
                    &Value::Null,
                )
                .unwrap();
            counter
                .post_diff(
                    &ResourceInstanceAddr::ephemeral("test_instance", "e"),
                    action,
                    &Value::Null,
                    &Value::Null,
                )
                .unwrap();
        }
        assert!(counter.counts().plan_is_empty());
    }

    #[test]
    fn test_import_forget_and_summary() {
        let counter = ChangeCounter::new();
        let addr = ResourceInstanceAddr::managed("test_instance", "a");

        counter.post_apply_import(&addr, "i-123").unwrap();
        counter.post_apply_forget(&addr).unwrap();
        apply(&counter, &addr, ChangeAction::Create);

        assert_eq!(
            counter.counts().apply_summary(),
            "Apply complete! Resources: 1 imported, 1 added, 0 changed, 0 destroyed, 1 forgotten."
        );
    }

    #[test]
    fn test_reset() {
        let counter = ChangeCounter::new();
        let addr = ResourceInstanceAddr::managed("test_instance", "a");
        apply(&counter, &addr, ChangeAction::Create);
        counter
            .pre_apply(&addr, ChangeAction::Delete, &Value::Null, &Value::Null)
            .unwrap();

        counter.reset();

        assert_eq!(counter.counts(), ChangeCounts::default());
        assert_eq!(counter.pending(), 0);
        assert_eq!(
            counter.counts().apply_summary(),
            "Apply complete! Resources: 0 added, 0 changed, 0 destroyed."
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_applies() {
        let counter = Arc::new(ChangeCounter::new());
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let addr = ResourceInstanceAddr::managed("test_instance", format!("r{i}"));
                    let action = if i % 2 == 0 {
                        ChangeAction::Create
                    } else {
                        ChangeAction::Update
                    };
                    apply(&counter, &addr, action);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let counts = counter.counts();
        assert_eq!(counts.added, 50);
        assert_eq!(counts.changed, 50);
        assert_eq!(counter.pending(), 0);
    }
}
