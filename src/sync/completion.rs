//! Multi-key completion barrier.
//!
//! A [`CompletionTracker`] records which keys have completed and hands out
//! [`CompletionWaiter`]s that resolve once every key of a requested subset
//! has been reported. Keys may be reported before anyone waits on them, and
//! the subset a waiter asks for is decided at the time it is created, which
//! makes the tracker suitable for dependency waits in a graph walk where
//! each node knows only its own dependencies.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Tracks completion of keys and notifies waiters for subsets of them.
#[derive(Debug)]
pub struct CompletionTracker<K> {
    state: Mutex<TrackerState<K>>,
}

#[derive(Debug)]
struct TrackerState<K> {
    completed: HashSet<K>,
    waiters: Vec<PendingWaiter<K>>,
}

#[derive(Debug)]
struct PendingWaiter<K> {
    remaining: HashSet<K>,
    notify: oneshot::Sender<()>,
}

impl<K> Default for CompletionTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> CompletionTracker<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a tracker with no completed keys.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                completed: HashSet::new(),
                waiters: Vec::new(),
            }),
        }
    }

    /// Marks `key` as complete.
    ///
    /// Reporting the same key again has no effect. Every waiter whose last
    /// outstanding key this was is notified before the call returns.
    pub fn report_completion(&self, key: K) {
        let mut state = self.state.lock();
        if state.completed.contains(&key) {
            return;
        }

        let waiters = std::mem::take(&mut state.waiters);
        for mut waiter in waiters {
            if waiter.notify.is_closed() {
                continue;
            }
            waiter.remaining.remove(&key);
            if waiter.remaining.is_empty() {
                let _ = waiter.notify.send(());
            } else {
                state.waiters.push(waiter);
            }
        }

        state.completed.insert(key);
    }

    /// Returns a waiter that resolves once every key in `keys` is complete.
    ///
    /// Keys that are already complete are ignored, so a waiter for an empty
    /// or fully-complete set is ready immediately.
    pub fn new_waiter_for<I>(&self, keys: I) -> CompletionWaiter
    where
        I: IntoIterator<Item = K>,
    {
        let mut state = self.state.lock();
        let remaining: HashSet<K> = keys
            .into_iter()
            .filter(|key| !state.completed.contains(key))
            .collect();

        if remaining.is_empty() {
            return CompletionWaiter::ready();
        }

        let (notify, rx) = oneshot::channel();
        state.waiters.push(PendingWaiter { remaining, notify });
        CompletionWaiter { rx: Some(rx) }
    }

    /// Returns true if `key` has been reported complete.
    pub fn is_complete(&self, key: &K) -> bool {
        self.state.lock().completed.contains(key)
    }

    /// Number of waiters still waiting on at least one key.
    pub fn pending_waiters(&self) -> usize {
        self.state
            .lock()
            .waiters
            .iter()
            .filter(|w| !w.notify.is_closed())
            .count()
    }
}

/// Completion signal for a subset of keys.
///
/// Resolves exactly once, when the last key of its subset is reported. If
/// the tracker is dropped first the waiter stays pending forever.
#[derive(Debug)]
#[must_use = "a waiter does nothing unless awaited or polled"]
pub struct CompletionWaiter {
    // None once the signal has been observed (or was never needed).
    rx: Option<oneshot::Receiver<()>>,
}

impl CompletionWaiter {
    const fn ready() -> Self {
        Self { rx: None }
    }

    /// Returns true if every key of the subset has completed.
    pub fn is_complete(&mut self) -> bool {
        let Some(rx) = self.rx.as_mut() else {
            return true;
        };
        match rx.try_recv() {
            Ok(()) => {
                self.rx = None;
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => false,
        }
    }

    /// Blocks the current thread until the subset is complete.
    ///
    /// Must not be called from within an async context.
    pub fn wait_blocking(mut self) {
        if let Some(rx) = self.rx.take() {
            if rx.blocking_recv().is_err() {
                // Tracker dropped with keys outstanding: never completes.
                loop {
                    std::thread::park();
                }
            }
        }
    }
}

impl Future for CompletionWaiter {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(());
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(())) => {
                self.rx = None;
                Poll::Ready(())
            }
            Poll::Ready(Err(_)) | Poll::Pending => Poll::Pending,
        }
    }
}
