//! Coordination primitives for concurrent walks.

mod completion;

pub use completion::{CompletionTracker, CompletionWaiter};
