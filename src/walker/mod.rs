//! Replay walker.
//!
//! Stands in for the real graph walk: it drives the hook callbacks in
//! dependency order, concurrently, exactly as a walk would.

mod executor;

pub use executor::{FailedResource, WalkExecutor, WalkMode, WalkReport};
