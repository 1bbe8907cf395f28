//! Hook callbacks and the hooks that track walk progress.
//!
//! A walker calls the [`Hook`] methods at every lifecycle point of every
//! resource operation, from many tasks at once. The [`ChangeCounter`] and
//! [`ProgressEmitter`] are usually registered together through a
//! [`HookSet`].

mod clock;
mod composite;
mod count;
mod hook;
mod progress;

pub use clock::{Clock, ManualClock, SystemClock};
pub use composite::HookSet;
pub use count::{ChangeCounter, ChangeCounts};
pub use hook::{Hook, HookAction, HookResult};
pub use progress::{HeartbeatObserver, ProgressEmitter, DEFAULT_HEARTBEAT_INTERVAL};
