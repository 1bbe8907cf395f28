//! Resource instance addresses.
//!
//! Every hook callback is keyed by the absolute address of one resource
//! instance. Addresses are comparable and hashable so they can be used as
//! map keys by the trackers, and they render to the canonical string form
//! used in every emitted event.

mod parse;
mod resource;

pub use resource::{InstanceKey, ModuleInstanceStep, ResourceInstanceAddr, ResourceMode};
