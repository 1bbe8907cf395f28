//! Planning vocabulary shared by the hooks and the walker.
//!
//! This module defines the change actions a plan can assign to a resource
//! instance and the verbs and nouns used to describe them.

mod action;

pub use action::ChangeAction;
