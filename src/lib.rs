// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # tofu-progress
//!
//! Concurrent progress tracking for infrastructure apply walks.
//!
//! ## Overview
//!
//! While a walk applies many resources at once, every resource operation
//! reports through a set of hook callbacks. This crate provides:
//!
//! - A [`CompletionTracker`] that lets callers wait for a set of keys to be
//!   reported complete
//! - A [`ChangeCounter`] hook that tallies what an apply or plan did
//! - A [`ProgressEmitter`] hook that turns callbacks into progress events,
//!   with periodic heartbeats for long-running operations
//! - Event sinks writing JSON lines or human-readable text
//! - A replay walker and CLI driving the hooks from a YAML walk script
//!
//! ## Modules
//!
//! - [`addrs`]: Resource instance addresses
//! - [`planner`]: Change actions and their wording
//! - [`sync`]: Completion tracking
//! - [`hooks`]: Hook trait, counter, progress emitter and clocks
//! - [`events`]: Progress events and sinks
//! - [`config`]: Walk script parsing and validation
//! - [`walker`]: Replay walker
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! name: demo
//! parallelism: 4
//! resources:
//!   - address: aws_instance.web
//!     action: create
//!     duration_ms: 25000
//!     id: i-abc123
//!   - address: aws_eip.web
//!     action: create
//!     depends_on: [aws_instance.web]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod addrs;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod hooks;
pub mod planner;
pub mod sync;
pub mod walker;

// ============================================================================
// Re-exports
// ============================================================================

pub use addrs::ResourceInstanceAddr;
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ScriptParser, ScriptValidator, WalkScript};
pub use error::{ProgressError, Result};
pub use events::{EventSink, HookEvent, HumanSink, JsonLinesSink, MemorySink};
pub use hooks::{ChangeCounter, ChangeCounts, Hook, HookAction, HookSet, ProgressEmitter};
pub use planner::ChangeAction;
pub use sync::{CompletionTracker, CompletionWaiter};
pub use walker::{WalkExecutor, WalkReport};
