//! Walk script configuration.
//!
//! This module handles everything about the scripts the replay walk runs:
//! - Parsing `walk.yaml` and applying environment overrides
//! - Validating addresses, dependencies and per-resource options

mod parser;
mod spec;
mod validator;

pub use parser::{
    find_script_file, ScriptParser, DEFAULT_SCRIPT_FILES, ENV_HEARTBEAT_SECS, ENV_PARALLELISM,
};
pub use spec::{
    ProvisionerStep, ResourceStep, WalkScript, DEFAULT_HEARTBEAT_INTERVAL_SECS,
    DEFAULT_PARALLELISM,
};
pub use validator::{ScriptValidator, ValidationError, ValidationResult};
