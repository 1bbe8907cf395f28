//! Walk script validation.
//!
//! Checks that a script describes a walk that can actually run: addresses
//! are unique, dependencies exist and form no cycle, and the options a
//! resource uses make sense for its mode.

use crate::addrs::ResourceInstanceAddr;
use crate::error::{ConfigError, ProgressError, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::spec::{ResourceStep, WalkScript};

/// Validator for walk scripts.
#[derive(Debug, Default)]
pub struct ScriptValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ScriptValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a walk script.
    ///
    /// # Errors
    ///
    /// Returns the first problem found. Duplicate addresses, unknown
    /// dependencies and cycles get their own error variants.
    pub fn validate(&self, script: &WalkScript) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_options(script, &mut result);
        Self::validate_resources(&script.resources, &mut result);

        if !result.errors.is_empty() {
            let first_error = &result.errors[0];
            return Err(ProgressError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }));
        }

        Self::check_addresses(&script.resources)?;
        Self::check_cycles(&script.resources)?;

        debug!("Walk script validation passed");
        Ok(result)
    }

    fn validate_options(script: &WalkScript, result: &mut ValidationResult) {
        if script.parallelism == 0 {
            result.errors.push(ValidationError {
                field: String::from("parallelism"),
                message: String::from("Parallelism must be at least 1"),
            });
        }

        if script.heartbeat_interval_secs == 0 {
            result.errors.push(ValidationError {
                field: String::from("heartbeat_interval_secs"),
                message: String::from("Heartbeat interval must be at least 1 second"),
            });
        }

        if script.resources.is_empty() {
            result
                .warnings
                .push(String::from("No resources defined in walk script"));
        }
    }

    fn validate_resources(resources: &[ResourceStep], result: &mut ValidationResult) {
        for (i, step) in resources.iter().enumerate() {
            let prefix = format!("resources[{i}]");

            if !step.address.is_managed() {
                let mode_only = [
                    (!step.provisioners.is_empty(), "provisioners"),
                    (step.import_id.is_some(), "import_id"),
                    (step.forget, "forget"),
                ];
                for (_, field) in mode_only.iter().filter(|(set, _)| *set) {
                    result.errors.push(ValidationError {
                        field: format!("{prefix}.{field}"),
                        message: format!(
                            "{} is not a managed resource and cannot use {field}",
                            step.address
                        ),
                    });
                }
            }

            if step.address.is_managed()
                && !step.provisioners.is_empty()
                && !step.runs_provisioners()
            {
                result.warnings.push(format!(
                    "{}: provisioners never run for action {}",
                    step.address, step.action
                ));
            }

            if step.depends_on.contains(&step.address) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.depends_on"),
                    message: format!("{} depends on itself", step.address),
                });
            }
        }
    }

    fn check_addresses(resources: &[ResourceStep]) -> Result<()> {
        let mut seen: HashSet<&ResourceInstanceAddr> = HashSet::new();
        for step in resources {
            if !seen.insert(&step.address) {
                return Err(ProgressError::Config(ConfigError::DuplicateAddress {
                    address: step.address.to_string(),
                }));
            }
        }

        for step in resources {
            if let Some(dependency) = step.depends_on.iter().find(|d| !seen.contains(d)) {
                return Err(ProgressError::Config(ConfigError::UnknownDependency {
                    address: step.address.to_string(),
                    dependency: dependency.to_string(),
                }));
            }
        }

        Ok(())
    }

    fn check_cycles(resources: &[ResourceStep]) -> Result<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            addr: &'a ResourceInstanceAddr,
            graph: &HashMap<&'a ResourceInstanceAddr, &'a [ResourceInstanceAddr]>,
            marks: &mut HashMap<&'a ResourceInstanceAddr, Mark>,
            path: &mut Vec<&'a ResourceInstanceAddr>,
        ) -> Option<String> {
            match marks.get(addr) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|a| *a == addr).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(ToString::to_string).collect();
                    cycle.push(addr.to_string());
                    return Some(cycle.join(" -> "));
                }
                None => {}
            }

            marks.insert(addr, Mark::Visiting);
            path.push(addr);
            for dependency in graph.get(addr).copied().unwrap_or_default() {
                if let Some(cycle) = visit(dependency, graph, marks, path) {
                    return Some(cycle);
                }
            }
            path.pop();
            marks.insert(addr, Mark::Done);
            None
        }

        let graph: HashMap<&ResourceInstanceAddr, &[ResourceInstanceAddr]> = resources
            .iter()
            .map(|step| (&step.address, step.depends_on.as_slice()))
            .collect();
        let mut marks = HashMap::new();

        for step in resources {
            let mut path = Vec::new();
            if let Some(cycle) = visit(&step.address, &graph, &mut marks, &mut path) {
                return Err(ProgressError::Config(ConfigError::CircularDependency {
                    cycle,
                }));
            }
        }

        Ok(())
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
