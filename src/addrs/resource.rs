//! Address types and their canonical rendering.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AddressError;

/// How a resource is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ResourceMode {
    /// A `resource` block: created, updated and destroyed by apply.
    #[default]
    Managed,
    /// A `data` block: read only.
    Data,
    /// An `ephemeral` block: opened, renewed and closed, never stored.
    Ephemeral,
}

/// The key selecting one instance of a multi-instance resource or module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum InstanceKey {
    /// A `count` index.
    Int(i64),
    /// A `for_each` key.
    Str(String),
}

/// One `module.NAME[KEY]` step of a module instance path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleInstanceStep {
    /// Module call name.
    pub name: String,
    /// Instance key, if the call uses `count` or `for_each`.
    pub key: Option<InstanceKey>,
}

/// Absolute address of a single resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceInstanceAddr {
    /// Module instance path; empty for the root module.
    pub module: Vec<ModuleInstanceStep>,
    /// Resource mode.
    pub mode: ResourceMode,
    /// Resource type, e.g. `aws_instance`.
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Instance key, if any.
    pub key: Option<InstanceKey>,
}

impl ResourceInstanceAddr {
    /// Creates an unkeyed managed resource address in the root module.
    #[must_use]
    pub fn managed(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ResourceMode::Managed, resource_type, name)
    }

    /// Creates an unkeyed data resource address in the root module.
    #[must_use]
    pub fn data(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ResourceMode::Data, resource_type, name)
    }

    /// Creates an unkeyed ephemeral resource address in the root module.
    #[must_use]
    pub fn ephemeral(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ResourceMode::Ephemeral, resource_type, name)
    }

    fn new(mode: ResourceMode, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: Vec::new(),
            mode,
            resource_type: resource_type.into(),
            name: name.into(),
            key: None,
        }
    }

    /// Sets the instance key.
    #[must_use]
    pub fn with_key(mut self, key: InstanceKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Places the address inside the given module instance path.
    #[must_use]
    pub fn in_module(mut self, module: Vec<ModuleInstanceStep>) -> Self {
        self.module = module;
        self
    }

    /// Returns true for data resources.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self.mode, ResourceMode::Data)
    }

    /// Returns true for ephemeral resources.
    #[must_use]
    pub const fn is_ephemeral(&self) -> bool {
        matches!(self.mode, ResourceMode::Ephemeral)
    }

    /// Returns true for managed resources.
    #[must_use]
    pub const fn is_managed(&self) -> bool {
        matches!(self.mode, ResourceMode::Managed)
    }

    /// Provider type implied by the resource type: everything before the
    /// first underscore.
    #[must_use]
    pub fn implied_provider(&self) -> &str {
        self.resource_type
            .split_once('_')
            .map_or(self.resource_type.as_str(), |(provider, _)| provider)
    }

    /// Module instance path, `""` for the root module.
    #[must_use]
    pub fn module_path(&self) -> String {
        self.module
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The resource part of the address, without module path or instance key.
    #[must_use]
    pub fn resource_path(&self) -> String {
        match self.mode {
            ResourceMode::Managed => format!("{}.{}", self.resource_type, self.name),
            ResourceMode::Data => format!("data.{}.{}", self.resource_type, self.name),
            ResourceMode::Ephemeral => format!("ephemeral.{}.{}", self.resource_type, self.name),
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(index) => write!(f, "[{index}]"),
            Self::Str(key) => {
                f.write_str("[\"")?;
                for c in key.chars() {
                    if matches!(c, '"' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"]")
            }
        }
    }
}

impl fmt::Display for ModuleInstanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module.{}", self.name)?;
        if let Some(key) = &self.key {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ResourceInstanceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.module {
            write!(f, "{step}.")?;
        }
        f.write_str(&self.resource_path())?;
        if let Some(key) = &self.key {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for ResourceInstanceAddr {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceInstanceAddr> for String {
    fn from(addr: ResourceInstanceAddr) -> Self {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_root_managed() {
        let addr = ResourceInstanceAddr::managed("test_instance", "boop");
        assert_eq!(addr.to_string(), "test_instance.boop");
        assert_eq!(addr.module_path(), "");
        assert_eq!(addr.implied_provider(), "test");
    }

    #[test]
    fn test_display_nested_keyed() {
        let addr = ResourceInstanceAddr::data("aws_ami", "ubuntu")
            .with_key(InstanceKey::Int(2))
            .in_module(vec![
                ModuleInstanceStep {
                    name: String::from("network"),
                    key: Some(InstanceKey::Str(String::from("eu"))),
                },
                ModuleInstanceStep {
                    name: String::from("inner"),
                    key: None,
                },
            ]);

        assert_eq!(
            addr.to_string(),
            "module.network[\"eu\"].module.inner.data.aws_ami.ubuntu[2]"
        );
        assert_eq!(addr.module_path(), "module.network[\"eu\"].module.inner");
        assert_eq!(addr.resource_path(), "data.aws_ami.ubuntu");
        assert!(addr.is_data());
    }

    #[test]
    fn test_string_key_escaping() {
        let key = InstanceKey::Str(String::from("a\"b"));
        assert_eq!(key.to_string(), "[\"a\\\"b\"]");
    }

    #[test]
    fn test_implied_provider_without_underscore() {
        let addr = ResourceInstanceAddr::ephemeral("random", "pw");
        assert_eq!(addr.implied_provider(), "random");
        assert_eq!(addr.to_string(), "ephemeral.random.pw");
    }
}
