//! Planned change actions.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The change a plan requires for one resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Create a new object.
    Create,
    /// Update an object in place.
    Update,
    /// Destroy an object.
    Delete,
    /// Replace: create the new object before destroying the old one.
    CreateThenDelete,
    /// Replace: destroy the old object before creating the new one.
    DeleteThenCreate,
    /// Read a data source.
    Read,
    /// No change required.
    #[default]
    #[serde(alias = "noop")]
    NoOp,
}

impl ChangeAction {
    /// Returns true for both replace orderings.
    #[must_use]
    pub const fn is_replace(self) -> bool {
        matches!(self, Self::CreateThenDelete | Self::DeleteThenCreate)
    }

    /// Returns true if the action brings a new object into existence.
    #[must_use]
    pub const fn creates(self) -> bool {
        matches!(
            self,
            Self::Create | Self::CreateThenDelete | Self::DeleteThenCreate
        )
    }

    /// Wire name used in structured events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::CreateThenDelete | Self::DeleteThenCreate => "replace",
            Self::Read => "read",
            Self::NoOp => "noop",
        }
    }

    /// Verb used when the operation starts, e.g. "Creating".
    #[must_use]
    pub const fn start_verb(self) -> &'static str {
        match self {
            Self::Create => "Creating",
            Self::Update => "Modifying",
            Self::Delete => "Destroying",
            Self::CreateThenDelete | Self::DeleteThenCreate => "Replacing",
            Self::Read => "Reading",
            Self::NoOp => "Applying",
        }
    }

    /// Verb used in heartbeats, e.g. "Still creating...".
    #[must_use]
    pub const fn progress_verb(self) -> &'static str {
        match self {
            Self::Create => "creating",
            Self::Update => "modifying",
            Self::Delete => "destroying",
            Self::CreateThenDelete | Self::DeleteThenCreate => "replacing",
            Self::Read => "reading",
            Self::NoOp => "applying",
        }
    }

    /// Noun used on completion, e.g. "Creation complete after 3s".
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Create => "Creation",
            Self::Update => "Modifications",
            Self::Delete => "Destruction",
            Self::CreateThenDelete | Self::DeleteThenCreate => "Replacement",
            Self::Read => "Read",
            Self::NoOp => "Apply",
        }
    }

    /// Symbol used in plan listings.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Delete => "-",
            Self::CreateThenDelete => "+/-",
            Self::DeleteThenCreate => "-/+",
            Self::Read => "<=",
            Self::NoOp => " ",
        }
    }
}

impl Serialize for ChangeAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_serializes_as_replace() {
        let json = serde_json::to_string(&ChangeAction::DeleteThenCreate).unwrap();
        assert_eq!(json, "\"replace\"");
        assert_eq!(
            serde_json::to_string(&ChangeAction::CreateThenDelete).unwrap(),
            "\"replace\""
        );
    }

    #[test]
    fn test_deserialize_script_names() {
        let action: ChangeAction = serde_yaml::from_str("create_then_delete").unwrap();
        assert_eq!(action, ChangeAction::CreateThenDelete);

        let action: ChangeAction = serde_yaml::from_str("noop").unwrap();
        assert_eq!(action, ChangeAction::NoOp);

        let action: ChangeAction = serde_yaml::from_str("no_op").unwrap();
        assert_eq!(action, ChangeAction::NoOp);
    }

    #[test]
    fn test_creates() {
        assert!(ChangeAction::Create.creates());
        assert!(ChangeAction::DeleteThenCreate.creates());
        assert!(!ChangeAction::Update.creates());
        assert!(!ChangeAction::Read.creates());
    }
}
