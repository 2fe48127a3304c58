//! Stamp roles, lifecycle events, and delete modes.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// StampRole
// ---------------------------------------------------------------------------

/// Logical role of an actor stamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StampRole {
    CreatedBy,
    UpdatedBy,
    DeletedBy,
}

impl StampRole {
    pub const ALL: [Self; 3] = [Self::CreatedBy, Self::UpdatedBy, Self::DeletedBy];

    /// Return the role name, which is also the default column name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedBy => "created_by",
            Self::UpdatedBy => "updated_by",
            Self::DeletedBy => "deleted_by",
        }
    }

    /// Column used when configuration does not override this role.
    #[must_use]
    pub const fn default_column(self) -> &'static str {
        self.as_str()
    }

    pub(crate) const fn bit(self) -> u8 {
        match self {
            Self::CreatedBy => 0b001,
            Self::UpdatedBy => 0b010,
            Self::DeletedBy => 0b100,
        }
    }
}

impl fmt::Display for StampRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StampRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown stamp role '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Points in a record's lifecycle at which observers are invoked.
///
/// ```text
/// creating → INSERT → created
/// updating → UPDATE → updated
/// deleting → UPDATE deleted_at | DELETE → deleted
/// restoring → updating → UPDATE → updated → restored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
    Restoring,
    Restored,
}

impl LifecycleEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Created => "created",
            Self::Updating => "updating",
            Self::Updated => "updated",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Restoring => "restoring",
            Self::Restored => "restored",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DeleteMode
// ---------------------------------------------------------------------------

/// How a delete reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Row kept, deletion timestamp set.
    Soft,
    /// Row removed.
    Force,
}

impl DeleteMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Force => "force",
        }
    }
}

impl fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StampRole::CreatedBy, "created_by")]
    #[case(StampRole::UpdatedBy, "updated_by")]
    #[case(StampRole::DeletedBy, "deleted_by")]
    fn role_parses_its_own_name(#[case] role: StampRole, #[case] name: &str) {
        assert_eq!(role.as_str(), name);
        assert_eq!(role.default_column(), name);
        assert_eq!(name.parse::<StampRole>().unwrap(), role);
        assert_eq!(
            serde_json::to_value(role).unwrap(),
            serde_json::Value::String(name.to_string())
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "owner_id".parse::<StampRole>().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
