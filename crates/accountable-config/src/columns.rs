//! Stamp column name mapping.

use accountable_core::StampRole;
use serde::{Deserialize, Serialize};

fn default_created_by() -> String {
    StampRole::CreatedBy.default_column().to_string()
}

fn default_updated_by() -> String {
    StampRole::UpdatedBy.default_column().to_string()
}

fn default_deleted_by() -> String {
    StampRole::DeletedBy.default_column().to_string()
}

/// Maps each stamp role to the column that stores it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnNames {
    #[serde(default = "default_created_by")]
    pub created_by: String,

    #[serde(default = "default_updated_by")]
    pub updated_by: String,

    #[serde(default = "default_deleted_by")]
    pub deleted_by: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            created_by: default_created_by(),
            updated_by: default_updated_by(),
            deleted_by: default_deleted_by(),
        }
    }
}

impl ColumnNames {
    /// Column configured for `role`.
    #[must_use]
    pub fn column_for(&self, role: StampRole) -> &str {
        match role {
            StampRole::CreatedBy => &self.created_by,
            StampRole::UpdatedBy => &self.updated_by,
            StampRole::DeletedBy => &self.deleted_by,
        }
    }
}

/// Whether `name` is safe to splice into SQL as a bare identifier.
///
/// Accepts ASCII letters, digits and underscores, not starting with a digit.
#[must_use]
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_role_names() {
        let columns = ColumnNames::default();
        for role in StampRole::ALL {
            assert_eq!(columns.column_for(role), role.as_str());
        }
    }

    #[rstest]
    #[case("created_by", true)]
    #[case("_hidden", true)]
    #[case("col2", true)]
    #[case("", false)]
    #[case("2col", false)]
    #[case("created by", false)]
    #[case("x\"; DROP TABLE users; --", false)]
    fn identifier_check(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_sql_identifier(name), valid);
    }
}
