//! User model configuration.

use serde::{Deserialize, Serialize};

fn default_table() -> String {
    "users".to_string()
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Table that stamp columns reference.
///
/// Relations built by the `Accountable` mixin load rows from this table,
/// matching the stored stamp against `primary_key`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserModelConfig {
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

impl Default for UserModelConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            primary_key: default_primary_key(),
        }
    }
}
