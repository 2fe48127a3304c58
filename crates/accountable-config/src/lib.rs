//! # accountable-config
//!
//! Layered configuration loading for Accountable using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`ACCOUNTABLE_*` prefix, `__` as separator)
//! 2. Project-level `.accountable/config.toml`
//! 3. User-level `~/.config/accountable/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `ACCOUNTABLE_COLUMN_NAMES__CREATED_BY` -> `column_names.created_by`,
//! `ACCOUNTABLE_USER_MODEL__TABLE` -> `user_model.table`, etc.
//!
//! The loaded value is immutable. Hand it to the record service at
//! construction; nothing in the workspace reads configuration globally.
//!
//! # Usage
//!
//! ```no_run
//! use accountable_config::AccountableConfig;
//! use accountable_core::StampRole;
//!
//! let config = AccountableConfig::load_with_dotenv().expect("config");
//! println!("creator column: {}", config.column_for(StampRole::CreatedBy));
//! ```

mod columns;
mod error;
mod user_model;

pub use columns::{ColumnNames, is_sql_identifier};
pub use error::ConfigError;
pub use user_model::UserModelConfig;

use accountable_core::StampRole;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountableConfig {
    #[serde(default)]
    pub column_names: ColumnNames,
    #[serde(default)]
    pub user_model: UserModelConfig,
}

impl AccountableConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need
    /// `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be parsed and
    /// `ConfigError::InvalidValue` if the merged values fail validation.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Extract and validate a config from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".accountable/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("ACCOUNTABLE_").split("__"))
    }

    /// Column configured for `role`.
    #[must_use]
    pub fn column_for(&self, role: StampRole) -> &str {
        self.column_names.column_for(role)
    }

    /// Check column names and the user model for values that cannot be
    /// used in SQL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in StampRole::ALL {
            let column = self.column_for(role);
            if !is_sql_identifier(column) {
                return Err(invalid(
                    format!("column_names.{role}"),
                    format!("'{column}' is not a valid column identifier"),
                ));
            }
        }

        for (i, a) in StampRole::ALL.iter().enumerate() {
            for b in &StampRole::ALL[i + 1..] {
                if self.column_for(*a) == self.column_for(*b) {
                    return Err(invalid(
                        format!("column_names.{b}"),
                        format!("'{}' is already used by {a}", self.column_for(*b)),
                    ));
                }
            }
        }

        if !is_sql_identifier(&self.user_model.table) {
            return Err(invalid(
                "user_model.table".to_string(),
                format!("'{}' is not a valid table identifier", self.user_model.table),
            ));
        }
        if !is_sql_identifier(&self.user_model.primary_key) {
            return Err(invalid(
                "user_model.primary_key".to_string(),
                format!(
                    "'{}' is not a valid column identifier",
                    self.user_model.primary_key
                ),
            ));
        }

        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("accountable").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) or current dir looking
    /// for a `.env` file. Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

const fn invalid(field: String, reason: String) -> ConfigError {
    ConfigError::InvalidValue { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = AccountableConfig::default();
        config.validate().unwrap();
        assert_eq!(config.column_for(StampRole::CreatedBy), "created_by");
        assert_eq!(config.column_for(StampRole::UpdatedBy), "updated_by");
        assert_eq!(config.column_for(StampRole::DeletedBy), "deleted_by");
        assert_eq!(config.user_model.table, "users");
    }

    #[test]
    fn figment_builds_without_files() {
        let config = AccountableConfig::from_figment(&AccountableConfig::figment())
            .expect("should extract defaults");
        assert_eq!(config.column_names, ColumnNames::default());
    }

    #[test]
    fn rejects_duplicate_columns() {
        let mut config = AccountableConfig::default();
        config.column_names.deleted_by = "updated_by".to_string();
        let err = config.validate().unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => {
                assert_eq!(field, "column_names.deleted_by");
            }
            other @ ConfigError::Figment(_) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_non_identifier_column() {
        let mut config = AccountableConfig::default();
        config.column_names.created_by = "created by".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "column_names.created_by"
        ));
    }

    #[test]
    fn rejects_empty_user_table() {
        let mut config = AccountableConfig::default();
        config.user_model.table = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "user_model.table"
        ));
    }
}
