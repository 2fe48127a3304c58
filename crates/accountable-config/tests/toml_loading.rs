//! Integration tests for TOML and environment configuration loading.
//!
//! Uses `figment::Jail` for sandboxed files and env var manipulation.

use accountable_config::{AccountableConfig, ConfigError};
use accountable_core::StampRole;
use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

fn jail_figment() -> Figment {
    Figment::from(Serialized::defaults(AccountableConfig::default()))
        .merge(Toml::file("config.toml"))
        .merge(Env::prefixed("ACCOUNTABLE_").split("__"))
}

#[test]
fn loads_column_names_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[column_names]
created_by = "author_id"
updated_by = "editor_id"
deleted_by = "remover_id"
"#,
        )?;

        let config = AccountableConfig::from_figment(&jail_figment()).expect("config loads");

        assert_eq!(config.column_for(StampRole::CreatedBy), "author_id");
        assert_eq!(config.column_for(StampRole::UpdatedBy), "editor_id");
        assert_eq!(config.column_for(StampRole::DeletedBy), "remover_id");
        Ok(())
    });
}

#[test]
fn partial_toml_keeps_remaining_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[column_names]
created_by = "owner_id"

[user_model]
table = "accounts"
"#,
        )?;

        let config = AccountableConfig::from_figment(&jail_figment()).expect("config loads");

        assert_eq!(config.column_for(StampRole::CreatedBy), "owner_id");
        assert_eq!(config.column_for(StampRole::UpdatedBy), "updated_by");
        assert_eq!(config.column_for(StampRole::DeletedBy), "deleted_by");
        assert_eq!(config.user_model.table, "accounts");
        assert_eq!(config.user_model.primary_key, "id");
        Ok(())
    });
}

#[test]
fn env_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[column_names]
updated_by = "toml_editor"
"#,
        )?;
        jail.set_env("ACCOUNTABLE_COLUMN_NAMES__UPDATED_BY", "env_editor");
        jail.set_env("ACCOUNTABLE_USER_MODEL__PRIMARY_KEY", "uid");

        let config = AccountableConfig::from_figment(&jail_figment()).expect("config loads");

        assert_eq!(config.column_for(StampRole::UpdatedBy), "env_editor");
        assert_eq!(config.user_model.primary_key, "uid");
        Ok(())
    });
}

/// Strip host `ACCOUNTABLE_*` variables and point the user config dir into
/// the jail, so `load()` only sees files the test writes.
fn isolate_host(jail: &mut Jail) {
    jail.clear_env();
    let home = jail.directory().to_path_buf();
    jail.set_env("HOME", home.display());
    jail.set_env("XDG_CONFIG_HOME", home.join("xdg").display());
}

#[test]
fn load_reads_project_local_file() {
    Jail::expect_with(|jail| {
        isolate_host(jail);
        std::fs::create_dir_all(jail.directory().join(".accountable"))
            .map_err(|e| e.to_string())?;
        jail.create_file(
            ".accountable/config.toml",
            r#"
[column_names]
deleted_by = "trashed_by"
"#,
        )?;

        let config = AccountableConfig::load().expect("config loads");
        assert_eq!(config.column_for(StampRole::DeletedBy), "trashed_by");
        assert_eq!(config.column_for(StampRole::CreatedBy), "created_by");
        assert_eq!(config.user_model.table, "users");
        Ok(())
    });
}

#[cfg(target_os = "linux")]
#[test]
fn load_layers_project_file_over_user_file() {
    Jail::expect_with(|jail| {
        isolate_host(jail);
        std::fs::create_dir_all(jail.directory().join("xdg/accountable"))
            .map_err(|e| e.to_string())?;
        std::fs::create_dir_all(jail.directory().join(".accountable"))
            .map_err(|e| e.to_string())?;
        jail.create_file(
            "xdg/accountable/config.toml",
            r#"
[column_names]
created_by = "global_author"
updated_by = "global_editor"
"#,
        )?;
        jail.create_file(
            ".accountable/config.toml",
            r#"
[column_names]
updated_by = "local_editor"
"#,
        )?;

        let config = AccountableConfig::load().expect("config loads");
        assert_eq!(config.column_for(StampRole::CreatedBy), "global_author");
        assert_eq!(config.column_for(StampRole::UpdatedBy), "local_editor");
        Ok(())
    });
}

#[test]
fn invalid_column_from_env_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("ACCOUNTABLE_COLUMN_NAMES__CREATED_BY", "updated_by");

        let err = AccountableConfig::from_figment(&jail_figment()).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "column_names.updated_by"),
            "unexpected error: {err}"
        );
        Ok(())
    });
}

#[test]
fn malformed_toml_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[column_names\ncreated_by = ")?;

        let err = AccountableConfig::from_figment(&jail_figment()).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}
