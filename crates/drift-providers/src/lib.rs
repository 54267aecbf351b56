//! SQL backends for drift.
//!
//! Each provider supplies pool construction and its dialect's DDL/DML
//! strings; the transaction flow itself is shared (see `changeset`).

mod changeset;
mod mysql;
mod postgres;

pub use mysql::MySqlProvider;
pub use postgres::PostgresProvider;

use drift_core::{ConfigMap, Error, ProviderRegistry, Result};

/// Registry with the built-in backends registered under their dialect
/// names.
pub fn default_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    registry.register("postgres", PostgresProvider::from_config);
    registry.register("mysql", MySqlProvider::from_config);
    registry
}

/// Resolve the connection string: the `url` config key first, then the
/// backend's environment variable.
pub(crate) fn connection_url(config: &ConfigMap, env_var: &str) -> Result<String> {
    if let Some(url) = config.string("url") {
        return Ok(url.to_string());
    }

    std::env::var(env_var).map_err(|_| {
        Error::Config(format!(
            "No connection string: set the 'url' config key or the {} environment variable",
            env_var
        ))
    })
}

/// Resolve the history table name, validating it is a bare identifier.
/// The name is interpolated into DDL, so anything else is rejected.
pub(crate) fn history_table(config: &ConfigMap, default: &str) -> Result<String> {
    let name = config.string("history_table").unwrap_or(default);

    if !is_bare_identifier(name) {
        return Err(Error::Config(format!(
            "Invalid history table name: '{}'",
            name
        )));
    }

    Ok(name.to_string())
}

fn is_bare_identifier(name: &str) -> bool {
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

    fn config(yaml: &str) -> ConfigMap {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_default_registry_resolves_both_backends() {
        let registry = default_registry();

        let pg = config("url: postgres://localhost/app");
        assert!(registry.resolve("postgres", &pg).is_ok());

        let my = config("url: mysql://localhost/app");
        assert!(registry.resolve("mysql", &my).is_ok());
    }

    #[test]
    fn test_default_registry_rejects_unknown() {
        let registry = default_registry();
        let err = registry
            .resolve("sqlite", &ConfigMap::default())
            .err()
            .expect("resolution should fail");
        assert!(matches!(err, Error::UnknownProvider(_)));
    }

    #[test]
    fn test_connection_url_prefers_config_key() {
        std::env::set_var("DRIFT_TEST_URL_A", "postgres://env/app");

        let url = connection_url(&config("url: postgres://config/app"), "DRIFT_TEST_URL_A");
        assert_eq!(url.unwrap(), "postgres://config/app");

        std::env::remove_var("DRIFT_TEST_URL_A");
    }

    #[test]
    fn test_connection_url_falls_back_to_env() {
        std::env::set_var("DRIFT_TEST_URL_B", "postgres://env/app");

        let url = connection_url(&ConfigMap::default(), "DRIFT_TEST_URL_B");
        assert_eq!(url.unwrap(), "postgres://env/app");

        std::env::remove_var("DRIFT_TEST_URL_B");
    }

    #[test]
    fn test_connection_url_missing_is_config_error() {
        let err = connection_url(&ConfigMap::default(), "DRIFT_TEST_URL_UNSET").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_history_table_default_and_override() {
        assert_eq!(
            history_table(&ConfigMap::default(), "drift_migrations").unwrap(),
            "drift_migrations"
        );
        assert_eq!(
            history_table(&config("history_table: schema_history"), "drift_migrations").unwrap(),
            "schema_history"
        );
    }

    #[test]
    fn test_history_table_rejects_non_identifiers() {
        for bad in ["", "1table", "his tory", "t;DROP TABLE users", "a-b"] {
            let yaml = format!("history_table: '{}'", bad);
            let err = history_table(&config(&yaml), "drift_migrations").unwrap_err();
            assert!(matches!(err, Error::Config(_)), "accepted: {:?}", bad);
        }
    }

    #[test]
    fn test_history_table_accepts_leading_underscore() {
        assert_eq!(
            history_table(&config("history_table: __migration_history"), "x").unwrap(),
            "__migration_history"
        );
    }
}
