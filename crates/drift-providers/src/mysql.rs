//! MySQL migration provider.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use drift_core::{AppliedMigration, ConfigMap, Error, Provider, Result};

use crate::changeset::run_changeset;
use crate::{connection_url, history_table};

/// Default history table for the MySQL dialect.
const DEFAULT_HISTORY_TABLE: &str = "__migration_history";

/// Environment variable consulted when the config map has no `url` key.
const URL_ENV_VAR: &str = "MYSQL_URL";

/// Migration provider for MySQL.
pub struct MySqlProvider {
    pool: MySqlPool,
    history_table: String,
}

impl MySqlProvider {
    /// Build a provider from the free-form config map.
    ///
    /// The pool is lazy: a malformed URL fails here, an unreachable
    /// server on first use.
    pub fn from_config(config: &ConfigMap) -> Result<Box<dyn Provider>> {
        let url = connection_url(config, URL_ENV_VAR)?;
        let history_table = history_table(config, DEFAULT_HISTORY_TABLE)?;

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&url)
            .map_err(|e| Error::Config(format!("Invalid MySQL connection URL: {}", e)))?;

        Ok(Box::new(Self {
            pool,
            history_table,
        }))
    }
}

#[async_trait]
impl Provider for MySqlProvider {
    async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Connection)?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                date_applied DATETIME NOT NULL
            )",
            self.history_table
        );
        sqlx::query(&ddl)
            .execute(&mut *conn)
            .await
            .map_err(Error::History)?;

        let select = format!(
            "SELECT id, name, date_applied FROM {} ORDER BY id",
            self.history_table
        );
        let rows: Vec<(i32, String, NaiveDateTime)> = sqlx::query_as(&select)
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::History)?;

        // date_applied was stamped with UTC_TIMESTAMP(), so the naive
        // value is reinterpreted as UTC.
        Ok(rows
            .into_iter()
            .map(|(id, name, applied_at)| AppliedMigration {
                id: id as i64,
                name,
                applied_at: applied_at.and_utc(),
            })
            .collect())
    }

    async fn apply(&self, name: &str, content: &str) -> Result<()> {
        let insert = format!(
            "INSERT INTO {} (name, date_applied) VALUES (?, UTC_TIMESTAMP())",
            self.history_table
        );
        run_changeset(&self.pool, name, content, &insert).await
    }

    async fn rollback(&self, name: &str, content: &str) -> Result<()> {
        let delete = format!("DELETE FROM {} WHERE name = ?", self.history_table);
        run_changeset(&self.pool, name, content, &delete).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> ConfigMap {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_from_config_with_url() {
        let provider = MySqlProvider::from_config(&config("url: mysql://localhost/app"));
        assert!(provider.is_ok());
    }

    #[test]
    fn test_from_config_default_table_name() {
        // The dialect default passes identifier validation.
        let table = history_table(&ConfigMap::default(), DEFAULT_HISTORY_TABLE).unwrap();
        assert_eq!(table, "__migration_history");
    }

    #[test]
    fn test_from_config_rejects_bad_table_name() {
        let yaml = "url: mysql://localhost/app\nhistory_table: 'x`y'";
        let err = MySqlProvider::from_config(&config(yaml))
            .err()
            .expect("construction should fail");
        assert!(matches!(err, Error::Config(_)));
    }
}
