//! PostgreSQL migration provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use drift_core::{AppliedMigration, ConfigMap, Error, Provider, Result};

use crate::changeset::run_changeset;
use crate::{connection_url, history_table};

/// Default history table for the PostgreSQL dialect.
const DEFAULT_HISTORY_TABLE: &str = "drift_migrations";

/// Environment variable consulted when the config map has no `url` key.
const URL_ENV_VAR: &str = "POSTGRES_URL";

/// Migration provider for PostgreSQL.
pub struct PostgresProvider {
    pool: PgPool,
    history_table: String,
}

impl PostgresProvider {
    /// Build a provider from the free-form config map.
    ///
    /// The pool is lazy: a malformed URL fails here, an unreachable
    /// server on first use.
    pub fn from_config(config: &ConfigMap) -> Result<Box<dyn Provider>> {
        let url = connection_url(config, URL_ENV_VAR)?;
        let history_table = history_table(config, DEFAULT_HISTORY_TABLE)?;

        // One migration runs at a time; one connection is all it takes.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&url)
            .map_err(|e| Error::Config(format!("Invalid PostgreSQL connection URL: {}", e)))?;

        Ok(Box::new(Self {
            pool,
            history_table,
        }))
    }
}

#[async_trait]
impl Provider for PostgresProvider {
    async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Connection)?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                date_applied TIMESTAMPTZ NOT NULL
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
        let rows: Vec<(i32, String, DateTime<Utc>)> = sqlx::query_as(&select)
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::History)?;

        Ok(rows
            .into_iter()
            .map(|(id, name, applied_at)| AppliedMigration {
                id: id as i64,
                name,
                applied_at,
            })
            .collect())
    }

    async fn apply(&self, name: &str, content: &str) -> Result<()> {
        let insert = format!(
            "INSERT INTO {} (name, date_applied) VALUES ($1, NOW())",
            self.history_table
        );
        run_changeset(&self.pool, name, content, &insert).await
    }

    async fn rollback(&self, name: &str, content: &str) -> Result<()> {
        let delete = format!("DELETE FROM {} WHERE name = $1", self.history_table);
        run_changeset(&self.pool, name, content, &delete).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Behavior against a live server is covered by the runner's property
    // tests over an in-memory provider; these exercise construction.

    fn config(yaml: &str) -> ConfigMap {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_from_config_with_url() {
        let provider = PostgresProvider::from_config(&config("url: postgres://localhost/app"));
        assert!(provider.is_ok());
    }

    #[test]
    fn test_from_config_rejects_malformed_url() {
        let err = PostgresProvider::from_config(&config("url: '::not a url::'"))
            .err()
            .expect("construction should fail");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_config_rejects_bad_table_name() {
        let yaml = "url: postgres://localhost/app\nhistory_table: 'drop table; --'";
        let err = PostgresProvider::from_config(&config(yaml))
            .err()
            .expect("construction should fail");
        assert!(matches!(err, Error::Config(_)));
    }
}
