//! SurrealDB implementation of [`SettingsRepository`].

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use webtop_core::error::WebtopResult;
use webtop_core::models::setting::Setting;
use webtop_core::repository::SettingsRepository;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SettingRow {
    key: String,
    value: String,
}

/// SurrealDB implementation of the Settings repository.
#[derive(Clone)]
pub struct SurrealSettingsRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSettingsRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SettingsRepository for SurrealSettingsRepository<C> {
    async fn get(&self, key: &str) -> WebtopResult<Option<String>> {
        let mut result = self
            .db
            .query("SELECT key, value FROM settings WHERE key = $key")
            .bind(("key", key.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SettingRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|row| row.value))
    }

    async fn set(&self, key: &str, value: &str) -> WebtopResult<()> {
        self.db
            .query(
                "UPSERT type::record('settings', $key) SET \
                 key = $key, value = $value",
            )
            .bind(("key", key.to_string()))
            .bind(("value", value.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn all(&self) -> WebtopResult<Vec<Setting>> {
        let mut result = self
            .db
            .query("SELECT key, value FROM settings ORDER BY key ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SettingRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| Setting {
                key: row.key,
                value: row.value,
            })
            .collect())
    }
}
