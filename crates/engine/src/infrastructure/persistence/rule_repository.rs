//! Per-guild rule storage. Values are opaque JSON text; decoding and
//! defaulting live in the typed `rules` layer.

use async_trait::async_trait;
use sqlx::SqlitePool;

use lorekeep_domain::GuildId;

use crate::ports::{RepoError, RuleStore};

use super::Database;

pub struct SqliteRuleStore {
    pool: SqlitePool,
}

impl SqliteRuleStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Upsert one rule value for a guild.
    pub async fn set_value(
        &self,
        guild_id: GuildId,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), RepoError> {
        let value_json = serde_json::to_string(value)
            .map_err(|e| RepoError::Serialization(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO guild_rules (guild_id, rule_key, value_json)
            VALUES (?, ?, ?)
            ON CONFLICT(guild_id, rule_key) DO UPDATE SET value_json = excluded.value_json
            "#,
        )
        .bind(guild_id.to_string())
        .bind(key)
        .bind(value_json)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("upsert guild rule", e))?;
        Ok(())
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn get_value(
        &self,
        guild_id: GuildId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, RepoError> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT value_json FROM guild_rules WHERE guild_id = ? AND rule_key = ?",
        )
        .bind(guild_id.to_string())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("read guild rule", e))?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| RepoError::Serialization(e.to_string()))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let db = Database::in_memory().await.expect("db");
        let store = SqliteRuleStore::new(&db);
        let guild = GuildId::new();

        store
            .set_value(guild, "i18n.required_languages", &json!(["en", "ru"]))
            .await
            .expect("set");
        let value = store
            .get_value(guild, "i18n.required_languages")
            .await
            .expect("get");
        assert_eq!(value, Some(json!(["en", "ru"])));
    }

    #[tokio::test]
    async fn missing_key_reads_none() {
        let db = Database::in_memory().await.expect("db");
        let store = SqliteRuleStore::new(&db);
        let value = store
            .get_value(GuildId::new(), "balance.variance_pct")
            .await
            .expect("get");
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn upsert_replaces_the_previous_value() {
        let db = Database::in_memory().await.expect("db");
        let store = SqliteRuleStore::new(&db);
        let guild = GuildId::new();

        store
            .set_value(guild, "balance.variance_pct", &json!(30.0))
            .await
            .expect("set");
        store
            .set_value(guild, "balance.variance_pct", &json!(15.0))
            .await
            .expect("set");
        let value = store
            .get_value(guild, "balance.variance_pct")
            .await
            .expect("get");
        assert_eq!(value, Some(json!(15.0)));
    }

    #[tokio::test]
    async fn rules_are_scoped_per_guild() {
        let db = Database::in_memory().await.expect("db");
        let store = SqliteRuleStore::new(&db);
        let a = GuildId::new();
        let b = GuildId::new();

        store
            .set_value(a, "balance.damage_factor", &json!(12.0))
            .await
            .expect("set");
        assert_eq!(
            store.get_value(b, "balance.damage_factor").await.expect("get"),
            None
        );
    }
}
