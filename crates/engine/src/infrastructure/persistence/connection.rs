//! Pool setup and schema bootstrap.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::ports::RepoError;

/// Shared handle to the engine database. Tables are created on connect so a
/// fresh file (or an in-memory database in tests) is immediately usable.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, RepoError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| RepoError::database("invalid database url", e))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::database("connect", e))?;
        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Single-connection in-memory database. One connection, or each pool
    /// checkout would see its own empty database.
    pub async fn in_memory() -> Result<Self, RepoError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| RepoError::database("connect in-memory", e))?;
        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), RepoError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS pending_generations (
                id TEXT PRIMARY KEY,
                guild_id TEXT NOT NULL,
                status TEXT NOT NULL,
                trigger_context TEXT NOT NULL,
                prompt_text TEXT NOT NULL,
                raw_response TEXT,
                parsed_validated_data TEXT,
                validation_issues TEXT,
                moderator_notes TEXT,
                triggered_by TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_pending_guild_status
            ON pending_generations(guild_id, status)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS content_entities (
                id TEXT PRIMARY KEY,
                guild_id TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                static_id TEXT,
                display_name TEXT,
                data_json TEXT NOT NULL,
                pending_id TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(guild_id, entity_type, static_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS content_relationships (
                id TEXT PRIMARY KEY,
                guild_id TEXT NOT NULL,
                source_content_id TEXT NOT NULL,
                target_content_id TEXT NOT NULL,
                relationship_type TEXT NOT NULL,
                value INTEGER NOT NULL,
                data_json TEXT NOT NULL,
                pending_id TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS trader_inventories (
                trader_content_id TEXT NOT NULL,
                item_static_id TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                price_override INTEGER,
                guild_id TEXT NOT NULL,
                PRIMARY KEY(trader_content_id, item_static_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS player_states (
                guild_id TEXT NOT NULL,
                player_id TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY(guild_id, player_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS guild_rules (
                guild_id TEXT NOT NULL,
                rule_key TEXT NOT NULL,
                value_json TEXT NOT NULL,
                PRIMARY KEY(guild_id, rule_key)
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::database("schema bootstrap", e))?;
        }
        Ok(())
    }
}
