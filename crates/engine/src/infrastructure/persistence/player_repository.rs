use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use lorekeep_domain::{GuildId, PlayerId, PlayerStatus};

use crate::ports::{PlayerStateRepo, RepoError};

use super::Database;

/// Player availability flags, one row per (guild, player). Players with no
/// row have never been blocked and read as `Exploring`.
pub struct SqlitePlayerStateRepo {
    pool: SqlitePool,
}

impl SqlitePlayerStateRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl PlayerStateRepo for SqlitePlayerStateRepo {
    async fn get_status(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
    ) -> Result<PlayerStatus, RepoError> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT status FROM player_states WHERE guild_id = ? AND player_id = ?",
        )
        .bind(guild_id.to_string())
        .bind(player_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("read player status", e))?;

        match raw {
            Some(raw) => raw.parse().map_err(RepoError::Serialization),
            None => Ok(PlayerStatus::Exploring),
        }
    }

    async fn set_status(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
        status: PlayerStatus,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO player_states (guild_id, player_id, status, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id, player_id) DO UPDATE
                SET status = excluded.status, updated_at = excluded.updated_at
            "#,
        )
        .bind(guild_id.to_string())
        .bind(player_id.to_string())
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("upsert player status", e))?;
        Ok(())
    }
}
