//! SQLite-backed `PendingRepo`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use lorekeep_domain::{
    GuildId, ModerationStatus, PendingGeneration, PendingGenerationId, PlayerId,
};

use crate::ports::{PendingRepo, RepoError};

use super::Database;

pub struct SqlitePendingRepo {
    pool: SqlitePool,
}

impl SqlitePendingRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl PendingRepo for SqlitePendingRepo {
    async fn insert(&self, record: &PendingGeneration) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO pending_generations
                (id, guild_id, status, trigger_context, prompt_text, raw_response,
                 parsed_validated_data, validation_issues, moderator_notes,
                 triggered_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.guild_id.to_string())
        .bind(record.status.as_str())
        .bind(&record.trigger_context)
        .bind(&record.prompt_text)
        .bind(&record.raw_response)
        .bind(&record.parsed_validated_data)
        .bind(&record.validation_issues)
        .bind(&record.moderator_notes)
        .bind(record.triggered_by.map(|p| p.to_string()))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("insert pending_generation", e))?;
        Ok(())
    }

    async fn get(
        &self,
        id: PendingGenerationId,
        guild_id: GuildId,
    ) -> Result<Option<PendingGeneration>, RepoError> {
        let row = sqlx::query(
            "SELECT * FROM pending_generations WHERE id = ? AND guild_id = ?",
        )
        .bind(id.to_string())
        .bind(guild_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("get pending_generation", e))?;

        row.map(row_to_record).transpose()
    }

    async fn update(&self, record: &PendingGeneration) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_generations
            SET status = ?, parsed_validated_data = ?, validation_issues = ?,
                moderator_notes = ?, updated_at = ?
            WHERE id = ? AND guild_id = ?
            "#,
        )
        .bind(record.status.as_str())
        .bind(&record.parsed_validated_data)
        .bind(&record.validation_issues)
        .bind(&record.moderator_notes)
        .bind(record.updated_at)
        .bind(record.id.to_string())
        .bind(record.guild_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("update pending_generation", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found(
                "PendingGeneration",
                record.id.to_string(),
            ));
        }
        Ok(())
    }
}

pub(super) fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<PendingGeneration, RepoError> {
    let status: String = row
        .try_get("status")
        .map_err(|e| RepoError::database("read status", e))?;
    let status: ModerationStatus = status
        .parse()
        .map_err(RepoError::Serialization)?;

    Ok(PendingGeneration {
        id: parse_id::<PendingGenerationId>(&row, "id")?,
        guild_id: parse_id::<GuildId>(&row, "guild_id")?,
        status,
        trigger_context: get(&row, "trigger_context")?,
        prompt_text: get(&row, "prompt_text")?,
        raw_response: get(&row, "raw_response")?,
        parsed_validated_data: get(&row, "parsed_validated_data")?,
        validation_issues: get(&row, "validation_issues")?,
        moderator_notes: get(&row, "moderator_notes")?,
        triggered_by: get::<Option<String>>(&row, "triggered_by")?
            .map(|s| s.parse::<PlayerId>().map_err(|e| RepoError::Serialization(e.to_string())))
            .transpose()?,
        created_at: get::<DateTime<Utc>>(&row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(&row, "updated_at")?,
    })
}

fn get<'r, T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>>(
    row: &'r sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<T, RepoError> {
    row.try_get(column)
        .map_err(|e| RepoError::database(column, e))
}

fn parse_id<T: std::str::FromStr<Err = uuid::Error>>(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<T, RepoError> {
    let raw: String = get(row, column)?;
    raw.parse()
        .map_err(|e: uuid::Error| RepoError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(guild_id: GuildId) -> PendingGeneration {
        PendingGeneration::new_pending(
            guild_id,
            "test",
            "prompt",
            "[]",
            r#"{"generated_entities":[],"raw_ai_output":"","parsing_metadata":{}}"#,
            Some(PlayerId::new()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let db = Database::in_memory().await.expect("db");
        let repo = SqlitePendingRepo::new(&db);
        let guild = GuildId::new();
        let rec = record(guild);

        repo.insert(&rec).await.expect("insert");
        let loaded = repo.get(rec.id, guild).await.expect("get").expect("found");
        assert_eq!(loaded.id, rec.id);
        assert_eq!(loaded.status, ModerationStatus::PendingModeration);
        assert_eq!(loaded.triggered_by, rec.triggered_by);
        assert_eq!(loaded.parsed_validated_data, rec.parsed_validated_data);
    }

    #[tokio::test]
    async fn get_is_guild_scoped() {
        let db = Database::in_memory().await.expect("db");
        let repo = SqlitePendingRepo::new(&db);
        let rec = record(GuildId::new());
        repo.insert(&rec).await.expect("insert");

        assert!(repo
            .get(rec.id, GuildId::new())
            .await
            .expect("get")
            .is_none());
    }

    #[tokio::test]
    async fn update_persists_transitions() {
        let db = Database::in_memory().await.expect("db");
        let repo = SqlitePendingRepo::new(&db);
        let guild = GuildId::new();
        let mut rec = record(guild);
        repo.insert(&rec).await.expect("insert");

        rec.approve(Some("ok".to_string()), Utc::now()).expect("approve");
        repo.update(&rec).await.expect("update");

        let loaded = repo.get(rec.id, guild).await.expect("get").expect("found");
        assert_eq!(loaded.status, ModerationStatus::Approved);
        assert_eq!(loaded.moderator_notes.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let db = Database::in_memory().await.expect("db");
        let repo = SqlitePendingRepo::new(&db);
        let err = repo.update(&record(GuildId::new())).await.expect_err("must fail");
        assert!(matches!(err, RepoError::NotFound { .. }));
    }
}
