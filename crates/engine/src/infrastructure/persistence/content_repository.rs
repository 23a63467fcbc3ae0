//! Transactional batch persistence of approved payloads.
//!
//! One `save_batch` call is one SQLite transaction. The status check, every
//! entity insert, every relationship insert, and the SAVED transition all
//! commit together or not at all. Two concurrent saves on the same pending
//! id cannot both commit: the second one re-reads a status that is no longer
//! saveable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use lorekeep_domain::{
    ContentId, EntityType, GeneratedEntity, GuildId, ModerationStatus, ParsedPayload,
    PendingGenerationId,
};

use crate::ports::{ContentStore, CreatedContent, RepoError, SaveOutcome};

use super::Database;

pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Entity inserts, two passes: everything with a permanent row first,
    /// then relationships, whose endpoints resolve existing-or-create.
    async fn write_entities(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        payload: &ParsedPayload,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
        now: DateTime<Utc>,
    ) -> Result<Vec<CreatedContent>, RepoError> {
        let mut created = Vec::new();
        let mut batch_ids: Vec<(String, EntityType, ContentId)> = Vec::new();

        for entity in payload.entities() {
            if matches!(entity, GeneratedEntity::Relationship(_)) {
                continue;
            }
            let content_id =
                insert_entity(tx, entity, Some(pending_id), guild_id, now).await?;
            if let Some(static_id) = entity.static_id() {
                batch_ids.push((static_id.to_string(), entity.entity_type(), content_id));
            }
            if let GeneratedEntity::NpcTrader(trader) = entity {
                for entry in &trader.inventory {
                    sqlx::query(
                        r#"
                        INSERT INTO trader_inventories
                            (trader_content_id, item_static_id, quantity, price_override, guild_id)
                        VALUES (?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(content_id.to_string())
                    .bind(&entry.item_static_id)
                    .bind(entry.quantity)
                    .bind(entry.price_override)
                    .bind(guild_id.to_string())
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| RepoError::database("insert trader inventory", e))?;
                }
            }
            created.push(CreatedContent {
                content_id,
                entity_type: entity.entity_type(),
                static_id: entity.static_id().map(str::to_string),
            });
        }

        for entity in payload.entities() {
            let GeneratedEntity::Relationship(rel) = entity else {
                continue;
            };
            let source = resolve_endpoint(
                tx,
                &rel.source_static_id,
                &batch_ids,
                guild_id,
                now,
                &mut created,
            )
            .await?;
            let target = resolve_endpoint(
                tx,
                &rel.target_static_id,
                &batch_ids,
                guild_id,
                now,
                &mut created,
            )
            .await?;

            let relationship_id = ContentId::new();
            let data_json = serde_json::to_string(entity)
                .map_err(|e| RepoError::Serialization(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO content_relationships
                    (id, guild_id, source_content_id, target_content_id,
                     relationship_type, value, data_json, pending_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(relationship_id.to_string())
            .bind(guild_id.to_string())
            .bind(source.to_string())
            .bind(target.to_string())
            .bind(&rel.relationship_type)
            .bind(rel.value)
            .bind(data_json)
            .bind(pending_id.to_string())
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(|e| RepoError::database("insert relationship", e))?;

            created.push(CreatedContent {
                content_id: relationship_id,
                entity_type: EntityType::Relationship,
                static_id: rel.static_id.clone(),
            });
        }

        Ok(created)
    }

    /// Best-effort ERROR_ON_SAVE marker after a rollback; runs outside the
    /// failed transaction. Guarded against SAVED: when this call lost a race
    /// to a concurrent save that already committed, the terminal status must
    /// stand.
    async fn mark_error(
        &self,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
        error: &str,
        now: DateTime<Utc>,
    ) {
        let note = format!("Save failed: {}", error);
        let result = sqlx::query(
            r#"
            UPDATE pending_generations
            SET status = ?, moderator_notes = ?, updated_at = ?
            WHERE id = ? AND guild_id = ? AND status != ?
            "#,
        )
        .bind(ModerationStatus::ErrorOnSave.as_str())
        .bind(note)
        .bind(now)
        .bind(pending_id.to_string())
        .bind(guild_id.to_string())
        .bind(ModerationStatus::Saved.as_str())
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            tracing::error!(pending_id = %pending_id, error = %e, "Failed to record save error");
        }
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn save_batch(
        &self,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("begin save transaction", e))?;

        // Status is read inside the transaction; a pre-transaction check
        // would race a concurrent save on the same id.
        let row = sqlx::query(
            "SELECT status, parsed_validated_data FROM pending_generations WHERE id = ? AND guild_id = ?",
        )
        .bind(pending_id.to_string())
        .bind(guild_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepoError::database("read pending status", e))?;

        let Some(row) = row else {
            return Ok(SaveOutcome::NotFound);
        };
        let status: String = row
            .try_get("status")
            .map_err(|e| RepoError::database("read status", e))?;
        let status: ModerationStatus = status.parse().map_err(RepoError::Serialization)?;
        if !status.is_saveable() {
            return Ok(SaveOutcome::InvalidStatus { actual: status });
        }

        let payload_json: Option<String> = row
            .try_get("parsed_validated_data")
            .map_err(|e| RepoError::database("read payload", e))?;
        let Some(payload_json) = payload_json else {
            sqlx::query(
                r#"
                UPDATE pending_generations
                SET status = ?, moderator_notes = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(ModerationStatus::ErrorOnSave.as_str())
            .bind("Save failed: approved record has no validated payload")
            .bind(now)
            .bind(pending_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("mark missing payload", e))?;
            tx.commit()
                .await
                .map_err(|e| RepoError::database("commit missing-payload marker", e))?;
            return Ok(SaveOutcome::MissingPayload);
        };

        let payload: ParsedPayload = match serde_json::from_str(&payload_json) {
            Ok(payload) => payload,
            Err(e) => {
                drop(tx);
                let error = format!("stored payload is unreadable: {}", e);
                self.mark_error(pending_id, guild_id, &error, now).await;
                return Ok(SaveOutcome::Failed { error });
            }
        };

        match self
            .write_entities(&mut tx, &payload, pending_id, guild_id, now)
            .await
        {
            Ok(created) => {
                let note = saved_note(&created);
                let updated = sqlx::query(
                    r#"
                    UPDATE pending_generations
                    SET status = ?, moderator_notes = ?, updated_at = ?
                    WHERE id = ? AND status = ?
                    "#,
                )
                .bind(ModerationStatus::Saved.as_str())
                .bind(note)
                .bind(now)
                .bind(pending_id.to_string())
                .bind(status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("transition to SAVED", e))?;

                if updated.rows_affected() == 0 {
                    // The guarded update found a different status; nothing
                    // from this call may land.
                    drop(tx);
                    return Ok(SaveOutcome::InvalidStatus { actual: status });
                }

                tx.commit()
                    .await
                    .map_err(|e| RepoError::database("commit save", e))?;
                Ok(SaveOutcome::Saved { created })
            }
            Err(e) => {
                // Dropping the transaction rolls back every write above.
                drop(tx);
                let error = e.to_string();
                self.mark_error(pending_id, guild_id, &error, now).await;
                Ok(SaveOutcome::Failed { error })
            }
        }
    }
}

async fn insert_entity(
    tx: &mut Transaction<'_, Sqlite>,
    entity: &GeneratedEntity,
    pending_id: Option<PendingGenerationId>,
    guild_id: GuildId,
    now: DateTime<Utc>,
) -> Result<ContentId, RepoError> {
    let content_id = ContentId::new();
    let data_json =
        serde_json::to_string(entity).map_err(|e| RepoError::Serialization(e.to_string()))?;
    sqlx::query(
        r#"
        INSERT INTO content_entities
            (id, guild_id, entity_type, static_id, display_name, data_json, pending_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(content_id.to_string())
    .bind(guild_id.to_string())
    .bind(entity.entity_type().as_str())
    .bind(entity.static_id())
    .bind(entity.display_name())
    .bind(data_json)
    .bind(pending_id.map(|p| p.to_string()))
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepoError::database("insert content entity", e))?;
    Ok(content_id)
}

/// Find the permanent id for a relationship endpoint: batch first, then
/// existing content, then a freshly created minimal entity. Persisted
/// `static_id`s are only unique per (guild, type), so the existing-content
/// lookup filters by the type inferred from the id prefix.
async fn resolve_endpoint(
    tx: &mut Transaction<'_, Sqlite>,
    static_id: &str,
    batch_ids: &[(String, EntityType, ContentId)],
    guild_id: GuildId,
    now: DateTime<Utc>,
    created: &mut Vec<CreatedContent>,
) -> Result<ContentId, RepoError> {
    if let Some((_, _, id)) = batch_ids.iter().find(|(sid, _, _)| sid == static_id) {
        return Ok(*id);
    }

    let existing: Option<String> = sqlx::query_scalar(
        "SELECT id FROM content_entities WHERE guild_id = ? AND static_id = ? AND entity_type = ?",
    )
    .bind(guild_id.to_string())
    .bind(static_id)
    .bind(inferred_endpoint_type(static_id).as_str())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| RepoError::database("lookup relationship endpoint", e))?;
    if let Some(raw) = existing {
        return raw
            .parse::<ContentId>()
            .map_err(|e| RepoError::Serialization(e.to_string()));
    }

    let placeholder = placeholder_entity(static_id);
    let content_id = insert_entity(tx, &placeholder, None, guild_id, now).await?;
    created.push(CreatedContent {
        content_id,
        entity_type: placeholder.entity_type(),
        static_id: Some(static_id.to_string()),
    });
    Ok(content_id)
}

/// Endpoint type guessed from the conventional id prefix; anything without a
/// recognized prefix is treated as an npc.
fn inferred_endpoint_type(static_id: &str) -> EntityType {
    if static_id.starts_with("fac_") {
        EntityType::Faction
    } else if static_id.starts_with("loc_") {
        EntityType::Location
    } else {
        EntityType::Npc
    }
}

/// Minimal entity standing in for a referenced-but-unknown static_id. A
/// later save of the real entity will collide on the (guild, type, static_id)
/// constraint and surface for review.
fn placeholder_entity(static_id: &str) -> GeneratedEntity {
    use lorekeep_domain::{GeneratedFaction, GeneratedLocation, GeneratedNpc, LocalizedText};
    let name = LocalizedText::from([("en", static_id)]);
    let description = LocalizedText::from([("en", "Referenced by a relationship; not yet generated.")]);
    match inferred_endpoint_type(static_id) {
        EntityType::Faction => GeneratedEntity::Faction(GeneratedFaction {
            static_id: Some(static_id.to_string()),
            name_i18n: name,
            description_i18n: description,
            properties: serde_json::Map::new(),
        }),
        EntityType::Location => GeneratedEntity::Location(GeneratedLocation {
            static_id: Some(static_id.to_string()),
            name_i18n: name,
            description_i18n: description,
            coordinates: None,
            properties: serde_json::Map::new(),
        }),
        _ => GeneratedEntity::Npc(GeneratedNpc {
            static_id: Some(static_id.to_string()),
            name_i18n: name,
            description_i18n: description,
            level: None,
            stats: None,
            properties: serde_json::Map::new(),
        }),
    }
}

fn saved_note(created: &[CreatedContent]) -> String {
    let ids: Vec<String> = created
        .iter()
        .map(|c| match &c.static_id {
            Some(static_id) => format!("{} ({})", c.content_id, static_id),
            None => c.content_id.to_string(),
        })
        .collect();
    format!("Saved {} entities: {}", created.len(), ids.join(", "))
}
