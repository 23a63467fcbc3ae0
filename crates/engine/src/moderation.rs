//! Moderation orchestrator: trigger -> review -> transactional save.
//!
//! Holds no state of its own; every cross-call fact lives on the persisted
//! `PendingGeneration` row, so concurrent calls for different pending ids
//! need no coordination.

use std::sync::Arc;

use lorekeep_domain::{
    GuildId, InvalidTransition, ModerationStatus, PendingGeneration, PendingGenerationId,
    PlayerId, PlayerStatus, ValidationError,
};

use crate::parser::ResponseParser;
use crate::ports::{
    ChatMessage, ClockPort, ContentStore, LlmPort, LlmRequest, NotifierPort, PendingRepo,
    PlayerStateRepo, RepoError, SaveOutcome,
};
use crate::prompts::{build_prompt, GenerationContext};

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("Pending generation {id} not found")]
    NotFound { id: PendingGenerationId },
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error("Edited payload rejected: {0}")]
    InvalidPayload(ValidationError),
    #[error("Generation call failed: {0}")]
    Generation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// What prompted a generation and what it should produce.
#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub entity_type: lorekeep_domain::EntityType,
    /// Human-readable origin ("quest hook at the docks", "/generate npc").
    pub description: String,
    pub generation: GenerationContext,
    pub triggered_by: Option<PlayerId>,
}

/// How a trigger ended. `Failed` covers everything unexpected; callers never
/// see a raw error from `trigger`.
#[derive(Debug)]
pub enum TriggerOutcome {
    Pending { pending_id: PendingGenerationId },
    ValidationFailed {
        pending_id: PendingGenerationId,
        error: ValidationError,
    },
    Failed { reason: String },
}

pub struct ModerationOrchestrator {
    llm: Arc<dyn LlmPort>,
    parser: ResponseParser,
    pending: Arc<dyn PendingRepo>,
    content: Arc<dyn ContentStore>,
    players: Arc<dyn PlayerStateRepo>,
    notifier: Arc<dyn NotifierPort>,
    clock: Arc<dyn ClockPort>,
}

impl ModerationOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        llm: Arc<dyn LlmPort>,
        parser: ResponseParser,
        pending: Arc<dyn PendingRepo>,
        content: Arc<dyn ContentStore>,
        players: Arc<dyn PlayerStateRepo>,
        notifier: Arc<dyn NotifierPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            llm,
            parser,
            pending,
            content,
            players,
            notifier,
            clock,
        }
    }

    /// Generate, parse, and stage content for review.
    pub async fn trigger(&self, guild_id: GuildId, context: TriggerContext) -> TriggerOutcome {
        match self.run_trigger(guild_id, &context).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(guild_id = %guild_id, error = %e, "Trigger failed");
                TriggerOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn run_trigger(
        &self,
        guild_id: GuildId,
        context: &TriggerContext,
    ) -> Result<TriggerOutcome, ModerationError> {
        let prompt = build_prompt(context.entity_type, &context.generation);
        let raw = self
            .llm
            .generate(LlmRequest::new(vec![ChatMessage::user(prompt.clone())]).with_temperature(0.8))
            .await
            .map_err(|e| ModerationError::Generation(e.to_string()))?
            .content;

        let now = self.clock.now();
        match self.parser.parse(&raw, guild_id).await {
            Ok(payload) => {
                let payload_json = serde_json::to_string(&payload)
                    .map_err(|e| RepoError::Serialization(e.to_string()))?;
                let record = PendingGeneration::new_pending(
                    guild_id,
                    context.description.clone(),
                    prompt,
                    raw,
                    payload_json,
                    context.triggered_by,
                    now,
                );
                let pending_id = record.id;
                self.pending.insert(&record).await?;

                if let Some(player_id) = context.triggered_by {
                    self.players
                        .set_status(guild_id, player_id, PlayerStatus::AwaitingModeration)
                        .await?;
                }

                self.notify(
                    guild_id,
                    &format!(
                        "New content ({} entities) awaiting moderation: {}",
                        payload.len(),
                        pending_id
                    ),
                )
                .await;
                tracing::info!(guild_id = %guild_id, pending_id = %pending_id, "Staged pending generation");
                Ok(TriggerOutcome::Pending { pending_id })
            }
            Err(error) => {
                let issues_json = serde_json::to_string(&error)
                    .map_err(|e| RepoError::Serialization(e.to_string()))?;
                let record = PendingGeneration::new_failed(
                    guild_id,
                    context.description.clone(),
                    prompt,
                    Some(raw),
                    issues_json,
                    context.triggered_by,
                    now,
                );
                let pending_id = record.id;
                self.pending.insert(&record).await?;

                self.notify(
                    guild_id,
                    &format!("Generation {} failed validation: {}", pending_id, error),
                )
                .await;
                tracing::warn!(guild_id = %guild_id, pending_id = %pending_id, error = %error, "Generation failed validation");
                Ok(TriggerOutcome::ValidationFailed { pending_id, error })
            }
        }
    }

    pub async fn approve(
        &self,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
        note: Option<String>,
    ) -> Result<(), ModerationError> {
        let mut record = self.get_record(pending_id, guild_id).await?;
        record.approve(note, self.clock.now())?;
        self.pending.update(&record).await?;
        tracing::info!(pending_id = %pending_id, "Pending generation approved");
        Ok(())
    }

    /// Reject also releases the triggering player; nothing will ever save
    /// this record.
    pub async fn reject(
        &self,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
        note: Option<String>,
    ) -> Result<(), ModerationError> {
        let mut record = self.get_record(pending_id, guild_id).await?;
        record.reject(note, self.clock.now())?;
        self.pending.update(&record).await?;
        self.release_player(&record).await;
        tracing::info!(pending_id = %pending_id, "Pending generation rejected");
        Ok(())
    }

    /// Replace the payload with moderator-edited wire JSON. The edit is
    /// re-validated in full; a record never carries an unvalidated payload.
    pub async fn edit(
        &self,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
        payload_json: &str,
    ) -> Result<(), ModerationError> {
        let payload = self
            .parser
            .revalidate(payload_json, guild_id)
            .await
            .map_err(ModerationError::InvalidPayload)?;
        let canonical = serde_json::to_string(&payload)
            .map_err(|e| RepoError::Serialization(e.to_string()))?;

        let mut record = self.get_record(pending_id, guild_id).await?;
        record.edit(canonical, self.clock.now())?;
        self.pending.update(&record).await?;
        tracing::info!(pending_id = %pending_id, "Pending generation edited");
        Ok(())
    }

    /// Commit an approved payload to permanent storage. Returns whether the
    /// batch was committed; every failure mode is recorded on the pending
    /// row by the store, never raised to the caller.
    pub async fn save(&self, pending_id: PendingGenerationId, guild_id: GuildId) -> bool {
        let outcome = match self
            .content
            .save_batch(pending_id, guild_id, self.clock.now())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(pending_id = %pending_id, error = %e, "Batch save errored");
                return false;
            }
        };

        match outcome {
            SaveOutcome::Saved { created } => {
                if let Ok(Some(record)) = self.pending.get(pending_id, guild_id).await {
                    self.release_player(&record).await;
                }
                self.notify(
                    guild_id,
                    &format!("Saved {} entities from {}", created.len(), pending_id),
                )
                .await;
                tracing::info!(
                    pending_id = %pending_id,
                    created = created.len(),
                    "Batch save committed"
                );
                true
            }
            SaveOutcome::NotFound => {
                tracing::warn!(pending_id = %pending_id, "Save requested for unknown pending id");
                false
            }
            SaveOutcome::InvalidStatus { actual } => {
                tracing::warn!(pending_id = %pending_id, status = %actual, "Save refused by status check");
                false
            }
            SaveOutcome::MissingPayload => {
                tracing::error!(pending_id = %pending_id, "Approved record had no payload");
                false
            }
            SaveOutcome::Failed { error } => {
                self.notify(
                    guild_id,
                    &format!("Saving {} failed and was rolled back: {}", pending_id, error),
                )
                .await;
                tracing::error!(pending_id = %pending_id, error = %error, "Batch save rolled back");
                false
            }
        }
    }

    pub async fn get(
        &self,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
    ) -> Result<PendingGeneration, ModerationError> {
        self.get_record(pending_id, guild_id).await
    }

    async fn get_record(
        &self,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
    ) -> Result<PendingGeneration, ModerationError> {
        self.pending
            .get(pending_id, guild_id)
            .await?
            .ok_or(ModerationError::NotFound { id: pending_id })
    }

    /// Put the triggering player back to exploring, if they are still held.
    async fn release_player(&self, record: &PendingGeneration) {
        let Some(player_id) = record.triggered_by else {
            return;
        };
        match self.players.get_status(record.guild_id, player_id).await {
            Ok(PlayerStatus::AwaitingModeration) => {
                if let Err(e) = self
                    .players
                    .set_status(record.guild_id, player_id, PlayerStatus::Exploring)
                    .await
                {
                    tracing::warn!(player_id = %player_id, error = %e, "Failed to release player");
                }
            }
            Ok(PlayerStatus::Exploring) => {}
            Err(e) => {
                tracing::warn!(player_id = %player_id, error = %e, "Player status lookup failed");
            }
        }
    }

    /// Notification failures are logged, never propagated; moderation must
    /// not stall on a broken channel.
    async fn notify(&self, guild_id: GuildId, message: &str) {
        if let Err(e) = self.notifier.notify(guild_id, message).await {
            tracing::warn!(guild_id = %guild_id, error = %e, "Moderation notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use lorekeep_domain::EntityType;

    use crate::rules::GuildRules;
    use crate::test_support::{
        CannedLlm, FakeRuleStore, FixedClock, InMemoryPendingRepo, InMemoryPlayerRepo,
        RecordingNotifier,
    };

    /// Content store that replays scripted outcomes.
    struct ScriptedContentStore {
        outcomes: Mutex<Vec<Result<SaveOutcome, RepoError>>>,
    }

    impl ScriptedContentStore {
        fn with(outcome: Result<SaveOutcome, RepoError>) -> Self {
            Self {
                outcomes: Mutex::new(vec![outcome]),
            }
        }
    }

    #[async_trait]
    impl ContentStore for ScriptedContentStore {
        async fn save_batch(
            &self,
            _pending_id: PendingGenerationId,
            _guild_id: GuildId,
            _now: DateTime<Utc>,
        ) -> Result<SaveOutcome, RepoError> {
            self.outcomes
                .lock()
                .map_err(|_| RepoError::Database("lock poisoned".to_string()))?
                .pop()
                .unwrap_or(Ok(SaveOutcome::NotFound))
        }
    }

    struct Harness {
        orchestrator: ModerationOrchestrator,
        pending: Arc<InMemoryPendingRepo>,
        players: Arc<InMemoryPlayerRepo>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(llm: CannedLlm, store: ScriptedContentStore) -> Harness {
        let pending = Arc::new(InMemoryPendingRepo::new());
        let players = Arc::new(InMemoryPlayerRepo::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let rules = GuildRules::new(Arc::new(FakeRuleStore::new()));
        let orchestrator = ModerationOrchestrator::new(
            Arc::new(llm),
            ResponseParser::new(rules),
            pending.clone(),
            Arc::new(store),
            players.clone(),
            notifier.clone(),
            Arc::new(FixedClock::default_instant()),
        );
        Harness {
            orchestrator,
            pending,
            players,
            notifier,
        }
    }

    fn npc_trigger(player: Option<PlayerId>) -> TriggerContext {
        TriggerContext {
            entity_type: EntityType::Npc,
            description: "test trigger".to_string(),
            generation: GenerationContext::default(),
            triggered_by: player,
        }
    }

    const GOOD_NPC: &str = r#"[{"entity_type":"npc","static_id":"npc_guard","name_i18n":{"en":"Guard"},"description_i18n":{"en":"A guard."}}]"#;

    #[tokio::test]
    async fn trigger_success_stages_and_holds_the_player() {
        let h = harness(
            CannedLlm::single(GOOD_NPC),
            ScriptedContentStore::with(Ok(SaveOutcome::NotFound)),
        );
        let guild = GuildId::new();
        let player = PlayerId::new();

        let outcome = h.orchestrator.trigger(guild, npc_trigger(Some(player))).await;
        let TriggerOutcome::Pending { pending_id } = outcome else {
            panic!("expected Pending, got {:?}", outcome);
        };

        let record = h.pending.get_sync(pending_id).expect("record staged");
        assert_eq!(record.status, ModerationStatus::PendingModeration);
        assert!(record.parsed_validated_data.is_some());
        assert_eq!(record.raw_response.as_deref(), Some(GOOD_NPC));
        assert_eq!(
            h.players.status_of(guild, player),
            PlayerStatus::AwaitingModeration
        );
        assert!(h.notifier.messages()[0].contains("awaiting moderation"));
    }

    #[tokio::test]
    async fn trigger_parse_failure_stages_failed_record_without_holding_player() {
        let h = harness(
            CannedLlm::single("this is not json"),
            ScriptedContentStore::with(Ok(SaveOutcome::NotFound)),
        );
        let guild = GuildId::new();
        let player = PlayerId::new();

        let outcome = h.orchestrator.trigger(guild, npc_trigger(Some(player))).await;
        let TriggerOutcome::ValidationFailed { pending_id, error } = outcome else {
            panic!("expected ValidationFailed, got {:?}", outcome);
        };
        assert_eq!(error.kind(), "json_parsing");

        let record = h.pending.get_sync(pending_id).expect("record staged");
        assert_eq!(record.status, ModerationStatus::ValidationFailed);
        assert!(record.validation_issues.is_some());
        assert!(record.parsed_validated_data.is_none());
        assert_eq!(h.players.status_of(guild, player), PlayerStatus::Exploring);
        assert!(h.notifier.messages()[0].contains("failed validation"));
    }

    #[tokio::test]
    async fn trigger_llm_failure_is_a_generic_failure() {
        let h = harness(
            CannedLlm::new(vec![Err("model offline".to_string())]),
            ScriptedContentStore::with(Ok(SaveOutcome::NotFound)),
        );
        let outcome = h.orchestrator.trigger(GuildId::new(), npc_trigger(None)).await;
        assert!(matches!(outcome, TriggerOutcome::Failed { .. }));
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn approve_and_reject_update_the_record() {
        let h = harness(
            CannedLlm::single(GOOD_NPC),
            ScriptedContentStore::with(Ok(SaveOutcome::NotFound)),
        );
        let guild = GuildId::new();
        let TriggerOutcome::Pending { pending_id } =
            h.orchestrator.trigger(guild, npc_trigger(None)).await
        else {
            panic!("trigger failed");
        };

        h.orchestrator
            .approve(pending_id, guild, Some("looks fine".to_string()))
            .await
            .expect("approve");
        let record = h.pending.get_sync(pending_id).expect("record");
        assert_eq!(record.status, ModerationStatus::Approved);
        assert_eq!(record.moderator_notes.as_deref(), Some("looks fine"));

        // Approval can be withdrawn before save.
        h.orchestrator
            .reject(pending_id, guild, None)
            .await
            .expect("reject");
        assert_eq!(
            h.pending.get_sync(pending_id).expect("record").status,
            ModerationStatus::Rejected
        );
    }

    #[tokio::test]
    async fn approve_unknown_id_is_not_found() {
        let h = harness(
            CannedLlm::new(vec![]),
            ScriptedContentStore::with(Ok(SaveOutcome::NotFound)),
        );
        let err = h
            .orchestrator
            .approve(PendingGenerationId::new(), GuildId::new(), None)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ModerationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn reject_terminal_record_refuses_transition() {
        let h = harness(
            CannedLlm::single(GOOD_NPC),
            ScriptedContentStore::with(Ok(SaveOutcome::NotFound)),
        );
        let guild = GuildId::new();
        let TriggerOutcome::Pending { pending_id } =
            h.orchestrator.trigger(guild, npc_trigger(None)).await
        else {
            panic!("trigger failed");
        };
        h.orchestrator.reject(pending_id, guild, None).await.expect("reject");

        let err = h
            .orchestrator
            .approve(pending_id, guild, None)
            .await
            .expect_err("terminal");
        assert!(matches!(err, ModerationError::Transition(_)));
    }

    #[tokio::test]
    async fn edit_revalidates_and_replaces_the_payload() {
        let h = harness(
            CannedLlm::single(GOOD_NPC),
            ScriptedContentStore::with(Ok(SaveOutcome::NotFound)),
        );
        let guild = GuildId::new();
        let TriggerOutcome::Pending { pending_id } =
            h.orchestrator.trigger(guild, npc_trigger(None)).await
        else {
            panic!("trigger failed");
        };

        let edited = r#"{"generated_entities":[{"entity_type":"npc","static_id":"npc_guard","name_i18n":{"en":"Captain Guard"},"description_i18n":{"en":"Promoted."}}],"raw_ai_output":"","parsing_metadata":{}}"#;
        h.orchestrator
            .edit(pending_id, guild, edited)
            .await
            .expect("edit");

        let record = h.pending.get_sync(pending_id).expect("record");
        assert_eq!(record.status, ModerationStatus::EditedPendingApproval);
        assert!(record
            .parsed_validated_data
            .as_deref()
            .map(|d| d.contains("Captain Guard"))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn invalid_edit_is_rejected_and_leaves_the_record_alone() {
        let h = harness(
            CannedLlm::single(GOOD_NPC),
            ScriptedContentStore::with(Ok(SaveOutcome::NotFound)),
        );
        let guild = GuildId::new();
        let TriggerOutcome::Pending { pending_id } =
            h.orchestrator.trigger(guild, npc_trigger(None)).await
        else {
            panic!("trigger failed");
        };

        let bad = r#"{"generated_entities":[{"entity_type":"quest","title_i18n":{"en":"Q"},"description_i18n":{"en":"q"},"min_level":1,"xp_reward":10,"steps":[]}],"raw_ai_output":"","parsing_metadata":{}}"#;
        let err = h
            .orchestrator
            .edit(pending_id, guild, bad)
            .await
            .expect_err("must refuse");
        assert!(matches!(err, ModerationError::InvalidPayload(_)));
        assert_eq!(
            h.pending.get_sync(pending_id).expect("record").status,
            ModerationStatus::PendingModeration
        );
    }

    #[tokio::test]
    async fn successful_save_releases_the_player_and_notifies() {
        let h = harness(
            CannedLlm::single(GOOD_NPC),
            ScriptedContentStore::with(Ok(SaveOutcome::Saved { created: vec![] })),
        );
        let guild = GuildId::new();
        let player = PlayerId::new();
        let TriggerOutcome::Pending { pending_id } =
            h.orchestrator.trigger(guild, npc_trigger(Some(player))).await
        else {
            panic!("trigger failed");
        };
        h.orchestrator.approve(pending_id, guild, None).await.expect("approve");

        assert!(h.orchestrator.save(pending_id, guild).await);
        assert_eq!(h.players.status_of(guild, player), PlayerStatus::Exploring);
        assert!(h
            .notifier
            .messages()
            .iter()
            .any(|m| m.contains("Saved 0 entities")));
    }

    #[tokio::test]
    async fn refused_or_failed_save_returns_false() {
        for outcome in [
            Ok(SaveOutcome::InvalidStatus {
                actual: ModerationStatus::PendingModeration,
            }),
            Ok(SaveOutcome::MissingPayload),
            Ok(SaveOutcome::Failed {
                error: "UNIQUE constraint failed".to_string(),
            }),
            Err(RepoError::Database("connection lost".to_string())),
        ] {
            let h = harness(CannedLlm::new(vec![]), ScriptedContentStore::with(outcome));
            assert!(
                !h.orchestrator
                    .save(PendingGenerationId::new(), GuildId::new())
                    .await
            );
        }
    }
}
