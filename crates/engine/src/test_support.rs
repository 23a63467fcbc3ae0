//! Shared fakes for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use lorekeep_domain::{GuildId, PendingGeneration, PendingGenerationId, PlayerId, PlayerStatus};

use crate::ports::{
    ClockPort, LlmError, LlmPort, LlmRequest, LlmResponse, NotifierPort, NotifyError, PendingRepo,
    PlayerStateRepo, RepoError, RuleStore,
};

/// In-memory rule store.
pub struct FakeRuleStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
    fail: bool,
}

impl FakeRuleStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            fail: true,
        }
    }

    pub fn set(&self, key: &str, value: serde_json::Value) {
        if let Ok(mut map) = self.values.lock() {
            map.insert(key.to_string(), value);
        }
    }
}

#[async_trait]
impl RuleStore for FakeRuleStore {
    async fn get_value(
        &self,
        _guild_id: GuildId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, RepoError> {
        if self.fail {
            return Err(RepoError::Database("store offline".to_string()));
        }
        Ok(self
            .values
            .lock()
            .ok()
            .and_then(|map| map.get(key).cloned()))
    }
}

/// LLM that replays canned responses in order, then errors.
pub struct CannedLlm {
    responses: Mutex<Vec<Result<String, String>>>,
}

impl CannedLlm {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    pub fn single(content: &str) -> Self {
        Self::new(vec![Ok(content.to_string())])
    }
}

#[async_trait]
impl LlmPort for CannedLlm {
    async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| if queue.is_empty() { None } else { Some(queue.remove(0)) });
        match next {
            Some(Ok(content)) => Ok(LlmResponse { content }),
            Some(Err(message)) => Err(LlmError::RequestFailed(message)),
            None => Err(LlmError::RequestFailed("no canned response left".to_string())),
        }
    }
}

/// Notifier that records every message.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(GuildId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.iter().map(|(_, msg)| msg.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotifierPort for RecordingNotifier {
    async fn notify(&self, guild_id: GuildId, message: &str) -> Result<(), NotifyError> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((guild_id, message.to_string()));
        }
        Ok(())
    }
}

/// In-memory pending-generation repository.
#[derive(Default)]
pub struct InMemoryPendingRepo {
    records: Mutex<HashMap<PendingGenerationId, PendingGeneration>>,
}

impl InMemoryPendingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_sync(&self, id: PendingGenerationId) -> Option<PendingGeneration> {
        self.records.lock().ok().and_then(|m| m.get(&id).cloned())
    }
}

#[async_trait]
impl PendingRepo for InMemoryPendingRepo {
    async fn insert(&self, record: &PendingGeneration) -> Result<(), RepoError> {
        self.records
            .lock()
            .map_err(|_| RepoError::Database("lock poisoned".to_string()))?
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: PendingGenerationId,
        guild_id: GuildId,
    ) -> Result<Option<PendingGeneration>, RepoError> {
        Ok(self
            .records
            .lock()
            .map_err(|_| RepoError::Database("lock poisoned".to_string()))?
            .get(&id)
            .filter(|r| r.guild_id == guild_id)
            .cloned())
    }

    async fn update(&self, record: &PendingGeneration) -> Result<(), RepoError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| RepoError::Database("lock poisoned".to_string()))?;
        if !records.contains_key(&record.id) {
            return Err(RepoError::not_found("PendingGeneration", record.id.to_string()));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }
}

/// In-memory player state repository.
#[derive(Default)]
pub struct InMemoryPlayerRepo {
    states: Mutex<HashMap<(GuildId, PlayerId), PlayerStatus>>,
}

impl InMemoryPlayerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_of(&self, guild_id: GuildId, player_id: PlayerId) -> PlayerStatus {
        self.states
            .lock()
            .ok()
            .and_then(|m| m.get(&(guild_id, player_id)).copied())
            .unwrap_or(PlayerStatus::Exploring)
    }
}

#[async_trait]
impl PlayerStateRepo for InMemoryPlayerRepo {
    async fn get_status(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
    ) -> Result<PlayerStatus, RepoError> {
        Ok(self.status_of(guild_id, player_id))
    }

    async fn set_status(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
        status: PlayerStatus,
    ) -> Result<(), RepoError> {
        self.states
            .lock()
            .map_err(|_| RepoError::Database("lock poisoned".to_string()))?
            .insert((guild_id, player_id), status);
        Ok(())
    }
}

/// Clock pinned to a fixed instant.
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn default_instant() -> Self {
        // Second argument is only None for out-of-range timestamps.
        Self(
            Utc.timestamp_opt(1_700_000_000, 0)
                .single()
                .unwrap_or_else(Utc::now),
        )
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
