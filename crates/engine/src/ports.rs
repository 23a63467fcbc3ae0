//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete
//! types. Ports exist for:
//! - Database access (pending records, saved content, player state)
//! - LLM calls (could swap Ollama -> Claude/OpenAI)
//! - Per-guild rule lookup
//! - Moderation-channel notification
//! - Clock (for testing)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lorekeep_domain::{
    ContentId, EntityType, GuildId, ModerationStatus, PendingGeneration, PendingGenerationId,
    PlayerId, PlayerStatus,
};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn database(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Database(format!("{}: {}", context, err))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

// =============================================================================
// LLM Port
// =============================================================================

/// A message in the conversation
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// LLM request type
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response from the LLM. The content is raw, untrusted text.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}

// =============================================================================
// Persistence Ports
// =============================================================================

/// CRUD over `PendingGeneration` rows (guild-scoped).
#[async_trait]
pub trait PendingRepo: Send + Sync {
    async fn insert(&self, record: &PendingGeneration) -> Result<(), RepoError>;
    async fn get(
        &self,
        id: PendingGenerationId,
        guild_id: GuildId,
    ) -> Result<Option<PendingGeneration>, RepoError>;
    async fn update(&self, record: &PendingGeneration) -> Result<(), RepoError>;
}

/// One piece of content committed by a batch save.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedContent {
    pub content_id: ContentId,
    pub entity_type: EntityType,
    pub static_id: Option<String>,
}

/// Result of the transactional batch save.
///
/// Every variant except `Saved` means no content row was committed; the
/// store records status/notes on the pending row itself where the contract
/// requires it.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// All entities committed; pending row is now SAVED.
    Saved { created: Vec<CreatedContent> },
    /// Pending row missing for this guild.
    NotFound,
    /// Status was not APPROVED / EDITED_PENDING_APPROVAL; nothing changed.
    InvalidStatus { actual: ModerationStatus },
    /// Approved record had no validated payload; row is now ERROR_ON_SAVE.
    MissingPayload,
    /// Persistence failed mid-batch; everything rolled back, row is now
    /// ERROR_ON_SAVE with the error text in its notes.
    Failed { error: String },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// All-or-nothing persistence of an approved payload.
///
/// The status check and transition happen inside the same transaction as the
/// content writes, so two concurrent saves on one pending id cannot both
/// commit.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save_batch(
        &self,
        pending_id: PendingGenerationId,
        guild_id: GuildId,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome, RepoError>;
}

/// Player moderation-status tracking.
#[async_trait]
pub trait PlayerStateRepo: Send + Sync {
    /// Missing rows read as `Exploring`.
    async fn get_status(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
    ) -> Result<PlayerStatus, RepoError>;
    async fn set_status(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
        status: PlayerStatus,
    ) -> Result<(), RepoError>;
}

// =============================================================================
// Rule Store Port
// =============================================================================

/// Raw per-guild configuration lookup. Values are arbitrary JSON; the typed
/// layer in `rules` decodes them defensively with defaults.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn get_value(
        &self,
        guild_id: GuildId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, RepoError>;
}

// =============================================================================
// Notification Port
// =============================================================================

#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn notify(&self, guild_id: GuildId, message: &str) -> Result<(), NotifyError>;
}

// =============================================================================
// Testability Ports
// =============================================================================

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
