//! Moderation lifecycle: the `PendingGeneration` record and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{GuildId, PendingGenerationId, PlayerId};

/// Lifecycle of a generation request from trigger to permanent save.
///
/// `Saved` and `Rejected` are terminal; `ErrorOnSave` is recoverable via
/// edit + re-approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
    PendingModeration,
    ValidationFailed,
    EditedPendingApproval,
    Approved,
    Rejected,
    Saved,
    ErrorOnSave,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingModeration => "PENDING_MODERATION",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::EditedPendingApproval => "EDITED_PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Saved => "SAVED",
            Self::ErrorOnSave => "ERROR_ON_SAVE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Saved | Self::Rejected)
    }

    /// Only these states may enter `save()`.
    pub fn is_saveable(&self) -> bool {
        matches!(self, Self::Approved | Self::EditedPendingApproval)
    }

    pub fn can_transition_to(&self, next: ModerationStatus) -> bool {
        use ModerationStatus::*;
        match (self, next) {
            // Moderator decisions on a reviewable record
            (PendingModeration, Approved | Rejected | EditedPendingApproval) => true,
            (EditedPendingApproval, Approved | Rejected | EditedPendingApproval) => true,
            // Failed validation can only be edited or discarded
            (ValidationFailed, EditedPendingApproval | Rejected) => true,
            // Approval can still be withdrawn or amended until save succeeds
            (Approved, Rejected | EditedPendingApproval) => true,
            // Save outcomes
            (Approved, Saved | ErrorOnSave) => true,
            (EditedPendingApproval, Saved | ErrorOnSave) => true,
            // A failed save is recovered by editing, or given up on
            (ErrorOnSave, EditedPendingApproval | Rejected) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_MODERATION" => Ok(Self::PendingModeration),
            "VALIDATION_FAILED" => Ok(Self::ValidationFailed),
            "EDITED_PENDING_APPROVAL" => Ok(Self::EditedPendingApproval),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "SAVED" => Ok(Self::Saved),
            "ERROR_ON_SAVE" => Ok(Self::ErrorOnSave),
            other => Err(format!("Unknown moderation status: {}", other)),
        }
    }
}

/// Where a triggering player sits while their content is reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Exploring,
    AwaitingModeration,
}

impl PlayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exploring => "EXPLORING",
            Self::AwaitingModeration => "AWAITING_MODERATION",
        }
    }
}

impl std::str::FromStr for PlayerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXPLORING" => Ok(Self::Exploring),
            "AWAITING_MODERATION" => Ok(Self::AwaitingModeration),
            other => Err(format!("Unknown player status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ModerationStatus,
    pub to: ModerationStatus,
}

/// Persisted moderation record. Created on trigger, mutated by
/// approve/reject/edit/save, never deleted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingGeneration {
    pub id: PendingGenerationId,
    pub guild_id: GuildId,
    pub status: ModerationStatus,
    /// What prompted the generation (command context, quest hook, ...).
    pub trigger_context: String,
    pub prompt_text: String,
    pub raw_response: Option<String>,
    /// Serialized `ParsedPayload` wire JSON. Must be present whenever
    /// status is APPROVED or EDITED_PENDING_APPROVAL going into save().
    pub parsed_validated_data: Option<String>,
    /// Serialized `ValidationError` JSON when the trigger failed.
    pub validation_issues: Option<String>,
    pub moderator_notes: Option<String>,
    pub triggered_by: Option<PlayerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingGeneration {
    /// Record for a trigger whose payload parsed cleanly.
    pub fn new_pending(
        guild_id: GuildId,
        trigger_context: impl Into<String>,
        prompt_text: impl Into<String>,
        raw_response: impl Into<String>,
        parsed_validated_data: impl Into<String>,
        triggered_by: Option<PlayerId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PendingGenerationId::new(),
            guild_id,
            status: ModerationStatus::PendingModeration,
            trigger_context: trigger_context.into(),
            prompt_text: prompt_text.into(),
            raw_response: Some(raw_response.into()),
            parsed_validated_data: Some(parsed_validated_data.into()),
            validation_issues: None,
            moderator_notes: None,
            triggered_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record for a trigger whose payload failed validation.
    pub fn new_failed(
        guild_id: GuildId,
        trigger_context: impl Into<String>,
        prompt_text: impl Into<String>,
        raw_response: Option<String>,
        validation_issues: impl Into<String>,
        triggered_by: Option<PlayerId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PendingGenerationId::new(),
            guild_id,
            status: ModerationStatus::ValidationFailed,
            trigger_context: trigger_context.into(),
            prompt_text: prompt_text.into(),
            raw_response,
            parsed_validated_data: None,
            validation_issues: Some(validation_issues.into()),
            moderator_notes: None,
            triggered_by,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(
        &mut self,
        to: ModerationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    pub fn approve(
        &mut self,
        moderator_note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(ModerationStatus::Approved, now)?;
        if moderator_note.is_some() {
            self.moderator_notes = moderator_note;
        }
        Ok(())
    }

    pub fn reject(
        &mut self,
        moderator_note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(ModerationStatus::Rejected, now)?;
        if moderator_note.is_some() {
            self.moderator_notes = moderator_note;
        }
        Ok(())
    }

    /// Replace the payload and force re-approval.
    pub fn edit(
        &mut self,
        new_payload_json: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(ModerationStatus::EditedPendingApproval, now)?;
        self.parsed_validated_data = Some(new_payload_json.into());
        self.validation_issues = None;
        Ok(())
    }
}
