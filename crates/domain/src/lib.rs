extern crate self as lorekeep_domain;

pub mod entities;
pub mod error;
pub mod i18n;
pub mod ids;
pub mod moderation;
pub mod payload;
pub mod report;

pub use entities::{
    ArmorProfile, Coordinates, EntityType, GeneratedEntity, GeneratedFaction, GeneratedItem,
    GeneratedLocation, GeneratedNpc, GeneratedNpcTrader, GeneratedQuest, GeneratedRelationship,
    InventoryItemEntry, ItemEffect, ItemType, NpcStats, QuestStep, Rarity, WeaponProfile,
    RELATIONSHIP_VALUE_MAX, RELATIONSHIP_VALUE_MIN,
};

pub use error::{ErrorPath, ValidationDetail, ValidationError};

pub use i18n::LocalizedText;

// Re-export ID types
pub use ids::{ContentId, GuildId, PendingGenerationId, PlayerId};

pub use moderation::{InvalidTransition, ModerationStatus, PendingGeneration, PlayerStatus};

pub use payload::ParsedPayload;

pub use report::{
    BatchAnalysisResult, EntityAnalysisReport, EntityPreview, OVERALL_LORE_KEY, OVERALL_QUALITY_KEY,
};
