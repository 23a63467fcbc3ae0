//! Typed per-guild rules with safe defaults.
//!
//! The raw store hands back arbitrary JSON; every getter here declares the
//! shape it expects and falls back to a hard-coded default when the key is
//! absent or malformed, so a misconfigured guild can never panic the
//! pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use lorekeep_domain::{EntityType, GuildId, Rarity};

use crate::ports::RuleStore;

/// Rule keys. Kept together so call sites and tests agree on spelling.
pub mod keys {
    pub const REQUIRED_LANGUAGES: &str = "i18n.required_languages";
    pub const VARIANCE_PCT: &str = "balance.variance_pct";
    pub const RARITY_MULTIPLIERS: &str = "balance.rarity_multipliers";
    pub const DAMAGE_FACTOR: &str = "balance.damage_factor";
    pub const AC_FACTOR: &str = "balance.ac_factor";
    pub const MAX_WEAPON_DICE: &str = "balance.max_weapon_dice";
    pub const HEAL_TOO_STRONG_MARKERS: &str = "balance.heal_too_strong_markers";
    pub const AVG_HP_PER_LEVEL: &str = "balance.avg_hp_per_level";
    pub const AVG_ATTACK_PER_LEVEL: &str = "balance.avg_attack_per_level";
    pub const XP_PER_LEVEL_POINT: &str = "balance.xp_per_level_point";
    pub const QUEST_REWARD_CAPS: &str = "balance.quest_reward_caps";
    pub const QUEST_REWARD_CAP_DEFAULT: &str = "balance.quest_reward_cap_default";
    pub const QUEST_STEP_CAP_BASE: &str = "balance.quest_step_cap_base";
    pub const QUEST_STEP_CAP_PER_LEVEL: &str = "balance.quest_step_cap_per_level";
    pub const LENGTH_BOUNDS: &str = "quality.length_bounds";
    pub const PLACEHOLDER_MARKERS: &str = "quality.placeholder_markers";
    pub const BANNED_KEYWORDS_GLOBAL: &str = "lore.banned_keywords";
    pub const BANNED_KEYWORDS_BY_TYPE: &str = "lore.banned_keywords_by_type";
    pub const STYLE_BREAKING_KEYWORDS: &str = "lore.style_breaking_keywords";
    pub const REQUIRED_PROPERTIES: &str = "properties.required_paths";
}

/// Hard-coded fallbacks used when a guild has no rule (or a malformed one).
pub mod defaults {
    pub const REQUIRED_LANGUAGES: &[&str] = &["en"];
    pub const VARIANCE_PCT: f64 = 30.0;
    pub const DAMAGE_FACTOR: f64 = 10.0;
    pub const AC_FACTOR: f64 = 8.0;
    pub const MAX_WEAPON_DICE: u32 = 10;
    pub const HEAL_TOO_STRONG_MARKERS: &[&str] = &["full heal", "fully restore", "resurrect", "infinite"];
    pub const AVG_HP_PER_LEVEL: f64 = 10.0;
    pub const AVG_ATTACK_PER_LEVEL: f64 = 2.0;
    pub const XP_PER_LEVEL_POINT: f64 = 100.0;
    pub const QUEST_REWARD_CAP: usize = 3;
    pub const QUEST_STEP_CAP_BASE: f64 = 5.0;
    pub const QUEST_STEP_CAP_PER_LEVEL: f64 = 0.5;
    pub const PLACEHOLDER_MARKERS: &[&str] =
        &["todo", "tbd", "[description needed]", "lorem ipsum", "placeholder"];
}

/// One row of the level-banded quest reward cap table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RewardCapBand {
    pub level_lte: u32,
    pub max_items: usize,
}

/// Inclusive character-length bounds for a localized field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

/// Everything the analyzer needs, resolved once per analysis call.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub required_languages: Vec<String>,
    pub variance_pct: f64,
    pub rarity_multipliers: BTreeMap<String, f64>,
    pub damage_factor: f64,
    pub ac_factor: f64,
    pub max_weapon_dice: u32,
    pub heal_too_strong_markers: Vec<String>,
    pub avg_hp_per_level: f64,
    pub avg_attack_per_level: f64,
    pub xp_per_level_point: f64,
    pub quest_reward_caps: Vec<RewardCapBand>,
    pub quest_reward_cap_default: usize,
    pub quest_step_cap_base: f64,
    pub quest_step_cap_per_level: f64,
    /// Keyed "entity_type.field", e.g. "item.name_i18n".
    pub length_bounds: BTreeMap<String, LengthBounds>,
    pub placeholder_markers: Vec<String>,
    pub banned_keywords_global: Vec<String>,
    pub banned_keywords_by_type: BTreeMap<String, Vec<String>>,
    pub style_breaking_keywords: Vec<String>,
    /// Dot-path keys that must exist in the entity's properties map.
    pub required_properties: BTreeMap<String, Vec<String>>,
}

impl AnalyzerConfig {
    pub fn rarity_multiplier(&self, rarity: Rarity) -> f64 {
        self.rarity_multipliers
            .get(rarity.as_str())
            .copied()
            .unwrap_or_else(|| rarity.default_multiplier())
    }

    pub fn length_bounds_for(&self, entity_type: EntityType, field: &str) -> Option<LengthBounds> {
        self.length_bounds
            .get(&format!("{}.{}", entity_type, field))
            .copied()
    }

    /// First band whose `level_lte` covers the quest's min_level wins.
    pub fn reward_cap_for_level(&self, min_level: u32) -> usize {
        self.quest_reward_caps
            .iter()
            .find(|band| band.level_lte >= min_level)
            .map(|band| band.max_items)
            .unwrap_or(self.quest_reward_cap_default)
    }

    pub fn banned_keywords_for(&self, entity_type: EntityType) -> Vec<&str> {
        self.banned_keywords_by_type
            .get(entity_type.as_str())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn required_properties_for(&self, entity_type: EntityType) -> &[String] {
        self.required_properties
            .get(entity_type.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            required_languages: to_strings(defaults::REQUIRED_LANGUAGES),
            variance_pct: defaults::VARIANCE_PCT,
            rarity_multipliers: BTreeMap::new(),
            damage_factor: defaults::DAMAGE_FACTOR,
            ac_factor: defaults::AC_FACTOR,
            max_weapon_dice: defaults::MAX_WEAPON_DICE,
            heal_too_strong_markers: to_strings(defaults::HEAL_TOO_STRONG_MARKERS),
            avg_hp_per_level: defaults::AVG_HP_PER_LEVEL,
            avg_attack_per_level: defaults::AVG_ATTACK_PER_LEVEL,
            xp_per_level_point: defaults::XP_PER_LEVEL_POINT,
            quest_reward_caps: Vec::new(),
            quest_reward_cap_default: defaults::QUEST_REWARD_CAP,
            quest_step_cap_base: defaults::QUEST_STEP_CAP_BASE,
            quest_step_cap_per_level: defaults::QUEST_STEP_CAP_PER_LEVEL,
            length_bounds: BTreeMap::new(),
            placeholder_markers: to_strings(defaults::PLACEHOLDER_MARKERS),
            banned_keywords_global: Vec::new(),
            banned_keywords_by_type: BTreeMap::new(),
            style_breaking_keywords: Vec::new(),
            required_properties: BTreeMap::new(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Typed facade over the raw rule store.
#[derive(Clone)]
pub struct GuildRules {
    store: Arc<dyn RuleStore>,
}

impl GuildRules {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    /// Fetch a raw value; store failures log and read as absent.
    async fn value(&self, guild_id: GuildId, key: &str) -> Option<serde_json::Value> {
        match self.store.get_value(guild_id, key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, guild_id = %guild_id, key, "Rule lookup failed, using default");
                None
            }
        }
    }

    /// Decode a rule value into `T`, defaulting on absence or bad shape.
    async fn typed<T: serde::de::DeserializeOwned>(
        &self,
        guild_id: GuildId,
        key: &str,
        default: T,
    ) -> T {
        match self.value(guild_id, key).await {
            Some(value) => match serde_json::from_value(value) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        guild_id = %guild_id,
                        key,
                        "Malformed rule value, using default"
                    );
                    default
                }
            },
            None => default,
        }
    }

    pub async fn required_languages(&self, guild_id: GuildId) -> Vec<String> {
        let langs: Vec<String> = self
            .typed(
                guild_id,
                keys::REQUIRED_LANGUAGES,
                to_strings(defaults::REQUIRED_LANGUAGES),
            )
            .await;
        if langs.is_empty() {
            to_strings(defaults::REQUIRED_LANGUAGES)
        } else {
            langs
        }
    }

    /// Resolve the full analyzer configuration for one guild.
    pub async fn analyzer_config(&self, guild_id: GuildId) -> AnalyzerConfig {
        AnalyzerConfig {
            required_languages: self.required_languages(guild_id).await,
            variance_pct: self
                .typed(guild_id, keys::VARIANCE_PCT, defaults::VARIANCE_PCT)
                .await,
            rarity_multipliers: self
                .typed(guild_id, keys::RARITY_MULTIPLIERS, BTreeMap::new())
                .await,
            damage_factor: self
                .typed(guild_id, keys::DAMAGE_FACTOR, defaults::DAMAGE_FACTOR)
                .await,
            ac_factor: self
                .typed(guild_id, keys::AC_FACTOR, defaults::AC_FACTOR)
                .await,
            max_weapon_dice: self
                .typed(guild_id, keys::MAX_WEAPON_DICE, defaults::MAX_WEAPON_DICE)
                .await,
            heal_too_strong_markers: self
                .typed(
                    guild_id,
                    keys::HEAL_TOO_STRONG_MARKERS,
                    to_strings(defaults::HEAL_TOO_STRONG_MARKERS),
                )
                .await,
            avg_hp_per_level: self
                .typed(guild_id, keys::AVG_HP_PER_LEVEL, defaults::AVG_HP_PER_LEVEL)
                .await,
            avg_attack_per_level: self
                .typed(
                    guild_id,
                    keys::AVG_ATTACK_PER_LEVEL,
                    defaults::AVG_ATTACK_PER_LEVEL,
                )
                .await,
            xp_per_level_point: self
                .typed(
                    guild_id,
                    keys::XP_PER_LEVEL_POINT,
                    defaults::XP_PER_LEVEL_POINT,
                )
                .await,
            quest_reward_caps: self
                .typed(guild_id, keys::QUEST_REWARD_CAPS, Vec::new())
                .await,
            quest_reward_cap_default: self
                .typed(
                    guild_id,
                    keys::QUEST_REWARD_CAP_DEFAULT,
                    defaults::QUEST_REWARD_CAP,
                )
                .await,
            quest_step_cap_base: self
                .typed(
                    guild_id,
                    keys::QUEST_STEP_CAP_BASE,
                    defaults::QUEST_STEP_CAP_BASE,
                )
                .await,
            quest_step_cap_per_level: self
                .typed(
                    guild_id,
                    keys::QUEST_STEP_CAP_PER_LEVEL,
                    defaults::QUEST_STEP_CAP_PER_LEVEL,
                )
                .await,
            length_bounds: self
                .typed(guild_id, keys::LENGTH_BOUNDS, BTreeMap::new())
                .await,
            placeholder_markers: self
                .typed(
                    guild_id,
                    keys::PLACEHOLDER_MARKERS,
                    to_strings(defaults::PLACEHOLDER_MARKERS),
                )
                .await,
            banned_keywords_global: self
                .typed(guild_id, keys::BANNED_KEYWORDS_GLOBAL, Vec::new())
                .await,
            banned_keywords_by_type: self
                .typed(guild_id, keys::BANNED_KEYWORDS_BY_TYPE, BTreeMap::new())
                .await,
            style_breaking_keywords: self
                .typed(guild_id, keys::STYLE_BREAKING_KEYWORDS, Vec::new())
                .await,
            required_properties: self
                .typed(guild_id, keys::REQUIRED_PROPERTIES, BTreeMap::new())
                .await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_support::FakeRuleStore;

    #[tokio::test]
    async fn required_languages_default_to_english() {
        let rules = GuildRules::new(Arc::new(FakeRuleStore::new()));
        assert_eq!(rules.required_languages(GuildId::new()).await, vec!["en"]);
    }

    #[tokio::test]
    async fn configured_languages_are_used() {
        let store = FakeRuleStore::new();
        store.set(keys::REQUIRED_LANGUAGES, serde_json::json!(["en", "ru"]));
        let rules = GuildRules::new(Arc::new(store));
        assert_eq!(
            rules.required_languages(GuildId::new()).await,
            vec!["en", "ru"]
        );
    }

    #[tokio::test]
    async fn malformed_rule_falls_back_to_default() {
        let store = FakeRuleStore::new();
        store.set(keys::VARIANCE_PCT, serde_json::json!("lots"));
        store.set(keys::REQUIRED_LANGUAGES, serde_json::json!(42));
        let rules = GuildRules::new(Arc::new(store));
        let config = rules.analyzer_config(GuildId::new()).await;
        assert_eq!(config.variance_pct, defaults::VARIANCE_PCT);
        assert_eq!(config.required_languages, vec!["en"]);
    }

    #[tokio::test]
    async fn store_failure_reads_as_defaults() {
        let rules = GuildRules::new(Arc::new(FakeRuleStore::failing()));
        let config = rules.analyzer_config(GuildId::new()).await;
        assert_eq!(config.variance_pct, defaults::VARIANCE_PCT);
        assert_eq!(config.max_weapon_dice, defaults::MAX_WEAPON_DICE);
    }

    #[test]
    fn reward_cap_uses_first_matching_band() {
        let config = AnalyzerConfig {
            quest_reward_caps: vec![
                RewardCapBand {
                    level_lte: 5,
                    max_items: 1,
                },
                RewardCapBand {
                    level_lte: 10,
                    max_items: 2,
                },
            ],
            ..AnalyzerConfig::default()
        };
        assert_eq!(config.reward_cap_for_level(3), 1);
        assert_eq!(config.reward_cap_for_level(5), 1);
        assert_eq!(config.reward_cap_for_level(8), 2);
        // Past the table: configured default cap.
        assert_eq!(config.reward_cap_for_level(50), defaults::QUEST_REWARD_CAP);
    }

    #[test]
    fn rarity_multiplier_prefers_guild_override() {
        let mut multipliers = BTreeMap::new();
        multipliers.insert("rare".to_string(), 7.5);
        let config = AnalyzerConfig {
            rarity_multipliers: multipliers,
            ..AnalyzerConfig::default()
        };
        assert_eq!(config.rarity_multiplier(Rarity::Rare), 7.5);
        assert_eq!(
            config.rarity_multiplier(Rarity::Epic),
            Rarity::Epic.default_multiplier()
        );
    }
}
