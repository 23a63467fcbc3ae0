//! The closed set of generated entity shapes.
//!
//! `GeneratedEntity` is a tagged union over everything the content model may
//! emit. The `entity_type` discriminator selects the variant before the
//! variant-specific shape is decoded, so an unrecognized tag fails before any
//! field check runs.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::i18n::LocalizedText;

/// Inclusive domain for relationship `value`.
pub const RELATIONSHIP_VALUE_MIN: i32 = -100;
pub const RELATIONSHIP_VALUE_MAX: i32 = 100;

/// Discriminator for `GeneratedEntity` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Npc,
    Item,
    Quest,
    Faction,
    Location,
    Relationship,
    NpcTrader,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npc => "npc",
            Self::Item => "item",
            Self::Quest => "quest",
            Self::Faction => "faction",
            Self::Location => "location",
            Self::Relationship => "relationship",
            Self::NpcTrader => "npc_trader",
        }
    }

    pub const ALL: [EntityType; 7] = [
        Self::Npc,
        Self::Item,
        Self::Quest,
        Self::Faction,
        Self::Location,
        Self::Relationship,
        Self::NpcTrader,
    ];
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npc" => Ok(Self::Npc),
            "item" => Ok(Self::Item),
            "quest" => Ok(Self::Quest),
            "faction" => Ok(Self::Faction),
            "location" => Ok(Self::Location),
            "relationship" => Ok(Self::Relationship),
            "npc_trader" => Ok(Self::NpcTrader),
            other => Err(format!("Unknown entity type: {}", other)),
        }
    }
}

/// One generated entity, discriminated by `entity_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum GeneratedEntity {
    Npc(GeneratedNpc),
    Item(GeneratedItem),
    Quest(GeneratedQuest),
    Faction(GeneratedFaction),
    Location(GeneratedLocation),
    Relationship(GeneratedRelationship),
    NpcTrader(GeneratedNpcTrader),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcStats {
    pub health: i64,
    pub attack: i64,
    #[serde(default)]
    pub defense: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedNpc {
    #[serde(default)]
    pub static_id: Option<String>,
    pub name_i18n: LocalizedText,
    pub description_i18n: LocalizedText,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub stats: Option<NpcStats>,
    #[serde(default)]
    pub properties: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Weapon,
    Armor,
    Consumable,
    Misc,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Consumable => "consumable",
            Self::Misc => "misc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }

    /// Baseline value multiplier, overridable per guild.
    pub fn default_multiplier(&self) -> f64 {
        match self {
            Self::Common => 1.0,
            Self::Uncommon => 2.0,
            Self::Rare => 5.0,
            Self::Epic => 12.0,
            Self::Legendary => 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub dice_count: u32,
    pub dice_faces: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorProfile {
    pub armor_value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEffect {
    /// e.g. "heal", "buff", "damage"
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItem {
    #[serde(default)]
    pub static_id: Option<String>,
    pub name_i18n: LocalizedText,
    pub description_i18n: LocalizedText,
    pub item_type: ItemType,
    pub rarity: Rarity,
    pub base_value: i64,
    #[serde(default)]
    pub weapon: Option<WeaponProfile>,
    #[serde(default)]
    pub armor: Option<ArmorProfile>,
    #[serde(default)]
    pub effects: Vec<ItemEffect>,
    #[serde(default)]
    pub properties: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestStep {
    pub title_i18n: LocalizedText,
    pub description_i18n: LocalizedText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuest {
    #[serde(default)]
    pub static_id: Option<String>,
    pub title_i18n: LocalizedText,
    pub description_i18n: LocalizedText,
    pub min_level: u32,
    pub xp_reward: i64,
    /// static_ids of reward items.
    #[serde(default)]
    pub item_rewards: Vec<String>,
    /// Ordered; must be non-empty.
    pub steps: Vec<QuestStep>,
    #[serde(default)]
    pub properties: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFaction {
    #[serde(default)]
    pub static_id: Option<String>,
    pub name_i18n: LocalizedText,
    pub description_i18n: LocalizedText,
    #[serde(default)]
    pub properties: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedLocation {
    #[serde(default)]
    pub static_id: Option<String>,
    pub name_i18n: LocalizedText,
    pub description_i18n: LocalizedText,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub properties: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRelationship {
    #[serde(default)]
    pub static_id: Option<String>,
    pub description_i18n: LocalizedText,
    pub source_static_id: String,
    pub target_static_id: String,
    /// e.g. "ally", "rival", "member_of"
    pub relationship_type: String,
    /// Must lie in [RELATIONSHIP_VALUE_MIN, RELATIONSHIP_VALUE_MAX].
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemEntry {
    pub item_static_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub price_override: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedNpcTrader {
    #[serde(default)]
    pub static_id: Option<String>,
    pub name_i18n: LocalizedText,
    pub description_i18n: LocalizedText,
    #[serde(default)]
    pub inventory: Vec<InventoryItemEntry>,
    #[serde(default)]
    pub properties: Map<String, serde_json::Value>,
}

impl GeneratedEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Npc(_) => EntityType::Npc,
            Self::Item(_) => EntityType::Item,
            Self::Quest(_) => EntityType::Quest,
            Self::Faction(_) => EntityType::Faction,
            Self::Location(_) => EntityType::Location,
            Self::Relationship(_) => EntityType::Relationship,
            Self::NpcTrader(_) => EntityType::NpcTrader,
        }
    }

    pub fn static_id(&self) -> Option<&str> {
        match self {
            Self::Npc(e) => e.static_id.as_deref(),
            Self::Item(e) => e.static_id.as_deref(),
            Self::Quest(e) => e.static_id.as_deref(),
            Self::Faction(e) => e.static_id.as_deref(),
            Self::Location(e) => e.static_id.as_deref(),
            Self::Relationship(e) => e.static_id.as_deref(),
            Self::NpcTrader(e) => e.static_id.as_deref(),
        }
    }

    /// The primary name/title map, used for previews and duplicate checks.
    /// Relationships have no name of their own.
    pub fn name_map(&self) -> Option<&LocalizedText> {
        match self {
            Self::Npc(e) => Some(&e.name_i18n),
            Self::Item(e) => Some(&e.name_i18n),
            Self::Quest(e) => Some(&e.title_i18n),
            Self::Faction(e) => Some(&e.name_i18n),
            Self::Location(e) => Some(&e.name_i18n),
            Self::Relationship(_) => None,
            Self::NpcTrader(e) => Some(&e.name_i18n),
        }
    }

    /// Preferred display name for logs and previews.
    pub fn display_name(&self) -> String {
        self.name_map()
            .and_then(|m| m.display("en"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("<unnamed {}>", self.entity_type()))
    }

    /// Free-form properties map, where the variant has one.
    pub fn properties(&self) -> Option<&Map<String, serde_json::Value>> {
        match self {
            Self::Npc(e) => Some(&e.properties),
            Self::Item(e) => Some(&e.properties),
            Self::Quest(e) => Some(&e.properties),
            Self::Faction(e) => Some(&e.properties),
            Self::Location(e) => Some(&e.properties),
            Self::Relationship(_) => None,
            Self::NpcTrader(e) => Some(&e.properties),
        }
    }

    /// Every localized field on this entity, nested quest steps included.
    /// Field names use dotted paths for nested maps ("steps[0].title_i18n").
    pub fn localized_fields(&self) -> Vec<(String, &LocalizedText)> {
        match self {
            Self::Npc(e) => vec![
                ("name_i18n".to_string(), &e.name_i18n),
                ("description_i18n".to_string(), &e.description_i18n),
            ],
            Self::Item(e) => vec![
                ("name_i18n".to_string(), &e.name_i18n),
                ("description_i18n".to_string(), &e.description_i18n),
            ],
            Self::Quest(e) => {
                let mut fields = vec![
                    ("title_i18n".to_string(), &e.title_i18n),
                    ("description_i18n".to_string(), &e.description_i18n),
                ];
                for (i, step) in e.steps.iter().enumerate() {
                    fields.push((format!("steps[{}].title_i18n", i), &step.title_i18n));
                    fields.push((
                        format!("steps[{}].description_i18n", i),
                        &step.description_i18n,
                    ));
                }
                fields
            }
            Self::Faction(e) => vec![
                ("name_i18n".to_string(), &e.name_i18n),
                ("description_i18n".to_string(), &e.description_i18n),
            ],
            Self::Location(e) => vec![
                ("name_i18n".to_string(), &e.name_i18n),
                ("description_i18n".to_string(), &e.description_i18n),
            ],
            Self::Relationship(e) => {
                vec![("description_i18n".to_string(), &e.description_i18n)]
            }
            Self::NpcTrader(e) => vec![
                ("name_i18n".to_string(), &e.name_i18n),
                ("description_i18n".to_string(), &e.description_i18n),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminator_selects_variant() {
        let json = r#"{
            "entity_type": "npc",
            "name_i18n": {"en": "Guard"},
            "description_i18n": {"en": "A city guard."}
        }"#;
        let entity: GeneratedEntity = serde_json::from_str(json).expect("decode npc");
        assert_eq!(entity.entity_type(), EntityType::Npc);
        assert_eq!(entity.display_name(), "Guard");
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let json = r#"{"entity_type": "spellbook", "name_i18n": {"en": "X"}}"#;
        assert!(serde_json::from_str::<GeneratedEntity>(json).is_err());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        // item without base_value
        let json = r#"{
            "entity_type": "item",
            "name_i18n": {"en": "Sword"},
            "description_i18n": {"en": "A sword."},
            "item_type": "weapon",
            "rarity": "common"
        }"#;
        let err = serde_json::from_str::<GeneratedEntity>(json).expect_err("must fail");
        assert!(err.to_string().contains("base_value"));
    }

    #[test]
    fn quest_localized_fields_include_steps() {
        let quest = GeneratedQuest {
            static_id: Some("q_rats".to_string()),
            title_i18n: LocalizedText::from([("en", "Rat Hunt")]),
            description_i18n: LocalizedText::from([("en", "Clear the cellar.")]),
            min_level: 1,
            xp_reward: 100,
            item_rewards: vec![],
            steps: vec![QuestStep {
                title_i18n: LocalizedText::from([("en", "Enter the cellar")]),
                description_i18n: LocalizedText::from([("en", "Go downstairs.")]),
            }],
            properties: Map::new(),
        };
        let entity = GeneratedEntity::Quest(quest);
        let names: Vec<String> = entity
            .localized_fields()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "title_i18n",
                "description_i18n",
                "steps[0].title_i18n",
                "steps[0].description_i18n"
            ]
        );
    }

    #[test]
    fn entity_round_trips_through_json() {
        let json = r#"{
            "entity_type": "relationship",
            "description_i18n": {"en": "Old rivals."},
            "source_static_id": "npc_karl",
            "target_static_id": "npc_orm",
            "relationship_type": "rival",
            "value": -40
        }"#;
        let entity: GeneratedEntity = serde_json::from_str(json).expect("decode");
        let back = serde_json::to_string(&entity).expect("encode");
        let again: GeneratedEntity = serde_json::from_str(&back).expect("re-decode");
        assert_eq!(entity, again);
    }

    #[test]
    fn entity_type_parses_all_discriminators() {
        for ty in EntityType::ALL {
            assert_eq!(ty.as_str().parse::<EntityType>(), Ok(ty));
        }
        assert!("dragon".parse::<EntityType>().is_err());
    }
}
