//! Deterministic stand-in generation for dry-run analysis.
//!
//! Output is wire-shaped raw text, exactly what a model call would hand the
//! parser, so the whole pipeline downstream of the LLM is exercised.

use lorekeep_domain::EntityType;

/// Produce raw "model output" for one entity of `entity_type`. Varies per
/// `index` so dry-run batches do not trip the duplicate checks.
pub(super) fn stub_output(entity_type: EntityType, index: usize) -> String {
    let n = index + 1;
    let value = match entity_type {
        EntityType::Npc => serde_json::json!([{
            "entity_type": "npc",
            "static_id": format!("npc_stub_{}", n),
            "name_i18n": {"en": format!("Stub Npc {}", n)},
            "description_i18n": {"en": format!("An unremarkable character, number {}.", n)},
            "level": 3,
            "stats": {"health": 30, "attack": 6}
        }]),
        EntityType::Item => serde_json::json!([{
            "entity_type": "item",
            "static_id": format!("itm_stub_{}", n),
            "name_i18n": {"en": format!("Stub Blade {}", n)},
            "description_i18n": {"en": "A perfectly average sword."},
            "item_type": "weapon",
            "rarity": "common",
            "base_value": 20,
            "weapon": {"dice_count": 2, "dice_faces": 6}
        }]),
        EntityType::Quest => serde_json::json!([{
            "entity_type": "quest",
            "static_id": format!("q_stub_{}", n),
            "title_i18n": {"en": format!("Stub Errand {}", n)},
            "description_i18n": {"en": "Fetch a thing, return it."},
            "min_level": 2,
            "xp_reward": 200,
            "item_rewards": [],
            "steps": [
                {"title_i18n": {"en": "Fetch"}, "description_i18n": {"en": "Find the thing."}},
                {"title_i18n": {"en": "Return"}, "description_i18n": {"en": "Bring it back."}}
            ]
        }]),
        EntityType::Faction => serde_json::json!([{
            "entity_type": "faction",
            "static_id": format!("fac_stub_{}", n),
            "name_i18n": {"en": format!("Stub Circle {}", n)},
            "description_i18n": {"en": "A society without strong opinions."}
        }]),
        EntityType::Location => serde_json::json!([{
            "entity_type": "location",
            "static_id": format!("loc_stub_{}", n),
            "name_i18n": {"en": format!("Stub Meadow {}", n)},
            "description_i18n": {"en": "Grass as far as the eye can see."},
            "coordinates": {"x": n as f64, "y": n as f64}
        }]),
        EntityType::Relationship => serde_json::json!([{
            "entity_type": "relationship",
            "description_i18n": {"en": "Cordial acquaintances."},
            "source_static_id": format!("npc_stub_{}", n),
            "target_static_id": format!("npc_stub_{}", n + 1),
            "relationship_type": "ally",
            "value": 25
        }]),
        EntityType::NpcTrader => serde_json::json!([{
            "entity_type": "npc_trader",
            "static_id": format!("npc_stub_trader_{}", n),
            "name_i18n": {"en": format!("Stub Peddler {}", n)},
            "description_i18n": {"en": "Sells stubs of all sizes."},
            "inventory": [{"item_static_id": format!("itm_stub_{}", n), "quantity": 3}]
        }]),
    };
    value.to_string()
}
