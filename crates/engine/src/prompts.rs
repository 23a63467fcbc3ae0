//! Prompt construction for each generatable entity type.
//!
//! Builders are pure: guild context in, prompt text out. The model is told to
//! answer with a bare JSON array so the parser's salvage path stays a
//! fallback, not the norm.

use lorekeep_domain::EntityType;

/// Free-text context supplied by whoever asked for generation (a moderator
/// command, a world event, a test).
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub theme: Option<String>,
    pub location_name: Option<String>,
    pub level_hint: Option<u32>,
    pub extra_instructions: Option<String>,
}

const OUTPUT_CONTRACT: &str = "Respond with ONLY a JSON array of entity objects. \
Every object must carry an \"entity_type\" field. \
Localized text fields are objects keyed by language code, e.g. {\"en\": \"...\"}. \
No markdown, no commentary.";

/// Select a builder by entity type and produce the full prompt.
pub fn build_prompt(entity_type: EntityType, context: &GenerationContext) -> String {
    let body = match entity_type {
        EntityType::Quest => quest_prompt(context),
        EntityType::Item | EntityType::NpcTrader => economic_prompt(entity_type, context),
        EntityType::Location => location_prompt(context),
        EntityType::Faction => faction_prompt(context),
        EntityType::Npc | EntityType::Relationship => schema_prompt(entity_type, context),
    };
    format!("{}\n\n{}", body, OUTPUT_CONTRACT)
}

fn context_lines(context: &GenerationContext) -> String {
    let mut lines = Vec::new();
    if let Some(theme) = &context.theme {
        lines.push(format!("Theme: {}", theme));
    }
    if let Some(location) = &context.location_name {
        lines.push(format!("Setting: {}", location));
    }
    if let Some(level) = context.level_hint {
        lines.push(format!("Target player level: {}", level));
    }
    if let Some(extra) = &context.extra_instructions {
        lines.push(extra.clone());
    }
    lines.join("\n")
}

fn quest_prompt(context: &GenerationContext) -> String {
    format!(
        "Design one quest for a fantasy game world.\n{}\n\
         The quest object needs: \"entity_type\": \"quest\", static_id, title_i18n, \
         description_i18n, min_level, xp_reward, item_rewards (list of item static_ids, \
         may be empty), and a non-empty ordered \"steps\" list where each step has \
         title_i18n and description_i18n.",
        context_lines(context)
    )
}

fn economic_prompt(entity_type: EntityType, context: &GenerationContext) -> String {
    let shape = match entity_type {
        EntityType::Item => {
            "\"entity_type\": \"item\", static_id, name_i18n, description_i18n, \
             item_type (weapon|armor|consumable|misc), rarity \
             (common|uncommon|rare|epic|legendary), base_value in coins, and for \
             weapons a \"weapon\": {dice_count, dice_faces} block, for armor an \
             \"armor\": {armor_value} block"
        }
        _ => {
            "\"entity_type\": \"npc_trader\", static_id, name_i18n, description_i18n, \
             and an \"inventory\" list of {item_static_id, quantity, price_override?}"
        }
    };
    format!(
        "Design one economy entity for a fantasy game world.\n{}\n\
         Keep prices consistent with rarity. The object needs: {}.",
        context_lines(context),
        shape
    )
}

fn location_prompt(context: &GenerationContext) -> String {
    format!(
        "Design one location that fits the surrounding geography.\n{}\n\
         The object needs: \"entity_type\": \"location\", static_id, name_i18n, \
         description_i18n, and optionally \"coordinates\": {{x, y}}.",
        context_lines(context)
    )
}

fn faction_prompt(context: &GenerationContext) -> String {
    format!(
        "Design one faction with clear goals and rivals.\n{}\n\
         The object needs: \"entity_type\": \"faction\", static_id, name_i18n, \
         description_i18n.",
        context_lines(context)
    )
}

/// Generic schema-driven prompt for types without a specialized builder.
fn schema_prompt(entity_type: EntityType, context: &GenerationContext) -> String {
    let shape = match entity_type {
        EntityType::Npc => {
            "\"entity_type\": \"npc\", static_id, name_i18n, description_i18n, \
             level, and \"stats\": {health, attack, defense?}"
        }
        EntityType::Relationship => {
            "\"entity_type\": \"relationship\", description_i18n, source_static_id, \
             target_static_id, relationship_type, and value between -100 and 100"
        }
        other => return format!("Design one {} entity.\n{}", other, context_lines(context)),
    };
    format!(
        "Design one {} for a fantasy game world.\n{}\n\
         The object needs: {}.",
        entity_type,
        context_lines(context),
        shape
    )
}
