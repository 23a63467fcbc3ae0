//! Response parser: raw model output -> validated `ParsedPayload`.
//!
//! Validation runs in three stages with defined failure semantics:
//! JSON decode, structural (per-entity shape), semantic (typed-list rules).
//! Each stage stops at the first failure and never returns a partial result.

use serde_json::{Map, Value};

use lorekeep_domain::{
    ErrorPath, GeneratedEntity, GuildId, ParsedPayload, ValidationDetail, ValidationError,
    RELATIONSHIP_VALUE_MAX, RELATIONSHIP_VALUE_MIN,
};

use crate::rules::GuildRules;

const PARSER_VERSION: &str = "1";

pub struct ResponseParser {
    rules: GuildRules,
}

impl ResponseParser {
    pub fn new(rules: GuildRules) -> Self {
        Self { rules }
    }

    /// Parse and validate raw model output for one guild.
    pub async fn parse(
        &self,
        raw_text: &str,
        guild_id: GuildId,
    ) -> Result<ParsedPayload, ValidationError> {
        let required_languages = self.rules.required_languages(guild_id).await;
        let payload = parse_with_languages(raw_text, &required_languages)?;
        tracing::debug!(
            guild_id = %guild_id,
            entity_count = payload.len(),
            "Parsed generation payload"
        );
        Ok(payload)
    }

    /// Re-validate an already-serialized payload (moderator edits arrive as
    /// wire JSON, not raw model text).
    pub async fn revalidate(
        &self,
        payload_json: &str,
        guild_id: GuildId,
    ) -> Result<ParsedPayload, ValidationError> {
        let required_languages = self.rules.required_languages(guild_id).await;
        let payload: ParsedPayload = serde_json::from_str(payload_json).map_err(|e| {
            ValidationError::structural(format!("Edited payload is not valid wire JSON: {}", e))
        })?;
        for (index, entity) in payload.entities().iter().enumerate() {
            structural_entity_checks(index, entity)?;
        }
        semantic_checks(payload.entities(), &required_languages)?;
        Ok(payload)
    }
}

/// The full pipeline with the language set already resolved. Pure; the unit
/// tests target this directly.
pub(crate) fn parse_with_languages(
    raw_text: &str,
    required_languages: &[String],
) -> Result<ParsedPayload, ValidationError> {
    let decoded = decode_json(raw_text)?;
    let entities = decode_entities(&decoded)?;
    semantic_checks(&entities, required_languages)?;
    build_payload(entities, raw_text)
}

/// Decode the raw text as JSON. Model output is frequently wrapped in prose,
/// so a direct failure gets one salvage attempt on the first `[`..last `]`
/// slice before giving up.
fn decode_json(raw_text: &str) -> Result<Value, ValidationError> {
    match serde_json::from_str::<Value>(raw_text) {
        Ok(value) => Ok(value),
        Err(direct_err) => {
            let salvaged = match (raw_text.find('['), raw_text.rfind(']')) {
                (Some(start), Some(end)) if end > start => {
                    serde_json::from_str::<Value>(&raw_text[start..=end]).ok()
                }
                _ => None,
            };
            salvaged.ok_or_else(|| {
                ValidationError::json_parsing(format!(
                    "Model output is not valid JSON: {}",
                    direct_err
                ))
            })
        }
    }
}

/// Structural pass: the value must be an array of recognized entity objects.
/// Stops at the first failing element.
fn decode_entities(value: &Value) -> Result<Vec<GeneratedEntity>, ValidationError> {
    let elements = value.as_array().ok_or_else(|| {
        ValidationError::structural("Expected a JSON array of entities")
            .with_detail(ValidationDetail::new("$").expected("array").actual(json_type(value)))
    })?;

    let mut entities = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let object = element.as_object().ok_or_else(|| {
            ValidationError::structural(format!("Entity at index {} is not an object", index))
                .with_detail(
                    ValidationDetail::new("$")
                        .expected("object")
                        .actual(json_type(element)),
                )
                .with_path(ErrorPath::at_index(index))
        })?;

        let discriminator = object
            .get("entity_type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ValidationError::structural(format!(
                    "Entity at index {} has no entity_type discriminator",
                    index
                ))
                .with_detail(ValidationDetail::new("entity_type").expected("string"))
                .with_path(ErrorPath::at_field(index, "entity_type"))
            })?;

        if discriminator.parse::<lorekeep_domain::EntityType>().is_err() {
            return Err(ValidationError::structural(format!(
                "Entity at index {} has unrecognized entity_type '{}'",
                index, discriminator
            ))
            .with_detail(
                ValidationDetail::new("entity_type")
                    .expected("one of npc|item|quest|faction|location|relationship|npc_trader")
                    .actual(discriminator),
            )
            .with_path(ErrorPath::at_field(index, "entity_type")));
        }

        let entity: GeneratedEntity = serde_json::from_value(element.clone()).map_err(|e| {
            let mut err = ValidationError::structural(format!(
                "Entity at index {} failed the {} shape check: {}",
                index, discriminator, e
            ));
            if let Some(field) = missing_field_name(&e) {
                err = err
                    .with_detail(ValidationDetail::new(&field).expected("present"))
                    .with_path(ErrorPath::at_field(index, field));
            } else {
                err = err.with_path(ErrorPath::at_index(index));
            }
            err
        })?;

        structural_entity_checks(index, &entity)?;
        entities.push(entity);
    }

    Ok(entities)
}

/// Invariants serde cannot express: non-empty static_id, non-empty i18n
/// maps with non-blank values, and at least one quest step.
fn structural_entity_checks(
    index: usize,
    entity: &GeneratedEntity,
) -> Result<(), ValidationError> {
    if let Some(static_id) = entity.static_id() {
        if static_id.trim().is_empty() {
            return Err(ValidationError::structural(format!(
                "Entity at index {} has an empty static_id",
                index
            ))
            .with_detail(ValidationDetail::new("static_id").expected("non-empty string"))
            .with_path(ErrorPath::at_field(index, "static_id")));
        }
    }

    if let GeneratedEntity::Quest(quest) = entity {
        if quest.steps.is_empty() {
            return Err(
                ValidationError::structural("Quest must have at least one step.")
                    .with_detail(ValidationDetail::new("steps").expected("non-empty list").actual("[]"))
                    .with_path(ErrorPath::at_field(index, "steps")),
            );
        }
    }

    for (field, text) in entity.localized_fields() {
        if text.is_empty() {
            return Err(ValidationError::structural(format!(
                "Localized field {} at index {} is empty",
                field, index
            ))
            .with_detail(ValidationDetail::new(&field).expected("non-empty i18n map"))
            .with_path(ErrorPath::at_field(index, field)));
        }
        let blank = text.blank_entries();
        if let Some(lang) = blank.first() {
            return Err(ValidationError::structural(format!(
                "Localized field {} at index {} has blank text for language '{}'",
                field, index, lang
            ))
            .with_detail(
                ValidationDetail::new(&field)
                    .expected("non-empty text")
                    .actual(format!("blank '{}' entry", lang)),
            )
            .with_path(ErrorPath::at_field(index, field)));
        }
    }

    Ok(())
}

/// Semantic pass over the fully-typed list. Stops at the first violation.
fn semantic_checks(
    entities: &[GeneratedEntity],
    required_languages: &[String],
) -> Result<(), ValidationError> {
    for (index, entity) in entities.iter().enumerate() {
        for (field, text) in entity.localized_fields() {
            let missing = text.missing_languages(required_languages);
            if let Some(lang) = missing.first() {
                return Err(ValidationError::semantic(format!(
                    "Required language '{}' missing in {} at index {}",
                    lang, field, index
                ))
                .with_detail(
                    ValidationDetail::new(&field)
                        .expected(format!("language '{}'", lang))
                        .actual(format!(
                            "languages [{}]",
                            text.languages().collect::<Vec<_>>().join(", ")
                        )),
                )
                .with_path(ErrorPath::at_field(index, field)));
            }
        }

        match entity {
            GeneratedEntity::Relationship(rel) => {
                if rel.value < RELATIONSHIP_VALUE_MIN || rel.value > RELATIONSHIP_VALUE_MAX {
                    return Err(ValidationError::semantic(format!(
                        "Relationship value {} at index {} is outside [{}, {}]",
                        rel.value, index, RELATIONSHIP_VALUE_MIN, RELATIONSHIP_VALUE_MAX
                    ))
                    .with_detail(
                        ValidationDetail::new("value")
                            .expected(format!(
                                "{}..={}",
                                RELATIONSHIP_VALUE_MIN, RELATIONSHIP_VALUE_MAX
                            ))
                            .actual(rel.value.to_string()),
                    )
                    .with_path(ErrorPath::at_field(index, "value")));
                }
            }
            GeneratedEntity::NpcTrader(trader) => {
                if let Some(pos) = trader.inventory.iter().position(|entry| entry.quantity == 0) {
                    return Err(ValidationError::semantic(format!(
                        "Trader inventory entry {} at index {} has zero quantity",
                        pos, index
                    ))
                    .with_detail(
                        ValidationDetail::new(format!("inventory[{}].quantity", pos))
                            .expected(">= 1")
                            .actual("0"),
                    )
                    .with_path(ErrorPath::at_field(
                        index,
                        format!("inventory[{}].quantity", pos),
                    )));
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Assemble the immutable payload. Metadata construction is the one place
/// something unexpected could fail; it wraps as `Internal`.
fn build_payload(
    entities: Vec<GeneratedEntity>,
    raw_text: &str,
) -> Result<ParsedPayload, ValidationError> {
    let mut metadata = Map::new();
    metadata.insert(
        "entity_count".to_string(),
        serde_json::to_value(entities.len())
            .map_err(|e| ValidationError::internal(format!("Metadata encoding failed: {}", e)))?,
    );
    metadata.insert(
        "parser_version".to_string(),
        Value::String(PARSER_VERSION.to_string()),
    );
    Ok(ParsedPayload::new(entities, raw_text, metadata))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// serde_json reports missing struct fields as "missing field `name`".
fn missing_field_name(err: &serde_json::Error) -> Option<String> {
    let message = err.to_string();
    let rest = message.strip_prefix("missing field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}
