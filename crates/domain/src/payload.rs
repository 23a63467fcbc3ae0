//! The validated payload produced by the response parser.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::entities::{EntityType, GeneratedEntity};

/// Ordered entity list plus the raw model output it was parsed from.
///
/// Immutable once constructed; the raw text is kept verbatim for audit.
/// The serialized form is the storage wire format and must round-trip
/// exactly:
///
/// ```json
/// { "generated_entities": [...], "raw_ai_output": "...", "parsing_metadata": {...} }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedPayload {
    generated_entities: Vec<GeneratedEntity>,
    raw_ai_output: String,
    #[serde(default)]
    parsing_metadata: Map<String, serde_json::Value>,
}

impl ParsedPayload {
    pub fn new(
        entities: Vec<GeneratedEntity>,
        raw_ai_output: impl Into<String>,
        parsing_metadata: Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            generated_entities: entities,
            raw_ai_output: raw_ai_output.into(),
            parsing_metadata,
        }
    }

    pub fn entities(&self) -> &[GeneratedEntity] {
        &self.generated_entities
    }

    pub fn raw_ai_output(&self) -> &str {
        &self.raw_ai_output
    }

    pub fn metadata(&self) -> &Map<String, serde_json::Value> {
        &self.parsing_metadata
    }

    pub fn len(&self) -> usize {
        self.generated_entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generated_entities.is_empty()
    }

    /// First entity of the given type, with its batch index.
    pub fn first_of_type(&self, entity_type: EntityType) -> Option<(usize, &GeneratedEntity)> {
        self.generated_entities
            .iter()
            .enumerate()
            .find(|(_, e)| e.entity_type() == entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{GeneratedFaction, GeneratedNpc};
    use crate::i18n::LocalizedText;

    fn npc(name: &str) -> GeneratedEntity {
        GeneratedEntity::Npc(GeneratedNpc {
            static_id: None,
            name_i18n: LocalizedText::from([("en", name)]),
            description_i18n: LocalizedText::from([("en", "desc")]),
            level: None,
            stats: None,
            properties: Map::new(),
        })
    }

    #[test]
    fn wire_format_uses_expected_keys() {
        let payload = ParsedPayload::new(vec![npc("Guard")], "[]", Map::new());
        let value = serde_json::to_value(&payload).expect("serialize");
        let obj = value.as_object().expect("object");
        assert!(obj.contains_key("generated_entities"));
        assert!(obj.contains_key("raw_ai_output"));
        assert!(obj.contains_key("parsing_metadata"));
    }

    #[test]
    fn round_trip_preserves_entity_list() {
        let faction = GeneratedEntity::Faction(GeneratedFaction {
            static_id: Some("fac_crows".to_string()),
            name_i18n: LocalizedText::from([("en", "The Crows")]),
            description_i18n: LocalizedText::from([("en", "Thieves' guild.")]),
            properties: Map::new(),
        });
        let payload = ParsedPayload::new(vec![npc("Guard"), faction], "raw text", Map::new());
        let json = serde_json::to_string(&payload).expect("serialize");
        let back: ParsedPayload = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, payload);
    }

    #[test]
    fn first_of_type_finds_index() {
        let payload = ParsedPayload::new(vec![npc("A"), npc("B")], "", Map::new());
        let (index, entity) = payload.first_of_type(EntityType::Npc).expect("found");
        assert_eq!(index, 0);
        assert_eq!(entity.display_name(), "A");
        assert!(payload.first_of_type(EntityType::Quest).is_none());
    }
}
