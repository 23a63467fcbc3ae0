//! Text-quality heuristics: i18n completeness, length bounds, placeholder
//! detection, and required-properties structure.

use lorekeep_domain::{EntityAnalysisReport, GeneratedEntity};

use crate::rules::AnalyzerConfig;

pub(super) fn check(
    report: &mut EntityAnalysisReport,
    entity: &GeneratedEntity,
    config: &AnalyzerConfig,
) {
    check_i18n_completeness(report, entity, config);
    check_length_bounds(report, entity, config);
    check_placeholders(report, entity, config);
    check_required_properties(report, entity, config);
}

/// Every required language present and non-blank in every localized field.
/// The component is the fraction of (field, language) slots filled.
fn check_i18n_completeness(
    report: &mut EntityAnalysisReport,
    entity: &GeneratedEntity,
    config: &AnalyzerConfig,
) {
    let fields = entity.localized_fields();
    if fields.is_empty() || config.required_languages.is_empty() {
        return;
    }

    let total_slots = fields.len() * config.required_languages.len();
    let mut missing_slots = 0usize;
    for (field, text) in &fields {
        for lang in text.missing_languages(&config.required_languages) {
            missing_slots += 1;
            report.add_issue(format!("Missing '{}' translation in {}", lang, field));
        }
    }

    let filled = (total_slots - missing_slots) as f64 / total_slots as f64;
    report.set_quality_component("i18n_completeness", filled);
}

/// Per-field character bounds, keyed "entity_type.field" in configuration.
/// Nested step fields match their quest-level key ("quest.steps title" bounds
/// are not separately configurable; steps reuse the title/description keys).
fn check_length_bounds(
    report: &mut EntityAnalysisReport,
    entity: &GeneratedEntity,
    config: &AnalyzerConfig,
) {
    for (field, text) in entity.localized_fields() {
        let base_field = field.rsplit('.').next().unwrap_or(&field);
        let Some(bounds) = config.length_bounds_for(entity.entity_type(), base_field) else {
            continue;
        };

        let mut in_bounds = true;
        for (lang, value) in text.iter() {
            let len = value.chars().count();
            if len < bounds.min || len > bounds.max {
                in_bounds = false;
                report.add_issue(format!(
                    "{} '{}' text is {} chars, outside [{}, {}]",
                    field, lang, len, bounds.min, bounds.max
                ));
            }
        }
        report.set_quality_component(
            format!("length.{}", field),
            if in_bounds { 1.0 } else { 0.4 },
        );
    }
}

/// Leftover generation scaffolding ("todo", "[description needed]", ...)
/// scanned case-insensitively across every localized value.
fn check_placeholders(
    report: &mut EntityAnalysisReport,
    entity: &GeneratedEntity,
    config: &AnalyzerConfig,
) {
    let mut hit = false;
    for (field, text) in entity.localized_fields() {
        for (lang, value) in text.iter() {
            let lowered = value.to_lowercase();
            if let Some(marker) = config
                .placeholder_markers
                .iter()
                .find(|m| lowered.contains(&m.to_lowercase()))
            {
                hit = true;
                report.add_issue(format!(
                    "Placeholder text \"{}\" in {} ('{}')",
                    marker, field, lang
                ));
            }
        }
    }
    if !entity.localized_fields().is_empty() {
        report.set_quality_component("placeholders", if hit { 0.2 } else { 1.0 });
    }
}

/// Guild-configured dot-paths that must resolve inside the free-form
/// properties map, e.g. "combat.aggression" for NPCs.
fn check_required_properties(
    report: &mut EntityAnalysisReport,
    entity: &GeneratedEntity,
    config: &AnalyzerConfig,
) {
    let required = config.required_properties_for(entity.entity_type());
    if required.is_empty() {
        return;
    }
    let Some(properties) = entity.properties() else {
        return;
    };

    let mut all_present = true;
    for path in required {
        if !path_exists(properties, path) {
            all_present = false;
            report.add_issue(format!("Required property '{}' is missing", path));
        }
    }
    report.set_quality_component("properties", if all_present { 1.0 } else { 0.5 });
}

fn path_exists(map: &serde_json::Map<String, serde_json::Value>, path: &str) -> bool {
    let mut current = serde_json::Value::Object(map.clone());
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next.clone(),
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::LengthBounds;
    use lorekeep_domain::{GeneratedNpc, LocalizedText};
    use serde_json::{json, Map};

    fn npc(name: LocalizedText, description: LocalizedText) -> GeneratedEntity {
        GeneratedEntity::Npc(GeneratedNpc {
            static_id: None,
            name_i18n: name,
            description_i18n: description,
            level: None,
            stats: None,
            properties: Map::new(),
        })
    }

    fn config_with_langs(langs: &[&str]) -> AnalyzerConfig {
        AnalyzerConfig {
            required_languages: langs.iter().map(|s| s.to_string()).collect(),
            ..AnalyzerConfig::default()
        }
    }

    #[test]
    fn complete_i18n_scores_full() {
        let entity = npc(
            LocalizedText::from([("en", "Guard"), ("ru", "Страж")]),
            LocalizedText::from([("en", "A guard."), ("ru", "Страж города.")]),
        );
        let mut report = EntityAnalysisReport::new(0);
        check_i18n_completeness(&mut report, &entity, &config_with_langs(&["en", "ru"]));
        assert_eq!(report.quality_score_details["i18n_completeness"], 1.0);
        assert!(report.issues_found.is_empty());
    }

    #[test]
    fn missing_language_lowers_the_fraction() {
        let entity = npc(
            LocalizedText::from([("en", "Guard")]),
            LocalizedText::from([("en", "A guard."), ("ru", "Страж города.")]),
        );
        let mut report = EntityAnalysisReport::new(0);
        check_i18n_completeness(&mut report, &entity, &config_with_langs(&["en", "ru"]));
        // 4 slots, 1 missing.
        assert_eq!(report.quality_score_details["i18n_completeness"], 0.75);
        assert!(report.issues_found[0].contains("'ru'"));
        assert!(report.issues_found[0].contains("name_i18n"));
    }

    #[test]
    fn length_bounds_flag_short_text() {
        let mut config = AnalyzerConfig::default();
        config.length_bounds.insert(
            "npc.description_i18n".to_string(),
            LengthBounds { min: 20, max: 500 },
        );
        let entity = npc(
            LocalizedText::from([("en", "Guard")]),
            LocalizedText::from([("en", "Short.")]),
        );
        let mut report = EntityAnalysisReport::new(0);
        check_length_bounds(&mut report, &entity, &config);
        assert!(report.issues_found[0].contains("6 chars"));
        assert_eq!(report.quality_score_details["length.description_i18n"], 0.4);
    }

    #[test]
    fn placeholder_markers_are_case_insensitive() {
        let entity = npc(
            LocalizedText::from([("en", "Guard")]),
            LocalizedText::from([("en", "TODO write something here")]),
        );
        let mut report = EntityAnalysisReport::new(0);
        check_placeholders(&mut report, &entity, &AnalyzerConfig::default());
        assert_eq!(report.quality_score_details["placeholders"], 0.2);
        assert!(report.issues_found[0].contains("description_i18n"));
    }

    #[test]
    fn required_property_paths_resolve_nested_maps() {
        let mut config = AnalyzerConfig::default();
        config
            .required_properties
            .insert("npc".to_string(), vec!["combat.aggression".to_string()]);

        let mut properties = Map::new();
        properties.insert("combat".to_string(), json!({"aggression": "low"}));
        let entity = GeneratedEntity::Npc(GeneratedNpc {
            static_id: None,
            name_i18n: LocalizedText::from([("en", "Guard")]),
            description_i18n: LocalizedText::from([("en", "A guard.")]),
            level: None,
            stats: None,
            properties,
        });
        let mut report = EntityAnalysisReport::new(0);
        check_required_properties(&mut report, &entity, &config);
        assert_eq!(report.quality_score_details["properties"], 1.0);

        let bare = npc(
            LocalizedText::from([("en", "Guard")]),
            LocalizedText::from([("en", "A guard.")]),
        );
        let mut report = EntityAnalysisReport::new(1);
        check_required_properties(&mut report, &bare, &config);
        assert_eq!(report.quality_score_details["properties"], 0.5);
        assert!(report.issues_found[0].contains("combat.aggression"));
    }
}
