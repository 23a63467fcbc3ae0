//! Lore-consistency heuristics: banned and style-breaking keyword scans.

use lorekeep_domain::{EntityAnalysisReport, GeneratedEntity};

use crate::rules::AnalyzerConfig;

const BANNED_SCORE: f64 = 0.2;
const TYPE_BANNED_SCORE: f64 = 0.3;
const STYLE_SCORE: f64 = 0.5;

pub(super) fn check(
    report: &mut EntityAnalysisReport,
    entity: &GeneratedEntity,
    config: &AnalyzerConfig,
) {
    let type_banned = config.banned_keywords_for(entity.entity_type());

    for (field, text) in entity.localized_fields() {
        let component = format!("keywords.{}", field);
        report.set_lore_component(&component, 1.0);

        for (lang, value) in text.iter() {
            let lowered = value.to_lowercase();

            for keyword in &config.banned_keywords_global {
                if lowered.contains(&keyword.to_lowercase()) {
                    report.add_issue(format!(
                        "Banned keyword \"{}\" in {} ('{}')",
                        keyword, field, lang
                    ));
                    report.lower_lore_component(&component, BANNED_SCORE);
                }
            }

            for keyword in &type_banned {
                if lowered.contains(&keyword.to_lowercase()) {
                    report.add_issue(format!(
                        "Keyword \"{}\" is banned for {} entities (in {}, '{}')",
                        keyword,
                        entity.entity_type(),
                        field,
                        lang
                    ));
                    report.lower_lore_component(&component, TYPE_BANNED_SCORE);
                }
            }

            for keyword in &config.style_breaking_keywords {
                if lowered.contains(&keyword.to_lowercase()) {
                    report.add_issue(format!(
                        "Style-breaking term \"{}\" in {} ('{}')",
                        keyword, field, lang
                    ));
                    report.lower_lore_component(&component, STYLE_SCORE);
                }
            }
        }
    }
}
