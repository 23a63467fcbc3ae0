//! Per-entity analysis reports and batch aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::EntityType;
use crate::error::ValidationError;

/// Aggregate keys written back into the score-component maps. Excluded when
/// the mean over components is recomputed.
pub const OVERALL_QUALITY_KEY: &str = "overall_quality";
pub const OVERALL_LORE_KEY: &str = "overall_lore";

/// Balance score when nothing was measured and nothing was flagged.
const NEUTRAL_BALANCE: f64 = 0.75;
/// Balance score when issues exist but no component was measured.
const FLAGGED_BALANCE: f64 = 0.25;

/// Short identification of the analyzed entity for moderator display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPreview {
    pub name: Option<String>,
    pub static_id: Option<String>,
    pub entity_type: Option<EntityType>,
}

/// Everything the analyzer found out about one requested entity.
///
/// Created fresh per analysis call; holds no cross-call state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAnalysisReport {
    pub index: usize,
    pub preview: EntityPreview,
    /// Raw model output for this index, kept for audit.
    pub raw_output: Option<String>,
    /// Wire JSON of the parsed entity, when parsing succeeded.
    pub parsed_entity: Option<serde_json::Value>,
    pub issues_found: Vec<String>,
    pub suggestions: Vec<String>,
    pub balance_score_details: BTreeMap<String, f64>,
    pub lore_score_details: BTreeMap<String, f64>,
    pub quality_score_details: BTreeMap<String, f64>,
    pub balance_score: f64,
    pub overall_quality_avg: f64,
    pub overall_lore_avg: f64,
    pub validation_errors: Vec<ValidationError>,
}

impl EntityAnalysisReport {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn add_issue(&mut self, issue: impl Into<String>) {
        self.issues_found.push(issue.into());
    }

    pub fn add_suggestion(&mut self, suggestion: impl Into<String>) {
        self.suggestions.push(suggestion.into());
    }

    pub fn set_balance_component(&mut self, key: impl Into<String>, score: f64) {
        self.balance_score_details.insert(key.into(), score);
    }

    pub fn set_lore_component(&mut self, key: impl Into<String>, score: f64) {
        self.lore_score_details.insert(key.into(), score);
    }

    pub fn set_quality_component(&mut self, key: impl Into<String>, score: f64) {
        self.quality_score_details.insert(key.into(), score);
    }

    /// Lower an existing lore component, never raising it.
    pub fn lower_lore_component(&mut self, key: impl Into<String>, score: f64) {
        let entry = self.lore_score_details.entry(key.into()).or_insert(1.0);
        if score < *entry {
            *entry = score;
        }
    }

    /// Compute the derived scalar scores and write the aggregates back into
    /// their component maps under the aggregate keys.
    pub fn finalize_scores(&mut self) {
        self.balance_score = match (
            self.balance_score_details.is_empty(),
            self.issues_found.is_empty(),
        ) {
            (true, true) => NEUTRAL_BALANCE,
            (true, false) => FLAGGED_BALANCE,
            (false, _) => mean(self.balance_score_details.values()),
        };

        self.overall_quality_avg = mean_excluding(&self.quality_score_details, OVERALL_QUALITY_KEY);
        self.quality_score_details
            .insert(OVERALL_QUALITY_KEY.to_string(), self.overall_quality_avg);

        self.overall_lore_avg = mean_excluding(&self.lore_score_details, OVERALL_LORE_KEY);
        self.lore_score_details
            .insert(OVERALL_LORE_KEY.to_string(), self.overall_lore_avg);
    }
}

fn mean<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let collected: Vec<f64> = values.copied().collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}

fn mean_excluding(components: &BTreeMap<String, f64>, aggregate_key: &str) -> f64 {
    mean(
        components
            .iter()
            .filter(|(k, _)| k.as_str() != aggregate_key)
            .map(|(_, v)| v),
    )
}

/// All reports for one analysis call plus a one-line summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysisResult {
    pub requested_type: EntityType,
    pub requested_count: usize,
    pub reports: Vec<EntityAnalysisReport>,
    pub summary: String,
}

impl BatchAnalysisResult {
    pub fn new(
        requested_type: EntityType,
        requested_count: usize,
        reports: Vec<EntityAnalysisReport>,
    ) -> Self {
        let parsed = reports.iter().filter(|r| r.parsed_entity.is_some()).count();
        let total_issues: usize = reports.iter().map(|r| r.issues_found.len()).sum();
        let summary = format!(
            "Parsed {}/{} requested {} entities; {} issue(s) found",
            parsed, requested_count, requested_type, total_issues
        );
        Self {
            requested_type,
            requested_count,
            reports,
            summary,
        }
    }

    pub fn total_issues(&self) -> usize {
        self.reports.iter().map(|r| r.issues_found.len()).sum()
    }
}
