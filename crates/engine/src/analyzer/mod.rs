//! Batch content analysis: generate, parse, score.
//!
//! One report per requested index. A failed generation or parse is recorded
//! on that report and the loop moves on; nothing short of the whole call
//! failing aborts a batch.

mod balance;
mod duplicates;
mod lore;
mod quality;
mod stub;

use std::sync::Arc;

use lorekeep_domain::{
    BatchAnalysisResult, EntityAnalysisReport, EntityType, GeneratedEntity, GuildId,
};

use crate::parser;
use crate::ports::{ChatMessage, LlmPort, LlmRequest};
use crate::prompts::{build_prompt, GenerationContext};
use crate::rules::{AnalyzerConfig, GuildRules};

/// One analysis run: `target_count` entities of `requested_type`.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub guild_id: GuildId,
    pub requested_type: EntityType,
    pub target_count: usize,
    pub context: GenerationContext,
    /// When false, deterministic stub output replaces the model call.
    pub use_real_generation: bool,
}

pub struct ContentAnalyzer {
    llm: Arc<dyn LlmPort>,
    rules: GuildRules,
}

impl ContentAnalyzer {
    pub fn new(llm: Arc<dyn LlmPort>, rules: GuildRules) -> Self {
        Self { llm, rules }
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> BatchAnalysisResult {
        // Rules resolve once per call; the heuristics below are pure.
        let config = self.rules.analyzer_config(request.guild_id).await;

        let mut reports = Vec::with_capacity(request.target_count);
        let mut entities: Vec<Option<GeneratedEntity>> = Vec::with_capacity(request.target_count);

        for index in 0..request.target_count {
            let mut report = EntityAnalysisReport::new(index);
            let entity = self.analyze_one(&request, index, &config, &mut report).await;
            entities.push(entity);
            reports.push(report);
        }

        duplicates::check(&mut reports, &entities);

        for report in &mut reports {
            report.finalize_scores();
        }

        let result = BatchAnalysisResult::new(request.requested_type, request.target_count, reports);
        tracing::info!(
            guild_id = %request.guild_id,
            requested_type = %request.requested_type,
            summary = %result.summary,
            "Analysis batch complete"
        );
        result
    }

    async fn analyze_one(
        &self,
        request: &AnalysisRequest,
        index: usize,
        config: &AnalyzerConfig,
        report: &mut EntityAnalysisReport,
    ) -> Option<GeneratedEntity> {
        let raw = match self.generate_raw(request, index).await {
            Ok(raw) => raw,
            Err(message) => {
                tracing::warn!(index, error = %message, "Generation failed for batch index");
                report.add_issue(format!("Generation failed: {}", message));
                return None;
            }
        };
        report.raw_output = Some(raw.clone());

        let payload = match parser::parse_with_languages(&raw, &config.required_languages) {
            Ok(payload) => payload,
            Err(err) => {
                report.add_issue(format!("Parse failed: {}", err));
                report.validation_errors.push(err);
                return None;
            }
        };

        let entity = match find_requested(&payload, request, index) {
            Ok(entity) => entity.clone(),
            Err(issue) => {
                report.add_issue(issue);
                return None;
            }
        };

        report.preview.name = Some(entity.display_name());
        report.preview.static_id = entity.static_id().map(str::to_string);
        report.preview.entity_type = Some(entity.entity_type());
        report.parsed_entity = serde_json::to_value(&entity).ok();

        quality::check(report, &entity, config);
        lore::check(report, &entity, config);
        balance::check(report, &entity, config);

        Some(entity)
    }

    async fn generate_raw(&self, request: &AnalysisRequest, index: usize) -> Result<String, String> {
        if !request.use_real_generation {
            return Ok(stub::stub_output(request.requested_type, index));
        }
        let prompt = build_prompt(request.requested_type, &request.context);
        let llm_request = LlmRequest::new(vec![ChatMessage::user(prompt)]).with_temperature(0.8);
        self.llm
            .generate(llm_request)
            .await
            .map(|response| response.content)
            .map_err(|e| e.to_string())
    }
}

/// Entity selection for one batch index. Single-entity runs accept the first
/// match anywhere in the payload; multi-entity runs require the matching
/// entity at the batch position and report a mismatch instead of silently
/// picking another entity.
fn find_requested<'a>(
    payload: &'a lorekeep_domain::ParsedPayload,
    request: &AnalysisRequest,
    index: usize,
) -> Result<&'a GeneratedEntity, String> {
    if request.target_count == 1 {
        return payload
            .first_of_type(request.requested_type)
            .map(|(_, entity)| entity)
            .ok_or_else(|| {
                format!(
                    "No {} entity found in the generated payload",
                    request.requested_type
                )
            });
    }
    // A payload that covers the whole batch is indexed by batch position;
    // a per-call payload holds this index's entity first.
    let position = if index < payload.entities().len() { index } else { 0 };
    match payload.entities().get(position) {
        Some(entity) if entity.entity_type() == request.requested_type => Ok(entity),
        Some(entity) => Err(format!(
            "Entity at batch index {} is {}, expected {}",
            index,
            entity.entity_type(),
            request.requested_type
        )),
        None => Err(format!(
            "No {} entity found in the generated payload",
            request.requested_type
        )),
    }
}
