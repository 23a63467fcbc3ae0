//! Lorekeep engine: turns raw generative-model output into validated game
//! content and drives it through human moderation into permanent storage.
//!
//! Module layout:
//! - `parser` - raw text -> validated `ParsedPayload`
//! - `analyzer` - heuristic balance/lore/quality scoring over parsed batches
//! - `moderation` - the trigger -> approve -> save lifecycle
//! - `rules` - per-guild configuration with safe defaults
//! - `prompts` - prompt builders, one per entity family
//! - `ports` - the ONLY abstractions: traits at infrastructure boundaries
//! - `infrastructure` - sqlite persistence, Ollama client, notifier, clock

pub mod analyzer;
pub mod infrastructure;
pub mod moderation;
pub mod parser;
pub mod ports;
pub mod prompts;
pub mod rules;

#[cfg(test)]
pub(crate) mod test_support;

pub use analyzer::{AnalysisRequest, ContentAnalyzer};
pub use moderation::{ModerationError, ModerationOrchestrator, TriggerContext, TriggerOutcome};
pub use parser::ResponseParser;
pub use prompts::GenerationContext;
pub use rules::GuildRules;
