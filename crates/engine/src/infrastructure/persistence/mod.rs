//! SQLite persistence for moderation records, saved content, players, and
//! per-guild rules.

mod connection;
mod content_repository;
mod pending_repository;
mod player_repository;
mod rule_repository;

pub use connection::Database;
pub use content_repository::SqliteContentStore;
pub use pending_repository::SqlitePendingRepo;
pub use player_repository::SqlitePlayerStateRepo;
pub use rule_repository::SqliteRuleStore;
