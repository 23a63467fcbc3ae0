//! Moderation-channel notifier backed by structured logging.
//!
//! Deployments with a chat integration implement `NotifierPort` against
//! their transport; this adapter is the default sink and the one used by
//! local runs.

use async_trait::async_trait;

use lorekeep_domain::GuildId;

use crate::ports::{NotifierPort, NotifyError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotifierPort for TracingNotifier {
    async fn notify(&self, guild_id: GuildId, message: &str) -> Result<(), NotifyError> {
        tracing::info!(guild_id = %guild_id, message, "Moderation notification");
        Ok(())
    }
}
