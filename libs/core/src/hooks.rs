use async_trait::async_trait;
use tracing::error;

use crate::{
    arguments::PartialOptions, context::CommandContext, error::HandlerError, schema::OptionChoice,
};

/// Application behavior attached to a command. Every method has a default so handlers only
/// implement the stages they care about.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Runs before arguments are resolved. Returning `false` aborts the invocation.
    async fn pre_check(&self, _ctx: &CommandContext) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Runs once arguments are bound. Returning `false` aborts the invocation.
    async fn check(&self, _ctx: &CommandContext) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn callback(&self, _ctx: &CommandContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Suggests choices for the focused option of a partially filled command.
    async fn autocomplete(
        &self,
        _ctx: &CommandContext,
        _options: &PartialOptions,
        _focused: Option<&str>,
    ) -> anyhow::Result<Vec<OptionChoice>> {
        Ok(Vec::new())
    }

    async fn error(&self, ctx: &CommandContext, failure: &HandlerError) {
        error!(
            command = %ctx.command().qualified_name(),
            interaction = %ctx.interaction().id,
            error = %failure,
            "application command failed"
        );
    }
}

/// Handler used when a command is declared without one.
pub struct NoopHandler;

#[async_trait]
impl CommandHandler for NoopHandler {}
