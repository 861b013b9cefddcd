use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::{
    arguments::Arguments,
    command::CommandDefinition,
    error::HandlerError,
    interaction::Interaction,
    schema::OptionChoice,
};

/// Application-wide hooks of the bot client hosting the commands.
#[async_trait]
pub trait ClientContext: Send + Sync {
    /// Called for every failed invocation, before the command's own error hook.
    async fn command_error(&self, interaction: &Interaction, error: &HandlerError) {
        warn!(
            interaction = %interaction.id,
            command = %interaction.data.name,
            error = %error,
            "command invocation failed"
        );
    }
}

/// Client with no application behavior beyond the default logging.
pub struct DefaultClient;

#[async_trait]
impl ClientContext for DefaultClient {}

/// Sends interaction responses back to the platform.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn send_autocomplete_choices(
        &self,
        interaction: &Interaction,
        choices: &[OptionChoice],
    ) -> anyhow::Result<()>;

    async fn send_message(&self, interaction: &Interaction, content: &str) -> anyhow::Result<()>;
}

/// Everything a handler sees during one invocation. Built fresh for each interaction.
pub struct CommandContext {
    client: Arc<dyn ClientContext>,
    responder: Arc<dyn InteractionResponder>,
    interaction: Arc<Interaction>,
    command: Arc<CommandDefinition>,
    arguments: Arguments,
}

impl CommandContext {
    pub fn new(
        client: Arc<dyn ClientContext>,
        responder: Arc<dyn InteractionResponder>,
        interaction: Arc<Interaction>,
        command: Arc<CommandDefinition>,
    ) -> Self {
        Self {
            client,
            responder,
            interaction,
            command,
            arguments: Arguments::default(),
        }
    }

    pub fn client(&self) -> &Arc<dyn ClientContext> {
        &self.client
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn command(&self) -> &Arc<CommandDefinition> {
        &self.command
    }

    /// Arguments bound so far. Empty until the pre-check has passed.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub(crate) fn bind(&mut self, arguments: Arguments) {
        self.arguments = arguments;
    }

    /// Responds to the interaction with a plain message.
    pub async fn reply(&self, content: &str) -> anyhow::Result<()> {
        self.responder.send_message(&self.interaction, content).await
    }
}
