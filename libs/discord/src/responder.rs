use anyhow::Result;
use async_trait::async_trait;
use cmdwire_core::{Interaction, InteractionResponder, OptionChoice};
use serde::Serialize;

use crate::rest::RestClient;

const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
const APPLICATION_COMMAND_AUTOCOMPLETE_RESULT: u8 = 8;

/// Answers interactions through the interaction callback endpoint.
pub struct DiscordResponder {
    rest: RestClient,
}

impl DiscordResponder {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[derive(Debug, Serialize)]
struct InteractionCallback<T: Serialize> {
    #[serde(rename = "type")]
    kind: u8,
    data: T,
}

#[derive(Debug, Serialize)]
struct AutocompleteData<'a> {
    choices: &'a [OptionChoice],
}

#[derive(Debug, Serialize)]
struct MessageData<'a> {
    content: &'a str,
}

fn callback_path(interaction: &Interaction) -> String {
    format!("interactions/{}/{}/callback", interaction.id, interaction.token)
}

#[async_trait]
impl InteractionResponder for DiscordResponder {
    async fn send_autocomplete_choices(
        &self,
        interaction: &Interaction,
        choices: &[OptionChoice],
    ) -> Result<()> {
        let payload = InteractionCallback {
            kind: APPLICATION_COMMAND_AUTOCOMPLETE_RESULT,
            data: AutocompleteData { choices },
        };
        self.rest
            .post(&callback_path(interaction), &payload, "autocomplete callback")
            .await
    }

    async fn send_message(&self, interaction: &Interaction, content: &str) -> Result<()> {
        let payload = InteractionCallback {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: MessageData { content },
        };
        self.rest
            .post(&callback_path(interaction), &payload, "message callback")
            .await
    }
}
