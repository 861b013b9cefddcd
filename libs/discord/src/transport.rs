use anyhow::Result;
use async_trait::async_trait;
use cmdwire_core::{
    ApplicationInfo, CommandDescriptor, CommandSchema, GuildCommandPermissions, GuildId, Transport,
};

use crate::rest::RestClient;

/// [`Transport`] backed by the Discord REST API.
pub struct DiscordTransport {
    rest: RestClient,
}

impl DiscordTransport {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

pub(crate) fn global_commands_path(application_id: &str) -> String {
    format!("applications/{application_id}/commands")
}

pub(crate) fn guild_commands_path(application_id: &str, guild_id: &GuildId) -> String {
    format!("applications/{application_id}/guilds/{guild_id}/commands")
}

pub(crate) fn guild_permissions_path(application_id: &str, guild_id: &GuildId) -> String {
    format!("applications/{application_id}/guilds/{guild_id}/commands/permissions")
}

#[async_trait]
impl Transport for DiscordTransport {
    async fn application_info(&self) -> Result<ApplicationInfo> {
        self.rest
            .get("oauth2/applications/@me", "application info")
            .await
    }

    async fn bulk_upsert_global_commands(
        &self,
        application_id: &str,
        commands: &[CommandSchema],
    ) -> Result<Vec<CommandDescriptor>> {
        self.rest
            .put(
                &global_commands_path(application_id),
                &commands,
                "bulk overwrite global commands",
            )
            .await
    }

    async fn bulk_upsert_guild_commands(
        &self,
        application_id: &str,
        guild_id: &GuildId,
        commands: &[CommandSchema],
    ) -> Result<Vec<CommandDescriptor>> {
        self.rest
            .put(
                &guild_commands_path(application_id, guild_id),
                &commands,
                "bulk overwrite guild commands",
            )
            .await
    }

    async fn bulk_edit_guild_command_permissions(
        &self,
        application_id: &str,
        guild_id: &GuildId,
        permissions: &[GuildCommandPermissions],
    ) -> Result<()> {
        let _: serde_json::Value = self
            .rest
            .put(
                &guild_permissions_path(application_id, guild_id),
                &permissions,
                "bulk edit guild command permissions",
            )
            .await?;
        Ok(())
    }
}
