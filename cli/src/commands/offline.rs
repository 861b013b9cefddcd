//! Stand-ins for the REST collaborators used by `dispatch --dry-run`.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use cmdwire_core::{
    ApplicationInfo, CommandDescriptor, CommandId, CommandSchema, GuildCommandPermissions, GuildId,
    Interaction, InteractionResponder, OptionChoice, Transport,
};
use tracing::info;

pub const OFFLINE_APPLICATION_ID: &str = "0";

/// Echoes every upload back as descriptors. The command named by `pinned` receives the pinned
/// id so a recorded interaction payload routes to it.
pub struct OfflineTransport {
    pinned: Option<(String, CommandId)>,
    next_id: AtomicU64,
}

impl OfflineTransport {
    pub fn new(pinned: Option<(String, CommandId)>) -> Self {
        Self {
            pinned,
            next_id: AtomicU64::new(1),
        }
    }

    fn echo(&self, commands: &[CommandSchema]) -> Vec<CommandDescriptor> {
        commands
            .iter()
            .map(|schema| {
                let id = match &self.pinned {
                    Some((name, id)) if *name == schema.name => id.clone(),
                    _ => CommandId(self.next_id.fetch_add(1, Ordering::Relaxed).to_string()),
                };
                CommandDescriptor {
                    id,
                    name: schema.name.clone(),
                    kind: schema.kind.unwrap_or(1),
                }
            })
            .collect()
    }
}

#[async_trait]
impl Transport for OfflineTransport {
    async fn application_info(&self) -> Result<ApplicationInfo> {
        Ok(ApplicationInfo {
            id: OFFLINE_APPLICATION_ID.to_string(),
            name: Some("offline".to_string()),
        })
    }

    async fn bulk_upsert_global_commands(
        &self,
        _application_id: &str,
        commands: &[CommandSchema],
    ) -> Result<Vec<CommandDescriptor>> {
        Ok(self.echo(commands))
    }

    async fn bulk_upsert_guild_commands(
        &self,
        _application_id: &str,
        _guild_id: &GuildId,
        commands: &[CommandSchema],
    ) -> Result<Vec<CommandDescriptor>> {
        Ok(self.echo(commands))
    }

    async fn bulk_edit_guild_command_permissions(
        &self,
        _application_id: &str,
        guild_id: &GuildId,
        permissions: &[GuildCommandPermissions],
    ) -> Result<()> {
        info!(guild = %guild_id, commands = permissions.len(), "offline permission upload");
        Ok(())
    }
}

/// Prints responses instead of posting them.
pub struct PrintingResponder;

#[async_trait]
impl InteractionResponder for PrintingResponder {
    async fn send_autocomplete_choices(
        &self,
        interaction: &Interaction,
        choices: &[OptionChoice],
    ) -> Result<()> {
        info!(interaction = %interaction.id, count = choices.len(), "autocomplete response");
        println!("{}", serde_json::to_string_pretty(choices)?);
        Ok(())
    }

    async fn send_message(&self, interaction: &Interaction, content: &str) -> Result<()> {
        info!(interaction = %interaction.id, "message response");
        println!("{content}");
        Ok(())
    }
}
