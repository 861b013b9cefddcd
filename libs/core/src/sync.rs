use std::{collections::HashMap, sync::Arc};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{
    command::CommandDefinition,
    error::{RegistrationError, SyncError},
    registry::CommandRegistry,
    schema::CommandSchema,
    transport::{CommandDescriptor, GuildCommandPermissions, Transport},
    types::{CommandId, GuildId, Scope},
};

/// Uploads registered commands to the platform and binds the returned ids back to them.
pub struct Synchronizer {
    registry: Arc<CommandRegistry>,
    transport: Arc<dyn Transport>,
    application_id: OnceCell<String>,
}

impl Synchronizer {
    pub fn new(registry: Arc<CommandRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            application_id: OnceCell::new(),
        }
    }

    /// Skips the application info lookup when the id is already known.
    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = OnceCell::new_with(Some(application_id.into()));
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// The application id, fetched on first use and cached afterwards.
    pub async fn application_id(&self) -> Result<&str, SyncError> {
        let id = self
            .application_id
            .get_or_try_init(|| async {
                let info = self
                    .transport
                    .application_info()
                    .await
                    .map_err(|error| SyncError::Transport {
                        call: "application_info",
                        error,
                    })?;
                debug!(application_id = %info.id, "resolved application id");
                Ok::<_, SyncError>(info.id)
            })
            .await?;

        Ok(id.as_str())
    }

    /// Replaces the platform's global commands with the registered ones. Does nothing when no
    /// global command is registered.
    pub async fn upload_global(&self) -> Result<Vec<CommandDescriptor>, SyncError> {
        let Some(commands) = self.registry.commands_in(&Scope::Global)? else {
            debug!("no global commands registered, skipping upload");
            return Ok(Vec::new());
        };

        let application_id = self.application_id().await?;
        let schemas = schemas_of(&commands);

        let descriptors = self
            .transport
            .bulk_upsert_global_commands(application_id, &schemas)
            .await
            .map_err(|error| SyncError::Transport {
                call: "bulk_upsert_global_commands",
                error,
            })?;

        self.reconcile(&Scope::Global, &commands, &descriptors)?;
        info!(count = descriptors.len(), "global commands synchronized");

        Ok(descriptors)
    }

    /// Replaces the commands of one guild, or of every guild with registered commands when
    /// `guild_id` is `None`.
    pub async fn upload_guild(
        &self,
        guild_id: Option<&GuildId>,
    ) -> Result<Vec<CommandDescriptor>, SyncError> {
        let guilds = match guild_id {
            Some(guild_id) => vec![guild_id.clone()],
            None => self.registry.guilds()?,
        };

        let mut uploaded = Vec::new();
        for guild_id in guilds {
            uploaded.extend(self.upload_one_guild(&guild_id).await?);
        }

        Ok(uploaded)
    }

    async fn upload_one_guild(
        &self,
        guild_id: &GuildId,
    ) -> Result<Vec<CommandDescriptor>, SyncError> {
        let commands = self.guild_commands(guild_id)?;
        let application_id = self.application_id().await?;
        let schemas = schemas_of(&commands);

        let descriptors = self
            .transport
            .bulk_upsert_guild_commands(application_id, guild_id, &schemas)
            .await
            .map_err(|error| SyncError::Transport {
                call: "bulk_upsert_guild_commands",
                error,
            })?;

        self.reconcile(&Scope::Guild(guild_id.clone()), &commands, &descriptors)?;
        info!(guild = %guild_id, count = descriptors.len(), "guild commands synchronized");

        Ok(descriptors)
    }

    /// Uploads the permission overlay of every command registered in `guild_id`. All of them
    /// must have been synchronized first.
    pub async fn upload_guild_permissions(&self, guild_id: &GuildId) -> Result<(), SyncError> {
        let commands = self.guild_commands(guild_id)?;
        let scope = Scope::Guild(guild_id.clone());

        let mut payload = Vec::with_capacity(commands.len());
        for command in &commands {
            let id = command.id_in(&scope).ok_or_else(|| SyncError::NotSynchronized {
                name: command.name().to_string(),
            })?;
            payload.push(GuildCommandPermissions {
                id,
                permissions: command.permission_overlay(guild_id)?,
            });
        }

        let application_id = self.application_id().await?;
        self.transport
            .bulk_edit_guild_command_permissions(application_id, guild_id, &payload)
            .await
            .map_err(|error| SyncError::Transport {
                call: "bulk_edit_guild_command_permissions",
                error,
            })?;

        info!(guild = %guild_id, count = payload.len(), "guild command permissions uploaded");
        Ok(())
    }

    fn guild_commands(
        &self,
        guild_id: &GuildId,
    ) -> Result<Vec<Arc<CommandDefinition>>, SyncError> {
        match self.registry.commands_in(&Scope::Guild(guild_id.clone()))? {
            Some(commands) if !commands.is_empty() => Ok(commands),
            _ => Err(RegistrationError::NoGuildCommands(guild_id.clone()).into()),
        }
    }

    /// Matches every descriptor returned for `scope` to a local command by (name, type).
    /// Nothing is assigned unless every descriptor matches.
    fn reconcile(
        &self,
        scope: &Scope,
        commands: &[Arc<CommandDefinition>],
        descriptors: &[CommandDescriptor],
    ) -> Result<(), SyncError> {
        let by_key: HashMap<(String, u8), &Arc<CommandDefinition>> = commands
            .iter()
            .map(|command| (command.key(), command))
            .collect();

        let assignments = descriptors
            .iter()
            .map(|descriptor| {
                by_key
                    .get(&(descriptor.name.clone(), descriptor.kind))
                    .map(|command| (descriptor.id.clone(), Arc::clone(command)))
                    .ok_or_else(|| SyncError::ReconciliationMismatch {
                        name: descriptor.name.clone(),
                        kind: descriptor.kind,
                    })
            })
            .collect::<Result<Vec<(CommandId, Arc<CommandDefinition>)>, _>>()?;

        self.registry.publish(scope, &assignments);
        Ok(())
    }
}

fn schemas_of(commands: &[Arc<CommandDefinition>]) -> Vec<CommandSchema> {
    commands.iter().map(|command| command.to_schema()).collect()
}
