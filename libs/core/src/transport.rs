use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    schema::CommandSchema,
    types::{CommandId, GuildId},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A command as echoed back by the platform after a bulk upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub id: CommandId,
    pub name: String,
    #[serde(rename = "type", default = "default_command_type")]
    pub kind: u8,
}

fn default_command_type() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPermission {
    pub id: String,
    /// 1 for roles, 2 for members.
    #[serde(rename = "type")]
    pub kind: u8,
    pub permission: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildCommandPermissions {
    pub id: CommandId,
    pub permissions: Vec<CommandPermission>,
}

/// The HTTP surface the synchronizer needs. Bulk uploads fully replace the commands of their
/// scope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn application_info(&self) -> Result<ApplicationInfo>;

    async fn bulk_upsert_global_commands(
        &self,
        application_id: &str,
        commands: &[CommandSchema],
    ) -> Result<Vec<CommandDescriptor>>;

    async fn bulk_upsert_guild_commands(
        &self,
        application_id: &str,
        guild_id: &GuildId,
        commands: &[CommandSchema],
    ) -> Result<Vec<CommandDescriptor>>;

    async fn bulk_edit_guild_command_permissions(
        &self,
        application_id: &str,
        guild_id: &GuildId,
        permissions: &[GuildCommandPermissions],
    ) -> Result<()>;
}
