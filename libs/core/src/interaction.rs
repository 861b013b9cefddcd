use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{CommandId, CommandKind, GuildId, OptionType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(try_from = "u8", into = "u8")]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
}

impl From<InteractionKind> for u8 {
    fn from(value: InteractionKind) -> Self {
        match value {
            InteractionKind::Ping => 1,
            InteractionKind::ApplicationCommand => 2,
            InteractionKind::MessageComponent => 3,
            InteractionKind::Autocomplete => 4,
            InteractionKind::ModalSubmit => 5,
        }
    }
}

impl TryFrom<u8> for InteractionKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(InteractionKind::Ping),
            2 => Ok(InteractionKind::ApplicationCommand),
            3 => Ok(InteractionKind::MessageComponent),
            4 => Ok(InteractionKind::Autocomplete),
            5 => Ok(InteractionKind::ModalSubmit),
            other => Err(format!("unknown interaction type {other}")),
        }
    }
}

/// One inbound interaction event, as delivered by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub data: CommandData,
    /// Invoking member, present inside guilds.
    #[serde(default)]
    pub member: Option<Value>,
    /// Invoking user, present in direct messages.
    #[serde(default)]
    pub user: Option<Value>,
}

impl Interaction {
    pub fn command_id(&self) -> &CommandId {
        &self.data.id
    }

    pub fn options(&self) -> &[InteractionOption] {
        &self.data.options
    }

    pub fn resolved(&self) -> &ResolvedData {
        &self.data.resolved
    }

    pub fn is_autocomplete(&self) -> bool {
        self.kind == InteractionKind::Autocomplete
    }

    /// Id of whoever invoked the command, from the member payload or the bare user.
    pub fn invoker_id(&self) -> Option<&str> {
        self.member
            .as_ref()
            .and_then(|member| member.get("user"))
            .or(self.user.as_ref())
            .and_then(|user| user.get("id"))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandData {
    #[serde(default)]
    pub id: CommandId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<CommandKind>,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
    #[serde(default)]
    pub resolved: ResolvedData,
    /// Target user or message of a context-menu command.
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
}

/// One provided option. Subcommand path segments carry the nested `options` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<InteractionOption>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
}

/// Raw entity payloads referenced by an interaction's options, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: HashMap<String, Value>,
    #[serde(default)]
    pub members: HashMap<String, Value>,
    #[serde(default)]
    pub roles: HashMap<String, Value>,
    #[serde(default)]
    pub channels: HashMap<String, Value>,
    #[serde(default)]
    pub messages: HashMap<String, Value>,
}
