use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform-assigned identifier of a registered application command.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct CommandId(pub String);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CommandId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct GuildId(pub String);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GuildId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GuildId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for GuildId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Registration boundary of a command.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Scope {
    Global,
    Guild(GuildId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Guild(id) => write!(f, "guild:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(try_from = "u8", into = "u8")]
pub enum CommandKind {
    Slash,
    User,
    Message,
}

impl CommandKind {
    pub fn code(self) -> u8 {
        match self {
            CommandKind::Slash => 1,
            CommandKind::User => 2,
            CommandKind::Message => 3,
        }
    }
}

impl From<CommandKind> for u8 {
    fn from(value: CommandKind) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CommandKind::Slash),
            2 => Ok(CommandKind::User),
            3 => Ok(CommandKind::Message),
            other => Err(format!("unknown application command type {other}")),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Slash => write!(f, "slash"),
            CommandKind::User => write!(f, "user"),
            CommandKind::Message => write!(f, "message"),
        }
    }
}

/// Wire-format option type codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(try_from = "u8", into = "u8")]
pub enum OptionType {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
}

impl OptionType {
    pub fn code(self) -> u8 {
        match self {
            OptionType::SubCommand => 1,
            OptionType::SubCommandGroup => 2,
            OptionType::String => 3,
            OptionType::Integer => 4,
            OptionType::Boolean => 5,
            OptionType::User => 6,
            OptionType::Channel => 7,
            OptionType::Role => 8,
            OptionType::Mentionable => 9,
            OptionType::Number => 10,
        }
    }

    /// Plain-value codes carry their value inline; the rest reference the resolved bag.
    pub fn is_plain_value(self) -> bool {
        matches!(
            self,
            OptionType::String | OptionType::Integer | OptionType::Boolean | OptionType::Number
        )
    }

    pub fn is_entity_reference(self) -> bool {
        matches!(
            self,
            OptionType::User | OptionType::Channel | OptionType::Role | OptionType::Mentionable
        )
    }

    pub fn is_subcommand_segment(self) -> bool {
        matches!(self, OptionType::SubCommand | OptionType::SubCommandGroup)
    }
}

impl From<OptionType> for u8 {
    fn from(value: OptionType) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for OptionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OptionType::SubCommand),
            2 => Ok(OptionType::SubCommandGroup),
            3 => Ok(OptionType::String),
            4 => Ok(OptionType::Integer),
            5 => Ok(OptionType::Boolean),
            6 => Ok(OptionType::User),
            7 => Ok(OptionType::Channel),
            8 => Ok(OptionType::Role),
            9 => Ok(OptionType::Mentionable),
            10 => Ok(OptionType::Number),
            other => Err(format!("unknown option type {other}")),
        }
    }
}
