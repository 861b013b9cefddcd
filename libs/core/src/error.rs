use thiserror::Error;

use crate::types::{CommandKind, GuildId, Scope};

/// Invalid command or option configuration, raised while a command is being defined.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("min or max specified for option {option}, but it is not an integer or number")]
    BoundsOnNonNumeric { option: String },

    #[error("option {option} has a min value ({min}) greater than its max value ({max})")]
    InvertedBounds { option: String, min: f64, max: f64 },

    #[error("{kind} commands must take exactly one option, named '{expected}' (command {command})")]
    FixedParameter {
        command: String,
        kind: CommandKind,
        expected: &'static str,
    },

    #[error("only slash commands can have subcommands (command {command})")]
    ChildrenOnContextCommand { command: String },

    #[error("command {command} declares subcommand {child} more than once")]
    DuplicateChild { command: String, child: String },

    #[error("command {command} declares option {option} more than once")]
    DuplicateOption { command: String, option: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("guild {0} has no application commands set")]
    NoGuildCommands(GuildId),

    #[error("{kind} command {name} is already registered in scope {scope}")]
    Duplicate {
        name: String,
        kind: CommandKind,
        scope: Scope,
    },

    #[error("command {name} is a subcommand of {parent} and cannot be registered on its own")]
    NotTopLevel { name: String, parent: String },

    #[error("failed to lock {0}")]
    LockPoisoned(&'static str),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("platform returned {kind} command {name}, which has no local definition")]
    ReconciliationMismatch { name: String, kind: u8 },

    #[error("command {name} has not been assigned an id yet; upload its scope first")]
    NotSynchronized { name: String },

    #[error("transport call {call} failed: {error}")]
    Transport {
        call: &'static str,
        error: anyhow::Error,
    },
}

/// Failure to turn raw interaction options into typed argument values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("option {option} references {entity} {id}, which is missing from the resolved data")]
    Unresolved {
        option: String,
        entity: &'static str,
        id: String,
    },

    #[error("option {option} of type {kind} carries no value")]
    MissingValue { option: String, kind: u8 },

    #[error("option {option} carries a non-snowflake value")]
    InvalidSnowflake { option: String },

    #[error("interaction carries no resolved {0}")]
    MissingTarget(&'static str),

    #[error("subcommand {name} does not match any declared subcommand")]
    UnexpectedSubcommand { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreCheck,
    Check,
    Callback,
    Autocomplete,
}

impl std::fmt::Display for HookStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookStage::PreCheck => write!(f, "pre_check"),
            HookStage::Check => write!(f, "check"),
            HookStage::Callback => write!(f, "callback"),
            HookStage::Autocomplete => write!(f, "autocomplete"),
        }
    }
}

/// Anything that goes wrong inside one interaction's pipeline. Caught at the dispatcher boundary.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("the pre-check for {command} failed")]
    PreCheckFailed { command: String },

    #[error("the check for {command} failed")]
    CheckFailed { command: String },

    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error("{stage} hook of {command} failed: {error}")]
    Hook {
        command: String,
        stage: HookStage,
        error: anyhow::Error,
    },

    #[error("failed to send autocomplete choices for {command}: {error}")]
    Respond {
        command: String,
        error: anyhow::Error,
    },
}

impl HandlerError {
    /// The error returned by an application hook, if this failure came from one.
    pub fn hook_error(&self) -> Option<&anyhow::Error> {
        match self {
            HandlerError::Hook { error, .. } => Some(error),
            _ => None,
        }
    }
}
