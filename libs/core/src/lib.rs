pub mod arguments;
pub mod command;
pub mod context;
pub mod dispatcher;
pub mod entities;
pub mod error;
pub mod hooks;
pub mod interaction;
pub mod option;
pub mod registry;
pub mod schema;
pub mod sync;
pub mod transport;
pub mod types;

pub use arguments::{
    ArgumentValue, Arguments, PartialOptions, parse_autocomplete_options, resolve_arguments,
};
pub use command::{CommandBuilder, CommandDefinition, CommandScope, PermissionTarget, clean_doc};
pub use context::{ClientContext, CommandContext, DefaultClient, InteractionResponder};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use entities::{Member, Message, PartialChannel, Role, User};
pub use error::{
    ArgumentError, HandlerError, HookStage, RegistrationError, SchemaError, SyncError,
};
pub use hooks::{CommandHandler, NoopHandler};
pub use interaction::{
    CommandData, Interaction, InteractionKind, InteractionOption, ResolvedData,
};
pub use option::{NumericBound, OptionDefault, OptionSpec, ValueType, option_type_for};
pub use registry::{CommandRegistry, IdSnapshot};
pub use schema::{
    COMMAND_DESCRIPTION_PLACEHOLDER, CommandSchema, OPTION_DESCRIPTION_PLACEHOLDER, OptionChoice,
    OptionSchema, SchemaOption, derive_command_schema, derive_option_schema,
};
pub use sync::Synchronizer;
pub use transport::{
    ApplicationInfo, CommandDescriptor, CommandPermission, GuildCommandPermissions, Transport,
};
pub use types::{CommandId, CommandKind, GuildId, OptionType, Scope};
