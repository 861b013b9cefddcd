//! Turns the raw options of an interaction into typed argument values.
//!
//! Plain values pass through untouched. Entity references are looked up in the interaction's
//! resolved data, and declared options the user left out fall back to their defaults.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::{
    command::CommandDefinition,
    entities::{Member, Message, PartialChannel, Role, User},
    error::ArgumentError,
    interaction::{Interaction, InteractionOption},
    types::{CommandKind, OptionType},
};

/// Options of a partially filled command, as handed to autocomplete. Absent values are null.
pub type PartialOptions = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Value(Value),
    User(User),
    Member(Member),
    Channel(PartialChannel),
    Role(Role),
    Message(Message),
}

impl ArgumentValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ArgumentValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArgumentValue::Value(Value::Null))
    }
}

/// Named arguments bound for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: HashMap<String, ArgumentValue>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ArgumentValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgumentValue)> {
        self.values.iter()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_value()?.as_str()
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_value()?.as_i64()
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_value()?.as_f64()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_value()?.as_bool()
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        match self.get(name)? {
            ArgumentValue::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        match self.get(name)? {
            ArgumentValue::Member(member) => Some(member),
            _ => None,
        }
    }

    pub fn channel(&self, name: &str) -> Option<&PartialChannel> {
        match self.get(name)? {
            ArgumentValue::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        match self.get(name)? {
            ArgumentValue::Role(role) => Some(role),
            _ => None,
        }
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        match self.get(name)? {
            ArgumentValue::Message(message) => Some(message),
            _ => None,
        }
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: ArgumentValue) {
        self.values.insert(name.into(), value);
    }
}

impl FromIterator<(String, ArgumentValue)> for Arguments {
    fn from_iter<T: IntoIterator<Item = (String, ArgumentValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Binds `options`, the leaf option list after subcommand descent, to `command`'s declared
/// parameters. Context-menu commands ignore `options` and bind their target instead.
pub fn resolve_arguments(
    command: &CommandDefinition,
    interaction: &Interaction,
    options: &[InteractionOption],
) -> Result<Arguments, ArgumentError> {
    match command.kind() {
        CommandKind::User => {
            let mut arguments = Arguments::default();
            arguments.insert("target", resolve_user_target(interaction)?);
            Ok(arguments)
        }
        CommandKind::Message => {
            let mut arguments = Arguments::default();
            arguments.insert(
                "message",
                ArgumentValue::Message(resolve_message_target(interaction)?),
            );
            Ok(arguments)
        }
        CommandKind::Slash => resolve_slash(command, interaction, options),
    }
}

fn resolve_slash(
    command: &CommandDefinition,
    interaction: &Interaction,
    options: &[InteractionOption],
) -> Result<Arguments, ArgumentError> {
    let mut arguments = Arguments::default();

    for option in options {
        let value = if option.kind.is_plain_value() {
            ArgumentValue::Value(option.value.clone().ok_or_else(|| {
                ArgumentError::MissingValue {
                    option: option.name.clone(),
                    kind: option.kind.code(),
                }
            })?)
        } else if option.kind.is_entity_reference() {
            resolve_entity(interaction, option)?
        } else {
            // Only subcommand and group segments remain, and descent already consumed those
            // that name a child.
            return Err(ArgumentError::UnexpectedSubcommand {
                name: option.name.clone(),
            });
        };

        arguments.insert(option.name.clone(), value);
    }

    for spec in command.options() {
        if !arguments.contains(spec.name()) {
            arguments.insert(
                spec.name(),
                ArgumentValue::Value(spec.resolve_default(interaction)),
            );
        }
    }

    Ok(arguments)
}

fn snowflake(option: &InteractionOption) -> Result<String, ArgumentError> {
    match &option.value {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) if id.is_u64() => Ok(id.to_string()),
        _ => Err(ArgumentError::InvalidSnowflake {
            option: option.name.clone(),
        }),
    }
}

fn resolve_entity(
    interaction: &Interaction,
    option: &InteractionOption,
) -> Result<ArgumentValue, ArgumentError> {
    let id = snowflake(option)?;
    let resolved = interaction.resolved();
    let guild_id = interaction.guild_id.clone();

    let unresolved = |entity: &'static str| ArgumentError::Unresolved {
        option: option.name.clone(),
        entity,
        id: id.clone(),
    };

    match option.kind {
        OptionType::User => user_or_member(interaction, &id).ok_or_else(|| unresolved("user")),
        OptionType::Channel => resolved
            .channels
            .get(&id)
            .map(|raw| {
                ArgumentValue::Channel(PartialChannel {
                    id: id.clone(),
                    guild_id,
                    raw: raw.clone(),
                })
            })
            .ok_or_else(|| unresolved("channel")),
        OptionType::Role => resolved
            .roles
            .get(&id)
            .map(|raw| {
                ArgumentValue::Role(Role {
                    id: id.clone(),
                    guild_id,
                    raw: raw.clone(),
                })
            })
            .ok_or_else(|| unresolved("role")),
        OptionType::Mentionable => user_or_member(interaction, &id)
            .or_else(|| {
                resolved.roles.get(&id).map(|raw| {
                    ArgumentValue::Role(Role {
                        id: id.clone(),
                        guild_id,
                        raw: raw.clone(),
                    })
                })
            })
            .ok_or_else(|| unresolved("mentionable")),
        _ => Err(ArgumentError::MissingValue {
            option: option.name.clone(),
            kind: option.kind.code(),
        }),
    }
}

/// Members win over bare users so that guild interactions bind guild-scoped data.
fn user_or_member(interaction: &Interaction, id: &str) -> Option<ArgumentValue> {
    let resolved = interaction.resolved();

    if let Some(member) = resolved.members.get(id) {
        return Some(ArgumentValue::Member(Member::from_parts(
            id,
            interaction.guild_id.clone(),
            member.clone(),
            resolved.users.get(id).cloned(),
        )));
    }

    resolved
        .users
        .get(id)
        .map(|raw| ArgumentValue::User(User::from_raw(id, raw.clone())))
}

fn target_key<'a>(
    interaction: &'a Interaction,
    bag: &'a HashMap<String, Value>,
) -> Option<&'a String> {
    match &interaction.data.target_id {
        Some(target) => bag.get_key_value(target).map(|(key, _)| key),
        None => bag.keys().next(),
    }
}

fn resolve_user_target(interaction: &Interaction) -> Result<ArgumentValue, ArgumentError> {
    let resolved = interaction.resolved();
    let key = target_key(interaction, &resolved.users)
        .or_else(|| target_key(interaction, &resolved.members))
        .ok_or(ArgumentError::MissingTarget("user"))?;

    user_or_member(interaction, key).ok_or(ArgumentError::MissingTarget("user"))
}

fn resolve_message_target(interaction: &Interaction) -> Result<Message, ArgumentError> {
    let messages = &interaction.resolved().messages;
    let key = target_key(interaction, messages).ok_or(ArgumentError::MissingTarget("message"))?;
    let raw = messages
        .get(key)
        .ok_or(ArgumentError::MissingTarget("message"))?;

    let channel_id = raw
        .get("channel_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| interaction.channel_id.clone());

    Ok(Message {
        id: key.clone(),
        channel_id,
        raw: raw.clone(),
    })
}

/// Flattens the options of an autocomplete interaction. Every declared option appears in the
/// map; entity references are coerced to integer ids when they parse as one. Returns the map
/// and the name of the focused option, if any.
pub fn parse_autocomplete_options(
    command: &CommandDefinition,
    options: &[InteractionOption],
) -> (PartialOptions, Option<String>) {
    let mut partial: PartialOptions = command
        .options()
        .iter()
        .map(|spec| (spec.name().to_string(), Value::Null))
        .collect();
    let mut focused = None;

    for option in options {
        if option.focused {
            focused = Some(option.name.clone());
        }

        let value = match option.value.clone() {
            Some(raw) if matches!(option.kind, OptionType::User | OptionType::Channel | OptionType::Role) => {
                coerce_snowflake(raw)
            }
            Some(raw) => raw,
            None => Value::Null,
        };

        partial.insert(option.name.clone(), value);
    }

    (partial, focused)
}

fn coerce_snowflake(raw: Value) -> Value {
    match raw.as_str().and_then(|text| text.parse::<u64>().ok()) {
        Some(id) => Value::from(id),
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{ArgumentValue, parse_autocomplete_options, resolve_arguments};
    use crate::{
        command::CommandBuilder,
        error::ArgumentError,
        interaction::Interaction,
        option::OptionSpec,
    };

    fn interaction(raw: Value) -> Interaction {
        match serde_json::from_value(raw) {
            Ok(value) => value,
            Err(error) => panic!("invalid interaction fixture: {error}"),
        }
    }

    #[test]
    fn plain_values_and_defaults_are_bound() {
        let command = match CommandBuilder::slash("order")
            .option(OptionSpec::string("item"))
            .option(OptionSpec::integer("qty").optional().default_value(1))
            .option(OptionSpec::string("note").optional())
            .build()
        {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 2,
            "data": {"id": "10", "name": "order", "options": [{"name": "item", "type": 3, "value": "tea"}]}
        }));

        let arguments = match resolve_arguments(&command, &event, event.options()) {
            Ok(value) => value,
            Err(error) => panic!("resolution failed: {error}"),
        };

        assert_eq!(arguments.str("item"), Some("tea"));
        assert_eq!(arguments.i64("qty"), Some(1));
        assert!(arguments.get("note").is_some_and(ArgumentValue::is_null));
    }

    #[test]
    fn leftover_subcommand_segment_is_rejected() {
        let command = match CommandBuilder::slash("config")
            .option(OptionSpec::string("key"))
            .build()
        {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 2,
            "data": {"id": "10", "name": "config", "options": [
                {"name": "reset", "type": 1, "options": []}
            ]}
        }));

        let result = resolve_arguments(&command, &event, event.options());
        assert!(matches!(
            result,
            Err(ArgumentError::UnexpectedSubcommand { name }) if name == "reset"
        ));
    }

    #[test]
    fn guild_user_option_resolves_to_member() {
        let command = match CommandBuilder::slash("kick").option(OptionSpec::user("who")).build() {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 2,
            "guild_id": "77",
            "data": {
                "id": "10",
                "name": "kick",
                "options": [{"name": "who", "type": 6, "value": "5"}],
                "resolved": {
                    "users": {"5": {"id": "5", "username": "alice"}},
                    "members": {"5": {"nick": "al", "roles": []}}
                }
            }
        }));

        let arguments = match resolve_arguments(&command, &event, event.options()) {
            Ok(value) => value,
            Err(error) => panic!("resolution failed: {error}"),
        };

        let member = arguments
            .member("who")
            .unwrap_or_else(|| panic!("expected a member"));
        assert_eq!(member.nick(), Some("al"));
        assert_eq!(member.raw["user"]["username"], "alice");
        assert_eq!(member.guild_id.as_ref().map(ToString::to_string), Some("77".to_string()));
    }

    #[test]
    fn direct_message_user_option_resolves_to_user() {
        let command = match CommandBuilder::slash("wave").option(OptionSpec::user("who")).build() {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 2,
            "data": {
                "id": "10",
                "name": "wave",
                "options": [{"name": "who", "type": 6, "value": "5"}],
                "resolved": {"users": {"5": {"id": "5", "username": "alice"}}}
            }
        }));

        let arguments = match resolve_arguments(&command, &event, event.options()) {
            Ok(value) => value,
            Err(error) => panic!("resolution failed: {error}"),
        };

        assert_eq!(
            arguments.user("who").and_then(|user| user.username()),
            Some("alice")
        );
    }

    #[test]
    fn mentionable_falls_back_to_role() {
        let command = match CommandBuilder::slash("ping")
            .option(OptionSpec::mentionable("target"))
            .build()
        {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 2,
            "guild_id": "77",
            "data": {
                "id": "10",
                "name": "ping",
                "options": [{"name": "target", "type": 9, "value": "r1"}],
                "resolved": {"roles": {"r1": {"id": "r1", "name": "mods"}}}
            }
        }));

        let arguments = match resolve_arguments(&command, &event, event.options()) {
            Ok(value) => value,
            Err(error) => panic!("resolution failed: {error}"),
        };

        assert_eq!(arguments.role("target").and_then(|role| role.name()), Some("mods"));
    }

    #[test]
    fn missing_channel_payload_is_an_error() {
        let command = match CommandBuilder::slash("move").option(OptionSpec::channel("to")).build() {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 2,
            "data": {"id": "10", "name": "move", "options": [{"name": "to", "type": 7, "value": "c9"}]}
        }));

        let result = resolve_arguments(&command, &event, event.options());
        assert!(matches!(
            result,
            Err(ArgumentError::Unresolved { entity: "channel", .. })
        ));
    }

    #[test]
    fn user_context_command_binds_target() {
        let command = match CommandBuilder::user("Inspect").build() {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 2,
            "data": {
                "id": "20",
                "name": "Inspect",
                "type": 2,
                "target_id": "6",
                "resolved": {"users": {
                    "5": {"id": "5", "username": "alice"},
                    "6": {"id": "6", "username": "bob"}
                }}
            }
        }));

        let arguments = match resolve_arguments(&command, &event, event.options()) {
            Ok(value) => value,
            Err(error) => panic!("resolution failed: {error}"),
        };

        assert_eq!(arguments.len(), 1);
        assert_eq!(arguments.user("target").map(|user| user.id.as_str()), Some("6"));
    }

    #[test]
    fn message_context_command_binds_message() {
        let command = match CommandBuilder::message("Quote").build() {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 2,
            "channel_id": "c1",
            "data": {
                "id": "21",
                "name": "Quote",
                "type": 3,
                "resolved": {"messages": {"m1": {"id": "m1", "content": "hello"}}}
            }
        }));

        let arguments = match resolve_arguments(&command, &event, event.options()) {
            Ok(value) => value,
            Err(error) => panic!("resolution failed: {error}"),
        };

        let message = arguments
            .message("message")
            .unwrap_or_else(|| panic!("expected a message"));
        assert_eq!(message.content(), Some("hello"));
        assert_eq!(message.channel_id.as_deref(), Some("c1"));
    }

    #[test]
    fn message_context_without_payload_fails() {
        let command = match CommandBuilder::message("Quote").build() {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({"id": "1", "type": 2, "data": {"id": "21", "name": "Quote", "type": 3}}));

        let result = resolve_arguments(&command, &event, event.options());
        assert_eq!(result, Err(ArgumentError::MissingTarget("message")));
    }

    #[test]
    fn autocomplete_options_are_partial_and_coerced() {
        let command = match CommandBuilder::slash("order")
            .option(OptionSpec::string("item"))
            .option(OptionSpec::string("qty").autocomplete())
            .option(OptionSpec::user("for").optional())
            .option(OptionSpec::role("team").optional())
            .build()
        {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let event = interaction(json!({
            "id": "1",
            "type": 4,
            "data": {
                "id": "10",
                "name": "order",
                "options": [
                    {"name": "qty", "type": 3, "value": "12", "focused": true},
                    {"name": "for", "type": 6, "value": "5"}
                ]
            }
        }));

        let (partial, focused) = parse_autocomplete_options(&command, event.options());

        assert_eq!(focused.as_deref(), Some("qty"));
        assert_eq!(partial.get("item"), Some(&Value::Null));
        assert_eq!(partial.get("qty"), Some(&json!("12")));
        assert_eq!(partial.get("for"), Some(&json!(5)));
        assert_eq!(partial.get("team"), Some(&Value::Null));
    }
}
