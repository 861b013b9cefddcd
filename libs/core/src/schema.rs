use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    command::CommandDefinition,
    error::SchemaError,
    option::{NumericBound, OptionSpec, ValueType, option_type_for},
    types::{CommandKind, OptionType},
};

pub const OPTION_DESCRIPTION_PLACEHOLDER: &str = "none provided";
pub const COMMAND_DESCRIPTION_PLACEHOLDER: &str = "no description";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: Value,
}

impl OptionChoice {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A choice whose display name is its own value. Non-text values are named by their JSON
    /// text since the platform only accepts string names.
    pub fn literal(value: &Value) -> Self {
        let name = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Self {
            name,
            value: value.clone(),
        }
    }
}

/// Wire schema of one option, as registered with the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub required: bool,
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<OptionChoice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<NumericBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<NumericBound>,
}

/// Wire schema of a command. Nested commands appear among the options of their parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSchema {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SchemaOption>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaOption {
    Value(OptionSchema),
    Command(CommandSchema),
}

pub fn derive_option_schema(spec: &OptionSpec) -> Result<OptionSchema, SchemaError> {
    let (effective, optional) = spec.value_type().unwrap_optional();

    let (kind, choices) = match effective {
        ValueType::Literal(values) => match ValueType::literal_option_type(values) {
            Some(kind) => (
                kind,
                Some(values.iter().map(OptionChoice::literal).collect()),
            ),
            None => (option_type_for(effective), None),
        },
        other => (option_type_for(other), None),
    };

    if spec.min.is_some() || spec.max.is_some() {
        if !effective.is_numeric() {
            return Err(SchemaError::BoundsOnNonNumeric {
                option: spec.name.clone(),
            });
        }

        if let (Some(min), Some(max)) = (spec.min, spec.max)
            && min.as_f64() > max.as_f64()
        {
            return Err(SchemaError::InvertedBounds {
                option: spec.name.clone(),
                min: min.as_f64(),
                max: max.as_f64(),
            });
        }
    }

    Ok(OptionSchema {
        name: spec.name.clone(),
        description: spec
            .description
            .clone()
            .unwrap_or_else(|| OPTION_DESCRIPTION_PLACEHOLDER.to_string()),
        kind,
        required: !optional,
        autocomplete: spec.autocomplete,
        choices,
        min_value: spec.min,
        max_value: spec.max,
    })
}

/// Derives the schema tree of a top-level command.
pub fn derive_command_schema(command: &CommandDefinition) -> CommandSchema {
    build_command_schema(command, false)
}

fn build_command_schema(command: &CommandDefinition, nested: bool) -> CommandSchema {
    let description = Some(command.description().to_string());

    if command.kind() != CommandKind::Slash {
        return CommandSchema {
            name: command.name().to_string(),
            kind: Some(command.kind().code()),
            description: None,
            options: None,
        };
    }

    if command.has_children() {
        let options = command
            .children()
            .map(|child| SchemaOption::Command(build_command_schema(child, true)))
            .collect();

        return CommandSchema {
            name: command.name().to_string(),
            kind: nested.then_some(OptionType::SubCommandGroup.code()),
            description,
            options: Some(options),
        };
    }

    let kind = if nested {
        OptionType::SubCommand.code()
    } else {
        CommandKind::Slash.code()
    };

    CommandSchema {
        name: command.name().to_string(),
        kind: Some(kind),
        description,
        options: Some(
            command
                .option_schemas()
                .iter()
                .cloned()
                .map(SchemaOption::Value)
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{derive_command_schema, derive_option_schema};
    use crate::{
        command::CommandBuilder,
        error::SchemaError,
        option::{OptionSpec, ValueType},
        types::OptionType,
    };

    #[test]
    fn optional_option_is_not_required_and_uses_inner_type() {
        let spec = OptionSpec::integer("count").optional();

        let schema = match derive_option_schema(&spec) {
            Ok(value) => value,
            Err(error) => panic!("derivation failed: {error}"),
        };

        assert!(!schema.required);
        assert_eq!(schema.kind, OptionType::Integer);
        assert_eq!(schema.description, "none provided");
    }

    #[test]
    fn literal_choices_keep_declaration_order() {
        let spec = OptionSpec::choice("color", ["red", "green", "blue"]);

        let schema = match derive_option_schema(&spec) {
            Ok(value) => value,
            Err(error) => panic!("derivation failed: {error}"),
        };

        let serialized = match serde_json::to_value(&schema) {
            Ok(value) => value,
            Err(error) => panic!("serialization failed: {error}"),
        };

        assert_eq!(serialized["type"], json!(3));
        assert_eq!(
            serialized["choices"],
            json!([
                {"name": "red", "value": "red"},
                {"name": "green", "value": "green"},
                {"name": "blue", "value": "blue"}
            ])
        );
        assert!(schema.required);
    }

    #[test]
    fn optional_literal_still_emits_choices() {
        let spec = OptionSpec::new(
            "size",
            ValueType::optional(ValueType::literal([1, 2, 3])),
        );

        let schema = match derive_option_schema(&spec) {
            Ok(value) => value,
            Err(error) => panic!("derivation failed: {error}"),
        };

        assert_eq!(schema.kind, OptionType::Integer);
        assert!(!schema.required);
        assert_eq!(schema.choices.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn integer_literal_choices_are_named_by_their_text() {
        let spec = OptionSpec::new("tier", ValueType::literal([1, 5, 10]));

        let schema = match derive_option_schema(&spec) {
            Ok(value) => value,
            Err(error) => panic!("derivation failed: {error}"),
        };

        let serialized = match serde_json::to_value(&schema) {
            Ok(value) => value,
            Err(error) => panic!("serialization failed: {error}"),
        };

        assert_eq!(serialized["type"], json!(4));
        assert_eq!(
            serialized["choices"],
            json!([
                {"name": "1", "value": 1},
                {"name": "5", "value": 5},
                {"name": "10", "value": 10}
            ])
        );
    }

    #[test]
    fn mixed_literal_falls_back_to_text_without_choices() {
        let spec = OptionSpec::new("mixed", ValueType::literal([json!("a"), json!(1)]));

        let schema = match derive_option_schema(&spec) {
            Ok(value) => value,
            Err(error) => panic!("derivation failed: {error}"),
        };

        assert_eq!(schema.kind, OptionType::String);
        assert!(schema.choices.is_none());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let spec = OptionSpec::integer("n").min_value(10).max_value(5);
        let result = derive_option_schema(&spec);
        assert!(matches!(result, Err(SchemaError::InvertedBounds { .. })));
    }

    #[test]
    fn bounds_on_text_are_rejected() {
        let spec = OptionSpec::string("s").min_value(10).max_value(5);
        let result = derive_option_schema(&spec);
        assert!(matches!(result, Err(SchemaError::BoundsOnNonNumeric { .. })));

        let single = OptionSpec::string("s").max_value(3);
        assert!(derive_option_schema(&single).is_err());
    }

    #[test]
    fn valid_bounds_are_attached() {
        let spec = OptionSpec::number("ratio").min_value(0.0).max_value(1.5);

        let schema = match derive_option_schema(&spec) {
            Ok(value) => value,
            Err(error) => panic!("derivation failed: {error}"),
        };

        let serialized = match serde_json::to_value(&schema) {
            Ok(value) => value,
            Err(error) => panic!("serialization failed: {error}"),
        };

        assert_eq!(serialized["min_value"], json!(0.0));
        assert_eq!(serialized["max_value"], json!(1.5));
    }

    #[test]
    fn parent_schema_embeds_children_as_subcommands() {
        let command = CommandBuilder::slash("config")
            .description("Manage settings")
            .child(
                CommandBuilder::slash("get")
                    .description("Read a setting")
                    .option(OptionSpec::string("key")),
            )
            .child(
                CommandBuilder::slash("profile").child(
                    CommandBuilder::slash("show").option(OptionSpec::user("who").optional()),
                ),
            )
            .build();

        let command = match command {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let serialized = match serde_json::to_value(derive_command_schema(&command)) {
            Ok(value) => value,
            Err(error) => panic!("serialization failed: {error}"),
        };

        assert_eq!(
            serialized,
            json!({
                "name": "config",
                "description": "Manage settings",
                "options": [
                    {
                        "name": "get",
                        "type": 1,
                        "description": "Read a setting",
                        "options": [{
                            "name": "key",
                            "description": "none provided",
                            "type": 3,
                            "required": true,
                            "autocomplete": false
                        }]
                    },
                    {
                        "name": "profile",
                        "type": 2,
                        "description": "no description",
                        "options": [{
                            "name": "show",
                            "type": 1,
                            "description": "no description",
                            "options": [{
                                "name": "who",
                                "description": "none provided",
                                "type": 6,
                                "required": false,
                                "autocomplete": false
                            }]
                        }]
                    }
                ]
            })
        );
    }

    #[test]
    fn context_command_schema_is_name_and_type_only() {
        let command = match CommandBuilder::user("Inspect").build() {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };

        let serialized = match serde_json::to_value(derive_command_schema(&command)) {
            Ok(value) => value,
            Err(error) => panic!("serialization failed: {error}"),
        };

        assert_eq!(serialized, json!({"name": "Inspect", "type": 2}));
    }
}
