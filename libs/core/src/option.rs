use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{interaction::Interaction, types::OptionType};

/// Declared value type of a command option.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    String,
    Integer,
    Boolean,
    Number,
    /// A user, or a guild member when invoked inside a guild.
    User,
    Channel,
    Role,
    /// Either a user/member or a role.
    Mentionable,
    /// The option may be omitted by the invoker.
    Optional(Box<ValueType>),
    /// A fixed set of values offered to the invoker as choices.
    Literal(Vec<Value>),
    /// A type with no wire representation of its own; sent as text.
    Opaque(String),
}

impl ValueType {
    pub fn optional(inner: ValueType) -> Self {
        ValueType::Optional(Box::new(inner))
    }

    pub fn literal<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ValueType::Literal(values.into_iter().map(Into::into).collect())
    }

    /// Splits off the optional wrapper, returning the effective type and whether it was present.
    pub fn unwrap_optional(&self) -> (&ValueType, bool) {
        match self {
            ValueType::Optional(inner) => (inner.as_ref(), true),
            other => (other, false),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Number)
    }

    /// Underlying wire type of a literal set, if every value shares one mappable type.
    pub fn literal_option_type(values: &[Value]) -> Option<OptionType> {
        let first = values.first().and_then(literal_value_type)?;
        values
            .iter()
            .all(|value| literal_value_type(value) == Some(first))
            .then_some(first)
    }
}

fn literal_value_type(value: &Value) -> Option<OptionType> {
    match value {
        Value::String(_) => Some(OptionType::String),
        Value::Bool(_) => Some(OptionType::Boolean),
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(OptionType::Integer),
        Value::Number(_) => Some(OptionType::Number),
        _ => None,
    }
}

/// Maps a declared value type to its wire-format option type. Total: anything without a
/// dedicated code is sent as text.
pub fn option_type_for(value_type: &ValueType) -> OptionType {
    match value_type {
        ValueType::String => OptionType::String,
        ValueType::Integer => OptionType::Integer,
        ValueType::Boolean => OptionType::Boolean,
        ValueType::Number => OptionType::Number,
        ValueType::User => OptionType::User,
        ValueType::Channel => OptionType::Channel,
        ValueType::Role => OptionType::Role,
        ValueType::Mentionable => OptionType::Mentionable,
        ValueType::Optional(inner) => option_type_for(inner),
        ValueType::Literal(_) | ValueType::Opaque(_) => OptionType::String,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericBound {
    Integer(i64),
    Number(f64),
}

impl NumericBound {
    pub fn as_f64(self) -> f64 {
        match self {
            NumericBound::Integer(value) => value as f64,
            NumericBound::Number(value) => value,
        }
    }
}

impl From<i64> for NumericBound {
    fn from(value: i64) -> Self {
        NumericBound::Integer(value)
    }
}

impl From<i32> for NumericBound {
    fn from(value: i32) -> Self {
        NumericBound::Integer(i64::from(value))
    }
}

impl From<f64> for NumericBound {
    fn from(value: f64) -> Self {
        NumericBound::Number(value)
    }
}

pub type DefaultProvider = Arc<dyn Fn(&Interaction) -> Value + Send + Sync>;

/// Value bound to an option the invoker left out.
#[derive(Clone)]
pub enum OptionDefault {
    Static(Value),
    Provider(DefaultProvider),
}

impl OptionDefault {
    pub fn resolve(&self, interaction: &Interaction) -> Value {
        match self {
            OptionDefault::Static(value) => value.clone(),
            OptionDefault::Provider(provider) => provider(interaction),
        }
    }
}

impl fmt::Debug for OptionDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionDefault::Static(value) => f.debug_tuple("Static").field(value).finish(),
            OptionDefault::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

/// One declared parameter of a command.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub(crate) name: String,
    pub(crate) value_type: ValueType,
    pub(crate) description: Option<String>,
    pub(crate) autocomplete: bool,
    pub(crate) min: Option<NumericBound>,
    pub(crate) max: Option<NumericBound>,
    pub(crate) default: Option<OptionDefault>,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            description: None,
            autocomplete: false,
            min: None,
            max: None,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Boolean)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Number)
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::User)
    }

    pub fn channel(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Channel)
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Role)
    }

    pub fn mentionable(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Mentionable)
    }

    pub fn choice<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(name, ValueType::literal(values))
    }

    /// Marks the option as omittable.
    pub fn optional(mut self) -> Self {
        if !matches!(self.value_type, ValueType::Optional(_)) {
            self.value_type = ValueType::optional(self.value_type);
        }
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    pub fn min_value(mut self, min: impl Into<NumericBound>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max_value(mut self, max: impl Into<NumericBound>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(OptionDefault::Static(value.into()));
        self
    }

    pub fn default_with<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Interaction) -> Value + Send + Sync + 'static,
    {
        self.default = Some(OptionDefault::Provider(Arc::new(provider)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn is_required(&self) -> bool {
        !matches!(self.value_type, ValueType::Optional(_))
    }

    pub fn is_autocomplete(&self) -> bool {
        self.autocomplete
    }

    pub fn default(&self) -> Option<&OptionDefault> {
        self.default.as_ref()
    }

    /// Value bound when the invoker omits this option. Options without a default bind null.
    pub fn resolve_default(&self, interaction: &Interaction) -> Value {
        self.default
            .as_ref()
            .map_or(Value::Null, |default| default.resolve(interaction))
    }
}
