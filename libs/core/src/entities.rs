//! Typed views over the raw entity payloads bundled with an interaction.
//!
//! The dispatcher only decides which entity an option refers to and which raw payload it is
//! built from; richer domain objects are the caller's business and can be built from `raw`.

use serde_json::Value;

use crate::types::GuildId;

fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub raw: Value,
}

impl User {
    pub fn from_raw(id: impl Into<String>, raw: Value) -> Self {
        Self { id: id.into(), raw }
    }

    pub fn username(&self) -> Option<&str> {
        str_field(&self.raw, "username")
    }

    pub fn is_bot(&self) -> bool {
        self.raw
            .get("bot")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// A guild member. Its raw payload carries the user payload under `user`.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub guild_id: Option<GuildId>,
    pub raw: Value,
}

impl Member {
    /// Builds a member from the resolved member payload, merging the user payload into it.
    pub fn from_parts(
        id: impl Into<String>,
        guild_id: Option<GuildId>,
        mut member: Value,
        user: Option<Value>,
    ) -> Self {
        if let (Some(user), Value::Object(fields)) = (user, &mut member) {
            fields.insert("user".to_string(), user);
        }

        Self {
            id: id.into(),
            guild_id,
            raw: member,
        }
    }

    pub fn user(&self) -> Option<User> {
        self.raw
            .get("user")
            .map(|user| User::from_raw(self.id.clone(), user.clone()))
    }

    pub fn nick(&self) -> Option<&str> {
        str_field(&self.raw, "nick")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.nick().or_else(|| {
            self.raw
                .get("user")
                .and_then(|user| str_field(user, "username"))
        })
    }

    pub fn role_ids(&self) -> Vec<String> {
        self.raw
            .get("roles")
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub id: String,
    pub guild_id: Option<GuildId>,
    pub raw: Value,
}

impl Role {
    pub fn name(&self) -> Option<&str> {
        str_field(&self.raw, "name")
    }
}

/// The partial channel payload included in interaction resolved data.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialChannel {
    pub id: String,
    pub guild_id: Option<GuildId>,
    pub raw: Value,
}

impl PartialChannel {
    pub fn name(&self) -> Option<&str> {
        str_field(&self.raw, "name")
    }

    pub fn kind(&self) -> Option<u64> {
        self.raw.get("type").and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub channel_id: Option<String>,
    pub raw: Value,
}

impl Message {
    pub fn content(&self) -> Option<&str> {
        str_field(&self.raw, "content")
    }

    pub fn author(&self) -> Option<User> {
        let author = self.raw.get("author")?;
        let id = str_field(author, "id")?;
        Some(User::from_raw(id, author.clone()))
    }
}
