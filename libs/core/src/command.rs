use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    sync::{Arc, Mutex},
};

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::{
    error::{RegistrationError, SchemaError},
    hooks::{CommandHandler, NoopHandler},
    option::{OptionSpec, ValueType},
    schema::{COMMAND_DESCRIPTION_PLACEHOLDER, CommandSchema, OptionSchema, derive_command_schema, derive_option_schema},
    transport::CommandPermission,
    types::{CommandId, CommandKind, GuildId, Scope},
};

/// Where a command gets registered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandScope {
    #[default]
    Global,
    Guilds(Vec<GuildId>),
}

/// Role or member a permission overlay entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PermissionTarget {
    Role(String),
    Member(String),
}

impl PermissionTarget {
    pub fn id(&self) -> &str {
        match self {
            PermissionTarget::Role(id) | PermissionTarget::Member(id) => id,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            PermissionTarget::Role(_) => 1,
            PermissionTarget::Member(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PermissionEntry {
    target_code: u8,
    allowed: bool,
}

type PermissionOverlay = BTreeMap<GuildId, BTreeMap<String, PermissionEntry>>;

/// One declared command, top-level or nested. Immutable after [`CommandBuilder::build`] apart
/// from the platform id and the permission overlay.
pub struct CommandDefinition {
    name: String,
    kind: CommandKind,
    description: String,
    options: Vec<OptionSpec>,
    option_schemas: Vec<OptionSchema>,
    parent: Option<String>,
    children: Vec<Arc<CommandDefinition>>,
    scope: CommandScope,
    permissions: Mutex<PermissionOverlay>,
    id: ArcSwapOption<CommandId>,
    scoped_ids: ArcSwap<BTreeMap<Scope, CommandId>>,
    handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name prefixed by the names of every ancestor, space separated.
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent} {}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|option| option.name() == name)
    }

    pub fn option_schemas(&self) -> &[OptionSchema] {
        &self.option_schemas
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = &Arc<CommandDefinition>> {
        self.children.iter()
    }

    pub fn child(&self, name: &str) -> Option<&Arc<CommandDefinition>> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn scope(&self) -> &CommandScope {
        &self.scope
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// Platform-assigned id, absent until one of the command's scopes has been synchronized.
    /// A command registered in several guilds gets one id per guild; this is the latest.
    pub fn id(&self) -> Option<CommandId> {
        self.id.load_full().map(|id| (*id).clone())
    }

    /// Id the platform assigned in `scope`.
    pub fn id_in(&self, scope: &Scope) -> Option<CommandId> {
        self.scoped_ids.load().get(scope).cloned()
    }

    /// Records `id` for `scope` and returns the id it replaces there, if any.
    pub(crate) fn assign_id(&self, scope: &Scope, id: CommandId) -> Option<CommandId> {
        let previous = self.scoped_ids.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.insert(scope.clone(), id.clone());
            next
        });
        self.id.store(Some(Arc::new(id)));
        previous.get(scope).cloned()
    }

    /// Reconciliation key: the name together with the command type code.
    pub fn key(&self) -> (String, u8) {
        (self.name.clone(), self.kind.code())
    }

    pub fn to_schema(&self) -> CommandSchema {
        derive_command_schema(self)
    }

    /// Merges allow/deny entries into this command's overlay for `guild_id`.
    pub fn set_permissions<I>(&self, guild_id: GuildId, overlay: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = (PermissionTarget, bool)>,
    {
        let mut guard = self
            .permissions
            .lock()
            .map_err(|_| RegistrationError::LockPoisoned("command permissions"))?;

        let entries = guard.entry(guild_id).or_default();
        for (target, allowed) in overlay {
            entries.insert(
                target.id().to_string(),
                PermissionEntry {
                    target_code: target.code(),
                    allowed,
                },
            );
        }

        Ok(())
    }

    /// The overlay for `guild_id` in wire form; empty when none was set.
    pub fn permission_overlay(
        &self,
        guild_id: &GuildId,
    ) -> Result<Vec<CommandPermission>, RegistrationError> {
        let guard = self
            .permissions
            .lock()
            .map_err(|_| RegistrationError::LockPoisoned("command permissions"))?;

        Ok(guard
            .get(guild_id)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, entry)| CommandPermission {
                        id: id.clone(),
                        kind: entry.target_code,
                        permission: entry.allowed,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("options", &self.options.len())
            .field("children", &self.children.len())
            .field("scope", &self.scope)
            .field("id", &self.id())
            .finish()
    }
}

pub struct CommandBuilder {
    name: String,
    kind: CommandKind,
    description: Option<String>,
    doc: Option<String>,
    options: Vec<OptionSpec>,
    children: Vec<CommandBuilder>,
    scope: CommandScope,
    handler: Option<Arc<dyn CommandHandler>>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            doc: None,
            options: Vec::new(),
            children: Vec::new(),
            scope: CommandScope::Global,
            handler: None,
        }
    }

    pub fn slash(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Slash)
    }

    /// A user context-menu command; its single `target` option is declared for you.
    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::User).option(OptionSpec::user("target"))
    }

    /// A message context-menu command; its single `message` option is declared for you.
    pub fn message(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Message).option(OptionSpec::new(
            "message",
            ValueType::Opaque("message".to_string()),
        ))
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Documentation text, used as the description when none is given explicitly.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn child(mut self, child: CommandBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn guild(mut self, guild_id: impl Into<GuildId>) -> Self {
        match &mut self.scope {
            CommandScope::Guilds(guilds) => guilds.push(guild_id.into()),
            CommandScope::Global => self.scope = CommandScope::Guilds(vec![guild_id.into()]),
        }
        self
    }

    pub fn guilds<I, G>(mut self, guild_ids: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GuildId>,
    {
        for guild_id in guild_ids {
            self = self.guild(guild_id);
        }
        self
    }

    pub fn handler(mut self, handler: impl CommandHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn shared_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Validates the declaration, derives option schemas and returns the immutable tree.
    pub fn build(self) -> Result<Arc<CommandDefinition>, SchemaError> {
        self.build_node(None)
    }

    fn build_node(self, parent: Option<String>) -> Result<Arc<CommandDefinition>, SchemaError> {
        self.validate_shape()?;

        let option_schemas = self
            .options
            .iter()
            .map(derive_option_schema)
            .collect::<Result<Vec<_>, _>>()?;

        let qualified = match &parent {
            Some(parent) => format!("{parent} {}", self.name),
            None => self.name.clone(),
        };

        let mut child_names = HashSet::new();
        let mut children = Vec::with_capacity(self.children.len());
        for child in self.children {
            if !child_names.insert(child.name.clone()) {
                return Err(SchemaError::DuplicateChild {
                    command: qualified,
                    child: child.name,
                });
            }
            children.push(child.build_node(Some(qualified.clone()))?);
        }

        let description = resolve_description(self.description, self.doc);

        Ok(Arc::new(CommandDefinition {
            name: self.name,
            kind: self.kind,
            description,
            options: self.options,
            option_schemas,
            parent,
            children,
            scope: self.scope,
            permissions: Mutex::new(BTreeMap::new()),
            id: ArcSwapOption::empty(),
            scoped_ids: ArcSwap::from_pointee(BTreeMap::new()),
            handler: self.handler.unwrap_or_else(|| Arc::new(NoopHandler)),
        }))
    }

    fn validate_shape(&self) -> Result<(), SchemaError> {
        let fixed = match self.kind {
            CommandKind::User => Some("target"),
            CommandKind::Message => Some("message"),
            CommandKind::Slash => None,
        };

        if let Some(expected) = fixed {
            if self.options.len() != 1 || self.options[0].name() != expected {
                return Err(SchemaError::FixedParameter {
                    command: self.name.clone(),
                    kind: self.kind,
                    expected,
                });
            }
            if !self.children.is_empty() {
                return Err(SchemaError::ChildrenOnContextCommand {
                    command: self.name.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.name()) {
                return Err(SchemaError::DuplicateOption {
                    command: self.name.clone(),
                    option: option.name().to_string(),
                });
            }
        }

        Ok(())
    }
}

fn resolve_description(description: Option<String>, doc: Option<String>) -> String {
    description
        .filter(|text| !text.trim().is_empty())
        .or_else(|| doc.map(|doc| clean_doc(&doc)).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| COMMAND_DESCRIPTION_PLACEHOLDER.to_string())
}

/// Normalizes an indented documentation block: the first line is trimmed, the common
/// indentation of the remaining lines is removed, and blank edges are dropped.
pub fn clean_doc(doc: &str) -> String {
    let mut lines: Vec<&str> = doc.lines().collect();
    let Some(first) = lines.first_mut() else {
        return String::new();
    };
    *first = first.trim_start();

    let indent = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                line.trim_end().to_string()
            } else {
                line.chars().skip(indent).collect::<String>().trim_end().to_string()
            }
        })
        .collect();

    while cleaned.first().is_some_and(|line| line.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|line| line.is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n")
}
