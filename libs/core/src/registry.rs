use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use arc_swap::ArcSwap;
use tracing::debug;

use crate::{
    command::{CommandDefinition, CommandScope},
    error::RegistrationError,
    types::{CommandId, GuildId, Scope},
};

/// Published id index. Replaced wholesale after each reconciliation so lookups never observe a
/// half-updated scope.
#[derive(Debug, Default, Clone)]
pub struct IdSnapshot {
    pub by_id: HashMap<CommandId, Arc<CommandDefinition>>,
}

impl IdSnapshot {
    pub fn get(&self, id: &CommandId) -> Option<&Arc<CommandDefinition>> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Top-level commands grouped by registration scope, plus the id index the dispatcher reads.
pub struct CommandRegistry {
    pending: Mutex<BTreeMap<Scope, Vec<Arc<CommandDefinition>>>>,
    snap: ArcSwap<IdSnapshot>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            snap: ArcSwap::from_pointee(IdSnapshot::default()),
        }
    }

    /// Adds a top-level command to every scope it declares. Either every scope accepts it or
    /// none does.
    pub fn add_command(&self, command: Arc<CommandDefinition>) -> Result<(), RegistrationError> {
        if let Some(parent) = command.parent() {
            return Err(RegistrationError::NotTopLevel {
                name: command.name().to_string(),
                parent: parent.to_string(),
            });
        }

        let scopes = match command.scope() {
            CommandScope::Global => vec![Scope::Global],
            CommandScope::Guilds(guilds) => {
                let mut scopes: Vec<Scope> = guilds.iter().cloned().map(Scope::Guild).collect();
                scopes.sort();
                scopes.dedup();
                scopes
            }
        };

        let mut pending = self.lock_pending()?;

        for scope in &scopes {
            let clash = pending.get(scope).is_some_and(|bucket| {
                bucket
                    .iter()
                    .any(|existing| existing.key() == command.key())
            });
            if clash {
                return Err(RegistrationError::Duplicate {
                    name: command.name().to_string(),
                    kind: command.kind(),
                    scope: scope.clone(),
                });
            }
        }

        for scope in scopes {
            debug!(command = %command.name(), scope = %scope, "command registered");
            pending.entry(scope).or_default().push(command.clone());
        }

        Ok(())
    }

    /// Commands waiting in `scope`, in registration order.
    pub fn commands_in(
        &self,
        scope: &Scope,
    ) -> Result<Option<Vec<Arc<CommandDefinition>>>, RegistrationError> {
        Ok(self.lock_pending()?.get(scope).cloned())
    }

    /// Guilds that have at least one command registered.
    pub fn guilds(&self) -> Result<Vec<GuildId>, RegistrationError> {
        Ok(self
            .lock_pending()?
            .keys()
            .filter_map(|scope| match scope {
                Scope::Guild(guild_id) => Some(guild_id.clone()),
                Scope::Global => None,
            })
            .collect())
    }

    /// Every registered top-level command, once, in scope order.
    pub fn all_commands(&self) -> Result<Vec<Arc<CommandDefinition>>, RegistrationError> {
        let pending = self.lock_pending()?;
        let mut seen: Vec<Arc<CommandDefinition>> = Vec::new();
        for command in pending.values().flatten() {
            if !seen.iter().any(|known| Arc::ptr_eq(known, command)) {
                seen.push(command.clone());
            }
        }
        Ok(seen)
    }

    pub fn lookup(&self, id: &CommandId) -> Option<Arc<CommandDefinition>> {
        self.snap.load().get(id).cloned()
    }

    pub fn snapshot(&self) -> Arc<IdSnapshot> {
        self.snap.load_full()
    }

    /// Assigns the ids reconciled for `scope` and publishes them in one snapshot swap. An id a
    /// command previously held in `scope` leaves the index; ids from other scopes stay.
    pub(crate) fn publish(&self, scope: &Scope, assignments: &[(CommandId, Arc<CommandDefinition>)]) {
        let mut stale = Vec::new();
        for (id, command) in assignments {
            if let Some(previous) = command.assign_id(scope, id.clone())
                && previous != *id
            {
                stale.push(previous);
            }
        }

        self.snap.rcu(|current| {
            let mut next = IdSnapshot::clone(current);
            for id in &stale {
                next.by_id.remove(id);
            }
            for (id, command) in assignments {
                next.by_id.insert(id.clone(), command.clone());
            }
            next
        });
        debug!(scope = %scope, assigned = assignments.len(), evicted = stale.len(), "id index published");
    }

    fn lock_pending(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<Scope, Vec<Arc<CommandDefinition>>>>, RegistrationError>
    {
        self.pending
            .lock()
            .map_err(|_| RegistrationError::LockPoisoned("command registry"))
    }
}
