use std::{path::PathBuf, sync::Arc};

use clap::Subcommand;
use cmdwire_core::{
    CommandRegistry, DefaultClient, Dispatcher, GuildId, Interaction,
    InteractionResponder, Synchronizer, Transport,
};
use cmdwire_discord::{DiscordResponder, DiscordTransport, RestClient};
use tracing::info;

use crate::config::AppConfig;

pub mod demo;
pub mod offline;

use demo::demo_commands;
use offline::{OFFLINE_APPLICATION_ID, OfflineTransport, PrintingResponder};

#[derive(Subcommand, PartialEq, Debug)]
pub enum Commands {
    /// Print the derived schemas of the bundled command set
    Schema,

    /// Upload commands (and optionally permissions) to Discord
    Sync {
        /// Upload global commands
        #[arg(long)]
        global: bool,
        /// Upload the commands of this guild; repeatable
        #[arg(long = "guild")]
        guilds: Vec<String>,
        /// Upload permission overlays after the guild commands
        #[arg(long)]
        permissions: bool,
    },

    /// Dispatch an interaction payload read from a JSON file
    Dispatch {
        file: PathBuf,
        /// Use offline collaborators instead of the Discord API
        #[arg(long)]
        dry_run: bool,
    },
}

/// What a sync run uploads.
#[derive(Debug, Clone, PartialEq)]
struct SyncPlan {
    global: bool,
    /// `None` uploads every guild with registered commands.
    guilds: Option<Vec<GuildId>>,
    permissions: bool,
}

impl SyncPlan {
    fn resolve(config: &AppConfig, global: bool, guilds: Vec<String>, permissions: bool) -> Self {
        let flags_given = global || !guilds.is_empty();
        if flags_given {
            return Self {
                global,
                guilds: (!guilds.is_empty())
                    .then(|| guilds.into_iter().map(GuildId::from).collect()),
                permissions: permissions || config.sync.permissions,
            };
        }

        let configured = config.guild_ids();
        Self {
            global: config.sync.global,
            guilds: (!configured.is_empty()).then_some(configured),
            permissions: permissions || config.sync.permissions,
        }
    }
}

impl Commands {
    pub async fn run(self, config: AppConfig) -> Result<(), String> {
        match self {
            Commands::Schema => handle_schema(&config),
            Commands::Sync {
                global,
                guilds,
                permissions,
            } => {
                let plan = SyncPlan::resolve(&config, global, guilds, permissions);
                handle_sync(&config, plan).await
            }
            Commands::Dispatch { file, dry_run } => handle_dispatch(&config, file, dry_run).await,
        }
    }
}

fn build_registry(config: &AppConfig) -> Result<Arc<CommandRegistry>, String> {
    let commands = demo_commands(&config.guild_ids()).map_err(|error| error.to_string())?;
    let registry = Arc::new(CommandRegistry::new());
    for command in commands {
        registry
            .add_command(command)
            .map_err(|error| error.to_string())?;
    }
    Ok(registry)
}

fn rest_client(config: &AppConfig) -> Result<RestClient, String> {
    let token = config.require_token().map_err(|error| error.to_string())?;
    Ok(RestClient::with_api_base(token, config.api_base()))
}

fn handle_schema(config: &AppConfig) -> Result<(), String> {
    let registry = build_registry(config)?;
    let schemas: Vec<_> = registry
        .all_commands()
        .map_err(|error| error.to_string())?
        .iter()
        .map(|command| command.to_schema())
        .collect();

    let text = serde_json::to_string_pretty(&schemas)
        .map_err(|error| format!("failed to serialize schemas: {error}"))?;
    println!("{text}");
    Ok(())
}

async fn handle_sync(config: &AppConfig, plan: SyncPlan) -> Result<(), String> {
    let registry = build_registry(config)?;
    let transport = Arc::new(DiscordTransport::new(rest_client(config)?));
    let synchronizer = build_synchronizer(config, registry, transport);

    run_sync(&synchronizer, &plan).await
}

fn build_synchronizer(
    config: &AppConfig,
    registry: Arc<CommandRegistry>,
    transport: Arc<dyn Transport>,
) -> Synchronizer {
    let synchronizer = Synchronizer::new(registry, transport);
    match &config.discord.application_id {
        Some(application_id) => synchronizer.with_application_id(application_id.clone()),
        None => synchronizer,
    }
}

async fn run_sync(synchronizer: &Synchronizer, plan: &SyncPlan) -> Result<(), String> {
    if plan.global {
        let descriptors = synchronizer
            .upload_global()
            .await
            .map_err(|error| error.to_string())?;
        for descriptor in &descriptors {
            info!(id = %descriptor.id, name = %descriptor.name, kind = descriptor.kind, "global command");
        }
    }

    let guilds = match &plan.guilds {
        Some(guilds) => guilds.clone(),
        None => synchronizer
            .registry()
            .guilds()
            .map_err(|error| error.to_string())?,
    };

    for guild in &guilds {
        let descriptors = synchronizer
            .upload_guild(Some(guild))
            .await
            .map_err(|error| error.to_string())?;
        for descriptor in &descriptors {
            info!(guild = %guild, id = %descriptor.id, name = %descriptor.name, "guild command");
        }

        if plan.permissions {
            synchronizer
                .upload_guild_permissions(guild)
                .await
                .map_err(|error| error.to_string())?;
        }
    }

    Ok(())
}

async fn handle_dispatch(config: &AppConfig, file: PathBuf, dry_run: bool) -> Result<(), String> {
    let text = std::fs::read_to_string(&file)
        .map_err(|error| format!("failed to read {}: {error}", file.display()))?;
    let interaction: Interaction = serde_json::from_str(&text)
        .map_err(|error| format!("failed to parse interaction {}: {error}", file.display()))?;

    let registry = build_registry(config)?;

    let (synchronizer, responder) = if dry_run {
        let pinned = Some((interaction.data.name.clone(), interaction.command_id().clone()));
        let transport = Arc::new(OfflineTransport::new(pinned));
        let responder: Arc<dyn InteractionResponder> = Arc::new(PrintingResponder);
        (
            Synchronizer::new(registry.clone(), transport).with_application_id(OFFLINE_APPLICATION_ID),
            responder,
        )
    } else {
        let rest = rest_client(config)?;
        let transport = Arc::new(DiscordTransport::new(rest.clone()));
        let responder: Arc<dyn InteractionResponder> = Arc::new(DiscordResponder::new(rest));
        (build_synchronizer(config, registry.clone(), transport), responder)
    };

    let plan = SyncPlan {
        global: true,
        guilds: None,
        permissions: false,
    };
    run_sync(&synchronizer, &plan).await?;

    let dispatcher = Dispatcher::new(registry, Arc::new(DefaultClient), responder);
    let outcome = dispatcher.dispatch(interaction).await;
    println!("{outcome:?}");

    Ok(())
}
