//! The command set the binary ships with.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use cmdwire_core::{
    CommandBuilder, CommandContext, CommandDefinition, CommandHandler, GuildId, OptionChoice,
    OptionSpec, PartialOptions, SchemaError,
};
use serde_json::Value;

const MENU: [&str; 6] = ["tea", "coffee", "cocoa", "lemonade", "espresso", "chai"];

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn callback(&self, ctx: &CommandContext) -> Result<()> {
        ctx.reply("pong").await
    }
}

struct ConfigGet;

#[async_trait]
impl CommandHandler for ConfigGet {
    async fn callback(&self, ctx: &CommandContext) -> Result<()> {
        let key = ctx.arguments().str("key").unwrap_or("motd");
        ctx.reply(&format!("{key} is not set")).await
    }
}

struct ConfigSet;

#[async_trait]
impl CommandHandler for ConfigSet {
    async fn callback(&self, ctx: &CommandContext) -> Result<()> {
        let key = ctx.arguments().str("key").unwrap_or_default();
        let value = ctx.arguments().str("value").unwrap_or_default();
        ctx.reply(&format!("{key} = {value}")).await
    }
}

struct ProfileShow;

#[async_trait]
impl CommandHandler for ProfileShow {
    async fn callback(&self, ctx: &CommandContext) -> Result<()> {
        let arguments = ctx.arguments();
        let shown = arguments
            .member("who")
            .and_then(|member| member.display_name().map(str::to_string))
            .or_else(|| {
                arguments
                    .user("who")
                    .and_then(|user| user.username().map(str::to_string))
            })
            .or_else(|| ctx.interaction().invoker_id().map(str::to_string))
            .unwrap_or_else(|| "nobody".to_string());
        ctx.reply(&format!("profile of {shown}")).await
    }
}

struct Order;

#[async_trait]
impl CommandHandler for Order {
    async fn check(&self, ctx: &CommandContext) -> Result<bool> {
        Ok(ctx
            .arguments()
            .str("item")
            .is_some_and(|item| MENU.contains(&item)))
    }

    async fn callback(&self, ctx: &CommandContext) -> Result<()> {
        let item = ctx.arguments().str("item").unwrap_or_default();
        let qty = ctx.arguments().i64("qty").unwrap_or(1);
        ctx.reply(&format!("ordered {qty} x {item}")).await
    }

    async fn autocomplete(
        &self,
        _ctx: &CommandContext,
        options: &PartialOptions,
        focused: Option<&str>,
    ) -> Result<Vec<OptionChoice>> {
        if focused != Some("item") {
            return Ok(Vec::new());
        }

        let typed = options
            .get("item")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();

        Ok(MENU
            .iter()
            .filter(|item| item.starts_with(&typed))
            .map(|item| OptionChoice::new(*item, *item))
            .collect())
    }
}

struct Inspect;

#[async_trait]
impl CommandHandler for Inspect {
    async fn callback(&self, ctx: &CommandContext) -> Result<()> {
        let arguments = ctx.arguments();
        let summary = match (arguments.member("target"), arguments.user("target")) {
            (Some(member), _) => format!(
                "member {} with {} roles",
                member.display_name().unwrap_or(&member.id),
                member.role_ids().len()
            ),
            (None, Some(user)) => format!(
                "user {}{}",
                user.username().unwrap_or(&user.id),
                if user.is_bot() { " (bot)" } else { "" }
            ),
            (None, None) => "unknown target".to_string(),
        };
        ctx.reply(&summary).await
    }
}

struct Quote;

#[async_trait]
impl CommandHandler for Quote {
    async fn callback(&self, ctx: &CommandContext) -> Result<()> {
        let Some(message) = ctx.arguments().message("message") else {
            return ctx.reply("nothing to quote").await;
        };
        let author = message
            .author()
            .and_then(|author| author.username().map(str::to_string))
            .unwrap_or_else(|| "someone".to_string());
        ctx.reply(&format!("> {}\n- {author}", message.content().unwrap_or_default()))
            .await
    }
}

/// Builds the demo command tree. `config` is registered in `guilds` when any are given,
/// globally otherwise.
pub fn demo_commands(guilds: &[GuildId]) -> Result<Vec<Arc<CommandDefinition>>, SchemaError> {
    let mut config = CommandBuilder::slash("config")
        .description("Read and change bot settings")
        .child(
            CommandBuilder::slash("get")
                .description("Show a setting")
                .option(OptionSpec::choice("key", ["motd", "prefix"]).description("Setting name"))
                .handler(ConfigGet),
        )
        .child(
            CommandBuilder::slash("set")
                .description("Change a setting")
                .option(OptionSpec::choice("key", ["motd", "prefix"]).description("Setting name"))
                .option(OptionSpec::string("value").description("New value"))
                .handler(ConfigSet),
        )
        .child(
            CommandBuilder::slash("profile").child(
                CommandBuilder::slash("show")
                    .doc(
                        "
                        Show someone's profile.

                        Defaults to whoever runs the command.
                        ",
                    )
                    .option(OptionSpec::user("who").optional())
                    .handler(ProfileShow),
            ),
        );
    for guild in guilds {
        config = config.guild(guild.clone());
    }

    Ok(vec![
        CommandBuilder::slash("ping")
            .description("Check that the bot is alive")
            .handler(Ping)
            .build()?,
        config.build()?,
        CommandBuilder::slash("order")
            .description("Order a drink")
            .option(
                OptionSpec::string("item")
                    .description("What to drink")
                    .autocomplete(),
            )
            .option(
                OptionSpec::integer("qty")
                    .description("How many")
                    .min_value(1)
                    .max_value(10)
                    .optional()
                    .default_value(1),
            )
            .handler(Order)
            .build()?,
        CommandBuilder::user("Inspect").handler(Inspect).build()?,
        CommandBuilder::message("Quote").handler(Quote).build()?,
    ])
}
