use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use cmdwire_core::GuildId;
use cmdwire_discord::DEFAULT_API_BASE;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "~/.cmdwire/config.toml";
const DEFAULT_LOG_FILTER: &str = "info";

/// Overrides taken from the command line. They win over the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct CliFlags {
    pub token: Option<String>,
    pub api_base: Option<String>,
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub discord: DiscordSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordSettings {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub api_base: Option<String>,
    /// Pre-seeds the application id so no lookup is needed before uploading.
    #[serde(default)]
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_true")]
    pub global: bool,
    #[serde(default)]
    pub guilds: Vec<String>,
    #[serde(default)]
    pub permissions: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            global: true,
            guilds: Vec::new(),
            permissions: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>, cli: &CliFlags) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);
        let path = expand_tilde_path(&path);

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|error| anyhow!("failed to read config {}: {error}", path.display()))?;
            Self::parse(&text)
                .map_err(|error| anyhow!("failed to parse config {}: {error}", path.display()))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(cli);
        config.normalize();
        config.validate()?;

        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn api_base(&self) -> &str {
        self.discord.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.sync
            .guilds
            .iter()
            .map(|guild| GuildId::from(guild.as_str()))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let api_base = self.api_base();
        if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
            return Err(anyhow!("discord api_base must be an http(s) URL, got {api_base}"));
        }

        if let Some(application_id) = &self.discord.application_id
            && !is_snowflake(application_id)
        {
            return Err(anyhow!("discord application_id must be numeric, got {application_id}"));
        }

        if let Some(guild) = self.sync.guilds.iter().find(|guild| !is_snowflake(guild)) {
            return Err(anyhow!("sync guild ids must be numeric, got {guild}"));
        }

        Ok(())
    }

    /// Checked only by operations that talk to Discord.
    pub fn require_token(&self) -> Result<&str> {
        if self.discord.token.trim().is_empty() {
            return Err(anyhow!(
                "discord token cannot be empty; set it in the config file or CMDWIRE_TOKEN"
            ));
        }
        Ok(&self.discord.token)
    }

    fn apply_env_overrides(&mut self) {
        if self.discord.token.trim().is_empty()
            && let Ok(value) = std::env::var("CMDWIRE_TOKEN")
        {
            self.discord.token = value;
        }

        if self.discord.api_base.is_none()
            && let Ok(value) = std::env::var("CMDWIRE_API_BASE")
        {
            self.discord.api_base = Some(value);
        }

        if self.discord.application_id.is_none()
            && let Ok(value) = std::env::var("CMDWIRE_APPLICATION_ID")
        {
            self.discord.application_id = Some(value);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &CliFlags) {
        if let Some(token) = &cli.token {
            self.discord.token = token.clone();
        }
        if let Some(api_base) = &cli.api_base {
            self.discord.api_base = Some(api_base.clone());
        }
        if let Some(application_id) = &cli.application_id {
            self.discord.application_id = Some(application_id.clone());
        }
    }

    fn normalize(&mut self) {
        self.discord.token = self.discord.token.trim().to_string();
        self.discord.api_base = self
            .discord
            .api_base
            .take()
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty());
        self.discord.application_id = self
            .discord
            .application_id
            .take()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        self.sync.guilds = self
            .sync
            .guilds
            .iter()
            .map(|guild| guild.trim().to_string())
            .collect();
    }
}

fn is_snowflake(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

pub fn default_config_path() -> PathBuf {
    expand_tilde_path(&PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn expand_tilde_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(stripped) = path_str.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }

    if path_str == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }

    path.to_path_buf()
}
