//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.wikichat/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::scroll::{DEFAULT_FORCE_RETRY_MS, ScrollConfig, platform_bottom_epsilon};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WikichatConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub scroll: ScrollSettings,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChatConfig {
    pub model_name: Option<String>,
    pub model_provider: Option<String>,
    pub online: Option<bool>,
    pub deep_think: Option<bool>,
    pub conversation_statuses: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ScrollSettings {
    pub bottom_epsilon: Option<u32>,
    pub suppress_window_ms: Option<u64>,
    pub progress_hide_ms: Option<u64>,
    pub force_retry_ms: Option<Vec<u64>>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_MODEL_NAME: &str = "deepseek-chat";
pub const DEFAULT_MODEL_PROVIDER: &str = "deepseek";
pub const DEFAULT_SUPPRESS_WINDOW_MS: u64 = 150;
pub const DEFAULT_PROGRESS_HIDE_MS: u64 = 3000;
pub const DEFAULT_CONVERSATION_STATUSES: [&str; 1] = ["active"];

// ============================================================================
// Resolved Config (concrete values, no Options except credentials)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub model_name: String,
    pub model_provider: String,
    pub online: bool,
    pub deep_think: bool,
    pub conversation_statuses: Vec<String>,
    pub scroll: ScrollConfig,
    pub progress_hide: Duration,
    /// Conversation to open at startup.
    pub initial_conversation: Option<String>,
}

/// Values given on the command line. `None`/`false` means "not specified".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub conversation: Option<String>,
    pub online: bool,
    pub deep_think: bool,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.wikichat/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".wikichat").join("config.toml"))
}

/// Load config from `~/.wikichat/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `WikichatConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<WikichatConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(WikichatConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<WikichatConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(WikichatConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: WikichatConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

const DEFAULT_CONFIG_CONTENT: &str = r#"# wikichat configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [server]
# base_url = "http://localhost:3000/api"   # Or WIKICHAT_BASE_URL
# api_token = "..."                        # Or WIKICHAT_API_TOKEN
# tenant_id = "..."                        # Or WIKICHAT_TENANT_ID
# user_id = "..."                          # Or WIKICHAT_USER_ID

# [chat]
# model_name = "deepseek-chat"             # Or WIKICHAT_MODEL
# model_provider = "deepseek"              # Or WIKICHAT_PROVIDER
# online = false
# deep_think = false
# conversation_statuses = ["active"]

# [scroll]
# bottom_epsilon = 6                       # 4 on macOS
# suppress_window_ms = 150
# progress_hide_ms = 3000
# force_retry_ms = [0, 50, 150, 300, 600]
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_CONTENT) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &WikichatConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// [`resolve`] with an injectable environment lookup.
pub fn resolve_with_env<F>(config: &WikichatConfig, cli: &CliOverrides, env: F) -> ResolvedConfig
where
    F: Fn(&str) -> Option<String>,
{
    // Base URL: CLI → env → config → default
    let base_url = cli
        .base_url
        .clone()
        .or_else(|| env("WIKICHAT_BASE_URL"))
        .or_else(|| config.server.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let api_token = env("WIKICHAT_API_TOKEN").or_else(|| config.server.api_token.clone());
    let tenant_id = env("WIKICHAT_TENANT_ID").or_else(|| config.server.tenant_id.clone());
    let user_id = env("WIKICHAT_USER_ID").or_else(|| config.server.user_id.clone());

    let model_name = cli
        .model
        .clone()
        .or_else(|| env("WIKICHAT_MODEL"))
        .or_else(|| config.chat.model_name.clone())
        .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());

    let model_provider = cli
        .provider
        .clone()
        .or_else(|| env("WIKICHAT_PROVIDER"))
        .or_else(|| config.chat.model_provider.clone())
        .unwrap_or_else(|| DEFAULT_MODEL_PROVIDER.to_string());

    // Flags can only be switched on from the command line.
    let online = cli.online || config.chat.online.unwrap_or(false);
    let deep_think = cli.deep_think || config.chat.deep_think.unwrap_or(false);

    let conversation_statuses = config
        .chat
        .conversation_statuses
        .clone()
        .unwrap_or_else(|| {
            DEFAULT_CONVERSATION_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect()
        });

    ResolvedConfig {
        base_url,
        api_token,
        tenant_id,
        user_id,
        model_name,
        model_provider,
        online,
        deep_think,
        conversation_statuses,
        scroll: resolve_scroll(&config.scroll),
        progress_hide: Duration::from_millis(
            config
                .scroll
                .progress_hide_ms
                .unwrap_or(DEFAULT_PROGRESS_HIDE_MS),
        ),
        initial_conversation: cli.conversation.clone(),
    }
}

fn resolve_scroll(settings: &ScrollSettings) -> ScrollConfig {
    let retry_ms = match &settings.force_retry_ms {
        Some(delays) if !delays.is_empty() => delays.clone(),
        Some(_) => {
            warn!("scroll.force_retry_ms is empty, keeping a single immediate attempt");
            vec![0]
        }
        None => DEFAULT_FORCE_RETRY_MS.to_vec(),
    };

    ScrollConfig {
        bottom_epsilon: settings
            .bottom_epsilon
            .unwrap_or_else(platform_bottom_epsilon),
        suppress_window: Duration::from_millis(
            settings
                .suppress_window_ms
                .unwrap_or(DEFAULT_SUPPRESS_WINDOW_MS),
        ),
        force_retry_delays: retry_ms.into_iter().map(Duration::from_millis).collect(),
    }
}
