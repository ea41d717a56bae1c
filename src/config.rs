//! Configuration file parser for ~/.config/readr/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`,
//! though `api_url` must then come from the environment or the command line.
//! Unknown keys are accepted but logged as likely typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::api::ApiOptions;
use crate::sync::{MutationFailurePolicy, SyncOptions, DEFAULT_PAGE_LIMIT};

/// Environment variable overriding `api_url`.
pub const ENV_API_URL: &str = "READR_API_URL";
/// Environment variable overriding `api_token`.
pub const ENV_API_TOKEN: &str = "READR_API_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `Debug` masks `api_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST API, e.g. `https://reader.example.com/api`.
    pub api_url: String,

    /// Base URL for UI settings persistence. Collapse state is kept local
    /// when unset.
    pub settings_url: Option<String>,

    /// Bearer token sent with every request.
    pub api_token: Option<String>,

    /// Entries per page.
    pub page_limit: usize,

    /// Whether opening an unread entry marks it read.
    pub mark_read_on_open: bool,

    /// Send PATCH/PUT/DELETE as POST with a method-override header, for
    /// servers that only accept GET and POST.
    pub emulate_http: bool,

    /// Permit a plain-http API URL on a non-local host.
    pub allow_insecure_http: bool,

    pub request_timeout_secs: u64,

    /// Refetch an entry after a failed update instead of only reporting it.
    pub reconcile_failed_mutations: bool,

    /// Custom keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,

    /// Tag groups collapsed in the sidebar at startup.
    pub collapsed: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            settings_url: None,
            api_token: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            mark_read_on_open: true,
            emulate_http: false,
            allow_insecure_http: false,
            request_timeout_secs: 30,
            reconcile_failed_mutations: false,
            keybindings: HashMap::new(),
            collapsed: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("settings_url", &self.settings_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("page_limit", &self.page_limit)
            .field("mark_read_on_open", &self.mark_read_on_open)
            .field("emulate_http", &self.emulate_http)
            .field("allow_insecure_http", &self.allow_insecure_http)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("reconcile_failed_mutations", &self.reconcile_failed_mutations)
            .field("keybindings", &self.keybindings)
            .field("collapsed", &self.collapsed)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 11] = [
        "api_url",
        "settings_url",
        "api_token",
        "page_limit",
        "mark_read_on_open",
        "emulate_http",
        "allow_insecure_http",
        "request_timeout_secs",
        "reconcile_failed_mutations",
        "keybindings",
        "collapsed",
    ];

    /// `~/.config/readr/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("readr")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse TOML text. Blank input yields defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(api_url = %config.api_url, "Loaded configuration");
        Ok(config)
    }

    /// Apply `READR_API_URL` / `READR_API_TOKEN` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(url = %url, "API URL overridden from environment");
            self.api_url = url;
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("API token taken from environment");
            self.api_token = Some(token);
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "api_url",
                reason: format!("not set (config file or {})", ENV_API_URL),
            });
        }
        if self.page_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "page_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            page_limit: self.page_limit,
            mark_read_on_open: self.mark_read_on_open,
            on_mutation_failure: if self.reconcile_failed_mutations {
                MutationFailurePolicy::Refetch
            } else {
                MutationFailurePolicy::KeepLocal
            },
        }
    }

    pub fn api_options(&self) -> ApiOptions {
        ApiOptions {
            api_url: self.api_url.clone(),
            settings_url: self.settings_url.clone(),
            token: self.api_token.clone().map(SecretString::from),
            emulate_http: self.emulate_http,
            allow_insecure_http: self.allow_insecure_http,
            timeout: self.request_timeout(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
