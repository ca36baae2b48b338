//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$NTHMAIL_CONFIG` (environment variable)
//! 2. `~/.config/nthmail/config.toml` (Linux/macOS)
//!    `%APPDATA%\nthmail\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! `$MAIL_SERVER_DOMAIN`, when set, overrides `inbox.domain`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Message decoding limits.
    pub parser: ParserConfig,
    /// Inbox ingestion policy.
    pub inbox: InboxConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Message decoding limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Deepest multipart nesting accepted before a message is rejected.
    pub max_nesting_depth: usize,
    /// Largest raw message accepted, in bytes (default: 1 MiB).
    pub max_message_size: u64,
}

/// Inbox ingestion policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// The only recipient domain this server accepts mail for.
    pub domain: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: crate::parser::multipart::MAX_NESTING_DEPTH,
            max_message_size: 1024 * 1024,
        }
    }
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    let mut config = read_config_file().unwrap_or_default();
    if let Ok(domain) = std::env::var("MAIL_SERVER_DOMAIN") {
        if !domain.trim().is_empty() {
            config.inbox.domain = domain.trim().to_string();
        }
    }
    config
}

fn read_config_file() -> Option<Config> {
    let path = config_file_path()?;
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                Some(cfg)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                None
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            None
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("NTHMAIL_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("nthmail").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nthmail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.parser.max_nesting_depth, 32);
        assert_eq!(cfg.parser.max_message_size, 1_048_576);
        assert_eq!(cfg.inbox.domain, "localhost");
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
        assert_eq!(parsed.parser.max_nesting_depth, cfg.parser.max_nesting_depth);
        assert_eq!(parsed.inbox.domain, cfg.inbox.domain);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[parser]
max_nesting_depth = 8

[inbox]
domain = "nthmail.example"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.parser.max_nesting_depth, 8);
        assert_eq!(cfg.inbox.domain, "nthmail.example");
        // Other fields use defaults
        assert_eq!(cfg.parser.max_message_size, 1_048_576);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_cache_dir_override() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/nthmail-cache"));
        assert_eq!(cache_dir(&cfg), PathBuf::from("/tmp/nthmail-cache"));
    }
}
