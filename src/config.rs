use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SaathiConfig {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
    pub identity: IdentityConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub app_id: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub identity_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    pub provider: String,
    pub api_url: String,
    pub model: String,
    pub api_key: String,
    /// HTTP timeout for one request.
    pub timeout_secs: u64,
    /// Upper bound on one whole classification step of a submission.
    pub classify_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct IdentityConfig {
    pub initial_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub feed_limit: usize,
}

impl Default for SaathiConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            storage: StorageConfig::default(),
            inference: InferenceConfig::default(),
            identity: IdentityConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: "default-app-id".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_saathi_dir();
        Self {
            db_path: dir.join("activities.db").to_string_lossy().into_owned(),
            identity_path: dir.join("identity").to_string_lossy().into_owned(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            api_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-2.5-flash-preview-05-20".into(),
            api_key: String::new(),
            timeout_secs: 30,
            classify_timeout_secs: 45,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { feed_limit: 3 }
    }
}

/// Returns `~/.saathi/`, or `./.saathi/` when no home directory is known.
pub fn default_saathi_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".saathi")
}

/// Returns the default config file path: `~/.saathi/config.toml`
pub fn default_config_path() -> PathBuf {
    default_saathi_dir().join("config.toml")
}

impl SaathiConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SaathiConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (SAATHI_APP_ID, SAATHI_DB,
    /// SAATHI_LOG_LEVEL, SAATHI_API_KEY, SAATHI_AUTH_TOKEN).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SAATHI_APP_ID") {
            self.app.app_id = val;
        }
        if let Ok(val) = std::env::var("SAATHI_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("SAATHI_LOG_LEVEL") {
            self.app.log_level = val;
        }
        if let Ok(val) = std::env::var("SAATHI_API_KEY") {
            self.inference.api_key = val;
        }
        if let Ok(val) = std::env::var("SAATHI_AUTH_TOKEN") {
            self.identity.initial_token = Some(val).filter(|t| !t.is_empty());
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.app.app_id.trim().is_empty(), "app.app_id must not be empty");
        anyhow::ensure!(self.view.feed_limit > 0, "view.feed_limit must be at least 1");
        anyhow::ensure!(
            self.inference.timeout_secs > 0,
            "inference.timeout_secs must be at least 1"
        );
        anyhow::ensure!(
            self.inference.classify_timeout_secs > 0,
            "inference.classify_timeout_secs must be at least 1"
        );
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_identity_path(&self) -> PathBuf {
        expand_tilde(&self.storage.identity_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SaathiConfig::default();
        assert_eq!(config.app.app_id, "default-app-id");
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.inference.provider, "gemini");
        assert_eq!(config.inference.timeout_secs, 30);
        assert_eq!(config.inference.classify_timeout_secs, 45);
        assert_eq!(config.view.feed_limit, 3);
        assert!(config.storage.db_path.ends_with("activities.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[app]
app_id = "hersaathi"
log_level = "debug"

[inference]
model = "gemini-2.0-flash"
timeout_secs = 10

[identity]
initial_token = "priya_01"
"#;
        let config: SaathiConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.app.app_id, "hersaathi");
        assert_eq!(config.app.log_level, "debug");
        assert_eq!(config.inference.model, "gemini-2.0-flash");
        assert_eq!(config.inference.timeout_secs, 10);
        assert_eq!(config.identity.initial_token.as_deref(), Some("priya_01"));
        // defaults still apply for unset fields
        assert_eq!(config.inference.provider, "gemini");
        assert_eq!(config.view.feed_limit, 3);
    }

    #[test]
    fn zero_classify_timeout_is_rejected() {
        let mut config = SaathiConfig::default();
        config.inference.classify_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_feed_limit_is_rejected() {
        let mut config = SaathiConfig::default();
        config.view.feed_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = SaathiConfig::default();
        std::env::set_var("SAATHI_DB", "/tmp/override.db");
        std::env::set_var("SAATHI_APP_ID", "env-app");
        std::env::set_var("SAATHI_LOG_LEVEL", "trace");
        std::env::set_var("SAATHI_AUTH_TOKEN", "");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.app.app_id, "env-app");
        assert_eq!(config.app.log_level, "trace");
        assert!(config.identity.initial_token.is_none());

        // Clean up
        std::env::remove_var("SAATHI_DB");
        std::env::remove_var("SAATHI_APP_ID");
        std::env::remove_var("SAATHI_LOG_LEVEL");
        std::env::remove_var("SAATHI_AUTH_TOKEN");
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/var/db.sqlite"), PathBuf::from("/var/db.sqlite"));
    }
}
