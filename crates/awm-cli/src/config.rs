//! Configuration loading and management.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use awm_client::DEFAULT_TIMEOUT;
use awm_core::Normalizer;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server holding the watcher history.
    pub source_url: String,
    /// Server receiving the merged timeline. Wiped on every run.
    pub destination_url: String,
    /// Host whose buckets are read from the source.
    pub hostname: String,
    /// Host the destination buckets are named after.
    pub destination_hostname: String,
    /// Emit the interval still open when the sweep ends.
    pub flush_at_end: bool,
    /// Extra app renames, applied after the built-in ones.
    #[serde(default)]
    pub app_aliases: BTreeMap<String, String>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let hostname = local_hostname();
        Self {
            source_url: "http://localhost:5600".to_string(),
            destination_url: "http://localhost:5666".to_string(),
            destination_hostname: hostname.clone(),
            hostname,
            flush_at_end: true,
            app_aliases: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (AWM_*)
        figment = figment.merge(Env::prefixed("AWM_"));

        figment.extract()
    }

    /// Built-in normalization plus the configured aliases.
    pub fn normalizer(&self) -> Normalizer {
        self.app_aliases
            .iter()
            .fold(Normalizer::default(), |normalizer, (from, to)| {
                normalizer.with_alias(from.as_str(), to.as_str())
            })
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The machine's hostname, as the watchers record it.
fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Returns the platform-specific config directory for awm.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("awm"))
}
