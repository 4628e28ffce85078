//! Relay configuration (`relay.toml` plus numbered environment keys).
//!
//! Credential secrets come from two places: a `keys` array in the config
//! file and `GEMINI_API_KEY_{i}` environment variables scanned from 0.
//! File-listed keys come first, env keys are appended after them in
//! numbered order. Everything else (proxies, model, upstream base URL,
//! bind address, state directory) lives in the file with defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-exp-0801";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_BIND: &str = "0.0.0.0:10000";

/// Environment variable prefix for numbered credential secrets.
pub const KEY_ENV_PREFIX: &str = "GEMINI_API_KEY_";

/// Highest numbered env key scanned for.
const MAX_ENV_KEYS: usize = 64;

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Ordered credential secrets. Never empty.
    pub keys: Vec<String>,
    /// Outbound proxy URIs; empty means direct connections.
    pub proxies: Vec<String>,
    /// Default model identifier (callers may override per request).
    pub model: String,
    /// Upstream API base URL.
    pub base_url: String,
    /// HTTP surface bind address.
    pub bind: String,
    /// State directory override; defaults to the platform state dir.
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    proxies: Vec<String>,
    model: Option<String>,
    base_url: Option<String>,
    bind: Option<String>,
    state_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Load configuration. With `Some(path)` the file must exist and
    /// parse; with `None` only environment keys and defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?
            }
            None => FileConfig::default(),
        };
        Self::from_parts(file, keys_from_env())
    }

    fn from_parts(file: FileConfig, env_keys: Vec<String>) -> Result<Self> {
        let mut keys: Vec<String> = file
            .keys
            .into_iter()
            .chain(env_keys)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        keys.dedup();

        if keys.is_empty() {
            bail!(
                "no API keys configured; set {}0 or list `keys` in the config file",
                KEY_ENV_PREFIX
            );
        }

        Ok(Self {
            keys,
            proxies: file.proxies,
            model: file.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: file
                .base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bind: file.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
            state_dir: file.state_dir,
        })
    }

    /// The directory persisted history lives under: the configured
    /// override, or the platform state dir for this application.
    pub fn resolve_state_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        let proj_dirs = directories::ProjectDirs::from("", "", "gemini-relay")
            .context("Failed to determine project directories")?;
        // state_dir() is Linux-only; fall back to data_local_dir() elsewhere.
        let state_dir = proj_dirs
            .state_dir()
            .unwrap_or_else(|| proj_dirs.data_local_dir());
        Ok(state_dir.to_path_buf())
    }
}

/// Scan `GEMINI_API_KEY_0` .. `GEMINI_API_KEY_63`, collecting the set
/// values in numbered order. Gaps are tolerated.
pub fn keys_from_env() -> Vec<String> {
    keys_with_prefix(KEY_ENV_PREFIX)
}

fn keys_with_prefix(prefix: &str) -> Vec<String> {
    (0..MAX_ENV_KEYS)
        .filter_map(|i| std::env::var(format!("{prefix}{i}")).ok())
        .filter(|v| !v.trim().is_empty())
        .collect()
}
