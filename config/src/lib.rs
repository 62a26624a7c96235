//! Configuration for Iadess, read from `~/.iadess/config.toml`.
//!
//! Every section is optional. A missing file means defaults throughout; a file
//! that exists but cannot be read or parsed is a [`ConfigError`].

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use iadess_providers::{ApiKey, GeminiConfig, RetryPolicy};
use iadess_types::{ChatParams, ForgeParams, LedgerParams, Realm, RealmParseError};
use serde::Deserialize;
use thiserror::Error;

/// File name the artifact repository writes inside the data directory.
pub const ARTIFACTS_FILE: &str = "iadess_artifacts.json";

/// Environment variables consulted, in order, when no key is configured.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Default, Deserialize)]
pub struct IadessConfig {
    pub app: Option<AppConfig>,
    pub api_keys: Option<ApiKeys>,
    pub google: Option<GoogleConfig>,
    pub ledger: Option<LedgerParams>,
    pub forge: Option<ForgeParams>,
    pub retry: Option<RetryPolicy>,
    pub chat: Option<ChatParams>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Realm selected at startup (e.g. "PAGES").
    pub default_realm: Option<String>,
    /// Where persisted artifacts live. Defaults to `~/.iadess`.
    pub data_dir: Option<PathBuf>,
    /// Disable the artifact repository entirely.
    #[serde(default)]
    pub ephemeral: bool,
}

#[derive(Default, Deserialize)]
pub struct ApiKeys {
    pub google: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let google = if self.google.is_some() {
            "[REDACTED]"
        } else {
            "None"
        };
        f.debug_struct("ApiKeys").field("google", &google).finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GoogleConfig {
    pub base_url: Option<String>,
    pub text_model: Option<String>,
    pub artifact_model: Option<String>,
    pub image_model: Option<String>,
    pub speech_model: Option<String>,
    pub voice: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub search_grounding: Option<bool>,
}

/// Replace `${VAR}` references with environment values.
///
/// Unset variables expand to the empty string; an unclosed `${` is kept.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    expand_with(value, |name| env::var(name).ok())
}

fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        if !name.is_empty() {
            out.push_str(&lookup(name).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl IadessConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map(Some).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// API key from `[api_keys] google`, then the environment.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<ApiKey> {
        self.resolve_api_key_with(|name| env::var(name).ok())
    }

    fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<ApiKey> {
        let configured = self
            .api_keys
            .as_ref()
            .and_then(|keys| keys.google.as_deref())
            .map(|raw| expand_with(raw, &lookup))
            .filter(|key| !key.trim().is_empty());

        configured
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .filter_map(|&name| lookup(name))
                    .find(|key| !key.trim().is_empty())
            })
            .map(ApiKey::new)
    }

    #[must_use]
    pub fn forge_params(&self) -> ForgeParams {
        self.forge.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn ledger_params(&self) -> LedgerParams {
        self.ledger.unwrap_or_default()
    }

    #[must_use]
    pub fn chat_params(&self) -> ChatParams {
        self.chat.unwrap_or_default()
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default()
    }

    pub fn default_realm(&self) -> Result<Realm, RealmParseError> {
        match self.app.as_ref().and_then(|app| app.default_realm.as_deref()) {
            Some(raw) => Realm::parse(raw),
            None => Ok(Realm::default()),
        }
    }

    /// Path of the artifact file, or `None` when persistence is disabled.
    #[must_use]
    pub fn artifacts_path(&self) -> Option<PathBuf> {
        let app = self.app.as_ref();
        if app.is_some_and(|app| app.ephemeral) {
            return None;
        }
        app.and_then(|app| app.data_dir.clone())
            .or_else(default_data_dir)
            .map(|dir| dir.join(ARTIFACTS_FILE))
    }

    /// Gateway settings with `[google]` and `[retry]` applied over defaults.
    #[must_use]
    pub fn gemini_config(&self, api_key: ApiKey) -> GeminiConfig {
        let mut config = GeminiConfig::new(api_key);
        config.retry = self.retry_policy();
        let Some(google) = self.google.as_ref() else {
            return config;
        };
        if let Some(base_url) = &google.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(model) = &google.text_model {
            config.text_model.clone_from(model);
        }
        if let Some(model) = &google.artifact_model {
            config.artifact_model.clone_from(model);
        }
        if let Some(model) = &google.image_model {
            config.image_model.clone_from(model);
        }
        if let Some(model) = &google.speech_model {
            config.speech_model.clone_from(model);
        }
        if let Some(voice) = &google.voice {
            config.voice.clone_from(voice);
        }
        if let Some(secs) = google.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(enabled) = google.search_grounding {
            config.search_grounding = enabled;
        }
        config
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".iadess").join("config.toml"))
}

#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".iadess"))
}
