//! Configuration loading and client factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use panelscore_core::report::BlendWeights;
use panelscore_core::service::ServiceConfig;
use panelscore_core::statistics::ConsistencyThresholds;
use panelscore_core::traits::{CompletionClient, CompletionRequest};

use crate::client::{ExternalCompletionClient, ProviderFormat};

/// Configuration for a single completion provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub format: ProviderFormat,
    #[serde(default)]
    pub api_key: String,
    /// Base URL; the provider path is appended.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderConfig {
    pub fn new(format: ProviderFormat) -> Self {
        Self {
            format,
            api_key: String::new(),
            endpoint: None,
            model: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("format", &self.format)
            .field("api_key", &"***")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

/// Top-level panelscore configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used when none is named explicitly.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Completion call deadline in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Human/AI blend used by reports.
    #[serde(default)]
    pub blend: BlendWeights,
    /// Stddev thresholds for consistency labels.
    #[serde(default)]
    pub consistency: ConsistencyThresholds,
    /// Fixed seed for suggestion picks, for reproducible reports.
    #[serde(default)]
    pub suggestion_seed: Option<u64>,
    /// Retries after a concurrent summary write conflict.
    #[serde(default = "default_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_provider() -> String {
    "deepseek-thinking".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_conflict_retries() -> u32 {
    3
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            blend: BlendWeights::default(),
            consistency: ConsistencyThresholds::default(),
            suggestion_seed: None,
            max_conflict_retries: default_conflict_retries(),
        }
    }
}

impl PanelConfig {
    /// Reject settings no operation could use.
    pub fn validate(&self) -> Result<()> {
        self.blend.validate().context("invalid [blend] section")?;
        self.consistency
            .validate()
            .context("invalid [consistency] section")?;
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!("temperature must be within 0.0..=2.0, got {}", self.temperature);
        }
        if self.max_tokens == 0 {
            anyhow::bail!("max_tokens must be greater than zero");
        }
        Ok(())
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            thresholds: self.consistency,
            blend: self.blend,
            suggestion_seed: self.suggestion_seed,
            max_conflict_retries: self.max_conflict_retries,
            ..Default::default()
        }
    }

    /// A request carrying the configured sampling settings and deadline.
    pub fn completion_request(&self, prompt: impl Into<String>) -> CompletionRequest {
        CompletionRequest {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
            ..CompletionRequest::new(prompt)
        }
    }

    /// Build the client for `name`, or the default provider.
    pub fn client(&self, name: Option<&str>) -> Result<Box<dyn CompletionClient>> {
        let name = name.unwrap_or(&self.default_provider);
        let provider = self.providers.get(name).with_context(|| {
            let mut known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
            known.sort_unstable();
            format!(
                "provider '{name}' is not configured (configured: {})",
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            )
        })?;
        create_client(name, provider)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables resolve to the empty string. Substituted values are not
/// scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    ProviderConfig {
        format: config.format,
        api_key: resolve_env_vars(&config.api_key),
        endpoint: config.endpoint.as_deref().map(resolve_env_vars),
        model: config.model.as_deref().map(resolve_env_vars),
    }
}

/// `PANELSCORE_<NAME>_KEY` for a provider name.
fn key_override_var(name: &str) -> String {
    format!(
        "PANELSCORE_{}_KEY",
        name.to_ascii_uppercase().replace('-', "_")
    )
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `panelscore.toml` in the current directory
/// 2. `~/.config/panelscore/config.toml`
///
/// Environment variable overrides: `PANELSCORE_<PROVIDER>_KEY`, e.g.
/// `PANELSCORE_DEEPSEEK_THINKING_KEY`.
pub fn load_config() -> Result<PanelConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PanelConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("panelscore.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<PanelConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PanelConfig::default(),
    };

    // Env overrides for configured providers, plus one entry per known
    // provider type whose key is present in the environment.
    for format in ProviderFormat::ALL {
        if let Ok(key) = std::env::var(key_override_var(format.name())) {
            config
                .providers
                .entry(format.name().to_string())
                .or_insert_with(|| ProviderConfig::new(format))
                .api_key = key;
        }
    }
    for (name, provider) in config.providers.iter_mut() {
        if let Ok(key) = std::env::var(key_override_var(name)) {
            provider.api_key = key;
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    config.validate()?;
    tracing::debug!(providers = config.providers.len(), "configuration loaded");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("panelscore"))
}

/// Create a client instance from its configuration.
pub fn create_client(name: &str, config: &ProviderConfig) -> Result<Box<dyn CompletionClient>> {
    let client = ExternalCompletionClient::new(
        config.format,
        &config.api_key,
        config.endpoint.clone(),
        config.model.clone(),
    )
    .with_context(|| format!("failed to create provider '{name}'"))?
    .with_name(name);
    Ok(Box::new(client))
}
