//! Configuration for veritas.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DEEPSEEK_*, OPENAI_*, VERITAS_MODEL, VERITAS_CONFIG)
//! 2. Config file (.veritas/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - `VERITAS_CONFIG` names an explicit file
//! - Otherwise searches the current directory and parents for .veritas/config.yaml
//! - Falls back to ~/.veritas/config.yaml
//!
//! All environment reads go through a lookup function so that callers (and
//! tests) decide where values come from.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::limits::Limits;

pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
pub const DEEPSEEK_BASE_URL: &str = "DEEPSEEK_BASE_URL";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const MODEL_OVERRIDE: &str = "VERITAS_MODEL";
pub const CONFIG_OVERRIDE: &str = "VERITAS_CONFIG";

const CONFIG_DIR: &str = ".veritas";
const CONFIG_FILE: &str = "config.yaml";

/// Configuration errors. Raised before any pipeline step runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key found: set DEEPSEEK_API_KEY or OPENAI_API_KEY")]
    MissingCredential,

    #[error("config file {path}: {message}")]
    File { path: PathBuf, message: String },
}

/// Read the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Lookup that treats blank values as absent
fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Which OpenAI-compatible service the credentials belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    DeepSeek,
    OpenAi,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::DeepSeek => "https://api.deepseek.com",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek-chat",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
}

impl Credentials {
    /// Resolve credentials, primary (DeepSeek) before fallback (OpenAI)
    pub fn resolve<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let candidates = [
            (Provider::DeepSeek, DEEPSEEK_API_KEY, DEEPSEEK_BASE_URL),
            (Provider::OpenAi, OPENAI_API_KEY, OPENAI_BASE_URL),
        ];

        for (provider, key_var, url_var) in candidates {
            if let Some(api_key) = non_blank(lookup, key_var) {
                let base_url = non_blank(lookup, url_var)
                    .unwrap_or_else(|| provider.default_base_url().to_string());
                return Ok(Self {
                    provider,
                    api_key,
                    base_url,
                });
            }
        }

        Err(ConfigError::MissingCredential)
    }

    /// The key with everything but its last four characters masked
    pub fn redacted_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}

// Keep the key out of debug output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("provider", &self.provider)
            .field("api_key", &self.redacted_key())
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperatures: Temperatures,
    pub limits: Limits,
    pub research_concurrency: Option<usize>,
}

impl ConfigFile {
    /// Load and parse a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.to_path_buf(),
            message: format!("failed to read: {}", e),
        })?;

        Self::from_yaml(&content).map_err(|message| ConfigError::File {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse config YAML. An empty document is the default config.
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| format!("failed to parse: {}", e))
    }
}

/// Sampling temperature per agent role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperatures {
    pub researcher: f32,
    pub fact_checker: f32,
    pub writer: f32,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            researcher: 0.7,
            fact_checker: 0.3,
            writer: 0.7,
        }
    }
}

/// Agent and pipeline settings, independent of credentials
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub max_tokens: Option<u32>,
    pub temperatures: Temperatures,
    pub limits: Limits,

    /// Concurrent perspective calls in the comparative fan-out (>= 1)
    pub research_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperatures: Temperatures::default(),
            limits: Limits::default(),
            research_concurrency: 1,
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub credentials: Credentials,
    pub model: String,
    pub settings: Settings,

    /// Path to config file (if one was used)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Resolve from the process environment, current directory and home
    pub fn load() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().ok();
        let home = dirs::home_dir();
        Self::load_with(&process_env, cwd.as_deref(), home.as_deref())
    }

    /// Resolve from an explicit lookup, search root and home directory
    pub fn load_with<F>(
        lookup: &F,
        cwd: Option<&Path>,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::resolve(lookup)?;

        let config_file = match non_blank(lookup, CONFIG_OVERRIDE) {
            Some(explicit) => Some(PathBuf::from(explicit)),
            None => find_config_file(cwd, home),
        };

        let file = match &config_file {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        Self::from_parts(lookup, credentials, file, config_file)
    }

    /// Merge credentials, a parsed config file and environment overrides
    pub fn from_parts<F>(
        lookup: &F,
        credentials: Credentials,
        file: ConfigFile,
        config_file: Option<PathBuf>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let research_concurrency = file.research_concurrency.unwrap_or(1);
        if research_concurrency == 0 {
            return Err(ConfigError::File {
                path: config_file.unwrap_or_default(),
                message: "research_concurrency must be at least 1".to_string(),
            });
        }

        let model = non_blank(lookup, MODEL_OVERRIDE)
            .or_else(|| file.model.clone().filter(|m| !m.trim().is_empty()))
            .unwrap_or_else(|| credentials.provider.default_model().to_string());

        Ok(Self {
            credentials,
            model,
            settings: Settings {
                max_tokens: file.max_tokens,
                temperatures: file.temperatures,
                limits: file.limits,
                research_concurrency,
            },
            config_file,
        })
    }
}

/// Find the nearest .veritas/config.yaml from `start` upwards, else in `home`
pub fn find_config_file(start: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    if let Some(start) = start {
        let mut current = start.to_path_buf();
        loop {
            let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    home.map(|h| h.join(CONFIG_DIR).join(CONFIG_FILE))
        .filter(|p| p.is_file())
}
