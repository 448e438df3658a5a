use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HookflowError, Result};

pub const CONFIG_FILE_NAME: &str = "Hookflow.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HookflowConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub flows: FlowsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlowsConfig {
    pub dir: PathBuf,
    pub cache_ttl_secs: u64,
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("flows"),
            cache_ttl_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub resend: ResendConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-5-nano".into(),
        }
    }
}

impl OpenAiConfig {
    pub fn api_key(&self) -> Option<String> {
        read_env(&self.api_key_env)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResendConfig {
    pub api_key_env: String,
    pub base_url: String,
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            api_key_env: "RESEND_API_KEY".into(),
            base_url: "https://api.resend.com".into(),
        }
    }
}

impl ResendConfig {
    pub fn api_key(&self) -> Option<String> {
        read_env(&self.api_key_env)
    }
}

fn read_env(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl HookflowConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HookflowError::ConfigError {
            message: format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HookflowError::IoError {
            path: path.to_string_lossy().to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::parse(&content)?;
        if let Some(root) = path.parent() {
            if config.flows.dir.is_relative() {
                config.flows.dir = root.join(&config.flows.dir);
            }
        }
        Ok(config)
    }

    /// Looks for `Hookflow.toml` in `start_dir` and its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Explicit path, else the nearest `Hookflow.toml`, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let found = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::find(&cwd));
        match found {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}
