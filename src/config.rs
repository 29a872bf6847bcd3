use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const TOKEN_ENV: &str = "MAX_BOT_TOKEN";
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponderKind {
    #[default]
    Script,
    Http,
}

impl std::fmt::Display for ResponderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponderKind::Script => write!(f, "script"),
            ResponderKind::Http => write!(f, "http"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub max: MaxConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MaxConfig {
    /// Usually supplied through `MAX_BOT_TOKEN` rather than the file.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_poll_limit")]
    pub poll_limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResponderConfig {
    #[serde(default)]
    pub kind: ResponderKind,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Explicit script path. When absent the well-known locations are probed.
    #[serde(default)]
    pub script: Option<PathBuf>,
    #[serde(default = "default_script_candidates")]
    pub candidates: Vec<PathBuf>,
    /// Endpoint for `kind = "http"`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_responder_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_url() -> String {
    "https://platform-api.max.ru".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_poll_limit() -> u32 {
    100
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_script_candidates() -> Vec<PathBuf> {
    [
        "neuro/main.py",
        "../neuro/main.py",
        "../../neuro/main.py",
        "./neuro/main.py",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

fn default_responder_timeout_secs() -> u64 {
    8
}

fn default_deadline_secs() -> u64 {
    10
}

fn default_max_in_flight() -> usize {
    64
}

fn default_health_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

impl Default for MaxConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
            poll_limit: default_poll_limit(),
        }
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            kind: ResponderKind::default(),
            interpreter: default_interpreter(),
            script: None,
            candidates: default_script_candidates(),
            url: None,
            timeout_secs: default_responder_timeout_secs(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline_secs(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            port: default_port(),
        }
    }
}

impl ResponderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WorkerConfig {
    /// Per-message deadline covering resolve and send.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Config {
    /// Load the optional TOML file at `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `MAX_BOT_TOKEN` and `PORT` take precedence over the file.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.max.token = token.trim().to_string();
        }
        if let Some(port) = lookup(PORT_ENV).filter(|p| !p.trim().is_empty()) {
            self.health.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} value: {}", PORT_ENV, port))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max.token.is_empty() {
            anyhow::bail!("{} is not set", TOKEN_ENV);
        }
        if self.worker.max_in_flight == 0 {
            anyhow::bail!("worker.max_in_flight must be at least 1");
        }
        if self.responder.kind == ResponderKind::Http && self.responder.url.is_none() {
            anyhow::bail!("responder.url is required when responder.kind = \"http\"");
        }
        // The fallback reply has to fit inside the worker deadline.
        if self.responder.timeout_secs >= self.worker.deadline_secs {
            anyhow::bail!(
                "responder.timeout_secs ({}) must be shorter than worker.deadline_secs ({})",
                self.responder.timeout_secs,
                self.worker.deadline_secs
            );
        }
        Ok(())
    }
}
