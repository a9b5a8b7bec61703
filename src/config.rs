//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` into strongly-typed structs. Every field has a
//! default, so a partial (or absent) file is fine. Secrets (API keys) are
//! referenced by env-var name and resolved at runtime.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::PredictorSettings;
use crate::strategy::bankroll::BankrollConfig;
use crate::types::RoundwatchError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub bankroll: BankrollConfig,
    pub predictor: PredictorConfig,
    pub sampler: SamplerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_ms: u64,
    /// Consecutive identical polls before a sequence is confirmed.
    pub required_stable: u32,
    pub heartbeat_secs: u64,
    pub stall_warn_secs: u64,
    pub round_length: usize,
    /// Settled (non-NoBet) rounds before the session ends.
    pub max_rounds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            required_stable: 2,
            heartbeat_secs: 10,
            stall_warn_secs: 90,
            round_length: 13,
            max_rounds: 10,
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn stall_after(&self) -> Duration {
        Duration::from_secs(self.stall_warn_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PredictorConfig {
    /// `openrouter`, `openai` or `command`.
    pub provider: String,
    pub model: Option<String>,
    pub api_key_env: String,
    pub base_url: Option<String>,
    /// argv for the `command` provider.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub max_tokens: Option<u32>,
    pub retry_on_skip: bool,
    pub heuristic_fallback: bool,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: None,
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            base_url: None,
            command: Vec::new(),
            timeout_secs: 12,
            max_tokens: None,
            retry_on_skip: true,
            heuristic_fallback: true,
        }
    }
}

impl PredictorConfig {
    pub fn settings(&self) -> PredictorSettings {
        PredictorSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            retry_on_skip: self.retry_on_skip,
            heuristic_fallback: self.heuristic_fallback,
        }
    }

    /// The configured API key, if its env var is set and non-empty.
    pub fn api_key(&self) -> Option<SecretString> {
        AppConfig::resolve_env(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::new)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplerConfig {
    /// Recorded frames to replay. Without one there is nothing to sample.
    pub replay_path: Option<PathBuf>,
    pub period_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            replay_path: None,
            period_ms: 2000,
        }
    }
}

impl SamplerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Reject settings the engine cannot run with. Fatal at startup.
    pub fn validate(&self) -> Result<(), RoundwatchError> {
        let e = &self.engine;
        if e.round_length == 0 {
            return Err(RoundwatchError::Config("engine.round_length must be > 0".into()));
        }
        if e.required_stable == 0 {
            return Err(RoundwatchError::Config("engine.required_stable must be > 0".into()));
        }
        if e.max_rounds == 0 {
            return Err(RoundwatchError::Config("engine.max_rounds must be > 0".into()));
        }
        if e.poll_interval_ms == 0 || self.sampler.period_ms == 0 {
            return Err(RoundwatchError::Config(
                "engine.poll_interval_ms and sampler.period_ms must be > 0".into(),
            ));
        }
        if e.heartbeat_secs == 0 || e.stall_warn_secs == 0 {
            return Err(RoundwatchError::Config(
                "engine.heartbeat_secs and engine.stall_warn_secs must be > 0".into(),
            ));
        }
        if self.predictor.timeout_secs == 0 {
            return Err(RoundwatchError::Config("predictor.timeout_secs must be > 0".into()));
        }
        self.bankroll.validate()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
