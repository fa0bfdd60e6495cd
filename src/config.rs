//! Configuration for the evaluation harness.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// QA service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the QA service API (e.g., "http://localhost:8000/api")
    pub api_base: String,

    /// Bearer token sent with every request (optional)
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_api_base() -> String {
    "http://localhost:8000/api".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
        }
    }
}

/// Evaluation run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Deadline for a single grading call, in seconds
    #[serde(default = "default_grade_timeout_secs")]
    pub grade_timeout_secs: u64,

    /// Deadline for test set generation, in seconds
    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,

    /// Number of questions requested when the caller does not say
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
}

fn default_grade_timeout_secs() -> u64 {
    30
}

fn default_generate_timeout_secs() -> u64 {
    300
}

fn default_sample_count() -> usize {
    20
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            grade_timeout_secs: default_grade_timeout_secs(),
            generate_timeout_secs: default_generate_timeout_secs(),
            sample_count: default_sample_count(),
        }
    }
}

impl EvaluationConfig {
    pub fn grade_timeout(&self) -> Duration {
        Duration::from_secs(self.grade_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// QA service settings
    pub service: ServiceConfig,
    /// Evaluation settings
    pub evaluation: EvaluationConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    service: Option<ServiceFileSection>,
    evaluation: Option<EvaluationFileSection>,
}

#[derive(Debug, Deserialize)]
struct ServiceFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvaluationFileSection {
    grade_timeout_secs: Option<u64>,
    generate_timeout_secs: Option<u64>,
    sample_count: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DOCQA_API_BASE, DOCQA_API_KEY, DOCQA_GRADE_TIMEOUT_SECS, ...)
    /// 2. Config file (~/.config/docqa-eval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(api_base) = env::var("DOCQA_API_BASE") {
            self.service.api_base = api_base;
        }

        if let Ok(api_key) = env::var("DOCQA_API_KEY") {
            self.service.api_key = Some(api_key).filter(|k| !k.is_empty());
        }

        if let Some(secs) = env_parse("DOCQA_GRADE_TIMEOUT_SECS") {
            self.evaluation.grade_timeout_secs = secs;
        }

        if let Some(secs) = env_parse("DOCQA_GENERATE_TIMEOUT_SECS") {
            self.evaluation.generate_timeout_secs = secs;
        }

        if let Some(count) = env_parse("DOCQA_SAMPLE_COUNT") {
            self.evaluation.sample_count = count;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        Self::from_yaml(&content)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| EvalError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(service) = file_config.service {
            if let Some(api_base) = service.api_base {
                config.service.api_base = api_base;
            }
            if let Some(api_key) = service.api_key {
                config.service.api_key = Some(api_key);
            }
        }

        if let Some(evaluation) = file_config.evaluation {
            if let Some(secs) = evaluation.grade_timeout_secs {
                config.evaluation.grade_timeout_secs = secs;
            }
            if let Some(secs) = evaluation.generate_timeout_secs {
                config.evaluation.generate_timeout_secs = secs;
            }
            if let Some(count) = evaluation.sample_count {
                config.evaluation.sample_count = count;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "docqa-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        let base = self.service.api_base.trim();
        if base.is_empty() {
            return Err(EvalError::Config(
                "QA service base URL is required. Set DOCQA_API_BASE environment variable or add to config file.".to_string(),
            ));
        }

        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(EvalError::Config(format!(
                "QA service base URL must start with http:// or https://, got '{}'",
                base
            )));
        }

        if self.evaluation.grade_timeout_secs == 0 || self.evaluation.generate_timeout_secs == 0 {
            return Err(EvalError::Config(
                "Timeouts must be at least one second.".to_string(),
            ));
        }

        if self.evaluation.sample_count == 0 {
            return Err(EvalError::Config(
                "Sample count must be at least 1.".to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config pointing at an explicit service (useful for testing).
    pub fn with_service(api_base: impl Into<String>) -> Self {
        Self {
            service: ServiceConfig {
                api_base: api_base.into(),
                api_key: None,
            },
            ..Default::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
