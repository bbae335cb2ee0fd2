use crate::providers::llm::RetryPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine tuning knobs, loadable from YAML. Every field has a default so
/// an empty file (or no file) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// A run still `running` after this many minutes is reported as
    /// abandoned.
    #[serde(default = "default_stale_run_minutes")]
    pub stale_run_minutes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            stale_run_minutes: default_stale_run_minutes(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&raw).context("failed to parse config YAML")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay_ms: self.retry_base_delay_ms,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_stale_run_minutes() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_uses_defaults() {
        let cfg: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.stale_run_minutes, 120);
    }

    #[test]
    fn partial_yaml_overrides() {
        let cfg: EngineConfig =
            serde_yaml::from_str("model: gpt-4o\ntimeout_seconds: 15").unwrap();
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.timeout_seconds, 15);
        assert_eq!(cfg.max_output_tokens, 1024);
    }
}
