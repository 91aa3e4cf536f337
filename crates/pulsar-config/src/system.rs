use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CYCLE_MS: u64 = 100;
/// Looser cycle for test harnesses, which tolerate more latency.
pub const DEFAULT_TEST_MODE_CYCLE_MS: u64 = 250;
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// The system-configuration document. Every field has a default so a
/// minimal deployment can omit the file entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemConfig {
    pub version: u32,
    /// Evaluation cycle period in milliseconds.
    #[serde(rename = "cycleTime")]
    pub cycle_time_ms: u64,
    /// Cycle period when the Beacon runs under a test harness.
    #[serde(rename = "testModeCycleTime")]
    pub test_mode_cycle_ms: u64,
    pub redis: RedisConfig,
    pub buffer_capacity: usize,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// When absent, auto-populated from the union of referenced input
    /// sensors at compile time.
    pub valid_sensors: Option<Vec<String>>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            version: 1,
            cycle_time_ms: DEFAULT_CYCLE_MS,
            test_mode_cycle_ms: DEFAULT_TEST_MODE_CYCLE_MS,
            redis: RedisConfig::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            log_level: "info".to_string(),
            log_file: None,
            valid_sensors: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedisConfig {
    /// `host:port` endpoints.
    pub endpoints: Vec<String>,
    pub pool_size: usize,
    pub retry_count: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["localhost:6379".to_string()],
            pool_size: 4,
            retry_count: 3,
        }
    }
}

impl SystemConfig {
    /// Load and validate a config document.
    pub fn load(path: &Path) -> anyhow::Result<SystemConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: SystemConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cycle_time_ms == 0 {
            anyhow::bail!("cycleTime must be positive");
        }
        if self.buffer_capacity == 0 {
            anyhow::bail!("bufferCapacity must be positive");
        }
        if self.redis.endpoints.is_empty() {
            anyhow::bail!("redis.endpoints must not be empty");
        }
        for endpoint in &self.redis.endpoints {
            let Some((host, port)) = endpoint.rsplit_once(':') else {
                anyhow::bail!("redis endpoint `{endpoint}` is not host:port");
            };
            if host.is_empty() || port.parse::<u16>().is_err() {
                anyhow::bail!("redis endpoint `{endpoint}` is not host:port");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_an_empty_document() {
        let config: SystemConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, SystemConfig::default());
        assert_eq!(config.cycle_time_ms, 100);
        assert_eq!(config.test_mode_cycle_ms, 250);
        assert_eq!(config.buffer_capacity, 100);
    }

    #[test]
    fn camel_case_keys_parse() {
        let doc = r#"
version: 3
cycleTime: 250
bufferCapacity: 64
logLevel: debug
redis:
  endpoints: ["redis-a:6379", "redis-b:6379"]
  poolSize: 8
  retryCount: 5
validSensors:
  - input:temperature
"#;
        let config: SystemConfig = serde_yaml::from_str(doc).unwrap();
        assert_eq!(config.version, 3);
        assert_eq!(config.cycle_time_ms, 250);
        assert_eq!(config.buffer_capacity, 64);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.redis.endpoints.len(), 2);
        assert_eq!(config.redis.pool_size, 8);
        assert_eq!(
            config.valid_sensors,
            Some(vec!["input:temperature".to_string()])
        );
        config.validate().unwrap();
    }

    #[test]
    fn bad_endpoint_fails_validation() {
        let mut config = SystemConfig::default();
        config.redis.endpoints = vec!["not-an-endpoint".to_string()];
        assert!(config.validate().is_err());
        config.redis.endpoints = vec!["host:notaport".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cycle_time_fails_validation() {
        let config = SystemConfig {
            cycle_time_ms: 0,
            ..SystemConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
