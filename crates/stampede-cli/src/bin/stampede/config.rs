//! Stress run configuration.
//!
//! Layered the usual way:
//! 1. Defaults from `stampede-constants`
//! 2. Optional TOML file (`--config` or `STAMPEDE_CONFIG`)
//! 3. Command-line overrides
//!
//! The merged result is validated once, before any trial runs.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use snafu::Snafu;
use stampede_constants::harness::DEFAULT_TABLE_NAME;
use stampede_constants::harness::DEFAULT_WORKER_COUNT;
use stampede_constants::harness::MAX_SIMULATED_LATENCY_MS;
use stampede_constants::harness::MAX_WORKER_COUNT;
use stampede_constants::retry::DEFAULT_MAX_ATTEMPTS;
use stampede_constants::retry::MAX_ATTEMPTS_LIMIT;
use stampede_core::Backoff;
use stampede_core::ProtocolKind;
use stampede_core::RetryPolicy;
use stampede_core::TrialSettings;
use stampede_memory::FaultPlan;
use stampede_memory::MemoryStoreConfig;
use tracing::warn;

/// Errors loading or validating a [`StressConfig`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to parse config file {}: {source}", path.display()))]
    ParseToml { path: PathBuf, source: toml::de::Error },

    #[snafu(display("invalid configuration for {key}: '{value}' ({reason})"))]
    InvalidValue { key: String, value: String, reason: String },
}

/// Everything a stress run needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StressConfig {
    /// Table holding the shared records.
    pub table_name: String,
    pub protocol: ProtocolKind,
    /// Workers per trial.
    pub worker_count: u32,
    /// Attempts per worker, including the first.
    pub max_attempts: u32,
    /// Stop after this many clean trials; absent means run until interrupted.
    pub max_trials: Option<u64>,
    pub backoff: Backoff,
    pub memory: MemoryStoreConfig,
    pub faults: FaultPlan,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            protocol: ProtocolKind::default(),
            worker_count: DEFAULT_WORKER_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_trials: None,
            backoff: Backoff::None,
            memory: MemoryStoreConfig::default(),
            faults: FaultPlan::default(),
        }
    }
}

impl StressConfig {
    /// Parse a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        toml::from_str(&contents).context(ParseTomlSnafu { path })
    }

    /// Defaults, overlaid with `path` if given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading configuration");
                Self::from_toml_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check every value against the hard limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: String, reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            reason: reason.to_string(),
        };

        if self.table_name.trim().is_empty() {
            return Err(invalid("table_name", self.table_name.clone(), "must not be empty"));
        }
        if self.worker_count == 0 || self.worker_count > MAX_WORKER_COUNT {
            return Err(invalid(
                "worker_count",
                self.worker_count.to_string(),
                &format!("must be in 1..={MAX_WORKER_COUNT}"),
            ));
        }
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(invalid(
                "max_attempts",
                self.max_attempts.to_string(),
                &format!("must be in 1..={MAX_ATTEMPTS_LIMIT}"),
            ));
        }
        if self.max_trials == Some(0) {
            return Err(invalid("max_trials", "0".to_string(), "must be at least 1 when set"));
        }
        if let Err(reason) = self.backoff.validate() {
            return Err(invalid("backoff", format!("{:?}", self.backoff), &reason));
        }
        for (key, value) in [
            ("memory.latency_ms", self.memory.latency_ms),
            ("memory.latency_jitter_ms", self.memory.latency_jitter_ms),
        ] {
            if value > MAX_SIMULATED_LATENCY_MS {
                return Err(invalid(key, value.to_string(), &format!("must be at most {MAX_SIMULATED_LATENCY_MS}")));
            }
        }

        let out_of_range: Vec<u32> = self
            .faults
            .fail_indices
            .iter()
            .chain(&self.faults.drop_indices)
            .filter(|index| **index >= self.worker_count)
            .copied()
            .collect();
        if !out_of_range.is_empty() {
            warn!(indices = ?out_of_range, worker_count = self.worker_count, "fault indices no worker will append");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
        }
    }

    pub fn trial_settings(&self) -> TrialSettings {
        TrialSettings {
            table: self.table_name.clone(),
            worker_count: self.worker_count,
            policy: self.retry_policy(),
            max_trials: self.max_trials,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StressConfig::default();
        config.validate().unwrap();
        assert_eq!(config.table_name, "SagaData");
        assert_eq!(config.worker_count, 50);
        assert_eq!(config.max_attempts, 50);
        assert_eq!(config.max_trials, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
protocol = "transaction"
worker_count = 20
max_trials = 10

[backoff]
kind = "exponential"
max_ms = 64
jitter = true

[memory]
latency_ms = 2

[faults]
drop_indices = [3]
"#
        )
        .unwrap();

        let config = StressConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.protocol, ProtocolKind::Transaction);
        assert_eq!(config.worker_count, 20);
        assert_eq!(config.max_attempts, 50);
        assert_eq!(config.max_trials, Some(10));
        assert_eq!(config.backoff, Backoff::Exponential {
            initial_ms: 1,
            max_ms: 64,
            jitter: true,
        });
        assert_eq!(config.memory.latency_ms, 2);
        assert_eq!(config.faults.drop_indices, BTreeSet::from([3]));
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StressConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_count = \"many\"").unwrap();
        let err = StressConfig::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(StressConfig::load(None).unwrap(), StressConfig::default());
    }

    #[test]
    fn test_validate_rejects_out_of_bounds() {
        let cases = [
            StressConfig {
                table_name: String::new(),
                ..Default::default()
            },
            StressConfig {
                worker_count: 0,
                ..Default::default()
            },
            StressConfig {
                worker_count: MAX_WORKER_COUNT + 1,
                ..Default::default()
            },
            StressConfig {
                max_attempts: 0,
                ..Default::default()
            },
            StressConfig {
                max_trials: Some(0),
                ..Default::default()
            },
            StressConfig {
                backoff: Backoff::Exponential {
                    initial_ms: 0,
                    max_ms: 10,
                    jitter: false,
                },
                ..Default::default()
            },
            StressConfig {
                memory: MemoryStoreConfig {
                    latency_ms: MAX_SIMULATED_LATENCY_MS + 1,
                    latency_jitter_ms: 0,
                },
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidValue { .. })),
                "accepted {config:?}"
            );
        }
    }

    #[test]
    fn test_trial_settings_mirror_config() {
        let config = StressConfig {
            worker_count: 7,
            max_attempts: 9,
            max_trials: Some(2),
            ..Default::default()
        };
        let settings = config.trial_settings();
        assert_eq!(settings.worker_count, 7);
        assert_eq!(settings.policy.max_attempts, 9);
        assert_eq!(settings.max_trials, Some(2));
        assert_eq!(settings.table, "SagaData");
    }
}
