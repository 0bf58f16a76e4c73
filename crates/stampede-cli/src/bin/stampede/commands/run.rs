//! `stampede run`: the trial loop.

use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use stampede_core::Backoff;
use stampede_core::ProtocolKind;
use stampede_core::TrialLoop;
use stampede_core::TrialLoopReport;
use tracing::error;
use tracing::info;

use super::build_store;
use super::cancel_on_ctrl_c;
use crate::cli::GlobalOptions;
use crate::config::StressConfig;
use crate::output::RunOutput;
use crate::output::print_output;

/// Command-line overrides shared by every command that runs trials.
#[derive(Args, Clone, Debug, Default)]
pub struct StressOverrides {
    /// Table holding the shared records.
    #[arg(long)]
    pub table: Option<String>,

    /// Workers per trial.
    #[arg(long = "workers", short = 'n')]
    pub workers: Option<u32>,

    /// Attempts per worker, including the first.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Enable exponential backoff with jitter between attempts.
    #[arg(long)]
    pub backoff: bool,

    /// Fixed simulated latency per store call (ms).
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Extra random latency per store call, up to this many ms.
    #[arg(long)]
    pub latency_jitter_ms: Option<u64>,

    /// Make every write for this worker index fail. Repeatable.
    #[arg(long = "fail-index", value_name = "INDEX")]
    pub fail_indices: Vec<u32>,

    /// Acknowledge but discard writes for this worker index. Repeatable.
    #[arg(long = "drop-index", value_name = "INDEX")]
    pub drop_indices: Vec<u32>,
}

impl StressOverrides {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut StressConfig) {
        if let Some(table) = &self.table {
            config.table_name = table.clone();
        }
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if self.backoff {
            config.backoff = Backoff::exponential(true);
        }
        if let Some(latency_ms) = self.latency_ms {
            config.memory.latency_ms = latency_ms;
        }
        if let Some(jitter) = self.latency_jitter_ms {
            config.memory.latency_jitter_ms = jitter;
        }
        config.faults.fail_indices.extend(self.fail_indices.iter().copied());
        config.faults.drop_indices.extend(self.drop_indices.iter().copied());
    }
}

/// Arguments for `stampede run`.
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Update protocol to exercise.
    #[arg(long, short = 'p')]
    pub protocol: Option<ProtocolKind>,

    /// Stop after this many clean trials.
    #[arg(long)]
    pub max_trials: Option<u64>,

    #[command(flatten)]
    pub overrides: StressOverrides,
}

impl RunArgs {
    /// Resolve the configuration layers for this invocation.
    pub fn resolve(&self, global: &GlobalOptions) -> Result<StressConfig> {
        let mut config = StressConfig::load(global.config.as_deref())?;
        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(max_trials) = self.max_trials {
            config.max_trials = Some(max_trials);
        }
        self.overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub async fn execute(&self, global: &GlobalOptions) -> Result<ExitCode> {
        let config = self.resolve(global)?;
        let store = build_store(&config).await;
        let settings = config.trial_settings();
        let trial_loop =
            TrialLoop::new(store, config.protocol.build(), settings.clone()).context("invalid trial settings")?;

        info!(
            protocol = %config.protocol,
            worker_count = settings.worker_count,
            max_attempts = settings.policy.max_attempts,
            max_trials = ?settings.max_trials,
            "starting trial loop"
        );
        let report = trial_loop.run(cancel_on_ctrl_c()).await.context("trial loop failed")?;

        let exit = match &report {
            TrialLoopReport::AnomalyFound(diagnostics) => {
                error!(
                    trial = diagnostics.summary.trial,
                    record_id = %diagnostics.summary.record_id,
                    "record does not match acknowledged appends"
                );
                ExitCode::FAILURE
            }
            TrialLoopReport::Cancelled { .. } | TrialLoopReport::TrialLimitReached { .. } => ExitCode::SUCCESS,
        };

        print_output(
            &RunOutput {
                protocol: config.protocol,
                settings,
                report,
            },
            global.is_json,
        );
        Ok(exit)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_overrides_apply_only_given_flags() {
        let mut config = StressConfig::default();
        StressOverrides {
            workers: Some(12),
            fail_indices: vec![1, 2],
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.worker_count, 12);
        assert_eq!(config.max_attempts, StressConfig::default().max_attempts);
        assert_eq!(config.faults.fail_indices, BTreeSet::from([1, 2]));
        assert_eq!(config.backoff, Backoff::None);
    }

    #[test]
    fn test_backoff_flag_enables_jitter() {
        let mut config = StressConfig::default();
        StressOverrides {
            backoff: true,
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.backoff, Backoff::exponential(true));
    }
}
