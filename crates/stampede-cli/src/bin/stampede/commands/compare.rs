//! `stampede compare`: both protocols under the same load.

use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use stampede_core::ProtocolKind;
use stampede_core::TrialLoop;
use stampede_core::TrialLoopReport;
use stampede_core::TrialSummary;
use stampede_core::verified::percentile_ms;
use tracing::info;

use super::build_store;
use super::cancel_on_ctrl_c;
use super::run::StressOverrides;
use crate::cli::GlobalOptions;
use crate::config::StressConfig;
use crate::output::CompareOutput;
use crate::output::ProtocolComparison;
use crate::output::print_output;

/// Arguments for `stampede compare`.
#[derive(Args, Clone, Debug)]
pub struct CompareArgs {
    /// Trials per protocol.
    #[arg(long, default_value_t = 10)]
    pub trials: u64,

    #[command(flatten)]
    pub overrides: StressOverrides,
}

impl CompareArgs {
    pub async fn execute(&self, global: &GlobalOptions) -> Result<ExitCode> {
        let mut config = StressConfig::load(global.config.as_deref())?;
        self.overrides.apply(&mut config);
        config.max_trials = Some(self.trials);
        config.validate()?;

        let cancel = cancel_on_ctrl_c();
        let mut rows = Vec::with_capacity(ProtocolKind::ALL.len());
        for protocol in ProtocolKind::ALL {
            if cancel.is_cancelled() {
                break;
            }
            info!(%protocol, trials = self.trials, "comparing protocol");

            // Fresh store per protocol so neither sees the other's records.
            let store = build_store(&config).await;
            let trial_loop =
                TrialLoop::new(store, protocol.build(), config.trial_settings()).context("invalid trial settings")?;

            let mut summaries = Vec::new();
            let report = trial_loop
                .run_with_observer(cancel.clone(), |summary| summaries.push(summary.clone()))
                .await
                .with_context(|| format!("{protocol} trials failed"))?;
            rows.push(compare_row(protocol, &summaries, &report));
        }

        let anomalies = rows.iter().any(|row| row.first_anomaly.is_some());
        print_output(&CompareOutput { rows }, global.is_json);
        Ok(if anomalies { ExitCode::FAILURE } else { ExitCode::SUCCESS })
    }
}

fn compare_row(protocol: ProtocolKind, summaries: &[TrialSummary], report: &TrialLoopReport) -> ProtocolComparison {
    let workers: u64 = summaries.iter().map(|s| u64::from(s.successes) + u64::from(s.failures)).sum();
    let attempts: u64 = summaries.iter().map(|s| s.total_attempts).sum();

    let mut p50s: Vec<u64> = summaries.iter().map(|s| s.p50_elapsed_ms).collect();
    p50s.sort_unstable();

    ProtocolComparison {
        protocol,
        trials: summaries.len() as u64,
        failed_workers: summaries.iter().map(|s| u64::from(s.failures)).sum(),
        mean_attempts: if workers == 0 { 0.0 } else { attempts as f64 / workers as f64 },
        max_attempts_used: summaries.iter().map(|s| s.max_attempts_used).max().unwrap_or(0),
        median_p50_elapsed_ms: percentile_ms(&p50s, 50),
        max_elapsed_ms: summaries.iter().map(|s| s.max_elapsed_ms).max().unwrap_or(0),
        first_anomaly: match report {
            TrialLoopReport::AnomalyFound(diagnostics) => Some(diagnostics.summary.trial),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(trial: u64, successes: u32, failures: u32, total_attempts: u64, p50: u64) -> TrialSummary {
        TrialSummary {
            trial,
            record_id: format!("r{trial}"),
            protocol: ProtocolKind::Occ,
            successes,
            failures,
            total_attempts,
            max_attempts_used: 3,
            p50_elapsed_ms: p50,
            max_elapsed_ms: p50 * 2,
            consistent: failures == 0,
        }
    }

    #[test]
    fn test_compare_row_aggregates() {
        let summaries = vec![summary(1, 10, 0, 20, 4), summary(2, 9, 1, 30, 8)];
        let row = compare_row(ProtocolKind::Occ, &summaries, &TrialLoopReport::TrialLimitReached { trials: 2 });
        assert_eq!(row.trials, 2);
        assert_eq!(row.failed_workers, 1);
        assert!((row.mean_attempts - 2.5).abs() < f64::EPSILON);
        assert_eq!(row.max_elapsed_ms, 16);
        assert_eq!(row.median_p50_elapsed_ms, 4);
        assert_eq!(row.first_anomaly, None);
    }

    #[test]
    fn test_compare_row_empty() {
        let row = compare_row(ProtocolKind::Transaction, &[], &TrialLoopReport::Cancelled { trials: 0 });
        assert_eq!(row.trials, 0);
        assert_eq!(row.mean_attempts, 0.0);
    }
}
