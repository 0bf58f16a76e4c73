//! Output formatting for command results.
//!
//! Every result prints either human-readable text or JSON.

use std::collections::BTreeSet;
use std::fmt::Write;

use serde::Serialize;
use stampede_core::ProtocolKind;
use stampede_core::TrialDiagnostics;
use stampede_core::TrialLoopReport;
use stampede_core::TrialSettings;

/// Trait for types that can be output in multiple formats.
pub trait Outputable {
    /// Convert to JSON value for structured output.
    fn to_json(&self) -> serde_json::Value;

    /// Convert to human-readable string.
    fn to_human(&self) -> String;
}

/// Print a value in the appropriate format.
pub fn print_output<T: Outputable>(value: &T, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&value.to_json())
                .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize: {}\"}}", e))
        );
    } else {
        println!("{}", value.to_human());
    }
}

fn to_json_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| serde_json::json!({ "error": format!("failed to serialize: {e}") }))
}

fn format_indices(indices: &BTreeSet<u32>) -> String {
    if indices.is_empty() {
        return "none".to_string();
    }
    indices.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}

/// Result of `stampede run`.
#[derive(Serialize)]
pub struct RunOutput {
    pub protocol: ProtocolKind,
    pub settings: TrialSettings,
    pub report: TrialLoopReport,
}

impl Outputable for RunOutput {
    fn to_json(&self) -> serde_json::Value {
        to_json_value(self)
    }

    fn to_human(&self) -> String {
        let header = format!(
            "Protocol: {}  Workers: {}  Max attempts: {}",
            self.protocol, self.settings.worker_count, self.settings.policy.max_attempts
        );
        match &self.report {
            TrialLoopReport::Cancelled { trials } => {
                format!("{header}\nInterrupted after {trials} clean trial(s).")
            }
            TrialLoopReport::TrialLimitReached { trials } => {
                format!("{header}\nNo anomaly in {trials} trial(s).")
            }
            TrialLoopReport::AnomalyFound(diagnostics) => format!("{header}\n{}", describe_anomaly(diagnostics)),
        }
    }
}

fn describe_anomaly(diagnostics: &TrialDiagnostics) -> String {
    let summary = &diagnostics.summary;
    let result = &diagnostics.verification;
    let final_version = result.final_version.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string());

    let mut out = format!(
        "Anomaly in trial {}\n\
         ==================\n\
         Record:             {}\n\
         Reported successes: {}\n\
         Durable entries:    {}\n\
         Final version:      {}\n\
         Missing:            {}\n\
         Lost (acked):       {}\n\
         Duplicates:         {}\n\
         Unexpected:         {}\n\
         Phantom:            {}",
        summary.trial,
        summary.record_id,
        result.reported_successes,
        result.durable_count,
        final_version,
        format_indices(&result.missing_indices),
        format_indices(&result.lost_indices),
        format_indices(&result.duplicate_indices),
        format_indices(&result.unexpected_indices),
        format_indices(&result.phantom_indices),
    );

    let failures: Vec<_> = diagnostics.run.outcomes.iter().filter(|outcome| !outcome.succeeded).collect();
    if !failures.is_empty() {
        out.push_str("\n\nFailed workers:");
        for outcome in failures {
            let _ = write!(
                out,
                "\n  [{}] {}",
                outcome.index,
                outcome.error_detail.as_deref().unwrap_or("unknown error")
            );
        }
    }
    out
}

/// One protocol's aggregate over a comparison run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProtocolComparison {
    pub protocol: ProtocolKind,
    pub trials: u64,
    pub failed_workers: u64,
    pub mean_attempts: f64,
    pub max_attempts_used: u32,
    pub median_p50_elapsed_ms: u64,
    pub max_elapsed_ms: u64,
    /// Trial number of the first anomaly, if any.
    pub first_anomaly: Option<u64>,
}

/// Result of `stampede compare`.
pub struct CompareOutput {
    pub rows: Vec<ProtocolComparison>,
}

impl Outputable for CompareOutput {
    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "protocols": to_json_value(&self.rows) })
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "{:<12} {:>7} {:>7} {:>10} {:>9} {:>9} {:>9} {:>8}",
            "PROTOCOL", "TRIALS", "FAILED", "ATTEMPTS", "MAX ATT", "P50 MS", "MAX MS", "ANOMALY"
        );
        for row in &self.rows {
            let anomaly = row.first_anomaly.map(|t| format!("#{t}")).unwrap_or_else(|| "-".to_string());
            let _ = write!(
                out,
                "\n{:<12} {:>7} {:>7} {:>10.2} {:>9} {:>9} {:>9} {:>8}",
                row.protocol.to_string(),
                row.trials,
                row.failed_workers,
                row.mean_attempts,
                row.max_attempts_used,
                row.median_p50_elapsed_ms,
                row.max_elapsed_ms,
                anomaly
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(protocol: ProtocolKind, first_anomaly: Option<u64>) -> ProtocolComparison {
        ProtocolComparison {
            protocol,
            trials: 5,
            failed_workers: 0,
            mean_attempts: 1.5,
            max_attempts_used: 4,
            median_p50_elapsed_ms: 2,
            max_elapsed_ms: 9,
            first_anomaly,
        }
    }

    #[test]
    fn test_format_indices() {
        assert_eq!(format_indices(&BTreeSet::new()), "none");
        assert_eq!(format_indices(&BTreeSet::from([3, 1])), "1, 3");
    }

    #[test]
    fn test_run_output_limit_reached() {
        let output = RunOutput {
            protocol: ProtocolKind::Occ,
            settings: TrialSettings::default(),
            report: TrialLoopReport::TrialLimitReached { trials: 4 },
        };
        assert!(output.to_human().contains("No anomaly in 4 trial(s)"));
        let json = output.to_json();
        assert_eq!(json["protocol"], "occ");
        assert_eq!(json["report"]["status"], "trial_limit_reached");
        assert_eq!(json["report"]["trials"], 4);
    }

    #[test]
    fn test_compare_output() {
        let output = CompareOutput {
            rows: vec![row(ProtocolKind::Occ, None), row(ProtocolKind::Transaction, Some(2))],
        };
        let human = output.to_human();
        assert!(human.contains("occ"));
        assert!(human.contains("transaction"));
        assert!(human.contains("#2"));

        let json = output.to_json();
        assert_eq!(json["protocols"][1]["first_anomaly"], 2);
        assert_eq!(json["protocols"][0]["protocol"], "occ");
    }
}
