//! Pure comparison of the durable record against what workers reported.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Differences between the expected index set, the durable indices and the
/// worker reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Expected indices absent from the record, excluding workers that
    /// reported failure.
    pub missing_indices: BTreeSet<u32>,
    /// Indices stored more than once.
    pub duplicate_indices: BTreeSet<u32>,
    /// Stored indices outside `0..worker_count`.
    pub unexpected_indices: BTreeSet<u32>,
    /// Stored indices whose worker reported failure.
    pub phantom_indices: BTreeSet<u32>,
    /// Indices whose worker reported success but which are absent.
    pub lost_indices: BTreeSet<u32>,
    /// Number of entries in the stored collection, duplicates included.
    pub durable_count: u64,
    /// Workers that reported success.
    pub reported_successes: u32,
}

impl Reconciliation {
    /// True when every index not reported as failed is stored.
    pub fn is_complete(&self) -> bool {
        self.missing_indices.is_empty()
    }
}

/// Reconcile `durable` (as stored) against `reports` of `(index, succeeded)`
/// for a trial of `worker_count` workers.
///
/// The expected set is every index in `0..worker_count` minus the indices
/// whose worker reported failure. A worker without a report stays expected.
pub fn reconcile(
    worker_count: u32,
    durable: &[u32],
    reports: impl IntoIterator<Item = (u32, bool)>,
) -> Reconciliation {
    let mut occurrences: BTreeMap<u32, u32> = BTreeMap::new();
    for index in durable {
        let count = occurrences.entry(*index).or_insert(0);
        *count = count.saturating_add(1);
    }
    let reports: Vec<(u32, bool)> = reports.into_iter().collect();
    let failed: BTreeSet<u32> =
        reports.iter().filter(|(_, succeeded)| !*succeeded).map(|(index, _)| *index).collect();

    let missing_indices = (0..worker_count)
        .filter(|index| !failed.contains(index) && !occurrences.contains_key(index))
        .collect();
    let duplicate_indices = occurrences.iter().filter(|(_, count)| **count > 1).map(|(index, _)| *index).collect();
    let unexpected_indices = occurrences.keys().filter(|index| **index >= worker_count).copied().collect();

    let mut phantom_indices = BTreeSet::new();
    let mut lost_indices = BTreeSet::new();
    let mut reported_successes = 0u32;
    for (index, succeeded) in reports {
        let stored = occurrences.contains_key(&index);
        if succeeded {
            reported_successes = reported_successes.saturating_add(1);
            if !stored {
                lost_indices.insert(index);
            }
        } else if stored {
            phantom_indices.insert(index);
        }
    }

    Reconciliation {
        missing_indices,
        duplicate_indices,
        unexpected_indices,
        phantom_indices,
        lost_indices,
        durable_count: durable.len() as u64,
        reported_successes,
    }
}
