//! Pure summary statistics over per-worker measurements.

/// Nearest-rank percentile of `sorted_ms`, which must be sorted ascending.
///
/// Returns 0 for an empty slice. `pct` is clamped to 100.
pub fn percentile_ms(sorted_ms: &[u64], pct: u32) -> u64 {
    if sorted_ms.is_empty() {
        return 0;
    }
    let pct = u64::from(pct.min(100));
    let len = sorted_ms.len() as u64;
    // ceil(pct * len / 100), at least rank 1.
    let rank = (pct.saturating_mul(len).saturating_add(99) / 100).max(1);
    let position = usize::try_from(rank - 1).unwrap_or(usize::MAX).min(sorted_ms.len() - 1);
    sorted_ms[position]
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile_ms(&[], 50), 0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(percentile_ms(&values, 50), 5);
        assert_eq!(percentile_ms(&values, 90), 9);
        assert_eq!(percentile_ms(&values, 100), 10);
        assert_eq!(percentile_ms(&values, 0), 1);
        assert_eq!(percentile_ms(&values, 250), 10);
    }

    #[test]
    fn test_percentile_single() {
        assert_eq!(percentile_ms(&[42], 50), 42);
    }

    proptest! {
        #[test]
        fn prop_percentile_is_member(mut values in prop::collection::vec(0u64..10_000, 1..100), pct in 0u32..=100) {
            values.sort_unstable();
            let p = percentile_ms(&values, pct);
            prop_assert!(values.contains(&p));
        }
    }
}
