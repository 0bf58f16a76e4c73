//! Pure record arithmetic.

/// Version written by a successful versioned append.
///
/// Returns `None` if the counter is exhausted.
#[inline]
pub fn next_version(current: u64) -> Option<u64> {
    current.checked_add(1)
}

/// List slot for an append to a list of `current_len` elements.
///
/// Writing at the current length appends. Any slot past the end would also
/// append, so the stored value set does not depend on this choice.
#[inline]
pub fn next_list_position(current_len: usize) -> u32 {
    u32::try_from(current_len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_version() {
        assert_eq!(next_version(0), Some(1));
        assert_eq!(next_version(41), Some(42));
        assert_eq!(next_version(u64::MAX), None);
    }

    #[test]
    fn test_next_list_position() {
        assert_eq!(next_list_position(0), 0);
        assert_eq!(next_list_position(7), 7);
        assert_eq!(next_list_position(usize::MAX), u32::MAX);
    }
}
