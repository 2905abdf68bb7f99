//! Wraparound-safe arithmetic over the 24-bit pulse timestamp counter.
//!
//! The capture counter wraps every `2^24` ticks (~0.7 s at 24 MHz), so raw
//! subtraction of two captured timestamps is meaningless near the wrap point.
//! Every elapsed-time computation in the decoder goes through [`ts_diff`].

use crate::consts::TIMESTAMP_MAX;

/// Ticks elapsed from `y` to `x`, wrapping forward.
///
/// Always in `[0, 2^24)`; `ts_diff(x, x) == 0`.
#[inline]
pub const fn ts_diff(x: u32, y: u32) -> u32 {
    x.wrapping_sub(y) & TIMESTAMP_MAX
}

/// Advance a timestamp by `ticks`, wrapping at the counter width.
#[inline]
pub const fn ts_add(x: u32, ticks: u32) -> u32 {
    x.wrapping_add(ticks) & TIMESTAMP_MAX
}

/// True if `ts` lies within `tolerance` ticks of `center`, in either
/// direction, on the cyclic counter.
#[inline]
pub const fn ts_in_window(ts: u32, center: u32, tolerance: u32) -> bool {
    ts_diff(ts, center) <= tolerance || ts_diff(center, ts) <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TIMESTAMP_MAX;

    #[test]
    fn diff_of_equal_timestamps_is_zero() {
        assert_eq!(ts_diff(0, 0), 0);
        assert_eq!(ts_diff(123_456, 123_456), 0);
        assert_eq!(ts_diff(TIMESTAMP_MAX, TIMESTAMP_MAX), 0);
    }

    #[test]
    fn diff_wraps_forward() {
        // One tick after the counter wrapped.
        assert_eq!(ts_diff(0, TIMESTAMP_MAX), 1);
        assert_eq!(ts_diff(5, TIMESTAMP_MAX - 5), 11);
    }

    #[test]
    fn diff_is_always_in_counter_range() {
        let samples = [0u32, 1, 77, 0x00FF_FFFF, 0x0080_0000, 0xFFFF_FFFF];
        for &x in &samples {
            for &y in &samples {
                assert!(ts_diff(x, y) <= TIMESTAMP_MAX);
            }
        }
    }

    #[test]
    fn add_then_diff_round_trips() {
        let base = TIMESTAMP_MAX - 100;
        let later = ts_add(base, 400_000);
        assert_eq!(ts_diff(later, base), 400_000);
    }

    #[test]
    fn window_membership_covers_both_sides() {
        assert!(ts_in_window(1000, 1000, 0));
        assert!(ts_in_window(1010, 1000, 10));
        assert!(ts_in_window(990, 1000, 10));
        assert!(!ts_in_window(1011, 1000, 10));
        // Across the wrap point.
        assert!(ts_in_window(2, TIMESTAMP_MAX - 2, 5));
    }
}
