//! Countdown arithmetic for the server-issued check deadline.

use chrono::{DateTime, Utc};

/// Whole seconds from `now` until `deadline`, clamped at zero.
///
/// The countdown is a pure function of the deadline and the wall clock. It is
/// recomputed on every tick rather than decremented, so delayed or coalesced
/// ticks never accumulate drift. Sub-second remainders truncate toward zero;
/// a deadline in the past, or no deadline at all, reads as zero.
#[must_use]
pub fn remaining_seconds(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    deadline.map_or(0, |deadline| {
        let seconds = deadline.signed_duration_since(now).num_seconds();
        u64::try_from(seconds).unwrap_or(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_deadline_reads_zero() {
        assert_eq!(remaining_seconds(None, base()), 0);
    }

    #[test]
    fn past_deadline_clamps_to_zero() {
        let deadline = base() - Duration::seconds(90);
        assert_eq!(remaining_seconds(Some(deadline), base()), 0);
    }

    #[test]
    fn future_deadline_counts_whole_seconds() {
        let deadline = base() + Duration::seconds(3600);
        assert_eq!(remaining_seconds(Some(deadline), base()), 3600);
    }

    #[test]
    fn sub_second_remainders_truncate() {
        let deadline = base() + Duration::milliseconds(10_900);
        assert_eq!(remaining_seconds(Some(deadline), base()), 10);

        let nearly_there = base() + Duration::milliseconds(800);
        assert_eq!(remaining_seconds(Some(nearly_there), base()), 0);
    }

    #[test]
    fn recompute_heals_after_a_clock_jump() {
        let deadline = base() + Duration::seconds(120);
        let jumped_forward = base() + Duration::seconds(100);
        assert_eq!(remaining_seconds(Some(deadline), jumped_forward), 20);

        let jumped_past = base() + Duration::seconds(500);
        assert_eq!(remaining_seconds(Some(deadline), jumped_past), 0);
    }
}
