//! Stereo time alignment and IMU coverage checks.
//!
//! Pure functions, no locking.

/// Outcome of comparing the two candidate frame timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignDecision {
    /// Within tolerance: dispatch this pair
    UseBoth,
    /// Left is ahead; the right frame is stale and should be discarded
    DropRight,
    /// Right is ahead; the left frame is stale and should be discarded
    DropLeft,
    /// Out of tolerance but the stale side has nothing newer buffered
    WaitMore,
}

/// Compare candidate timestamps against the stereo tolerance.
///
/// Returns `UseBoth` iff `|left_ts - right_ts| <= tol`, otherwise the drop
/// decision naming the earlier-timestamped side. A non-finite gap cannot be
/// ordered and yields `WaitMore`; drops are further refined by [`settle`].
#[inline]
pub fn select_aligned_pair(left_ts: f64, right_ts: f64, tol: f64) -> AlignDecision {
    let gap = left_ts - right_ts;
    if !gap.is_finite() {
        AlignDecision::WaitMore
    } else if gap.abs() <= tol {
        AlignDecision::UseBoth
    } else if gap > 0.0 {
        AlignDecision::DropRight
    } else {
        AlignDecision::DropLeft
    }
}

/// Turn a drop decision into `WaitMore` when the stale side cannot reveal
/// a newer item.
///
/// `left_depth` / `right_depth` are the number of items buffered per side;
/// dropping only helps when more than one is buffered.
#[inline]
pub fn settle(decision: AlignDecision, left_depth: usize, right_depth: usize) -> AlignDecision {
    match decision {
        AlignDecision::DropRight if right_depth <= 1 => AlignDecision::WaitMore,
        AlignDecision::DropLeft if left_depth <= 1 => AlignDecision::WaitMore,
        other => other,
    }
}

/// Whether the IMU stream reaches the frame time
#[inline]
pub fn imu_covers(frame_ts: f64, imu_back_ts: f64) -> bool {
    imu_back_ts >= frame_ts
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 0.01;

    #[test]
    fn test_equal_timestamps_use_both() {
        assert_eq!(select_aligned_pair(1.0, 1.0, TOL), AlignDecision::UseBoth);
        assert_eq!(select_aligned_pair(0.0, 0.0, 0.0), AlignDecision::UseBoth);
    }

    #[test]
    fn test_within_tolerance_use_both() {
        assert_eq!(select_aligned_pair(1.000, 1.002, TOL), AlignDecision::UseBoth);
        assert_eq!(select_aligned_pair(1.006, 1.000, TOL), AlignDecision::UseBoth);
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        assert_eq!(select_aligned_pair(1.5, 1.0, 0.5), AlignDecision::UseBoth);
        assert_eq!(select_aligned_pair(1.0, 1.5, 0.5), AlignDecision::UseBoth);
    }

    #[test]
    fn test_left_ahead_drops_right() {
        assert_eq!(select_aligned_pair(2.05, 2.0, TOL), AlignDecision::DropRight);
    }

    #[test]
    fn test_right_ahead_drops_left() {
        assert_eq!(select_aligned_pair(2.0, 2.05, TOL), AlignDecision::DropLeft);
    }

    #[test]
    fn test_decision_is_symmetric() {
        let pairs = [(0.0, 0.3), (1.0, 1.011), (5.0, 4.2), (3.0, 3.0)];
        for (a, b) in pairs {
            let forward = select_aligned_pair(a, b, TOL);
            let mirrored = select_aligned_pair(b, a, TOL);
            let expected = match forward {
                AlignDecision::DropLeft => AlignDecision::DropRight,
                AlignDecision::DropRight => AlignDecision::DropLeft,
                other => other,
            };
            assert_eq!(mirrored, expected, "pair ({a}, {b})");
        }
    }

    #[test]
    fn test_non_finite_gap_waits() {
        assert_eq!(select_aligned_pair(1.0, f64::NAN, TOL), AlignDecision::WaitMore);
        assert_eq!(select_aligned_pair(f64::NAN, 1.0, TOL), AlignDecision::WaitMore);
        assert_eq!(
            select_aligned_pair(f64::INFINITY, f64::INFINITY, TOL),
            AlignDecision::WaitMore
        );
        assert_eq!(select_aligned_pair(1.0, f64::INFINITY, TOL), AlignDecision::WaitMore);
    }

    #[test]
    fn test_settle_single_deep_waits() {
        assert_eq!(settle(AlignDecision::DropRight, 1, 1), AlignDecision::WaitMore);
        assert_eq!(settle(AlignDecision::DropLeft, 1, 1), AlignDecision::WaitMore);
        assert_eq!(settle(AlignDecision::UseBoth, 1, 1), AlignDecision::UseBoth);
    }

    #[test]
    fn test_settle_keeps_drop_with_successor() {
        assert_eq!(settle(AlignDecision::DropRight, 1, 2), AlignDecision::DropRight);
        assert_eq!(settle(AlignDecision::DropLeft, 3, 1), AlignDecision::DropLeft);
        // Only the stale side's depth matters
        assert_eq!(settle(AlignDecision::DropRight, 5, 1), AlignDecision::WaitMore);
    }

    #[test]
    fn test_imu_coverage() {
        assert!(imu_covers(1.0, 1.0));
        assert!(imu_covers(1.0, 1.2));
        assert!(!imu_covers(1.0, 0.9));
    }
}
