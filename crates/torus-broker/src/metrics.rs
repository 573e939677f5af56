//! Per-turn timing metrics.
//!
//! [`TurnMetrics`] captures where one turn's wall-clock time went, split
//! between waiting on workers and stitching their output.

/// Timing collected for a single completed turn.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnMetrics {
    /// The turn these metrics describe (1-based).
    pub turn: u64,
    /// Wall-clock time for the whole turn.
    pub total_us: u64,
    /// Time from dispatching the first call to receiving the last reply.
    pub dispatch_us: u64,
    /// Time spent stitching row blocks into the next grid.
    pub stitch_us: u64,
    /// Per-worker call time, indexed by partition ordinal.
    pub worker_us: Vec<u64>,
}

impl TurnMetrics {
    /// The slowest worker's call time, or 0 with no workers.
    pub fn slowest_worker_us(&self) -> u64 {
        self.worker_us.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = TurnMetrics::default();
        assert_eq!(m.turn, 0);
        assert_eq!(m.total_us, 0);
        assert!(m.worker_us.is_empty());
        assert_eq!(m.slowest_worker_us(), 0);
    }

    #[test]
    fn slowest_worker() {
        let m = TurnMetrics {
            turn: 3,
            total_us: 900,
            dispatch_us: 700,
            stitch_us: 50,
            worker_us: vec![120, 640, 300],
        };
        assert_eq!(m.slowest_worker_us(), 640);
    }
}
