//! Feedback/termination (C10): progress reporting cadence and the
//! stopping-criterion check, emitted through `tracing` rather than
//! bare `print!` so the verbosity level gates structured events.

use tracing::{debug, info, warn};

use crate::evidence::EvidenceAccumulator;

/// Feedback verbosity, keyed off `Config::feedback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FeedbackLevel(pub u8);

impl FeedbackLevel {
    pub fn reports_promotions(&self) -> bool {
        self.0 >= 1
    }

    pub fn reports_detail(&self) -> bool {
        self.0 >= 2
    }
}

/// Emits the `ndead`, `mean_likelihood_calls`, `logZ +/- sigma` summary
/// every `nlive` promotions, at feedback level >= 1.
pub fn report_progress(level: FeedbackLevel, ndead: u64, mean_likelihood_calls: f64, evidence: &EvidenceAccumulator) {
    if !level.reports_promotions() {
        return;
    }
    info!(
        ndead,
        mean_likelihood_calls,
        log_z = evidence.log_z,
        log_z_sigma = evidence.log_z_error(),
        "nested sampling progress"
    );
}

pub fn report_dispatch_detail(level: FeedbackLevel, worker: usize, l_bound: f64) {
    if !level.reports_detail() {
        return;
    }
    debug!(worker, l_bound, "dispatched seed");
}

/// A stall (no valid seed could be generated this iteration) is
/// reported once per `ndead` value to avoid flooding logs while the
/// scheduler retries every iteration (`StallWarning`).
#[derive(Default)]
pub struct StallTracker {
    last_warned_ndead: Option<u64>,
}

impl StallTracker {
    pub fn note_stall(&mut self, ndead: u64) {
        if self.last_warned_ndead != Some(ndead) {
            warn!(ndead, "no valid seed available this iteration; nprocs may be too large for nlive");
            self.last_warned_ndead = Some(ndead);
        }
    }

    pub fn reset(&mut self) {
        self.last_warned_ndead = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_level_gating() {
        assert!(!FeedbackLevel(0).reports_promotions());
        assert!(FeedbackLevel(1).reports_promotions());
        assert!(!FeedbackLevel(1).reports_detail());
        assert!(FeedbackLevel(2).reports_detail());
    }

    #[test]
    fn stall_tracker_warns_once_per_ndead() {
        let mut tracker = StallTracker::default();
        tracker.note_stall(5);
        assert_eq!(tracker.last_warned_ndead, Some(5));
        tracker.note_stall(5);
        assert_eq!(tracker.last_warned_ndead, Some(5));
        tracker.note_stall(6);
        assert_eq!(tracker.last_warned_ndead, Some(6));
    }
}
