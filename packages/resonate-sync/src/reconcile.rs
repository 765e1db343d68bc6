//! Playback-position drift detection and correction.
//!
//! Applies only to the follower side of a session: a host never reconciles
//! against itself. Small discrepancies are tolerated, network and clock
//! jitter would otherwise cause constant micro-seeking and audible stutter;
//! only drift beyond the threshold forcibly disrupts local playback.

use crate::playback::PlaybackEngine;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftOutcome {
    /// Drift within tolerance; local playback left untouched.
    InTolerance {
        /// Measured drift in percentage points.
        drift: f32,
    },
    /// Drift exceeded the threshold; playback was hard-seeked to the remote
    /// position.
    Corrected {
        /// Measured drift in percentage points.
        drift: f32,
    },
}

impl DriftOutcome {
    /// True when the pass forced a seek.
    #[must_use]
    pub fn corrected(&self) -> bool {
        matches!(self, Self::Corrected { .. })
    }
}

/// Compares the engine's position against `remote_position` (percent of
/// duration) and hard-seeks when the drift exceeds `threshold` percentage
/// points.
///
/// The seek is issued in percent, so each peer lands at the equivalent point
/// of its own decoded track length.
pub fn reconcile_position(
    engine: &dyn PlaybackEngine,
    remote_position: f32,
    threshold: f32,
) -> DriftOutcome {
    let local = local_position_percent(engine);
    let drift = (local - remote_position).abs();
    if drift > threshold {
        log::debug!(
            "[Reconcile] drift {:.1}pp exceeds {:.1}pp, seeking to {:.1}%",
            drift,
            threshold,
            remote_position
        );
        engine.seek(remote_position);
        DriftOutcome::Corrected { drift }
    } else {
        DriftOutcome::InTolerance { drift }
    }
}

/// The engine's position as percent of duration; 0 when nothing is loaded.
fn local_position_percent(engine: &dyn PlaybackEngine) -> f32 {
    let duration = engine.duration();
    if duration <= 0.0 {
        return 0.0;
    }
    (engine.current_position() / duration * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EngineCall, FakeEngine};

    #[test]
    fn drift_beyond_threshold_hard_seeks() {
        let engine = FakeEngine::at_position_percent(40.0);
        let outcome = reconcile_position(engine.as_ref(), 47.0, 5.0);

        assert_eq!(outcome, DriftOutcome::Corrected { drift: 7.0 });
        assert_eq!(engine.take_calls(), vec![EngineCall::Seek(47.0)]);
    }

    #[test]
    fn drift_within_threshold_is_left_alone() {
        let engine = FakeEngine::at_position_percent(40.0);
        let outcome = reconcile_position(engine.as_ref(), 43.0, 5.0);

        assert_eq!(outcome, DriftOutcome::InTolerance { drift: 3.0 });
        assert!(engine.take_calls().is_empty());
    }

    #[test]
    fn drift_exactly_at_threshold_is_tolerated() {
        let engine = FakeEngine::at_position_percent(40.0);
        let outcome = reconcile_position(engine.as_ref(), 45.0, 5.0);

        assert!(!outcome.corrected());
        assert!(engine.take_calls().is_empty());
    }

    #[test]
    fn unloaded_engine_counts_as_position_zero() {
        let engine = FakeEngine::unloaded();
        let outcome = reconcile_position(engine.as_ref(), 50.0, 5.0);

        assert!(outcome.corrected());
        assert_eq!(engine.take_calls(), vec![EngineCall::Seek(50.0)]);
    }
}
