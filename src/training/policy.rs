//! Checkpoint save policies.

use crate::config::SavePolicy;

/// Tracks the best value of the policy's criterion across epochs.
#[derive(Debug, Clone)]
pub struct BestTracker {
    policy: SavePolicy,
    best: Option<f64>,
}

impl BestTracker {
    /// New tracker for the given policy.
    pub fn new(policy: SavePolicy) -> Self {
        Self { policy, best: None }
    }

    /// Observe one epoch's criterion value; returns whether to save now.
    ///
    /// Losses save on ties or improvements (lower), swap rates on ties or
    /// improvements (higher). Non-finite values never count as a new best.
    /// `Last` never saves through the tracker.
    pub fn observe(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let improved = match (self.policy, self.best) {
            (SavePolicy::Last, _) => false,
            (_, None) => true,
            (SavePolicy::BestLoss, Some(best)) => value <= best,
            (SavePolicy::BestSwapRate, Some(best)) => value >= best,
        };
        if improved {
            self.best = Some(value);
        }
        improved
    }

    /// The best value observed so far.
    pub fn best(&self) -> Option<f64> {
        self.best
    }
}
