use std::sync::{PoisonError, RwLock};

use glam::{DMat3, DVec3};

use crate::config::QualityWeights;
use crate::error::InitializerError;
use crate::selection::ModelKind;

/// A successful initialization, as stored in the [`AttemptLedger`].
#[derive(Clone, Debug, PartialEq)]
pub struct InitAttempt {
    /// Relative rotation from the reference to the current camera.
    pub rotation: DMat3,
    /// Relative translation (unit norm) from the reference to the current camera.
    pub translation: DVec3,
    /// Triangulated points, indexed by reference keypoint.
    pub points: Vec<DVec3>,
    /// Whether each reference keypoint was triangulated.
    pub triangulated: Vec<bool>,
    /// Quality score (higher is better).
    pub score: f64,
    /// Median parallax, in degrees.
    pub parallax_deg: f64,
    /// Number of flagged points in `triangulated`.
    pub num_triangulated: usize,
    /// Model the motion was recovered from.
    pub model: ModelKind,
}

impl InitAttempt {
    /// Whether the attempt was recovered from a homography.
    pub fn is_homography(&self) -> bool {
        self.model == ModelKind::Homography
    }
}

/// Quality score of an initialization.
///
/// ```text
/// score = w.triangulated * num_triangulated / num_matches
///       + w.parallax     * min(parallax_deg / w.parallax_saturation_deg, 1)
///       + w.inlier_ratio * num_inliers / num_matches
/// ```
///
/// Returns 0 when there is no match.
pub fn quality_score(
    weights: &QualityWeights,
    num_triangulated: usize,
    num_inliers: usize,
    num_matches: usize,
    parallax_deg: f64,
) -> f64 {
    if num_matches == 0 {
        return 0.0;
    }
    let n = num_matches as f64;
    let parallax = (parallax_deg / weights.parallax_saturation_deg).clamp(0.0, 1.0);

    weights.triangulated * (num_triangulated as f64 / n)
        + weights.parallax * parallax
        + weights.inlier_ratio * (num_inliers as f64 / n)
}

/// Append-only record of the initialization attempts of an initializer.
///
/// Appends and reads may happen from several threads; a read observes every
/// append completed before it.
#[derive(Debug, Default)]
pub struct AttemptLedger {
    attempts: RwLock<Vec<InitAttempt>>,
}

impl AttemptLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an attempt. Never fails.
    pub fn save_attempt(&self, attempt: InitAttempt) {
        let mut attempts = self.attempts.write().unwrap_or_else(PoisonError::into_inner);
        attempts.push(attempt);
    }

    /// The attempt with the highest score; the earliest one on ties.
    pub fn best(&self) -> Result<InitAttempt, InitializerError> {
        let attempts = self.attempts.read().unwrap_or_else(PoisonError::into_inner);
        attempts
            .iter()
            .fold(None::<&InitAttempt>, |best, a| match best {
                Some(b) if b.score >= a.score => Some(b),
                _ => Some(a),
            })
            .cloned()
            .ok_or(InitializerError::NoAttempts)
    }

    /// Copy of every stored attempt, in insertion order.
    pub fn snapshot(&self) -> Vec<InitAttempt> {
        self.attempts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of stored attempts.
    pub fn len(&self) -> usize {
        self.attempts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no attempt has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn attempt(score: f64) -> InitAttempt {
        InitAttempt {
            rotation: DMat3::IDENTITY,
            translation: DVec3::X,
            points: vec![DVec3::new(0.0, 0.0, score)],
            triangulated: vec![true],
            score,
            parallax_deg: 2.0,
            num_triangulated: 1,
            model: ModelKind::Fundamental,
        }
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = AttemptLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.best(), Err(InitializerError::NoAttempts));
    }

    #[test]
    fn test_best_regardless_of_order() -> Result<(), InitializerError> {
        for order in [[10.0, 30.0, 20.0], [30.0, 20.0, 10.0], [20.0, 10.0, 30.0]] {
            let ledger = AttemptLedger::new();
            for score in order {
                ledger.save_attempt(attempt(score));
            }
            assert_eq!(ledger.len(), 3);
            let best = ledger.best()?;
            assert_eq!(best.score, 30.0);
            assert_eq!(best.points[0].z, 30.0);
        }
        Ok(())
    }

    #[test]
    fn test_ties_keep_earliest() -> Result<(), InitializerError> {
        let ledger = AttemptLedger::new();
        let mut first = attempt(5.0);
        first.num_triangulated = 7;
        ledger.save_attempt(first);
        ledger.save_attempt(attempt(5.0));
        assert_eq!(ledger.best()?.num_triangulated, 7);
        Ok(())
    }

    #[test]
    fn test_concurrent_appends() -> Result<(), InitializerError> {
        let ledger = Arc::new(AttemptLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        ledger.save_attempt(attempt((i * 10 + j) as f64));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("writer thread panicked");
        }
        assert_eq!(ledger.len(), 80);
        assert_eq!(ledger.best()?.score, 79.0);
        Ok(())
    }

    #[test]
    fn test_quality_score() {
        let w = QualityWeights::default();
        // 80/100 triangulated, 90/100 inliers, parallax saturated
        assert_relative_eq!(quality_score(&w, 80, 90, 100, 10.0), 0.8 + 1.0 + 0.9);
        // half saturated parallax
        assert_relative_eq!(quality_score(&w, 50, 50, 100, 2.5), 0.5 + 0.5 + 0.5);
        assert_eq!(quality_score(&w, 0, 0, 0, 3.0), 0.0);

        // more triangulated points rank higher, all else equal
        assert!(quality_score(&w, 90, 90, 100, 3.0) > quality_score(&w, 60, 90, 100, 3.0));
    }
}
