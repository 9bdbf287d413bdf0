use crate::error::InitializerError;
use serde::{Deserialize, Serialize};

/// Weights of the attempt quality score.
///
/// See [`crate::ledger::quality_score`] for the formula.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Weight of the triangulated fraction of matches.
    pub triangulated: f64,
    /// Weight of the saturated parallax term.
    pub parallax: f64,
    /// Weight of the inlier fraction of matches.
    pub inlier_ratio: f64,
    /// Parallax (degrees) at which the parallax term saturates to 1.
    pub parallax_saturation_deg: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            triangulated: 1.0,
            parallax: 1.0,
            inlier_ratio: 1.0,
            parallax_saturation_deg: 5.0,
        }
    }
}

/// Configuration for the two-view initializer.
///
/// Fixed at construction, never mutated by an initialization call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitializerConfig {
    /// Standard deviation of the keypoint noise, in pixels.
    pub sigma: f64,
    /// Number of RANSAC iterations for each model.
    pub max_iterations: usize,
    /// Prefer the homography when `SH / (SH + SF)` exceeds this ratio.
    pub hf_threshold: f64,
    /// Minimum median parallax of the reconstruction, in degrees.
    pub min_parallax_deg: f64,
    /// Minimum number of well triangulated points.
    pub min_triangulated: usize,
    /// The runner-up pose must have fewer good points than this fraction of the winner's.
    pub dominance_ratio: f64,
    /// Plane fit ratio `σ3 / σ2` under which a point cloud is planar.
    pub planarity_threshold: f64,
    /// Weights of the attempt quality score.
    pub quality: QualityWeights,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            max_iterations: 200,
            hf_threshold: 0.45,
            min_parallax_deg: 1.0,
            min_triangulated: 50,
            dominance_ratio: 0.75,
            planarity_threshold: 0.02,
            quality: QualityWeights::default(),
            random_seed: Some(0),
        }
    }
}

impl InitializerConfig {
    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<(), InitializerError> {
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(InitializerError::InvalidConfig(format!(
                "sigma must be positive and finite, got {}",
                self.sigma
            )));
        }
        if self.max_iterations == 0 {
            return Err(InitializerError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        if !(self.hf_threshold > 0.0 && self.hf_threshold < 1.0) {
            return Err(InitializerError::InvalidConfig(format!(
                "hf_threshold must be in (0, 1), got {}",
                self.hf_threshold
            )));
        }
        if !(self.min_parallax_deg >= 0.0 && self.min_parallax_deg < 90.0) {
            return Err(InitializerError::InvalidConfig(format!(
                "min_parallax_deg must be in [0, 90), got {}",
                self.min_parallax_deg
            )));
        }
        if !(self.dominance_ratio > 0.0 && self.dominance_ratio <= 1.0) {
            return Err(InitializerError::InvalidConfig(format!(
                "dominance_ratio must be in (0, 1], got {}",
                self.dominance_ratio
            )));
        }
        if !(self.planarity_threshold >= 0.0 && self.planarity_threshold.is_finite()) {
            return Err(InitializerError::InvalidConfig(format!(
                "planarity_threshold must be non-negative, got {}",
                self.planarity_threshold
            )));
        }
        if self.quality.parallax_saturation_deg.is_nan()
            || self.quality.parallax_saturation_deg <= 0.0
        {
            return Err(InitializerError::InvalidConfig(
                "quality.parallax_saturation_deg must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Variance of the keypoint noise.
    #[inline]
    pub fn sigma2(&self) -> f64 {
        self.sigma * self.sigma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = InitializerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hf_threshold, 0.45);
        assert_eq!(config.min_triangulated, 50);
        assert_eq!(config.dominance_ratio, 0.75);
    }

    #[test]
    fn test_invalid_config() {
        let config = InitializerConfig {
            sigma: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(InitializerError::InvalidConfig(_))
        ));

        let config = InitializerConfig {
            hf_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = InitializerConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = InitializerConfig {
            dominance_ratio: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
