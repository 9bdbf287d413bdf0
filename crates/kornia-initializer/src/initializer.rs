use glam::{DMat3, DVec2, DVec3};
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::InitializerConfig;
use crate::correspondence::build_correspondences;
use crate::error::InitializerError;
use crate::ledger::{quality_score, AttemptLedger, InitAttempt};
use crate::pose::{symmetric_transfer_error, CHI2_2DOF};
use crate::ransac::{find_fundamental, find_homography, ModelFit, RansacSamples};
use crate::reconstruct::{reconstruct_f, reconstruct_h, PoseCandidate, ViewPair};
use crate::selection::{is_scene_planar, select_model, ModelKind};

/// Result of a successful initialization.
#[derive(Clone, Debug, PartialEq)]
pub struct Initialization {
    /// Relative rotation from the reference to the current camera.
    pub rotation: DMat3,
    /// Relative translation (unit norm) from the reference to the current camera.
    pub translation: DVec3,
    /// Triangulated points in the reference camera, indexed by reference keypoint.
    pub points: Vec<DVec3>,
    /// Whether each reference keypoint was triangulated.
    pub triangulated: Vec<bool>,
    /// Model the motion was recovered from.
    pub model: ModelKind,
    /// Median parallax of the triangulated points, in degrees.
    pub parallax_deg: f64,
    /// Number of flagged points in `triangulated`; points at infinity are not counted.
    pub num_triangulated: usize,
    /// Number of inliers of the selected model.
    pub num_inliers: usize,
    /// Quality score stored in the ledger.
    pub score: f64,
}

/// Monocular two-view initializer.
///
/// Holds the reference frame keypoints and the calibration, and records every
/// successful [`Initializer::initialize`] call in its [`AttemptLedger`].
#[derive(Debug)]
pub struct Initializer {
    reference_keypoints: Vec<DVec2>,
    k: DMat3,
    config: InitializerConfig,
    ledger: AttemptLedger,
}

impl Initializer {
    /// Create an initializer for a reference frame.
    ///
    /// * `reference_keypoints` - Keypoints of the reference frame, in pixels.
    /// * `k` - Camera intrinsics shared by both views.
    /// * `config` - Initializer configuration.
    pub fn new(
        reference_keypoints: Vec<DVec2>,
        k: DMat3,
        config: InitializerConfig,
    ) -> Result<Self, InitializerError> {
        config.validate()?;
        if !(k.is_finite() && k.determinant().abs() > f64::EPSILON) {
            return Err(InitializerError::DegenerateModel("singular calibration matrix"));
        }

        Ok(Self {
            reference_keypoints,
            k,
            config,
            ledger: AttemptLedger::new(),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &InitializerConfig {
        &self.config
    }

    /// The camera intrinsics.
    pub fn calibration(&self) -> &DMat3 {
        &self.k
    }

    /// The reference frame keypoints.
    pub fn reference_keypoints(&self) -> &[DVec2] {
        &self.reference_keypoints
    }

    /// The attempts recorded so far.
    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    /// The best initialization recorded so far.
    pub fn best_initialization(&self) -> Result<InitAttempt, InitializerError> {
        self.ledger.best()
    }

    /// Estimate the motion and structure between the reference and the current frame.
    ///
    /// RANSAC sampling is seeded from [`InitializerConfig::random_seed`], or from
    /// the thread RNG when unset.
    ///
    /// * `current_keypoints` - Keypoints of the current frame, in pixels.
    /// * `matches` - For each reference keypoint, the matched current keypoint.
    pub fn initialize(
        &self,
        current_keypoints: &[DVec2],
        matches: &[Option<usize>],
    ) -> Result<Initialization, InitializerError> {
        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                let mut tr = rand::rng();
                StdRng::from_rng(&mut tr)
            }
        };
        self.initialize_with_rng(current_keypoints, matches, &mut rng)
    }

    /// Same as [`Initializer::initialize`] with an explicit source of randomness.
    pub fn initialize_with_rng<R: Rng>(
        &self,
        current_keypoints: &[DVec2],
        matches: &[Option<usize>],
        rng: &mut R,
    ) -> Result<Initialization, InitializerError> {
        let keys1 = self.reference_keypoints.as_slice();
        let keys2 = current_keypoints;
        let correspondences = build_correspondences(matches, keys1.len(), keys2.len())?;

        let samples =
            RansacSamples::generate(correspondences.len(), self.config.max_iterations, rng)?;

        let sigma = self.config.sigma;
        let (fit_h, fit_f) = rayon::join(
            || find_homography(keys1, keys2, &correspondences, &samples, sigma),
            || find_fundamental(keys1, keys2, &correspondences, &samples, sigma),
        );

        let sh = fit_h.as_ref().map_or(0.0, |f| f.score);
        let sf = fit_f.as_ref().map_or(0.0, |f| f.score);
        let selection = select_model(sh, sf, self.config.hf_threshold)?;
        debug!(
            "SH = {sh:.3}, SF = {sf:.3}, ratio = {:.3} -> {:?}",
            selection.ratio, selection.model
        );

        let views = ViewPair {
            keys1,
            keys2,
            correspondences: &correspondences,
            k: &self.k,
        };

        let (candidate, model, num_inliers) = match selection.model {
            ModelKind::Homography => {
                let fit = fit_h.ok_or(InitializerError::DegenerateModel("no homography"))?;
                let candidate = reconstruct_h(&fit.matrix, &views, &fit.inliers, &self.config)?;
                (candidate, ModelKind::Homography, fit.num_inliers())
            }
            ModelKind::Fundamental => {
                let fit = fit_f.ok_or(InitializerError::DegenerateModel("no fundamental"))?;
                let candidate = reconstruct_f(&fit.matrix, &views, &fit.inliers, &self.config)?;
                match self.planar_retry(&candidate, fit_h.as_ref(), &fit.inliers, &views) {
                    Some((planar, h_inliers)) => (planar, ModelKind::Homography, h_inliers),
                    None => (candidate, ModelKind::Fundamental, fit.num_inliers()),
                }
            }
        };

        let num_triangulated = candidate.check.num_triangulated();
        let score = quality_score(
            &self.config.quality,
            num_triangulated,
            num_inliers,
            correspondences.len(),
            candidate.check.parallax_deg,
        );

        let PoseCandidate { hypothesis, check } = candidate;
        let init = Initialization {
            rotation: hypothesis.rotation,
            translation: hypothesis.translation,
            points: check.points,
            triangulated: check.triangulated,
            model,
            parallax_deg: check.parallax_deg,
            num_triangulated,
            num_inliers,
            score,
        };

        self.ledger.save_attempt(InitAttempt {
            rotation: init.rotation,
            translation: init.translation,
            points: init.points.clone(),
            triangulated: init.triangulated.clone(),
            score: init.score,
            parallax_deg: init.parallax_deg,
            num_triangulated: init.num_triangulated,
            model: init.model,
        });

        info!(
            "initialized from {:?}: {} points, parallax {:.2} deg, score {:.3}",
            init.model, init.num_triangulated, init.parallax_deg, init.score
        );

        Ok(init)
    }

    /// Retry with the homography when the fundamental reconstruction is planar.
    ///
    /// Only taken when the homography also explains the fundamental inliers.
    /// Returns the planar reconstruction and the homography inlier count.
    fn planar_retry(
        &self,
        candidate: &PoseCandidate,
        fit_h: Option<&ModelFit>,
        f_inliers: &[bool],
        views: &ViewPair<'_>,
    ) -> Option<(PoseCandidate, usize)> {
        if !is_scene_planar(
            &candidate.check.points,
            &candidate.check.triangulated,
            self.config.planarity_threshold,
        ) {
            return None;
        }
        let fit_h = fit_h?;

        let h12 = fit_h.matrix.inverse();
        let err = symmetric_transfer_error(
            &fit_h.matrix,
            &h12,
            views.keys1,
            views.keys2,
            views.correspondences,
            f_inliers,
        );
        // mean of both directions against the per-direction threshold
        let chi2 = 0.5 * err / self.config.sigma2();
        if !chi2.is_finite() || chi2 > CHI2_2DOF {
            debug!("planar scene but the homography does not fit: {err:.3}");
            return None;
        }

        debug!("planar scene, retrying with the homography");
        match reconstruct_h(&fit_h.matrix, views, &fit_h.inliers, &self.config) {
            Ok(planar) => Some((planar, fit_h.num_inliers())),
            Err(e) => {
                debug!("homography retry failed: {e}");
                None
            }
        }
    }
}
