use glam::{DMat3, DVec2};
use log::debug;
use rayon::prelude::*;

use crate::config::InitializerConfig;
use crate::correspondence::Correspondence;
use crate::error::InitializerError;
use crate::pose::{
    decompose_essential, decompose_homography, essential_from_fundamental, PoseHypothesis,
};
use crate::triangulation::{check_rt, CheckRtResult};

/// The two views and their correspondences, as seen by the reconstructor.
#[derive(Clone, Copy, Debug)]
pub struct ViewPair<'a> {
    /// Reference keypoints.
    pub keys1: &'a [DVec2],
    /// Current keypoints.
    pub keys2: &'a [DVec2],
    /// Working correspondence set.
    pub correspondences: &'a [Correspondence],
    /// Camera intrinsics shared by both views.
    pub k: &'a DMat3,
}

/// A pose hypothesis together with its triangulation.
#[derive(Clone, Debug)]
pub struct PoseCandidate {
    /// The evaluated pose.
    pub hypothesis: PoseHypothesis,
    /// Triangulation of the inliers under that pose.
    pub check: CheckRtResult,
}

impl PoseCandidate {
    /// Number of good points of the candidate.
    #[inline]
    pub fn num_good(&self) -> usize {
        self.check.num_good
    }
}

/// Triangulate the inliers under every hypothesis, in parallel.
pub fn evaluate_hypotheses(
    hypotheses: &[PoseHypothesis],
    views: &ViewPair<'_>,
    inliers: &[bool],
    sigma2: f64,
) -> Vec<PoseCandidate> {
    let th2 = 4.0 * sigma2;
    hypotheses
        .par_iter()
        .map(|hyp| PoseCandidate {
            hypothesis: *hyp,
            check: check_rt(
                &hyp.rotation,
                &hyp.translation,
                views.keys1,
                views.keys2,
                views.correspondences,
                inliers,
                views.k,
                th2,
            ),
        })
        .collect()
}

/// Pick the dominant candidate and validate it against the configured minimums.
///
/// The winner has the most good points. The runner-up must stay below
/// `dominance_ratio` times the winner's count, otherwise the reconstruction is
/// ambiguous. The winner must then reach `min_parallax_deg` and
/// `min_triangulated`.
pub fn select_candidate(
    candidates: Vec<PoseCandidate>,
    config: &InitializerConfig,
) -> Result<PoseCandidate, InitializerError> {
    let total: usize = candidates.iter().map(PoseCandidate::num_good).sum();

    if candidates.is_empty() {
        return Err(InitializerError::DegenerateModel("no pose hypothesis"));
    }

    // first candidate wins ties, the runner-up check rejects them anyway
    let (mut best_idx, mut best_good) = (0, 0);
    for (i, c) in candidates.iter().enumerate() {
        if c.num_good() > best_good {
            best_idx = i;
            best_good = c.num_good();
        }
    }

    let second_good = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best_idx)
        .map(|(_, c)| c.num_good())
        .max()
        .unwrap_or(0);

    debug!(
        "pose candidates good counts: {:?}",
        candidates.iter().map(PoseCandidate::num_good).collect::<Vec<_>>()
    );

    if best_good == 0 || second_good as f64 >= config.dominance_ratio * best_good as f64 {
        return Err(InitializerError::AmbiguousReconstruction {
            best: best_good,
            second: second_good,
            total,
        });
    }

    let winner = candidates
        .into_iter()
        .nth(best_idx)
        .ok_or(InitializerError::DegenerateModel("no pose hypothesis"))?;

    if winner.check.parallax_deg < config.min_parallax_deg
        || winner.num_good() < config.min_triangulated
    {
        return Err(InitializerError::BelowQualityThreshold {
            parallax_deg: winner.check.parallax_deg,
            min_parallax_deg: config.min_parallax_deg,
            triangulated: winner.num_good(),
            min_triangulated: config.min_triangulated,
        });
    }

    Ok(winner)
}

/// Recover the motion and structure from a fundamental matrix.
///
/// The essential matrix `K^T F K` yields four hypotheses; the one that
/// triangulates the inliers in front of both cameras must dominate.
pub fn reconstruct_f(
    f21: &DMat3,
    views: &ViewPair<'_>,
    inliers: &[bool],
    config: &InitializerConfig,
) -> Result<PoseCandidate, InitializerError> {
    let e21 = essential_from_fundamental(f21, views.k);
    let hypotheses = decompose_essential(&e21);
    let candidates = evaluate_hypotheses(&hypotheses, views, inliers, config.sigma2());
    select_candidate(candidates, config)
}

/// Recover the motion and structure from a homography.
///
/// The homography decomposition yields up to eight hypotheses; the one that
/// triangulates the inliers in front of both cameras must dominate.
pub fn reconstruct_h(
    h21: &DMat3,
    views: &ViewPair<'_>,
    inliers: &[bool],
    config: &InitializerConfig,
) -> Result<PoseCandidate, InitializerError> {
    let hypotheses = decompose_homography(h21, views.k)?;
    let candidates = evaluate_hypotheses(&hypotheses, views, inliers, config.sigma2());
    select_candidate(candidates, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::skew;
    use crate::synthetic;
    use glam::DVec3;

    fn candidate(num_good: usize, parallax_deg: f64) -> PoseCandidate {
        PoseCandidate {
            hypothesis: PoseHypothesis {
                rotation: DMat3::IDENTITY,
                translation: DVec3::X,
                normal: None,
            },
            check: CheckRtResult {
                num_good,
                parallax_deg,
                points: Vec::new(),
                triangulated: Vec::new(),
            },
        }
    }

    #[test]
    fn test_select_candidate_close_counts_are_ambiguous() {
        let config = InitializerConfig::default();
        let res = select_candidate(vec![candidate(52, 5.0), candidate(50, 5.0)], &config);
        assert_eq!(
            res.err(),
            Some(InitializerError::AmbiguousReconstruction {
                best: 52,
                second: 50,
                total: 102
            })
        );
    }

    #[test]
    fn test_select_candidate_homography_twin() -> Result<(), InitializerError> {
        // planar scenes: the mirrored solution keeps about half of the points
        let config = InitializerConfig::default();
        let winner = select_candidate(
            vec![
                candidate(102, 3.0),
                candidate(200, 3.0),
                candidate(0, 0.0),
                candidate(98, 3.0),
                candidate(0, 0.0),
                candidate(0, 0.0),
                candidate(0, 0.0),
                candidate(0, 0.0),
            ],
            &config,
        )?;
        assert_eq!(winner.num_good(), 200);
        Ok(())
    }

    #[test]
    fn test_select_candidate_strong_runner_up_is_ambiguous() {
        let config = InitializerConfig::default();
        let res = select_candidate(
            vec![candidate(200, 3.0), candidate(160, 3.0), candidate(0, 0.0)],
            &config,
        );
        assert_eq!(
            res.err(),
            Some(InitializerError::AmbiguousReconstruction {
                best: 200,
                second: 160,
                total: 360
            })
        );

        let none_good = select_candidate(vec![candidate(0, 0.0); 4], &config);
        assert!(matches!(
            none_good,
            Err(InitializerError::AmbiguousReconstruction { best: 0, .. })
        ));
    }

    #[test]
    fn test_select_candidate_tie_is_ambiguous() {
        let config = InitializerConfig::default();
        let res = select_candidate(
            vec![candidate(90, 5.0), candidate(0, 0.0), candidate(90, 5.0)],
            &config,
        );
        assert!(matches!(
            res,
            Err(InitializerError::AmbiguousReconstruction { .. })
        ));
    }

    #[test]
    fn test_select_candidate_dominant() -> Result<(), InitializerError> {
        let config = InitializerConfig::default();
        let winner = select_candidate(
            vec![
                candidate(3, 0.5),
                candidate(95, 4.0),
                candidate(10, 2.0),
                candidate(0, 0.0),
            ],
            &config,
        )?;
        assert_eq!(winner.num_good(), 95);
        Ok(())
    }

    #[test]
    fn test_select_candidate_below_thresholds() {
        let config = InitializerConfig::default();

        let low_parallax = select_candidate(vec![candidate(100, 0.2), candidate(0, 0.0)], &config);
        assert!(matches!(
            low_parallax,
            Err(InitializerError::BelowQualityThreshold { triangulated: 100, .. })
        ));

        let few_points = select_candidate(vec![candidate(30, 3.0), candidate(1, 0.0)], &config);
        assert!(matches!(
            few_points,
            Err(InitializerError::BelowQualityThreshold { triangulated: 30, .. })
        ));
    }

    #[test]
    fn test_reconstruct_f_recovers_motion() -> Result<(), InitializerError> {
        let scene = synthetic::general_scene(120, 17);
        let corr = scene.correspondences();
        let views = ViewPair {
            keys1: &scene.keys1,
            keys2: &scene.keys2,
            correspondences: &corr,
            k: &scene.k,
        };

        let t_unit = scene.translation.normalize();
        let e = skew(t_unit) * scene.rotation;
        let k_inv = scene.k.inverse();
        let f = k_inv.transpose() * e * k_inv;

        let inliers = vec![true; corr.len()];
        let winner = reconstruct_f(&f, &views, &inliers, &InitializerConfig::default())?;

        assert_eq!(winner.num_good(), 120);
        let dr = (winner.hypothesis.rotation - scene.rotation).to_cols_array();
        assert!(dr.iter().all(|x| x.abs() < 1e-9));
        assert!(winner.hypothesis.translation.dot(t_unit) > 1.0 - 1e-9);
        Ok(())
    }

    #[test]
    fn test_reconstruct_low_parallax_fails() -> Result<(), InitializerError> {
        // nearly pure rotation: the baseline is tiny compared to the depth
        let scene = synthetic::general_scene(150, 40);
        let t = DVec3::new(-0.002, 0.0, 0.0);
        let keys2: Vec<DVec2> = scene
            .points
            .iter()
            .map(|x| synthetic::project(&scene.k, scene.rotation * *x + t))
            .collect();
        let corr = scene.correspondences();
        let views = ViewPair {
            keys1: &scene.keys1,
            keys2: &keys2,
            correspondences: &corr,
            k: &scene.k,
        };

        let hypotheses = [PoseHypothesis {
            rotation: scene.rotation,
            translation: t.normalize(),
            normal: None,
        }];
        let candidates = evaluate_hypotheses(&hypotheses, &views, &vec![true; corr.len()], 1.0);
        assert!(candidates[0].num_good() >= 50);

        let res = select_candidate(candidates, &InitializerConfig::default());
        assert!(matches!(
            res,
            Err(InitializerError::BelowQualityThreshold { .. })
        ));
        Ok(())
    }
}
