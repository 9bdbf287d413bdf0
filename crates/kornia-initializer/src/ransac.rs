use std::cmp::Ordering;

use glam::{DMat3, DVec2};
use rand::Rng;
use rayon::prelude::*;

use crate::correspondence::Correspondence;
use crate::error::InitializerError;
use crate::normalize::normalize_points;
use crate::pose::{check_fundamental, check_homography, compute_f21, compute_h21};

/// Number of correspondences in a minimal RANSAC sample.
pub const SAMPLE_SIZE: usize = 8;

/// Minimal sample sets shared by the homography and fundamental estimators.
///
/// Indices refer to positions in the correspondence set. Indices are distinct
/// within a sample; samples are drawn independently of each other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RansacSamples {
    sets: Vec<[usize; SAMPLE_SIZE]>,
}

impl RansacSamples {
    /// Draw `iterations` minimal samples over `num_correspondences` correspondences.
    pub fn generate<R: Rng>(
        num_correspondences: usize,
        iterations: usize,
        rng: &mut R,
    ) -> Result<Self, InitializerError> {
        if num_correspondences < SAMPLE_SIZE {
            return Err(InitializerError::InsufficientCorrespondences {
                required: SAMPLE_SIZE,
                actual: num_correspondences,
            });
        }

        let all_indices: Vec<usize> = (0..num_correspondences).collect();
        let sets = (0..iterations)
            .map(|_| {
                let mut available = all_indices.clone();
                let mut set = [0usize; SAMPLE_SIZE];
                for slot in set.iter_mut() {
                    let pick = rng.random_range(0..available.len());
                    *slot = available.swap_remove(pick);
                }
                set
            })
            .collect();

        Ok(Self { sets })
    }

    /// Build from explicit sample sets.
    pub fn from_sets(sets: Vec<[usize; SAMPLE_SIZE]>) -> Self {
        Self { sets }
    }

    /// The sample sets.
    pub fn sets(&self) -> &[[usize; SAMPLE_SIZE]] {
        &self.sets
    }

    /// Number of sample sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether there is no sample set.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Best model found by RANSAC.
#[derive(Clone, Debug)]
pub struct ModelFit {
    /// Estimated model, in pixel coordinates.
    pub matrix: DMat3,
    /// Score of the model (higher is better).
    pub score: f64,
    /// Per-correspondence inlier mask.
    pub inliers: Vec<bool>,
}

impl ModelFit {
    /// Number of inliers of the model.
    pub fn num_inliers(&self) -> usize {
        self.inliers.iter().filter(|&&b| b).count()
    }
}

// max-reduction: highest score, lowest sample index on ties
fn best_of(a: (usize, ModelFit), b: (usize, ModelFit)) -> (usize, ModelFit) {
    match a.1.score.total_cmp(&b.1.score) {
        Ordering::Greater => a,
        Ordering::Less => b,
        Ordering::Equal if a.0 <= b.0 => a,
        Ordering::Equal => b,
    }
}

fn matched_points(
    keys1: &[DVec2],
    keys2: &[DVec2],
    correspondences: &[Correspondence],
) -> (Vec<DVec2>, Vec<DVec2>) {
    correspondences
        .iter()
        .map(|c| (keys1[c.reference], keys2[c.current]))
        .unzip()
}

fn gather(points: &[DVec2], set: &[usize; SAMPLE_SIZE]) -> Vec<DVec2> {
    set.iter().map(|&i| points[i]).collect()
}

/// Estimate a homography with RANSAC over the shared sample sets.
///
/// Each sample is fitted with [`compute_h21`] on normalized points and scored
/// with [`check_homography`] over every correspondence. Samples are evaluated
/// in parallel.
///
/// Returns `None` when no sample yields a usable homography.
pub fn find_homography(
    keys1: &[DVec2],
    keys2: &[DVec2],
    correspondences: &[Correspondence],
    samples: &RansacSamples,
    sigma: f64,
) -> Option<ModelFit> {
    let (p1, p2) = matched_points(keys1, keys2, correspondences);
    let (pn1, t1) = normalize_points(&p1);
    let (pn2, t2) = normalize_points(&p2);
    let t2_inv = t2.inverse();

    samples
        .sets()
        .par_iter()
        .enumerate()
        .filter_map(|(idx, set)| {
            let hn = compute_h21(&gather(&pn1, set), &gather(&pn2, set)).ok()?;
            let h21 = t2_inv * hn * t1;
            let h12 = h21.inverse();
            if !h12.is_finite() {
                return None;
            }
            let (score, inliers) =
                check_homography(&h21, &h12, keys1, keys2, correspondences, sigma);
            Some((
                idx,
                ModelFit {
                    matrix: h21,
                    score,
                    inliers,
                },
            ))
        })
        .reduce_with(best_of)
        .map(|(_, fit)| fit)
}

/// Estimate a fundamental matrix with RANSAC over the shared sample sets.
///
/// Each sample is fitted with [`compute_f21`] on normalized points and scored
/// with [`check_fundamental`] over every correspondence. Samples are evaluated
/// in parallel.
///
/// Returns `None` when no sample yields a usable fundamental matrix.
pub fn find_fundamental(
    keys1: &[DVec2],
    keys2: &[DVec2],
    correspondences: &[Correspondence],
    samples: &RansacSamples,
    sigma: f64,
) -> Option<ModelFit> {
    let (p1, p2) = matched_points(keys1, keys2, correspondences);
    let (pn1, t1) = normalize_points(&p1);
    let (pn2, t2) = normalize_points(&p2);
    let t2_t = t2.transpose();

    samples
        .sets()
        .par_iter()
        .enumerate()
        .filter_map(|(idx, set)| {
            let fn21 = compute_f21(&gather(&pn1, set), &gather(&pn2, set)).ok()?;
            let f21 = t2_t * fn21 * t1;
            let (score, inliers) = check_fundamental(&f21, keys1, keys2, correspondences, sigma);
            Some((
                idx,
                ModelFit {
                    matrix: f21,
                    score,
                    inliers,
                },
            ))
        })
        .reduce_with(best_of)
        .map(|(_, fit)| fit)
}
