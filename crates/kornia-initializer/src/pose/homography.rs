use glam::{DMat3, DVec2, DVec3};

use crate::correspondence::Correspondence;
use crate::error::InitializerError;
use crate::linalg::{self, mat3_from_rows};
use crate::pose::PoseHypothesis;

/// Chi-square value at 95% for 2 degrees of freedom.
pub const CHI2_2DOF: f64 = 5.991;

/// Compute the homography mapping `x1` to `x2` with the direct linear transform.
///
/// Uses every pair in the least-squares sense, so the input should already be
/// normalized (see [`crate::normalize_points`]).
///
/// * `x1` - Points in the reference image, at least 4.
/// * `x2` - Corresponding points in the current image.
pub fn compute_h21(x1: &[DVec2], x2: &[DVec2]) -> Result<DMat3, InitializerError> {
    if x1.len() != x2.len() || x1.len() < 4 {
        return Err(InitializerError::InsufficientCorrespondences {
            required: 4,
            actual: x1.len().min(x2.len()),
        });
    }

    let mut mat_a = faer::Mat::<f64>::zeros(2 * x1.len(), 9);
    for (i, (p1, p2)) in x1.iter().zip(x2.iter()).enumerate() {
        let (u1, v1) = (p1.x, p1.y);
        let (u2, v2) = (p2.x, p2.y);

        mat_a.write(2 * i, 3, -u1);
        mat_a.write(2 * i, 4, -v1);
        mat_a.write(2 * i, 5, -1.0);
        mat_a.write(2 * i, 6, v2 * u1);
        mat_a.write(2 * i, 7, v2 * v1);
        mat_a.write(2 * i, 8, v2);

        mat_a.write(2 * i + 1, 0, u1);
        mat_a.write(2 * i + 1, 1, v1);
        mat_a.write(2 * i + 1, 2, 1.0);
        mat_a.write(2 * i + 1, 6, -u2 * u1);
        mat_a.write(2 * i + 1, 7, -u2 * v1);
        mat_a.write(2 * i + 1, 8, -u2);
    }

    let h = linalg::solve_homogeneous(&mat_a);
    let homo = linalg::mat3_from_row_slice(&h);

    if !homo.is_finite() {
        return Err(InitializerError::DegenerateModel("non-finite homography"));
    }

    Ok(homo)
}

/// Transfer a point through a homography; `None` if it maps to infinity.
#[inline]
fn transfer(h: &DMat3, p: DVec2) -> Option<DVec2> {
    let q = *h * DVec3::new(p.x, p.y, 1.0);
    let w = 1.0 / q.z;
    w.is_finite().then(|| DVec2::new(q.x * w, q.y * w))
}

/// Squared transfer errors `(|x1 - H12 x2|^2, |x2 - H21 x1|^2)`.
#[inline]
fn transfer_errors(h21: &DMat3, h12: &DMat3, p1: DVec2, p2: DVec2) -> (f64, f64) {
    let e1 = transfer(h12, p2).map_or(f64::INFINITY, |q| (p1 - q).length_squared());
    let e2 = transfer(h21, p1).map_or(f64::INFINITY, |q| (p2 - q).length_squared());
    (e1, e2)
}

/// Score a homography with the symmetric transfer error over all correspondences.
///
/// Each direction contributes `CHI2_2DOF - chi2` when `chi2 = e^2 / sigma^2` is
/// below the threshold. A correspondence is an inlier when both directions are.
///
/// # Returns
///
/// The score (higher is better) and the per-correspondence inlier mask.
pub fn check_homography(
    h21: &DMat3,
    h12: &DMat3,
    keys1: &[DVec2],
    keys2: &[DVec2],
    correspondences: &[Correspondence],
    sigma: f64,
) -> (f64, Vec<bool>) {
    let inv_sigma2 = 1.0 / (sigma * sigma);

    let mut score = 0.0;
    let mut inliers = vec![false; correspondences.len()];

    for (inlier, c) in inliers.iter_mut().zip(correspondences) {
        let (e1, e2) = transfer_errors(h21, h12, keys1[c.reference], keys2[c.current]);

        let mut is_in = true;
        for chi2 in [e1 * inv_sigma2, e2 * inv_sigma2] {
            if chi2.is_finite() && chi2 <= CHI2_2DOF {
                score += CHI2_2DOF - chi2;
            } else {
                is_in = false;
            }
        }
        *inlier = is_in;
    }

    (score, inliers)
}

/// Mean symmetric transfer error (squared pixels) of a homography over the inliers.
///
/// Returns `f64::INFINITY` when no inlier has a finite error.
pub fn symmetric_transfer_error(
    h21: &DMat3,
    h12: &DMat3,
    keys1: &[DVec2],
    keys2: &[DVec2],
    correspondences: &[Correspondence],
    inliers: &[bool],
) -> f64 {
    let (sum, count) = correspondences
        .iter()
        .zip(inliers)
        .filter(|(_, &is_in)| is_in)
        .map(|(c, _)| transfer_errors(h21, h12, keys1[c.reference], keys2[c.current]))
        .map(|(e1, e2)| e1 + e2)
        .filter(|e| e.is_finite())
        .fold((0.0, 0usize), |(s, n), e| (s + e, n + 1));

    if count == 0 {
        f64::INFINITY
    } else {
        sum / count as f64
    }
}

/// Decompose a homography into up to 8 pose hypotheses (Faugeras).
///
/// Works on `A = K^-1 H21 K = d R + t n^T`. Solutions for `d' = d2` and
/// `d' = -d2` are returned, the caller disambiguates them with cheirality.
///
/// * `h21` - Homography from the reference to the current image.
/// * `k` - Camera intrinsics shared by both views.
pub fn decompose_homography(
    h21: &DMat3,
    k: &DMat3,
) -> Result<Vec<PoseHypothesis>, InitializerError> {
    let a = k.inverse() * *h21 * *k;
    let svd = linalg::svd3(&a);
    let (u, v) = (svd.u, svd.v);
    let vt = v.transpose();
    let s = u.determinant() * vt.determinant();

    let (d1, d2, d3) = (svd.s.x, svd.s.y, svd.s.z);
    if d3.is_nan() || d3 <= 0.0 || d1 / d2 < 1.00001 || d2 / d3 < 1.00001 {
        return Err(InitializerError::DegenerateModel(
            "homography has repeated singular values",
        ));
    }

    let (d1_2, d2_2, d3_2) = (d1 * d1, d2 * d2, d3 * d3);
    let aux1 = ((d1_2 - d2_2) / (d1_2 - d3_2)).sqrt();
    let aux3 = ((d2_2 - d3_2) / (d1_2 - d3_2)).sqrt();
    let x1 = [aux1, aux1, -aux1, -aux1];
    let x3 = [aux3, -aux3, aux3, -aux3];

    let normal = |i: usize| {
        let n = v * DVec3::new(x1[i], 0.0, x3[i]);
        if n.z < 0.0 {
            -n
        } else {
            n
        }
    };

    let mut hypotheses = Vec::with_capacity(8);

    // d' = d2
    let aux_stheta = ((d1_2 - d2_2) * (d2_2 - d3_2)).sqrt() / ((d1 + d3) * d2);
    let ctheta = (d2_2 + d1 * d3) / ((d1 + d3) * d2);
    let stheta = [aux_stheta, -aux_stheta, -aux_stheta, aux_stheta];

    for i in 0..4 {
        let rp = mat3_from_rows([
            [ctheta, 0.0, -stheta[i]],
            [0.0, 1.0, 0.0],
            [stheta[i], 0.0, ctheta],
        ]);
        let r = (u * rp * vt).mul_scalar(s);
        let tp = DVec3::new(x1[i], 0.0, -x3[i]) * (d1 - d3);
        hypotheses.push(PoseHypothesis {
            rotation: r,
            translation: (u * tp).normalize(),
            normal: Some(normal(i)),
        });
    }

    // d' = -d2
    let aux_sphi = ((d1_2 - d2_2) * (d2_2 - d3_2)).sqrt() / ((d1 - d3) * d2);
    let cphi = (d1 * d3 - d2_2) / ((d1 - d3) * d2);
    let sphi = [aux_sphi, -aux_sphi, -aux_sphi, aux_sphi];

    for i in 0..4 {
        let rp = mat3_from_rows([
            [cphi, 0.0, sphi[i]],
            [0.0, -1.0, 0.0],
            [sphi[i], 0.0, -cphi],
        ]);
        let r = (u * rp * vt).mul_scalar(s);
        let tp = DVec3::new(x1[i], 0.0, x3[i]) * (d1 + d3);
        hypotheses.push(PoseHypothesis {
            rotation: r,
            translation: (u * tp).normalize(),
            normal: Some(normal(i)),
        });
    }

    Ok(hypotheses)
}
