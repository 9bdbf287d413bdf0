use glam::{DMat3, DVec2, DVec3};

use crate::correspondence::Correspondence;
use crate::error::InitializerError;
use crate::linalg;
use crate::pose::CHI2_2DOF;

/// Chi-square value at 95% for 1 degree of freedom.
pub const CHI2_1DOF: f64 = 3.841;

/// Estimate the fundamental matrix with the 8-point algorithm.
///
/// The input should already be normalized (see [`crate::normalize_points`]).
/// The rank-2 constraint is enforced by zeroing the smallest singular value.
///
/// - `x1`: points in the reference image (length >= 8)
/// - `x2`: corresponding points in the current image (same length)
///
/// Returns `F21` such that `x2^T F21 x1 = 0`.
pub fn compute_f21(x1: &[DVec2], x2: &[DVec2]) -> Result<DMat3, InitializerError> {
    if x1.len() != x2.len() || x1.len() < 8 {
        return Err(InitializerError::InsufficientCorrespondences {
            required: 8,
            actual: x1.len().min(x2.len()),
        });
    }

    // Build design matrix A (N x 9) for x2' * F * x1 = 0
    let mut a = faer::Mat::<f64>::zeros(x1.len(), 9);
    for (i, (p1, p2)) in x1.iter().zip(x2.iter()).enumerate() {
        let (x, y) = (p1.x, p1.y);
        let (xp, yp) = (p2.x, p2.y);
        a.write(i, 0, xp * x);
        a.write(i, 1, xp * y);
        a.write(i, 2, xp);
        a.write(i, 3, yp * x);
        a.write(i, 4, yp * y);
        a.write(i, 5, yp);
        a.write(i, 6, x);
        a.write(i, 7, y);
        a.write(i, 8, 1.0);
    }

    let f = linalg::mat3_from_row_slice(&linalg::solve_homogeneous(&a));

    // Enforce rank-2 constraint on F via SVD(F) and zero smallest singular value
    let svd = linalg::svd3(&f);
    let s = DVec3::new(svd.s.x, svd.s.y, 0.0);
    let f_rank2 = svd.u * DMat3::from_diagonal(s) * svd.v.transpose();

    if !f_rank2.is_finite() {
        return Err(InitializerError::DegenerateModel("non-finite fundamental matrix"));
    }

    Ok(f_rank2)
}

/// Squared distance from `p` to the line `l = (a, b, c)`.
#[inline]
fn line_distance2(l: DVec3, p: DVec2) -> f64 {
    let num = l.x * p.x + l.y * p.y + l.z;
    num * num / (l.x * l.x + l.y * l.y)
}

/// Score a fundamental matrix with the symmetric epipolar distance.
///
/// For each direction the squared point-to-epipolar-line distance is scaled
/// by `1 / sigma^2`; values under [`CHI2_1DOF`] keep the correspondence an
/// inlier and add `CHI2_2DOF - chi2` to the score, so the score is comparable
/// with [`crate::check_homography`].
///
/// # Returns
///
/// The score (higher is better) and the per-correspondence inlier mask.
pub fn check_fundamental(
    f21: &DMat3,
    keys1: &[DVec2],
    keys2: &[DVec2],
    correspondences: &[Correspondence],
    sigma: f64,
) -> (f64, Vec<bool>) {
    let inv_sigma2 = 1.0 / (sigma * sigma);
    let f12 = f21.transpose();

    let mut score = 0.0;
    let mut inliers = vec![false; correspondences.len()];

    for (inlier, c) in inliers.iter_mut().zip(correspondences) {
        let p1 = keys1[c.reference];
        let p2 = keys2[c.current];

        // l2 = F21 x1 lives in the current image, l1 = F21^T x2 in the reference
        let l2 = *f21 * DVec3::new(p1.x, p1.y, 1.0);
        let l1 = f12 * DVec3::new(p2.x, p2.y, 1.0);

        let mut is_in = true;
        for chi2 in [
            line_distance2(l2, p2) * inv_sigma2,
            line_distance2(l1, p1) * inv_sigma2,
        ] {
            if chi2.is_finite() && chi2 <= CHI2_1DOF {
                score += CHI2_2DOF - chi2;
            } else {
                is_in = false;
            }
        }
        *inlier = is_in;
    }

    (score, inliers)
}
