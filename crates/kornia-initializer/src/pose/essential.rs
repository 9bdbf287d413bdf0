use glam::{DMat3, DVec3};

use crate::linalg::{self, mat3_from_rows};
use crate::pose::PoseHypothesis;

/// Build an essential matrix from a fundamental matrix and camera intrinsics.
///
/// E = K^T * F * K
pub fn essential_from_fundamental(f21: &DMat3, k: &DMat3) -> DMat3 {
    k.transpose() * *f21 * *k
}

/// Decompose an essential matrix into its four possible (R, t) solutions.
///
/// `t` is the unit left null vector of `E`; the rotations are `U W V^T` and
/// `U W^T V^T`, sign-corrected to be proper. The order is
/// `(R1, t), (R2, t), (R1, -t), (R2, -t)`.
pub fn decompose_essential(e: &DMat3) -> [PoseHypothesis; 4] {
    let svd = linalg::svd3(e);
    let (u, vt) = (svd.u, svd.v.transpose());

    let t = {
        let t = u.z_axis;
        let norm = t.length();
        if norm > 0.0 {
            t / norm
        } else {
            DVec3::Z
        }
    };

    let w = mat3_from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);

    let proper = |r: DMat3| {
        if r.determinant() < 0.0 {
            r.mul_scalar(-1.0)
        } else {
            r
        }
    };
    let r1 = proper(u * w * vt);
    let r2 = proper(u * w.transpose() * vt);

    let hyp = |rotation, translation| PoseHypothesis {
        rotation,
        translation,
        normal: None,
    };
    [hyp(r1, t), hyp(r2, t), hyp(r1, -t), hyp(r2, -t)]
}
