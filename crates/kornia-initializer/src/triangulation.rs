use glam::{DMat3, DVec2, DVec3};

use crate::correspondence::Correspondence;
use crate::linalg;

/// Rays whose parallax cosine reaches this value are treated as points at infinity.
pub const COS_PARALLAX_INFINITY: f64 = 0.99998;

/// A 3x4 projection matrix `K [R | t]`, stored by rows.
pub type ProjectionMatrix = [[f64; 4]; 3];

/// Build the projection matrix `K [R | t]`.
pub fn projection_matrix(k: &DMat3, r: &DMat3, t: &DVec3) -> ProjectionMatrix {
    let kr = *k * *r;
    let kt = *k * *t;
    let mut p = [[0.0; 4]; 3];
    for (i, row) in p.iter_mut().enumerate() {
        let kr_row = kr.row(i);
        *row = [kr_row.x, kr_row.y, kr_row.z, kt[i]];
    }
    p
}

fn write_dlt_row(a: &mut faer::Mat<f64>, row: usize, x: f64, p3: &[f64; 4], p1: &[f64; 4]) {
    for j in 0..4 {
        a.write(row, j, x * p3[j] - p1[j]);
    }
}

/// Triangulate a point from two pixel observations with the linear DLT method.
///
/// * `kp1` - Observation in the first view.
/// * `kp2` - Observation in the second view.
/// * `p1` - Projection matrix of the first view.
/// * `p2` - Projection matrix of the second view.
///
/// The result has non-finite coordinates when the rays are parallel.
pub fn triangulate(
    kp1: DVec2,
    kp2: DVec2,
    p1: &ProjectionMatrix,
    p2: &ProjectionMatrix,
) -> DVec3 {
    let mut a = faer::Mat::<f64>::zeros(4, 4);
    write_dlt_row(&mut a, 0, kp1.x, &p1[2], &p1[0]);
    write_dlt_row(&mut a, 1, kp1.y, &p1[2], &p1[1]);
    write_dlt_row(&mut a, 2, kp2.x, &p2[2], &p2[0]);
    write_dlt_row(&mut a, 3, kp2.y, &p2[2], &p2[1]);

    let xh = linalg::solve_homogeneous(&a);
    DVec3::new(xh[0] / xh[3], xh[1] / xh[3], xh[2] / xh[3])
}

/// Outcome of evaluating one pose hypothesis.
#[derive(Clone, Debug, Default)]
pub struct CheckRtResult {
    /// Number of correspondences that pass every check.
    pub num_good: usize,
    /// Median parallax (degrees) of the good points not at infinity.
    pub parallax_deg: f64,
    /// Triangulated points in the reference camera, indexed by reference keypoint.
    pub points: Vec<DVec3>,
    /// Whether the reference keypoint was triangulated with enough parallax.
    pub triangulated: Vec<bool>,
}

impl CheckRtResult {
    /// Number of flagged points, the good points short of infinity.
    pub fn num_triangulated(&self) -> usize {
        self.triangulated.iter().filter(|&&t| t).count()
    }
}

#[inline]
fn reprojection_error2(k: &DMat3, x: DVec3, kp: DVec2) -> f64 {
    let inv_z = 1.0 / x.z;
    let u = k.x_axis.x * x.x * inv_z + k.z_axis.x;
    let v = k.y_axis.y * x.y * inv_z + k.z_axis.y;
    (u - kp.x) * (u - kp.x) + (v - kp.y) * (v - kp.y)
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Triangulate the inliers under a pose hypothesis and count the good points.
///
/// A point is good when it is finite, lies in front of both cameras and
/// reprojects within `th2` (squared pixels) in both images. Good points with a
/// parallax cosine under [`COS_PARALLAX_INFINITY`] are flagged triangulated and
/// feed the parallax statistic.
///
/// # Arguments
///
/// * `r`, `t` - Pose hypothesis, `x2 = r * x1 + t`.
/// * `keys1`, `keys2` - Reference and current keypoints.
/// * `correspondences` - Working correspondence set.
/// * `inliers` - Inlier mask over `correspondences`.
/// * `k` - Camera intrinsics.
/// * `th2` - Squared reprojection error threshold.
#[allow(clippy::too_many_arguments)]
pub fn check_rt(
    r: &DMat3,
    t: &DVec3,
    keys1: &[DVec2],
    keys2: &[DVec2],
    correspondences: &[Correspondence],
    inliers: &[bool],
    k: &DMat3,
    th2: f64,
) -> CheckRtResult {
    let p1 = projection_matrix(k, &DMat3::IDENTITY, &DVec3::ZERO);
    let p2 = projection_matrix(k, r, t);

    // camera centers in the reference frame
    let o1 = DVec3::ZERO;
    let o2 = -(r.transpose() * *t);

    let mut result = CheckRtResult {
        num_good: 0,
        parallax_deg: 0.0,
        points: vec![DVec3::ZERO; keys1.len()],
        triangulated: vec![false; keys1.len()],
    };
    let mut parallaxes = Vec::with_capacity(correspondences.len());

    for (c, _) in correspondences
        .iter()
        .zip(inliers)
        .filter(|(_, &is_in)| is_in)
    {
        let kp1 = keys1[c.reference];
        let kp2 = keys2[c.current];

        let x1 = triangulate(kp1, kp2, &p1, &p2);
        if !x1.is_finite() {
            continue;
        }

        let ray1 = x1 - o1;
        let ray2 = x1 - o2;
        let cos_parallax = ray1.dot(ray2) / (ray1.length() * ray2.length());

        let x2 = *r * x1 + *t;
        if x1.z <= 0.0 || x2.z <= 0.0 {
            continue;
        }

        if reprojection_error2(k, x1, kp1) > th2 || reprojection_error2(k, x2, kp2) > th2 {
            continue;
        }

        result.num_good += 1;
        result.points[c.reference] = x1;

        if cos_parallax < COS_PARALLAX_INFINITY {
            result.triangulated[c.reference] = true;
            parallaxes.push(cos_parallax.clamp(-1.0, 1.0).acos().to_degrees());
        }
    }

    result.parallax_deg = median(&mut parallaxes);
    result
}
