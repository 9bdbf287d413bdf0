use glam::{DMat3, DVec2};

use crate::linalg::mat3_from_rows;

// floor for the mean absolute deviation of coincident points
const MIN_DEVIATION: f64 = 1e-12;

/// Normalize 2d points to zero mean and unit mean absolute deviation per axis.
///
/// # Arguments
///
/// * `points` - The points to normalize.
///
/// # Returns
///
/// The normalized points and the similarity transform `T` mapping the input
/// points (in homogeneous coordinates) to the normalized ones.
pub fn normalize_points(points: &[DVec2]) -> (Vec<DVec2>, DMat3) {
    if points.is_empty() {
        return (Vec::new(), DMat3::IDENTITY);
    }

    let n = points.len() as f64;
    let mean = points.iter().copied().sum::<DVec2>() / n;
    let dev = points.iter().map(|p| (*p - mean).abs()).sum::<DVec2>() / n;

    let sx = 1.0 / dev.x.max(MIN_DEVIATION);
    let sy = 1.0 / dev.y.max(MIN_DEVIATION);

    let normalized = points
        .iter()
        .map(|p| DVec2::new((p.x - mean.x) * sx, (p.y - mean.y) * sy))
        .collect();

    let t = mat3_from_rows([
        [sx, 0.0, -mean.x * sx],
        [0.0, sy, -mean.y * sy],
        [0.0, 0.0, 1.0],
    ]);

    (normalized, t)
}
