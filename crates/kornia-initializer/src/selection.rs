use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::InitializerError;
use crate::linalg;

/// Two-view model used to recover the motion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Planar scene or low parallax motion.
    Homography,
    /// General scene.
    Fundamental,
}

/// Outcome of the homography/fundamental comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelSelection {
    /// Selected model.
    pub model: ModelKind,
    /// `SH / (SH + SF)`.
    pub ratio: f64,
}

/// Choose between the homography and the fundamental matrix from their scores.
///
/// The homography is preferred when `SH / (SH + SF) > hf_threshold`: it also
/// explains pure rotations and planar scenes, where the epipolar geometry is
/// ill-posed.
pub fn select_model(
    sh: f64,
    sf: f64,
    hf_threshold: f64,
) -> Result<ModelSelection, InitializerError> {
    let total = sh + sf;
    if !(total.is_finite() && total > 0.0) {
        return Err(InitializerError::DegenerateModel(
            "neither homography nor fundamental explains the correspondences",
        ));
    }

    let ratio = sh / total;
    let model = if ratio > hf_threshold {
        ModelKind::Homography
    } else {
        ModelKind::Fundamental
    };

    Ok(ModelSelection { model, ratio })
}

/// Whether the triangulated points lie close to a single plane.
///
/// Fits a plane through the centroid of the flagged points and compares the
/// spread along the normal with the second largest spread:
/// `sqrt(λ3 / λ2) < threshold` on the eigenvalues of the scatter matrix.
/// Fewer than 4 points never count as planar.
pub fn is_scene_planar(points: &[DVec3], triangulated: &[bool], threshold: f64) -> bool {
    let selected: Vec<DVec3> = points
        .iter()
        .zip(triangulated)
        .filter(|(_, &ok)| ok)
        .map(|(p, _)| *p)
        .collect();

    if selected.len() < 4 {
        return false;
    }

    let centroid = selected.iter().copied().sum::<DVec3>() / selected.len() as f64;
    let scatter = selected.iter().fold(DMat3::ZERO, |acc, p| {
        let d = *p - centroid;
        acc + DMat3::from_cols(d * d.x, d * d.y, d * d.z)
    });

    let s = linalg::svd3(&scatter).s;
    if s.y.is_nan() || s.y <= 0.0 {
        // collinear or coincident points do not define a plane
        return false;
    }

    (s.z / s.y).sqrt() < threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    #[test]
    fn test_select_model_threshold() -> Result<(), InitializerError> {
        let sel = select_model(50.0, 50.0, 0.45)?;
        assert_eq!(sel.model, ModelKind::Homography);
        assert_eq!(sel.ratio, 0.5);

        let sel = select_model(20.0, 80.0, 0.45)?;
        assert_eq!(sel.model, ModelKind::Fundamental);

        // exactly at the threshold keeps the fundamental matrix
        let sel = select_model(45.0, 55.0, 0.45)?;
        assert_eq!(sel.model, ModelKind::Fundamental);
        Ok(())
    }

    #[test]
    fn test_select_model_degenerate() {
        assert!(matches!(
            select_model(0.0, 0.0, 0.45),
            Err(InitializerError::DegenerateModel(_))
        ));
    }

    #[test]
    fn test_is_scene_planar() {
        let planar = synthetic::planar_scene(50, 1);
        let flags = vec![true; 50];
        assert!(is_scene_planar(&planar.points, &flags, 0.02));

        let general = synthetic::general_scene(50, 1);
        assert!(!is_scene_planar(&general.points, &flags, 0.02));

        // too few flagged points
        let mut few = vec![false; 50];
        few[..3].fill(true);
        assert!(!is_scene_planar(&planar.points, &few, 0.02));
    }
}
