use glam::{DMat3, DVec3};

/// A relative pose candidate produced by a model decomposition.
///
/// Maps points from the reference camera to the current camera:
/// `x2 = rotation * x1 + translation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseHypothesis {
    /// Relative rotation.
    pub rotation: DMat3,
    /// Relative translation, unit norm.
    pub translation: DVec3,
    /// Plane normal in the reference camera, for homography decompositions.
    pub normal: Option<DVec3>,
}
