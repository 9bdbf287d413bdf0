//! Synthetic two-view scenes for unit tests.

use glam::{DMat3, DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::correspondence::Correspondence;

pub(crate) struct Scene {
    pub k: DMat3,
    pub rotation: DMat3,
    pub translation: DVec3,
    pub points: Vec<DVec3>,
    pub keys1: Vec<DVec2>,
    pub keys2: Vec<DVec2>,
}

impl Scene {
    pub fn correspondences(&self) -> Vec<Correspondence> {
        (0..self.keys1.len())
            .map(|i| Correspondence {
                reference: i,
                current: i,
            })
            .collect()
    }
}

pub(crate) fn camera() -> DMat3 {
    DMat3::from_cols(
        DVec3::new(500.0, 0.0, 0.0),
        DVec3::new(0.0, 500.0, 0.0),
        DVec3::new(320.0, 240.0, 1.0),
    )
}

pub(crate) fn project(k: &DMat3, x: DVec3) -> DVec2 {
    let p = *k * x;
    DVec2::new(p.x / p.z, p.y / p.z)
}

pub(crate) fn motion() -> (DMat3, DVec3) {
    let r = DMat3::from_rotation_y(0.05) * DMat3::from_rotation_x(-0.02);
    let t = DVec3::new(-0.6, 0.05, 0.1);
    (r, t)
}

fn build(points: Vec<DVec3>, rotation: DMat3, translation: DVec3) -> Scene {
    let k = camera();
    let keys1 = points.iter().map(|x| project(&k, *x)).collect();
    let keys2 = points
        .iter()
        .map(|x| project(&k, rotation * *x + translation))
        .collect();
    Scene {
        k,
        rotation,
        translation,
        points,
        keys1,
        keys2,
    }
}

/// Points spread in a box in front of both cameras.
pub(crate) fn general_scene(n: usize, seed: u64) -> Scene {
    let mut rng = StdRng::seed_from_u64(seed);
    let points = (0..n)
        .map(|_| {
            DVec3::new(
                rng.random_range(-2.0..2.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(4.0..8.0),
            )
        })
        .collect();
    let (r, t) = motion();
    build(points, r, t)
}

/// Plane `-0.2 x + z = 5` seen by both cameras.
pub(crate) fn planar_scene(n: usize, seed: u64) -> Scene {
    let mut rng = StdRng::seed_from_u64(seed);
    let points = (0..n)
        .map(|_| {
            let x: f64 = rng.random_range(-2.0..2.0);
            let y: f64 = rng.random_range(-1.5..1.5);
            DVec3::new(x, y, 5.0 + 0.2 * x)
        })
        .collect();
    let (r, t) = motion();
    build(points, r, t)
}

/// Homography induced by the plane of [`planar_scene`].
pub(crate) fn planar_homography(scene: &Scene) -> DMat3 {
    let n = DVec3::new(-0.2, 0.0, 1.0);
    let d = 5.0;
    let a = scene.rotation
        + DMat3::from_cols(
            scene.translation * (n.x / d),
            scene.translation * (n.y / d),
            scene.translation * (n.z / d),
        );
    scene.k * a * scene.k.inverse()
}
