#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia Initializer
//!
//! Bootstraps a monocular map from two views of the same camera: given the
//! keypoints of a reference frame, the keypoints of a current frame and the
//! matches between them, it estimates the relative motion `(R, t)` and an
//! initial sparse 3D point cloud.
//!
//! ## Pipeline
//!
//! 1. [`RansacSamples`] draws the minimal 8-point sets once per call.
//! 2. [`find_homography`] and [`find_fundamental`] score both models over the
//!    same samples, in parallel.
//! 3. [`select_model`] picks the planar or the general model.
//! 4. [`reconstruct_h`] / [`reconstruct_f`] enumerate the pose hypotheses,
//!    triangulate with [`check_rt`] and keep the dominant one.
//! 5. Successful calls are scored and stored in the [`AttemptLedger`].
//!
//! ## Example
//!
//! ```no_run
//! use glam::{DMat3, DVec2, DVec3};
//! use kornia_initializer::{Initializer, InitializerConfig};
//!
//! let k = DMat3::from_cols(
//!     DVec3::new(500.0, 0.0, 0.0),
//!     DVec3::new(0.0, 500.0, 0.0),
//!     DVec3::new(320.0, 240.0, 1.0),
//! );
//! # let reference: Vec<DVec2> = vec![];
//! # let current: Vec<DVec2> = vec![];
//! # let matches: Vec<Option<usize>> = vec![];
//! let initializer = Initializer::new(reference, k, InitializerConfig::default())?;
//! match initializer.initialize(&current, &matches) {
//!     Ok(init) => println!("R = {:?}, t = {:?}", init.rotation, init.translation),
//!     Err(e) => println!("initialization failed: {e}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Initializer configuration.
pub mod config;

/// Reference/current keypoint correspondences.
pub mod correspondence;

/// Error types for the initializer.
pub mod error;

/// The two-view initializer.
pub mod initializer;

/// Append-only store of initialization attempts.
pub mod ledger;

/// Small dense linear algebra helpers backed by faer.
pub mod linalg;

/// Isotropic point normalization for linear estimation.
pub mod normalize;

/// Two-view geometric models.
pub mod pose;

/// RANSAC sampling and model scoring.
pub mod ransac;

/// Pose hypothesis evaluation and selection.
pub mod reconstruct;

/// Homography versus fundamental model selection.
pub mod selection;

/// Linear triangulation and cheirality checks.
pub mod triangulation;

pub use config::{InitializerConfig, QualityWeights};
pub use correspondence::{build_correspondences, Correspondence};
pub use error::InitializerError;
pub use initializer::{Initialization, Initializer};
pub use ledger::{quality_score, AttemptLedger, InitAttempt};
pub use normalize::normalize_points;
pub use pose::*;
pub use ransac::{find_fundamental, find_homography, ModelFit, RansacSamples};
pub use reconstruct::{reconstruct_f, reconstruct_h, select_candidate, PoseCandidate};
pub use selection::{is_scene_planar, select_model, ModelKind, ModelSelection};
pub use triangulation::{check_rt, triangulate, CheckRtResult};

#[cfg(test)]
pub(crate) mod synthetic;
