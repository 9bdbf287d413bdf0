//! # Pose estimation
//!
//! Two-view geometry used by the initializer.
//!
//! - `homography`: homography (planar scenes or pure rotation, 8 DOF)
//! - `fundamental`: fundamental matrix (epipolar geometry in pixel space, 7 DOF)
//! - `essential`: essential matrix (epipolar geometry in metric space, 5 DOF)

mod hypothesis;
pub use hypothesis::*;

mod homography;
pub use homography::*;

mod fundamental;
pub use fundamental::*;

mod essential;
pub use essential::*;
