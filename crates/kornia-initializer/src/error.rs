/// Errors returned by the two-view initializer.
///
/// Every failure is local to a single call: the caller is expected to try
/// again with a new frame pair.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InitializerError {
    /// Not enough valid matches to run the 8-point estimators.
    #[error("Need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of valid correspondences supplied.
        actual: usize,
    },

    /// The matches array does not cover the reference keypoints.
    #[error("Expected {expected} matches (one per reference keypoint), got {actual}")]
    MismatchedLengths {
        /// Number of reference keypoints.
        expected: usize,
        /// Length of the matches array.
        actual: usize,
    },

    /// A match points past the end of the current keypoints.
    #[error("Match {reference} -> {current} is out of bounds for {len} current keypoints")]
    InvalidMatchIndex {
        /// Reference keypoint index.
        reference: usize,
        /// Current keypoint index stored in the match.
        current: usize,
        /// Number of current keypoints.
        len: usize,
    },

    /// Neither model, or the selected model, is usable.
    #[error("Degenerate model: {0}")]
    DegenerateModel(&'static str),

    /// No pose hypothesis dominates the others.
    #[error("Ambiguous reconstruction: best {best}, second {second}, total {total}")]
    AmbiguousReconstruction {
        /// Good point count of the best hypothesis.
        best: usize,
        /// Good point count of the runner-up.
        second: usize,
        /// Good point count summed over all hypotheses.
        total: usize,
    },

    /// The winning hypothesis does not meet the configured minimums.
    #[error(
        "Reconstruction below quality threshold: parallax {parallax_deg:.3} deg (min {min_parallax_deg}), \
         triangulated {triangulated} (min {min_triangulated})"
    )]
    BelowQualityThreshold {
        /// Median parallax of the winning hypothesis, in degrees.
        parallax_deg: f64,
        /// Configured minimum parallax, in degrees.
        min_parallax_deg: f64,
        /// Good point count of the winning hypothesis.
        triangulated: usize,
        /// Configured minimum good point count.
        min_triangulated: usize,
    },

    /// The configuration is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The attempt ledger is empty.
    #[error("No initialization attempt has been recorded")]
    NoAttempts,
}
