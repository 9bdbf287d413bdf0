use crate::error::InitializerError;

/// A match between a reference keypoint and a current keypoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Correspondence {
    /// Index into the reference keypoints.
    pub reference: usize,
    /// Index into the current keypoints.
    pub current: usize,
}

/// Build the working correspondence set from a per-reference matches array.
///
/// `matches[i]` holds the current keypoint matched to reference keypoint `i`,
/// or `None` when unmatched. The result is ordered by reference index, so each
/// reference keypoint appears at most once.
///
/// # Arguments
///
/// * `matches` - One entry per reference keypoint.
/// * `num_reference` - Number of reference keypoints.
/// * `num_current` - Number of current keypoints.
pub fn build_correspondences(
    matches: &[Option<usize>],
    num_reference: usize,
    num_current: usize,
) -> Result<Vec<Correspondence>, InitializerError> {
    if matches.len() != num_reference {
        return Err(InitializerError::MismatchedLengths {
            expected: num_reference,
            actual: matches.len(),
        });
    }

    let mut correspondences = Vec::with_capacity(matches.len());
    for (reference, m) in matches.iter().enumerate() {
        let Some(current) = *m else {
            continue;
        };
        if current >= num_current {
            return Err(InitializerError::InvalidMatchIndex {
                reference,
                current,
                len: num_current,
            });
        }
        correspondences.push(Correspondence { reference, current });
    }

    Ok(correspondences)
}
