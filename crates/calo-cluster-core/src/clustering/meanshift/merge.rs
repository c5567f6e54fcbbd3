//! Mode merging and label assignment, shared by every backend.

use super::seeds::Seeds;
use crate::types::{
    cosine_distance, cosine_similarity, euclidean_distance, l2_norm, Embeddings, NORM_EPS,
};

/// Converged modes plus the mode index of every shifting point.
#[derive(Debug, Clone)]
pub(crate) struct MergedModes {
    pub modes: Vec<Vec<f32>>,
    pub seed_mode: Vec<usize>,
}

/// Greedy merge in ascending seed order.
///
/// A converged point joins the first mode within `tolerance` cosine
/// distance or `tolerance` Euclidean distance, otherwise it founds a new mode
/// at its own position. The Euclidean test keeps coincident zero vectors
/// together, since their cosine distance is 1. Mode indices follow first
/// occurrence, which makes labels reproducible.
pub(crate) fn merge_modes(converged: &Seeds, tolerance: f32) -> MergedModes {
    let mut modes: Vec<Vec<f32>> = Vec::new();
    let mut seed_mode = Vec::with_capacity(converged.len());

    for point in converged.rows() {
        let existing = modes.iter().position(|mode| {
            cosine_distance(mode, point) <= tolerance
                || euclidean_distance(mode, point) <= tolerance
        });
        let idx = match existing {
            Some(idx) => idx,
            None => {
                modes.push(point.to_vec());
                modes.len() - 1
            }
        };
        seed_mode.push(idx);
    }

    MergedModes { modes, seed_mode }
}

/// Label every input with the mode of highest cosine similarity.
///
/// Ties go to the lower mode index. A zero row has no direction and takes the
/// first mode within `tolerance` Euclidean distance instead.
pub(crate) fn assign_nearest(
    points: &Embeddings,
    modes: &[Vec<f32>],
    tolerance: f32,
) -> Vec<i64> {
    points
        .rows()
        .map(|row| {
            if l2_norm(row) < NORM_EPS {
                if let Some(m) = modes
                    .iter()
                    .position(|mode| euclidean_distance(mode, row) <= tolerance)
                {
                    return m as i64;
                }
            }
            let mut best = 0usize;
            let mut best_sim = f32::NEG_INFINITY;
            for (m, mode) in modes.iter().enumerate() {
                let sim = cosine_similarity(mode, row);
                if sim > best_sim {
                    best_sim = sim;
                    best = m;
                }
            }
            best as i64
        })
        .collect()
}
