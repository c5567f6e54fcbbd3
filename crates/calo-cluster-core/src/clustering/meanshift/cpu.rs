//! CPU reference implementation of the cosine mean-shift iteration.
//!
//! Shifting points move in parallel (rayon, order preserving); each point's
//! weighted mean is accumulated sequentially, so results are bit-reproducible
//! for identical inputs regardless of thread count.

use rayon::prelude::*;

use super::params::MeanShiftParams;
use super::seeds::Seeds;
use super::ShiftTrace;
use crate::types::{l2_norm, Embeddings, NORM_EPS};

/// Move one shifting point to the kernel-weighted mean of all inputs.
///
/// A point with zero total weight stays where it is.
fn shift_point(
    seed: &[f32],
    points: &Embeddings,
    point_norms: &[f32],
    params: &MeanShiftParams,
) -> Vec<f32> {
    let seed_norm = l2_norm(seed);
    let mut acc = vec![0.0f32; seed.len()];
    let mut total = 0.0f32;

    for (row, &row_norm) in points.rows().zip(point_norms) {
        let dot: f32 = seed.iter().zip(row).map(|(a, b)| a * b).sum();
        let cos = dot / (seed_norm * row_norm + NORM_EPS);
        let w = params.kernel.weight(1.0 - cos, params.bandwidth);
        if w > 0.0 {
            total += w;
            acc.iter_mut().zip(row).for_each(|(a, x)| *a += w * x);
        }
    }

    if total <= 0.0 {
        return seed.to_vec();
    }
    acc.iter_mut().for_each(|a| *a /= total);

    if params.normalize {
        let norm = l2_norm(&acc) + NORM_EPS;
        acc.iter_mut().for_each(|a| *a /= norm);
    }
    acc
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Iterate until the largest displacement drops below `tol` or `max_iter`
/// is reached.
pub(crate) fn shift_cpu(points: &Embeddings, seeds: Seeds, params: &MeanShiftParams) -> ShiftTrace {
    let point_norms: Vec<f32> = points.rows().map(l2_norm).collect();
    let dim = seeds.dim;
    let mut current = seeds;
    let mut iterations = 0;
    let mut converged = false;

    for iter in 0..params.max_iter {
        iterations = iter + 1;

        let shifted: Vec<Vec<f32>> = current
            .data
            .par_chunks_exact(dim)
            .map(|seed| shift_point(seed, points, &point_norms, params))
            .collect();

        // Global reduction: the only synchronization point per iteration.
        let max_displacement = current
            .rows()
            .zip(&shifted)
            .map(|(old, new)| euclidean(old, new))
            .fold(0.0f32, f32::max);

        current = Seeds {
            data: shifted.concat(),
            dim,
        };

        if max_displacement < params.tol {
            converged = true;
            break;
        }
    }

    ShiftTrace {
        positions: current,
        iterations,
        converged,
    }
}
