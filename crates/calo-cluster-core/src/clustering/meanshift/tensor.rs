//! Tensor implementation of the cosine mean-shift iteration.
//!
//! Every shifting point moves in one batched step: an `(S, M)` cosine
//! similarity matrix, a kernel weight matrix, and a weighted mean computed as
//! a matrix product. Runs on any `candle_core::Device`.

use candle_core::{DType, Device, Tensor};

use super::params::{MeanShiftKernel, MeanShiftParams};
use super::seeds::Seeds;
use super::ShiftTrace;
use crate::error::CaloResult;
use crate::types::{Embeddings, NORM_EPS};

/// Scale each row to unit L2 norm: `x / (||x|| + eps)`.
pub(crate) fn row_normalize(t: &Tensor) -> candle_core::Result<Tensor> {
    let norm = t
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .affine(1.0, NORM_EPS as f64)?;
    t.broadcast_div(&norm)
}

fn kernel_weights(distance: &Tensor, params: &MeanShiftParams) -> candle_core::Result<Tensor> {
    match params.kernel {
        MeanShiftKernel::Flat => distance.le(params.bandwidth as f64)?.to_dtype(DType::F32),
        MeanShiftKernel::Gaussian => distance
            .affine(1.0 / params.bandwidth as f64, 0.0)?
            .sqr()?
            .affine(-0.5, 0.0)?
            .exp(),
    }
}

pub(crate) fn shift_tensor(
    points: &Embeddings,
    seeds: Seeds,
    params: &MeanShiftParams,
    device: &Device,
) -> CaloResult<ShiftTrace> {
    let dim = seeds.dim;
    let n_seeds = seeds.len();

    let x = points.to_tensor(device)?;
    let x_unit_t = row_normalize(&x)?.t()?.contiguous()?;
    let mut current = Tensor::from_vec(seeds.data, (n_seeds, dim), device)?;

    let mut iterations = 0;
    let mut converged = false;

    for iter in 0..params.max_iter {
        iterations = iter + 1;

        let cos = row_normalize(&current)?.matmul(&x_unit_t)?;
        let weights = kernel_weights(&cos.affine(-1.0, 1.0)?, params)?;

        let total = weights.sum_keepdim(1)?;
        let has_weight = total.gt(0.0)?.to_dtype(DType::F32)?;
        let no_weight = has_weight.affine(-1.0, 1.0)?;

        // Rows without weight divide by 1 and are replaced by the old position.
        let mean = weights
            .matmul(&x)?
            .broadcast_div(&(&total + &no_weight)?)?;
        let mut next = (mean.broadcast_mul(&has_weight)? + current.broadcast_mul(&no_weight)?)?;
        if params.normalize {
            next = row_normalize(&next)?;
        }

        let max_displacement = (&next - &current)?
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .flatten_all()?
            .max(0)?
            .to_scalar::<f32>()?;

        current = next;

        if max_displacement < params.tol {
            converged = true;
            break;
        }
    }

    Ok(ShiftTrace {
        positions: Seeds {
            data: current.flatten_all()?.to_vec1::<f32>()?,
            dim,
        },
        iterations,
        converged,
    })
}
