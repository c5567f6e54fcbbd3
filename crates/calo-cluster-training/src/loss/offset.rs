//! Masked L1 regression between predicted and ground-truth offsets.

use std::collections::BTreeSet;

use candle_core::Tensor;

use calo_cluster_core::types::{check_len, HitBatch};
use calo_cluster_core::{CaloError, CaloResult, OffsetLossConfig};

use super::tensor_util::{map_candle, tensor_to_f32};

/// Added to the valid-hit count before dividing.
pub const OFFSET_EPS: f64 = 1e-6;

/// `sum_i valid_i * |pred_i - gt_i|_1 / (sum_i valid_i + 1e-6)`.
///
/// # Errors
/// - `InvalidInput` if the tensors are not equal-shaped `[N, K]`
/// - `LengthMismatch` if `valid` does not have N entries
pub fn offset_loss(predicted: &Tensor, ground_truth: &Tensor, valid: &[bool]) -> CaloResult<Tensor> {
    if predicted.dims() != ground_truth.dims() || predicted.rank() != 2 {
        return Err(CaloError::invalid_input(format!(
            "offset tensors must share one [N, K] shape, got {:?} and {:?}",
            predicted.dims(),
            ground_truth.dims()
        )));
    }
    let n = predicted.dim(0).map_err(map_candle)?;
    check_len("valid", valid, n)?;

    let mask: Vec<f32> = valid.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect();
    let count = valid.iter().filter(|&&v| v).count() as f64;
    let mask = Tensor::from_vec(mask, n, predicted.device())
        .map_err(map_candle)?
        .to_dtype(predicted.dtype())
        .map_err(map_candle)?;

    let dist = predicted
        .sub(ground_truth)
        .map_err(map_candle)?
        .abs()
        .map_err(map_candle)?
        .sum(1)
        .map_err(map_candle)?; // [N]

    dist.mul(&mask)
        .map_err(map_candle)?
        .sum_all()
        .map_err(map_candle)?
        .affine(1.0 / (count + OFFSET_EPS), 0.0)
        .map_err(map_candle)
}

/// Offset loss restricted to hits of selected semantic classes.
#[derive(Debug, Clone, Default)]
pub struct OffsetInstanceLoss {
    valid_labels: Option<BTreeSet<i64>>,
}

impl OffsetInstanceLoss {
    pub fn from_config(config: &OffsetLossConfig) -> CaloResult<Self> {
        config.validate()?;
        Ok(Self {
            valid_labels: config
                .valid_labels
                .as_ref()
                .map(|labels| labels.iter().copied().collect()),
        })
    }

    /// Supervise only hits whose semantic label is in `labels`.
    #[must_use]
    pub fn with_valid_labels(mut self, labels: impl IntoIterator<Item = i64>) -> Self {
        self.valid_labels = Some(labels.into_iter().collect());
        self
    }

    /// Loss with validity taken from the semantic labels.
    ///
    /// Every hit is valid when no valid labels are configured.
    ///
    /// # Errors
    /// - `InvalidInput` if valid labels are configured and `semantic_labels` is absent
    /// - whatever [`offset_loss`] reports
    pub fn compute(
        &self,
        predicted: &Tensor,
        ground_truth: &Tensor,
        semantic_labels: Option<&[i64]>,
    ) -> CaloResult<Tensor> {
        let n = predicted.dims().first().copied().unwrap_or(0);
        let valid: Vec<bool> = match (&self.valid_labels, semantic_labels) {
            (None, labels) => {
                if let Some(labels) = labels {
                    check_len("semantic_labels", labels, n)?;
                }
                vec![true; n]
            }
            (Some(_), None) => {
                return Err(CaloError::invalid_input(
                    "semantic labels are required when valid_labels is set",
                ))
            }
            (Some(allowed), Some(labels)) => {
                check_len("semantic_labels", labels, n)?;
                labels.iter().map(|l| allowed.contains(l)).collect()
            }
        };
        let loss = offset_loss(predicted, ground_truth, &valid)?;
        tracing::debug!(
            hits = n,
            valid = valid.iter().filter(|&&v| v).count(),
            loss = tensor_to_f32(&loss)?,
            "Offset loss"
        );
        Ok(loss)
    }

    /// Loss against the ground-truth offsets a batch carries.
    ///
    /// # Errors
    /// - `InvalidInput` if the batch carries no offsets
    /// - whatever [`HitBatch::validate`] or [`compute`](Self::compute) reports
    pub fn compute_batch(&self, predicted: &Tensor, batch: &HitBatch<'_>) -> CaloResult<Tensor> {
        batch.validate()?;
        let offsets = batch
            .offsets
            .ok_or_else(|| CaloError::invalid_input("batch carries no offsets"))?;
        let data: Vec<f32> = offsets.iter().flatten().copied().collect();
        let ground_truth = Tensor::from_vec(data, (offsets.len(), 3), predicted.device())
            .map_err(map_candle)?
            .to_dtype(predicted.dtype())
            .map_err(map_candle)?;
        self.compute(predicted, &ground_truth, batch.semantic_labels)
    }

    /// Loss with an explicit per-hit validity mask.
    pub fn compute_masked(
        &self,
        predicted: &Tensor,
        ground_truth: &Tensor,
        valid: &[bool],
    ) -> CaloResult<Tensor> {
        offset_loss(predicted, ground_truth, valid)
    }
}
