//! Pull/push centroid loss for instance embeddings.
//!
//! Within each event, hits of one instance are pulled to within `delta_v`
//! (L1) of their centroid, and centroids of different instances are pushed
//! at least `2 * delta_d` (L1) apart:
//!
//! ```text
//! L_pull = sum_m sum_{x in m} relu(|mu_m - x|_1 - delta_v)^2 / (M * N_m)
//! L_push = sum_{i != j} relu(2 * delta_d - |mu_i - mu_j|_1)^2 / (M * (M - 1))
//! L      = sum_events (L_pull + L_push) / B
//! ```
//!
//! `L_push` is only present when an event holds more than one instance.

use std::collections::BTreeSet;

use candle_core::{Device, Tensor};
use tracing::{debug, Level};

use calo_cluster_core::types::{check_labels, check_len, group_by_label, HitBatch};
use calo_cluster_core::{CaloError, CaloResult, CentroidLossConfig, LossMethod};

use super::tensor_util::{
    index_tensor, map_candle, normalize_rows, off_diagonal_mask, tensor_to_f32, zero_scalar,
};

/// Per-component loss values for logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentroidLossComponents {
    /// Pull term, already divided by the event count.
    pub pull: f32,
    /// Push term, already divided by the event count.
    pub push: f32,
    /// Total loss.
    pub total: f32,
    /// Distinct events that contributed.
    pub events: usize,
}

/// Pull/push centroid instance loss.
#[derive(Debug, Clone)]
pub struct CentroidInstanceLoss {
    delta_v: f32,
    delta_d: f32,
    normalize: bool,
    method: LossMethod,
    ignore_labels: BTreeSet<i64>,
}

/// Running sums over pools and events.
struct Accumulator {
    pull: Tensor,
    push: Tensor,
    events: BTreeSet<i64>,
}

impl CentroidInstanceLoss {
    /// Build the loss from its config section.
    ///
    /// # Errors
    /// - `CaloError::ConfigError` if the config does not validate, including
    ///   `ignore`/`separate` without `ignore_labels`
    pub fn from_config(config: &CentroidLossConfig) -> CaloResult<Self> {
        config.validate()?;
        Ok(Self {
            delta_v: config.delta_v,
            delta_d: config.delta_d,
            normalize: config.normalize,
            method: config.method,
            ignore_labels: config
                .ignore_labels
                .iter()
                .flatten()
                .copied()
                .collect(),
        })
    }

    /// Loss with default margins, normalization on, method `all`.
    pub fn default_config() -> Self {
        Self {
            delta_v: 0.5,
            delta_d: 1.5,
            normalize: true,
            method: LossMethod::All,
            ignore_labels: BTreeSet::new(),
        }
    }

    pub fn method(&self) -> LossMethod {
        self.method
    }

    /// Compute the loss for a batch.
    ///
    /// # Arguments
    /// * `embeddings` - Hit embeddings [N, D]
    /// * `instance_labels` - Ground-truth instance per hit, non-negative
    /// * `subbatch_indices` - Event per hit; `None` means one event
    /// * `weights` - Per-hit weights; length-checked, not applied
    /// * `semantic_labels` - Semantic class per hit; required for `ignore` and `separate`
    ///
    /// # Returns
    /// (loss tensor, CentroidLossComponents for logging)
    ///
    /// # Errors
    /// - `LengthMismatch` if a per-hit array does not have N entries
    /// - `InvalidInput` if a label is negative, or semantic labels are missing
    ///   for `ignore`/`separate`
    pub fn compute(
        &self,
        embeddings: &Tensor,
        instance_labels: &[i64],
        subbatch_indices: Option<&[i64]>,
        weights: Option<&[f32]>,
        semantic_labels: Option<&[i64]>,
    ) -> CaloResult<(Tensor, CentroidLossComponents)> {
        let (n, _) = embeddings.dims2().map_err(|e| {
            CaloError::invalid_input(format!("embeddings must be a [N, D] tensor: {}", e))
        })?;
        check_labels("instance_labels", instance_labels, n)?;
        if let Some(indices) = subbatch_indices {
            check_labels("subbatch_indices", indices, n)?;
        }
        if let Some(w) = weights {
            check_len("weights", w, n)?;
        }
        if let Some(labels) = semantic_labels {
            check_labels("semantic_labels", labels, n)?;
        }

        let single_event = vec![0i64; n];
        let subbatch = subbatch_indices.unwrap_or(&single_event);

        let x = if self.normalize {
            normalize_rows(embeddings)?
        } else {
            embeddings.clone()
        };

        let pools = self.pools(n, semantic_labels)?;

        let device = x.device();
        let mut acc = Accumulator {
            pull: zero_scalar(x.dtype(), device)?,
            push: zero_scalar(x.dtype(), device)?,
            events: BTreeSet::new(),
        };
        for pool in &pools {
            self.pool_loss(&x, pool, instance_labels, subbatch, &mut acc)?;
        }

        let total = (&acc.pull + &acc.push).map_err(map_candle)?;
        let components = CentroidLossComponents {
            pull: tensor_to_f32(&acc.pull)?,
            push: tensor_to_f32(&acc.push)?,
            total: tensor_to_f32(&total)?,
            events: acc.events.len(),
        };
        debug!(
            method = self.method.as_str(),
            pools = pools.len(),
            events = components.events,
            total = components.total,
            "Centroid loss"
        );

        Ok((total, components))
    }

    /// [`compute`](Self::compute) with the per-hit arrays taken from a batch.
    ///
    /// `embeddings` is the network output for `batch`, so gradients flow
    /// through it; the batch's own embedding copy is not read.
    ///
    /// # Errors
    /// - `InvalidInput` if the batch carries no instance labels
    /// - whatever [`HitBatch::validate`] or [`compute`](Self::compute) reports
    pub fn compute_batch(
        &self,
        embeddings: &Tensor,
        batch: &HitBatch<'_>,
    ) -> CaloResult<(Tensor, CentroidLossComponents)> {
        batch.validate()?;
        let instance_labels = batch
            .instance_labels
            .ok_or_else(|| CaloError::invalid_input("batch carries no instance labels"))?;
        self.compute(
            embeddings,
            instance_labels,
            batch.subbatch_indices,
            None,
            batch.semantic_labels,
        )
    }

    /// Hit positions forming each independent loss pool.
    fn pools(&self, n: usize, semantic_labels: Option<&[i64]>) -> CaloResult<Vec<Vec<usize>>> {
        if self.method == LossMethod::All {
            return Ok(vec![(0..n).collect()]);
        }

        let semantic = semantic_labels.ok_or_else(|| {
            CaloError::invalid_input(format!(
                "semantic labels are required for method = \"{}\"",
                self.method.as_str()
            ))
        })?;

        match self.method {
            LossMethod::Ignore => Ok(vec![(0..n)
                .filter(|&i| !self.ignore_labels.contains(&semantic[i]))
                .collect()]),
            _ => Ok(group_by_label(semantic)
                .into_iter()
                .filter(|(class, _)| !self.ignore_labels.contains(class))
                .map(|(_, positions)| positions)
                .collect()),
        }
    }

    /// Add one pool's loss. The pool's event count is taken over the events
    /// present in the pool.
    fn pool_loss(
        &self,
        x: &Tensor,
        pool: &[usize],
        instance_labels: &[i64],
        subbatch: &[i64],
        acc: &mut Accumulator,
    ) -> CaloResult<()> {
        let pool_events: Vec<i64> = pool.iter().map(|&i| subbatch[i]).collect();
        let events = group_by_label(&pool_events);
        let b = events.len() as f64;

        for (event, local) in events {
            let positions: Vec<usize> = local.iter().map(|&k| pool[k]).collect();
            let labels: Vec<i64> = positions.iter().map(|&i| instance_labels[i]).collect();
            let instances: Vec<Vec<usize>> = group_by_label(&labels)
                .into_values()
                .map(|members| members.iter().map(|&k| positions[k]).collect())
                .collect();

            let (pull, push) = self.event_loss(x, &instances)?;
            let pull = pull.affine(1.0 / b, 0.0).map_err(map_candle)?;
            acc.pull = (&acc.pull + &pull).map_err(map_candle)?;
            if let Some(push) = push {
                let push = push.affine(1.0 / b, 0.0).map_err(map_candle)?;
                acc.push = (&acc.push + &push).map_err(map_candle)?;
            }

            if tracing::enabled!(Level::DEBUG) {
                debug!(
                    event,
                    hits = positions.len(),
                    instances = instances.len(),
                    pull = tensor_to_f32(&pull)?,
                    "Event centroid loss"
                );
            }
            acc.events.insert(event);
        }
        Ok(())
    }

    /// Pull and (for more than one instance) push terms of one event.
    fn event_loss(&self, x: &Tensor, instances: &[Vec<usize>]) -> CaloResult<(Tensor, Option<Tensor>)> {
        let device: &Device = x.device();
        let m = instances.len();

        let mut pull = zero_scalar(x.dtype(), device)?;
        let mut mus = Vec::with_capacity(m);
        for members in instances {
            let nm = members.len();
            let xm = x
                .index_select(&index_tensor(members, device)?, 0)
                .map_err(map_candle)?; // [Nm, D]
            let mu = xm.mean_keepdim(0).map_err(map_candle)?; // [1, D]

            let term = xm
                .broadcast_sub(&mu)
                .map_err(map_candle)?
                .abs()
                .map_err(map_candle)?
                .sum(1)
                .map_err(map_candle)?
                .affine(1.0, -(self.delta_v as f64))
                .map_err(map_candle)?
                .relu()
                .map_err(map_candle)?
                .sqr()
                .map_err(map_candle)?
                .sum_all()
                .map_err(map_candle)?
                .affine(1.0 / (m * nm) as f64, 0.0)
                .map_err(map_candle)?;
            pull = (&pull + &term).map_err(map_candle)?;
            mus.push(mu);
        }

        if m < 2 {
            return Ok((pull, None));
        }

        let mus = Tensor::cat(&mus, 0).map_err(map_candle)?; // [M, D]
        let pairwise = mus
            .unsqueeze(1)
            .map_err(map_candle)?
            .broadcast_sub(&mus.unsqueeze(0).map_err(map_candle)?)
            .map_err(map_candle)?
            .abs()
            .map_err(map_candle)?
            .sum(2)
            .map_err(map_candle)?; // [M, M]
        let hinge = pairwise
            .affine(-1.0, 2.0 * self.delta_d as f64)
            .map_err(map_candle)?
            .relu()
            .map_err(map_candle)?;
        let push = hinge
            .mul(&off_diagonal_mask(m, x.dtype(), device)?)
            .map_err(map_candle)?
            .sqr()
            .map_err(map_candle)?
            .sum_all()
            .map_err(map_candle)?
            .affine(1.0 / (m * (m - 1)) as f64, 0.0)
            .map_err(map_candle)?;

        Ok((pull, Some(push)))
    }
}
