//! Closed set of clustering strategies, built from configuration.

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use super::clusterer::Clusterer;
use super::identity::IdentityClusterer;
use super::meanshift::{MeanShift, MeanShiftBackend};
use super::partitioned::SemanticMeanShift;
use crate::config::{ClusteringConfig, StrategyKind};
use crate::error::CaloResult;
use crate::types::{group_by_label, Embeddings, HitBatch};

/// Every available clustering strategy.
#[derive(Debug, Clone)]
pub enum ClusteringStrategy {
    Identity(IdentityClusterer),
    MeanShift(SemanticMeanShift),
}

impl ClusteringStrategy {
    /// Build the strategy a config section describes.
    ///
    /// # Errors
    ///
    /// Whatever [`ClusteringConfig::validate`] reports.
    pub fn from_config(config: &ClusteringConfig) -> CaloResult<Self> {
        config.validate()?;
        let strategy = match config.strategy {
            StrategyKind::Identity => Self::Identity(IdentityClusterer),
            StrategyKind::MeanShift => {
                let backend = MeanShiftBackend::from_use_gpu(config.use_gpu);
                let mean_shift = MeanShift::new(config.mean_shift.clone(), backend)?;
                let mut partitioned =
                    SemanticMeanShift::new(mean_shift).with_use_semantic(config.use_semantic);
                if let Some(ignore) = &config.ignore_semantic_labels {
                    partitioned = partitioned.with_ignore_semantic_labels(ignore.iter().copied());
                }
                Self::MeanShift(partitioned)
            }
        };
        info!(strategy = strategy.name(), "Clustering strategy ready");
        Ok(strategy)
    }

    /// Cluster every event of a batch independently.
    ///
    /// Events are the distinct subbatch indices; without them the whole batch
    /// is one event. Labels are written back in batch order and are unique
    /// only within their event.
    #[instrument(skip_all, fields(strategy = self.name(), hits = batch.len()))]
    pub fn cluster_batch(&self, batch: &HitBatch<'_>) -> CaloResult<Vec<i64>> {
        batch.validate()?;
        let Some(subbatch) = batch.subbatch_indices else {
            return self.cluster(batch.embeddings, batch.semantic_labels);
        };

        let events: Vec<(i64, Vec<usize>)> = group_by_label(subbatch).into_iter().collect();
        debug!(events = events.len(), "Clustering batch");

        let per_event: Vec<Vec<i64>> = events
            .par_iter()
            .map(|(_, positions)| {
                let embeddings: Embeddings = batch.embeddings.select(positions);
                let semantic: Option<Vec<i64>> = batch
                    .semantic_labels
                    .map(|labels| positions.iter().map(|&i| labels[i]).collect());
                self.cluster(&embeddings, semantic.as_deref())
            })
            .collect::<CaloResult<_>>()?;

        let mut labels = vec![0i64; batch.len()];
        for ((_, positions), event_labels) in events.iter().zip(per_event) {
            for (&pos, label) in positions.iter().zip(event_labels) {
                labels[pos] = label;
            }
        }
        Ok(labels)
    }
}

impl Clusterer for ClusteringStrategy {
    fn cluster(
        &self,
        embeddings: &Embeddings,
        semantic_labels: Option<&[i64]>,
    ) -> CaloResult<Vec<i64>> {
        match self {
            Self::Identity(s) => s.cluster(embeddings, semantic_labels),
            Self::MeanShift(s) => s.cluster(embeddings, semantic_labels),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Identity(s) => s.name(),
            Self::MeanShift(s) => s.name(),
        }
    }
}
