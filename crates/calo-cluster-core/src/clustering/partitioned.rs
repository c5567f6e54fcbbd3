//! Mean-shift run independently inside each semantic class.

use std::collections::BTreeSet;

use tracing::debug;

use super::clusterer::{require_semantic, validate_semantic, Clusterer};
use super::meanshift::MeanShift;
use crate::error::{CaloError, CaloResult};
use crate::types::{group_by_label, Embeddings, UNASSIGNED_LABEL};

/// Semantic-partitioned cosine mean-shift.
///
/// With `use_semantic` off, one mean-shift run covers every hit. With it on,
/// each non-ignored semantic class is clustered on its own and hits of
/// ignored classes keep `-1`.
///
/// Instance labels are only unique within one semantic class: two classes
/// both start numbering at 0. Use
/// [`disambiguate_partition_labels`](super::disambiguate_partition_labels)
/// for event-wide unique labels.
#[derive(Debug, Clone)]
pub struct SemanticMeanShift {
    mean_shift: MeanShift,
    use_semantic: bool,
    ignore_semantic_labels: Option<BTreeSet<i64>>,
}

impl SemanticMeanShift {
    /// Mean-shift over all hits, no semantic partitioning.
    pub fn new(mean_shift: MeanShift) -> Self {
        Self {
            mean_shift,
            use_semantic: false,
            ignore_semantic_labels: None,
        }
    }

    #[must_use]
    pub fn with_use_semantic(mut self, use_semantic: bool) -> Self {
        self.use_semantic = use_semantic;
        self
    }

    #[must_use]
    pub fn with_ignore_semantic_labels(mut self, labels: impl IntoIterator<Item = i64>) -> Self {
        self.ignore_semantic_labels = Some(labels.into_iter().collect());
        self
    }

    pub fn mean_shift(&self) -> &MeanShift {
        &self.mean_shift
    }

    pub fn use_semantic(&self) -> bool {
        self.use_semantic
    }

    pub fn ignore_semantic_labels(&self) -> Option<&BTreeSet<i64>> {
        self.ignore_semantic_labels.as_ref()
    }
}

impl Clusterer for SemanticMeanShift {
    fn cluster(
        &self,
        embeddings: &Embeddings,
        semantic_labels: Option<&[i64]>,
    ) -> CaloResult<Vec<i64>> {
        if !self.use_semantic {
            validate_semantic(embeddings, semantic_labels)?;
            return Ok(self.mean_shift.fit(embeddings)?.labels);
        }

        let semantic = require_semantic(embeddings, semantic_labels)?;
        let ignore = self.ignore_semantic_labels.as_ref().ok_or_else(|| {
            CaloError::config("ignore_semantic_labels must be set when use_semantic is enabled")
        })?;

        let mut labels = vec![UNASSIGNED_LABEL; embeddings.len()];
        for (class, positions) in group_by_label(semantic) {
            if ignore.contains(&class) {
                debug!(semantic_label = class, hits = positions.len(), "Skipping ignored class");
                continue;
            }
            let outcome = self.mean_shift.fit(&embeddings.select(&positions))?;
            debug!(
                semantic_label = class,
                hits = positions.len(),
                instances = outcome.n_modes(),
                "Clustered semantic partition"
            );
            for (&pos, label) in positions.iter().zip(outcome.labels) {
                labels[pos] = label;
            }
        }
        Ok(labels)
    }

    fn name(&self) -> &'static str {
        "mean_shift"
    }
}
