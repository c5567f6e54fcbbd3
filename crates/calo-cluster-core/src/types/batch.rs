//! Borrowed view over one batch of hits.

use super::embeddings::Embeddings;
use super::labels::{check_labels, check_len};
use crate::error::CaloResult;

/// One batch of hits as handed over by the embedding producer.
///
/// Every optional array runs parallel to `embeddings`.
#[derive(Debug, Clone, Copy)]
pub struct HitBatch<'a> {
    /// Per-hit embedding vectors.
    pub embeddings: &'a Embeddings,
    /// Semantic class per hit.
    pub semantic_labels: Option<&'a [i64]>,
    /// Ground-truth instance per hit, unique only within an event.
    pub instance_labels: Option<&'a [i64]>,
    /// Event index per hit. Absent means the whole batch is one event.
    pub subbatch_indices: Option<&'a [i64]>,
    /// Per-hit offset vectors, row-major `N x 3`.
    pub offsets: Option<&'a [[f32; 3]]>,
}

impl<'a> HitBatch<'a> {
    /// A batch holding only embeddings.
    pub fn new(embeddings: &'a Embeddings) -> Self {
        Self {
            embeddings,
            semantic_labels: None,
            instance_labels: None,
            subbatch_indices: None,
            offsets: None,
        }
    }

    #[must_use]
    pub fn with_semantic_labels(mut self, labels: &'a [i64]) -> Self {
        self.semantic_labels = Some(labels);
        self
    }

    #[must_use]
    pub fn with_instance_labels(mut self, labels: &'a [i64]) -> Self {
        self.instance_labels = Some(labels);
        self
    }

    #[must_use]
    pub fn with_subbatch_indices(mut self, indices: &'a [i64]) -> Self {
        self.subbatch_indices = Some(indices);
        self
    }

    #[must_use]
    pub fn with_offsets(mut self, offsets: &'a [[f32; 3]]) -> Self {
        self.offsets = Some(offsets);
        self
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Enforce the upstream contract: equal lengths, non-negative labels,
    /// finite offsets. Embedding finiteness is guaranteed by [`Embeddings`].
    pub fn validate(&self) -> CaloResult<()> {
        let n = self.len();
        if let Some(labels) = self.semantic_labels {
            check_labels("semantic_labels", labels, n)?;
        }
        if let Some(labels) = self.instance_labels {
            check_labels("instance_labels", labels, n)?;
        }
        if let Some(indices) = self.subbatch_indices {
            check_labels("subbatch_indices", indices, n)?;
        }
        if let Some(offsets) = self.offsets {
            check_len("offsets", offsets, n)?;
            if offsets.iter().flatten().any(|v| !v.is_finite()) {
                return Err(crate::error::CaloError::invalid_input(
                    "offsets must be finite",
                ));
            }
        }
        Ok(())
    }
}
