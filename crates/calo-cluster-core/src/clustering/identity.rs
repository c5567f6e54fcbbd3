//! Passthrough strategy for embeddings that already are instance labels.

use super::clusterer::{validate_semantic, Clusterer};
use crate::error::{CaloError, CaloResult};
use crate::types::Embeddings;

/// Largest magnitude at which every integer is exactly representable in f32.
pub const MAX_EXACT_LABEL: f32 = 16_777_216.0;

/// Returns the embedding itself as the instance labels.
///
/// The embedding must be a single column of integral values no larger than
/// [`MAX_EXACT_LABEL`] in magnitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityClusterer;

impl Clusterer for IdentityClusterer {
    fn cluster(
        &self,
        embeddings: &Embeddings,
        semantic_labels: Option<&[i64]>,
    ) -> CaloResult<Vec<i64>> {
        validate_semantic(embeddings, semantic_labels)?;
        if embeddings.dim() != 1 {
            return Err(CaloError::dimension_mismatch(1, embeddings.dim()));
        }
        embeddings
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                if v.fract() != 0.0 {
                    return Err(CaloError::invalid_input(format!(
                        "identity clustering needs integral labels, found {} at hit {}",
                        v, i
                    )));
                }
                if v.abs() > MAX_EXACT_LABEL {
                    return Err(CaloError::invalid_input(format!(
                        "identity label {} at hit {} exceeds the exact f32 integer range",
                        v, i
                    )));
                }
                Ok(v as i64)
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}
