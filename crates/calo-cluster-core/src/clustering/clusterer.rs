//! The clustering contract shared by every strategy.

use crate::error::{CaloError, CaloResult};
use crate::types::{check_labels, Embeddings};

/// Assigns an instance label to every hit.
///
/// Implementations are pure: the same embeddings, semantic labels and
/// configuration always produce the same labels. `-1` marks a hit that was
/// not assigned to any instance.
pub trait Clusterer: Send + Sync {
    /// Cluster one event.
    ///
    /// # Errors
    ///
    /// - `LengthMismatch` if `semantic_labels` does not have one entry per hit
    /// - `InvalidInput` if a semantic label is negative, or the strategy
    ///   needs semantic labels and none were given
    fn cluster(&self, embeddings: &Embeddings, semantic_labels: Option<&[i64]>)
        -> CaloResult<Vec<i64>>;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Base contract checks on the optional semantic labels.
pub(crate) fn validate_semantic(
    embeddings: &Embeddings,
    semantic_labels: Option<&[i64]>,
) -> CaloResult<()> {
    if let Some(labels) = semantic_labels {
        check_labels("semantic_labels", labels, embeddings.len())?;
    }
    Ok(())
}

/// Unwrap semantic labels for a strategy that requires them.
pub(crate) fn require_semantic<'a>(
    embeddings: &Embeddings,
    semantic_labels: Option<&'a [i64]>,
) -> CaloResult<&'a [i64]> {
    let labels = semantic_labels.ok_or_else(|| {
        CaloError::invalid_input("semantic labels are required when use_semantic is enabled")
    })?;
    check_labels("semantic_labels", labels, embeddings.len())?;
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_hits() -> Embeddings {
        Embeddings::new(vec![0.0, 1.0, 2.0], 1).unwrap()
    }

    #[test]
    fn test_absent_semantic_is_fine_unless_required() {
        let e = three_hits();
        assert!(validate_semantic(&e, None).is_ok());
        let err = require_semantic(&e, None).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_length_mismatch() {
        let e = three_hits();
        let err = validate_semantic(&e, Some(&[0, 1])).unwrap_err();
        assert!(matches!(
            err,
            CaloError::LengthMismatch {
                what: "semantic_labels",
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_reserved_label_rejected() {
        let e = three_hits();
        assert!(require_semantic(&e, Some(&[0, -1, 1])).unwrap_err().is_invalid_input());
    }
}
