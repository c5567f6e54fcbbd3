//! Event-wide unique instance labels from per-class labels.

use crate::error::{CaloError, CaloResult};
use crate::types::{check_labels, check_len, group_by_label, UNASSIGNED_LABEL};

/// Offset per-class instance labels so they are unique within the event.
///
/// Classes are visited in ascending semantic label. Each class's assigned
/// labels are shifted by a running offset, which then grows by that class's
/// largest label plus one. Unassigned hits keep `-1`.
///
/// ```
/// use calo_cluster_core::clustering::disambiguate_partition_labels;
///
/// let instance = [0, 1, 0, -1, 0];
/// let semantic = [2, 2, 5, 7, 2];
/// let unique = disambiguate_partition_labels(&instance, &semantic).unwrap();
/// assert_eq!(unique, vec![0, 1, 2, -1, 0]);
/// ```
///
/// # Errors
///
/// - `LengthMismatch` if the arrays differ in length
/// - `InvalidInput` if a semantic label is negative or an instance label is
///   below `-1`
pub fn disambiguate_partition_labels(
    instance_labels: &[i64],
    semantic_labels: &[i64],
) -> CaloResult<Vec<i64>> {
    check_len("instance_labels", instance_labels, semantic_labels.len())?;
    check_labels("semantic_labels", semantic_labels, semantic_labels.len())?;
    if let Some(&l) = instance_labels.iter().find(|&&l| l < UNASSIGNED_LABEL) {
        return Err(CaloError::invalid_input(format!(
            "instance label {} is neither assigned nor {}",
            l, UNASSIGNED_LABEL
        )));
    }

    let mut out = instance_labels.to_vec();
    let mut offset = 0i64;
    for positions in group_by_label(semantic_labels).values() {
        let max_label = positions
            .iter()
            .map(|&i| instance_labels[i])
            .filter(|&l| l != UNASSIGNED_LABEL)
            .max();
        let Some(max_label) = max_label else {
            continue;
        };
        for &i in positions {
            if out[i] != UNASSIGNED_LABEL {
                out[i] += offset;
            }
        }
        offset += max_label + 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_labels_become_unique_across_classes() {
        let instance = [0, 1, 0, 0, 1, 2];
        let semantic = [1, 1, 2, 3, 3, 3];
        let unique = disambiguate_partition_labels(&instance, &semantic).unwrap();
        assert_eq!(unique, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unassigned_and_fully_ignored_classes() {
        let instance = [-1, -1, 0, 1, 0];
        let semantic = [0, 0, 1, 1, 2];
        let unique = disambiguate_partition_labels(&instance, &semantic).unwrap();
        assert_eq!(unique, vec![-1, -1, 0, 1, 2]);
    }

    #[test]
    fn test_distinct_per_class_pairs_map_to_distinct_labels() {
        let instance = [0, 0, 1, 0, 1, 1, 0];
        let semantic = [4, 9, 4, 9, 9, 4, 4];
        let unique = disambiguate_partition_labels(&instance, &semantic).unwrap();
        let pairs: BTreeSet<(i64, i64)> = semantic.iter().copied().zip(instance).collect();
        let labels: BTreeSet<i64> = unique.iter().copied().collect();
        assert_eq!(pairs.len(), labels.len());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(disambiguate_partition_labels(&[0, 1], &[0]).is_err());
        assert!(disambiguate_partition_labels(&[0], &[-1]).is_err());
        assert!(disambiguate_partition_labels(&[-2], &[0]).is_err());
    }
}
