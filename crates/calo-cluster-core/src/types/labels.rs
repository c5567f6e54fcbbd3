//! Label conventions and per-hit array validation.

use std::collections::BTreeMap;

use crate::error::{CaloError, CaloResult};

/// Instance label of a hit that was not assigned to any cluster.
///
/// Reserved: never valid as an input label.
pub const UNASSIGNED_LABEL: i64 = -1;

/// Check that a per-hit array has exactly `expected` entries.
pub fn check_len<T>(what: &'static str, values: &[T], expected: usize) -> CaloResult<()> {
    if values.len() != expected {
        return Err(CaloError::length_mismatch(what, expected, values.len()));
    }
    Ok(())
}

/// Check length and that every label is non-negative.
pub fn check_labels(what: &'static str, labels: &[i64], expected: usize) -> CaloResult<()> {
    check_len(what, labels, expected)?;
    if let Some((i, l)) = labels.iter().enumerate().find(|&(_, &l)| l < 0) {
        return Err(CaloError::invalid_input(format!(
            "{} must be non-negative, found {} at hit {}",
            what, l, i
        )));
    }
    Ok(())
}

/// Group hit positions by key, keys ascending, positions in input order.
pub fn group_by_label(keys: &[i64]) -> BTreeMap<i64, Vec<usize>> {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &k) in keys.iter().enumerate() {
        groups.entry(k).or_default().push(i);
    }
    groups
}
