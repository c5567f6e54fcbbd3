//! Initial shifting points.

use std::collections::HashMap;

use crate::types::Embeddings;

/// Flat row-major set of shifting points.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Seeds {
    pub data: Vec<f32>,
    pub dim: usize,
}

impl Seeds {
    /// One seed per input vector.
    pub fn from_points(points: &Embeddings) -> Self {
        Self {
            data: points.as_slice().to_vec(),
            dim: points.dim(),
        }
    }

    /// One seed per occupied grid cell, positioned at the mean of the
    /// inputs in that cell. Cells are ordered by first occurrence.
    pub fn binned(points: &Embeddings, bin_size: f32) -> Self {
        let dim = points.dim();
        let mut cell_of: HashMap<Vec<i64>, usize> = HashMap::new();
        let mut sums: Vec<Vec<f32>> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();

        for row in points.rows() {
            let key: Vec<i64> = row.iter().map(|v| (v / bin_size).round() as i64).collect();
            let cell = *cell_of.entry(key).or_insert_with(|| {
                sums.push(vec![0.0; dim]);
                counts.push(0);
                sums.len() - 1
            });
            sums[cell].iter_mut().zip(row).for_each(|(s, v)| *s += v);
            counts[cell] += 1;
        }

        let mut data = Vec::with_capacity(sums.len() * dim);
        for (sum, count) in sums.iter().zip(&counts) {
            data.extend(sum.iter().map(|s| s / *count as f32));
        }
        Self { data, dim }
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    #[cfg(test)]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binned_collapses_close_points() {
        let points = Embeddings::from_rows(&[
            vec![1.0, 0.0],
            vec![0.99, 0.01],
            vec![0.0, 1.0],
            vec![0.98, 0.02],
        ])
        .unwrap();
        let seeds = Seeds::binned(&points, 0.5);
        assert_eq!(seeds.len(), 2);
        // First-occurrence order: the x-axis cell comes first.
        assert!(seeds.row(0)[0] > 0.9);
        assert!(seeds.row(1)[1] > 0.9);
    }

    #[test]
    fn test_from_points_keeps_every_row() {
        let points = Embeddings::from_rows(&[vec![1.0], vec![1.0], vec![2.0]]).unwrap();
        let seeds = Seeds::from_points(&points);
        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds.rows().nth(2).unwrap(), &[2.0]);
    }
}
