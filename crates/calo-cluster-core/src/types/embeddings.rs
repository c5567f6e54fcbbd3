//! Dense per-hit embedding matrix.

use candle_core::{Device, Tensor};

use crate::error::{CaloError, CaloResult};

/// Stabilizer added to vector norms before division.
pub const NORM_EPS: f32 = 1e-8;

/// Row-major `N x D` matrix of per-hit embedding vectors.
///
/// Construction rejects ragged rows, zero dimension and non-finite values,
/// so every `Embeddings` satisfies the upstream contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    data: Vec<f32>,
    rows: usize,
    dim: usize,
}

impl Embeddings {
    /// Build from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `dim == 0`, `data.len()` is not a multiple of `dim`,
    /// or a value is NaN/Inf.
    pub fn new(data: Vec<f32>, dim: usize) -> CaloResult<Self> {
        if dim == 0 {
            return Err(CaloError::invalid_input("embedding dimension must be > 0"));
        }
        if data.len() % dim != 0 {
            return Err(CaloError::invalid_input(format!(
                "buffer of {} values is not a whole number of {}-dimensional rows",
                data.len(),
                dim
            )));
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(CaloError::invalid_input(format!(
                "embedding value at row {} is not finite",
                pos / dim
            )));
        }
        let rows = data.len() / dim;
        Ok(Self { data, rows, dim })
    }

    /// Build from one vector per hit.
    ///
    /// An empty slice yields an empty matrix of dimension 1.
    pub fn from_rows(rows: &[Vec<f32>]) -> CaloResult<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self {
                data: Vec::new(),
                rows: 0,
                dim: 1,
            });
        };
        let dim = first.len();
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(CaloError::dimension_mismatch(dim, row.len()));
            }
            data.extend_from_slice(row);
        }
        Self::new(data, dim)
    }

    /// Copy a `(N, D)` f32 tensor to the host.
    pub fn from_tensor(tensor: &Tensor) -> CaloResult<Self> {
        let (rows, dim) = tensor.dims2()?;
        let data = tensor
            .to_dtype(candle_core::DType::F32)?
            .flatten_all()?
            .to_vec1::<f32>()?;
        if rows == 0 {
            return Ok(Self {
                data,
                rows,
                dim: dim.max(1),
            });
        }
        Self::new(data, dim)
    }

    /// Number of hits.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Embedding dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embedding of hit `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterate over the hit embeddings in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dim)
    }

    /// Flat row-major view.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Gather the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.dim);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            data,
            rows: indices.len(),
            dim: self.dim,
        }
    }

    /// Copy with every row scaled to unit L2 norm (`x / (||x|| + eps)`).
    pub fn normalized(&self) -> Self {
        let mut data = self.data.clone();
        for row in data.chunks_exact_mut(self.dim) {
            let norm = l2_norm(row) + NORM_EPS;
            row.iter_mut().for_each(|v| *v /= norm);
        }
        Self {
            data,
            rows: self.rows,
            dim: self.dim,
        }
    }

    /// Upload to a `(N, D)` f32 tensor on `device`.
    pub fn to_tensor(&self, device: &Device) -> CaloResult<Tensor> {
        Ok(Tensor::from_slice(&self.data, (self.rows, self.dim), device)?)
    }
}

/// L2 norm of a vector.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with the norm stabilizer applied to the denominator.
///
/// Zero vectors have similarity 0 with everything.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (l2_norm(a) * l2_norm(b) + NORM_EPS)
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`.
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Euclidean distance between two vectors of equal length.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_and_accessors() {
        let e = Embeddings::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(e.len(), 3);
        assert_eq!(e.dim(), 2);
        assert_eq!(e.row(1), &[3.0, 4.0]);
        assert_eq!(e.rows().count(), 3);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Embeddings::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(CaloError::DimensionMismatch { expected: 2, actual: 1 })));
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = Embeddings::new(vec![1.0, f32::NAN, 0.0, 0.0], 2);
        assert!(matches!(result, Err(CaloError::InvalidInput { .. })));
        let result = Embeddings::new(vec![f32::INFINITY], 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_dim_rejected() {
        assert!(Embeddings::new(vec![], 0).is_err());
    }

    #[test]
    fn test_select_preserves_order() {
        let e = Embeddings::new(vec![0.0, 1.0, 2.0, 3.0], 1).unwrap();
        let s = e.select(&[3, 0]);
        assert_eq!(s.as_slice(), &[3.0, 0.0]);
    }

    #[test]
    fn test_normalized_rows_have_unit_norm() {
        let e = Embeddings::from_rows(&[vec![3.0, 4.0], vec![0.0, 0.5]]).unwrap();
        let n = e.normalized();
        for row in n.rows() {
            assert!((l2_norm(row) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_normalized_zero_row_stays_zero() {
        let e = Embeddings::from_rows(&[vec![0.0, 0.0]]).unwrap();
        assert_eq!(e.normalized().row(0), &[0.0, 0.0]);
    }

    #[test]
    fn test_cosine_distance_is_scale_free() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0, 30.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vectors_are_cosine_far_but_euclidean_equal() {
        let zero = [0.0, 0.0];
        assert!((cosine_distance(&zero, &zero) - 1.0).abs() < 1e-6);
        assert_eq!(euclidean_distance(&zero, &zero), 0.0);
        assert!((euclidean_distance(&[3.0, 0.0], &[0.0, 4.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_tensor_round_trip() {
        let e = Embeddings::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let t = e.to_tensor(&Device::Cpu).unwrap();
        assert_eq!(t.dims(), &[2, 2]);
        assert_eq!(Embeddings::from_tensor(&t).unwrap(), e);
    }
}
