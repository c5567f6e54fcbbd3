//! Small tensor helpers shared by the losses.

use candle_core::{DType, Device, Tensor};

use calo_cluster_core::types::NORM_EPS;
use calo_cluster_core::{CaloError, CaloResult};

/// Map candle errors to CaloError.
pub(crate) fn map_candle(e: candle_core::Error) -> CaloError {
    CaloError::TensorError {
        message: format!("Loss computation error: {}", e),
    }
}

/// Extract a scalar f32 from a 0-dim or 1-element tensor.
pub(crate) fn tensor_to_f32(t: &Tensor) -> CaloResult<f32> {
    let flat = t
        .to_dtype(DType::F32)
        .map_err(map_candle)?
        .flatten_all()
        .map_err(map_candle)?;
    let val: f32 = flat.to_vec1::<f32>().map_err(map_candle)?[0];
    Ok(val)
}

/// Row-wise `x / (||x||_2 + 1e-8)` for an `[N, D]` tensor.
pub(crate) fn normalize_rows(x: &Tensor) -> CaloResult<Tensor> {
    let norm = x
        .sqr()
        .map_err(map_candle)?
        .sum_keepdim(1)
        .map_err(map_candle)?
        .sqrt()
        .map_err(map_candle)?
        .affine(1.0, NORM_EPS as f64)
        .map_err(map_candle)?;
    x.broadcast_div(&norm).map_err(map_candle)
}

/// Host positions as a `u32` index tensor for `index_select`.
pub(crate) fn index_tensor(positions: &[usize], device: &Device) -> CaloResult<Tensor> {
    let idx: Vec<u32> = positions.iter().map(|&i| i as u32).collect();
    Tensor::from_vec(idx, positions.len(), device).map_err(map_candle)
}

/// `[M, M]` mask with zeros on the diagonal and ones elsewhere.
pub(crate) fn off_diagonal_mask(m: usize, dtype: DType, device: &Device) -> CaloResult<Tensor> {
    let data: Vec<f32> = (0..m * m)
        .map(|k| if k / m == k % m { 0.0 } else { 1.0 })
        .collect();
    Tensor::from_vec(data, (m, m), device)
        .map_err(map_candle)?
        .to_dtype(dtype)
        .map_err(map_candle)
}

/// Scalar zero with the given dtype.
pub(crate) fn zero_scalar(dtype: DType, device: &Device) -> CaloResult<Tensor> {
    Tensor::zeros((), dtype, device).map_err(map_candle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rows() {
        let x = Tensor::new(&[[3.0f32, 4.0], [0.0, 0.0]], &Device::Cpu).unwrap();
        let n = normalize_rows(&x).unwrap().to_vec2::<f32>().unwrap();
        assert!((n[0][0] - 0.6).abs() < 1e-6);
        assert!((n[0][1] - 0.8).abs() < 1e-6);
        assert_eq!(n[1], vec![0.0, 0.0]);
    }

    #[test]
    fn test_off_diagonal_mask() {
        let mask = off_diagonal_mask(3, DType::F32, &Device::Cpu)
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(
            mask,
            vec![vec![0.0, 1.0, 1.0], vec![1.0, 0.0, 1.0], vec![1.0, 1.0, 0.0]]
        );
    }

    #[test]
    fn test_index_tensor_selects_rows() {
        let x = Tensor::new(&[[1.0f32], [2.0], [3.0]], &Device::Cpu).unwrap();
        let idx = index_tensor(&[2, 0], &Device::Cpu).unwrap();
        let picked = x.index_select(&idx, 0).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(picked, vec![vec![3.0], vec![1.0]]);
    }

    #[test]
    fn test_scalar_extraction() {
        let t = zero_scalar(DType::F64, &Device::Cpu).unwrap();
        assert_eq!(tensor_to_f32(&t).unwrap(), 0.0);
    }

    #[test]
    fn test_map_candle_keeps_message() {
        let err = map_candle(candle_core::Error::Msg("shape".to_string()));
        assert!(err.to_string().contains("Loss computation error: shape"));
    }
}
