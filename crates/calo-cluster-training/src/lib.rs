//! Training losses that shape embeddings for instance clustering.
//!
//! The centroid loss makes each instance a tight ball (radius `delta_v`)
//! with balls at least `2 * delta_d` apart, which is the geometry the
//! mean-shift clustering in `calo-cluster-core` relies on.
//!
//! # Example
//!
//! ```rust
//! use calo_cluster_training::CentroidInstanceLoss;
//! use calo_cluster_core::{CentroidLossConfig, LossMethod};
//! use candle_core::{Device, Tensor};
//!
//! let config = CentroidLossConfig { normalize: false, method: LossMethod::All, ..Default::default() };
//! let loss_fn = CentroidInstanceLoss::from_config(&config).unwrap();
//! let x = Tensor::new(&[[0.0f32, 0.0], [2.0, 2.0], [0.0, 0.0], [1.0, 1.0], [0.0, 0.0]], &Device::Cpu).unwrap();
//! let (_loss, parts) = loss_fn.compute(&x, &[2, 0, 2, 1, 2], None, None, None).unwrap();
//! assert!((parts.total - 2.0 / 3.0).abs() < 1e-6);
//! ```

pub mod loss;

pub use loss::{
    offset_loss, CentroidInstanceLoss, CentroidLossComponents, OffsetInstanceLoss, OFFSET_EPS,
};
