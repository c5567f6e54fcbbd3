//! Instance clustering of calorimeter hits.
//!
//! Hits carry a learned embedding and optionally a semantic class. This crate
//! turns embeddings into per-event instance labels.
//!
//! # Architecture
//!
//! - **Embeddings**: validated `N x D` embedding matrix
//! - **Clusterer**: trait every strategy implements
//! - **ClusteringStrategy**: identity passthrough or semantic-partitioned
//!   cosine mean-shift, built from [`ClusteringConfig`]
//! - **MeanShift**: the cosine mean-shift primitive, on a rayon CPU backend or
//!   a candle tensor backend
//!
//! # Example
//!
//! ```rust
//! use calo_cluster_core::{Clusterer, ClusteringConfig, ClusteringStrategy, Embeddings};
//!
//! let strategy = ClusteringStrategy::from_config(&ClusteringConfig::default()).unwrap();
//! let hits = Embeddings::from_rows(&[vec![1.0, 0.0], vec![0.99, 0.02], vec![0.0, 1.0]]).unwrap();
//! let labels = strategy.cluster(&hits, None).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

pub mod clustering;
pub mod config;
pub mod device;
pub mod error;
pub mod types;

pub use clustering::{
    disambiguate_partition_labels, Clusterer, ClusteringStrategy, IdentityClusterer, MeanShift,
    MeanShiftBackend, MeanShiftKernel, MeanShiftOutcome, MeanShiftParams, SemanticMeanShift,
};
pub use config::{
    CaloClusterConfig, CentroidLossConfig, ClusteringConfig, LossMethod, OffsetLossConfig,
    StrategyKind,
};
pub use device::{new_device, select_device, DevicePlatform};
pub use error::{CaloError, CaloResult};
pub use types::{Embeddings, HitBatch, UNASSIGNED_LABEL};
