//! Hit clustering: the [`Clusterer`] contract and its strategies.
//!
//! | Strategy | Type | Notes |
//! |----------|------|-------|
//! | Identity | [`IdentityClusterer`] | embeddings already are labels |
//! | Mean-shift | [`SemanticMeanShift`] | cosine mean-shift, optionally per semantic class |
//!
//! [`ClusteringStrategy`] is the configured choice between them.

mod clusterer;
mod identity;
pub mod meanshift;
mod partitioned;
mod relabel;
mod strategy;

pub use clusterer::Clusterer;
pub use identity::{IdentityClusterer, MAX_EXACT_LABEL};
pub use meanshift::{
    MeanShift, MeanShiftBackend, MeanShiftKernel, MeanShiftOutcome, MeanShiftParams,
};
pub use partitioned::SemanticMeanShift;
pub use relabel::disambiguate_partition_labels;
pub use strategy::ClusteringStrategy;
