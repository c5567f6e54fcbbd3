//! Instance losses.
//!
//! - [`CentroidInstanceLoss`]: pull hits to their instance centroid, push
//!   centroids apart
//! - [`OffsetInstanceLoss`]: masked L1 between predicted and true offsets

mod centroid;
mod offset;
mod tensor_util;

pub use centroid::{CentroidInstanceLoss, CentroidLossComponents};
pub use offset::{offset_loss, OffsetInstanceLoss, OFFSET_EPS};
