//! Hit, embedding and label types shared by clustering and losses.

mod batch;
mod embeddings;
mod labels;

pub use batch::HitBatch;
pub use embeddings::{
    cosine_distance, cosine_similarity, euclidean_distance, l2_norm, Embeddings, NORM_EPS,
};
pub use labels::{check_labels, check_len, group_by_label, UNASSIGNED_LABEL};
