//! Root configuration for clustering and the instance losses.
//!
//! # Loading Configuration
//!
//! ```rust,ignore
//! use calo_cluster_core::CaloClusterConfig;
//!
//! let config = CaloClusterConfig::from_file("calo_cluster.toml")?.with_env_overrides();
//! config.validate()?;
//! ```
//!
//! # TOML Structure
//!
//! ```toml
//! [clustering]
//! strategy = "mean_shift"
//! use_gpu = false
//! use_semantic = true
//! ignore_semantic_labels = [0]
//!
//! [clustering.mean_shift]
//! bandwidth = 0.1
//! max_iter = 300
//! tol = 0.0001
//! kernel = "flat"
//!
//! [centroid_loss]
//! delta_v = 0.5
//! delta_d = 1.5
//! method = "ignore"
//! ignore_labels = [0]
//!
//! [offset_loss]
//! valid_labels = [1, 2]
//! ```
//!
//! Every section and field is optional; missing values take their defaults.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clustering::MeanShiftParams;
use crate::error::{CaloError, CaloResult};

fn check_non_negative_labels(what: &str, labels: &[i64]) -> CaloResult<()> {
    if let Some(l) = labels.iter().find(|&&l| l < 0) {
        return Err(CaloError::config(format!(
            "{} must be non-negative, found {}",
            what, l
        )));
    }
    Ok(())
}

fn check_margin(what: &str, value: f32) -> CaloResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CaloError::config(format!(
            "{} must be a finite value >= 0, got {}",
            what, value
        )));
    }
    Ok(())
}

// ============================================================================
// CLUSTERING CONFIG
// ============================================================================

/// Which clustering strategy to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Embeddings already are instance labels.
    Identity,
    /// Semantic-partitioned cosine mean-shift.
    #[default]
    MeanShift,
}

/// Configuration for the clustering strategy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Run mean-shift on the best available accelerator.
    #[serde(default)]
    pub use_gpu: bool,

    /// Cluster each semantic class separately.
    #[serde(default)]
    pub use_semantic: bool,

    /// Semantic classes left unclustered. Required when `use_semantic`.
    #[serde(default)]
    pub ignore_semantic_labels: Option<Vec<i64>>,

    #[serde(default)]
    pub mean_shift: MeanShiftParams,
}

impl ClusteringConfig {
    /// # Errors
    /// - `CaloError::InvalidParameter` if the mean-shift parameters are invalid
    /// - `CaloError::ConfigError` if `use_semantic` is set without
    ///   `ignore_semantic_labels`, or an ignored label is negative
    pub fn validate(&self) -> CaloResult<()> {
        if self.strategy == StrategyKind::Identity {
            return Ok(());
        }
        self.mean_shift.validate()?;
        if self.use_semantic && self.ignore_semantic_labels.is_none() {
            return Err(CaloError::config(
                "ignore_semantic_labels must be set when use_semantic is enabled",
            ));
        }
        if let Some(labels) = &self.ignore_semantic_labels {
            check_non_negative_labels("ignore_semantic_labels", labels)?;
        }
        Ok(())
    }
}

// ============================================================================
// CENTROID LOSS CONFIG
// ============================================================================

/// How the centroid loss treats semantic classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LossMethod {
    /// Every hit takes part.
    #[default]
    All,
    /// Hits of ignored classes are dropped; the rest form one pool per event.
    Ignore,
    /// Hits of ignored classes are dropped; every remaining class is its own
    /// pool and the per-class losses are summed.
    Separate,
}

impl LossMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LossMethod::All => "all",
            LossMethod::Ignore => "ignore",
            LossMethod::Separate => "separate",
        }
    }
}

fn default_delta_v() -> f32 {
    0.5
}

fn default_delta_d() -> f32 {
    1.5
}

fn default_normalize() -> bool {
    true
}

/// Configuration for the pull/push centroid loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidLossConfig {
    /// Pull margin: members closer than this (L1) to their centroid cost nothing.
    #[serde(default = "default_delta_v")]
    pub delta_v: f32,

    /// Push margin: centroids further apart than `2 * delta_d` (L1) cost nothing.
    #[serde(default = "default_delta_d")]
    pub delta_d: f32,

    /// L2-normalize embeddings before computing centroids.
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    #[serde(default)]
    pub method: LossMethod,

    /// Semantic classes excluded by `ignore` and `separate`.
    #[serde(default)]
    pub ignore_labels: Option<Vec<i64>>,
}

impl Default for CentroidLossConfig {
    fn default() -> Self {
        Self {
            delta_v: default_delta_v(),
            delta_d: default_delta_d(),
            normalize: default_normalize(),
            method: LossMethod::All,
            ignore_labels: None,
        }
    }
}

impl CentroidLossConfig {
    /// # Errors
    /// - `CaloError::ConfigError` if a margin is negative or not finite
    /// - `CaloError::ConfigError` if `method` is `ignore`/`separate` and
    ///   `ignore_labels` is missing
    pub fn validate(&self) -> CaloResult<()> {
        check_margin("delta_v", self.delta_v)?;
        check_margin("delta_d", self.delta_d)?;
        if self.method != LossMethod::All && self.ignore_labels.is_none() {
            return Err(CaloError::config(format!(
                "ignore_labels must be set when method = \"{}\"",
                self.method.as_str()
            )));
        }
        if let Some(labels) = &self.ignore_labels {
            check_non_negative_labels("ignore_labels", labels)?;
        }
        Ok(())
    }
}

// ============================================================================
// OFFSET LOSS CONFIG
// ============================================================================

/// Configuration for the L1 offset loss.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OffsetLossConfig {
    /// Semantic classes whose offsets are supervised. `None` means all.
    #[serde(default)]
    pub valid_labels: Option<Vec<i64>>,
}

impl OffsetLossConfig {
    pub fn validate(&self) -> CaloResult<()> {
        if let Some(labels) = &self.valid_labels {
            check_non_negative_labels("valid_labels", labels)?;
        }
        Ok(())
    }
}

// ============================================================================
// ROOT CONFIG
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaloClusterConfig {
    #[serde(default)]
    pub clustering: ClusteringConfig,

    #[serde(default)]
    pub centroid_loss: CentroidLossConfig,

    #[serde(default)]
    pub offset_loss: OffsetLossConfig,
}

impl CaloClusterConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `CaloError::ConfigError` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> CaloResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|e| {
            CaloError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&contents).map_err(|e| {
            CaloError::config(format!(
                "Failed to parse TOML in '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Validate every section, returning the first error prefixed with its
    /// section name.
    pub fn validate(&self) -> CaloResult<()> {
        self.clustering
            .validate()
            .map_err(|e| CaloError::config(format!("[clustering] {}", e)))?;

        self.centroid_loss
            .validate()
            .map_err(|e| CaloError::config(format!("[centroid_loss] {}", e)))?;

        self.offset_loss
            .validate()
            .map_err(|e| CaloError::config(format!("[offset_loss] {}", e)))?;

        Ok(())
    }

    /// Apply environment variable overrides. Prefix: `CALO_CLUSTER_`
    ///
    /// | Variable | Config Path | Type |
    /// |----------|-------------|------|
    /// | `CALO_CLUSTER_USE_GPU` | `clustering.use_gpu` | bool |
    /// | `CALO_CLUSTER_USE_SEMANTIC` | `clustering.use_semantic` | bool |
    /// | `CALO_CLUSTER_BANDWIDTH` | `clustering.mean_shift.bandwidth` | f32 |
    /// | `CALO_CLUSTER_MAX_ITER` | `clustering.mean_shift.max_iter` | usize |
    /// | `CALO_CLUSTER_TOL` | `clustering.mean_shift.tol` | f32 |
    /// | `CALO_CLUSTER_DELTA_V` | `centroid_loss.delta_v` | f32 |
    /// | `CALO_CLUSTER_DELTA_D` | `centroid_loss.delta_d` | f32 |
    ///
    /// Values that fail to parse are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.parse::<T>().ok())
        }

        if let Some(b) = parsed::<bool>("CALO_CLUSTER_USE_GPU") {
            self.clustering.use_gpu = b;
        }
        if let Some(b) = parsed::<bool>("CALO_CLUSTER_USE_SEMANTIC") {
            self.clustering.use_semantic = b;
        }

        // Mean-shift
        if let Some(v) = parsed::<f32>("CALO_CLUSTER_BANDWIDTH") {
            self.clustering.mean_shift.bandwidth = v;
        }
        if let Some(n) = parsed::<usize>("CALO_CLUSTER_MAX_ITER") {
            self.clustering.mean_shift.max_iter = n;
        }
        if let Some(v) = parsed::<f32>("CALO_CLUSTER_TOL") {
            self.clustering.mean_shift.tol = v;
        }

        // Loss margins
        if let Some(v) = parsed::<f32>("CALO_CLUSTER_DELTA_V") {
            self.centroid_loss.delta_v = v;
        }
        if let Some(v) = parsed::<f32>("CALO_CLUSTER_DELTA_D") {
            self.centroid_loss.delta_d = v;
        }

        self
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> CaloResult<Self> {
        toml::from_str(toml).map_err(|e| CaloError::config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> CaloResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CaloError::config(format!("Failed to serialize to TOML: {}", e)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
