//! Mean-shift parameters.

use serde::{Deserialize, Serialize};

use crate::error::{CaloError, CaloResult};

/// Default kernel bandwidth, as a cosine distance.
pub const DEFAULT_BANDWIDTH: f32 = 0.1;

/// Default iteration cap.
pub const DEFAULT_MAX_ITER: usize = 300;

/// Default convergence tolerance on per-iteration displacement.
pub const DEFAULT_TOL: f32 = 1e-4;

/// Kernel applied to the cosine distance `1 - cos` between a shifting point
/// and an input vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeanShiftKernel {
    /// Weight 1 inside the bandwidth, 0 outside.
    #[default]
    Flat,
    /// `exp(-0.5 * (d / bandwidth)^2)`.
    Gaussian,
}

impl MeanShiftKernel {
    /// Weight of an input at cosine distance `distance`.
    #[inline]
    pub fn weight(&self, distance: f32, bandwidth: f32) -> f32 {
        match self {
            Self::Flat => {
                if distance <= bandwidth {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Gaussian => {
                let z = distance / bandwidth;
                (-0.5 * z * z).exp()
            }
        }
    }
}

/// Parameters for cosine mean-shift.
///
/// # Example
///
/// ```
/// use calo_cluster_core::clustering::MeanShiftParams;
///
/// let params = MeanShiftParams::default().with_bandwidth(0.05);
/// assert!(params.validate().is_ok());
/// assert!(MeanShiftParams::default().with_max_iter(0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanShiftParams {
    /// Kernel radius as a cosine distance. Must be > 0.
    pub bandwidth: f32,

    /// Iteration cap. Must be > 0.
    pub max_iter: usize,

    /// Stop once no shifting point moves further than this in one iteration.
    pub tol: f32,

    /// L2-normalize inputs and shifted points.
    pub normalize: bool,

    /// Kernel shape.
    pub kernel: MeanShiftKernel,

    /// Seed from distinct grid cells instead of every input.
    pub bin_seeding: bool,

    /// Cosine distance under which converged points share a mode.
    /// `None` uses the bandwidth.
    pub merge_tolerance: Option<f32>,
}

impl Default for MeanShiftParams {
    fn default() -> Self {
        Self {
            bandwidth: DEFAULT_BANDWIDTH,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            normalize: true,
            kernel: MeanShiftKernel::Flat,
            bin_seeding: false,
            merge_tolerance: None,
        }
    }
}

impl MeanShiftParams {
    #[must_use]
    pub fn with_bandwidth(mut self, bandwidth: f32) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    #[must_use]
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    #[must_use]
    pub fn with_kernel(mut self, kernel: MeanShiftKernel) -> Self {
        self.kernel = kernel;
        self
    }

    #[must_use]
    pub fn with_bin_seeding(mut self, bin_seeding: bool) -> Self {
        self.bin_seeding = bin_seeding;
        self
    }

    #[must_use]
    pub fn with_merge_tolerance(mut self, tolerance: f32) -> Self {
        self.merge_tolerance = Some(tolerance);
        self
    }

    /// Effective merge tolerance.
    pub fn merge_tolerance(&self) -> f32 {
        self.merge_tolerance.unwrap_or(self.bandwidth)
    }

    /// Grid cell size for bin seeding: the chord length of a cosine
    /// distance equal to the bandwidth.
    pub fn bin_size(&self) -> f32 {
        (2.0 * self.bandwidth).sqrt()
    }

    /// Validate parameters.
    ///
    /// # Errors
    ///
    /// Returns `CaloError::InvalidParameter` if:
    /// - bandwidth is not finite or <= 0
    /// - max_iter == 0
    /// - tol is not finite or <= 0
    /// - merge_tolerance is set and not finite or < 0
    pub fn validate(&self) -> CaloResult<()> {
        if !self.bandwidth.is_finite() || self.bandwidth <= 0.0 {
            return Err(CaloError::invalid_parameter(format!(
                "bandwidth must be a finite value > 0, got {}",
                self.bandwidth
            )));
        }
        if self.max_iter == 0 {
            return Err(CaloError::invalid_parameter("max_iter must be > 0"));
        }
        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(CaloError::invalid_parameter(format!(
                "tol must be a finite value > 0, got {}",
                self.tol
            )));
        }
        if let Some(t) = self.merge_tolerance {
            if !t.is_finite() || t < 0.0 {
                return Err(CaloError::invalid_parameter(format!(
                    "merge_tolerance must be a finite value >= 0, got {}",
                    t
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let params = MeanShiftParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.kernel, MeanShiftKernel::Flat);
        assert!(params.normalize);
        assert_eq!(params.merge_tolerance(), DEFAULT_BANDWIDTH);
    }

    #[test]
    fn test_invalid_bandwidth() {
        assert!(MeanShiftParams::default().with_bandwidth(0.0).validate().is_err());
        assert!(MeanShiftParams::default().with_bandwidth(-0.1).validate().is_err());
        assert!(MeanShiftParams::default().with_bandwidth(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_invalid_tol_and_merge_tolerance() {
        assert!(MeanShiftParams::default().with_tol(0.0).validate().is_err());
        assert!(MeanShiftParams::default()
            .with_merge_tolerance(-1.0)
            .validate()
            .is_err());
        assert!(MeanShiftParams::default()
            .with_merge_tolerance(0.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_flat_kernel_window() {
        let k = MeanShiftKernel::Flat;
        assert_eq!(k.weight(0.05, 0.1), 1.0);
        assert_eq!(k.weight(0.1, 0.1), 1.0);
        assert_eq!(k.weight(0.2, 0.1), 0.0);
    }

    #[test]
    fn test_gaussian_kernel_decays() {
        let k = MeanShiftKernel::Gaussian;
        assert_eq!(k.weight(0.0, 0.1), 1.0);
        assert!(k.weight(0.1, 0.1) > k.weight(0.2, 0.1));
        assert!(k.weight(0.2, 0.1) > 0.0);
    }

    #[test]
    fn test_bin_size_matches_chord() {
        let params = MeanShiftParams::default().with_bandwidth(0.5);
        assert!((params.bin_size() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let params: MeanShiftParams = toml::from_str("bandwidth = 0.3\nkernel = \"gaussian\"").unwrap();
        assert_eq!(params.bandwidth, 0.3);
        assert_eq!(params.kernel, MeanShiftKernel::Gaussian);
        assert_eq!(params.max_iter, DEFAULT_MAX_ITER);
    }
}
