//! Cosine mean-shift: mode seeking under a cosine-distance kernel.
//!
//! # Algorithm
//!
//! 1. Optionally L2-normalize inputs
//! 2. Seed one shifting point per input (or per occupied grid cell)
//! 3. Move every point to the kernel-weighted mean of all inputs until the
//!    largest displacement drops below `tol` or `max_iter` is hit
//! 4. Greedily merge converged points into modes, in seed order
//!
//! Two backends run step 3: a rayon CPU loop and a batched tensor loop on a
//! `candle_core::Device`. Steps 1, 2 and 4 are shared.

mod cpu;
mod merge;
mod params;
mod seeds;
mod tensor;


use candle_core::Device;
use tracing::{debug, instrument, warn};

use crate::device::{select_device, DevicePlatform};
use crate::error::CaloResult;
use crate::types::Embeddings;

pub use params::{MeanShiftKernel, MeanShiftParams, DEFAULT_BANDWIDTH, DEFAULT_MAX_ITER, DEFAULT_TOL};

use cpu::shift_cpu;
use merge::{assign_nearest, merge_modes};
use seeds::Seeds;
use tensor::shift_tensor;

/// Positions of the shifting points after the iteration stopped.
#[derive(Debug)]
pub(crate) struct ShiftTrace {
    pub positions: Seeds,
    pub iterations: usize,
    pub converged: bool,
}

/// Where the shift iteration runs.
#[derive(Debug, Clone)]
pub enum MeanShiftBackend {
    /// Rayon-parallel host loop.
    Cpu,
    /// Batched tensor ops on the given device.
    Tensor(Device),
}

impl MeanShiftBackend {
    /// Tensor backend on the best available device when `use_gpu`, CPU otherwise.
    pub fn from_use_gpu(use_gpu: bool) -> Self {
        if use_gpu {
            Self::Tensor(select_device(true))
        } else {
            Self::Cpu
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Tensor(device) => match DevicePlatform::of(device) {
                DevicePlatform::Cuda => "tensor-cuda",
                DevicePlatform::Metal => "tensor-metal",
                DevicePlatform::Cpu => "tensor-cpu",
            },
        }
    }
}

/// Result of one mean-shift run.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanShiftOutcome {
    /// Mode index per input, in first-occurrence order.
    pub labels: Vec<i64>,
    /// Mode positions, indexed by label.
    pub modes: Vec<Vec<f32>>,
    /// Iterations performed.
    pub iterations: usize,
    /// False when `max_iter` was reached first.
    pub converged: bool,
}

impl MeanShiftOutcome {
    pub fn n_modes(&self) -> usize {
        self.modes.len()
    }
}

/// Configured cosine mean-shift.
#[derive(Debug, Clone)]
pub struct MeanShift {
    params: MeanShiftParams,
    backend: MeanShiftBackend,
}

impl MeanShift {
    /// # Errors
    ///
    /// `InvalidParameter` if `params` does not validate.
    pub fn new(params: MeanShiftParams, backend: MeanShiftBackend) -> CaloResult<Self> {
        params.validate()?;
        Ok(Self { params, backend })
    }

    /// CPU mean-shift with the given parameters.
    pub fn cpu(params: MeanShiftParams) -> CaloResult<Self> {
        Self::new(params, MeanShiftBackend::Cpu)
    }

    pub fn params(&self) -> &MeanShiftParams {
        &self.params
    }

    pub fn backend(&self) -> &MeanShiftBackend {
        &self.backend
    }

    /// Run mean-shift over `points`.
    #[instrument(skip_all, fields(points = points.len(), dim = points.dim(), backend = self.backend.name()))]
    pub fn fit(&self, points: &Embeddings) -> CaloResult<MeanShiftOutcome> {
        match points.len() {
            0 => {
                return Ok(MeanShiftOutcome {
                    labels: Vec::new(),
                    modes: Vec::new(),
                    iterations: 0,
                    converged: true,
                })
            }
            1 => {
                let mode = if self.params.normalize {
                    points.normalized().row(0).to_vec()
                } else {
                    points.row(0).to_vec()
                };
                return Ok(MeanShiftOutcome {
                    labels: vec![0],
                    modes: vec![mode],
                    iterations: 0,
                    converged: true,
                });
            }
            _ => {}
        }

        let normalized;
        let points = if self.params.normalize {
            normalized = points.normalized();
            &normalized
        } else {
            points
        };

        let seeds = if self.params.bin_seeding {
            Seeds::binned(points, self.params.bin_size())
        } else {
            Seeds::from_points(points)
        };
        debug!(seeds = seeds.len(), "Starting mean-shift iteration");

        let trace = match &self.backend {
            MeanShiftBackend::Cpu => shift_cpu(points, seeds, &self.params),
            MeanShiftBackend::Tensor(device) => shift_tensor(points, seeds, &self.params, device)?,
        };

        if !trace.converged {
            warn!(
                max_iter = self.params.max_iter,
                tol = self.params.tol,
                "Mean-shift did not converge; using last iterate"
            );
        }

        let tolerance = self.params.merge_tolerance();
        let merged = merge_modes(&trace.positions, tolerance);
        let labels = if self.params.bin_seeding {
            assign_nearest(points, &merged.modes, tolerance)
        } else {
            merged.seed_mode.iter().map(|&m| m as i64).collect()
        };

        debug!(
            modes = merged.modes.len(),
            iterations = trace.iterations,
            "Mean-shift finished"
        );

        Ok(MeanShiftOutcome {
            labels,
            modes: merged.modes,
            iterations: trace.iterations,
            converged: trace.converged,
        })
    }
}
