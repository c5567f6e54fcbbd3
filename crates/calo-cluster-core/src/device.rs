//! Compute device selection for the tensor backend.
//!
//! Platform is detected at runtime: CUDA first (feature `cuda`), then Metal
//! (feature `metal`), then CPU. The CPU device always works, so tensor code
//! paths stay testable on machines without an accelerator.

use candle_core::Device;

/// Platform a [`Device`] runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePlatform {
    /// NVIDIA CUDA GPU
    Cuda,
    /// Apple Metal
    Metal,
    /// Host CPU
    Cpu,
}

impl DevicePlatform {
    /// Platform of an existing device.
    pub fn of(device: &Device) -> Self {
        match device {
            Device::Cpu => Self::Cpu,
            Device::Cuda(_) => Self::Cuda,
            Device::Metal(_) => Self::Metal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Metal => "metal",
            Self::Cpu => "cpu",
        }
    }
}

/// Create a device on the best available platform.
///
/// Order: CUDA, Metal, CPU.
///
/// # Arguments
///
/// * `ordinal` - Device ordinal (typically 0)
pub fn new_device(ordinal: usize) -> Device {
    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(ordinal) {
            Ok(device) => {
                tracing::info!(ordinal, "Using CUDA device");
                return device;
            }
            Err(e) => {
                tracing::debug!("CUDA not available: {}", e);
            }
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(ordinal) {
            Ok(device) => {
                tracing::info!(ordinal, "Using Metal device");
                return device;
            }
            Err(e) => {
                tracing::debug!("Metal not available: {}", e);
            }
        }
    }

    let _ = ordinal;
    tracing::info!("Using CPU device");
    Device::Cpu
}

/// Device for a `use_gpu` toggle: the best platform when set, CPU otherwise.
pub fn select_device(use_gpu: bool) -> Device {
    if use_gpu {
        new_device(0)
    } else {
        Device::Cpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_when_gpu_disabled() {
        let device = select_device(false);
        assert_eq!(DevicePlatform::of(&device), DevicePlatform::Cpu);
        assert_eq!(DevicePlatform::of(&device).as_str(), "cpu");
    }

    #[test]
    fn test_new_device_always_succeeds() {
        let device = new_device(0);
        let platform = DevicePlatform::of(&device);
        assert!(matches!(
            platform,
            DevicePlatform::Cpu | DevicePlatform::Cuda | DevicePlatform::Metal
        ));
    }
}
