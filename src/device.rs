//! Device and dtype selection.

use candle_core::{DType, Device};

/// Return the preferred device: CUDA if available, otherwise CPU.
pub fn preferred_device(cuda_ordinal: usize) -> Device {
    Device::cuda_if_available(cuda_ordinal).unwrap_or(Device::Cpu)
}

/// Weight dtype for a service: fp16 only when requested *and* running on
/// CUDA, matching how the upstream checkpoints are published.
pub fn weight_dtype(fp16: bool, device: &Device) -> DType {
    if fp16 && device.is_cuda() {
        DType::F16
    } else {
        DType::F32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_never_fp16() {
        assert_eq!(weight_dtype(true, &Device::Cpu), DType::F32);
        assert_eq!(weight_dtype(false, &Device::Cpu), DType::F32);
    }
}
