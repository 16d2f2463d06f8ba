//! GPU data model
//!
//! Plain value records produced by detection. Records are immutable once
//! built and recomputed fresh on every probe pass; nothing here is cached.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compute API family a detected device belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuKind {
    Cuda,
    OpenClAmd,
    Intel,
    /// Reserved for macOS hosts; no probe on this platform produces it.
    Metal,
    Unknown,
}

impl GpuKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpuKind::Cuda => "CUDA",
            GpuKind::OpenClAmd => "OpenCL (AMD)",
            GpuKind::Intel => "Intel",
            GpuKind::Metal => "Metal",
            GpuKind::Unknown => "Unknown",
        }
    }
}

impl Default for GpuKind {
    fn default() -> Self {
        GpuKind::Unknown
    }
}

/// A single detected GPU device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuRecord {
    /// Position in the aggregate device list.
    pub index: usize,
    pub name: String,
    pub kind: GpuKind,
    pub total_memory_mb: u64,
    pub free_memory_mb: u64,
    /// CUDA-style capability, major * 10 + minor. 0 when unknown.
    pub compute_capability: u32,
    /// Core-count estimate from the model name. 0 when unknown.
    pub cuda_cores: u32,
    /// Empty when the tool does not report one.
    pub driver_version: String,
    pub supports_cuda: bool,
    pub supports_opencl: bool,
    pub supports_vulkan: bool,
}

/// System-wide view assembled from all probes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemGpuCapabilities {
    /// NVIDIA devices first, then AMD, then Intel.
    pub gpus: Vec<GpuRecord>,
    pub has_cuda: bool,
    pub has_opencl: bool,
    pub has_vulkan: bool,
    /// "release X.Y" version parsed from nvcc, when installed.
    pub cuda_toolkit_version: Option<String>,
    /// Index of the best-scoring device; None when nothing was detected.
    pub recommended_index: Option<usize>,
    /// Sum of total memory over all detected devices.
    pub total_memory_mb: u64,
}

impl SystemGpuCapabilities {
    /// The device selected by the scoring heuristic, if any.
    pub fn best_gpu(&self) -> Option<&GpuRecord> {
        self.recommended_index.and_then(|idx| self.gpus.get(idx))
    }
}

impl fmt::Display for SystemGpuCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gpus.is_empty() {
            return write!(f, "No GPUs detected");
        }
        writeln!(
            f,
            "Detected {} GPU(s), {} MB total",
            self.gpus.len(),
            self.total_memory_mb
        )?;
        for gpu in &self.gpus {
            write!(
                f,
                "  [{}] {} ({}) {} MB total, {} MB free",
                gpu.index,
                gpu.name,
                gpu.kind.as_str(),
                gpu.total_memory_mb,
                gpu.free_memory_mb
            )?;
            if gpu.compute_capability > 0 {
                write!(f, ", capability {}", gpu.compute_capability)?;
            }
            if !gpu.driver_version.is_empty() {
                write!(f, ", driver {}", gpu.driver_version)?;
            }
            writeln!(f)?;
        }
        if let Some(version) = &self.cuda_toolkit_version {
            writeln!(f, "CUDA toolkit: {}", version)?;
        }
        match self.recommended_index {
            Some(idx) => write!(f, "Recommended device: [{}]", idx),
            None => write!(f, "Recommended device: none"),
        }
    }
}
