//! Processing recommendations
//!
//! Turns detected GPU capabilities plus an estimated memory requirement
//! into a concrete configuration for the photogrammetry pipeline: device,
//! backend, batch size, thread count and precision.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory requirement assumed when the caller does not supply one, in MB.
pub const DEFAULT_REQUIRED_MEMORY_MB: u64 = 4096;

/// Fraction of free GPU memory batches may claim.
pub const USABLE_MEMORY_FRACTION: f64 = 0.7;

pub const MIN_BATCH_SIZE: u32 = 1;
pub const MAX_BATCH_SIZE: u32 = 64;

/// Minimum CUDA compute capability for half-precision arithmetic.
pub const HALF_PRECISION_MIN_CAPABILITY: u32 = 70;

/// One work item is assumed to cost a tenth of the overall requirement.
pub const ITEM_SIZE_DIVISOR: u64 = 10;

/// Compute backend the pipeline should target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Cuda,
    OpenCl,
    Cpu,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cuda => "CUDA",
            Backend::OpenCl => "OpenCL",
            Backend::Cpu => "CPU",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete processing configuration handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRecommendation {
    pub use_gpu: bool,
    /// Index into the detected device list; None on CPU outcomes.
    pub device_index: Option<usize>,
    pub backend: Backend,
    pub batch_size: u32,
    pub thread_count: usize,
    pub half_precision: bool,
    /// Human-readable justification for the choice.
    pub reason: String,
}

impl ProcessingRecommendation {
    /// CPU outcome with the given justification.
    pub fn cpu_fallback(reason: String) -> Self {
        Self {
            use_gpu: false,
            device_index: None,
            backend: Backend::Cpu,
            batch_size: MIN_BATCH_SIZE,
            thread_count: cpu_thread_count(),
            half_precision: false,
            reason,
        }
    }
}

impl fmt::Display for ProcessingRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backend: {}", self.backend)?;
        if let Some(idx) = self.device_index {
            writeln!(f, "Device: [{}]", idx)?;
        }
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Threads: {}", self.thread_count)?;
        writeln!(
            f,
            "Half precision: {}",
            if self.half_precision { "on" } else { "off" }
        )?;
        write!(f, "Reason: {}", self.reason)
    }
}

/// Batch size fitting the given free memory: 70% of free divided by the
/// per-item footprint, clamped to [1, 64]. Unknown free memory or a
/// zero-sized item pins the batch to 1.
pub fn batch_size_for(free_memory_mb: u64, item_size_mb: u64) -> u32 {
    if free_memory_mb == 0 || item_size_mb == 0 {
        return MIN_BATCH_SIZE;
    }
    let usable = free_memory_mb as f64 * USABLE_MEMORY_FRACTION;
    let batch = (usable / item_size_mb as f64) as u32;
    batch.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
}

/// Logical CPU count for CPU-path parallelism, never below 1.
pub fn cpu_thread_count() -> usize {
    num_cpus::get().max(1)
}
