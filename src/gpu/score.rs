//! GPU scoring heuristic
//!
//! Ranks detected devices with a weighted sum over memory, core count and
//! compute capability, plus a flat bonus for the preferred backend.

use crate::gpu::types::GpuRecord;

const MEMORY_WEIGHT: f64 = 40.0;
const MEMORY_BASELINE_MB: f64 = 16384.0;
const CORE_WEIGHT: f64 = 30.0;
const CORE_BASELINE: f64 = 10000.0;
const CAPABILITY_WEIGHT: f64 = 20.0;
const CAPABILITY_BASELINE: f64 = 100.0;
const CUDA_BONUS: f64 = 10.0;
const OPENCL_BONUS: f64 = 5.0;
const MAX_SCORE: f64 = 100.0;

/// Score one device. Higher is better; capped at 100.
pub fn score_gpu(gpu: &GpuRecord) -> f64 {
    let mut score = 0.0;

    // Memory dominates, normalized against a 16 GB baseline
    score += MEMORY_WEIGHT * (gpu.total_memory_mb as f64 / MEMORY_BASELINE_MB);

    // Core count and capability only contribute when known
    if gpu.cuda_cores > 0 {
        score += CORE_WEIGHT * (gpu.cuda_cores as f64 / CORE_BASELINE);
    }
    if gpu.compute_capability > 0 {
        score += CAPABILITY_WEIGHT * (gpu.compute_capability as f64 / CAPABILITY_BASELINE);
    }

    // Flat bonus for the best available backend
    if gpu.supports_cuda {
        score += CUDA_BONUS;
    } else if gpu.supports_opencl {
        score += OPENCL_BONUS;
    }

    score.min(MAX_SCORE)
}

/// Index of the best-scoring device. Ties keep the earliest entry.
pub fn select_best_gpu(gpus: &[GpuRecord]) -> Option<usize> {
    let mut best = None;
    let mut best_score = -1.0;
    for (idx, gpu) in gpus.iter().enumerate() {
        let score = score_gpu(gpu);
        if score > best_score {
            best_score = score;
            best = Some(idx);
        }
    }
    best
}
