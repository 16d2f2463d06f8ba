//! GPU detection and ranking
//!
//! This module probes the host for NVIDIA, AMD and Intel GPUs through
//! vendor command-line utilities and ranks the results for the pipeline.

pub mod detect;
pub mod lookup;
pub mod score;
pub mod types;

// Re-export main types for convenience
pub use detect::{parse_memory_field, GpuProber};
pub use score::{score_gpu, select_best_gpu};
pub use types::{GpuKind, GpuRecord, SystemGpuCapabilities};
