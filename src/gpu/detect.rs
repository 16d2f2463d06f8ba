//! GPU probing and aggregation
//!
//! Shells out to nvidia-smi, lspci and nvcc, parses what they print, and
//! assembles the system-wide capability view. Every failure at this layer
//! degrades to "not detected"; detection itself never returns an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::command::{CommandRunner, ShellRunner};
use crate::gpu::lookup::nvidia_arch_for;
use crate::gpu::score::select_best_gpu;
use crate::gpu::types::{GpuKind, GpuRecord, SystemGpuCapabilities};
use crate::recommend::{
    batch_size_for, Backend, ProcessingRecommendation, DEFAULT_REQUIRED_MEMORY_MB,
    HALF_PRECISION_MIN_CAPABILITY, ITEM_SIZE_DIVISOR,
};

const NVIDIA_SMI_VERSION_CMD: &str = "nvidia-smi --version";
const NVIDIA_SMI_QUERY_CMD: &str =
    "nvidia-smi --query-gpu=name,memory.total,driver_version --format=csv,noheader";
const NVIDIA_SMI_FREE_CMD: &str =
    "nvidia-smi --query-gpu=memory.free --format=csv,noheader,nounits";
const NVCC_VERSION_CMD: &str = "nvcc --version";
const LSPCI_AMD_CMD: &str = "lspci | grep -i vga | grep -i amd";
const LSPCI_INTEL_CMD: &str = "lspci | grep -i vga | grep -i intel";

// lspci says nothing about memory, so AMD and Intel devices get fixed
// conservative figures instead of measured ones.
const AMD_ASSUMED_TOTAL_MB: u64 = 4096;
const AMD_ASSUMED_FREE_MB: u64 = 3072;
const INTEL_ASSUMED_TOTAL_MB: u64 = 2048;
const INTEL_ASSUMED_FREE_MB: u64 = 1536;

static NVCC_RELEASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"release\s+(\d+\.\d+)").unwrap());

/// Parse a memory field like "8192 MiB", "8192 MB" or "8192". Anything
/// unparseable counts as 0.
pub fn parse_memory_field(field: &str) -> u64 {
    let trimmed = field.trim();
    let number = trimmed
        .strip_suffix("MiB")
        .or_else(|| trimmed.strip_suffix("MB"))
        .unwrap_or(trimmed)
        .trim();
    number.parse().unwrap_or(0)
}

/// Probes the host for GPUs and derives processing recommendations.
///
/// Owns a [`CommandRunner`] so tests can script the underlying commands.
pub struct GpuProber {
    runner: Box<dyn CommandRunner>,
}

impl GpuProber {
    pub fn new() -> Self {
        Self {
            runner: Box::new(ShellRunner::new()),
        }
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Probe the host for GPUs.
    ///
    /// Infallible: commands that are missing, fail or time out simply
    /// contribute no devices, so a broken host reports an empty inventory.
    pub async fn detect(&self) -> SystemGpuCapabilities {
        let nvidia = self.probe_nvidia().await;
        let amd = self.probe_amd().await;
        let intel = self.probe_intel().await;

        let has_cuda = !nvidia.is_empty();
        // Aggregate OpenCL/Vulkan support tracks the AMD probe only; Intel
        // devices keep their per-record flags without flipping these.
        let has_opencl = !amd.is_empty();
        let has_vulkan = !amd.is_empty();

        let mut gpus = nvidia;
        gpus.extend(amd);
        gpus.extend(intel);
        for (idx, gpu) in gpus.iter_mut().enumerate() {
            gpu.index = idx;
        }

        let cuda_toolkit_version = self.query_cuda_toolkit_version().await;
        let total_memory_mb = gpus.iter().map(|gpu| gpu.total_memory_mb).sum();
        let recommended_index = select_best_gpu(&gpus);

        tracing::info!(
            "GPU detection complete: {} device(s), {} MB total",
            gpus.len(),
            total_memory_mb
        );

        SystemGpuCapabilities {
            gpus,
            has_cuda,
            has_opencl,
            has_vulkan,
            cuda_toolkit_version,
            recommended_index,
            total_memory_mb,
        }
    }

    async fn probe_nvidia(&self) -> Vec<GpuRecord> {
        if let Err(e) = self.runner.run(NVIDIA_SMI_VERSION_CMD).await {
            tracing::debug!("nvidia-smi not available: {}", e);
            return Vec::new();
        }

        let output = match self.runner.run(NVIDIA_SMI_QUERY_CMD).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("nvidia-smi query failed: {}", e);
                return Vec::new();
            }
        };

        let free_list = self.query_nvidia_free_list().await;

        let mut gpus = Vec::new();
        for (pos, line) in output.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(|field| field.trim()).collect();
            if fields.len() < 2 {
                tracing::warn!("Skipping malformed nvidia-smi line: {}", line);
                continue;
            }

            let name = fields[0].to_string();
            let (compute_capability, cuda_cores) = nvidia_arch_for(&name);

            gpus.push(GpuRecord {
                index: pos,
                name,
                kind: GpuKind::Cuda,
                total_memory_mb: parse_memory_field(fields[1]),
                // Free figures match query lines by position
                free_memory_mb: free_list.get(pos).copied().unwrap_or(0),
                compute_capability,
                cuda_cores,
                driver_version: fields.get(2).copied().unwrap_or("").to_string(),
                supports_cuda: true,
                supports_opencl: true,
                supports_vulkan: true,
            });
        }
        gpus
    }

    async fn probe_amd(&self) -> Vec<GpuRecord> {
        match self.runner.run(LSPCI_AMD_CMD).await {
            Ok(output) if !output.trim().is_empty() => vec![GpuRecord {
                index: 0,
                name: "AMD GPU (detected via lspci)".to_string(),
                kind: GpuKind::OpenClAmd,
                total_memory_mb: AMD_ASSUMED_TOTAL_MB,
                free_memory_mb: AMD_ASSUMED_FREE_MB,
                compute_capability: 0,
                cuda_cores: 0,
                driver_version: String::new(),
                supports_cuda: false,
                supports_opencl: true,
                supports_vulkan: true,
            }],
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::debug!("AMD probe failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn probe_intel(&self) -> Vec<GpuRecord> {
        match self.runner.run(LSPCI_INTEL_CMD).await {
            Ok(output) if !output.trim().is_empty() => vec![GpuRecord {
                index: 0,
                name: "Intel GPU (detected via lspci)".to_string(),
                kind: GpuKind::Intel,
                total_memory_mb: INTEL_ASSUMED_TOTAL_MB,
                free_memory_mb: INTEL_ASSUMED_FREE_MB,
                compute_capability: 0,
                cuda_cores: 0,
                driver_version: String::new(),
                supports_cuda: false,
                supports_opencl: true,
                supports_vulkan: true,
            }],
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::debug!("Intel probe failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn query_nvidia_free_list(&self) -> Vec<u64> {
        match self.runner.run(NVIDIA_SMI_FREE_CMD).await {
            Ok(output) => output.lines().map(parse_memory_field).collect(),
            Err(e) => {
                tracing::debug!("nvidia-smi free-memory query failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn query_cuda_toolkit_version(&self) -> Option<String> {
        let output = match self.runner.run(NVCC_VERSION_CMD).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("nvcc not available: {}", e);
                return None;
            }
        };
        NVCC_RELEASE_RE
            .captures(&output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Current free memory for one device, re-queried from the host rather
    /// than read back from the earlier probe. Values can drift between
    /// calls as GPU load changes.
    pub async fn query_free_memory_mb(&self, gpu: &GpuRecord) -> u64 {
        match gpu.kind {
            GpuKind::Cuda => {
                let free_list = self.query_nvidia_free_list().await;
                free_list.get(gpu.index).copied().unwrap_or(0)
            }
            GpuKind::OpenClAmd => match self.runner.run(LSPCI_AMD_CMD).await {
                Ok(output) if !output.trim().is_empty() => AMD_ASSUMED_FREE_MB,
                _ => 0,
            },
            GpuKind::Intel => match self.runner.run(LSPCI_INTEL_CMD).await {
                Ok(output) if !output.trim().is_empty() => INTEL_ASSUMED_FREE_MB,
                _ => 0,
            },
            GpuKind::Metal | GpuKind::Unknown => 0,
        }
    }

    /// Batch size the device can sustain right now, from a fresh
    /// free-memory query and the per-item footprint in MB.
    pub async fn recommended_batch_size(&self, gpu: &GpuRecord, item_size_mb: u64) -> u32 {
        let free_memory_mb = self.query_free_memory_mb(gpu).await;
        batch_size_for(free_memory_mb, item_size_mb)
    }

    /// Derive a processing configuration from detected capabilities and an
    /// estimated memory requirement in MB.
    pub async fn recommend(
        &self,
        caps: &SystemGpuCapabilities,
        required_memory_mb: u64,
    ) -> ProcessingRecommendation {
        let best = match caps.best_gpu() {
            Some(gpu) => gpu,
            None => {
                return ProcessingRecommendation::cpu_fallback(
                    "No GPU detected; processing will run on the CPU".to_string(),
                );
            }
        };

        if best.total_memory_mb < required_memory_mb {
            return ProcessingRecommendation::cpu_fallback(format!(
                "{} has {} MB but {} MB is required; falling back to CPU",
                best.name, best.total_memory_mb, required_memory_mb
            ));
        }

        let backend = if caps.has_cuda {
            Backend::Cuda
        } else if caps.has_opencl {
            Backend::OpenCl
        } else {
            return ProcessingRecommendation::cpu_fallback(
                "GPU detected but no supported compute backend; falling back to CPU".to_string(),
            );
        };

        let half_precision =
            backend == Backend::Cuda && best.compute_capability >= HALF_PRECISION_MIN_CAPABILITY;
        let item_size_mb = required_memory_mb / ITEM_SIZE_DIVISOR;
        let batch_size = self.recommended_batch_size(best, item_size_mb).await;

        ProcessingRecommendation {
            use_gpu: true,
            device_index: Some(best.index),
            backend,
            batch_size,
            thread_count: 1,
            half_precision,
            reason: format!(
                "Using {} ({} MB) via {}",
                best.name, best.total_memory_mb, backend
            ),
        }
    }

    /// [`Self::recommend`] with the default memory requirement.
    pub async fn recommend_default(
        &self,
        caps: &SystemGpuCapabilities,
    ) -> ProcessingRecommendation {
        self.recommend(caps, DEFAULT_REQUIRED_MEMORY_MB).await
    }
}

impl Default for GpuProber {
    fn default() -> Self {
        Self::new()
    }
}
