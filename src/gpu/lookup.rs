//! NVIDIA architecture lookup
//!
//! nvidia-smi reports names and memory but not compute capability or core
//! counts, so both are estimated from the model name. Rules are checked in
//! order against the lowercased name and the first match wins; names that
//! match nothing get conservative defaults.

/// One name-substring rule.
pub struct NvidiaArchRule {
    pub pattern: &'static str,
    pub compute_capability: u32,
    pub cuda_cores: u32,
}

/// Ordered rule table for recent GeForce generations.
pub const NVIDIA_ARCH_RULES: &[NvidiaArchRule] = &[
    NvidiaArchRule { pattern: "rtx 40", compute_capability: 89, cuda_cores: 16384 },
    NvidiaArchRule { pattern: "rtx 30", compute_capability: 86, cuda_cores: 10496 },
    NvidiaArchRule { pattern: "rtx 20", compute_capability: 75, cuda_cores: 4608 },
    NvidiaArchRule { pattern: "gtx 16", compute_capability: 75, cuda_cores: 4608 },
    NvidiaArchRule { pattern: "gtx 10", compute_capability: 61, cuda_cores: 3584 },
];

pub const DEFAULT_COMPUTE_CAPABILITY: u32 = 50;
pub const DEFAULT_CUDA_CORES: u32 = 2048;

/// Estimate (compute capability, CUDA cores) for an NVIDIA device name.
pub fn nvidia_arch_for(name: &str) -> (u32, u32) {
    let lowered = name.to_lowercase();
    for rule in NVIDIA_ARCH_RULES {
        if lowered.contains(rule.pattern) {
            return (rule.compute_capability, rule.cuda_cores);
        }
    }
    (DEFAULT_COMPUTE_CAPABILITY, DEFAULT_CUDA_CORES)
}
