//! GpuProbe - GPU Capability Probe
//!
//! Diagnostic binary: detects local GPUs and prints the inventory plus the
//! processing recommendation the pipeline would receive.

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gpuprobe::gpu::GpuProber;
use gpuprobe::recommend::DEFAULT_REQUIRED_MEMORY_MB;

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("gpuprobe=info".parse().unwrap()))
        .init();

    info!("Starting GpuProbe v{}", env!("CARGO_PKG_VERSION"));

    let mut required_memory_mb = DEFAULT_REQUIRED_MEMORY_MB;
    let mut json_output = false;
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            json_output = true;
        } else if let Ok(mb) = arg.parse() {
            required_memory_mb = mb;
        } else {
            eprintln!("Usage: gpuprobe [required-memory-mb] [--json]");
            std::process::exit(2);
        }
    }

    let prober = GpuProber::new();
    let caps = prober.detect().await;
    let recommendation = prober.recommend(&caps, required_memory_mb).await;

    if json_output {
        let report = serde_json::json!({
            "capabilities": caps,
            "recommendation": recommendation,
        });
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                eprintln!("Failed to render JSON report: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", caps);
        println!();
        println!("{}", recommendation);
    }
}
