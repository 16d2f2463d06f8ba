//! GpuProbe Library
//!
//! Detects locally-installed GPUs by scraping vendor command-line tools
//! and derives processing settings for the photogrammetry pipeline.

pub mod command;
pub mod gpu;
pub mod recommend;
