// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compute Backend Selection
//!
//! Backends are execution spaces (`neurocable_runtime::ExecutionSpace`). The
//! layout and binding code is written once against that trait; backends only
//! differ in memory transfer and kernel dispatch.

mod cpu;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::{GpuArray, WgpuBackend};

use neurocable_config::BackendSection;
use neurocable_runtime::RuntimeError;
use tracing::info;

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// Host memory, rayon for data-parallel primitives
    Cpu,

    /// GPU via WGPU (Metal/Vulkan/DirectX - cross-platform)
    Wgpu,

    /// Auto-select based on cell group width and hardware availability
    #[default]
    Auto,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Cpu => write!(f, "CPU"),
            BackendType::Wgpu => write!(f, "WGPU"),
            BackendType::Auto => write!(f, "Auto"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(BackendType::Cpu),
            "wgpu" | "gpu" => Ok(BackendType::Wgpu),
            "auto" => Ok(BackendType::Auto),
            _ => Err(RuntimeError::BackendUnavailable(s.to_string())),
        }
    }
}

/// Configuration for backend construction and auto-selection
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// CPU vector width in elements (default: 8, one AVX register of f32)
    pub cpu_alignment: usize,

    /// GPU padding in elements (default: 64, the shader workgroup size)
    pub gpu_alignment: usize,

    /// Minimum sweep length before the CPU backend goes parallel
    pub parallel_threshold: usize,

    /// Minimum total mechanism width to consider the GPU (default: 1,000,000)
    pub gpu_width_threshold: usize,

    /// Force CPU even if GPU would be beneficial
    pub force_cpu: bool,

    /// Force WGPU GPU even if CPU would be better (for testing)
    pub force_gpu: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            cpu_alignment: 8,
            gpu_alignment: 64,
            parallel_threshold: 4096,
            gpu_width_threshold: 1_000_000,
            force_cpu: false,
            force_gpu: false,
        }
    }
}

impl BackendConfig {
    /// Translate the `[backend]` configuration section
    ///
    /// Unknown kinds were rejected by config validation; they map to `Auto`
    /// here.
    pub fn from_section(section: &BackendSection) -> (BackendType, Self) {
        let backend_type = section.kind.parse().unwrap_or_default();

        let config = BackendConfig {
            cpu_alignment: section.cpu_alignment,
            gpu_alignment: section.gpu_alignment,
            parallel_threshold: section.parallel_threshold,
            gpu_width_threshold: section.gpu_width_threshold,
            force_cpu: backend_type == BackendType::Cpu,
            force_gpu: backend_type == BackendType::Wgpu,
        };

        (backend_type, config)
    }
}

/// Backend selection decision with rationale
#[derive(Debug, Clone)]
pub struct BackendDecision {
    pub backend_type: BackendType,
    pub reason: String,
    pub estimated_speedup: f32,
}

/// Auto-select a backend based on the summed width of every mechanism in the
/// cell group
///
/// Selection priority:
/// 1. Honor force flags (force_cpu, force_gpu)
/// 2. Try WGPU (if compiled in, available and wide enough)
/// 3. Fall back to CPU - always available
pub fn select_backend(total_width: usize, config: &BackendConfig) -> BackendDecision {
    if config.force_cpu {
        return BackendDecision {
            backend_type: BackendType::Cpu,
            reason: "Forced CPU via configuration".to_string(),
            estimated_speedup: 1.0,
        };
    }

    if config.force_gpu {
        if is_gpu_available() {
            return BackendDecision {
                backend_type: BackendType::Wgpu,
                reason: "Forced WGPU via configuration".to_string(),
                estimated_speedup: estimate_gpu_speedup(total_width),
            };
        }
        info!("WGPU forced but not available, falling back to CPU");
        return BackendDecision {
            backend_type: BackendType::Cpu,
            reason: "WGPU forced but not available, falling back to CPU".to_string(),
            estimated_speedup: 1.0,
        };
    }

    if total_width >= config.gpu_width_threshold && is_gpu_available() {
        let speedup = estimate_gpu_speedup(total_width);
        if speedup > 1.5 {
            return BackendDecision {
                backend_type: BackendType::Wgpu,
                reason: format!("WGPU selected: {} mechanism sites", total_width),
                estimated_speedup: speedup,
            };
        }
    }

    BackendDecision {
        backend_type: BackendType::Cpu,
        reason: format!(
            "CPU selected: {} mechanism sites (below GPU threshold or GPU not available)",
            total_width
        ),
        estimated_speedup: 1.0,
    }
}

/// Check if a GPU adapter can be acquired
#[cfg(feature = "gpu")]
pub fn is_gpu_available() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

/// Always false without the `gpu` feature
#[cfg(not(feature = "gpu"))]
pub fn is_gpu_available() -> bool {
    false
}

/// Estimate GPU speedup for one mechanism sweep over `total_width` sites
fn estimate_gpu_speedup(total_width: usize) -> f32 {
    let sites = total_width as f32;

    // Per step only voltage and current density cross the bus (4 bytes each, both ways)
    let transfer_bytes = sites * 4.0 * 2.0 * 2.0;
    let transfer_bandwidth_gbs = 25.0;
    let transfer_us =
        (transfer_bytes / (transfer_bandwidth_gbs * 1_000_000_000.0)) * 1_000_000.0 + 200.0;

    // ~50 flops per site for a typical HH-style channel
    let cpu_flops = 100_000_000_000.0;
    let gpu_flops = 10_000_000_000_000.0;
    let cpu_us = (sites * 50.0) / (cpu_flops / 1_000_000.0);
    let gpu_us = transfer_us + (sites * 50.0) / (gpu_flops / 1_000_000.0);

    (cpu_us / gpu_us).clamp(0.1, 100.0)
}
