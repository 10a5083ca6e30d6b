// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # WGPU Backend
//!
//! GPU execution space using WGPU (cross-platform GPU compute library).
//! Supports Metal (macOS), Vulkan (Linux), DirectX 12 (Windows).
//!
//! Every device array is one storage buffer. Host writes go through
//! `Queue::write_buffer` and are ordered before any later submission; reads
//! copy into a staging buffer and block on `device.poll(Maintain::Wait)`, so
//! a read always observes every kernel submitted before it.

use super::BackendConfig;
use bytemuck::{Pod, Zeroable};
use neurocable_mechanism::{Index, Value};
use neurocable_runtime::{DeviceArray, ExecutionSpace, Result, RuntimeError, Scalar};
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, info};
use wgpu::util::DeviceExt;

/// Default GPU alignment: the compute shader workgroup size
pub const DEFAULT_GPU_ALIGNMENT: usize = 64;

const WORKGROUP_SIZE: usize = 64;
const MAX_WORKGROUPS_PER_DISPATCH: usize = 65_535;
const ELEMENT_BYTES: u64 = 4;

/// Uniform block of `multiply_in_place.wgsl`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MultiplyParams {
    v_off: u32,
    i_off: u32,
    n: u32,
    base: u32,
}

/// Storage buffer holding `len` elements of `T`
pub struct GpuArray<T: Scalar> {
    buffer: wgpu::Buffer,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Scalar> GpuArray<T> {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl<T: Scalar> DeviceArray<T> for GpuArray<T> {
    fn len(&self) -> usize {
        self.len
    }
}

impl<T: Scalar> fmt::Debug for GpuArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuArray")
            .field("len", &self.len)
            .field("bytes", &self.buffer.size())
            .finish()
    }
}

/// WGPU execution space
pub struct WgpuBackend {
    /// Backend name for logging
    name: String,

    device: wgpu::Device,
    queue: wgpu::Queue,

    multiply_pipeline: wgpu::ComputePipeline,

    alignment: usize,

    /// Elements per buffer under `max_buffer_size` and
    /// `max_storage_buffer_binding_size`
    max_elements: usize,
}

impl fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("name", &self.name)
            .field("alignment", &self.alignment)
            .field("max_elements", &self.max_elements)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a new WGPU backend with the default alignment
    pub fn new() -> Result<Self> {
        Self::with_alignment(DEFAULT_GPU_ALIGNMENT)
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::with_alignment(config.gpu_alignment)
    }

    pub fn with_alignment(alignment: usize) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RuntimeError::BackendUnavailable("Failed to find WGPU adapter".to_string()))?;

        let adapter_info = adapter.get_info();
        let name = format!("WGPU ({} - {:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Neurocable Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| RuntimeError::Device(format!("Failed to create device: {}", e)))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Multiply In Place Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/multiply_in_place.wgsl").into()),
        });

        let multiply_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Multiply In Place Pipeline"),
            layout: None, // Auto-layout from shader
            module: &shader,
            entry_point: "multiply_in_place_main",
        });

        let max_elements = max_elements_for(&device.limits());
        info!(
            "Using {} backend (alignment {}, max {} elements per arena)",
            name,
            alignment.max(1),
            max_elements
        );

        Ok(Self {
            name,
            device,
            queue,
            multiply_pipeline,
            alignment: alignment.max(1),
            max_elements,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn storage_buffer<T: Scalar>(&self, label: &str, len: usize, fill: T) -> Result<wgpu::Buffer> {
        // Past the device limits wgpu raises a validation error instead of
        // returning one
        if len > self.max_elements {
            return Err(RuntimeError::CapacityExceeded {
                requested: len,
                available: self.max_elements,
            });
        }
        // Zero-sized storage bindings are invalid; keep at least one element
        let contents = vec![fill; len.max(1)];
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&contents),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            }))
    }

    fn scratch_buffer(&self, label: &str, bytes: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes,
            usage,
            mapped_at_creation: false,
        })
    }
}

/// Largest storage buffer, in 4-byte elements, that `limits` allow to be
/// created and bound whole
pub fn max_elements_for(limits: &wgpu::Limits) -> usize {
    let bytes = limits
        .max_buffer_size
        .min(u64::from(limits.max_storage_buffer_binding_size));
    usize::try_from(bytes / ELEMENT_BYTES).unwrap_or(usize::MAX)
}

fn byte_range(offset: usize, len: usize) -> (u64, u64) {
    (offset as u64 * ELEMENT_BYTES, len as u64 * ELEMENT_BYTES)
}

impl ExecutionSpace for WgpuBackend {
    type Array<T: Scalar> = GpuArray<T>;

    fn platform_name(&self) -> &'static str {
        "WGPU"
    }

    fn alignment(&self) -> usize {
        self.alignment
    }

    fn max_elements(&self) -> usize {
        self.max_elements
    }

    fn allocate<T: Scalar>(&self, len: usize, fill: T) -> Result<GpuArray<T>> {
        Ok(GpuArray {
            buffer: self.storage_buffer("Arena Buffer", len, fill)?,
            len,
            _marker: PhantomData,
        })
    }

    fn grow<T: Scalar>(&self, array: &mut GpuArray<T>, new_len: usize, fill: T) -> Result<()> {
        if new_len <= array.len {
            return Ok(());
        }
        let buffer = self.storage_buffer("Arena Buffer", new_len, fill)?;
        if array.len > 0 {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Grow Arena"),
                });
            let (_, bytes) = byte_range(0, array.len);
            encoder.copy_buffer_to_buffer(&array.buffer, 0, &buffer, 0, bytes);
            self.queue.submit(Some(encoder.finish()));
        }
        debug!("Grew GPU arena from {} to {} elements", array.len, new_len);
        array.buffer = buffer;
        array.len = new_len;
        Ok(())
    }

    fn write<T: Scalar>(&self, array: &mut GpuArray<T>, offset: usize, src: &[T]) -> Result<()> {
        RuntimeError::check_range(offset, src.len(), array.len)?;
        if src.is_empty() {
            return Ok(());
        }
        let (start, _) = byte_range(offset, 0);
        self.queue
            .write_buffer(&array.buffer, start, bytemuck::cast_slice(src));
        Ok(())
    }

    fn fill<T: Scalar>(
        &self,
        array: &mut GpuArray<T>,
        offset: usize,
        len: usize,
        value: T,
    ) -> Result<()> {
        let values = vec![value; len];
        self.write(array, offset, &values)
    }

    fn copy_within<T: Scalar>(
        &self,
        array: &mut GpuArray<T>,
        src: usize,
        dst: usize,
        len: usize,
    ) -> Result<()> {
        RuntimeError::check_range(src, len, array.len)?;
        RuntimeError::check_range(dst, len, array.len)?;
        if len == 0 {
            return Ok(());
        }

        // Buffer-to-buffer copies may not alias, so bounce through a scratch buffer
        let (src_start, bytes) = byte_range(src, len);
        let (dst_start, _) = byte_range(dst, len);
        let scratch = self.scratch_buffer(
            "Copy Scratch",
            bytes,
            wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        );
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Copy Within"),
            });
        encoder.copy_buffer_to_buffer(&array.buffer, src_start, &scratch, 0, bytes);
        encoder.copy_buffer_to_buffer(&scratch, 0, &array.buffer, dst_start, bytes);
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn read<T: Scalar>(&self, array: &GpuArray<T>, offset: usize, len: usize) -> Result<Vec<T>> {
        RuntimeError::check_range(offset, len, array.len)?;
        if len == 0 {
            return Ok(Vec::new());
        }

        let (start, bytes) = byte_range(offset, len);
        let staging_buffer = self.scratch_buffer(
            "Readback Staging",
            bytes,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Download Arena Range"),
            });
        encoder.copy_buffer_to_buffer(&array.buffer, start, &staging_buffer, 0, bytes);
        self.queue.submit(Some(encoder.finish()));

        // Map staging buffer to CPU memory (blocking)
        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| RuntimeError::Device("Failed to receive buffer map result".to_string()))?
            .map_err(|e| RuntimeError::Device(format!("Failed to map buffer: {:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let values: Vec<T> = bytemuck::cast_slice(&data).to_vec();

        // Unmap immediately after copying
        drop(data);
        staging_buffer.unmap();

        Ok(values)
    }

    fn multiply_in_place(
        &self,
        values: &mut GpuArray<Value>,
        v_off: usize,
        indices: &GpuArray<Index>,
        i_off: usize,
        n: usize,
    ) -> Result<()> {
        RuntimeError::check_range(v_off, n, values.len)?;
        RuntimeError::check_range(i_off, n, indices.len)?;
        if n == 0 {
            return Ok(());
        }

        let layout = self.multiply_pipeline.get_bind_group_layout(0);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Multiply In Place"),
            });

        let chunk = WORKGROUP_SIZE * MAX_WORKGROUPS_PER_DISPATCH;
        for base in (0..n).step_by(chunk) {
            let params = MultiplyParams {
                v_off: v_off as u32,
                i_off: i_off as u32,
                n: n as u32,
                base: base as u32,
            };
            let params_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Multiply Params"),
                    contents: bytemuck::bytes_of(&params),
                    usage: wgpu::BufferUsages::UNIFORM,
                });

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Multiply Bind Group"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: values.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: indices.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            });

            let sweep = (n - base).min(chunk);
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Multiply In Place Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.multiply_pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(sweep.div_ceil(WORKGROUP_SIZE) as u32, 1, 1);
        }

        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}
