//! wgpu backend: device bring-up, buffers and bind groups, pipelines, and
//! translation of a scheduler [`CommandList`](crate::scheduler::CommandList)
//! into encoder calls.

mod encode;
mod pipelines;
mod resources;

pub use encode::encode_commands;
pub use pipelines::{Pipelines, ShaderSet};
pub use resources::{BindLayouts, GpuResources};

use std::sync::Arc;

use crate::scheduler::layout::required_storage_buffers_per_stage;
use crate::settings::PowerMode;
use crate::util::{Error, Result};

/// Swap chain format the display shader writes.
pub const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

/// Device, queue and configured surface.
pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
}

fn power_preference(mode: PowerMode) -> wgpu::PowerPreference {
    match mode {
        PowerMode::LowPower => wgpu::PowerPreference::LowPower,
        PowerMode::HighPerformance => wgpu::PowerPreference::HighPerformance,
    }
}

impl GpuContext {
    /// Bring up adapter, device and surface for `window`. Every failure here is
    /// fatal; the frame loop never starts.
    #[tracing::instrument(skip(window))]
    pub fn new(window: Arc<winit::window::Window>, width: u32, height: u32, power: PowerMode) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Surface(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power_preference(power),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| Error::NoAdapter(e.to_string()))?;

        let info = adapter.get_info();
        tracing::info!("adapter: {} ({:?})", info.name, info.backend);

        let supported = adapter.limits();
        let needed = required_storage_buffers_per_stage();
        if supported.max_storage_buffers_per_shader_stage < needed {
            return Err(Error::DeviceRequest(format!(
                "adapter binds {} storage buffers per stage, {needed} required",
                supported.max_storage_buffers_per_shader_stage
            )));
        }
        let required_limits = wgpu::Limits {
            max_storage_buffers_per_shader_stage: needed,
            max_storage_buffer_binding_size: supported.max_storage_buffer_binding_size,
            max_buffer_size: supported.max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("wavefront_device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| Error::DeviceRequest(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        if !caps.formats.contains(&SURFACE_FORMAT) {
            return Err(Error::SurfaceFormat {
                expected: format!("{SURFACE_FORMAT:?}"),
                actual: caps
                    .formats
                    .first()
                    .map(|f| format!("{f:?}"))
                    .unwrap_or_else(|| "none".to_string()),
            });
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: SURFACE_FORMAT,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        Ok(Self { surface, adapter, device, queue, config })
    }

    /// Next swap chain image. `None` skips this frame (lost/outdated surface is
    /// reconfigured for the next one).
    pub fn acquire(&self) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost or outdated, skipping frame");
                self.surface.configure(&self.device, &self.config);
                None
            }
            Err(e) => {
                tracing::warn!("surface acquire failed: {e}");
                None
            }
        }
    }
}
