//! wgpu render context setup

use crate::targets::wgpu_format;
use frostvale_core::{FormatCaps, FrostError, TargetCaps, TargetFormat};
use std::sync::Arc;
use thiserror::Error;
use winit::window::Window;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    SurfaceCreation(String),
    #[error("Failed to get adapter")]
    AdapterNotFound,
    #[error("Failed to create device: {0}")]
    DeviceCreation(String),
    #[error("Surface error: {0}")]
    SurfaceError(String),
    #[error("Shader '{label}' failed validation: {message}")]
    ShaderCompilation { label: String, message: String },
    #[error("Pipeline '{label}' failed validation: {message}")]
    PipelineCreation { label: String, message: String },
    #[error("Failed to load model '{path}': {reason}")]
    ModelLoad { path: String, reason: String },
    #[error(transparent)]
    Core(#[from] FrostError),
}

/// wgpu render context containing device, queue, and surface
pub struct RenderContext {
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
}

impl RenderContext {
    /// Create a new render context for a window
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::SurfaceCreation(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::AdapterNotFound)?;

        let info = adapter.get_info();
        log::info!("Using adapter: {} ({:?})", info.name, info.backend);

        // Per-adapter format features let the multisample target use counts above 4.
        let required_features =
            adapter.features() & wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Frostvale Device"),
                    required_features,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceCreation(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RenderError::SurfaceError("surface reports no formats".into()))?;

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            config,
            size,
        })
    }

    /// Resize the surface. Zero-sized requests (minimized window) are ignored.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) -> bool {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            true
        } else {
            false
        }
    }

    /// Reconfigure the surface at its current size after it was lost or outdated.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Get aspect ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.size.width.max(1) as f32 / self.size.height.max(1) as f32
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Whether the surface encodes gamma itself, so the resolve pass writes linear color.
    pub fn surface_is_srgb(&self) -> bool {
        self.config.format.is_srgb()
    }

    /// What this device can render into, for validating render targets before creation.
    pub fn target_caps(&self) -> TargetCaps {
        let limits = self.device.limits();
        let adapter_specific = self
            .device
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);

        let formats = [
            TargetFormat::Rgba16Float,
            TargetFormat::Rgba8Unorm,
            TargetFormat::Depth32Float,
        ]
        .into_iter()
        .map(|format| {
            let wgpu_fmt = wgpu_format(format);
            let features = if adapter_specific {
                self.adapter.get_texture_format_features(wgpu_fmt)
            } else {
                wgpu_fmt.guaranteed_format_features(self.device.features())
            };
            let sample_counts = [1, 2, 4, 8, 16]
                .into_iter()
                .filter(|&n| n == 1 || features.flags.sample_count_supported(n))
                .collect();
            FormatCaps {
                format,
                renderable: features
                    .allowed_usages
                    .contains(wgpu::TextureUsages::RENDER_ATTACHMENT),
                sample_counts,
            }
        })
        .collect();

        TargetCaps {
            max_dimension: limits.max_texture_dimension_2d,
            max_color_attachments: limits.max_color_attachments,
            formats,
        }
    }
}
