//! Off-screen render targets of the post-processing chain
//!
//! Every target is described as a [`TargetDesc`] and checked against the
//! device's [`TargetCaps`] before any texture is created, so an unsupported
//! configuration fails setup with a readable error instead of a validation panic.

use crate::context::RenderError;
use frostvale_core::{TargetCaps, TargetDesc, TargetFormat, TargetId};

/// Samples requested for the multisample composite target.
pub const DEFAULT_MSAA_SAMPLES: u32 = 4;

pub fn wgpu_format(format: TargetFormat) -> wgpu::TextureFormat {
    match format {
        TargetFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TargetFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TargetFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

/// A single texture attachment and its default view.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        device: &wgpu::Device,
        label: &str,
        desc: &TargetDesc,
        format: TargetFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: desc.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_format(format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// All intermediate targets of one frame, sized to the surface.
pub struct FrameTargets {
    pub hdr_color: RenderTarget,
    pub hdr_bright: RenderTarget,
    pub hdr_depth: RenderTarget,
    pub ping_pong: [RenderTarget; 2],
    pub multisample: RenderTarget,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

impl FrameTargets {
    /// Validate and create every target. `requested_samples` is lowered to the
    /// highest count the device supports for the multisample format.
    pub fn new(
        device: &wgpu::Device,
        caps: &TargetCaps,
        width: u32,
        height: u32,
        requested_samples: u32,
    ) -> Result<Self, RenderError> {
        let width = width.max(1);
        let height = height.max(1);
        let sample_count = caps.best_sample_count(TargetFormat::Rgba8Unorm, requested_samples);
        if sample_count != requested_samples {
            log::warn!(
                "{}x multisampling unsupported for the composite target, using {}x",
                requested_samples,
                sample_count
            );
        }

        let hdr = TargetDesc::hdr(width, height);
        let ping = [
            TargetDesc::ping_pong(0, width, height),
            TargetDesc::ping_pong(1, width, height),
        ];
        let ms = TargetDesc::multisample(width, height, sample_count);
        for desc in [&hdr, &ping[0], &ping[1], &ms] {
            desc.validate(caps)?;
        }

        let hdr_color = RenderTarget::new(device, "HDR Color Target", &hdr, hdr.color[0]);
        let hdr_bright = RenderTarget::new(device, "HDR Bright Target", &hdr, hdr.color[1]);
        let hdr_depth =
            RenderTarget::new(device, "HDR Depth Target", &hdr, TargetFormat::Depth32Float);
        let ping_pong = [
            RenderTarget::new(device, "Ping-Pong Target 0", &ping[0], ping[0].color[0]),
            RenderTarget::new(device, "Ping-Pong Target 1", &ping[1], ping[1].color[0]),
        ];
        let multisample = RenderTarget::new(device, "Multisample Target", &ms, ms.color[0]);

        log::debug!(
            "Created frame targets {}x{} ({}x MSAA composite)",
            width,
            height,
            sample_count
        );

        Ok(Self {
            hdr_color,
            hdr_bright,
            hdr_depth,
            ping_pong,
            multisample,
            width,
            height,
            sample_count,
        })
    }

    /// View of an off-screen target. `Surface` lives outside this set and yields `None`.
    pub fn view(&self, id: TargetId) -> Option<&wgpu::TextureView> {
        match id {
            TargetId::HdrColor => Some(&self.hdr_color.view),
            TargetId::HdrBright => Some(&self.hdr_bright.view),
            TargetId::HdrDepth => Some(&self.hdr_depth.view),
            TargetId::PingPong(i) => self.ping_pong.get(i).map(|t| &t.view),
            TargetId::Multisample => Some(&self.multisample.view),
            TargetId::Surface => None,
        }
    }

    pub fn matches_size(&self, width: u32, height: u32) -> bool {
        self.width == width.max(1) && self.height == height.max(1)
    }
}
