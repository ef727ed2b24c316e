//! Skybox render pipeline - cubemap
//!
//! Renders a fullscreen triangle at the far plane, sampling a cube texture
//! along the view ray. No vertex buffers required. Drawn first in the scene
//! pass without depth writes so scene geometry always lands in front.

use crate::context::RenderError;
use crate::pipeline::{DEPTH_FORMAT, HDR_FORMAT};
use crate::shader::{create_checked_pipeline, create_checked_shader};
use bytemuck::{Pod, Zeroable};
use frostvale_core::tonemap::luma_uniform;
use glam::Mat4;

/// Uniform data for the skybox: inverse view-projection (rotation only)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SkyboxUniforms {
    pub inv_view_proj: [[f32; 4]; 4],
    /// bloom_threshold, unused x3
    pub params: [f32; 4],
    /// Luma weights for the bright-pass split, w unused
    pub luma: [f32; 4],
}

impl SkyboxUniforms {
    /// Strip translation from `view` so the sky stays at infinity.
    pub fn new(view: Mat4, projection: Mat4, bloom_threshold: f32) -> Self {
        let mut rotation_only = view;
        rotation_only.w_axis = glam::Vec4::W;
        Self {
            inv_view_proj: (projection * rotation_only).inverse().to_cols_array_2d(),
            params: [bloom_threshold, 0.0, 0.0, 0.0],
            luma: luma_uniform(),
        }
    }
}

/// The skybox rendering pipeline
pub struct SkyboxPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_bind_group_layout: wgpu::BindGroupLayout,
    pub texture_bind_group_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
}

impl SkyboxPipeline {
    pub fn new(device: &wgpu::Device) -> Result<Self, RenderError> {
        let shader =
            create_checked_shader(device, "Skybox Shader", include_str!("skybox_shader.wgsl"))?;

        // Bind group 0: SkyboxUniforms
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Skybox Uniform Bind Group Layout"),
            });

        // Bind group 1: cube texture + sampler
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::Cube,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
                label: Some("Skybox Texture Bind Group Layout"),
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let hdr_target = Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });

        let pipeline = create_checked_pipeline(device, "Skybox Pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Skybox Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_skybox"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_skybox"),
                    targets: &[hdr_target.clone(), hdr_target.clone()],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Always,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skybox Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            pipeline,
            uniform_bind_group_layout,
            texture_bind_group_layout,
            sampler,
        })
    }

    pub fn create_texture_bind_group(
        &self,
        device: &wgpu::Device,
        cube_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Texture Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(cube_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn camera_translation_does_not_move_the_sky() {
        let proj = Mat4::perspective_rh(45f32.to_radians(), 1.5, 0.1, 100.0);
        let at_origin = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let moved = Mat4::look_at_rh(Vec3::new(5.0, 2.0, -3.0), Vec3::new(5.0, 2.0, -4.0), Vec3::Y);
        let a = SkyboxUniforms::new(at_origin, proj, 1.0);
        let b = SkyboxUniforms::new(moved, proj, 1.0);
        let a = Mat4::from_cols_array_2d(&a.inv_view_proj);
        let b = Mat4::from_cols_array_2d(&b.inv_view_proj);
        assert!(a.abs_diff_eq(b, 1e-4));
    }

    #[test]
    fn center_ray_points_forward() {
        let proj = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let u = SkyboxUniforms::new(view, proj, 1.0);
        let inv = Mat4::from_cols_array_2d(&u.inv_view_proj);
        let far = inv * Vec4::new(0.0, 0.0, 1.0, 1.0);
        let near = inv * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let dir = (far.truncate() / far.w - near.truncate() / near.w).normalize();
        assert!((dir - Vec3::NEG_Z).length() < 1e-3);
    }
}
