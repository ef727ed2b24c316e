//! Scene pipeline: Blinn-Phong shading into the two HDR attachments

use crate::context::RenderError;
use crate::primitives::Vertex;
use crate::shader::{create_checked_pipeline, create_checked_shader};
use bytemuck::{Pod, Zeroable};
use frostvale_core::tonemap::luma_uniform;
use frostvale_core::{PointLight, RenderSettings, SceneLights, MAX_POINT_LIGHTS};
use glam::{Mat4, Vec3};

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Point light as laid out in the frame uniform buffer
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct GpuPointLight {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// constant, linear, quadratic, unused
    pub attenuation: [f32; 4],
}

impl From<&PointLight> for GpuPointLight {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.extend(1.0).into(),
            ambient: light.ambient.extend(0.0).into(),
            diffuse: light.diffuse.extend(0.0).into(),
            specular: light.specular.extend(0.0).into(),
            attenuation: [light.constant, light.linear, light.quadratic, 0.0],
        }
    }
}

/// Per-frame uniforms shared by every scene draw (group 0)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub dir_direction: [f32; 4],
    pub dir_ambient: [f32; 4],
    pub dir_diffuse: [f32; 4],
    pub dir_specular: [f32; 4],
    pub points: [GpuPointLight; MAX_POINT_LIGHTS],
    pub point_count: u32,
    pub height_scale: f32,
    pub bloom_threshold: f32,
    pub _pad: f32,
    /// Luma weights for the bright-pass split, w unused
    pub luma: [f32; 4],
}

impl FrameUniforms {
    pub fn new(
        view_proj: Mat4,
        camera_pos: Vec3,
        lights: &SceneLights,
        settings: &RenderSettings,
    ) -> Self {
        let active = lights.active_points();
        let mut points = [GpuPointLight::default(); MAX_POINT_LIGHTS];
        for (slot, light) in points.iter_mut().zip(active) {
            *slot = GpuPointLight::from(light);
        }
        let dir = &lights.directional;
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera_pos.extend(1.0).into(),
            dir_direction: dir.direction.extend(0.0).into(),
            dir_ambient: dir.ambient.extend(0.0).into(),
            dir_diffuse: dir.diffuse.extend(0.0).into(),
            dir_specular: dir.specular.extend(0.0).into(),
            points,
            point_count: active.len() as u32,
            height_scale: settings.height_scale,
            bloom_threshold: settings.bloom_threshold,
            _pad: 0.0,
            luma: luma_uniform(),
        }
    }
}

/// Per-object uniforms (group 1, binding 0)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// shininess, uv_scale, has_normal_map, has_depth_map
    pub params: [f32; 4],
}

impl ObjectUniforms {
    pub fn new(model: Mat4, shininess: f32, uv_scale: f32, has_normal: bool, has_depth: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            params: [
                shininess,
                uv_scale,
                if has_normal { 1.0 } else { 0.0 },
                if has_depth { 1.0 } else { 0.0 },
            ],
        }
    }
}

/// Render pipeline for scene geometry with its bind group layouts
pub struct ScenePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub frame_bind_group_layout: wgpu::BindGroupLayout,
    pub object_bind_group_layout: wgpu::BindGroupLayout,
}

impl ScenePipeline {
    pub fn new(device: &wgpu::Device) -> Result<Self, RenderError> {
        let shader =
            create_checked_shader(device, "Scene Shader", include_str!("scene_shader.wgsl"))?;

        // Bind group 0: frame uniforms (vertex + fragment)
        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Frame Bind Group Layout"),
            });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        // Bind group 1: object uniforms + diffuse, normal, depth maps
        let object_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    texture_entry(1),
                    texture_entry(2),
                    texture_entry(3),
                    wgpu::BindGroupLayoutEntry {
                        binding: 4,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
                label: Some("Object Bind Group Layout"),
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &object_bind_group_layout],
            push_constant_ranges: &[],
        });

        let hdr_target = Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });

        let pipeline = create_checked_pipeline(device, "Scene Pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scene Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::desc()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[hdr_target.clone(), hdr_target.clone()],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Walls and imported models are viewed from both sides
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        Ok(Self {
            pipeline,
            frame_bind_group_layout,
            object_bind_group_layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frostvale_core::PointLight;

    #[test]
    fn uniform_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 80);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 496);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 144);
    }

    #[test]
    fn frame_uniforms_pack_active_point_lights() {
        let mut lights = SceneLights::default();
        lights.points = (0..6)
            .map(|i| PointLight {
                position: Vec3::splat(i as f32),
                orbit: None,
                ..PointLight::default()
            })
            .collect();
        let settings = RenderSettings::default();
        let u = FrameUniforms::new(Mat4::IDENTITY, Vec3::ZERO, &lights, &settings);
        assert_eq!(u.point_count, MAX_POINT_LIGHTS as u32);
        assert_eq!(u.points[3].position, [3.0, 3.0, 3.0, 1.0]);
        assert_eq!(u.height_scale, settings.height_scale);
        assert_eq!(u.bloom_threshold, settings.bloom_threshold);
        assert_eq!(u.luma, luma_uniform());
    }

    #[test]
    fn object_params_encode_map_flags() {
        let u = ObjectUniforms::new(Mat4::IDENTITY, 32.0, 15.0, true, false);
        assert_eq!(u.params, [32.0, 15.0, 1.0, 0.0]);
        assert_eq!(u.normal_matrix, Mat4::IDENTITY.to_cols_array_2d());
    }
}
