//! Post-processing pipeline: ping-pong Gaussian blur, composite, resolve
//!
//! The scene renders into two Rgba16Float attachments. The bright-pass
//! attachment is blurred back and forth between two ping-pong targets, the
//! composite pass adds the blurred result to the HDR color and tone maps it
//! into an 8-bit multisampled target, and the resolve pass averages the
//! samples onto the surface with optional grayscale.
//!
//! Every pass records into the caller's encoder so a frame is one submission.

use crate::context::RenderError;
use crate::pipeline::HDR_FORMAT;
use crate::shader::{create_checked_pipeline, create_checked_shader};
use bytemuck::{Pod, Zeroable};
use frostvale_core::tonemap::{luma_uniform, DISPLAY_GAMMA};
use frostvale_core::{BlurDirection, GAUSSIAN_TAPS};
use wgpu::util::DeviceExt;

/// Format of the multisampled composite target.
pub const COMPOSITE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Uniform data for one blur direction.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BlurUniforms {
    /// Texel step along the blur axis
    pub axis: [f32; 2],
    pub _pad: [f32; 2],
    pub weights_lo: [f32; 4],
    pub weights_hi: [f32; 4],
}

impl BlurUniforms {
    pub fn new(
        direction: BlurDirection,
        width: u32,
        height: u32,
        weights: [f32; GAUSSIAN_TAPS],
    ) -> Self {
        let [ax, ay] = direction.axis();
        Self {
            axis: [ax / width.max(1) as f32, ay / height.max(1) as f32],
            _pad: [0.0; 2],
            weights_lo: [weights[0], weights[1], weights[2], weights[3]],
            weights_hi: [weights[4], 0.0, 0.0, 0.0],
        }
    }
}

/// Uniform data for the composite fullscreen pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CompositeUniforms {
    pub exposure: f32,
    pub hdr: u32,
    pub bloom: u32,
    pub _pad: u32,
}

impl CompositeUniforms {
    pub fn new(hdr: bool, bloom: bool, exposure: f32) -> Self {
        Self {
            exposure,
            hdr: hdr as u32,
            bloom: bloom as u32,
            _pad: 0,
        }
    }
}

/// Uniform data for the resolve pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ResolveUniforms {
    /// Luma weights for grayscale, w unused
    pub luma: [f32; 4],
    pub grayscale: u32,
    pub apply_gamma: u32,
    pub sample_count: u32,
    pub inv_gamma: f32,
}

impl ResolveUniforms {
    pub fn new(grayscale: bool, apply_gamma: bool, sample_count: u32) -> Self {
        Self {
            luma: luma_uniform(),
            grayscale: grayscale as u32,
            apply_gamma: apply_gamma as u32,
            sample_count,
            inv_gamma: 1.0 / DISPLAY_GAMMA,
        }
    }
}

/// All render pipelines and bind group layouts for post-processing.
pub struct PostProcessPipeline {
    // Blur (one direction per pass, source → ping-pong target)
    pub blur_pipeline: wgpu::RenderPipeline,
    pub blur_uniform_bgl: wgpu::BindGroupLayout,
    pub blur_texture_bgl: wgpu::BindGroupLayout,
    /// Horizontal and vertical uniforms, indexed by direction
    blur_uniform_buffers: [wgpu::Buffer; 2],
    // Composite (HDR + bloom → tone mapped multisample target)
    pub composite_pipeline: wgpu::RenderPipeline,
    pub composite_uniform_bgl: wgpu::BindGroupLayout,
    pub composite_texture_bgl: wgpu::BindGroupLayout,
    composite_uniform_buffer: wgpu::Buffer,
    // Resolve (multisample target → surface)
    pub resolve_pipeline: wgpu::RenderPipeline,
    pub resolve_uniform_bgl: wgpu::BindGroupLayout,
    pub resolve_texture_bgl: wgpu::BindGroupLayout,
    resolve_uniform_buffer: wgpu::Buffer,
    pub linear_sampler: wgpu::Sampler,
    // A 1x1 black texture used when bloom is disabled
    pub black_texture_view: wgpu::TextureView,
    pub sample_count: u32,
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
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
        label: Some(label),
    })
}

fn filterable_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    vs_entry: &str,
    fs_entry: &str,
    layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
    sample_count: u32,
) -> Result<wgpu::RenderPipeline, RenderError> {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{} Layout", label)),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    create_checked_pipeline(device, label, || {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some(vs_entry),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(fs_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    })
}

/// The resolve shader reads a multisampled texture. With a single sample the
/// composite target is a plain 2D texture and the sample index becomes mip 0.
fn resolve_shader_source(sample_count: u32) -> String {
    let source = include_str!("resolve_shader.wgsl");
    if sample_count > 1 {
        source.to_string()
    } else {
        source.replace("texture_multisampled_2d<f32>", "texture_2d<f32>")
    }
}

fn color_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

impl PostProcessPipeline {
    /// Create all post-processing pipelines and shared resources.
    ///
    /// `sample_count` must match the multisample target the composite pass writes.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self, RenderError> {
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("PostProcess Linear Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        // Blur
        let blur_shader =
            create_checked_shader(device, "Blur Shader", include_str!("blur_shader.wgsl"))?;
        let blur_uniform_bgl = uniform_layout(device, "Blur Uniform BGL");
        let blur_texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[filterable_texture_entry(0), sampler_entry(1)],
            label: Some("Blur Texture BGL"),
        });
        let blur_pipeline = fullscreen_pipeline(
            device,
            "Blur Pipeline",
            &blur_shader,
            "vs_fullscreen",
            "fs_blur",
            &[&blur_uniform_bgl, &blur_texture_bgl],
            HDR_FORMAT,
            1,
        )?;
        let blur_uniform_buffers = [BlurDirection::Horizontal, BlurDirection::Vertical].map(|dir| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Blur {:?} Uniform Buffer", dir)),
                size: std::mem::size_of::<BlurUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        // Composite
        let composite_shader = create_checked_shader(
            device,
            "Composite Shader",
            include_str!("composite_shader.wgsl"),
        )?;
        let composite_uniform_bgl = uniform_layout(device, "Composite Uniform BGL");
        let composite_texture_bgl =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    filterable_texture_entry(0),
                    filterable_texture_entry(1),
                    sampler_entry(2),
                ],
                label: Some("Composite Texture BGL"),
            });
        let composite_pipeline = fullscreen_pipeline(
            device,
            "Composite Pipeline",
            &composite_shader,
            "vs_composite",
            "fs_composite",
            &[&composite_uniform_bgl, &composite_texture_bgl],
            COMPOSITE_FORMAT,
            sample_count,
        )?;
        let composite_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Uniform Buffer"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Resolve
        let resolve_shader =
            create_checked_shader(device, "Resolve Shader", &resolve_shader_source(sample_count))?;
        let resolve_uniform_bgl = uniform_layout(device, "Resolve Uniform BGL");
        let resolve_texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: sample_count > 1,
                },
                count: None,
            }],
            label: Some("Resolve Texture BGL"),
        });
        let resolve_pipeline = fullscreen_pipeline(
            device,
            "Resolve Pipeline",
            &resolve_shader,
            "vs_resolve",
            "fs_resolve",
            &[&resolve_uniform_bgl, &resolve_texture_bgl],
            surface_format,
            1,
        )?;
        let resolve_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Resolve Uniform Buffer"),
            size: std::mem::size_of::<ResolveUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // 1x1 black stand-in for the bloom input
        let black_texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Black Bloom Texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: HDR_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[0u8; 8],
        );
        let black_texture_view = black_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            blur_pipeline,
            blur_uniform_bgl,
            blur_texture_bgl,
            blur_uniform_buffers,
            composite_pipeline,
            composite_uniform_bgl,
            composite_texture_bgl,
            composite_uniform_buffer,
            resolve_pipeline,
            resolve_uniform_bgl,
            resolve_texture_bgl,
            resolve_uniform_buffer,
            linear_sampler,
            black_texture_view,
            sample_count,
        })
    }

    /// Write both blur directions' uniforms for the current target size.
    pub fn write_blur_uniforms(
        &self,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        weights: [f32; GAUSSIAN_TAPS],
    ) {
        for (buffer, dir) in self
            .blur_uniform_buffers
            .iter()
            .zip([BlurDirection::Horizontal, BlurDirection::Vertical])
        {
            let uniforms = BlurUniforms::new(dir, width, height, weights);
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[uniforms]));
        }
    }

    /// Record one blur pass from `source` into `target`.
    pub fn record_blur(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        direction: BlurDirection,
        source: &wgpu::TextureView,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        let buffer = match direction {
            BlurDirection::Horizontal => &self.blur_uniform_buffers[0],
            BlurDirection::Vertical => &self.blur_uniform_buffers[1],
        };
        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blur Uniform BG"),
            layout: &self.blur_uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        let source_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blur Source BG"),
            layout: &self.blur_texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });

        let mut pass = color_pass(encoder, "Blur Pass", target, load);
        pass.set_pipeline(&self.blur_pipeline);
        pass.set_bind_group(0, &uniform_bg, &[]);
        pass.set_bind_group(1, &source_bg, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Record the composite pass. `bloom` is `None` when bloom is disabled.
    #[allow(clippy::too_many_arguments)]
    pub fn record_composite(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        hdr_view: &wgpu::TextureView,
        bloom: Option<&wgpu::TextureView>,
        hdr: bool,
        exposure: f32,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        let uniforms = CompositeUniforms::new(hdr, bloom.is_some(), exposure);
        queue.write_buffer(
            &self.composite_uniform_buffer,
            0,
            bytemuck::cast_slice(&[uniforms]),
        );

        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Uniform BG"),
            layout: &self.composite_uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.composite_uniform_buffer.as_entire_binding(),
            }],
        });
        let texture_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Texture BG"),
            layout: &self.composite_texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(hdr_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        bloom.unwrap_or(&self.black_texture_view),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });

        let mut pass = color_pass(encoder, "Composite Pass", target, load);
        pass.set_pipeline(&self.composite_pipeline);
        pass.set_bind_group(0, &uniform_bg, &[]);
        pass.set_bind_group(1, &texture_bg, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Record the resolve pass onto the surface view.
    #[allow(clippy::too_many_arguments)]
    pub fn record_resolve(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        multisample_view: &wgpu::TextureView,
        grayscale: bool,
        apply_gamma: bool,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        let uniforms = ResolveUniforms::new(grayscale, apply_gamma, self.sample_count);
        queue.write_buffer(&self.resolve_uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Resolve Uniform BG"),
            layout: &self.resolve_uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.resolve_uniform_buffer.as_entire_binding(),
            }],
        });
        let texture_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Resolve Texture BG"),
            layout: &self.resolve_texture_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(multisample_view),
            }],
        });

        let mut pass = color_pass(encoder, "Resolve Pass", target, load);
        pass.set_pipeline(&self.resolve_pipeline);
        pass.set_bind_group(0, &uniform_bg, &[]);
        pass.set_bind_group(1, &texture_bg, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frostvale_core::GAUSSIAN_WEIGHTS;

    #[test]
    fn uniform_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 48);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 16);
        assert_eq!(std::mem::size_of::<ResolveUniforms>(), 32);
    }

    #[test]
    fn blur_axis_is_one_texel_along_direction() {
        let h = BlurUniforms::new(BlurDirection::Horizontal, 800, 600, GAUSSIAN_WEIGHTS);
        assert_eq!(h.axis, [1.0 / 800.0, 0.0]);
        let v = BlurUniforms::new(BlurDirection::Vertical, 800, 600, GAUSSIAN_WEIGHTS);
        assert_eq!(v.axis, [0.0, 1.0 / 600.0]);
    }

    #[test]
    fn blur_weights_are_split_across_two_vectors() {
        let u = BlurUniforms::new(BlurDirection::Horizontal, 1, 1, GAUSSIAN_WEIGHTS);
        assert_eq!(u.weights_lo, [
            GAUSSIAN_WEIGHTS[0],
            GAUSSIAN_WEIGHTS[1],
            GAUSSIAN_WEIGHTS[2],
            GAUSSIAN_WEIGHTS[3],
        ]);
        assert_eq!(u.weights_hi[0], GAUSSIAN_WEIGHTS[4]);
    }

    #[test]
    fn resolve_uniforms_carry_shared_color_constants() {
        let u = ResolveUniforms::new(true, true, 4);
        assert_eq!(u.luma, luma_uniform());
        assert_eq!(u.inv_gamma, 1.0 / DISPLAY_GAMMA);
        assert_eq!((u.grayscale, u.apply_gamma, u.sample_count), (1, 1, 4));
    }

    #[test]
    fn grayscale_flag_toggled_twice_gives_identical_uniforms() {
        let before = ResolveUniforms::new(false, false, 4);
        let gray = ResolveUniforms::new(true, false, 4);
        assert_ne!(bytemuck::bytes_of(&before), bytemuck::bytes_of(&gray));
        let after = ResolveUniforms::new(false, false, 4);
        assert_eq!(bytemuck::bytes_of(&before), bytemuck::bytes_of(&after));
    }

    #[test]
    fn composite_uniforms_keep_negative_exposure() {
        let u = CompositeUniforms::new(true, false, -0.5);
        assert_eq!(u.exposure, -0.5);
        assert_eq!((u.hdr, u.bloom), (1, 0));
    }

    #[test]
    fn single_sample_resolve_shader_parses() {
        let source = resolve_shader_source(1);
        assert!(source.contains("texture_2d<f32>"));
        naga::front::wgsl::parse_str(&source).expect("single-sample resolve shader failed to parse");
    }
}
