//! Scene renderer - uploads a scene description and executes the frame plan
//!
//! Each frame is built as a [`FramePlan`] from the current render settings,
//! validated, and then walked operation by operation into a single command
//! encoder. A `Clear` operation is not a pass of its own: it marks its target
//! so the next pass that writes it starts with `LoadOp::Clear`.

use crate::context::{RenderContext, RenderError};
use crate::gpu_mesh::GpuMesh;
use crate::model_loader::{load_model, ModelPart};
use crate::pipeline::{FrameUniforms, ObjectUniforms, ScenePipeline};
use crate::postprocess::PostProcessPipeline;
use crate::primitives::create_primitive_mesh;
use crate::skybox_pipeline::{SkyboxPipeline, SkyboxUniforms};
use crate::targets::{FrameTargets, DEFAULT_MSAA_SAMPLES};
use crate::texture_cache::{
    check_texture_size, upload_rgba, DefaultTexture, GpuTexture, TextureCache, TextureKind,
};
use frostvale_core::{
    FlyCamera, FramePlan, FrostError, MeshRef, PassOp, Placement, RenderSettings, SceneDescription,
    SceneLights, SceneObject, TargetCaps, TargetId, GAUSSIAN_WEIGHTS,
};
use glam::Vec3;
use std::collections::HashSet;
use std::path::PathBuf;
use wgpu::util::DeviceExt;

/// Configuration for creating a SceneRenderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Requested sample count of the composite target; lowered to what the device supports
    pub msaa_samples: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            msaa_samples: DEFAULT_MSAA_SAMPLES,
        }
    }
}

/// Everything the renderer needs from the application for one frame.
pub struct FrameInputs<'a> {
    pub camera: &'a FlyCamera,
    pub lights: &'a SceneLights,
    pub placements: &'a [Placement; 3],
    pub settings: &'a RenderSettings,
    pub clear_color: Vec3,
    pub overlay_visible: bool,
}

/// Draws a debug overlay on top of the resolved frame.
///
/// The overlay must be fully prepared before `render` is called; `paint`
/// only records into the frame's encoder.
pub trait OverlayPainter {
    fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The surface was lost, outdated or timed out and has been reconfigured.
    Skipped,
}

/// One primitive of an object with its material bind group
struct DrawPart {
    mesh: GpuMesh,
    bind_group: wgpu::BindGroup,
    // Embedded model texture, kept alive with the bind group
    _diffuse: Option<GpuTexture>,
}

/// A scene object uploaded to the GPU
struct DrawObject {
    object: SceneObject,
    parts: Vec<DrawPart>,
    uniform_buffer: wgpu::Buffer,
    has_normal: bool,
    has_depth: bool,
}

/// Renders a scene description through the post-processing chain
pub struct SceneRenderer {
    scene_pipeline: ScenePipeline,
    skybox_pipeline: SkyboxPipeline,
    postprocess: PostProcessPipeline,
    targets: FrameTargets,
    caps: TargetCaps,
    config: RendererConfig,
    textures: TextureCache,
    objects: Vec<DrawObject>,
    frame_uniform_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    skybox_uniform_buffer: wgpu::Buffer,
    skybox_uniform_bind_group: wgpu::BindGroup,
    skybox_texture_bind_group: Option<wgpu::BindGroup>,
}

impl SceneRenderer {
    pub fn new(
        context: &RenderContext,
        scene: &SceneDescription,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        let device = &context.device;
        let queue = &context.queue;

        let caps = context.target_caps();
        let targets = FrameTargets::new(
            device,
            &caps,
            context.config.width,
            context.config.height,
            config.msaa_samples,
        )?;

        let scene_pipeline = ScenePipeline::new(device)?;
        let skybox_pipeline = SkyboxPipeline::new(device)?;
        let postprocess = PostProcessPipeline::new(
            device,
            queue,
            context.surface_format(),
            targets.sample_count,
        )?;

        let frame_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &scene_pipeline.frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_uniform_buffer.as_entire_binding(),
            }],
        });

        let skybox_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Skybox Uniform Buffer"),
            size: std::mem::size_of::<SkyboxUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let skybox_uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Uniform Bind Group"),
            layout: &skybox_pipeline.uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: skybox_uniform_buffer.as_entire_binding(),
            }],
        });

        let mut renderer = Self {
            scene_pipeline,
            skybox_pipeline,
            postprocess,
            targets,
            caps,
            config,
            textures: TextureCache::new(device, queue),
            objects: Vec::new(),
            frame_uniform_buffer,
            frame_bind_group,
            skybox_uniform_buffer,
            skybox_uniform_bind_group,
            skybox_texture_bind_group: None,
        };

        if let Some(skybox) = &scene.skybox {
            let paths: [PathBuf; 6] = skybox.faces().map(|p| scene.resolve(p));
            let cube = renderer
                .textures
                .load_cubemap(device, queue, paths.each_ref().map(|p| p.as_path()));
            renderer.skybox_texture_bind_group = Some(
                renderer
                    .skybox_pipeline
                    .create_texture_bind_group(device, &cube.view),
            );
        }

        for object in &scene.objects {
            match renderer.upload_object(device, queue, scene, object) {
                Ok(draw) => renderer.objects.push(draw),
                Err(e) => log::warn!("Skipping object '{}': {}", object.name, e),
            }
        }

        log::info!(
            "Scene '{}' ready: {} of {} objects uploaded",
            scene.name,
            renderer.objects.len(),
            scene.objects.len()
        );
        Ok(renderer)
    }

    fn upload_object(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &SceneDescription,
        object: &SceneObject,
    ) -> Result<DrawObject, RenderError> {
        let mesh = object.mesh().ok_or_else(|| {
            FrostError::SceneError(format!(
                "object '{}' needs exactly one of model or primitive",
                object.name
            ))
        })?;

        let parts: Vec<ModelPart> = match mesh {
            MeshRef::Model(path) => load_model(&scene.resolve(&path))?.parts,
            MeshRef::Primitive(primitive) => vec![ModelPart {
                mesh: create_primitive_mesh(primitive),
                diffuse: None,
                base_color: [1.0; 4],
            }],
        };

        let diffuse_path = object.diffuse.as_ref().map(|p| scene.resolve(p));
        let normal_path = object.normal_map.as_ref().map(|p| scene.resolve(p));
        let depth_path = object.depth_map.as_ref().map(|p| scene.resolve(p));

        let has_diffuse =
            self.textures
                .load_optional(device, queue, diffuse_path.as_deref(), TextureKind::Color);
        let has_normal =
            self.textures
                .load_optional(device, queue, normal_path.as_deref(), TextureKind::Data);
        let has_depth =
            self.textures
                .load_optional(device, queue, depth_path.as_deref(), TextureKind::Data);

        let uniforms = ObjectUniforms::new(
            object.transform.to_matrix(),
            object.shininess,
            object.uv_scale,
            has_normal,
            has_depth,
        );
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Object Uniforms", object.name)),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let normal = self.textures.get_or_default(
            normal_path.as_deref(),
            TextureKind::Data,
            DefaultTexture::FlatNormal,
        );
        let depth = self.textures.get_or_default(
            depth_path.as_deref(),
            TextureKind::Data,
            DefaultTexture::Black,
        );

        let max_dimension = device.limits().max_texture_dimension_2d;
        let mut draw_parts = Vec::with_capacity(parts.len());
        for (i, part) in parts.into_iter().enumerate() {
            let label = format!("{} #{}", object.name, i);
            // An explicit diffuse map overrides the model's own base color texture
            let embedded = if has_diffuse {
                None
            } else if let Some(image) = &part.diffuse {
                match check_texture_size(image.width, image.height, max_dimension) {
                    Ok(()) => Some(upload_rgba(
                        device,
                        queue,
                        &label,
                        image.width,
                        image.height,
                        &image.rgba,
                        TextureKind::Color,
                    )),
                    Err(e) => {
                        log::warn!("Embedded texture of {} {}; using default texture", label, e);
                        None
                    }
                }
            } else if part.base_color != [1.0; 4] {
                Some(upload_rgba(
                    device,
                    queue,
                    &label,
                    1,
                    1,
                    &linear_to_srgb8(part.base_color),
                    TextureKind::Color,
                ))
            } else {
                None
            };
            let diffuse = match &embedded {
                Some(texture) => texture,
                None => self.textures.get_or_default(
                    diffuse_path.as_deref(),
                    TextureKind::Color,
                    DefaultTexture::White,
                ),
            };

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Object Bind Group", label)),
                layout: &self.scene_pipeline.object_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&diffuse.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&normal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&depth.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::Sampler(&self.textures.sampler),
                    },
                ],
            });

            draw_parts.push(DrawPart {
                mesh: GpuMesh::upload(device, &label, &part.mesh),
                bind_group,
                _diffuse: embedded,
            });
        }

        Ok(DrawObject {
            object: object.clone(),
            parts: draw_parts,
            uniform_buffer,
            has_normal,
            has_depth,
        })
    }

    /// Recreate the frame targets for the current surface size.
    pub fn resize(&mut self, context: &RenderContext) -> Result<(), RenderError> {
        let (width, height) = (context.config.width, context.config.height);
        if self.targets.matches_size(width, height) {
            return Ok(());
        }
        self.targets = FrameTargets::new(
            &context.device,
            &self.caps,
            width,
            height,
            self.config.msaa_samples,
        )?;
        Ok(())
    }

    pub fn sample_count(&self) -> u32 {
        self.targets.sample_count
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn write_uniforms(&self, context: &RenderContext, frame: &FrameInputs) {
        let queue = &context.queue;
        let aspect = context.aspect_ratio();
        let view = frame.camera.view_matrix();
        let projection = frame.camera.projection(aspect);

        let frame_uniforms = FrameUniforms::new(
            projection * view,
            frame.camera.position,
            frame.lights,
            frame.settings,
        );
        queue.write_buffer(
            &self.frame_uniform_buffer,
            0,
            bytemuck::cast_slice(&[frame_uniforms]),
        );

        let sky = SkyboxUniforms::new(view, projection, frame.settings.bloom_threshold);
        queue.write_buffer(&self.skybox_uniform_buffer, 0, bytemuck::cast_slice(&[sky]));

        for draw in &self.objects {
            let uniforms = ObjectUniforms::new(
                draw.object.model_matrix(frame.placements),
                draw.object.shininess,
                draw.object.uv_scale,
                draw.has_normal,
                draw.has_depth,
            );
            queue.write_buffer(&draw.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        }

        self.postprocess.write_blur_uniforms(
            queue,
            self.targets.width,
            self.targets.height,
            GAUSSIAN_WEIGHTS,
        );
    }

    fn target_view(&self, id: TargetId) -> Result<&wgpu::TextureView, RenderError> {
        self.targets.view(id).ok_or_else(|| {
            RenderError::Core(FrostError::FramePlanError(format!(
                "no off-screen view for {:?}",
                id
            )))
        })
    }

    /// Build, validate and execute one frame.
    pub fn render(
        &mut self,
        context: &RenderContext,
        frame: &FrameInputs,
        mut overlay: Option<&mut dyn OverlayPainter>,
    ) -> Result<FrameOutcome, RenderError> {
        self.resize(context)?;

        let plan = FramePlan::build(frame.settings, frame.overlay_visible);
        plan.validate()?;

        let output = match context.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                context.reconfigure();
                return Ok(FrameOutcome::Skipped);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface acquire timed out, skipping frame");
                return Ok(FrameOutcome::Skipped);
            }
            Err(e) => return Err(RenderError::SurfaceError(e.to_string())),
        };
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.write_uniforms(context, frame);

        let device = &context.device;
        let queue = &context.queue;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        let clear_color = wgpu::Color {
            r: frame.clear_color.x as f64,
            g: frame.clear_color.y as f64,
            b: frame.clear_color.z as f64,
            a: 1.0,
        };
        let mut pending = PendingClears::default();

        for op in &plan.ops {
            match op {
                PassOp::Clear { target } => pending.mark(*target),
                PassOp::DrawScene => {
                    let color_load = pending.load(TargetId::HdrColor, clear_color);
                    let bright_load = pending.load(TargetId::HdrBright, wgpu::Color::BLACK);
                    let depth_load = if pending.take(TargetId::HdrDepth) {
                        wgpu::LoadOp::Clear(1.0)
                    } else {
                        wgpu::LoadOp::Load
                    };
                    self.record_scene(&mut encoder, color_load, bright_load, depth_load);
                }
                PassOp::Blur(pass) => {
                    let target_id = TargetId::PingPong(pass.target);
                    let load = pending.load(target_id, wgpu::Color::BLACK);
                    self.postprocess.record_blur(
                        device,
                        &mut encoder,
                        pass.direction,
                        self.target_view(pass.source.into())?,
                        self.target_view(target_id)?,
                        load,
                    );
                }
                PassOp::Composite {
                    bloom,
                    hdr,
                    exposure,
                } => {
                    let bloom_view = match bloom {
                        Some(source) => Some(self.target_view((*source).into())?),
                        None => None,
                    };
                    let load = pending.load(TargetId::Multisample, wgpu::Color::BLACK);
                    self.postprocess.record_composite(
                        device,
                        queue,
                        &mut encoder,
                        self.target_view(TargetId::HdrColor)?,
                        bloom_view,
                        *hdr,
                        *exposure,
                        self.target_view(TargetId::Multisample)?,
                        load,
                    );
                }
                PassOp::Resolve { grayscale } => {
                    let load = pending.load(TargetId::Surface, clear_color);
                    self.postprocess.record_resolve(
                        device,
                        queue,
                        &mut encoder,
                        self.target_view(TargetId::Multisample)?,
                        *grayscale,
                        !context.surface_is_srgb(),
                        &surface_view,
                        load,
                    );
                }
                PassOp::Overlay { visible } => {
                    if *visible {
                        if let Some(painter) = overlay.as_deref_mut() {
                            painter.paint(device, queue, &mut encoder, &surface_view);
                        }
                    }
                }
                PassOp::Present => break,
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(FrameOutcome::Presented)
    }

    fn record_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_load: wgpu::LoadOp<wgpu::Color>,
        bright_load: wgpu::LoadOp<wgpu::Color>,
        depth_load: wgpu::LoadOp<f32>,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.hdr_color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.hdr_bright.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: bright_load,
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.hdr_depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(sky_textures) = &self.skybox_texture_bind_group {
            pass.set_pipeline(&self.skybox_pipeline.pipeline);
            pass.set_bind_group(0, &self.skybox_uniform_bind_group, &[]);
            pass.set_bind_group(1, sky_textures, &[]);
            pass.draw(0..3, 0..1);
        }

        pass.set_pipeline(&self.scene_pipeline.pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for draw in &self.objects {
            for part in &draw.parts {
                pass.set_bind_group(1, &part.bind_group, &[]);
                part.mesh.draw(&mut pass);
            }
        }
    }
}

/// Targets marked by a `Clear` operation and not yet written.
#[derive(Default)]
struct PendingClears {
    targets: HashSet<TargetId>,
}

impl PendingClears {
    fn mark(&mut self, target: TargetId) {
        self.targets.insert(target);
    }

    fn take(&mut self, target: TargetId) -> bool {
        self.targets.remove(&target)
    }

    fn load(&mut self, target: TargetId, color: wgpu::Color) -> wgpu::LoadOp<wgpu::Color> {
        if self.take(target) {
            wgpu::LoadOp::Clear(color)
        } else {
            wgpu::LoadOp::Load
        }
    }
}

/// Encode a linear RGBA factor for an sRGB texture.
fn linear_to_srgb8(color: [f32; 4]) -> [u8; 4] {
    let encode = |c: f32| (c.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0).round() as u8;
    [
        encode(color[0]),
        encode(color[1]),
        encode(color[2]),
        (color[3].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_applies_once_to_next_writer() {
        let mut pending = PendingClears::default();
        pending.mark(TargetId::Multisample);
        assert!(matches!(
            pending.load(TargetId::Multisample, wgpu::Color::BLACK),
            wgpu::LoadOp::Clear(_)
        ));
        assert!(matches!(
            pending.load(TargetId::Multisample, wgpu::Color::BLACK),
            wgpu::LoadOp::Load
        ));
    }

    #[test]
    fn unmarked_targets_load() {
        let mut pending = PendingClears::default();
        pending.mark(TargetId::HdrColor);
        assert!(matches!(
            pending.load(TargetId::PingPong(0), wgpu::Color::BLACK),
            wgpu::LoadOp::Load
        ));
        assert!(pending.take(TargetId::HdrColor));
    }

    #[test]
    fn every_plan_clear_is_consumed_by_a_writer() {
        let plan = FramePlan::build(&RenderSettings::default(), true);
        let mut pending = PendingClears::default();
        for op in &plan.ops {
            match op {
                PassOp::Clear { target } => pending.mark(*target),
                other => {
                    for target in other.writes() {
                        pending.take(target);
                    }
                }
            }
        }
        assert!(pending.targets.is_empty());
    }

    #[test]
    fn srgb_encoding_of_base_color() {
        assert_eq!(linear_to_srgb8([1.0, 0.0, 0.5, 1.0])[..2], [255, 0]);
        assert_eq!(linear_to_srgb8([1.0, 0.0, 0.5, 1.0])[2], 186);
        assert_eq!(linear_to_srgb8([2.0, -1.0, 0.0, 0.5])[3], 128);
    }
}
