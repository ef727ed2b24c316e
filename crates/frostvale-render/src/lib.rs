//! Frostvale Render - wgpu renderer for the winter village
//!
//! The scene is shaded with Blinn-Phong lighting and parallax-mapped walls
//! into an HDR target with a separate bright-pass attachment. The bright
//! pass is blurred with a ping-pong Gaussian, composited back with exposure
//! tone mapping into a multisampled target, and resolved onto the surface.

mod context;
mod gpu_mesh;
pub mod model_loader;
mod pipeline;
pub mod postprocess;
mod primitives;
mod scene_renderer;
mod shader;
pub mod skybox_pipeline;
mod targets;
mod texture_cache;

pub use context::{RenderContext, RenderError};
pub use gpu_mesh::GpuMesh;
pub use pipeline::{FrameUniforms, GpuPointLight, ObjectUniforms, ScenePipeline, HDR_FORMAT};
pub use postprocess::PostProcessPipeline;
pub use primitives::{compute_tangents, create_plane_mesh, create_wall_mesh, Mesh, Vertex};
pub use scene_renderer::{
    FrameInputs, FrameOutcome, OverlayPainter, RendererConfig, SceneRenderer,
};
pub use skybox_pipeline::SkyboxPipeline;
pub use targets::{FrameTargets, DEFAULT_MSAA_SAMPLES};
pub use texture_cache::TextureCache;

#[cfg(test)]
mod tests {
    #[test]
    fn scene_shader_wgsl_parses() {
        let source = include_str!("scene_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("scene_shader.wgsl failed to parse");
    }

    #[test]
    fn skybox_shader_wgsl_parses() {
        let source = include_str!("skybox_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("skybox_shader.wgsl failed to parse");
    }

    #[test]
    fn blur_shader_wgsl_parses() {
        let source = include_str!("blur_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("blur_shader.wgsl failed to parse");
    }

    #[test]
    fn composite_shader_wgsl_parses() {
        let source = include_str!("composite_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("composite_shader.wgsl failed to parse");
    }

    #[test]
    fn resolve_shader_wgsl_parses() {
        let source = include_str!("resolve_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("resolve_shader.wgsl failed to parse");
    }

    fn parse(source: &str) -> naga::Module {
        naga::front::wgsl::parse_str(source).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    /// Math functions called anywhere in the named entry point's body.
    fn entry_math(module: &naga::Module, entry: &str) -> Vec<naga::MathFunction> {
        let entry_point = module
            .entry_points
            .iter()
            .find(|ep| ep.name == entry)
            .unwrap_or_else(|| panic!("no entry point {entry}"));
        entry_point
            .function
            .expressions
            .iter()
            .filter_map(|(_, expr)| match expr {
                naga::Expression::Math { fun, .. } => Some(*fun),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn composite_tone_maps_with_exp() {
        let module = parse(include_str!("composite_shader.wgsl"));
        assert!(entry_math(&module, "fs_composite").contains(&naga::MathFunction::Exp));
    }

    #[test]
    fn resolve_grayscale_and_gamma_read_uniforms() {
        let module = parse(include_str!("resolve_shader.wgsl"));
        let math = entry_math(&module, "fs_resolve");
        assert!(math.contains(&naga::MathFunction::Dot));
        assert!(math.contains(&naga::MathFunction::Pow));
    }

    #[test]
    fn no_shader_hard_codes_color_constants() {
        for (name, source) in [
            ("scene", include_str!("scene_shader.wgsl")),
            ("skybox", include_str!("skybox_shader.wgsl")),
            ("composite", include_str!("composite_shader.wgsl")),
            ("resolve", include_str!("resolve_shader.wgsl")),
        ] {
            for literal in ["0.2126", "0.7152", "0.0722", "2.2"] {
                assert!(
                    !source.contains(literal),
                    "{name} shader hard-codes {literal}; pass it through a uniform"
                );
            }
        }
    }

    #[test]
    fn shaders_validate() {
        for (name, source) in [
            ("scene", include_str!("scene_shader.wgsl")),
            ("skybox", include_str!("skybox_shader.wgsl")),
            ("blur", include_str!("blur_shader.wgsl")),
            ("composite", include_str!("composite_shader.wgsl")),
            ("resolve", include_str!("resolve_shader.wgsl")),
        ] {
            let module = naga::front::wgsl::parse_str(source)
                .unwrap_or_else(|e| panic!("{name} failed to parse: {e}"));
            naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::default(),
            )
            .validate(&module)
            .unwrap_or_else(|e| panic!("{name} failed validation: {e:?}"));
        }
    }
}
