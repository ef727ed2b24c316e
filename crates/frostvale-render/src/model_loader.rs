//! glTF model import into renderable meshes
//!
//! Node transforms are baked into the vertices so each object draws with its
//! own model matrix only. Every primitive keeps its base color texture, if
//! any, as RGBA8 pixels ready for upload.

use crate::context::RenderError;
use crate::primitives::{compute_tangents, Mesh, Vertex};
use glam::{Mat3, Mat4, Vec3};
use std::path::Path;

/// RGBA8 pixel data decoded from a glTF image.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// One glTF primitive with its material inputs.
pub struct ModelPart {
    pub mesh: Mesh,
    pub diffuse: Option<ImageData>,
    pub base_color: [f32; 4],
}

/// All primitives of a glTF file, with node transforms applied.
pub struct LoadedModel {
    pub parts: Vec<ModelPart>,
}

impl LoadedModel {
    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.vertex_count()).sum()
    }
}

/// Import a glTF or GLB file
pub fn load_model(path: &Path) -> Result<LoadedModel, RenderError> {
    let (document, buffers, images) =
        gltf::import(path).map_err(|e| RenderError::ModelLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut parts = Vec::new();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    let Some(scene) = scene else {
        return Err(RenderError::ModelLoad {
            path: path.display().to_string(),
            reason: "file contains no scene".to_string(),
        });
    };

    let mut stack: Vec<(gltf::Node, Mat4)> =
        scene.nodes().map(|node| (node, Mat4::IDENTITY)).collect();
    while let Some((node, parent)) = stack.pop() {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        for child in node.children() {
            stack.push((child, world));
        }
        let Some(mesh) = node.mesh() else {
            continue;
        };

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| {
                buffers.get(buffer.index()).map(|data| data.0.as_slice())
            });

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            if positions.is_empty() {
                continue;
            }

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_default();

            let indices: Option<Vec<u32>> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect());

            let pbr = primitive.material().pbr_metallic_roughness();
            let diffuse = pbr.base_color_texture().and_then(|info| {
                let index = info.texture().source().index();
                let image = images.get(index)?;
                let rgba = to_rgba8(&image.pixels, image.format, image.width, image.height);
                if rgba.is_none() {
                    log::warn!(
                        "Unsupported texture format {:?} in '{}'",
                        image.format,
                        path.display()
                    );
                }
                rgba.map(|rgba| ImageData {
                    width: image.width,
                    height: image.height,
                    rgba,
                })
            });

            parts.push(ModelPart {
                mesh: build_mesh(&positions, &normals, &uvs, indices, world),
                diffuse,
                base_color: pbr.base_color_factor(),
            });
        }
    }

    let model = LoadedModel { parts };
    log::info!(
        "Loaded model '{}': {} primitives, {} vertices",
        path.display(),
        model.parts.len(),
        model.vertex_count()
    );
    Ok(model)
}

/// Assemble vertices in model space and generate tangents.
fn build_mesh(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    indices: Option<Vec<u32>>,
    transform: Mat4,
) -> Mesh {
    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let position = transform.transform_point3(Vec3::from(*p));
            let normal = normals
                .get(i)
                .map(|n| (normal_matrix * Vec3::from(*n)).normalize_or(Vec3::Y))
                .unwrap_or(Vec3::Y);
            Vertex {
                position: position.into(),
                normal: normal.into(),
                uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                tangent: [1.0, 0.0, 0.0, 1.0],
            }
        })
        .collect();
    let indices = indices.unwrap_or_else(|| (0..positions.len() as u32).collect());

    let mut mesh = Mesh { vertices, indices };
    compute_tangents(&mut mesh);
    mesh
}

/// Expand 8-bit glTF image data to RGBA8. Returns `None` for wider formats.
fn to_rgba8(data: &[u8], format: gltf::image::Format, width: u32, height: u32) -> Option<Vec<u8>> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);
    match format {
        gltf::image::Format::R8G8B8A8 => rgba.extend_from_slice(data),
        gltf::image::Format::R8G8B8 => {
            for chunk in data.chunks_exact(3) {
                rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
            }
        }
        gltf::image::Format::R8G8 => {
            for chunk in data.chunks_exact(2) {
                rgba.extend_from_slice(&[chunk[0], chunk[1], 0, 255]);
            }
        }
        gltf::image::Format::R8 => {
            for &v in data {
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        _ => return None,
    }
    (rgba.len() == pixel_count * 4).then_some(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_mesh_applies_node_transform() {
        let transform = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))
            * Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let mesh = build_mesh(
            &[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
            &[[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            Some(vec![0, 1, 2]),
            transform,
        );
        assert_eq!(mesh.vertices[0].position, [2.0, 2.0, 0.0]);
        assert_eq!(mesh.vertices[2].position, [0.0, 3.0, 0.0]);
        let n = Vec3::from(mesh.vertices[0].normal);
        assert!((n - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn build_mesh_fills_missing_attributes() {
        let mesh = build_mesh(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            &[],
            &[],
            None,
            Mat4::IDENTITY,
        );
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert!(mesh.vertices.iter().all(|v| v.uv == [0.0, 0.0]));
    }

    #[test]
    fn rgb_is_expanded_with_opaque_alpha() {
        let rgba = to_rgba8(&[1, 2, 3, 4, 5, 6], gltf::image::Format::R8G8B8, 2, 1).unwrap();
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn short_pixel_data_is_rejected() {
        assert!(to_rgba8(&[1, 2, 3], gltf::image::Format::R8G8B8A8, 1, 1).is_none());
        assert!(to_rgba8(&[0; 8], gltf::image::Format::R16G16B16A16, 1, 1).is_none());
    }
}
