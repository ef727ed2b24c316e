//! GPU texture cache - loads image files once and provides default fallbacks
//!
//! A texture that fails to load is logged and replaced with a 1x1 default so a
//! missing asset never stops the scene from rendering.

use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use wgpu::util::DeviceExt;

/// Color fill for cubemap faces that could not be loaded.
const MISSING_FACE_COLOR: [u8; 4] = [40, 44, 52, 255];

/// How texel values are interpreted by the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// sRGB-encoded color (diffuse maps, skybox faces)
    Color,
    /// Linear data (normal and depth maps)
    Data,
}

impl TextureKind {
    fn format(self) -> wgpu::TextureFormat {
        match self {
            TextureKind::Color => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureKind::Data => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// A GPU-resident texture with its view
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Cache of GPU textures, keyed by path and kind, with built-in defaults
pub struct TextureCache {
    textures: HashMap<(PathBuf, TextureKind), GpuTexture>,
    failed: HashMap<(PathBuf, TextureKind), String>,
    /// 1x1 white texture (default diffuse)
    pub default_white: GpuTexture,
    /// 1x1 flat normal map (0.5, 0.5, 1.0) = straight out of the surface
    pub default_normal: GpuTexture,
    /// 1x1 black texture (no parallax displacement)
    pub default_black: GpuTexture,
    /// Linear, repeating sampler shared by all material textures
    pub sampler: wgpu::Sampler,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let default_white =
            upload_rgba(device, queue, "Default White", 1, 1, &[255; 4], TextureKind::Color);
        let default_normal = upload_rgba(
            device,
            queue,
            "Default Normal",
            1,
            1,
            &[128, 128, 255, 255],
            TextureKind::Data,
        );
        let default_black = upload_rgba(
            device,
            queue,
            "Default Black",
            1,
            1,
            &[0, 0, 0, 255],
            TextureKind::Data,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            ..Default::default()
        });

        Self {
            textures: HashMap::new(),
            failed: HashMap::new(),
            default_white,
            default_normal,
            default_black,
            sampler,
        }
    }

    /// Load a texture from an image file on disk.
    /// Returns Ok(true) if newly loaded, Ok(false) if already cached.
    pub fn load_file(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        kind: TextureKind,
    ) -> Result<bool, String> {
        let key = (path.to_path_buf(), kind);
        if self.textures.contains_key(&key) {
            return Ok(false);
        }
        if let Some(reason) = self.failed.get(&key) {
            return Err(reason.clone());
        }

        let rgba = match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                let reason = format!("Failed to open image '{}': {}", path.display(), e);
                self.failed.insert(key, reason.clone());
                return Err(reason);
            }
        };
        let (width, height) = rgba.dimensions();
        let max_dimension = device.limits().max_texture_dimension_2d;
        if let Err(e) = check_texture_size(width, height, max_dimension) {
            let reason = format!("Image '{}' {}", path.display(), e);
            self.failed.insert(key, reason.clone());
            return Err(reason);
        }
        let label = path.display().to_string();
        let texture = upload_rgba(device, queue, &label, width, height, &rgba, kind);
        log::debug!("Loaded texture {} ({}x{})", label, width, height);
        self.textures.insert(key, texture);
        Ok(true)
    }

    /// Load `path` if given, logging a warning on failure.
    /// Returns whether a texture for it is now cached.
    pub fn load_optional(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: Option<&Path>,
        kind: TextureKind,
    ) -> bool {
        let Some(path) = path else {
            return false;
        };
        match self.load_file(device, queue, path, kind) {
            Ok(_) => true,
            Err(reason) => {
                log::warn!("{}; using default texture", reason);
                false
            }
        }
    }

    /// The cached texture at `path`, or the default for `fallback`.
    pub fn get_or_default(
        &self,
        path: Option<&Path>,
        kind: TextureKind,
        fallback: DefaultTexture,
    ) -> &GpuTexture {
        path.and_then(|p| self.textures.get(&(p.to_path_buf(), kind)))
            .unwrap_or_else(|| self.default(fallback))
    }

    pub fn default(&self, which: DefaultTexture) -> &GpuTexture {
        match which {
            DefaultTexture::White => &self.default_white,
            DefaultTexture::FlatNormal => &self.default_normal,
            DefaultTexture::Black => &self.default_black,
        }
    }

    /// Load six faces (+X, -X, +Y, -Y, +Z, -Z) into a cube texture.
    pub fn load_cubemap(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: [&Path; 6],
    ) -> GpuTexture {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let images = faces.map(|face| match image::open(face) {
            Ok(img) => {
                let img = img.to_rgba8();
                match check_texture_size(img.width(), img.height(), max_dimension) {
                    Ok(()) => Some(img),
                    Err(e) => {
                        log::warn!("Skybox face '{}' {}", face.display(), e);
                        None
                    }
                }
            }
            Err(e) => {
                log::warn!("Failed to open skybox face '{}': {}", face.display(), e);
                None
            }
        });
        let (size, data) = assemble_cubemap(&images);

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Skybox Cubemap"),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TextureKind::Color.format(),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Skybox Cubemap View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        GpuTexture { texture, view }
    }
}

/// Which built-in texture stands in for a missing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultTexture {
    White,
    FlatNormal,
    Black,
}

/// Reject sizes the device cannot hold before they reach wgpu, which would
/// otherwise raise an uncaptured validation error.
pub fn check_texture_size(width: u32, height: u32, max_dimension: u32) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err(format!("has an empty size {}x{}", width, height));
    }
    if width > max_dimension || height > max_dimension {
        return Err(format!(
            "is {}x{}, above the device limit of {}",
            width, height, max_dimension
        ));
    }
    Ok(())
}

/// Upload tightly packed RGBA8 pixels as a 2D texture.
pub fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
    kind: TextureKind,
) -> GpuTexture {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: kind.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        rgba,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}

/// Pack six square faces into layer-major cube data.
///
/// The face size comes from the first face that loaded. Faces that failed or
/// do not match that size are filled with a flat color.
fn assemble_cubemap(faces: &[Option<RgbaImage>; 6]) -> (u32, Vec<u8>) {
    let size = faces
        .iter()
        .flatten()
        .find(|img| img.width() == img.height() && img.width() > 0)
        .map(|img| img.width())
        .unwrap_or(1);
    let face_bytes = (size * size * 4) as usize;

    let mut data = Vec::with_capacity(face_bytes * 6);
    for (i, face) in faces.iter().enumerate() {
        match face {
            Some(img) if img.width() == size && img.height() == size => {
                data.extend_from_slice(img.as_raw());
            }
            other => {
                if let Some(img) = other {
                    log::warn!(
                        "Skybox face {} is {}x{}, expected {}x{}",
                        i,
                        img.width(),
                        img.height(),
                        size,
                        size
                    );
                }
                data.extend(MISSING_FACE_COLOR.iter().copied().cycle().take(face_bytes));
            }
        }
    }
    (size, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(size: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(size, size, image::Rgba([value, value, value, 255]))
    }

    #[test]
    fn texture_size_within_limit_is_accepted() {
        assert!(check_texture_size(1, 1, 8192).is_ok());
        assert!(check_texture_size(8192, 8192, 8192).is_ok());
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let err = check_texture_size(16384, 512, 8192).unwrap_err();
        assert!(err.contains("16384x512"));
        assert!(err.contains("8192"));
        assert!(check_texture_size(512, 8193, 8192).is_err());
    }

    #[test]
    fn empty_texture_is_rejected() {
        assert!(check_texture_size(0, 4, 8192).is_err());
        assert!(check_texture_size(4, 0, 8192).is_err());
    }

    #[test]
    fn cubemap_takes_size_from_first_loaded_face() {
        let faces = [None, Some(solid(4, 10)), Some(solid(4, 20)), None, None, None];
        let (size, data) = assemble_cubemap(&faces);
        assert_eq!(size, 4);
        assert_eq!(data.len(), 4 * 4 * 4 * 6);
        // face 0 is the fill color, face 1 is the loaded image
        assert_eq!(&data[..4], &MISSING_FACE_COLOR);
        assert_eq!(data[64], 10);
        assert_eq!(data[128], 20);
    }

    #[test]
    fn mismatched_face_is_filled() {
        let faces = [
            Some(solid(2, 1)),
            Some(solid(3, 2)),
            Some(solid(2, 3)),
            Some(solid(2, 4)),
            Some(solid(2, 5)),
            Some(solid(2, 6)),
        ];
        let (size, data) = assemble_cubemap(&faces);
        assert_eq!(size, 2);
        assert_eq!(&data[16..20], &MISSING_FACE_COLOR);
        assert_eq!(data[32], 3);
    }

    #[test]
    fn no_faces_gives_a_one_texel_cube() {
        let faces: [Option<RgbaImage>; 6] = Default::default();
        let (size, data) = assemble_cubemap(&faces);
        assert_eq!(size, 1);
        assert_eq!(data.len(), 24);
    }
}
