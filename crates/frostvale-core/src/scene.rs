//! Scene description format
//!
//! A scene is a TOML file listing drawable objects, lights and skybox faces:
//!
//! ```toml
//! name = "village"
//!
//! [[object]]
//! name = "house"
//! model = "objects/house/house.gltf"
//! placement = "house"
//!
//! [[object]]
//! name = "wall"
//! primitive = "wall"
//! position = [1.5, 2.85, -3.65]
//! scale = [2.3, 1.279, 1.0]
//! diffuse = "textures/brick_diffuse.jpg"
//! normal_map = "textures/brick_normal.jpg"
//! depth_map = "textures/brick_depth.jpg"
//!
//! [skybox]
//! right = "textures/right.jpg"
//! # left, top, bottom, front, back
//! ```
//!
//! Relative paths resolve against the directory holding the scene file.

use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{FrostError, Result};
use crate::lights::SceneLights;
use crate::state::{Placement, PlacementSlot};
use crate::types::Transform;

/// Built-in geometry that needs no asset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    /// Unit quad in the XZ plane facing +Y.
    Plane,
    /// Unit quad in the XY plane facing +Z, with tangents for normal mapping.
    Wall,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeshRef {
    Model(PathBuf),
    Primitive(Primitive),
}

fn default_shininess() -> f32 {
    32.0
}

fn default_uv_scale() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<Primitive>,
    #[serde(flatten)]
    pub transform: Transform,
    /// Persisted placement composed over `transform`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementSlot>,
    /// Diffuse texture override. Models otherwise use their own material texture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_map: Option<PathBuf>,
    /// Height map for parallax occlusion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_map: Option<PathBuf>,
    #[serde(default = "default_shininess")]
    pub shininess: f32,
    /// Texture coordinate multiplier, for tiling large planes.
    #[serde(default = "default_uv_scale")]
    pub uv_scale: f32,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, mesh: MeshRef) -> Self {
        let (model, primitive) = match mesh {
            MeshRef::Model(path) => (Some(path), None),
            MeshRef::Primitive(p) => (None, Some(p)),
        };
        Self {
            name: name.into(),
            model,
            primitive,
            transform: Transform::default(),
            placement: None,
            diffuse: None,
            normal_map: None,
            depth_map: None,
            shininess: default_shininess(),
            uv_scale: default_uv_scale(),
        }
    }

    pub fn with_transform(mut self, position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        self.transform = Transform {
            position,
            rotation,
            scale,
        };
        self
    }

    pub fn with_placement(mut self, slot: PlacementSlot) -> Self {
        self.placement = Some(slot);
        self
    }

    pub fn mesh(&self) -> Option<MeshRef> {
        match (&self.model, self.primitive) {
            (Some(path), None) => Some(MeshRef::Model(path.clone())),
            (None, Some(p)) => Some(MeshRef::Primitive(p)),
            _ => None,
        }
    }

    /// World matrix: `translate(placement) * scale(placement) * base`.
    pub fn model_matrix(&self, placements: &[Placement; 3]) -> Mat4 {
        let base = self.transform.to_matrix();
        match self.placement {
            Some(slot) => {
                let p = placements[slot.index()];
                Mat4::from_translation(p.position) * Mat4::from_scale(Vec3::splat(p.scale)) * base
            }
            None => base,
        }
    }
}

/// Six cubemap faces in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyboxDesc {
    pub right: PathBuf,
    pub left: PathBuf,
    pub top: PathBuf,
    pub bottom: PathBuf,
    pub front: PathBuf,
    pub back: PathBuf,
}

impl SkyboxDesc {
    pub fn faces(&self) -> [&Path; 6] {
        [
            &self.right,
            &self.left,
            &self.top,
            &self.bottom,
            &self.front,
            &self.back,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "object")]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub lights: SceneLights,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skybox: Option<SkyboxDesc>,
    /// Directory relative asset paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SceneDescription {
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let scene: SceneDescription = toml::from_str(src)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| FrostError::SceneError(format!("{}: {e}", path.display())))?;
        let mut scene = Self::from_toml_str(&src)?;
        scene.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        info!(
            "Loaded scene '{}' from {} ({} objects)",
            scene.name,
            path.display(),
            scene.objects.len()
        );
        Ok(scene)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, object) in self.objects.iter().enumerate() {
            if object.mesh().is_none() {
                return Err(FrostError::SceneError(format!(
                    "object {i} ('{}') needs exactly one of `model` or `primitive`",
                    object.name
                )));
            }
            if object.uv_scale <= 0.0 {
                return Err(FrostError::SceneError(format!(
                    "object '{}' has non-positive uv_scale {}",
                    object.name, object.uv_scale
                )));
            }
        }
        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// The winter village used when no scene file is given.
    pub fn default_village(asset_root: &Path) -> Self {
        let mut ground = SceneObject::new("ground", MeshRef::Primitive(Primitive::Plane)).with_transform(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::ZERO,
            Vec3::splat(30.0),
        );
        ground.diffuse = Some("textures/snow_albedo.png".into());
        ground.uv_scale = 15.0;

        let wall = |name: &str, position: Vec3, scale: Vec3| {
            let mut wall = SceneObject::new(name, MeshRef::Primitive(Primitive::Wall)).with_transform(
                position,
                Vec3::ZERO,
                scale,
            );
            wall.diffuse = Some("textures/brick_diffuse.jpg".into());
            wall.normal_map = Some("textures/brick_normal.jpg".into());
            wall.depth_map = Some("textures/brick_depth.jpg".into());
            wall
        };

        Self {
            name: "village".to_string(),
            objects: vec![
                SceneObject::new("house", MeshRef::Model("objects/house/house.gltf".into()))
                    .with_placement(PlacementSlot::House),
                SceneObject::new("snow", MeshRef::Model("objects/snow/terrain.gltf".into()))
                    .with_placement(PlacementSlot::Snow),
                SceneObject::new("mountain", MeshRef::Model("objects/mountain/mountain.gltf".into()))
                    .with_transform(Vec3::ZERO, Vec3::ZERO, Vec3::splat(0.05))
                    .with_placement(PlacementSlot::Mountain),
                ground,
                wall("wall_back", Vec3::new(1.5, 2.85, -3.65), Vec3::new(2.3, 1.279, 1.0)),
                wall("wall_side", Vec3::new(1.85, 2.85, 3.95), Vec3::new(1.61, 1.356, 1.0)),
            ],
            lights: SceneLights::default(),
            skybox: Some(SkyboxDesc {
                right: "textures/skybox/right.jpg".into(),
                left: "textures/skybox/left.jpg".into(),
                top: "textures/skybox/top.jpg".into(),
                bottom: "textures/skybox/bottom.jpg".into(),
                front: "textures/skybox/front.jpg".into(),
                back: "textures/skybox/back.jpg".into(),
            }),
            base_dir: asset_root.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
        name = "test"

        [[object]]
        name = "house"
        model = "objects/house.gltf"
        placement = "house"
        rotation = [0.0, 90.0, 0.0]

        [[object]]
        name = "wall"
        primitive = "wall"
        position = [1.0, 2.0, 3.0]
        scale = [2.0, 1.0, 1.0]
        normal_map = "brick_normal.png"
        depth_map = "brick_depth.png"
        shininess = 8.0

        [lights.directional]
        direction = [0.0, -1.0, 0.0]

        [skybox]
        right = "r.jpg"
        left = "l.jpg"
        top = "t.jpg"
        bottom = "b.jpg"
        front = "f.jpg"
        back = "k.jpg"
    "#;

    #[test]
    fn parses_objects_lights_and_skybox() {
        let scene = SceneDescription::from_toml_str(SCENE).unwrap();
        assert_eq!(scene.name, "test");
        assert_eq!(scene.objects.len(), 2);

        let house = &scene.objects[0];
        assert_eq!(house.mesh(), Some(MeshRef::Model("objects/house.gltf".into())));
        assert_eq!(house.placement, Some(PlacementSlot::House));
        assert_eq!(house.transform.rotation, Vec3::new(0.0, 90.0, 0.0));
        assert_eq!(house.transform.scale, Vec3::ONE);
        assert_eq!(house.shininess, 32.0);

        let wall = &scene.objects[1];
        assert_eq!(wall.mesh(), Some(MeshRef::Primitive(Primitive::Wall)));
        assert_eq!(wall.transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(wall.depth_map.is_some());
        assert_eq!(wall.shininess, 8.0);

        assert_eq!(scene.lights.directional.direction, Vec3::NEG_Y);
        let faces = scene.skybox.as_ref().unwrap().faces();
        assert_eq!(faces[2], Path::new("t.jpg"));
    }

    #[test]
    fn object_without_mesh_is_rejected() {
        let src = r#"
            [[object]]
            name = "ghost"
        "#;
        let err = SceneDescription::from_toml_str(src).unwrap_err();
        assert!(matches!(err, FrostError::SceneError(_)));
    }

    #[test]
    fn object_with_both_meshes_is_rejected() {
        let src = r#"
            [[object]]
            name = "both"
            model = "a.gltf"
            primitive = "plane"
        "#;
        assert!(SceneDescription::from_toml_str(src).is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = SceneDescription::from_toml_str("[[object]\nname = ").unwrap_err();
        assert!(matches!(err, FrostError::TomlParseError(_)));
    }

    #[test]
    fn placement_composes_over_base() {
        let object = SceneObject::new("m", MeshRef::Primitive(Primitive::Plane))
            .with_transform(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, Vec3::ONE)
            .with_placement(PlacementSlot::Snow);
        let mut placements = [Placement::default(); 3];
        placements[PlacementSlot::Snow.index()] = Placement {
            position: Vec3::new(0.0, 5.0, 0.0),
            scale: 2.0,
        };
        let p = object.model_matrix(&placements).transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(2.0, 5.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn paths_resolve_against_scene_dir() {
        let mut scene = SceneDescription::default_village(Path::new("assets"));
        scene.validate().unwrap();
        assert_eq!(
            scene.resolve(Path::new("textures/a.png")),
            PathBuf::from("assets/textures/a.png")
        );
        scene.base_dir = PathBuf::from("/srv/scenes");
        assert_eq!(scene.resolve(Path::new("/abs/b.png")), PathBuf::from("/abs/b.png"));
    }

    #[test]
    fn default_village_has_every_placement() {
        let scene = SceneDescription::default_village(Path::new("assets"));
        for slot in PlacementSlot::ALL {
            assert!(scene.objects.iter().any(|o| o.placement == Some(slot)));
        }
    }
}
