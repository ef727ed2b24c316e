//! Frostvale Core - GPU-independent building blocks of the winter village demo
//!
//! This crate holds everything that can be reasoned about without a device:
//! - `RenderSettings` - the per-frame post-processing toggles and scalars
//! - `tonemap` - luma weights and display gamma fed to the shaders
//! - `BlurPlan` - the ping-pong Gaussian blur schedule
//! - `FramePlan` - the ordered render-target operations of one frame
//! - `TargetDesc` - render target descriptions and completeness checks
//! - `ProgramState` - the positional state file persisted between runs
//! - `SceneDescription` - the TOML scene (objects, lights, skybox)
//! - `FlyCamera` - first-person camera controls

mod blur;
mod camera;
mod error;
mod frame;
mod lights;
mod scene;
mod settings;
mod state;
mod target;
pub mod tonemap;
mod types;

pub use blur::{
    plan_blur, BlurDirection, BlurPass, BlurPlan, BlurSource, GAUSSIAN_TAPS, GAUSSIAN_WEIGHTS,
};
pub use camera::{CameraMovement, FlyCamera};
pub use error::{FrostError, Result};
pub use frame::{FramePlan, FrameStep, PassOp, TargetId};
pub use lights::{DirLight, Orbit, PointLight, SceneLights, MAX_POINT_LIGHTS};
pub use scene::{MeshRef, Primitive, SceneDescription, SceneObject, SkyboxDesc};
pub use settings::{RenderSettings, RenderToggle, DEFAULT_BLUR_ITERATIONS};
pub use state::{LoadReport, Placement, PlacementSlot, ProgramState, STATE_FIELD_COUNT};
pub use target::{FormatCaps, TargetCaps, TargetDesc, TargetFormat};
pub use types::Transform;
