//! Frostvale Player - winter village player library
//!
//! Provides the `FrostvaleApp` application handler, the egui debug overlay
//! and the layered player configuration used by the `frostvale` binary.

mod app;
pub mod config;
mod overlay;

pub use app::FrostvaleApp;
pub use config::{ConfigOverrides, PlayerConfig};
pub use overlay::{DebugOverlay, Telemetry};
