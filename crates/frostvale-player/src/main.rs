//! Frostvale - winter village post-processing demo
//!
//! Renders the village through the HDR, bloom, tone-mapping and MSAA chain.
//!
//! Usage:
//!   frostvale [--scene <scene.toml>] [--state <file>] [--config <frostvale.toml>]
//!             [--width N --height N] [--blur-iterations N] [--fullscreen]

use anyhow::{Context, Result};
use clap::Parser;
use frostvale_core::{ProgramState, SceneDescription};
use frostvale_player::{ConfigOverrides, FrostvaleApp, PlayerConfig};
use log::{info, warn};
use std::path::PathBuf;
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser)]
#[command(name = "frostvale")]
#[command(about = "Frostvale - winter village with HDR, bloom and MSAA post-processing")]
struct Args {
    /// Scene description (TOML); the built-in village when omitted
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Program state file read at startup and written on exit
    #[arg(long)]
    state: Option<PathBuf>,

    /// Config file used instead of ./frostvale.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Window width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Window height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Separable blur passes over the bright-pass buffer
    #[arg(long)]
    blur_iterations: Option<u32>,

    /// Launch in fullscreen mode
    #[arg(long)]
    fullscreen: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            scene: self.scene.clone(),
            state_file: self.state.clone(),
            width: self.width,
            height: self.height,
            blur_iterations: self.blur_iterations,
            fullscreen: self.fullscreen,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,wgpu_core=warn,wgpu_hal=warn,naga=warn"),
    )
    .init();

    let args = Args::parse();

    let mut config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(&args.overrides());
    config.validate().context("Invalid configuration")?;

    let scene = match &config.paths.scene {
        Some(path) => SceneDescription::load(path)
            .with_context(|| format!("Failed to load scene {}", path.display()))?,
        None => SceneDescription::default_village(&config.paths.asset_root),
    };
    info!("Loaded scene: {} ({} objects)", scene.name, scene.objects.len());

    let mut state = ProgramState {
        settings: config.render_settings(),
        ..Default::default()
    };
    if let Err(e) = state.load_from_file(&config.paths.state_file) {
        warn!(
            "Could not read program state {}: {}; using defaults",
            config.paths.state_file.display(),
            e
        );
    }

    println!("Controls:");
    println!("  WASD     - Move");
    println!("  Mouse    - Look, scroll to zoom");
    println!("  Space    - Toggle HDR");
    println!("  B        - Toggle bloom");
    println!("  G        - Toggle grayscale");
    println!("  H / J    - Exposure down / up");
    println!("  Q / E    - Parallax height down / up");
    println!("  F1       - Toggle debug overlay");
    println!("  Escape   - Exit");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = FrostvaleApp::new(config, scene, state);
    event_loop.run_app(&mut app)?;

    if let Some(e) = app.take_startup_error() {
        return Err(e);
    }
    Ok(())
}
