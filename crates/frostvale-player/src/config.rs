//! Layered player configuration
//!
//! Resolution order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config: `~/.frostvale/config.toml`
//! 3. Project config: `./frostvale.toml`, or the file passed with `--config`
//! 4. Command-line flags
//!
//! File layers are merged key by key, so a project file that only sets
//! `[render] blur_iterations` keeps every other value from the layers below.

use frostvale_core::{FrostError, RenderSettings, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project config file looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "frostvale.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Requested MSAA samples of the composite target
    pub msaa_samples: u32,
    pub blur_iterations: u32,
    pub bloom_threshold: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let settings = RenderSettings::default();
        Self {
            msaa_samples: frostvale_render::DEFAULT_MSAA_SAMPLES,
            blur_iterations: settings.blur_iterations,
            bloom_threshold: settings.bloom_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory the built-in village resolves its assets against
    pub asset_root: PathBuf,
    pub state_file: PathBuf,
    /// Scene description; the built-in village when unset
    pub scene: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            state_file: PathBuf::from("frostvale_state.txt"),
            scene: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub window: WindowConfig,
    pub render: RenderConfig,
    pub paths: PathsConfig,
}

/// Values given on the command line. `None` leaves the file layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub scene: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub blur_iterations: Option<u32>,
    pub fullscreen: bool,
}

impl PlayerConfig {
    /// Load the global and project layers.
    ///
    /// `explicit` replaces the `./frostvale.toml` lookup and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut layers: Vec<(PathBuf, bool)> = Vec::new();
        if let Some(global) = global_config_path() {
            layers.push((global, false));
        }
        match explicit {
            Some(path) => layers.push((path.to_path_buf(), true)),
            None => layers.push((PathBuf::from(PROJECT_CONFIG_FILE), false)),
        }
        Self::load_layers(&layers)
    }

    /// Merge each `(path, required)` layer in order over the defaults.
    /// Optional layers that do not exist are skipped.
    pub fn load_layers(layers: &[(PathBuf, bool)]) -> Result<Self> {
        let mut merged = toml::Table::new();
        for (path, required) in layers {
            if !required && !path.exists() {
                continue;
            }
            let layer = read_table(path)?;
            log::debug!("Applied config layer {}", path.display());
            merge_tables(&mut merged, layer);
        }
        let config: PlayerConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| FrostError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(scene) = &overrides.scene {
            self.paths.scene = Some(scene.clone());
        }
        if let Some(state_file) = &overrides.state_file {
            self.paths.state_file = state_file.clone();
        }
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(iterations) = overrides.blur_iterations {
            self.render.blur_iterations = iterations;
        }
        if overrides.fullscreen {
            self.window.fullscreen = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(FrostError::ConfigError(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.render.msaa_samples == 0 {
            return Err(FrostError::ConfigError(
                "msaa_samples must be at least 1".to_string(),
            ));
        }
        if !self.render.bloom_threshold.is_finite() {
            return Err(FrostError::ConfigError(format!(
                "bloom_threshold must be finite, got {}",
                self.render.bloom_threshold
            )));
        }
        Ok(())
    }

    /// Render settings for the first frame: config scalars over the defaults.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            blur_iterations: self.render.blur_iterations,
            bloom_threshold: self.render.bloom_threshold,
            ..RenderSettings::default()
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".frostvale").join("config.toml"))
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FrostError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    content
        .parse::<toml::Table>()
        .map_err(|e| FrostError::TomlParseError(format!("{}: {}", path.display(), e)))
}

/// Recursively merge `overlay` into `base`. Nested tables merge; any other
/// value replaces what was there.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("frostvale_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn no_layers_gives_defaults() {
        let config = PlayerConfig::load_layers(&[]).unwrap();
        assert_eq!(config, PlayerConfig::default());
        assert_eq!(config.render.blur_iterations, 10);
        assert_eq!(config.render.msaa_samples, 4);
    }

    #[test]
    fn missing_optional_layer_is_skipped() {
        let path = std::env::temp_dir().join("frostvale_config_test_does_not_exist.toml");
        let config = PlayerConfig::load_layers(&[(path, false)]).unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn missing_required_layer_is_an_error() {
        let path = std::env::temp_dir().join("frostvale_config_test_required_missing.toml");
        assert!(PlayerConfig::load_layers(&[(path, true)]).is_err());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = write_temp(
            "partial.toml",
            r#"
            [render]
            blur_iterations = 4
            "#,
        );
        let config = PlayerConfig::load_layers(&[(path, true)]).unwrap();
        assert_eq!(config.render.blur_iterations, 4);
        assert_eq!(config.render.msaa_samples, 4);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn later_layer_overrides_only_the_keys_it_sets() {
        let global = write_temp(
            "global.toml",
            r#"
            [window]
            width = 1920
            height = 1080
            vsync = false

            [paths]
            asset_root = "/srv/frostvale/assets"
            "#,
        );
        let project = write_temp(
            "project.toml",
            r#"
            [window]
            width = 800
            "#,
        );
        let config = PlayerConfig::load_layers(&[(global, true), (project, true)]).unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 1080);
        assert!(!config.window.vsync);
        assert_eq!(config.paths.asset_root, PathBuf::from("/srv/frostvale/assets"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = write_temp("malformed.toml", "[window\nwidth = ");
        let err = PlayerConfig::load_layers(&[(path, true)]).unwrap_err();
        assert!(matches!(err, FrostError::TomlParseError(_)));
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let path = write_temp("wrong_type.toml", "[render]\nblur_iterations = \"many\"\n");
        let err = PlayerConfig::load_layers(&[(path, true)]).unwrap_err();
        assert!(matches!(err, FrostError::ConfigError(_)));
    }

    #[test]
    fn zero_window_size_is_rejected() {
        let path = write_temp("zero_size.toml", "[window]\nwidth = 0\n");
        assert!(PlayerConfig::load_layers(&[(path, true)]).is_err());
    }

    #[test]
    fn command_line_wins() {
        let mut config = PlayerConfig::default();
        config.apply_overrides(&ConfigOverrides {
            scene: Some(PathBuf::from("village.toml")),
            width: Some(640),
            blur_iterations: Some(0),
            fullscreen: true,
            ..Default::default()
        });
        assert_eq!(config.paths.scene, Some(PathBuf::from("village.toml")));
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.render.blur_iterations, 0);
        assert!(config.window.fullscreen);
        assert_eq!(config.render_settings().blur_iterations, 0);
    }

    #[test]
    fn merge_replaces_scalars_and_merges_tables() {
        let mut base: toml::Table = "a = 1\n[t]\nx = 1\ny = 2\n".parse().unwrap();
        let overlay: toml::Table = "a = 5\n[t]\ny = 3\n".parse().unwrap();
        merge_tables(&mut base, overlay);
        assert_eq!(base["a"].as_integer(), Some(5));
        assert_eq!(base["t"]["x"].as_integer(), Some(1));
        assert_eq!(base["t"]["y"].as_integer(), Some(3));
    }
}
