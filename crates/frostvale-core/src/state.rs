//! Program state persisted between runs
//!
//! The file is a newline-separated list of numbers with no names and no
//! version. Field order:
//!
//! | # | field |
//! |---|-------|
//! | 0-2 | clear color r, g, b |
//! | 3 | overlay visible (0 or 1) |
//! | 4-6 | camera position x, y, z |
//! | 7-9 | camera front x, y, z |
//! | 10-13 | house scale, position x, y, z |
//! | 14-17 | snow scale, position x, y, z |
//! | 18-21 | mountain scale, position x, y, z |
//! | 22 | exposure |
//! | 23-25 | point light attenuation constant, linear, quadratic |
//!
//! Loading is lenient: fields are taken in order up to the first token that
//! does not parse, and everything after keeps its default.

use std::path::Path;

use glam::Vec3;
use log::{debug, warn};

use crate::camera::FlyCamera;
use crate::error::Result;
use crate::settings::RenderSettings;

/// Number of numeric fields in the state file.
pub const STATE_FIELD_COUNT: usize = 26;

/// A uniform scale plus a position, composed over an object's base transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub scale: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

/// The scene objects whose placement is persisted and editable from the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSlot {
    House,
    Snow,
    Mountain,
}

impl PlacementSlot {
    pub const ALL: [PlacementSlot; 3] = [PlacementSlot::House, PlacementSlot::Snow, PlacementSlot::Mountain];

    pub fn index(self) -> usize {
        match self {
            PlacementSlot::House => 0,
            PlacementSlot::Snow => 1,
            PlacementSlot::Mountain => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlacementSlot::House => "House",
            PlacementSlot::Snow => "Snow",
            PlacementSlot::Mountain => "Mountain",
        }
    }
}

/// Outcome of reading a state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Fields applied from the file.
    pub applied: usize,
    /// Total numeric tokens found before parsing stopped.
    pub found: usize,
    /// First token that failed to parse, if any.
    pub malformed: Option<String>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.applied == STATE_FIELD_COUNT && self.found == STATE_FIELD_COUNT && self.malformed.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramState {
    pub clear_color: Vec3,
    pub overlay_enabled: bool,
    pub camera: FlyCamera,
    /// Mouse look on/off from the overlay. Not persisted.
    pub camera_mouse_look: bool,
    pub placements: [Placement; 3],
    /// Only `exposure` is persisted; the toggles start from defaults every run.
    pub settings: RenderSettings,
    /// Attenuation of the first point light: constant, linear, quadratic.
    pub light_attenuation: [f32; 3],
}

impl Default for ProgramState {
    fn default() -> Self {
        Self {
            clear_color: Vec3::ZERO,
            overlay_enabled: false,
            camera: FlyCamera::new(Vec3::new(0.0, 0.0, 3.0)),
            camera_mouse_look: true,
            placements: [Placement::default(); 3],
            settings: RenderSettings::default(),
            light_attenuation: [1.0, 0.09, 0.032],
        }
    }
}

impl ProgramState {
    pub fn placement(&self, slot: PlacementSlot) -> &Placement {
        &self.placements[slot.index()]
    }

    pub fn placement_mut(&mut self, slot: PlacementSlot) -> &mut Placement {
        &mut self.placements[slot.index()]
    }

    fn to_fields(&self) -> Vec<f32> {
        let mut fields = Vec::with_capacity(STATE_FIELD_COUNT);
        fields.extend(self.clear_color.to_array());
        fields.push(if self.overlay_enabled { 1.0 } else { 0.0 });
        fields.extend(self.camera.position.to_array());
        fields.extend(self.camera.front.to_array());
        for placement in &self.placements {
            fields.push(placement.scale);
            fields.extend(placement.position.to_array());
        }
        fields.push(self.settings.exposure);
        fields.extend(self.light_attenuation);
        fields
    }

    /// Overwrite fields from a prefix of the canonical order.
    fn apply_fields(&mut self, fields: &[f32]) {
        let mut current = self.to_fields();
        current[..fields.len()].copy_from_slice(fields);
        let f = &current;
        let vec3 = |i: usize| Vec3::new(f[i], f[i + 1], f[i + 2]);

        self.clear_color = vec3(0);
        self.overlay_enabled = f[3] != 0.0;
        self.camera.position = vec3(4);
        if fields.len() > 7 {
            self.camera.set_front(vec3(7));
        }
        for (i, placement) in self.placements.iter_mut().enumerate() {
            let base = 10 + i * 4;
            placement.scale = f[base];
            placement.position = vec3(base + 1);
        }
        self.settings.exposure = f[22];
        self.light_attenuation = [f[23], f[24], f[25]];
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for value in self.to_fields() {
            out.push_str(&value.to_string());
            out.push('\n');
        }
        out
    }

    /// Parse a state file's contents over the current values.
    pub fn apply_text(&mut self, text: &str) -> LoadReport {
        let mut parsed = Vec::with_capacity(STATE_FIELD_COUNT);
        let mut malformed = None;
        let mut found = 0;

        for token in text.split_whitespace() {
            match token.parse::<f32>() {
                Ok(value) => {
                    found += 1;
                    if parsed.len() < STATE_FIELD_COUNT {
                        parsed.push(value);
                    }
                }
                Err(_) => {
                    malformed = Some(token.to_string());
                    break;
                }
            }
        }

        self.apply_fields(&parsed);
        LoadReport {
            applied: parsed.len(),
            found,
            malformed,
        }
    }

    pub fn from_text(text: &str) -> (Self, LoadReport) {
        let mut state = Self::default();
        let report = state.apply_text(text);
        (state, report)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_text())?;
        debug!("Saved program state to {}", path.display());
        Ok(())
    }

    /// Load over the current values. A missing file leaves them untouched and
    /// returns `Ok(false)`.
    pub fn load_from_file(&mut self, path: &Path) -> Result<bool> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No program state at {}, using defaults", path.display());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let report = self.apply_text(&text);
        if let Some(token) = &report.malformed {
            warn!(
                "Program state {}: stopped at malformed value '{}' after {} fields",
                path.display(),
                token,
                report.applied
            );
        } else if report.found != STATE_FIELD_COUNT {
            warn!(
                "Program state {}: expected {} fields, found {}",
                path.display(),
                STATE_FIELD_COUNT,
                report.found
            );
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProgramState {
        let mut state = ProgramState {
            clear_color: Vec3::new(0.1, 0.2, 0.3),
            overlay_enabled: true,
            light_attenuation: [1.0, 0.14, 0.07],
            ..Default::default()
        };
        state.camera.position = Vec3::new(1.5, 2.25, -7.125);
        state.camera.set_front(Vec3::new(0.3, -0.2, -0.9));
        state.placements[0] = Placement {
            position: Vec3::new(0.0, 0.5, -1.0),
            scale: 0.35,
        };
        state.placements[1] = Placement {
            position: Vec3::new(3.0, -0.1, 2.0),
            scale: 2.0,
        };
        state.placements[2] = Placement {
            position: Vec3::new(-40.0, -2.0, -60.0),
            scale: 0.05,
        };
        state.settings.exposure = 0.731;
        state
    }

    #[test]
    fn text_has_fixed_field_count() {
        let text = sample().to_text();
        assert_eq!(text.lines().count(), STATE_FIELD_COUNT);
    }

    #[test]
    fn round_trip_is_exact() {
        let state = sample();
        let (loaded, report) = ProgramState::from_text(&state.to_text());
        assert!(report.is_complete());
        assert_eq!(loaded.to_fields(), state.to_fields());
        assert_eq!(loaded.clear_color, state.clear_color);
        assert_eq!(loaded.overlay_enabled, state.overlay_enabled);
        assert_eq!(loaded.camera.position, state.camera.position);
        assert_eq!(loaded.placements, state.placements);
        assert_eq!(loaded.settings.exposure, state.settings.exposure);
        assert_eq!(loaded.light_attenuation, state.light_attenuation);
    }

    #[test]
    fn round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("frostvale_state_{}.txt", std::process::id()));
        let state = sample();
        state.save_to_file(&path).unwrap();

        let mut loaded = ProgramState::default();
        assert!(loaded.load_from_file(&path).unwrap());
        assert_eq!(loaded.to_fields(), state.to_fields());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let path = std::env::temp_dir().join("frostvale_state_does_not_exist.txt");
        let mut state = ProgramState::default();
        assert!(!state.load_from_file(&path).unwrap());
        assert_eq!(state, ProgramState::default());
    }

    #[test]
    fn short_file_fills_prefix() {
        let (state, report) = ProgramState::from_text("0.5\n0.25\n0.125\n1\n");
        assert_eq!(report.applied, 4);
        assert!(!report.is_complete());
        assert_eq!(state.clear_color, Vec3::new(0.5, 0.25, 0.125));
        assert!(state.overlay_enabled);
        assert_eq!(state.camera.position, Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(state.settings.exposure, 1.0);
    }

    #[test]
    fn malformed_token_stops_parsing() {
        let (state, report) = ProgramState::from_text("0.5 0.5 oops 0.5");
        assert_eq!(report.applied, 2);
        assert_eq!(report.malformed.as_deref(), Some("oops"));
        assert_eq!(state.clear_color, Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut text = sample().to_text();
        text.push_str("42\n");
        let (state, report) = ProgramState::from_text(&text);
        assert_eq!(report.applied, STATE_FIELD_COUNT);
        assert_eq!(report.found, STATE_FIELD_COUNT + 1);
        assert_eq!(state.to_fields(), sample().to_fields());
    }

    #[test]
    fn toggles_are_not_persisted() {
        let mut state = sample();
        state.settings.hdr = false;
        state.settings.grayscale = true;
        let (loaded, _) = ProgramState::from_text(&state.to_text());
        assert!(loaded.settings.hdr);
        assert!(!loaded.settings.grayscale);
    }
}
