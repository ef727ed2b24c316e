//! Render settings passed into the frame driver every frame

/// Number of separable blur passes run over the bright-pass buffer.
pub const DEFAULT_BLUR_ITERATIONS: u32 = 10;

/// Luminance above which shaded color spills into the bright-pass buffer.
pub const DEFAULT_BLOOM_THRESHOLD: f32 = 1.0;

/// Exposure change per frame while the exposure keys are held.
pub const EXPOSURE_STEP: f32 = 0.001;

/// Parallax height-scale change per frame while the height keys are held.
pub const HEIGHT_SCALE_STEP: f32 = 0.0005;

/// Post-processing and shading parameters for one frame.
///
/// Exposure carries no validation range: negative values are accepted and
/// produce inverted tone-mapped output.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Exposure tone mapping on/off. When off the composite passes color through.
    pub hdr: bool,
    /// Add the blurred bright-pass buffer to the HDR color.
    pub bloom: bool,
    /// Convert the resolved image to grayscale.
    pub grayscale: bool,
    pub exposure: f32,
    /// Parallax displacement scale for walls with a depth map.
    pub height_scale: f32,
    pub blur_iterations: u32,
    pub bloom_threshold: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            hdr: true,
            bloom: true,
            grayscale: false,
            exposure: 1.0,
            height_scale: 0.045,
            blur_iterations: DEFAULT_BLUR_ITERATIONS,
            bloom_threshold: DEFAULT_BLOOM_THRESHOLD,
        }
    }
}

/// A boolean render flag that the keyboard can flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderToggle {
    Hdr,
    Bloom,
    Grayscale,
}

impl RenderToggle {
    pub fn label(self) -> &'static str {
        match self {
            Self::Hdr => "HDR",
            Self::Bloom => "Bloom",
            Self::Grayscale => "Grayscale",
        }
    }
}

impl RenderSettings {
    /// Flip a flag and return its new value.
    pub fn toggle(&mut self, toggle: RenderToggle) -> bool {
        let flag = match toggle {
            RenderToggle::Hdr => &mut self.hdr,
            RenderToggle::Bloom => &mut self.bloom,
            RenderToggle::Grayscale => &mut self.grayscale,
        };
        *flag = !*flag;
        *flag
    }

    /// Lower exposure by one step. Keyboard input never pushes it below zero.
    pub fn decrease_exposure(&mut self) {
        self.exposure = (self.exposure - EXPOSURE_STEP).max(0.0);
    }

    /// Raise exposure by one step, unbounded.
    pub fn increase_exposure(&mut self) {
        self.exposure += EXPOSURE_STEP;
    }

    /// Nudge the parallax height scale, clamped to [0, 1].
    pub fn nudge_height_scale(&mut self, steps: f32) {
        self.height_scale = (self.height_scale + steps * HEIGHT_SCALE_STEP).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_startup_state() {
        let settings = RenderSettings::default();
        assert!(settings.hdr);
        assert!(settings.bloom);
        assert!(!settings.grayscale);
        assert_eq!(settings.exposure, 1.0);
        assert_eq!(settings.blur_iterations, 10);
    }

    #[test]
    fn toggle_returns_new_value() {
        let mut settings = RenderSettings::default();
        assert!(!settings.toggle(RenderToggle::Hdr));
        assert!(!settings.hdr);
        assert!(settings.toggle(RenderToggle::Hdr));
        assert!(settings.toggle(RenderToggle::Grayscale));
        assert!(settings.grayscale);
    }

    #[test]
    fn exposure_keys_floor_at_zero() {
        let mut settings = RenderSettings {
            exposure: 0.0015,
            ..Default::default()
        };
        settings.decrease_exposure();
        assert!((settings.exposure - 0.0005).abs() < 1e-6);
        settings.decrease_exposure();
        assert_eq!(settings.exposure, 0.0);
        settings.decrease_exposure();
        assert_eq!(settings.exposure, 0.0);
    }

    #[test]
    fn exposure_increase_is_unbounded() {
        let mut settings = RenderSettings {
            exposure: 50.0,
            ..Default::default()
        };
        for _ in 0..1000 {
            settings.increase_exposure();
        }
        assert!(settings.exposure > 50.9);
    }

    #[test]
    fn height_scale_clamped() {
        let mut settings = RenderSettings::default();
        settings.nudge_height_scale(-1000.0);
        assert_eq!(settings.height_scale, 0.0);
        settings.nudge_height_scale(1e6);
        assert_eq!(settings.height_scale, 1.0);
    }
}
