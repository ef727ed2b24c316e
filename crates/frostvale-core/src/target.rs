//! Render target descriptions and completeness checks
//!
//! Targets are described without a device so the checks that would otherwise
//! surface as a validation panic can be run up front and reported as a setup
//! error.

use crate::error::{FrostError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Rgba16Float,
    Rgba8Unorm,
    Depth32Float,
}

impl TargetFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, TargetFormat::Depth32Float)
    }

    /// Whether the format holds values above 1.0.
    pub fn is_hdr(self) -> bool {
        matches!(self, TargetFormat::Rgba16Float)
    }
}

/// A render target: color attachments, optional depth, size and sample count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub color: Vec<TargetFormat>,
    pub depth: Option<TargetFormat>,
    /// Every color attachment must hold values above 1.0.
    pub hdr: bool,
}

impl TargetDesc {
    /// The two-attachment HDR capture target with depth.
    pub fn hdr(width: u32, height: u32) -> Self {
        Self {
            label: "hdr".to_string(),
            width,
            height,
            sample_count: 1,
            color: vec![TargetFormat::Rgba16Float, TargetFormat::Rgba16Float],
            depth: Some(TargetFormat::Depth32Float),
            hdr: true,
        }
    }

    /// One slot of the blur ping-pong pair.
    pub fn ping_pong(index: usize, width: u32, height: u32) -> Self {
        Self {
            label: format!("ping_pong_{index}"),
            width,
            height,
            sample_count: 1,
            color: vec![TargetFormat::Rgba16Float],
            depth: None,
            hdr: true,
        }
    }

    /// The 8-bit multisampled composite target.
    pub fn multisample(width: u32, height: u32, sample_count: u32) -> Self {
        Self {
            label: "multisample".to_string(),
            width,
            height,
            sample_count,
            color: vec![TargetFormat::Rgba8Unorm],
            depth: None,
            hdr: false,
        }
    }

    fn incomplete(&self, reason: impl Into<String>) -> FrostError {
        FrostError::IncompleteTarget {
            target: self.label.clone(),
            reason: reason.into(),
        }
    }

    /// Completeness check against the capabilities of the adapter.
    pub fn validate(&self, caps: &TargetCaps) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(self.incomplete(format!("zero size {}x{}", self.width, self.height)));
        }
        if self.width > caps.max_dimension || self.height > caps.max_dimension {
            return Err(self.incomplete(format!(
                "{}x{} exceeds the maximum dimension {}",
                self.width, self.height, caps.max_dimension
            )));
        }
        if self.color.is_empty() {
            return Err(self.incomplete("no color attachment"));
        }
        if self.color.len() as u32 > caps.max_color_attachments {
            return Err(self.incomplete(format!(
                "{} color attachments, adapter allows {}",
                self.color.len(),
                caps.max_color_attachments
            )));
        }
        if self.sample_count == 0 || !self.sample_count.is_power_of_two() {
            return Err(self.incomplete(format!("invalid sample count {}", self.sample_count)));
        }

        for &format in &self.color {
            if format.is_depth() {
                return Err(self.incomplete(format!("{format:?} used as a color attachment")));
            }
            if self.hdr && !format.is_hdr() {
                return Err(self.incomplete(format!("{format:?} cannot hold HDR values")));
            }
            self.check_format(format, caps)?;
        }
        if let Some(depth) = self.depth {
            if !depth.is_depth() {
                return Err(self.incomplete(format!("{depth:?} used as a depth attachment")));
            }
            self.check_format(depth, caps)?;
        }
        Ok(())
    }

    fn check_format(&self, format: TargetFormat, caps: &TargetCaps) -> Result<()> {
        let Some(fc) = caps.format(format) else {
            return Err(self.incomplete(format!("{format:?} is not supported")));
        };
        if !fc.renderable {
            return Err(self.incomplete(format!("{format:?} is not renderable")));
        }
        if !fc.sample_counts.contains(&self.sample_count) {
            return Err(self.incomplete(format!(
                "{format:?} does not support {} samples",
                self.sample_count
            )));
        }
        Ok(())
    }
}

/// What the adapter can do with one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatCaps {
    pub format: TargetFormat,
    pub renderable: bool,
    pub sample_counts: Vec<u32>,
}

/// Adapter limits relevant to render target creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCaps {
    pub max_dimension: u32,
    pub max_color_attachments: u32,
    pub formats: Vec<FormatCaps>,
}

impl TargetCaps {
    pub fn format(&self, format: TargetFormat) -> Option<&FormatCaps> {
        self.formats.iter().find(|f| f.format == format)
    }

    /// Highest supported sample count not above `requested`, for the multisample target.
    pub fn best_sample_count(&self, format: TargetFormat, requested: u32) -> u32 {
        self.format(format)
            .and_then(|fc| {
                fc.sample_counts
                    .iter()
                    .copied()
                    .filter(|&n| n <= requested)
                    .max()
            })
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> TargetCaps {
        TargetCaps {
            max_dimension: 8192,
            max_color_attachments: 8,
            formats: vec![
                FormatCaps {
                    format: TargetFormat::Rgba16Float,
                    renderable: true,
                    sample_counts: vec![1, 4],
                },
                FormatCaps {
                    format: TargetFormat::Rgba8Unorm,
                    renderable: true,
                    sample_counts: vec![1, 2, 4],
                },
                FormatCaps {
                    format: TargetFormat::Depth32Float,
                    renderable: true,
                    sample_counts: vec![1, 4],
                },
            ],
        }
    }

    #[test]
    fn standard_targets_are_complete() {
        let caps = caps();
        TargetDesc::hdr(1280, 720).validate(&caps).unwrap();
        TargetDesc::ping_pong(0, 1280, 720).validate(&caps).unwrap();
        TargetDesc::multisample(1280, 720, 4).validate(&caps).unwrap();
    }

    #[test]
    fn zero_size_is_incomplete() {
        let err = TargetDesc::hdr(0, 720).validate(&caps()).unwrap_err();
        assert!(matches!(err, FrostError::IncompleteTarget { ref target, .. } if target == "hdr"));
    }

    #[test]
    fn unsupported_sample_count_is_incomplete() {
        let err = TargetDesc::multisample(640, 480, 8).validate(&caps()).unwrap_err();
        assert!(err.to_string().contains("8 samples"), "{err}");
    }

    #[test]
    fn missing_format_is_incomplete() {
        let mut caps = caps();
        caps.formats.retain(|f| f.format != TargetFormat::Rgba16Float);
        assert!(TargetDesc::hdr(640, 480).validate(&caps).is_err());
    }

    #[test]
    fn too_many_attachments_is_incomplete() {
        let mut caps = caps();
        caps.max_color_attachments = 1;
        assert!(TargetDesc::hdr(640, 480).validate(&caps).is_err());
    }

    #[test]
    fn depth_as_color_is_incomplete() {
        let mut desc = TargetDesc::ping_pong(1, 64, 64);
        desc.color = vec![TargetFormat::Depth32Float];
        assert!(desc.validate(&caps()).is_err());
    }

    #[test]
    fn eight_bit_attachment_on_hdr_target_is_incomplete() {
        let mut desc = TargetDesc::hdr(64, 64);
        desc.color[1] = TargetFormat::Rgba8Unorm;
        let err = desc.validate(&caps()).unwrap_err();
        assert!(err.to_string().contains("HDR"), "{err}");

        let mut desc = TargetDesc::ping_pong(0, 64, 64);
        desc.color = vec![TargetFormat::Rgba8Unorm];
        assert!(desc.validate(&caps()).is_err());
    }

    #[test]
    fn eight_bit_multisample_target_is_complete() {
        let desc = TargetDesc::multisample(64, 64, 4);
        assert!(!desc.hdr);
        assert!(!desc.color[0].is_hdr());
        desc.validate(&caps()).unwrap();
    }

    #[test]
    fn best_sample_count_falls_back() {
        let caps = caps();
        assert_eq!(caps.best_sample_count(TargetFormat::Rgba8Unorm, 8), 4);
        assert_eq!(caps.best_sample_count(TargetFormat::Rgba8Unorm, 3), 2);
        assert_eq!(caps.best_sample_count(TargetFormat::Rgba8Unorm, 1), 1);
    }
}
