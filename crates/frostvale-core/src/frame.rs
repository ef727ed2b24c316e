//! Frame plan: the ordered render-target operations of one frame
//!
//! The plan is built from the current `RenderSettings` and validated before
//! the GPU executor walks it. Every step is always present; toggles only
//! change the parameters carried by an operation.

use crate::blur::{plan_blur, BlurPass, BlurSource};
use crate::error::{FrostError, Result};
use crate::settings::RenderSettings;

/// A render target the frame reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    /// HDR attachment 0: full shaded color.
    HdrColor,
    /// HDR attachment 1: bright-pass color.
    HdrBright,
    /// Depth attachment of the HDR target.
    HdrDepth,
    PingPong(usize),
    /// Multisampled composite target.
    Multisample,
    /// The swapchain texture.
    Surface,
}

impl TargetId {
    /// Whether the target must be cleared each frame before anything draws
    /// into it. Ping-pong slots are fully overwritten by their blur pass.
    pub fn cleared_each_frame(self) -> bool {
        !matches!(self, TargetId::PingPong(_))
    }
}

impl From<BlurSource> for TargetId {
    fn from(source: BlurSource) -> Self {
        match source {
            BlurSource::BrightPass => TargetId::HdrBright,
            BlurSource::PingPong(i) => TargetId::PingPong(i),
        }
    }
}

/// The fixed stages of the frame driver, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameStep {
    Scene,
    Blur,
    Composite,
    Resolve,
    Overlay,
    Present,
}

impl FrameStep {
    pub const ALL: [FrameStep; 6] = [
        FrameStep::Scene,
        FrameStep::Blur,
        FrameStep::Composite,
        FrameStep::Resolve,
        FrameStep::Overlay,
        FrameStep::Present,
    ];
}

/// One render-target operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOp {
    Clear { target: TargetId },
    /// Skybox and scene geometry into the HDR color, bright and depth attachments.
    DrawScene,
    Blur(BlurPass),
    /// Composite HDR color with optional bloom and tone map into the multisample target.
    Composite {
        bloom: Option<BlurSource>,
        hdr: bool,
        exposure: f32,
    },
    /// Multisample target to surface with optional grayscale.
    Resolve { grayscale: bool },
    /// Debug overlay drawn on the surface. Not drawn when `visible` is false.
    Overlay { visible: bool },
    Present,
}

impl PassOp {
    pub fn step(&self) -> FrameStep {
        match self {
            PassOp::Clear { target } => match target {
                TargetId::HdrColor | TargetId::HdrBright | TargetId::HdrDepth => FrameStep::Scene,
                TargetId::PingPong(_) => FrameStep::Blur,
                TargetId::Multisample => FrameStep::Composite,
                TargetId::Surface => FrameStep::Resolve,
            },
            PassOp::DrawScene => FrameStep::Scene,
            PassOp::Blur(_) => FrameStep::Blur,
            PassOp::Composite { .. } => FrameStep::Composite,
            PassOp::Resolve { .. } => FrameStep::Resolve,
            PassOp::Overlay { .. } => FrameStep::Overlay,
            PassOp::Present => FrameStep::Present,
        }
    }

    /// Targets sampled or loaded by this operation.
    pub fn reads(&self) -> Vec<TargetId> {
        match self {
            PassOp::Clear { .. } => Vec::new(),
            PassOp::DrawScene => vec![TargetId::HdrDepth],
            PassOp::Blur(pass) => vec![pass.source.into()],
            PassOp::Composite { bloom, .. } => {
                let mut reads = vec![TargetId::HdrColor];
                if let Some(source) = bloom {
                    reads.push((*source).into());
                }
                reads
            }
            PassOp::Resolve { .. } => vec![TargetId::Multisample],
            PassOp::Overlay { visible } => {
                if *visible {
                    vec![TargetId::Surface]
                } else {
                    Vec::new()
                }
            }
            PassOp::Present => vec![TargetId::Surface],
        }
    }

    /// Targets written by this operation.
    pub fn writes(&self) -> Vec<TargetId> {
        match self {
            PassOp::Clear { target } => vec![*target],
            PassOp::DrawScene => vec![TargetId::HdrColor, TargetId::HdrBright, TargetId::HdrDepth],
            PassOp::Blur(pass) => vec![TargetId::PingPong(pass.target)],
            PassOp::Composite { .. } => vec![TargetId::Multisample],
            PassOp::Resolve { .. } => vec![TargetId::Surface],
            PassOp::Overlay { visible } => {
                if *visible {
                    vec![TargetId::Surface]
                } else {
                    Vec::new()
                }
            }
            PassOp::Present => Vec::new(),
        }
    }
}

/// The full list of operations for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub ops: Vec<PassOp>,
    /// Where the composite reads bloom from when bloom is enabled.
    pub bloom_source: BlurSource,
}

impl FramePlan {
    pub fn build(settings: &RenderSettings, overlay_visible: bool) -> Self {
        let blur = plan_blur(settings.blur_iterations);
        let mut ops = vec![
            PassOp::Clear {
                target: TargetId::HdrColor,
            },
            PassOp::Clear {
                target: TargetId::HdrBright,
            },
            PassOp::Clear {
                target: TargetId::HdrDepth,
            },
            PassOp::DrawScene,
        ];
        ops.extend(blur.passes.iter().copied().map(PassOp::Blur));
        ops.push(PassOp::Clear {
            target: TargetId::Multisample,
        });
        ops.push(PassOp::Composite {
            bloom: settings.bloom.then_some(blur.output),
            hdr: settings.hdr,
            exposure: settings.exposure,
        });
        ops.push(PassOp::Clear {
            target: TargetId::Surface,
        });
        ops.push(PassOp::Resolve {
            grayscale: settings.grayscale,
        });
        ops.push(PassOp::Overlay {
            visible: overlay_visible,
        });
        ops.push(PassOp::Present);

        Self {
            ops,
            bloom_source: blur.output,
        }
    }

    /// Steps in the order their first operation appears.
    pub fn steps(&self) -> Vec<FrameStep> {
        let mut steps: Vec<FrameStep> = Vec::new();
        for op in &self.ops {
            let step = op.step();
            if steps.last() != Some(&step) {
                steps.push(step);
            }
        }
        steps
    }

    /// Check step order, that nothing is read before it is written this frame
    /// and that cleared targets are cleared before they are drawn into.
    pub fn validate(&self) -> Result<()> {
        let mut written: Vec<TargetId> = Vec::new();
        let mut cleared: Vec<TargetId> = Vec::new();
        let mut last_step = FrameStep::Scene;

        for (index, op) in self.ops.iter().enumerate() {
            let step = op.step();
            if step < last_step {
                return Err(FrostError::FramePlanError(format!(
                    "operation {index} ({op:?}) belongs to {step:?} but follows {last_step:?}"
                )));
            }
            last_step = step;

            for target in op.reads() {
                if !written.contains(&target) {
                    return Err(FrostError::FramePlanError(format!(
                        "operation {index} ({op:?}) reads {target:?} before it is written"
                    )));
                }
            }
            if let PassOp::Clear { target } = op {
                cleared.push(*target);
            } else if let Some(target) = op
                .writes()
                .into_iter()
                .find(|t| t.cleared_each_frame() && !cleared.contains(t))
            {
                return Err(FrostError::FramePlanError(format!(
                    "operation {index} ({op:?}) writes {target:?} before it is cleared"
                )));
            }
            for target in op.writes() {
                if !written.contains(&target) {
                    written.push(target);
                }
            }
        }

        let steps = self.steps();
        for step in FrameStep::ALL {
            // An empty blur schedule is the only step allowed to be absent.
            if step == FrameStep::Blur {
                continue;
            }
            if !steps.contains(&step) {
                return Err(FrostError::FramePlanError(format!("missing step {step:?}")));
            }
        }
        Ok(())
    }
}
