//! Ping-pong separable Gaussian blur schedule

/// Number of one-sided kernel taps (center included).
pub const GAUSSIAN_TAPS: usize = 5;

/// One-sided 9-tap Gaussian kernel. `w[0] + 2 * sum(w[1..])` is ~1.
pub const GAUSSIAN_WEIGHTS: [f32; GAUSSIAN_TAPS] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

impl BlurDirection {
    /// Even iterations blur horizontally, odd iterations vertically.
    pub fn for_iteration(iteration: u32) -> Self {
        if iteration % 2 == 0 {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }

    /// Texel step multiplier `(x, y)` used by the blur shader.
    pub fn axis(self) -> [f32; 2] {
        match self {
            Self::Horizontal => [1.0, 0.0],
            Self::Vertical => [0.0, 1.0],
        }
    }
}

/// Where a blur pass (or the composite) reads bloom from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurSource {
    /// The unblurred bright-pass attachment of the HDR target.
    BrightPass,
    /// One slot of the ping-pong pair.
    PingPong(usize),
}

/// A single one-dimensional blur pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurPass {
    pub iteration: u32,
    pub direction: BlurDirection,
    pub source: BlurSource,
    /// Ping-pong slot written by this pass.
    pub target: usize,
}

/// The passes of one frame's blur plus the buffer holding the finished result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlurPlan {
    pub passes: Vec<BlurPass>,
    pub output: BlurSource,
}

/// Schedule `iterations` blur passes over the ping-pong pair.
///
/// Each pass writes slot `current`, then `current` flips. With zero
/// iterations the output is the raw bright-pass attachment.
pub fn plan_blur(iterations: u32) -> BlurPlan {
    let mut passes = Vec::with_capacity(iterations as usize);
    let mut current = 0usize;
    let mut source = BlurSource::BrightPass;

    for iteration in 0..iterations {
        passes.push(BlurPass {
            iteration,
            direction: BlurDirection::for_iteration(iteration),
            source,
            target: current,
        });
        source = BlurSource::PingPong(current);
        current = 1 - current;
    }

    BlurPlan {
        passes,
        output: source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_sums_to_one() {
        let total = GAUSSIAN_WEIGHTS[0] + 2.0 * GAUSSIAN_WEIGHTS[1..].iter().sum::<f32>();
        assert!((total - 1.0).abs() < 1e-3);
        assert!(GAUSSIAN_WEIGHTS.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn zero_iterations_reads_bright_pass() {
        let plan = plan_blur(0);
        assert!(plan.passes.is_empty());
        assert_eq!(plan.output, BlurSource::BrightPass);
    }

    #[test]
    fn passes_alternate_direction_and_slot() {
        let plan = plan_blur(10);
        assert_eq!(plan.passes.len(), 10);
        assert_eq!(plan.passes[0].source, BlurSource::BrightPass);

        for (i, pass) in plan.passes.iter().enumerate() {
            let expected = if i % 2 == 0 {
                BlurDirection::Horizontal
            } else {
                BlurDirection::Vertical
            };
            assert_eq!(pass.direction, expected);
            assert_eq!(pass.target, i % 2);
            if i > 0 {
                assert_eq!(pass.source, BlurSource::PingPong(plan.passes[i - 1].target));
                assert_ne!(pass.source, BlurSource::PingPong(pass.target));
            }
        }
    }

    #[test]
    fn output_is_last_written_slot() {
        assert_eq!(plan_blur(1).output, BlurSource::PingPong(0));
        assert_eq!(plan_blur(2).output, BlurSource::PingPong(1));
        assert_eq!(plan_blur(9).output, BlurSource::PingPong(0));
        assert_eq!(plan_blur(10).output, BlurSource::PingPong(1));
    }
}
