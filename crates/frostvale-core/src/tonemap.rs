//! Color constants shared with the post-processing shaders.
//!
//! The shaders hard-code none of these; they arrive through the frame,
//! skybox and resolve uniforms.

/// Rec. 709 luma weights used by the bright-pass split and the grayscale resolve.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Display gamma applied by the resolve pass when the surface is not sRGB.
pub const DISPLAY_GAMMA: f32 = 2.2;

/// `LUMA_WEIGHTS` padded to a uniform `vec4`.
pub fn luma_uniform() -> [f32; 4] {
    let [r, g, b] = LUMA_WEIGHTS;
    [r, g, b, 0.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_weights_keep_white_white() {
        let sum: f32 = LUMA_WEIGHTS.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn luma_uniform_pads_with_zero() {
        assert_eq!(luma_uniform(), [0.2126, 0.7152, 0.0722, 0.0]);
    }
}
