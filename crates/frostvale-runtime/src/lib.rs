//! Frostvale Runtime - per-frame loop infrastructure
//!
//! - `FrameClock` - frame delta and elapsed time
//! - `InputState` - keyboard and mouse tracking with edge-triggered presses
//! - `Controls` - key bindings applied to the program state each frame

mod clock;
mod controls;
mod input;

pub use clock::FrameClock;
pub use controls::{ControlOutcome, Controls};
pub use input::{Action, InputState};
