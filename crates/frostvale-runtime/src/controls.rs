//! Key bindings applied to the program state once per frame

use frostvale_core::{CameraMovement, ProgramState, RenderToggle};
use log::info;

use crate::input::{Action, InputState};

/// What a frame of input changed beyond the state itself.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ControlOutcome {
    /// Render flags flipped this frame with their new values.
    pub toggled: Vec<(RenderToggle, bool)>,
    /// New overlay visibility when F1 was pressed.
    pub overlay: Option<bool>,
    pub exit: bool,
}

#[derive(Debug, Default, Clone)]
pub struct Controls {
    /// Set while the overlay has keyboard focus; held keys and toggles are ignored.
    pub keyboard_captured: bool,
}

const TOGGLES: [(Action, RenderToggle); 3] = [
    (Action::ToggleHdr, RenderToggle::Hdr),
    (Action::ToggleBloom, RenderToggle::Bloom),
    (Action::ToggleGrayscale, RenderToggle::Grayscale),
];

const MOVES: [(Action, CameraMovement); 4] = [
    (Action::MoveForward, CameraMovement::Forward),
    (Action::MoveBackward, CameraMovement::Backward),
    (Action::MoveLeft, CameraMovement::Left),
    (Action::MoveRight, CameraMovement::Right),
];

impl Controls {
    pub fn apply(&self, input: &InputState, state: &mut ProgramState, delta_time: f32) -> ControlOutcome {
        let mut outcome = ControlOutcome::default();

        if input.is_action_just_pressed(Action::Exit) {
            outcome.exit = true;
        }
        if input.is_action_just_pressed(Action::ToggleOverlay) {
            state.overlay_enabled = !state.overlay_enabled;
            outcome.overlay = Some(state.overlay_enabled);
        }

        if !self.keyboard_captured {
            for (action, toggle) in TOGGLES {
                if input.is_action_just_pressed(action) {
                    let value = state.settings.toggle(toggle);
                    info!("{}: {}", toggle.label(), if value { "on" } else { "off" });
                    outcome.toggled.push((toggle, value));
                }
            }

            for (action, movement) in MOVES {
                if input.is_action_pressed(action) {
                    state.camera.process_keyboard(movement, delta_time);
                }
            }

            if input.is_action_pressed(Action::ExposureDown) {
                state.settings.decrease_exposure();
            } else if input.is_action_pressed(Action::ExposureUp) {
                state.settings.increase_exposure();
            }

            if input.is_action_pressed(Action::HeightScaleDown) {
                state.settings.nudge_height_scale(-1.0);
            } else if input.is_action_pressed(Action::HeightScaleUp) {
                state.settings.nudge_height_scale(1.0);
            }
        }

        if !state.overlay_enabled {
            if state.camera_mouse_look {
                let (dx, dy) = input.raw_mouse_delta();
                if dx != 0.0 || dy != 0.0 {
                    state.camera.process_mouse_movement(dx as f32, dy as f32, true);
                }
            }
            let scroll = input.scroll_delta();
            if scroll != 0.0 {
                state.camera.process_scroll(scroll);
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    fn frame(controls: &Controls, input: &mut InputState, state: &mut ProgramState) -> ControlOutcome {
        let outcome = controls.apply(input, state, 1.0 / 60.0);
        input.end_frame();
        outcome
    }

    #[test]
    fn held_toggle_key_flips_once() {
        let controls = Controls::default();
        let mut input = InputState::new();
        let mut state = ProgramState::default();
        assert!(state.settings.hdr);

        input.process_key_down(KeyCode::Space);
        for _ in 0..120 {
            // Auto-repeat keeps reporting the key as pressed.
            input.process_key_down(KeyCode::Space);
            frame(&controls, &mut input, &mut state);
        }
        assert!(!state.settings.hdr);

        input.process_key_up(KeyCode::Space);
        frame(&controls, &mut input, &mut state);
        input.process_key_down(KeyCode::Space);
        let outcome = frame(&controls, &mut input, &mut state);
        assert!(state.settings.hdr);
        assert_eq!(outcome.toggled, vec![(RenderToggle::Hdr, true)]);
    }

    #[test]
    fn grayscale_and_bloom_keys() {
        let controls = Controls::default();
        let mut input = InputState::new();
        let mut state = ProgramState::default();

        input.process_key_down(KeyCode::KeyG);
        input.process_key_down(KeyCode::KeyB);
        frame(&controls, &mut input, &mut state);
        assert!(state.settings.grayscale);
        assert!(!state.settings.bloom);
    }

    #[test]
    fn overlay_key_flips_visibility() {
        let controls = Controls::default();
        let mut input = InputState::new();
        let mut state = ProgramState::default();

        input.process_key_down(KeyCode::F1);
        let outcome = frame(&controls, &mut input, &mut state);
        assert_eq!(outcome.overlay, Some(true));
        assert!(state.overlay_enabled);
    }

    #[test]
    fn held_exposure_keys_step_every_frame() {
        let controls = Controls::default();
        let mut input = InputState::new();
        let mut state = ProgramState::default();

        input.process_key_down(KeyCode::KeyJ);
        for _ in 0..10 {
            frame(&controls, &mut input, &mut state);
        }
        assert!((state.settings.exposure - 1.01).abs() < 1e-5);

        // H wins when both are held.
        input.process_key_down(KeyCode::KeyH);
        frame(&controls, &mut input, &mut state);
        assert!((state.settings.exposure - 1.009).abs() < 1e-5);
    }

    #[test]
    fn overlay_blocks_mouse_look() {
        let controls = Controls::default();
        let mut input = InputState::new();
        let mut state = ProgramState {
            overlay_enabled: true,
            ..Default::default()
        };
        let yaw = state.camera.yaw;

        input.process_mouse_raw_delta(50.0, 0.0);
        frame(&controls, &mut input, &mut state);
        assert_eq!(state.camera.yaw, yaw);

        state.overlay_enabled = false;
        input.process_mouse_raw_delta(50.0, 0.0);
        frame(&controls, &mut input, &mut state);
        assert!((state.camera.yaw - (yaw + 5.0)).abs() < 1e-4);
    }

    #[test]
    fn captured_keyboard_ignores_toggles() {
        let controls = Controls {
            keyboard_captured: true,
        };
        let mut input = InputState::new();
        let mut state = ProgramState::default();
        input.process_key_down(KeyCode::KeyG);
        input.process_key_down(KeyCode::Escape);
        let outcome = frame(&controls, &mut input, &mut state);
        assert!(!state.settings.grayscale);
        assert!(outcome.exit);
    }
}
