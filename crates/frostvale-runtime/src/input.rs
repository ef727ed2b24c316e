//! Input state management

use std::collections::{HashMap, HashSet};
use winit::keyboard::KeyCode;

/// Everything a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    ToggleHdr,
    ToggleBloom,
    ToggleGrayscale,
    ToggleOverlay,
    ExposureDown,
    ExposureUp,
    HeightScaleDown,
    HeightScaleUp,
    Exit,
}

/// Tracks keyboard and mouse input state per frame
///
/// A press is recorded in `keys_just_pressed` only on the up-to-down
/// transition, so OS key repeat never produces a second press.
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    keys_just_pressed: HashSet<KeyCode>,
    keys_just_released: HashSet<KeyCode>,

    /// Current cursor position in window pixels
    pub mouse_position: (f64, f64),
    /// Raw accumulated device motion
    raw_mouse_delta: (f64, f64),
    /// Scroll lines accumulated this frame
    scroll_delta: f32,

    action_map: HashMap<Action, Vec<KeyCode>>,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_down: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            keys_just_released: HashSet::new(),
            mouse_position: (0.0, 0.0),
            raw_mouse_delta: (0.0, 0.0),
            scroll_delta: 0.0,
            action_map: Self::default_action_map(),
        }
    }

    fn default_action_map() -> HashMap<Action, Vec<KeyCode>> {
        let mut map = HashMap::new();
        map.insert(Action::MoveForward, vec![KeyCode::KeyW]);
        map.insert(Action::MoveBackward, vec![KeyCode::KeyS]);
        map.insert(Action::MoveLeft, vec![KeyCode::KeyA]);
        map.insert(Action::MoveRight, vec![KeyCode::KeyD]);
        map.insert(Action::ToggleHdr, vec![KeyCode::Space]);
        map.insert(Action::ToggleBloom, vec![KeyCode::KeyB]);
        map.insert(Action::ToggleGrayscale, vec![KeyCode::KeyG]);
        map.insert(Action::ToggleOverlay, vec![KeyCode::F1]);
        map.insert(Action::ExposureDown, vec![KeyCode::KeyH]);
        map.insert(Action::ExposureUp, vec![KeyCode::KeyJ]);
        map.insert(Action::HeightScaleDown, vec![KeyCode::KeyQ]);
        map.insert(Action::HeightScaleUp, vec![KeyCode::KeyE]);
        map.insert(Action::Exit, vec![KeyCode::Escape]);
        map
    }

    pub fn bindings(&self, action: Action) -> &[KeyCode] {
        self.action_map.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn process_key_down(&mut self, key: KeyCode) {
        if !self.keys_down.contains(&key) {
            self.keys_just_pressed.insert(key);
        }
        self.keys_down.insert(key);
    }

    pub fn process_key_up(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
        self.keys_just_released.insert(key);
    }

    pub fn process_mouse_move(&mut self, x: f64, y: f64) {
        self.mouse_position = (x, y);
    }

    /// Process raw mouse delta (device motion)
    pub fn process_mouse_raw_delta(&mut self, dx: f64, dy: f64) {
        self.raw_mouse_delta.0 += dx;
        self.raw_mouse_delta.1 += dy;
    }

    pub fn process_scroll(&mut self, lines: f32) {
        self.scroll_delta += lines;
    }

    /// Forget held keys, e.g. when the window loses focus
    pub fn release_all(&mut self) {
        self.keys_just_released.extend(self.keys_down.drain());
    }

    /// Call at end of frame to clear per-frame state
    pub fn end_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.keys_just_released.clear();
        self.raw_mouse_delta = (0.0, 0.0);
        self.scroll_delta = 0.0;
    }

    // --- Query methods ---

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    /// Is any key bound to the action held?
    pub fn is_action_pressed(&self, action: Action) -> bool {
        self.bindings(action).iter().any(|k| self.keys_down.contains(k))
    }

    /// Was any key bound to the action pressed this frame?
    pub fn is_action_just_pressed(&self, action: Action) -> bool {
        self.bindings(action)
            .iter()
            .any(|k| self.keys_just_pressed.contains(k))
    }

    pub fn raw_mouse_delta(&self) -> (f64, f64) {
        self.raw_mouse_delta
    }

    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }
}
