//! First-person fly camera driven by WASD, mouse look and scroll zoom

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

const PITCH_LIMIT: f32 = 89.0;
const ZOOM_MIN: f32 = 1.0;
const ZOOM_MAX: f32 = 45.0;

/// Euler-angle camera. Yaw and pitch are in degrees; `zoom` is the vertical field of view.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub world_up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            movement_speed: 2.5,
            mouse_sensitivity: 0.1,
            zoom: ZOOM_MAX,
            near: 0.1,
            far: 100.0,
        };
        camera.update_vectors();
        camera
    }
}

impl FlyCamera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view_matrix()
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Apply a mouse delta in pixels. Screen y grows downwards.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32, constrain_pitch: bool) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch -= dy * self.mouse_sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    pub fn process_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Point the camera along `front`, re-deriving yaw and pitch.
    ///
    /// A unit-length `front` is stored as given so persisted values survive a
    /// reload unchanged. A zero vector leaves the orientation untouched.
    pub fn set_front(&mut self, front: Vec3) {
        let front = if front.is_normalized() {
            front
        } else {
            match front.try_normalize() {
                Some(front) => front,
                None => return,
            }
        };
        self.pitch = front.y.clamp(-1.0, 1.0).asin().to_degrees();
        self.yaw = front.z.atan2(front.x).to_degrees();
        self.front = front;
        self.right = front.cross(self.world_up).try_normalize().unwrap_or(self.right);
        self.up = self.right.cross(front).normalize();
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn default_looks_down_negative_z() {
        let camera = FlyCamera::default();
        assert!(close(camera.front, Vec3::NEG_Z));
        assert!(close(camera.right, Vec3::X));
    }

    #[test]
    fn keyboard_moves_along_front() {
        let mut camera = FlyCamera::default();
        camera.process_keyboard(CameraMovement::Forward, 1.0);
        assert!(close(camera.position, Vec3::new(0.0, 0.0, 0.5)));
        camera.process_keyboard(CameraMovement::Right, 2.0);
        assert!(close(camera.position, Vec3::new(5.0, 0.0, 0.5)));
    }

    #[test]
    fn pitch_is_constrained() {
        let mut camera = FlyCamera::default();
        camera.process_mouse_movement(0.0, -10_000.0, true);
        assert_eq!(camera.pitch, 89.0);
        camera.process_mouse_movement(0.0, 10_000.0, true);
        assert_eq!(camera.pitch, -89.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = FlyCamera::default();
        camera.process_scroll(100.0);
        assert_eq!(camera.zoom, 1.0);
        camera.process_scroll(-100.0);
        assert_eq!(camera.zoom, 45.0);
    }

    #[test]
    fn set_front_recovers_angles() {
        let mut camera = FlyCamera::default();
        camera.yaw = 30.0;
        camera.pitch = -20.0;
        camera.update_vectors();
        let front = camera.front;

        let mut restored = FlyCamera::default();
        restored.set_front(front);
        assert!((restored.yaw - 30.0).abs() < 1e-3);
        assert!((restored.pitch + 20.0).abs() < 1e-3);
        assert!(close(restored.front, front));
    }

    #[test]
    fn set_front_ignores_zero() {
        let mut camera = FlyCamera::default();
        camera.set_front(Vec3::ZERO);
        assert!(close(camera.front, Vec3::NEG_Z));
    }
}
