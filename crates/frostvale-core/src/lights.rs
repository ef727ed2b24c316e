//! Scene lights: one directional light and a small set of point lights

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Upper bound on point lights uploaded to the shading stage.
pub const MAX_POINT_LIGHTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for DirLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -5.0, 0.0),
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.1),
            specular: Vec3::splat(0.1),
        }
    }
}

/// Circular path in the XZ plane: `(r cos t, h, r sin t)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub radius: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub orbit: Option<Orbit>,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(4.0, 4.0, 0.0),
            ambient: Vec3::new(1.0, 0.45, 0.0),
            diffuse: Vec3::new(1.0, 0.45, 0.3),
            specular: Vec3::new(1.0, 0.45, 0.4),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            orbit: None,
        }
    }
}

impl PointLight {
    /// Move an orbiting light to its position at `time` seconds.
    pub fn animate(&mut self, time: f32) {
        if let Some(orbit) = self.orbit {
            self.position = Vec3::new(orbit.radius * time.cos(), orbit.height, orbit.radius * time.sin());
        }
    }

    pub fn set_attenuation_coefficients(&mut self, [constant, linear, quadratic]: [f32; 3]) {
        self.constant = constant;
        self.linear = linear;
        self.quadratic = quadratic;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLights {
    pub directional: DirLight,
    #[serde(rename = "point")]
    pub points: Vec<PointLight>,
}

impl Default for SceneLights {
    /// The village setup: dim moonlight and one warm light circling the houses.
    fn default() -> Self {
        Self {
            directional: DirLight::default(),
            points: vec![PointLight {
                orbit: Some(Orbit {
                    radius: 4.0,
                    height: 4.0,
                }),
                ..Default::default()
            }],
        }
    }
}

impl SceneLights {
    pub fn animate(&mut self, time: f32) {
        for light in &mut self.points {
            light.animate(time);
        }
    }

    /// Point lights that fit in the uniform block.
    pub fn active_points(&self) -> &[PointLight] {
        let n = self.points.len().min(MAX_POINT_LIGHTS);
        &self.points[..n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_follows_circle() {
        let mut lights = SceneLights::default();
        lights.animate(0.0);
        assert!((lights.points[0].position - Vec3::new(4.0, 4.0, 0.0)).length() < 1e-5);
        lights.animate(std::f32::consts::FRAC_PI_2);
        assert!((lights.points[0].position - Vec3::new(0.0, 4.0, 4.0)).length() < 1e-5);
    }

    #[test]
    fn static_light_does_not_move() {
        let mut light = PointLight::default();
        let before = light.position;
        light.animate(12.0);
        assert_eq!(light.position, before);
    }

    #[test]
    fn attenuation_coefficients_replace_all_three_terms() {
        let mut light = PointLight::default();
        light.set_attenuation_coefficients([2.0, 0.5, 0.25]);
        assert_eq!(light.constant, 2.0);
        assert_eq!(light.linear, 0.5);
        assert_eq!(light.quadratic, 0.25);
    }

    #[test]
    fn active_points_capped() {
        let lights = SceneLights {
            points: vec![PointLight::default(); MAX_POINT_LIGHTS + 2],
            ..Default::default()
        };
        assert_eq!(lights.active_points().len(), MAX_POINT_LIGHTS);
    }

    #[test]
    fn parses_from_toml() {
        let src = r#"
            [directional]
            direction = [0.0, -1.0, 0.0]

            [[point]]
            position = [1.0, 2.0, 3.0]
            linear = 0.5
            orbit = { radius = 2.0, height = 1.0 }
        "#;
        let lights: SceneLights = toml::from_str(src).unwrap();
        assert_eq!(lights.directional.direction, Vec3::NEG_Y);
        assert_eq!(lights.directional.ambient, Vec3::splat(0.05));
        assert_eq!(lights.points.len(), 1);
        assert_eq!(lights.points[0].linear, 0.5);
        assert_eq!(lights.points[0].constant, 1.0);
        assert!(lights.points[0].orbit.is_some());
    }
}
