use cgmath::Vector3;

use crate::render::{RenderBackend, Uniform};

/// A directional light with Phong colour terms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
}

impl DirectionalLight {
    pub fn new(
        direction: Vector3<f32>,
        ambient: Vector3<f32>,
        diffuse: Vector3<f32>,
        specular: Vector3<f32>,
    ) -> Self {
        Self {
            direction,
            ambient,
            diffuse,
            specular,
        }
    }

    /// Daylight used for everything outside a room.
    pub fn outdoor() -> Self {
        Self::new(
            Vector3::new(0.5, 0.5, -0.1),
            Vector3::new(0.6, 0.6, 0.6),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.1, 0.1, 0.1),
        )
    }

    /// Sends the light as the struct uniform `prefix` (e.g. `"sectorLights[2]"`).
    pub fn send(&self, prefix: &str, backend: &mut dyn RenderBackend) {
        backend.set_uniform(&format!("{}.direction", prefix), Uniform::Vec3(self.direction));
        backend.set_uniform(&format!("{}.ambient", prefix), Uniform::Vec3(self.ambient));
        backend.set_uniform(&format!("{}.diffuse", prefix), Uniform::Vec3(self.diffuse));
        backend.set_uniform(&format!("{}.specular", prefix), Uniform::Vec3(self.specular));
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::outdoor()
    }
}
