//! Position, scale and rotation with a lazily recomputed model matrix.

use std::ops::Mul;

use cgmath::{InnerSpace, Matrix4, One, Quaternion, Vector3, VectorSpace};

use crate::render::{RenderBackend, Uniform};

/// A transform whose matrix is cached until one of its components changes.
///
/// The matrix is `translation * rotation * scale`. Composition with a parent
/// happens at send time only and is never stored.
#[derive(Clone, Debug)]
pub struct Transform {
    position: Vector3<f32>,
    scale: Vector3<f32>,
    rotation: Quaternion<f32>,
    result: Matrix4<f32>,
    dirty: bool,
}

impl Transform {
    pub fn new(position: Vector3<f32>, scale: Vector3<f32>, rotation: Quaternion<f32>) -> Self {
        Self {
            position,
            scale,
            rotation,
            result: Matrix4::one(),
            dirty: true,
        }
    }

    /// Wraps an existing matrix. Its components stay at identity until a setter
    /// is called, after which the matrix is rebuilt from components.
    pub fn from_matrix(matrix: Matrix4<f32>) -> Self {
        Self {
            result: matrix,
            dirty: false,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.dirty = true;
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.dirty = true;
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quaternion<f32>) {
        self.rotation = rotation;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn recalculate(&mut self) {
        if self.dirty {
            self.result = Self::components_to_matrix(self.position, self.scale, self.rotation);
            self.dirty = false;
        }
    }

    pub fn matrix(&mut self) -> Matrix4<f32> {
        self.recalculate();
        self.result
    }

    /// Uploads `parent * matrix` as the `"model"` uniform of the bound shader.
    pub fn send(&mut self, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        self.recalculate();
        backend.set_uniform("model", Uniform::Mat4(parent * self.result));
    }

    /// Component-wise blend for frame interpolation: lerp for position and
    /// scale, slerp for rotation.
    pub fn interpolate(a: &Transform, b: &Transform, alpha: f32) -> Transform {
        Transform::new(
            a.position.lerp(b.position, alpha),
            a.scale.lerp(b.scale, alpha),
            a.rotation.normalize().slerp(b.rotation.normalize(), alpha),
        )
    }

    pub fn components_to_matrix(
        position: Vector3<f32>,
        scale: Vector3<f32>,
        rotation: Quaternion<f32>,
    ) -> Matrix4<f32> {
        Matrix4::from_translation(position)
            * Matrix4::from(rotation)
            * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: Quaternion::one(),
            result: Matrix4::one(),
            dirty: false,
        }
    }
}

/// Composes the components of a parent with those of a child. Exact for
/// uniform scales; non-uniform parent scale is applied per axis before rotation.
impl<'a, 'b> Mul<&'b Transform> for &'a Transform {
    type Output = Transform;

    fn mul(self, rhs: &'b Transform) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Transform::new(new_position, new_scale, new_rotation)
    }
}
