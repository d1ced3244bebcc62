//! The render seam.
//!
//! Scene nodes, materials and the illuminators never talk to the GPU directly.
//! They describe what they need (a shader, named uniforms, textures bound to
//! units, an element draw) through a [`RenderBackend`], which is implemented
//! over wgpu by [`crate::pipelines::backend::WgpuBackend`] and by a recording
//! double in the integration tests.
//!
//! # Key types
//!
//! - [`Uniform`] is a value addressed by its shader name (`"model"`, `"sectors[0].origin"`, ...)
//! - [`TextureHandle`] identifies a texture created through the backend
//! - [`TextureUnit`] is a bind slot handed out by the bounded [`TextureUnitPool`]
//!

use std::sync::{Arc, Mutex, PoisonError};

use cgmath::{Matrix4, Vector2, Vector3};

use crate::data_structures::{material::Shader, mesh::Mesh};

/// A shader uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Uniform {
    Float(f32),
    Int(i32),
    Vec2(Vector2<f32>),
    Vec3(Vector3<f32>),
    UVec2(Vector2<u32>),
    Mat4(Matrix4<f32>),
}

impl From<f32> for Uniform {
    fn from(value: f32) -> Self {
        Uniform::Float(value)
    }
}

impl From<i32> for Uniform {
    fn from(value: i32) -> Self {
        Uniform::Int(value)
    }
}

impl From<Vector2<f32>> for Uniform {
    fn from(value: Vector2<f32>) -> Self {
        Uniform::Vec2(value)
    }
}

impl From<Vector3<f32>> for Uniform {
    fn from(value: Vector3<f32>) -> Self {
        Uniform::Vec3(value)
    }
}

impl From<Vector2<u32>> for Uniform {
    fn from(value: Vector2<u32>) -> Self {
        Uniform::UVec2(value)
    }
}

impl From<Matrix4<f32>> for Uniform {
    fn from(value: Matrix4<f32>) -> Self {
        Uniform::Mat4(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureUnit(pub u32);

impl TextureUnit {
    /// Value to hand to a sampler uniform.
    pub fn as_uniform(self) -> Uniform {
        Uniform::Int(self.0 as i32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    /// Single channel float; lightmaps store light indices in it.
    R32Float,
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TextureFormat::R32Float | TextureFormat::Rgba8 => 4,
        }
    }
}

/// Everything needed to create a 2D texture with initial contents.
#[derive(Clone, Debug)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

/**
 * The operations the scene graph and the lighting code need from a GPU API.
 *
 * Implementations are only ever driven from the render thread. Uniform uploads
 * target the shader selected by the last `use_shader` call.
 */
pub trait RenderBackend {
    fn use_shader(&mut self, shader: &Shader);
    fn set_uniform(&mut self, name: &str, value: Uniform);
    fn create_texture(&mut self, desc: &TextureDesc) -> anyhow::Result<TextureHandle>;
    fn destroy_texture(&mut self, handle: TextureHandle);
    fn bind_texture(&mut self, unit: TextureUnit, handle: TextureHandle);
    fn draw_elements(&mut self, mesh: &Mesh);
}

/**
 * A bounded pool of texture units with paired acquire/release.
 *
 * Clones share the same pool. Units below `reserved` are never handed out.
 */
#[derive(Clone, Debug)]
pub struct TextureUnitPool {
    free: Arc<Mutex<Vec<u32>>>,
}

impl TextureUnitPool {
    pub fn new(capacity: u32, reserved: u32) -> Self {
        // Reversed so that `pop` yields the lowest unit first.
        let free = (reserved..capacity).rev().collect();
        Self {
            free: Arc::new(Mutex::new(free)),
        }
    }

    pub fn acquire(&self) -> Option<TextureUnit> {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .map(TextureUnit)
    }

    pub fn release(&self, unit: TextureUnit) {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.contains(&unit.0) {
            log::warn!("texture unit {} released twice", unit.0);
            return;
        }
        free.push(unit.0);
        free.sort_unstable_by(|a, b| b.cmp(a));
    }

    pub fn available(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
