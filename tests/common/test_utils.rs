#![allow(dead_code)]

use std::collections::HashMap;

use cgmath::Matrix4;
use lot_ngin::{
    data_structures::{material::Shader, mesh::Mesh},
    render::{RenderBackend, TextureDesc, TextureHandle, TextureUnit, Uniform},
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One recorded `draw_elements` call.
#[derive(Clone, Debug)]
pub struct RecordedDraw {
    pub shader: Option<String>,
    pub mesh: String,
    pub model: Option<Matrix4<f32>>,
    pub triangles: usize,
}

/**
 * A `RenderBackend` that records every call instead of talking to a GPU.
 *
 * Uniforms keep their last value and a log of every upload so tests can check
 * both the final state and how often something was sent.
 */
#[derive(Default)]
pub struct RecordingBackend {
    shader: Option<String>,
    uniforms: HashMap<String, Uniform>,
    pub uniform_log: Vec<(String, Uniform)>,
    pub textures: HashMap<TextureHandle, TextureDesc>,
    pub destroyed: Vec<TextureHandle>,
    pub bound: HashMap<TextureUnit, TextureHandle>,
    pub draws: Vec<RecordedDraw>,
    /// Labels for which `create_texture` fails.
    pub rejected_labels: Vec<String>,
    next_handle: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uniform(&self, name: &str) -> Option<Uniform> {
        self.uniforms.get(name).copied()
    }

    pub fn sent_count(&self, name: &str) -> usize {
        self.uniform_log.iter().filter(|(sent, _)| sent == name).count()
    }

    pub fn bound_to(&self, sampler: &str) -> Option<&TextureDesc> {
        let Some(Uniform::Int(unit)) = self.uniform(sampler) else {
            return None;
        };
        let handle = self.bound.get(&TextureUnit(unit as u32))?;
        self.textures.get(handle)
    }

    pub fn clear_log(&mut self) {
        self.uniform_log.clear();
        self.draws.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn use_shader(&mut self, shader: &Shader) {
        self.shader = Some(shader.name.clone());
    }

    fn set_uniform(&mut self, name: &str, value: Uniform) {
        self.uniforms.insert(name.to_string(), value);
        self.uniform_log.push((name.to_string(), value));
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> anyhow::Result<TextureHandle> {
        let expected = (desc.width * desc.height * desc.format.bytes_per_texel()) as usize;
        anyhow::ensure!(desc.data.len() == expected, "texture {} has the wrong size", desc.label);
        anyhow::ensure!(!self.rejected_labels.contains(&desc.label), "texture {} was rejected", desc.label);
        self.next_handle += 1;
        let handle = TextureHandle(self.next_handle);
        self.textures.insert(handle, desc.clone());
        Ok(handle)
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(&handle);
        self.bound.retain(|_, bound| *bound != handle);
        self.destroyed.push(handle);
    }

    fn bind_texture(&mut self, unit: TextureUnit, handle: TextureHandle) {
        self.bound.insert(unit, handle);
    }

    fn draw_elements(&mut self, mesh: &Mesh) {
        let model = match self.uniform("model") {
            Some(Uniform::Mat4(model)) => Some(model),
            _ => None,
        };
        self.draws.push(RecordedDraw {
            shader: self.shader.clone(),
            mesh: mesh.name.clone(),
            model,
            triangles: mesh.triangle_count(),
        });
    }
}
