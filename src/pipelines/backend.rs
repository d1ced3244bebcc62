//! [`RenderBackend`] over wgpu.
//!
//! Uniform uploads land in a CPU side [`UniformBlock`] and are flushed once per
//! frame. Draw calls are recorded together with the model matrix and texture
//! bindings that were current when they were issued, then replayed into a
//! render pass by [`WgpuBackend::encode`], which turns each draw's texture
//! bindings into a texture unit bind group.

use std::{collections::HashMap, sync::Arc};

use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        material::Shader,
        mesh::{Mesh, MeshBuffers},
        texture::Texture,
    },
    pipelines::{
        engine_uniform_layout,
        texture_units::TextureUnitBindings,
        uniforms::{UniformBlock, UniformLayout},
    },
    render::{RenderBackend, TextureDesc, TextureHandle, TextureUnit, Uniform},
};

/// A draw as it was issued, with the state it depends on.
#[derive(Clone, Debug)]
pub struct DrawCall {
    pub shader: Option<Shader>,
    pub model: Matrix4<f32>,
    pub textures: Vec<(TextureUnit, TextureHandle)>,
    pub buffers: Arc<MeshBuffers>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    uniforms: UniformBlock,
    units: TextureUnitBindings,
    textures: HashMap<TextureHandle, Texture>,
    bound: HashMap<TextureUnit, TextureHandle>,
    shader: Option<Shader>,
    model: Matrix4<f32>,
    draws: Vec<DrawCall>,
    next_handle: u64,
}

impl WgpuBackend {
    pub fn new(ctx: &Context) -> anyhow::Result<Self> {
        Self::with_layout(ctx, engine_uniform_layout())
    }

    pub fn with_layout(ctx: &Context, layout: UniformLayout) -> anyhow::Result<Self> {
        let uniforms = UniformBlock::new(&ctx.device, Arc::new(layout), "engine");
        let units = TextureUnitBindings::new(&ctx.device, &ctx.queue)?;
        Ok(Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            uniforms,
            units,
            textures: HashMap::new(),
            bound: HashMap::new(),
            shader: None,
            model: Matrix4::identity(),
            draws: Vec::new(),
            next_handle: 1,
        })
    }

    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    /// Group 1 layout for [`mk_lit_pipeline`](crate::pipelines::lit::mk_lit_pipeline).
    pub fn texture_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.units.layout
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(&handle)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn bound_texture(&self, unit: TextureUnit) -> Option<&Texture> {
        self.bound.get(&unit).and_then(|handle| self.textures.get(handle))
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Writes the uniform block to the GPU and hands over this frame's draws.
    pub fn finish_frame(&mut self) -> Vec<DrawCall> {
        self.uniforms.write_to_buffer(&self.queue);
        std::mem::take(&mut self.draws)
    }

    /**
     * Replays `draws` into `render_pass` with `pipeline` bound.
     *
     * Model matrices go into a single instance buffer (slot 1) and every draw
     * uses its own instance index. The engine uniform block sits in group 0,
     * the textures bound when the draw was issued in group 1. Consecutive
     * draws with the same bindings share a bind group.
     */
    pub fn encode<'pass>(
        &self,
        render_pass: &mut wgpu::RenderPass<'pass>,
        pipeline: &wgpu::RenderPipeline,
        draws: &[DrawCall],
    ) -> Option<wgpu::Buffer> {
        if draws.is_empty() {
            return None;
        }

        let instances = draws
            .iter()
            .map(|draw| InstanceRaw::from_matrix(draw.model))
            .collect::<Vec<_>>();
        let instance_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Draw Instance Buffer"),
                contents: bytemuck::cast_slice(&instances),
                usage: wgpu::BufferUsages::VERTEX,
            });

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.uniforms.bind_group, &[]);
        render_pass.set_vertex_buffer(1, instance_buffer.slice(..));
        let mut current: Option<&[(TextureUnit, TextureHandle)]> = None;
        for (index, draw) in draws.iter().enumerate() {
            let index = index as u32;
            if current != Some(draw.textures.as_slice()) {
                let bind_group = self.units.bind_group(&self.device, &self.textures, &draw.textures);
                render_pass.set_bind_group(1, &bind_group, &[]);
                current = Some(draw.textures.as_slice());
            }
            render_pass.set_vertex_buffer(0, draw.buffers.vertex_buffer.slice(..));
            render_pass.set_index_buffer(draw.buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..draw.buffers.num_elements, 0, index..index + 1);
        }
        Some(instance_buffer)
    }
}

impl RenderBackend for WgpuBackend {
    fn use_shader(&mut self, shader: &Shader) {
        self.shader = Some(shader.clone());
    }

    fn set_uniform(&mut self, name: &str, value: Uniform) {
        if name == "model" {
            if let Uniform::Mat4(model) = value {
                self.model = model;
            }
        }
        self.uniforms.data.set(name, value);
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> anyhow::Result<TextureHandle> {
        let texture = Texture::from_desc(&self.device, &self.queue, desc)?;
        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;
        self.textures.insert(handle, texture);
        log::debug!("created texture {} ({}x{})", desc.label, desc.width, desc.height);
        Ok(handle)
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        if let Some(texture) = self.textures.remove(&handle) {
            texture.texture.destroy();
        }
        self.bound.retain(|_, bound| *bound != handle);
    }

    fn bind_texture(&mut self, unit: TextureUnit, handle: TextureHandle) {
        if !self.textures.contains_key(&handle) {
            log::warn!("binding unknown texture {:?} to unit {}", handle, unit.0);
        }
        self.bound.insert(unit, handle);
    }

    fn draw_elements(&mut self, mesh: &Mesh) {
        if mesh.indices.is_empty() {
            return;
        }
        let mut textures = self
            .bound
            .iter()
            .map(|(unit, handle)| (*unit, *handle))
            .collect::<Vec<_>>();
        textures.sort();
        self.draws.push(DrawCall {
            shader: self.shader.clone(),
            model: self.model,
            textures,
            buffers: mesh.buffers(&self.device),
        });
    }
}
