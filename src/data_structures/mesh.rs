//! CPU meshes and their lazily uploaded GPU buffers.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use wgpu::util::DeviceExt;

/// Types that describe their own layout in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl TexturedVertex {
    pub fn new(
        position: cgmath::Vector3<f32>,
        normal: cgmath::Vector3<f32>,
        tex_coords: cgmath::Vector2<f32>,
    ) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
            tex_coords: tex_coords.into(),
        }
    }

    /// Bitwise identity, so `-0.0` and `0.0` are distinct vertices.
    fn key(&self) -> [u32; 8] {
        let mut key = [0; 8];
        let floats = self
            .position
            .iter()
            .chain(self.normal.iter())
            .chain(self.tex_coords.iter());
        for (slot, value) in key.iter_mut().zip(floats) {
            *slot = value.to_bits();
        }
        key
    }
}

impl Vertex for TexturedVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<TexturedVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[derive(Debug)]
pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

/// An indexed triangle list. GPU buffers are created on first use and shared
/// by every model that references the mesh.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<TexturedVertex>,
    pub indices: Vec<u32>,
    buffers: OnceLock<Arc<MeshBuffers>>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, vertices: Vec<TexturedVertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            buffers: OnceLock::new(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn buffers(&self, device: &wgpu::Device) -> Arc<MeshBuffers> {
        self.buffers
            .get_or_init(|| {
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Vertex Buffer", self.name)),
                    contents: bytemuck::cast_slice(&self.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });

                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Index Buffer", self.name)),
                    contents: bytemuck::cast_slice(&self.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });

                Arc::new(MeshBuffers {
                    vertex_buffer,
                    index_buffer,
                    num_elements: self.indices.len() as u32,
                })
            })
            .clone()
    }
}

/**
 * Builds an indexed triangle list from loose triangles, reusing the index of
 * any vertex that was already emitted with identical attributes.
 */
#[derive(Debug, Default)]
pub struct FaceMeshGenerator {
    vertices: Vec<TexturedVertex>,
    indices: Vec<u32>,
    lookup: HashMap<[u32; 8], u32>,
}

impl FaceMeshGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&mut self, vertex: TexturedVertex) -> u32 {
        let next = self.vertices.len() as u32;
        let index = *self.lookup.entry(vertex.key()).or_insert(next);
        if index == next {
            self.vertices.push(vertex);
        }
        index
    }

    pub fn add_triangle(&mut self, triangle: [TexturedVertex; 3]) {
        for vertex in triangle {
            let index = self.index_of(vertex);
            self.indices.push(index);
        }
    }

    /// Adds two triangles given as six vertices.
    pub fn add_plane(&mut self, plane: [TexturedVertex; 6]) {
        self.add_triangle([plane[0], plane[1], plane[2]]);
        self.add_triangle([plane[3], plane[4], plane[5]]);
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn generate(self, name: impl Into<String>) -> Mesh {
        Mesh::new(name, self.vertices, self.indices)
    }
}
