//! Name-addressed uniform blocks.
//!
//! Shader code addresses uniforms by name (`"sectorLights[3].diffuse"`); wgpu
//! wants a flat buffer. A [`UniformLayout`] assigns each name an offset using
//! std140 alignment rules, [`UniformData`] is the CPU copy the backend writes
//! into, and [`UniformBlock`] pairs that copy with its GPU buffer.

use std::{collections::HashMap, sync::Arc};

use wgpu::util::DeviceExt;

use crate::render::Uniform;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    UVec2,
    Vec3,
    Mat4,
}

impl UniformKind {
    pub fn size(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 | UniformKind::UVec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Mat4 => 64,
        }
    }

    pub fn align(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 | UniformKind::UVec2 => 8,
            UniformKind::Vec3 | UniformKind::Mat4 => 16,
        }
    }

    pub fn of(value: &Uniform) -> Self {
        match value {
            Uniform::Float(_) => UniformKind::Float,
            Uniform::Int(_) => UniformKind::Int,
            Uniform::Vec2(_) => UniformKind::Vec2,
            Uniform::UVec2(_) => UniformKind::UVec2,
            Uniform::Vec3(_) => UniformKind::Vec3,
            Uniform::Mat4(_) => UniformKind::Mat4,
        }
    }
}

fn align_up(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformField {
    pub kind: UniformKind,
    pub offset: usize,
}

#[derive(Clone, Debug, Default)]
pub struct UniformLayout {
    fields: HashMap<String, UniformField>,
    size: usize,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, kind: UniformKind) -> Self {
        self.push(name.to_string(), kind);
        self
    }

    /// Appends `len` std140 struct elements named `prefix[i].field`.
    pub fn with_array(mut self, prefix: &str, fields: &[(&str, UniformKind)], len: usize) -> Self {
        for i in 0..len {
            self.size = align_up(self.size, 16);
            for (field, kind) in fields {
                self.push(format!("{prefix}[{i}].{field}"), *kind);
            }
            self.size = align_up(self.size, 16);
        }
        self
    }

    fn push(&mut self, name: String, kind: UniformKind) {
        let offset = align_up(self.size, kind.align());
        self.size = offset + kind.size();
        self.fields.insert(name, UniformField { kind, offset });
    }

    pub fn field(&self, name: &str) -> Option<UniformField> {
        self.fields.get(name).copied()
    }

    /// Buffer size, rounded up to a whole vec4.
    pub fn size(&self) -> usize {
        align_up(self.size.max(16), 16)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// CPU side copy of a uniform block.
#[derive(Clone, Debug)]
pub struct UniformData {
    layout: Arc<UniformLayout>,
    bytes: Vec<u8>,
}

impl UniformData {
    pub fn new(layout: Arc<UniformLayout>) -> Self {
        let bytes = vec![0; layout.size()];
        Self { layout, bytes }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Writes `value` at the offset of `name`. Returns `false` if the name is
    /// not part of the layout or the value has the wrong type.
    pub fn set(&mut self, name: &str, value: Uniform) -> bool {
        let Some(field) = self.layout.field(name) else {
            log::trace!("uniform {} is not part of the block", name);
            return false;
        };
        if field.kind != UniformKind::of(&value) {
            log::warn!(
                "uniform {} expects {:?} but got {:?}",
                name,
                field.kind,
                value
            );
            return false;
        }

        let target = &mut self.bytes[field.offset..field.offset + field.kind.size()];
        match value {
            Uniform::Float(v) => target.copy_from_slice(bytemuck::bytes_of(&v)),
            Uniform::Int(v) => target.copy_from_slice(bytemuck::bytes_of(&v)),
            Uniform::Vec2(v) => {
                let raw: [f32; 2] = v.into();
                target.copy_from_slice(bytemuck::cast_slice(&raw))
            }
            Uniform::UVec2(v) => {
                let raw: [u32; 2] = v.into();
                target.copy_from_slice(bytemuck::cast_slice(&raw))
            }
            Uniform::Vec3(v) => {
                let raw: [f32; 3] = v.into();
                target.copy_from_slice(bytemuck::cast_slice(&raw))
            }
            Uniform::Mat4(m) => {
                let raw: [[f32; 4]; 4] = m.into();
                target.copy_from_slice(bytemuck::cast_slice(&raw))
            }
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<Uniform> {
        let field = self.layout.field(name)?;
        let source = &self.bytes[field.offset..field.offset + field.kind.size()];
        let value = match field.kind {
            UniformKind::Float => Uniform::Float(bytemuck::pod_read_unaligned(source)),
            UniformKind::Int => Uniform::Int(bytemuck::pod_read_unaligned(source)),
            UniformKind::Vec2 => {
                Uniform::Vec2(bytemuck::pod_read_unaligned::<[f32; 2]>(source).into())
            }
            UniformKind::UVec2 => {
                Uniform::UVec2(bytemuck::pod_read_unaligned::<[u32; 2]>(source).into())
            }
            UniformKind::Vec3 => {
                Uniform::Vec3(bytemuck::pod_read_unaligned::<[f32; 3]>(source).into())
            }
            UniformKind::Mat4 => {
                Uniform::Mat4(bytemuck::pod_read_unaligned::<[[f32; 4]; 4]>(source).into())
            }
        };
        Some(value)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A uniform block and the GPU buffer it is flushed into.
#[derive(Debug)]
pub struct UniformBlock {
    pub data: UniformData,
    pub buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device, layout: Arc<UniformLayout>, label: &str) -> Self {
        let data = UniformData::new(layout);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Uniform Buffer", label)),
            contents: data.bytes(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some(&format!("{}_bind_group_layout", label)),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(&format!("{}_bind_group", label)),
        });

        Self {
            data,
            buffer,
            bind_group_layout,
            bind_group,
        }
    }

    pub fn write_to_buffer(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, self.data.bytes());
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Matrix4, Vector2, Vector3};

    use super::*;

    #[test]
    fn scalars_pack_tightly_and_vec3_aligns_to_16() {
        let layout = UniformLayout::new()
            .with("a", UniformKind::Float)
            .with("b", UniformKind::Int)
            .with("c", UniformKind::Vec3)
            .with("d", UniformKind::Vec2);
        assert_eq!(layout.field("a").unwrap().offset, 0);
        assert_eq!(layout.field("b").unwrap().offset, 4);
        assert_eq!(layout.field("c").unwrap().offset, 16);
        assert_eq!(layout.field("d").unwrap().offset, 32);
        assert_eq!(layout.size(), 48);
    }

    #[test]
    fn array_elements_start_on_16_byte_boundaries() {
        let layout = UniformLayout::new().with("x", UniformKind::Float).with_array(
            "sectors",
            &[("origin", UniformKind::Vec3), ("dimensions", UniformKind::UVec2)],
            2,
        );
        assert_eq!(layout.field("sectors[0].origin").unwrap().offset, 16);
        assert_eq!(layout.field("sectors[0].dimensions").unwrap().offset, 32);
        assert_eq!(layout.field("sectors[1].origin").unwrap().offset, 48);
        assert_eq!(layout.len(), 5);
    }

    #[test]
    fn values_round_trip_through_bytes() {
        let layout = Arc::new(
            UniformLayout::new()
                .with("model", UniformKind::Mat4)
                .with("light", UniformKind::Vec3)
                .with("dims", UniformKind::UVec2),
        );
        let mut data = UniformData::new(layout);
        let model = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        assert!(data.set("model", Uniform::Mat4(model)));
        assert!(data.set("light", Uniform::Vec3(Vector3::new(0.5, 0.25, -1.0))));
        assert!(data.set("dims", Uniform::UVec2(Vector2::new(7, 9))));
        assert_eq!(data.get("model"), Some(Uniform::Mat4(model)));
        assert_eq!(data.get("light"), Some(Uniform::Vec3(Vector3::new(0.5, 0.25, -1.0))));
        assert_eq!(data.get("dims"), Some(Uniform::UVec2(Vector2::new(7, 9))));
    }

    #[test]
    fn unknown_names_and_kind_mismatches_are_ignored() {
        let layout = Arc::new(UniformLayout::new().with("f", UniformKind::Float));
        let mut data = UniformData::new(layout);
        assert!(!data.set("g", Uniform::Float(1.0)));
        assert!(!data.set("f", Uniform::Int(1)));
        assert_eq!(data.get("f"), Some(Uniform::Float(0.0)));
    }
}
