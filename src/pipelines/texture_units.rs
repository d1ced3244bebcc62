//! Texture units as a wgpu bind group.
//!
//! Group 1 of the lit pipeline mirrors the [`TextureUnitPool`](crate::render::TextureUnitPool):
//! binding 0 is a filtering sampler, binding 1 a non-filtering one, and the
//! texture bound to unit `u` sits at binding `2 + u`. Unit 0 carries material
//! colour and is filterable; every other unit holds light indices and is read
//! with nearest filtering.

use std::collections::HashMap;

use crate::{
    data_structures::{
        material::DIFFUSE_UNIT,
        texture::{Texture, create_default_sampler, create_nearest_sampler},
    },
    pipelines::TEXTURE_UNITS,
    render::{TextureDesc, TextureFormat, TextureHandle, TextureUnit},
};

pub const COLOR_SAMPLER_BINDING: u32 = 0;
pub const MAP_SAMPLER_BINDING: u32 = 1;

pub fn texture_binding(unit: TextureUnit) -> u32 {
    2 + unit.0
}

pub fn mk_texture_unit_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries = vec![
        wgpu::BindGroupLayoutEntry {
            binding: COLOR_SAMPLER_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: MAP_SAMPLER_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
            count: None,
        },
    ];
    for unit in (0..TEXTURE_UNITS).map(TextureUnit) {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture_binding(unit),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float {
                    filterable: unit == DIFFUSE_UNIT,
                },
            },
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("texture_unit_bind_group_layout"),
    })
}

/// Layout, samplers and the placeholders used for units nothing is bound to.
pub struct TextureUnitBindings {
    pub layout: wgpu::BindGroupLayout,
    color_sampler: wgpu::Sampler,
    map_sampler: wgpu::Sampler,
    blank_color: Texture,
    blank_map: Texture,
}

impl TextureUnitBindings {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> anyhow::Result<Self> {
        let blank_color = Texture::from_desc(
            device,
            queue,
            &TextureDesc {
                label: "blank colour".to_string(),
                width: 1,
                height: 1,
                format: TextureFormat::Rgba8,
                data: vec![255; 4],
            },
        )?;
        let blank_map = Texture::from_desc(
            device,
            queue,
            &TextureDesc {
                label: "blank map".to_string(),
                width: 1,
                height: 1,
                format: TextureFormat::R32Float,
                data: vec![0; 4],
            },
        )?;
        Ok(Self {
            layout: mk_texture_unit_layout(device),
            color_sampler: create_default_sampler(device),
            map_sampler: create_nearest_sampler(device),
            blank_color,
            blank_map,
        })
    }

    fn blank(&self, unit: TextureUnit) -> &Texture {
        if unit == DIFFUSE_UNIT {
            &self.blank_color
        } else {
            &self.blank_map
        }
    }

    /**
     * Builds group 1 for one draw.
     *
     * Units without a texture, units outside the layout and light maps bound
     * to the colour unit fall back to a blank texture of the right kind.
     */
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        textures: &HashMap<TextureHandle, Texture>,
        bound: &[(TextureUnit, TextureHandle)],
    ) -> wgpu::BindGroup {
        let mut views = (0..TEXTURE_UNITS)
            .map(|unit| &self.blank(TextureUnit(unit)).view)
            .collect::<Vec<_>>();
        for (unit, handle) in bound {
            let Some(texture) = textures.get(handle) else {
                continue;
            };
            if unit.0 >= TEXTURE_UNITS {
                log::warn!("texture unit {} is outside the bind group; ignored", unit.0);
                continue;
            }
            if *unit == DIFFUSE_UNIT && texture.format != TextureFormat::Rgba8 {
                log::warn!("{:?} texture cannot be filtered on the colour unit; ignored", texture.format);
                continue;
            }
            views[unit.0 as usize] = &texture.view;
        }

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: COLOR_SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.color_sampler),
            },
            wgpu::BindGroupEntry {
                binding: MAP_SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.map_sampler),
            },
        ];
        entries.extend(views.into_iter().enumerate().map(|(unit, view)| wgpu::BindGroupEntry {
            binding: texture_binding(TextureUnit(unit as u32)),
            resource: wgpu::BindingResource::TextureView(view),
        }));

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.layout,
            entries: &entries,
            label: Some("texture_unit_bind_group"),
        })
    }
}
