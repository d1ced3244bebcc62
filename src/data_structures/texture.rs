//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU GPU texture resources,
//! helpers to create textures from [`TextureDesc`]s or images, and a read back
//! path used to verify uploaded lightmaps.

use anyhow::*;
use image::GenericImageView;

use crate::render::{TextureDesc, TextureFormat};

/// Row pitch wgpu requires for buffer <-> texture copies.
const COPY_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
    pub format: TextureFormat,
}

impl Texture {
    fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
        match format {
            TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
            TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }

    /// Create and fill a texture. Lightmaps (`R32Float`) hold light indices and
    /// are sampled with nearest filtering so indices are never blended.
    pub fn from_desc(device: &wgpu::Device, queue: &wgpu::Queue, desc: &TextureDesc) -> Result<Self> {
        let expected = desc.width as usize * desc.height as usize * desc.format.bytes_per_texel() as usize;
        ensure!(
            desc.data.len() == expected,
            "texture {} expects {} bytes of data, got {}",
            desc.label,
            expected,
            desc.data.len()
        );
        ensure!(desc.width > 0 && desc.height > 0, "texture {} is empty", desc.label);

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let format = Self::wgpu_format(desc.format);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &desc.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.format.bytes_per_texel() * desc.width),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(match desc.format {
            TextureFormat::R32Float => create_nearest_sampler(device),
            TextureFormat::Rgba8 => create_default_sampler(device),
        });

        Ok(Self {
            texture,
            view,
            sampler,
            format: desc.format,
        })
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: &str,
    ) -> Result<Self> {
        let dimensions = img.dimensions();
        let desc = TextureDesc {
            label: label.to_string(),
            width: dimensions.0,
            height: dimensions.1,
            format: TextureFormat::Rgba8,
            data: img.to_rgba8().into_raw(),
        };
        Self::from_desc(device, queue, &desc)
    }

    /// An offscreen colour target that can be read back with [`read_back`](Self::read_back).
    pub fn render_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::wgpu_format(TextureFormat::Rgba8),
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: None,
            format: TextureFormat::Rgba8,
        }
    }

    pub fn wgpu_texture_format(&self) -> wgpu::TextureFormat {
        Self::wgpu_format(self.format)
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    /**
     * Copies the texture back into CPU memory, tightly packed.
     *
     * wgpu pads every row of a texture-to-buffer copy to 256 bytes, so the
     * staging buffer is padded and the padding is stripped after mapping.
     */
    pub async fn read_back(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<u8>> {
        let (width, height) = (self.width(), self.height());
        let unpadded_bytes_per_row = self.format.bytes_per_texel() * width;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(COPY_ALIGNMENT) * COPY_ALIGNMENT;

        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("texture read back buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("texture read back encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            self.texture.size(),
        );
        queue.submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(std::time::Duration::from_secs(3)),
        })?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow!("read back channel closed"))??;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in data.chunks(padded_bytes_per_row as usize) {
            pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
        }
        drop(data);
        output_buffer.unmap();

        Ok(pixels)
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

pub fn create_nearest_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
