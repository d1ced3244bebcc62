//! CPU lightmaps: one float per texel naming the light that covers it.
//!
//! `0.0` means no light source (outdoor for the room map); any other value is
//! an index into the light uniform array the map was generated with.

use image::{GrayImage, Luma};

use crate::render::{TextureDesc, TextureFormat};

#[derive(Clone, Debug, PartialEq)]
pub struct Lightmap {
    width: u32,
    height: u32,
    texels: Vec<f32>,
}

impl Lightmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn from_texels(width: u32, height: u32, texels: Vec<f32>) -> Self {
        assert_eq!(texels.len(), width as usize * height as usize, "lightmap texel count");
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[f32] {
        &self.texels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.texels[(y * self.width + x) as usize])
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        if x < self.width && y < self.height {
            self.texels[(y * self.width + x) as usize] = value;
        }
    }

    /// Copies `source` with its top-left corner at `(x, y)`, clipping at the edges.
    pub fn blit(&mut self, source: &Lightmap, x: u32, y: u32) {
        for sy in 0..source.height {
            for sx in 0..source.width {
                if let Some(value) = source.get(sx, sy) {
                    self.set(x + sx, y + sy, value);
                }
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn texture_desc(&self, label: impl Into<String>) -> TextureDesc {
        TextureDesc {
            label: label.into(),
            width: self.width,
            height: self.height,
            format: TextureFormat::R32Float,
            data: self.as_bytes().to_vec(),
        }
    }

    /// Greyscale preview with every distinct light index spread over 0..255.
    pub fn to_image(&self) -> GrayImage {
        let max = self.texels.iter().copied().fold(0.0f32, f32::max);
        let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let value = self.texels[(y * self.width + x) as usize];
            Luma([(value * scale).round() as u8])
        })
    }
}
