//! Texture atlas for wallpapers.
//!
//! Images are registered under an id, packed onto one board with
//! [`pack_cells`] and addressed afterwards by normalized UV rectangles.

use std::{collections::HashMap, sync::Arc};

use cgmath::Vector2;
use image::RgbaImage;

use crate::data_structures::packing::{BoundedObject, pack_cells};

/// UV bounds of one packed image.
///
/// `lower_corner` is the bottom-left of the image in UV space (v grows
/// downwards on the board), `upper_corner` the top-right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRegion {
    pub lower_corner: Vector2<f32>,
    pub upper_corner: Vector2<f32>,
}

impl AtlasRegion {
    fn from_cell(x: u32, y: u32, width: u32, height: u32, board: (u32, u32)) -> Self {
        let (board_w, board_h) = (board.0 as f32, board.1 as f32);
        Self {
            lower_corner: Vector2::new(x as f32 / board_w, (y + height) as f32 / board_h),
            upper_corner: Vector2::new((x + width) as f32 / board_w, y as f32 / board_h),
        }
    }
}

#[derive(Debug, Default)]
pub struct TextureAtlas {
    pending: Vec<(String, Arc<RgbaImage>)>,
    known: HashMap<String, usize>,
    regions: HashMap<String, AtlasRegion>,
    image: Option<RgbaImage>,
}

impl TextureAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an image under `id`. Registering an id twice keeps the first image.
    pub fn add_texture(&mut self, id: &str, image: Arc<RgbaImage>) -> bool {
        if self.known.contains_key(id) {
            return false;
        }
        self.known.insert(id.to_string(), self.pending.len());
        self.pending.push((id.to_string(), image));
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.known.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Packs every registered image onto one board, replacing earlier results.
    pub fn pack(&mut self, min_width: u32, min_height: u32) -> &RgbaImage {
        let objects = self
            .pending
            .iter()
            .enumerate()
            .map(|(index, (_, image))| BoundedObject {
                width: image.width(),
                height: image.height(),
                object: index,
            })
            .collect();
        let packing = pack_cells(objects, min_width, min_height);

        let mut board = RgbaImage::new(packing.width, packing.height);
        self.regions.clear();
        for cell in &packing.cells {
            let (id, image) = &self.pending[cell.object];
            image::imageops::replace(&mut board, &**image, cell.x as i64, cell.y as i64);
            self.regions.insert(
                id.clone(),
                AtlasRegion::from_cell(cell.x, cell.y, cell.width, cell.height, (packing.width, packing.height)),
            );
        }
        log::debug!(
            "packed {} textures into a {}x{} atlas",
            self.pending.len(),
            packing.width,
            packing.height
        );
        self.image.insert(board)
    }

    /// UV rectangle of `id`, available after [`pack`](Self::pack).
    pub fn texture_data(&self, id: &str) -> Option<AtlasRegion> {
        self.regions.get(id).copied()
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> Arc<RgbaImage> {
        Arc::new(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn adding_an_id_twice_is_a_no_op() {
        let mut atlas = TextureAtlas::new();
        assert!(atlas.add_texture("brick", solid(4, 4, [255, 0, 0, 255])));
        assert!(!atlas.add_texture("brick", solid(8, 8, [0, 255, 0, 255])));
        assert_eq!(atlas.len(), 1);
        let board = atlas.pack(4, 4);
        assert_eq!(board.dimensions(), (4, 4));
        assert_eq!(board.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn regions_address_packed_pixels() {
        let mut atlas = TextureAtlas::new();
        atlas.add_texture("red", solid(8, 8, [255, 0, 0, 255]));
        atlas.add_texture("blue", solid(8, 4, [0, 0, 255, 255]));
        atlas.pack(16, 16);
        let board = atlas.image().unwrap().clone();

        for (id, color) in [("red", [255, 0, 0, 255]), ("blue", [0, 0, 255, 255])] {
            let region = atlas.texture_data(id).unwrap();
            assert!(region.lower_corner.x < region.upper_corner.x);
            assert!(region.lower_corner.y > region.upper_corner.y);
            let px = (region.lower_corner.x * board.width() as f32) as u32;
            let py = (region.upper_corner.y * board.height() as f32) as u32;
            assert_eq!(board.get_pixel(px, py), &Rgba(color));
        }
        assert!(atlas.texture_data("green").is_none());
    }
}
