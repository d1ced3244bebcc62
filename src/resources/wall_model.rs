//! Wall model loader.
//!
//! Turns the wall segments of one level into a renderable model tree:
//!
//! 1. every segment is walked one grid step at a time and each step is
//!    recorded in the corner map cell it borders, in the slot matching its
//!    orientation
//! 2. every wallpaper referenced by a segment is registered in a texture atlas
//! 3. each populated slot becomes a double sided panel textured from the
//!    packed atlas, grouped per cell below a common rig node
//!
//! Grid x/y map to world x/y, world z points up.

use std::sync::Arc;

use cgmath::{InnerSpace, Vector2, Vector3};
use image::RgbaImage;

use crate::{
    config::EngineConfig,
    data_structures::{
        atlas::TextureAtlas,
        material::{Material, Shader, Style},
        mesh::{FaceMeshGenerator, TexturedVertex},
        scene_graph::Model,
        wall::{Sides, WallSegment},
    },
};

/// Id of the root node every wall model hangs below.
pub const WALL_RIG_ID: &str = "__wallrig";

/// The four orientations a unit of wall can have inside one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Along the cell's lower x edge, from `(x, y)` to `(x + 1, y)`.
    Horizontal,
    /// Along the cell's lower y edge, from `(x, y)` to `(x, y + 1)`.
    Vertical,
    /// From `(x, y)` to `(x + 1, y + 1)`.
    Diagonal,
    /// From `(x, y + 1)` to `(x + 1, y)`.
    ReverseDiagonal,
}

impl Slot {
    pub const ALL: [Slot; 4] = [
        Slot::Horizontal,
        Slot::Vertical,
        Slot::Diagonal,
        Slot::ReverseDiagonal,
    ];

    /// Slot for a unit step plus the direction the slot's sides are stored in.
    fn for_direction(direction: Vector2<i32>) -> Option<(Slot, Vector2<i32>)> {
        match (direction.x, direction.y) {
            (1, 0) | (-1, 0) => Some((Slot::Horizontal, Vector2::new(1, 0))),
            (0, 1) | (0, -1) => Some((Slot::Vertical, Vector2::new(0, 1))),
            (1, 1) | (-1, -1) => Some((Slot::Diagonal, Vector2::new(1, 1))),
            (1, -1) | (-1, 1) => Some((Slot::ReverseDiagonal, Vector2::new(1, -1))),
            _ => None,
        }
    }

    /// Start point and span of the slot inside cell `(x, y)`.
    fn span(self, x: f32, y: f32) -> (Vector3<f32>, Vector3<f32>) {
        match self {
            Slot::Horizontal => (Vector3::new(x, y, 0.0), Vector3::new(1.0, 0.0, 0.0)),
            Slot::Vertical => (Vector3::new(x, y, 0.0), Vector3::new(0.0, 1.0, 0.0)),
            Slot::Diagonal => (Vector3::new(x, y, 0.0), Vector3::new(1.0, 1.0, 0.0)),
            Slot::ReverseDiagonal => (Vector3::new(x, y + 1.0, 0.0), Vector3::new(1.0, -1.0, 0.0)),
        }
    }
}

/// Walls bordering one grid cell. Sides are stored as seen when walking the
/// slot in its canonical direction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Corner {
    pub horizontal: Option<Sides>,
    pub vertical: Option<Sides>,
    pub diagonal: Option<Sides>,
    pub reverse_diagonal: Option<Sides>,
}

impl Corner {
    pub fn get(&self, slot: Slot) -> Option<&Sides> {
        match slot {
            Slot::Horizontal => self.horizontal.as_ref(),
            Slot::Vertical => self.vertical.as_ref(),
            Slot::Diagonal => self.diagonal.as_ref(),
            Slot::ReverseDiagonal => self.reverse_diagonal.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Sides> {
        match slot {
            Slot::Horizontal => &mut self.horizontal,
            Slot::Vertical => &mut self.vertical,
            Slot::Diagonal => &mut self.diagonal,
            Slot::ReverseDiagonal => &mut self.reverse_diagonal,
        }
    }

    pub fn is_empty(&self) -> bool {
        Slot::ALL.iter().all(|slot| self.get(*slot).is_none())
    }
}

/// Per level grid of [`Corner`]s, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct CornerMap {
    dimensions: Vector2<u32>,
    cells: Vec<Corner>,
}

impl CornerMap {
    pub fn new(dimensions: Vector2<u32>) -> Self {
        Self {
            dimensions,
            cells: vec![Corner::default(); dimensions.x as usize * dimensions.y as usize],
        }
    }

    pub fn from_segments(dimensions: Vector2<u32>, segments: &[WallSegment]) -> Self {
        let mut map = Self::new(dimensions);
        for segment in segments {
            map.insert_segment(segment);
        }
        map
    }

    pub fn dimensions(&self) -> Vector2<u32> {
        self.dimensions
    }

    fn index(&self, location: Vector2<i32>) -> Option<usize> {
        if location.x < 0 || location.y < 0 {
            return None;
        }
        let (x, y) = (location.x as u32, location.y as u32);
        if x >= self.dimensions.x || y >= self.dimensions.y {
            return None;
        }
        Some(y as usize * self.dimensions.x as usize + x as usize)
    }

    /// `None` outside the grid.
    pub fn get(&self, location: Vector2<i32>) -> Option<&Corner> {
        self.index(location).map(|index| &self.cells[index])
    }

    fn get_mut(&mut self, location: Vector2<i32>) -> Option<&mut Corner> {
        self.index(location).map(move |index| &mut self.cells[index])
    }

    /**
     * Records every unit step of `segment`.
     *
     * A step from `cursor` in direction `(dx, dy)` belongs to the cell at
     * `cursor + (min(dx, 0), min(dy, 0))`, which is the same cell whichever
     * end the wall is walked from. Steps against the slot's canonical
     * direction store their sides swapped. Steps outside the grid are dropped.
     */
    pub fn insert_segment(&mut self, segment: &WallSegment) {
        let Some((direction, (slot, canonical))) = segment
            .direction()
            .and_then(|direction| Slot::for_direction(direction).map(|slot| (direction, slot)))
        else {
            log::warn!(
                "ignoring wall segment {:?} -> {:?}: not aligned to the grid",
                segment.start,
                segment.end
            );
            return;
        };

        let steps = segment.steps() as usize;
        if segment.faces.len() < steps {
            log::warn!(
                "wall segment {:?} -> {:?} has {} faces for {} steps",
                segment.start,
                segment.end,
                segment.faces.len(),
                steps
            );
        }

        let reversed = direction != canonical;
        let offset = Vector2::new(direction.x.min(0), direction.y.min(0));
        let mut cursor = segment.start;
        for sides in segment.faces.iter().take(steps) {
            if let Some(corner) = self.get_mut(cursor + offset) {
                let sides = if reversed { sides.swapped() } else { sides.clone() };
                *corner.slot_mut(slot) = Some(sides);
            }
            cursor += direction;
        }
    }

    /// Populated cells in row-major order.
    pub fn populated(&self) -> impl Iterator<Item = (Vector2<i32>, &Corner)> {
        let width = self.dimensions.x.max(1) as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, corner)| !corner.is_empty())
            .map(move |(index, corner)| {
                let location = Vector2::new((index % width) as i32, (index / width) as i32);
                (location, corner)
            })
    }
}

/// The result of loading the walls of one level.
#[derive(Debug)]
pub struct WallModel {
    pub root: Arc<Model>,
    pub atlas: Arc<RgbaImage>,
    pub corner_map: CornerMap,
}

pub struct WallModelLoader {
    dimensions: Vector2<u32>,
    level: u32,
    segments: Vec<WallSegment>,
    wall_height: f32,
    level_height: f32,
    atlas_min_size: u32,
    atlas: TextureAtlas,
}

impl WallModelLoader {
    pub fn new(
        dimensions: Vector2<u32>,
        level: u32,
        segments: Vec<WallSegment>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            dimensions,
            level,
            segments,
            wall_height: config.wall_height,
            level_height: config.level_height,
            atlas_min_size: config.atlas_min_size,
            atlas: TextureAtlas::new(),
        }
    }

    fn insert_into_atlas(atlas: &mut TextureAtlas, faces: &[Sides]) {
        for sides in faces {
            atlas.add_texture(&sides.front.id, sides.front.surface.clone());
            atlas.add_texture(&sides.back.id, sides.back.surface.clone());
        }
    }

    /**
     * Two triangles spanning `horizontal` x `vertical` from `origin`, textured
     * with the atlas region of `wallpaper_id`.
     *
     * # Panics
     *
     * If `wallpaper_id` was never registered in the atlas.
     */
    fn get_plane(
        &self,
        origin: Vector3<f32>,
        horizontal: Vector3<f32>,
        vertical: Vector3<f32>,
        wallpaper_id: &str,
    ) -> [TexturedVertex; 6] {
        let region = self.atlas.texture_data(wallpaper_id).unwrap_or_else(|| {
            panic!("wallpaper {} is referenced by a wall but missing from the atlas", wallpaper_id)
        });
        let normal = horizontal.cross(vertical).normalize();
        let (lower, upper) = (region.lower_corner, region.upper_corner);

        [
            TexturedVertex::new(origin, normal, lower),
            TexturedVertex::new(origin + horizontal, normal, Vector2::new(upper.x, lower.y)),
            TexturedVertex::new(origin + vertical, normal, Vector2::new(lower.x, upper.y)),
            TexturedVertex::new(origin + horizontal, normal, Vector2::new(upper.x, lower.y)),
            TexturedVertex::new(origin + horizontal + vertical, normal, upper),
            TexturedVertex::new(origin + vertical, normal, Vector2::new(lower.x, upper.y)),
        ]
    }

    fn side_to_planes(&self, generator: &mut FaceMeshGenerator, sides: &Sides, slot: Slot, cell: Vector2<i32>) {
        let (start, span) = slot.span(cell.x as f32, cell.y as f32);
        let origin = start + Vector3::new(0.0, 0.0, self.level as f32 * self.level_height);
        let vertical = Vector3::new(0.0, 0.0, self.wall_height);

        generator.add_plane(self.get_plane(origin, span, vertical, &sides.front.id));
        // Walked from the far end the winding and normal flip.
        generator.add_plane(self.get_plane(origin + span, -span, vertical, &sides.back.id));
    }

    fn corner_to_model(&self, root: &Arc<Model>, cell: Vector2<i32>, corner: &Corner, style: &Style) {
        let mut generator = FaceMeshGenerator::new();
        for slot in Slot::ALL {
            if let Some(sides) = corner.get(slot) {
                self.side_to_planes(&mut generator, sides, slot, cell);
            }
        }
        let id = format!("corner:{},{}", cell.x, cell.y);
        let mesh = generator.generate(id.clone());
        Model::create(Some(root), id, Some(Arc::new(mesh)), Some(style.clone()));
    }

    /// Builds the model tree. `shader` is used for every wall panel.
    pub fn load(mut self, shader: Arc<Shader>) -> WallModel {
        for segment in &self.segments {
            Self::insert_into_atlas(&mut self.atlas, &segment.faces);
        }
        let corner_map = CornerMap::from_segments(self.dimensions, &self.segments);
        let atlas = Arc::new(self.atlas.pack(self.atlas_min_size, self.atlas_min_size).clone());

        let material = Material::new(format!("walls level {}", self.level)).with_diffuse(atlas.clone());
        let style = Style::new(shader, Arc::new(material));

        let root = Model::create(None, WALL_RIG_ID, None, None);
        for (cell, corner) in corner_map.populated() {
            self.corner_to_model(&root, cell, corner, &style);
        }
        log::debug!(
            "loaded {} wall segments on level {} into {} corner models",
            self.segments.len(),
            self.level,
            root.child_count()
        );

        WallModel {
            root,
            atlas,
            corner_map,
        }
    }
}
