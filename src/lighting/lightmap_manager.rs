//! Room based lightmaps.
//!
//! Every room is rasterized inside its own bounding box, then all room rasters
//! are packed into one shared map. Rooms are values: any change to the room
//! list regenerates everything synchronously.

use std::sync::Arc;

use cgmath::Vector2;

use crate::{
    config::EngineConfig,
    data_structures::{
        packing::{BoundedObject, pack_cells},
        room::Room,
    },
    geometry::needle_crossings,
    lighting::{directional::DirectionalLight, lightmap::Lightmap},
    pipelines::MAX_ROOMS,
    render::{RenderBackend, TextureHandle, TextureUnit, TextureUnitPool, Uniform},
};

/// What the shader knows about a room.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderRoom {
    pub level: i32,
    pub lower_left: Vector2<f32>,
    pub upper_right: Vector2<f32>,
    /// Index into `roomLights`; 0 is the outdoor light.
    pub light_index: usize,
    /// Board texel of the room's lower-left corner (board rows grow downwards).
    pub map_location: Vector2<u32>,
    pub map_dimensions: Vector2<u32>,
}

pub struct LightmapManager {
    room_levels: Vec<Vec<Room>>,
    outdoor_light: DirectionalLight,
    lights: Vec<DirectionalLight>,
    rooms: Vec<ShaderRoom>,
    map: Option<Arc<Lightmap>>,
    upload_pending: bool,
    texture: Option<TextureHandle>,
    texture_unit: Option<TextureUnit>,
    pool: TextureUnitPool,
    resolution: u32,
    min_width: u32,
    min_height: u32,
}

impl LightmapManager {
    pub fn new(pool: TextureUnitPool, config: &EngineConfig) -> Self {
        Self {
            room_levels: Vec::new(),
            outdoor_light: DirectionalLight::outdoor(),
            lights: Vec::new(),
            rooms: Vec::new(),
            map: None,
            upload_pending: false,
            texture: None,
            texture_unit: None,
            pool,
            resolution: config.room_map_resolution.max(1),
            min_width: config.room_map_min_width,
            min_height: config.room_map_min_height,
        }
    }

    /// Replaces all rooms, one list per level, and regenerates the map.
    pub fn set_rooms(&mut self, room_levels: Vec<Vec<Room>>) {
        self.room_levels = room_levels;
        self.calculate_lightmaps();
    }

    pub fn rooms(&self) -> &[ShaderRoom] {
        &self.rooms
    }

    pub fn lights(&self) -> &[DirectionalLight] {
        &self.lights
    }

    pub fn map(&self) -> Option<&Arc<Lightmap>> {
        self.map.as_ref()
    }

    /// Rasterizes `room` inside its bounding box; inside texels get `light_index`.
    fn get_fragment_data(&self, room: &Room, level: usize, light_index: usize) -> (ShaderRoom, Lightmap) {
        let resolution = self.resolution as f32;
        let Some(bounds) = room.bounds() else {
            let empty = ShaderRoom {
                level: level as i32,
                lower_left: Vector2::new(0.0, 0.0),
                upper_right: Vector2::new(0.0, 0.0),
                light_index,
                map_location: Vector2::new(0, 0),
                map_dimensions: Vector2::new(0, 0),
            };
            return (empty, Lightmap::new(0, 0));
        };

        let width = (bounds.width() * resolution).ceil() as u32;
        let height = (bounds.height() * resolution).ceil() as u32;
        let edges = room.edges();
        let reach_x = bounds.max.x + 1.0;

        let mut map = Lightmap::new(width, height);
        for y in 0..height {
            let world_y = bounds.max.y - (y as f32 + 0.5) / resolution;
            for x in 0..width {
                let point = Vector2::new(bounds.min.x + (x as f32 + 0.5) / resolution, world_y);
                if needle_crossings(point, reach_x, edges.iter().copied()) % 2 == 1 {
                    map.set(x, y, light_index as f32);
                }
            }
        }

        let shader_room = ShaderRoom {
            level: level as i32,
            lower_left: bounds.min,
            upper_right: bounds.max,
            light_index,
            map_location: Vector2::new(0, 0),
            map_dimensions: Vector2::new(width, height),
        };
        (shader_room, map)
    }

    fn calculate_lightmaps(&mut self) {
        let mut lights = vec![self.outdoor_light];
        let mut rooms = Vec::new();
        let mut rasters = Vec::new();
        for (level, room_level) in self.room_levels.iter().enumerate() {
            for room in room_level {
                lights.push(room.background_light);
                let (shader_room, raster) = self.get_fragment_data(room, level, lights.len() - 1);
                rooms.push(shader_room);
                rasters.push(raster);
            }
        }
        if rooms.len() > MAX_ROOMS {
            log::warn!(
                "cannot send {} rooms to the shader; only the first {} are used",
                rooms.len(),
                MAX_ROOMS
            );
        }

        let objects = rasters
            .iter()
            .enumerate()
            .map(|(index, raster)| BoundedObject {
                width: raster.width(),
                height: raster.height(),
                object: index,
            })
            .collect();
        let packing = pack_cells(objects, self.min_width, self.min_height);

        let mut map = Lightmap::new(packing.width, packing.height);
        for cell in &packing.cells {
            map.blit(&rasters[cell.object], cell.x, cell.y);
            rooms[cell.object].map_location = Vector2::new(cell.x, cell.y + cell.height);
        }
        log::debug!(
            "packed {} rooms into a {}x{} room map",
            rooms.len(),
            packing.width,
            packing.height
        );

        self.lights = lights;
        self.rooms = rooms;
        self.map = Some(Arc::new(map));
        self.upload_pending = true;
    }

    fn upload(&mut self, backend: &mut dyn RenderBackend) {
        if !self.upload_pending {
            return;
        }
        let Some(map) = &self.map else {
            return;
        };
        if let Some(old) = self.texture.take() {
            backend.destroy_texture(old);
        }
        match backend.create_texture(&map.texture_desc("room map")) {
            Ok(handle) => self.texture = Some(handle),
            Err(e) => log::error!("could not create room map: {:#}", e),
        }
        self.upload_pending = false;
    }

    /// Uploads the room map and room/light uniforms. Render thread only.
    pub fn send(&mut self, backend: &mut dyn RenderBackend) {
        self.upload(backend);

        if let Some(map) = &self.map {
            backend.set_uniform(
                "roomMapDimensions",
                Uniform::UVec2(Vector2::new(map.width(), map.height())),
            );
        }

        if self.texture_unit.is_none() {
            self.texture_unit = self.pool.acquire();
            if self.texture_unit.is_none() {
                log::error!("couldn't get a texture unit; not sending room map");
            }
        }
        if let (Some(unit), Some(handle)) = (self.texture_unit, self.texture) {
            backend.bind_texture(unit, handle);
            backend.set_uniform("roomMap", unit.as_uniform());
        }

        for (i, light) in self.lights.iter().enumerate() {
            light.send(&format!("roomLights[{}]", i), backend);
        }
        for (i, room) in self.rooms.iter().take(MAX_ROOMS).enumerate() {
            let map_location = Vector2::new(room.map_location.x as f32, room.map_location.y as f32);
            backend.set_uniform(&format!("rooms[{}].level", i), Uniform::Int(room.level));
            backend.set_uniform(&format!("rooms[{}].lowerLeft", i), Uniform::Vec2(room.lower_left));
            backend.set_uniform(&format!("rooms[{}].upperRight", i), Uniform::Vec2(room.upper_right));
            backend.set_uniform(&format!("rooms[{}].mapLocation", i), Uniform::Vec2(map_location));
        }
    }

    /// Destroys the room map texture and returns the texture unit.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.texture.take() {
            backend.destroy_texture(handle);
        }
        if let Some(unit) = self.texture_unit.take() {
            self.pool.release(unit);
        }
        self.upload_pending = self.map.is_some();
    }
}

impl Drop for LightmapManager {
    fn drop(&mut self) {
        if let Some(unit) = self.texture_unit.take() {
            self.pool.release(unit);
        }
    }
}
