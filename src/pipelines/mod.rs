//! GPU side of the render seam.
//!
//! - `uniforms` packs name-addressed uniforms into std140 buffers
//! - `backend` implements [`crate::render::RenderBackend`] over wgpu
//! - `lit` builds the render pipeline that consumes the engine uniform block
//! - `texture_units` exposes the bound texture units as a bind group

pub mod backend;
pub mod lit;
pub mod texture_units;
pub mod uniforms;

use uniforms::{UniformKind, UniformLayout};

/// Texture units visible to the lit pipeline; unit 0 is the material colour.
pub const TEXTURE_UNITS: u32 = 16;
/// Sector map slots in the shader (`sectorMap0` .. `sectorMap7`).
pub const SECTOR_MAP_SLOTS: usize = 8;
pub const MAX_SECTOR_LIGHTS: usize = 32;
pub const MAX_ROOMS: usize = 32;
/// Room lights include the outdoor light at index 0.
pub const MAX_ROOM_LIGHTS: usize = MAX_ROOMS + 1;

const LIGHT_FIELDS: [(&str, UniformKind); 4] = [
    ("direction", UniformKind::Vec3),
    ("ambient", UniformKind::Vec3),
    ("diffuse", UniformKind::Vec3),
    ("specular", UniformKind::Vec3),
];

/// Every uniform the scene graph and the illuminators send.
pub fn engine_uniform_layout() -> UniformLayout {
    let mut layout = UniformLayout::new()
        .with("model", UniformKind::Mat4)
        .with("material.diffuse", UniformKind::Int)
        .with("sectorResolution", UniformKind::Float)
        .with_array(
            "sectors",
            &[("origin", UniformKind::Vec3), ("dimensions", UniformKind::UVec2)],
            SECTOR_MAP_SLOTS,
        )
        .with_array("sectorLights", &LIGHT_FIELDS, MAX_SECTOR_LIGHTS)
        .with("roomMap", UniformKind::Int)
        .with("roomMapDimensions", UniformKind::UVec2)
        .with_array("roomLights", &LIGHT_FIELDS, MAX_ROOM_LIGHTS)
        .with_array(
            "rooms",
            &[
                ("level", UniformKind::Int),
                ("lowerLeft", UniformKind::Vec2),
                ("upperRight", UniformKind::Vec2),
                ("mapLocation", UniformKind::Vec2),
            ],
            MAX_ROOMS,
        );
    for slot in 0..SECTOR_MAP_SLOTS {
        layout = layout.with(&format!("sectorMap{}", slot), UniformKind::Int);
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_layout_names_every_sent_uniform() {
        let layout = engine_uniform_layout();
        for name in [
            "model",
            "sectorResolution",
            "sectors[7].dimensions",
            "sectorLights[31].specular",
            "sectorMap7",
            "roomLights[32].direction",
            "rooms[31].mapLocation",
            "roomMapDimensions",
        ] {
            assert!(layout.field(name).is_some(), "{name} missing");
        }
        assert_eq!(layout.size() % 16, 0);
    }
}
