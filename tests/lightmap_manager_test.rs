use cgmath::{Vector2, Vector3};
use lot_ngin::{
    config::EngineConfig,
    data_structures::room::Room,
    lighting::{directional::DirectionalLight, lightmap_manager::LightmapManager},
    render::{TextureUnitPool, Uniform},
};

use crate::common::test_utils::{RecordingBackend, init_logger};

mod common;

fn rectangle(x: f32, y: f32, w: f32, h: f32, light: DirectionalLight) -> Room {
    Room::new(
        vec![
            Vector2::new(x, y),
            Vector2::new(x + w, y),
            Vector2::new(x + w, y + h),
            Vector2::new(x, y + h),
        ],
        light,
    )
}

fn lamp(intensity: f32) -> DirectionalLight {
    DirectionalLight::new(
        Vector3::new(0.0, 0.0, -1.0),
        Vector3::new(intensity, intensity, intensity),
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(0.0, 0.0, 0.0),
    )
}

#[test]
fn should_index_lights_after_outdoor_light() {
    let mut manager = LightmapManager::new(TextureUnitPool::new(16, 1), &EngineConfig::default());
    manager.set_rooms(vec![
        vec![rectangle(0.0, 0.0, 2.0, 2.0, lamp(0.1))],
        vec![rectangle(0.0, 0.0, 1.0, 1.0, lamp(0.2)), rectangle(3.0, 0.0, 1.0, 1.0, lamp(0.3))],
    ]);

    assert_eq!(manager.lights().len(), 4);
    assert_eq!(manager.lights()[0], DirectionalLight::outdoor());
    assert_eq!(manager.lights()[3], lamp(0.3));

    let levels = manager.rooms().iter().map(|r| r.level).collect::<Vec<_>>();
    assert_eq!(levels, vec![0, 1, 1]);
    let indices = manager.rooms().iter().map(|r| r.light_index).collect::<Vec<_>>();
    assert_eq!(indices, vec![1, 2, 3]);
}

#[test]
fn should_pack_rooms_without_overlap() {
    let mut manager = LightmapManager::new(TextureUnitPool::new(16, 1), &EngineConfig::default());
    manager.set_rooms(vec![vec![
        rectangle(0.0, 0.0, 5.0, 3.0, lamp(0.1)),
        rectangle(10.0, 0.0, 4.0, 4.0, lamp(0.2)),
        rectangle(0.0, 10.0, 7.0, 2.0, lamp(0.3)),
    ]]);

    let map = manager.map().unwrap();
    assert!(map.width() >= 64 && map.height() >= 64);

    for room in manager.rooms() {
        let (width, height) = (room.map_dimensions.x, room.map_dimensions.y);
        // mapLocation is the lower-left texel edge; rows grow downwards.
        let (left, top) = (room.map_location.x, room.map_location.y - height);
        assert!(left + width <= map.width() && top + height <= map.height());
        for y in top..top + height {
            for x in left..left + width {
                assert_eq!(map.get(x, y), Some(room.light_index as f32));
            }
        }
    }
}

#[test]
fn should_grow_board_for_large_rooms() {
    let mut manager = LightmapManager::new(TextureUnitPool::new(16, 1), &EngineConfig::default());
    manager.set_rooms(vec![vec![
        rectangle(0.0, 0.0, 10.0, 10.0, lamp(0.1)),
        rectangle(20.0, 0.0, 10.0, 10.0, lamp(0.2)),
    ]]);

    let map = manager.map().unwrap();
    assert!(map.width() * map.height() >= 2 * 100 * 100);
    assert_ne!(manager.rooms()[0].map_location, manager.rooms()[1].map_location);
}

#[test]
fn should_send_room_uniforms_and_map() {
    init_logger();
    let mut manager = LightmapManager::new(TextureUnitPool::new(16, 1), &EngineConfig::default());
    manager.set_rooms(vec![vec![rectangle(1.0, 2.0, 3.0, 1.0, lamp(0.4))]]);

    let mut backend = RecordingBackend::new();
    manager.send(&mut backend);

    assert_eq!(backend.uniform("rooms[0].level"), Some(Uniform::Int(0)));
    assert_eq!(backend.uniform("rooms[0].lowerLeft"), Some(Uniform::Vec2(Vector2::new(1.0, 2.0))));
    assert_eq!(backend.uniform("rooms[0].upperRight"), Some(Uniform::Vec2(Vector2::new(4.0, 3.0))));
    assert_eq!(
        backend.uniform("roomLights[1].ambient"),
        Some(Uniform::Vec3(Vector3::new(0.4, 0.4, 0.4)))
    );
    assert!(backend.uniform("rooms[1].level").is_none());

    let map = backend.bound_to("roomMap").unwrap();
    assert_eq!(
        backend.uniform("roomMapDimensions"),
        Some(Uniform::UVec2(Vector2::new(map.width, map.height)))
    );
}

#[test]
fn should_replace_map_texture_on_room_change() {
    let mut manager = LightmapManager::new(TextureUnitPool::new(16, 1), &EngineConfig::default());
    let mut backend = RecordingBackend::new();
    manager.set_rooms(vec![vec![rectangle(0.0, 0.0, 1.0, 1.0, lamp(0.1))]]);
    manager.send(&mut backend);
    manager.send(&mut backend);
    assert_eq!(backend.textures.len(), 1);
    assert!(backend.destroyed.is_empty());

    manager.set_rooms(vec![vec![rectangle(0.0, 0.0, 2.0, 2.0, lamp(0.1))]]);
    manager.send(&mut backend);
    assert_eq!(backend.textures.len(), 1);
    assert_eq!(backend.destroyed.len(), 1);
}

#[test]
fn should_return_texture_unit_on_drop() {
    let pool = TextureUnitPool::new(4, 1);
    {
        let mut manager = LightmapManager::new(pool.clone(), &EngineConfig::default());
        manager.set_rooms(vec![vec![rectangle(0.0, 0.0, 1.0, 1.0, lamp(0.1))]]);
        manager.send(&mut RecordingBackend::new());
        assert_eq!(pool.available(), 2);
    }
    assert_eq!(pool.available(), 3);
}
