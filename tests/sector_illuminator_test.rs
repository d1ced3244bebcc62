use std::{sync::Arc, thread, time::Duration};

use cgmath::{Vector2, Vector3};
use lot_ngin::{
    config::EngineConfig,
    lighting::{
        directional::DirectionalLight,
        sector_illuminator::{Sector, SectorIlluminator},
    },
    render::{TextureFormat, TextureUnitPool, Uniform},
};
use tokio::runtime::Runtime;

use crate::common::test_utils::{RecordingBackend, init_logger};

mod common;

const MAX_FRAMES: usize = 1000;

fn square(x: f32, y: f32, size: f32, z: f32, light: DirectionalLight) -> Sector {
    Sector::from_points(
        &[
            Vector3::new(x, y, z),
            Vector3::new(x + size, y, z),
            Vector3::new(x + size, y + size, z),
            Vector3::new(x, y + size, z),
        ],
        light,
    )
}

fn warm_light() -> DirectionalLight {
    DirectionalLight::new(
        Vector3::new(0.0, 0.0, -1.0),
        Vector3::new(0.3, 0.2, 0.1),
        Vector3::new(0.9, 0.7, 0.5),
        Vector3::new(0.2, 0.2, 0.2),
    )
}

/// Sends one frame at a time until the illuminator has adopted everything.
fn run_frames(illuminator: &SectorIlluminator, backend: &mut RecordingBackend) -> usize {
    for frame in 0..MAX_FRAMES {
        illuminator.send(backend);
        if !illuminator.is_dirty() {
            return frame + 1;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("sector maps were not adopted within {} frames", MAX_FRAMES);
}

fn setup(pool: &TextureUnitPool) -> (Runtime, SectorIlluminator) {
    init_logger();
    let runtime = Runtime::new().unwrap();
    let illuminator = SectorIlluminator::new(runtime.handle().clone(), pool.clone(), &EngineConfig::default());
    (runtime, illuminator)
}

#[test]
fn should_send_sector_light_once_generation_completes() {
    let pool = TextureUnitPool::new(16, 1);
    let (_runtime, illuminator) = setup(&pool);
    illuminator.set_level_data(Vector3::new(100.0, 50.0, 0.0), Vector2::new(4, 4));
    illuminator.insert(square(0.0, 0.0, 4.0, 0.0, warm_light()));

    let mut backend = RecordingBackend::new();
    let frames = run_frames(&illuminator, &mut backend);
    assert!(frames >= 2, "adoption needs a launch frame and a poll frame");

    // One more frame with nothing pending to look at the steady state.
    backend.clear_log();
    illuminator.send(&mut backend);

    assert_eq!(backend.sent_count("sectorLights[0].direction"), 1);
    assert_eq!(backend.sent_count("sectorLights[1].direction"), 0);
    assert_eq!(
        backend.uniform("sectorLights[0].diffuse"),
        Some(Uniform::Vec3(Vector3::new(0.9, 0.7, 0.5)))
    );
    assert_eq!(backend.uniform("sectorResolution"), Some(Uniform::Float(10.0)));
    assert_eq!(backend.uniform("sectors[0].dimensions"), Some(Uniform::UVec2(Vector2::new(4, 4))));
    assert_eq!(
        backend.uniform("sectors[0].origin"),
        Some(Uniform::Vec3(Vector3::new(100.0, 50.0, 0.0)))
    );

    let map = backend.bound_to("sectorMap0").expect("level 0 map is bound");
    assert_eq!((map.width, map.height), (40, 40));
    assert_eq!(map.format, TextureFormat::R32Float);
    assert!(
        map.data
            .chunks_exact(4)
            .all(|texel| f32::from_ne_bytes([texel[0], texel[1], texel[2], texel[3]]) == 1.0)
    );
}

#[test]
fn should_keep_last_maps_until_regeneration_is_adopted() {
    let pool = TextureUnitPool::new(16, 1);
    let (_runtime, illuminator) = setup(&pool);
    illuminator.set_level_data(Vector3::new(0.0, 2.0, 0.0), Vector2::new(2, 2));
    illuminator.insert(square(0.0, 0.0, 1.0, 0.0, DirectionalLight::outdoor()));

    let mut backend = RecordingBackend::new();
    run_frames(&illuminator, &mut backend);
    assert_eq!(illuminator.adopted_sectors().len(), 1);

    illuminator.insert(square(1.0, 1.0, 1.0, 0.0, warm_light()));
    assert_eq!(illuminator.adopted_sectors().len(), 1);
    run_frames(&illuminator, &mut backend);

    assert_eq!(illuminator.adopted_sectors().len(), 2);
    // The replaced map's texture was destroyed.
    assert_eq!(backend.destroyed.len(), 1);
    assert_eq!(backend.textures.len(), 1);
}

#[test]
fn should_not_lose_inserts_made_during_generation() {
    let pool = TextureUnitPool::new(16, 1);
    let (_runtime, illuminator) = setup(&pool);
    let illuminator = Arc::new(illuminator);
    illuminator.set_level_data(Vector3::new(0.0, 50.0, 0.0), Vector2::new(50, 50));
    illuminator.insert(square(0.0, 0.0, 50.0, 0.0, DirectionalLight::outdoor()));

    let mut backend = RecordingBackend::new();
    // Launch the first generation, then insert from other threads while it runs.
    illuminator.send(&mut backend);

    let writers = (0..4)
        .map(|w| {
            let illuminator = illuminator.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let offset = (w * 25 + i) as f32 * 0.4;
                    illuminator.insert(square(offset, 0.0, 0.2, 0.0, warm_light()));
                }
            })
        })
        .collect::<Vec<_>>();
    for _ in 0..10 {
        illuminator.send(&mut backend);
        thread::sleep(Duration::from_millis(1));
    }
    for writer in writers {
        writer.join().unwrap();
    }

    run_frames(&illuminator, &mut backend);
    assert_eq!(illuminator.sectors().len(), 101);
    assert_eq!(illuminator.adopted_sectors().len(), 101);
}

#[test]
fn should_return_texture_units_on_drop() {
    let pool = TextureUnitPool::new(16, 1);
    let available = pool.available();
    {
        let (_runtime, illuminator) = setup(&pool);
        illuminator.set_level_data(Vector3::new(0.0, 1.0, 0.0), Vector2::new(1, 1));
        illuminator.set_level_data(Vector3::new(0.0, 1.0, 4.0), Vector2::new(1, 1));
        let mut backend = RecordingBackend::new();
        run_frames(&illuminator, &mut backend);
        assert_eq!(pool.available(), available - 2);
    }
    assert_eq!(pool.available(), available);
}

#[test]
fn should_release_units_and_textures_on_release() {
    let pool = TextureUnitPool::new(16, 1);
    let (_runtime, illuminator) = setup(&pool);
    illuminator.set_level_data(Vector3::new(0.0, 1.0, 0.0), Vector2::new(1, 1));
    let mut backend = RecordingBackend::new();
    run_frames(&illuminator, &mut backend);
    assert_eq!(backend.textures.len(), 1);

    illuminator.release(&mut backend);
    assert!(backend.textures.is_empty());
    assert_eq!(pool.available(), 15);
}

#[test]
fn should_truncate_levels_beyond_capacity() {
    let pool = TextureUnitPool::new(32, 1);
    let (_runtime, illuminator) = setup(&pool);
    for level in 0..10 {
        illuminator.set_level_data(Vector3::new(0.0, 1.0, level as f32 * 4.0), Vector2::new(1, 1));
    }
    let mut backend = RecordingBackend::new();
    run_frames(&illuminator, &mut backend);

    assert!(backend.uniform("sectors[7].origin").is_some());
    assert!(backend.uniform("sectors[8].origin").is_none());
    assert!(backend.uniform("sectorMap7").is_some());
    assert!(backend.uniform("sectorMap8").is_none());
    assert_eq!(illuminator.lightmaps().len(), 10);
    assert_eq!(backend.textures.len(), 8);
}

#[test]
fn should_skip_maps_without_texture_unit() {
    // Only unit 1 is free.
    let pool = TextureUnitPool::new(2, 1);
    let (_runtime, illuminator) = setup(&pool);
    illuminator.set_level_data(Vector3::new(0.0, 1.0, 0.0), Vector2::new(1, 1));
    illuminator.set_level_data(Vector3::new(0.0, 1.0, 4.0), Vector2::new(1, 1));
    let mut backend = RecordingBackend::new();
    run_frames(&illuminator, &mut backend);

    assert_eq!(backend.uniform("sectorMap0"), Some(Uniform::Int(1)));
    assert!(backend.uniform("sectorMap1").is_none());
    assert_eq!(pool.available(), 0);
}

#[test]
fn should_give_unsent_map_slots_to_later_levels() {
    let pool = TextureUnitPool::new(32, 1);
    let (_runtime, illuminator) = setup(&pool);
    for level in 0..9 {
        illuminator.set_level_data(Vector3::new(0.0, 0.0, level as f32 * 4.0), Vector2::new(1, 1));
    }
    let mut backend = RecordingBackend::new();
    backend.rejected_labels.push("sector map 0".to_string());
    run_frames(&illuminator, &mut backend);

    assert_eq!(backend.textures.len(), 8);
    for slot in 0..8 {
        assert!(backend.bound_to(&format!("sectorMap{}", slot)).is_some());
    }
    assert!(backend.uniform("sectorMap8").is_none());
    assert_eq!(
        backend.uniform("sectors[0].origin"),
        Some(Uniform::Vec3(Vector3::new(0.0, 0.0, 4.0)))
    );
    assert_eq!(
        backend.uniform("sectors[7].origin"),
        Some(Uniform::Vec3(Vector3::new(0.0, 0.0, 32.0)))
    );
}

#[test]
fn should_rasterize_synchronously_with_generate_now() {
    let pool = TextureUnitPool::new(16, 1);
    let (_runtime, illuminator) = setup(&pool);
    illuminator.set_level_data(Vector3::new(0.0, 2.0, 0.0), Vector2::new(2, 2));
    illuminator.insert(square(0.0, 0.0, 1.0, 0.0, DirectionalLight::outdoor()));

    let maps = illuminator.generate_now();
    assert_eq!(maps.len(), 1);
    assert_eq!(maps[0].texels().iter().filter(|t| **t == 1.0).count(), 100);
    assert!(illuminator.adopted_sectors().is_empty());
}
