//! Sector illuminator.
//!
//! Keeps the light sectors and per-level raster parameters of a building and
//! turns them into one lightmap per level. Rasterization runs on the blocking
//! pool of a tokio runtime; the render thread only polls for completion from
//! [`SectorIlluminator::send`] and keeps showing the last adopted maps while a
//! generation is outstanding.
//!
//! Editing calls never wait for a generation. When the live data is locked by
//! the rasterizer, mutations go to a staging buffer that is merged into the
//! live data before the next launch.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, TryLockError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use cgmath::{Vector2, Vector3};
use futures::FutureExt;
use instant::Instant;
use rayon::prelude::*;
use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    config::EngineConfig,
    geometry::{BoundingBox, LineSegment, needle_crossings, polygon_max_x},
    lighting::{directional::DirectionalLight, lightmap::Lightmap},
    render::{RenderBackend, TextureHandle, TextureUnit, TextureUnitPool, Uniform},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn slice_of(z: f32, level_height: f32) -> i32 {
    (z / level_height).floor() as i32
}

/// A polygon on one level lit by a single directional light.
#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    pub sides: Vec<LineSegment<Vector3<f32>>>,
    pub light: DirectionalLight,
}

impl Sector {
    pub fn new(sides: Vec<LineSegment<Vector3<f32>>>, light: DirectionalLight) -> Self {
        Self { sides, light }
    }

    /// Closes `points` into a loop of sides.
    pub fn from_points(points: &[Vector3<f32>], light: DirectionalLight) -> Self {
        let len = points.len();
        let sides = (0..len)
            .map(|i| LineSegment::new(points[i], points[(i + 1) % len]))
            .collect();
        Self { sides, light }
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.sides
                .iter()
                .flat_map(|side| [side.start.truncate(), side.end.truncate()]),
        )
    }

    /// Point in polygon test against the sides on the same level as `point`.
    pub fn contains(&self, point: Vector3<f32>, level_height: f32) -> bool {
        PreparedSector::new(self, level_height)
            .is_some_and(|prepared| prepared.contains(point.truncate(), slice_of(point.z, level_height)))
    }
}

/// A sector flattened for repeated point tests.
struct PreparedSector {
    bounds: BoundingBox,
    reach_x: f32,
    edges: Vec<(i32, LineSegment<Vector2<f32>>)>,
}

impl PreparedSector {
    fn new(sector: &Sector, level_height: f32) -> Option<Self> {
        let bounds = sector.bounds()?;
        let edges = sector
            .sides
            .iter()
            .map(|side| {
                (
                    slice_of(side.start.z, level_height),
                    side.map(|point| point.truncate()),
                )
            })
            .collect::<Vec<_>>();
        let reach_x = polygon_max_x(edges.iter().map(|(_, edge)| edge)) + 1.0;
        Some(Self {
            bounds,
            reach_x,
            edges,
        })
    }

    fn contains(&self, point: Vector2<f32>, slice: i32) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }
        let edges = self
            .edges
            .iter()
            .filter(|(edge_slice, _)| *edge_slice == slice)
            .map(|(_, edge)| *edge);
        needle_crossings(point, self.reach_x, edges) % 2 == 1
    }
}

/// Where a level's lightmap sits in the world and how large it is.
///
/// Sector x/y are local to the level: texel `(x, y)` covers the point
/// `(x / res, y / res)`. `origin` only selects the level slice through its z
/// and tells the shader where the map lies in the world. `dimensions` are in
/// world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelData {
    pub origin: Vector3<f32>,
    pub dimensions: Vector2<u32>,
}

impl LevelData {
    pub fn new(origin: Vector3<f32>, dimensions: Vector2<u32>) -> Self {
        Self { origin, dimensions }
    }
}

/**
 * Rasterizes one lightmap per level.
 *
 * Each texel is sampled at its centre in level-local coordinates. Its value
 * is `i + 1` for the first sector `i` (in insertion order) that contains it,
 * or `0.0`.
 */
pub fn rasterize_levels(
    sectors: &[Sector],
    levels: &[LevelData],
    resolution: u32,
    level_height: f32,
) -> Vec<Lightmap> {
    let prepared = sectors
        .iter()
        .enumerate()
        .filter_map(|(index, sector)| PreparedSector::new(sector, level_height).map(|p| (index, p)))
        .collect::<Vec<_>>();

    levels
        .iter()
        .map(|level| rasterize_level(&prepared, level, resolution, level_height))
        .collect()
}

fn rasterize_level(
    prepared: &[(usize, PreparedSector)],
    level: &LevelData,
    resolution: u32,
    level_height: f32,
) -> Lightmap {
    let width = level.dimensions.x * resolution;
    let height = level.dimensions.y * resolution;
    if width == 0 || height == 0 {
        return Lightmap::new(width, height);
    }

    let step = 1.0 / resolution as f32;
    let slice = slice_of(level.origin.z, level_height);
    let mut texels = vec![0.0f32; width as usize * height as usize];
    texels
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let local_y = (y as f32 + 0.5) * step;
            for (x, texel) in row.iter_mut().enumerate() {
                let point = Vector2::new((x as f32 + 0.5) * step, local_y);
                if let Some((index, _)) = prepared
                    .iter()
                    .find(|(_, sector)| sector.contains(point, slice))
                {
                    *texel = (*index + 1) as f32;
                }
            }
        });

    Lightmap::from_texels(width, height, texels)
}

#[derive(Clone, Debug, Default, PartialEq)]
struct SectorSet {
    sectors: Vec<Sector>,
    levels: Vec<LevelData>,
}

impl SectorSet {
    fn is_empty(&self) -> bool {
        self.sectors.is_empty() && self.levels.is_empty()
    }
}

#[derive(Debug, Default)]
struct LiveSet {
    set: SectorSet,
    /// Bumped on every mutation so a finished generation can tell if it is stale.
    revision: u64,
}

impl LiveSet {
    fn merge(&mut self, staging: &mut SectorSet) -> bool {
        if staging.is_empty() {
            return false;
        }
        self.set.sectors.append(&mut staging.sectors);
        self.set.levels.append(&mut staging.levels);
        self.revision += 1;
        true
    }
}

struct GeneratedSet {
    snapshot: SectorSet,
    revision: u64,
    lightmaps: Vec<Lightmap>,
    elapsed: Duration,
}

/// Builds a GPU texture on the render thread from data generated elsewhere.
pub type DeferredTexture =
    Box<dyn FnOnce(&mut dyn RenderBackend) -> anyhow::Result<TextureHandle> + Send>;

/// One generated level map and the GPU resources realized for it.
pub struct TextureData {
    pub lightmap: Arc<Lightmap>,
    texture: Option<TextureHandle>,
    texture_unit: Option<TextureUnit>,
    generator: Option<DeferredTexture>,
}

impl TextureData {
    fn deferred(level: usize, lightmap: Lightmap) -> Self {
        let lightmap = Arc::new(lightmap);
        let source = lightmap.clone();
        Self {
            lightmap,
            texture: None,
            texture_unit: None,
            generator: Some(Box::new(move |backend: &mut dyn RenderBackend| {
                backend.create_texture(&source.texture_desc(format!("sector map {}", level)))
            })),
        }
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn texture_unit(&self) -> Option<TextureUnit> {
        self.texture_unit
    }
}

pub struct SectorIlluminator {
    live: Arc<Mutex<LiveSet>>,
    staging: Mutex<SectorSet>,
    dirty: AtomicBool,
    task: Mutex<Option<JoinHandle<GeneratedSet>>>,
    textures: Mutex<Vec<TextureData>>,
    adopted: Mutex<SectorSet>,
    runtime: Handle,
    pool: TextureUnitPool,
    resolution: u32,
    level_height: f32,
    max_levels: usize,
    max_textures: usize,
}

impl SectorIlluminator {
    pub fn new(runtime: Handle, pool: TextureUnitPool, config: &EngineConfig) -> Self {
        Self {
            live: Arc::new(Mutex::new(LiveSet::default())),
            staging: Mutex::new(SectorSet::default()),
            dirty: AtomicBool::new(false),
            task: Mutex::new(None),
            textures: Mutex::new(Vec::new()),
            adopted: Mutex::new(SectorSet::default()),
            runtime,
            pool,
            resolution: config.sector_texels_per_unit(),
            level_height: config.level_height,
            max_levels: config.max_sector_levels,
            max_textures: config.max_sector_textures,
        }
    }

    /// Applies `mutate` to the live set if it is free, to staging otherwise.
    fn mutate(&self, mutate: impl FnOnce(&mut SectorSet)) {
        match self.live.try_lock() {
            Ok(mut live) => {
                mutate(&mut live.set);
                live.revision += 1;
                self.dirty.store(true, Ordering::SeqCst);
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                let mut live = poisoned.into_inner();
                mutate(&mut live.set);
                live.revision += 1;
                self.dirty.store(true, Ordering::SeqCst);
            }
            Err(TryLockError::WouldBlock) => {
                let mut staging = lock(&self.staging);
                mutate(&mut staging);
                self.dirty.store(true, Ordering::SeqCst);
            }
        }
    }

    pub fn insert(&self, sector: Sector) {
        self.mutate(|set| set.sectors.push(sector));
    }

    pub fn set_level_data(&self, origin: Vector3<f32>, dimensions: Vector2<u32>) {
        self.mutate(|set| set.levels.push(LevelData::new(origin, dimensions)));
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn is_generating(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Live and staged sectors. Waits for a running rasterization to release the live set.
    pub fn sectors(&self) -> Vec<Sector> {
        let mut sectors = lock(&self.live).set.sectors.clone();
        sectors.extend(lock(&self.staging).sectors.iter().cloned());
        sectors
    }

    /// Live and staged level data. Waits like [`sectors`](Self::sectors).
    pub fn level_data(&self) -> Vec<LevelData> {
        let mut levels = lock(&self.live).set.levels.clone();
        levels.extend(lock(&self.staging).levels.iter().copied());
        levels
    }

    /// Sectors whose lights are currently sent.
    pub fn adopted_sectors(&self) -> Vec<Sector> {
        lock(&self.adopted).sectors.clone()
    }

    pub fn lightmaps(&self) -> Vec<Arc<Lightmap>> {
        lock(&self.textures)
            .iter()
            .map(|data| data.lightmap.clone())
            .collect()
    }

    /// Merges staging and rasterizes on the calling thread. Nothing is adopted.
    pub fn generate_now(&self) -> Vec<Lightmap> {
        let mut live = lock(&self.live);
        live.merge(&mut lock(&self.staging));
        rasterize_levels(&live.set.sectors, &live.set.levels, self.resolution, self.level_height)
    }

    fn launch(&self, task: &mut Option<JoinHandle<GeneratedSet>>) {
        {
            let mut live = lock(&self.live);
            live.merge(&mut lock(&self.staging));
        }

        let live = self.live.clone();
        let (resolution, level_height) = (self.resolution, self.level_height);
        *task = Some(self.runtime.spawn_blocking(move || {
            let started = Instant::now();
            // Held for the whole raster; concurrent edits are staged meanwhile.
            let live = lock(&live);
            let lightmaps = rasterize_levels(&live.set.sectors, &live.set.levels, resolution, level_height);
            GeneratedSet {
                snapshot: live.set.clone(),
                revision: live.revision,
                lightmaps,
                elapsed: started.elapsed(),
            }
        }));
        log::debug!("launched sector map generation");
    }

    fn refresh(&self, backend: &mut dyn RenderBackend) {
        let mut task = lock(&self.task);
        let Some(handle) = task.as_mut() else {
            self.launch(&mut task);
            return;
        };
        if !handle.is_finished() {
            return;
        }
        let Some(outcome) = handle.now_or_never() else {
            return;
        };
        *task = None;

        let generated = match outcome {
            Ok(generated) => generated,
            Err(e) => {
                // Still dirty: the next frame relaunches with staging merged.
                log::error!("sector map generation failed: {}; retrying", e);
                return;
            }
        };

        let mut live = lock(&self.live);
        let mut staging = lock(&self.staging);
        let staged = live.merge(&mut staging);
        if staged || live.revision != generated.revision {
            drop(staging);
            drop(live);
            log::debug!("sector data changed during generation; relaunching");
            self.launch(&mut task);
            return;
        }
        self.dirty.store(false, Ordering::SeqCst);
        drop(staging);
        drop(live);

        self.adopt(generated, backend);
    }

    fn adopt(&self, generated: GeneratedSet, backend: &mut dyn RenderBackend) {
        let mut textures = lock(&self.textures);
        for old in textures.drain(..) {
            if let Some(unit) = old.texture_unit {
                self.pool.release(unit);
            }
            if let Some(handle) = old.texture {
                backend.destroy_texture(handle);
            }
        }

        if generated.snapshot.levels.len() > self.max_levels {
            log::warn!(
                "cannot send {} sector levels to the shader; only the first {} are used",
                generated.snapshot.levels.len(),
                self.max_levels
            );
        }
        if generated.lightmaps.len() > self.max_textures {
            log::warn!(
                "cannot send {} sector maps to the shader; only the first {} are used",
                generated.lightmaps.len(),
                self.max_textures
            );
        }

        log::debug!(
            "adopted {} sector maps for {} sectors, generated in {:?}",
            generated.lightmaps.len(),
            generated.snapshot.sectors.len(),
            generated.elapsed
        );
        *textures = generated
            .lightmaps
            .into_iter()
            .enumerate()
            .map(|(level, lightmap)| TextureData::deferred(level, lightmap))
            .collect();
        *lock(&self.adopted) = generated.snapshot;
    }

    /**
     * Drives generation and uploads everything the shader needs.
     *
     * Must be called once per frame on the render thread. While a generation
     * is running the previously adopted maps and lights are sent.
     */
    pub fn send(&self, backend: &mut dyn RenderBackend) {
        if self.is_dirty() {
            self.refresh(backend);
        }

        backend.set_uniform("sectorResolution", Uniform::Float(self.resolution as f32));

        let adopted = lock(&self.adopted);
        for (i, level) in adopted.levels.iter().take(self.max_levels).enumerate() {
            backend.set_uniform(&format!("sectors[{}].origin", i), Uniform::Vec3(level.origin));
            backend.set_uniform(&format!("sectors[{}].dimensions", i), Uniform::UVec2(level.dimensions));
        }

        // Slots are handed out to maps that actually bind; a slot whose map is
        // not its own level's carries that level's parameters too.
        let mut textures = lock(&self.textures);
        let mut slot = 0;
        for (i, data) in textures.iter_mut().enumerate() {
            if slot == self.max_textures {
                break;
            }
            if data.texture_unit.is_none() {
                match self.pool.acquire() {
                    Some(unit) => data.texture_unit = Some(unit),
                    None => {
                        log::error!("couldn't get a texture unit; not sending sector map {}", i);
                        continue;
                    }
                }
            }

            if let Some(generator) = data.generator.take() {
                log::debug!("regenerating sector texture for level {}", i);
                match generator(backend) {
                    Ok(handle) => data.texture = Some(handle),
                    Err(e) => log::error!("could not create sector map {}: {:#}", i, e),
                }
            }

            let (Some(unit), Some(handle)) = (data.texture_unit, data.texture) else {
                log::error!("sector map {} has no texture", i);
                continue;
            };
            backend.bind_texture(unit, handle);
            backend.set_uniform(&format!("sectorMap{}", slot), unit.as_uniform());
            if slot != i {
                if let Some(level) = adopted.levels.get(i) {
                    backend.set_uniform(&format!("sectors[{}].origin", slot), Uniform::Vec3(level.origin));
                    backend.set_uniform(&format!("sectors[{}].dimensions", slot), Uniform::UVec2(level.dimensions));
                }
            }
            slot += 1;
        }

        for (i, sector) in adopted.sectors.iter().enumerate() {
            sector.light.send(&format!("sectorLights[{}]", i), backend);
        }
    }

    /// Destroys the GPU textures and returns the texture units.
    pub fn release(&self, backend: &mut dyn RenderBackend) {
        for data in lock(&self.textures).iter_mut() {
            if let Some(unit) = data.texture_unit.take() {
                self.pool.release(unit);
            }
            if let Some(handle) = data.texture.take() {
                backend.destroy_texture(handle);
            }
        }
    }
}

impl Drop for SectorIlluminator {
    fn drop(&mut self) {
        let textures = self
            .textures
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for data in textures.iter_mut() {
            if let Some(unit) = data.texture_unit.take() {
                self.pool.release(unit);
            }
        }
    }
}
