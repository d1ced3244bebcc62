//! Bakes the lightmaps and wall atlases of a lot description into PNGs.
//!
//! ```text
//! lot-bake lot.toml --config engine.toml --out baked/
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, bail};
use cgmath::{Vector2, Vector3};
use clap::Parser;
use image::{Rgba, RgbaImage};
use serde::Deserialize;

use lot_ngin::{
    config::EngineConfig,
    data_structures::{
        material::Shader,
        room::Room,
        wall::{Sides, WallSegment, Wallpaper},
    },
    lighting::{
        directional::DirectionalLight,
        lightmap_manager::LightmapManager,
        sector_illuminator::{Sector, SectorIlluminator},
    },
    render::TextureUnitPool,
    resources::WallModelLoader,
};

#[derive(Parser, Debug)]
#[command(name = "lot-bake", version, about = "Bake lot lightmaps and wall atlases")]
struct Cli {
    /// Lot description (TOML)
    lot: PathBuf,
    /// Engine configuration (TOML); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output directory
    #[arg(short, long, default_value = "baked")]
    out: PathBuf,
}

#[derive(Debug, Deserialize)]
struct LightDef {
    direction: [f32; 3],
    ambient: [f32; 3],
    diffuse: [f32; 3],
    specular: [f32; 3],
}

impl From<&LightDef> for DirectionalLight {
    fn from(light: &LightDef) -> Self {
        DirectionalLight::new(
            light.direction.into(),
            light.ambient.into(),
            light.diffuse.into(),
            light.specular.into(),
        )
    }
}

fn light_or_outdoor(light: &Option<LightDef>) -> DirectionalLight {
    light.as_ref().map(DirectionalLight::from).unwrap_or_else(DirectionalLight::outdoor)
}

#[derive(Debug, Deserialize)]
struct LevelDef {
    origin: [f32; 3],
    dimensions: [u32; 2],
}

#[derive(Debug, Deserialize)]
struct SectorDef {
    points: Vec<[f32; 3]>,
    light: Option<LightDef>,
}

#[derive(Debug, Deserialize)]
struct RoomDef {
    #[serde(default)]
    level: usize,
    points: Vec<[f32; 2]>,
    light: Option<LightDef>,
}

#[derive(Debug, Deserialize)]
struct WallpaperDef {
    id: String,
    color: [u8; 4],
    #[serde(default = "default_wallpaper_size")]
    size: u32,
}

fn default_wallpaper_size() -> u32 {
    16
}

#[derive(Debug, Deserialize)]
struct WallDef {
    #[serde(default)]
    level: usize,
    start: [i32; 2],
    end: [i32; 2],
    front: String,
    back: String,
}

#[derive(Debug, Deserialize)]
struct LotDef {
    #[serde(default)]
    levels: Vec<LevelDef>,
    #[serde(default)]
    sectors: Vec<SectorDef>,
    #[serde(default)]
    rooms: Vec<RoomDef>,
    #[serde(default)]
    wallpapers: Vec<WallpaperDef>,
    #[serde(default)]
    walls: Vec<WallDef>,
}

fn bake_sectors(lot: &LotDef, config: &EngineConfig, pool: &TextureUnitPool, out: &Path) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("could not start runtime")?;
    let illuminator = SectorIlluminator::new(runtime.handle().clone(), pool.clone(), config);
    for level in &lot.levels {
        illuminator.set_level_data(level.origin.into(), level.dimensions.into());
    }
    for sector in &lot.sectors {
        let points = sector.points.iter().map(|p| Vector3::from(*p)).collect::<Vec<_>>();
        illuminator.insert(Sector::from_points(&points, light_or_outdoor(&sector.light)));
    }

    for (level, map) in illuminator.generate_now().iter().enumerate() {
        let path = out.join(format!("sectors_level{}.png", level));
        map.to_image()
            .save(&path)
            .with_context(|| format!("could not write {}", path.display()))?;
        log::info!("wrote {} ({}x{})", path.display(), map.width(), map.height());
    }
    Ok(())
}

fn bake_rooms(lot: &LotDef, config: &EngineConfig, pool: &TextureUnitPool, out: &Path) -> anyhow::Result<()> {
    if lot.rooms.is_empty() {
        return Ok(());
    }
    let level_count = lot.rooms.iter().map(|room| room.level + 1).max().unwrap_or(0);
    let mut room_levels = vec![Vec::new(); level_count];
    for room in &lot.rooms {
        let points = room.points.iter().map(|p| Vector2::from(*p)).collect();
        room_levels[room.level].push(Room::new(points, light_or_outdoor(&room.light)));
    }

    let mut manager = LightmapManager::new(pool.clone(), config);
    manager.set_rooms(room_levels);
    if let Some(map) = manager.map() {
        let path = out.join("rooms.png");
        map.to_image()
            .save(&path)
            .with_context(|| format!("could not write {}", path.display()))?;
        log::info!("wrote {} with {} rooms", path.display(), manager.rooms().len());
    }
    Ok(())
}

fn bake_walls(lot: &LotDef, config: &EngineConfig, out: &Path) -> anyhow::Result<()> {
    let wallpapers = lot
        .wallpapers
        .iter()
        .map(|def| {
            let surface = RgbaImage::from_pixel(def.size, def.size, Rgba(def.color));
            (def.id.clone(), Wallpaper::new(def.id.clone(), Arc::new(surface)))
        })
        .collect::<BTreeMap<_, _>>();
    let wallpaper = |id: &str| {
        wallpapers
            .get(id)
            .cloned()
            .with_context(|| format!("unknown wallpaper {}", id))
    };

    let mut levels: BTreeMap<usize, Vec<WallSegment>> = BTreeMap::new();
    for wall in &lot.walls {
        let start = Vector2::from(wall.start);
        let end = Vector2::from(wall.end);
        let sides = Sides::new(wallpaper(&wall.front)?, wallpaper(&wall.back)?);
        let segment = WallSegment::new(start, end, Vec::new());
        let faces = vec![sides; segment.steps() as usize];
        levels
            .entry(wall.level)
            .or_default()
            .push(WallSegment { faces, ..segment });
    }

    let shader = Arc::new(Shader::new("walls"));
    for (level, segments) in levels {
        let Some(level_def) = lot.levels.get(level) else {
            bail!("walls reference level {} but the lot defines {} levels", level, lot.levels.len());
        };
        let count = segments.len();
        let loader = WallModelLoader::new(level_def.dimensions.into(), level as u32, segments, config);
        let model = loader.load(shader.clone());
        let path = out.join(format!("wall_atlas_level{}.png", level));
        model
            .atlas
            .save(&path)
            .with_context(|| format!("could not write {}", path.display()))?;
        log::info!(
            "wrote {}; {} segments became {} corner models",
            path.display(),
            count,
            model.root.child_count()
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let source = std::fs::read_to_string(&cli.lot)
        .with_context(|| format!("could not read lot {}", cli.lot.display()))?;
    let lot: LotDef = toml::from_str(&source).with_context(|| format!("invalid lot {}", cli.lot.display()))?;
    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("could not create {}", cli.out.display()))?;

    let pool = TextureUnitPool::new(config.texture_units, 1);
    bake_sectors(&lot, &config, &pool, &cli.out)?;
    bake_rooms(&lot, &config, &pool, &cli.out)?;
    bake_walls(&lot, &config, &cli.out)?;
    Ok(())
}
