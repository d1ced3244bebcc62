//! Engine configuration.
//!
//! Every key is optional in the TOML source; missing keys fall back to the
//! values returned by [`EngineConfig::default`].

use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Exponent for sector lightmap texels per world unit (`10^n`, capped at 100).
    #[serde(default = "default_sector_resolution")]
    pub sector_resolution: u32,
    /// Texels per world unit in the packed room map.
    #[serde(default = "default_room_map_resolution")]
    pub room_map_resolution: u32,
    #[serde(default = "default_room_map_min")]
    pub room_map_min_width: u32,
    #[serde(default = "default_room_map_min")]
    pub room_map_min_height: u32,
    #[serde(default = "default_max_sectors")]
    pub max_sector_levels: usize,
    #[serde(default = "default_max_sectors")]
    pub max_sector_textures: usize,
    /// Size of the texture unit pool. Unit 0 is reserved for material diffuse maps.
    #[serde(default = "default_texture_units")]
    pub texture_units: u32,
    #[serde(default = "default_height")]
    pub wall_height: f32,
    /// Vertical extent of one building level, also the band used for sector slice tests.
    #[serde(default = "default_height")]
    pub level_height: f32,
    /// Minimum side length of the packed wallpaper atlas.
    #[serde(default = "default_atlas_min_size")]
    pub atlas_min_size: u32,
}

fn default_sector_resolution() -> u32 {
    1
}
fn default_room_map_resolution() -> u32 {
    10
}
fn default_room_map_min() -> u32 {
    64
}
fn default_max_sectors() -> usize {
    8
}
fn default_texture_units() -> u32 {
    16
}
fn default_height() -> f32 {
    4.0
}
fn default_atlas_min_size() -> u32 {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sector_resolution: default_sector_resolution(),
            room_map_resolution: default_room_map_resolution(),
            room_map_min_width: default_room_map_min(),
            room_map_min_height: default_room_map_min(),
            max_sector_levels: default_max_sectors(),
            max_sector_textures: default_max_sectors(),
            texture_units: default_texture_units(),
            wall_height: default_height(),
            level_height: default_height(),
            atlas_min_size: default_atlas_min_size(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        toml::from_str(source).context("invalid engine configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("in {}", path.display()))
    }

    /// Effective sector lightmap texels per world unit.
    pub fn sector_texels_per_unit(&self) -> u32 {
        10u32.saturating_pow(self.sector_resolution).min(100)
    }
}
