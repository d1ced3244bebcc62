//! Light sources and the lightmaps that assign them to surfaces.
//!
//! - `directional` is the light description shared by sectors and rooms
//! - `lightmap` is the CPU raster both illuminators produce
//! - `sector_illuminator` rasterizes light sectors per level off the render thread
//! - `lightmap_manager` packs room rasters into one shared map

pub mod directional;
pub mod lightmap;
pub mod lightmap_manager;
pub mod sector_illuminator;
