//! lot-ngin
//!
//! The geometry and lighting core of a lot-based life-simulation renderer.
//! Sparse architectural data (wall segments per grid edge, convex light
//! sectors, rooms) is turned into renderable meshes and lightmaps, and kept
//! up to date while the player edits the building. Lightmap rasterization
//! runs off the render thread; the render loop only ever polls.
//!
//! High-level modules
//! - `config`: engine configuration loaded from TOML
//! - `context`: headless GPU context that owns device/queue
//! - `data_structures`: transforms, meshes, materials, the scene graph, atlases
//! - `geometry`: segment intersection, ray crossing parity and bounding boxes
//! - `lighting`: sector illuminator and the room based lightmap manager
//! - `pipelines`: name-addressed uniform blocks and the wgpu render backend
//! - `render`: the backend seam every draw/send call goes through
//! - `resources`: loaders that synthesize models from architectural data
//!

pub mod config;
pub mod context;
pub mod data_structures;
pub mod geometry;
pub mod lighting;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
