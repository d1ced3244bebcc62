//! Engine data structures: transforms, meshes, materials, the scene graph and
//! the architectural inputs it is built from.
//!
//! - `transform` holds position/scale/rotation with a cached model matrix
//! - `mesh` contains CPU meshes, vertex layouts and the face mesh generator
//! - `material` bundles shaders and material uniforms into a `Style`
//! - `scene_graph` enables hierarchical scene organization
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds per-draw model matrices as GPU instance data
//! - `packing` and `atlas` place rectangles and images onto shared boards
//! - `wall` and `room` describe the building as the editor produces it

pub mod atlas;
pub mod instance;
pub mod material;
pub mod mesh;
pub mod packing;
pub mod room;
pub mod scene_graph;
pub mod texture;
pub mod transform;
pub mod wall;
