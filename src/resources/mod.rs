/**
 * This module contains all logic that synthesizes renderable models from
 * architectural data.
 */
pub mod wall_model;

pub use wall_model::{WALL_RIG_ID, WallModel, WallModelLoader};
