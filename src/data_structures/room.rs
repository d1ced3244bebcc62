use cgmath::Vector2;

use crate::{
    geometry::{BoundingBox, LineSegment, polygon_edges},
    lighting::directional::DirectionalLight,
};

/// A room: an outline on one level and the light that fills it.
#[derive(Clone, Debug, PartialEq)]
pub struct Room {
    pub background_light: DirectionalLight,
    pub points: Vec<Vector2<f32>>,
}

impl Room {
    pub fn new(points: Vec<Vector2<f32>>, background_light: DirectionalLight) -> Self {
        Self {
            background_light,
            points,
        }
    }

    pub fn edges(&self) -> Vec<LineSegment<Vector2<f32>>> {
        polygon_edges(&self.points)
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points.iter().copied())
    }
}
