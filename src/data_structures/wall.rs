//! Wall segments as produced by the building editor.

use std::sync::Arc;

use cgmath::Vector2;
use image::RgbaImage;

/// A wall covering. Two wallpapers are the same if their ids match.
#[derive(Clone, Debug)]
pub struct Wallpaper {
    pub id: String,
    pub surface: Arc<RgbaImage>,
}

impl Wallpaper {
    pub fn new(id: impl Into<String>, surface: Arc<RgbaImage>) -> Self {
        Self {
            id: id.into(),
            surface,
        }
    }
}

impl PartialEq for Wallpaper {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Front and back wallpaper of one unit of wall.
#[derive(Clone, Debug, PartialEq)]
pub struct Sides {
    pub front: Wallpaper,
    pub back: Wallpaper,
}

impl Sides {
    pub fn new(front: Wallpaper, back: Wallpaper) -> Self {
        Self { front, back }
    }

    /// The same wall seen from the other side.
    pub fn swapped(&self) -> Self {
        Self {
            front: self.back.clone(),
            back: self.front.clone(),
        }
    }
}

/// A straight run of wall between two grid points, one `Sides` per unit step.
#[derive(Clone, Debug, PartialEq)]
pub struct WallSegment {
    pub start: Vector2<i32>,
    pub end: Vector2<i32>,
    pub faces: Vec<Sides>,
}

impl WallSegment {
    pub fn new(start: Vector2<i32>, end: Vector2<i32>, faces: Vec<Sides>) -> Self {
        Self { start, end, faces }
    }

    /// Unit step along the segment, or `None` unless it runs along one of the
    /// eight grid directions.
    pub fn direction(&self) -> Option<Vector2<i32>> {
        let delta = self.end - self.start;
        if delta == Vector2::new(0, 0) {
            return None;
        }
        if delta.x != 0 && delta.y != 0 && delta.x.abs() != delta.y.abs() {
            return None;
        }
        Some(Vector2::new(delta.x.signum(), delta.y.signum()))
    }

    /// Number of unit steps from start to end (the diagonal of a cell is one step).
    ///
    /// This is the Chebyshev distance, not the rounded Euclidean length: a
    /// diagonal run of `n` cells has `n` faces rather than `round(n * sqrt(2))`.
    pub fn steps(&self) -> u32 {
        let delta = self.end - self.start;
        delta.x.unsigned_abs().max(delta.y.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: (i32, i32), end: (i32, i32)) -> WallSegment {
        WallSegment::new(Vector2::new(start.0, start.1), Vector2::new(end.0, end.1), Vec::new())
    }

    #[test]
    fn directions_follow_the_grid() {
        assert_eq!(segment((0, 0), (3, 0)).direction(), Some(Vector2::new(1, 0)));
        assert_eq!(segment((2, 5), (2, 1)).direction(), Some(Vector2::new(0, -1)));
        assert_eq!(segment((4, 0), (1, 3)).direction(), Some(Vector2::new(-1, 1)));
        assert_eq!(segment((0, 0), (2, 1)).direction(), None);
        assert_eq!(segment((1, 1), (1, 1)).direction(), None);
    }

    #[test]
    fn diagonal_steps_count_cells() {
        assert_eq!(segment((0, 0), (3, 0)).steps(), 3);
        assert_eq!(segment((0, 0), (3, 3)).steps(), 3);
    }
}
