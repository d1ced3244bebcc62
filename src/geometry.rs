//! Planar geometry helpers shared by the wall loader and the lightmap rasterizers.
//!
//! Everything here is pure: no allocation beyond the returned values and no
//! shared state. Points are `cgmath::Vector2<f32>`; callers that work in 3D
//! project with `truncate()` and apply their own vertical filtering.

use cgmath::Vector2;

/// A line segment between two points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment<V> {
    pub start: V,
    pub end: V,
}

impl<V> LineSegment<V> {
    pub fn new(start: V, end: V) -> Self {
        Self { start, end }
    }
}

impl<V: Copy> LineSegment<V> {
    pub fn map<U>(&self, f: impl Fn(V) -> U) -> LineSegment<U> {
        LineSegment {
            start: f(self.start),
            end: f(self.end),
        }
    }
}

/// Axis-aligned bounding box in the plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vector2<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = BoundingBox {
            min: first,
            max: first,
        };
        for point in points {
            bounds.min.x = bounds.min.x.min(point.x);
            bounds.min.y = bounds.min.y.min(point.y);
            bounds.max.x = bounds.max.x.max(point.x);
            bounds.max.y = bounds.max.y.max(point.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Inclusive on all four sides.
    pub fn contains(&self, point: Vector2<f32>) -> bool {
        point.x >= self.min.x
            && point.y >= self.min.y
            && point.x <= self.max.x
            && point.y <= self.max.y
    }
}

/**
 * Tests whether two segments share at least one point.
 *
 * Solves both parametric line equations; the segments intersect when both
 * parameters fall within `[0, 1]`. Parallel and collinear segments report no
 * intersection.
 */
pub fn segments_intersect(a: &LineSegment<Vector2<f32>>, b: &LineSegment<Vector2<f32>>) -> bool {
    let (p1, p2) = (a.start, a.end);
    let (p3, p4) = (b.start, b.end);

    let denominator = (p4.x - p3.x) * (p1.y - p2.y) - (p1.x - p2.x) * (p4.y - p3.y);
    if denominator == 0.0 {
        return false;
    }

    let ta = ((p3.y - p4.y) * (p1.x - p3.x) + (p4.x - p3.x) * (p1.y - p3.y)) / denominator;
    let tb = ((p1.y - p2.y) * (p1.x - p3.x) + (p2.x - p1.x) * (p1.y - p3.y)) / denominator;

    (0.0..=1.0).contains(&ta) && (0.0..=1.0).contains(&tb)
}

/// Closes a point loop into its edge list (last point connects to the first).
pub fn polygon_edges(points: &[Vector2<f32>]) -> Vec<LineSegment<Vector2<f32>>> {
    let len = points.len();
    (0..len)
        .map(|i| LineSegment::new(points[i], points[(i + 1) % len]))
        .collect()
}

/// Largest x coordinate touched by any edge; `f32::MIN` for no edges.
pub fn polygon_max_x<'a, I>(edges: I) -> f32
where
    I: IntoIterator<Item = &'a LineSegment<Vector2<f32>>>,
{
    edges
        .into_iter()
        .fold(f32::MIN, |max, edge| max.max(edge.start.x).max(edge.end.x))
}

/**
 * Counts how many edges a horizontal needle from `point` to `reach_x` crosses.
 *
 * An edge only counts when it straddles the needle under a half-open rule
 * (one endpoint strictly above, the other at or below). A needle passing
 * exactly through a shared vertex is therefore counted once, and horizontal
 * edges never count.
 */
pub fn needle_crossings<I>(point: Vector2<f32>, reach_x: f32, edges: I) -> usize
where
    I: IntoIterator<Item = LineSegment<Vector2<f32>>>,
{
    let needle = LineSegment::new(point, Vector2::new(reach_x, point.y));
    edges
        .into_iter()
        .filter(|edge| (edge.start.y > point.y) != (edge.end.y > point.y))
        .filter(|edge| segments_intersect(&needle, edge))
        .count()
}

/// Odd crossing count means inside.
pub fn point_in_polygon(point: Vector2<f32>, edges: &[LineSegment<Vector2<f32>>]) -> bool {
    let reach_x = polygon_max_x(edges) + 1.0;
    needle_crossings(point, reach_x, edges.iter().copied()) % 2 == 1
}
