//! Axis-aligned boxes and marker quad helpers.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Four image-space points, normally ordered TL, TR, BR, BL.
pub type Quad = [Point2<f32>; 4];

/// Axis-aligned bounding box in photo pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Aabb {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    /// Box with top-left corner at `(x, y)` and the given extent.
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Point2::new(x, y), Point2::new(x + width, y + height))
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Inclusive overlap test: boxes sharing an edge or a corner count as overlapping.
    pub fn touches_or_overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Copy of this box shifted by `t`.
    pub fn translated(&self, t: Vector2<f64>) -> Aabb {
        Aabb::new(self.min + t, self.max + t)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(
            Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    /// Euclidean distance between the closest points of two boxes; 0 when they touch.
    pub fn gap_distance(&self, other: &Aabb) -> f64 {
        let dx = (other.min.x - self.max.x).max(self.min.x - other.max.x).max(0.0);
        let dy = (other.min.y - self.max.y).max(self.min.y - other.max.y).max(0.0);
        dx.hypot(dy)
    }
}

/// Mean of the four corners.
pub fn quad_centroid(q: &Quad) -> Point2<f32> {
    let sx: f32 = q.iter().map(|p| p.x).sum();
    let sy: f32 = q.iter().map(|p| p.y).sum();
    Point2::new(sx / 4.0, sy / 4.0)
}

/// Length of the edge from corner `i` to corner `(i + 1) % 4`.
pub fn quad_edge_length(q: &Quad, i: usize) -> f32 {
    let a = q[i % 4];
    let b = q[(i + 1) % 4];
    (b - a).norm()
}

/// Average of the two diagonal lengths `|p0 - p2|` and `|p1 - p3|`.
pub fn quad_mean_diagonal(q: &Quad) -> f32 {
    let d1 = (q[0] - q[2]).norm();
    let d2 = (q[1] - q[3]).norm();
    0.5 * (d1 + d2)
}

/// Shoelace area; positive for clockwise order in image (y-down) coordinates.
pub fn quad_signed_area(q: &Quad) -> f32 {
    let mut acc = 0.0_f32;
    for i in 0..4 {
        let a = q[i];
        let b = q[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}
