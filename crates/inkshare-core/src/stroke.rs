//! Freehand strokes in world coordinates.

use kurbo::{Affine, BezPath, Point};
use serde::{Deserialize, Serialize};

/// A committed freehand stroke (series of world-space points).
///
/// Serializes as a bare array of `{x, y}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    /// Build a stroke from points, dropping any that are not finite.
    ///
    /// Returns `None` if no point survives.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let points: Vec<Point> = points.into_iter().filter(|p| is_finite(*p)).collect();
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    /// Re-check a stroke that arrived from elsewhere.
    pub fn sanitized(self) -> Option<Self> {
        Self::from_points(self.points)
    }

    /// Points in drawing order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the stroke holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Screen-space polyline for this stroke under `transform`.
    pub fn to_path(&self, transform: Affine) -> BezPath {
        polyline(&self.points, transform)
    }
}

/// Whether a point can be admitted into a stroke.
pub fn is_finite(point: Point) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

/// Connected polyline through `points`, each mapped by `transform`.
///
/// A single point becomes a zero-length segment so round caps draw a dot.
pub(crate) fn polyline(points: &[Point], transform: Affine) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = points.split_first() else {
        return path;
    };

    let start = transform * *first;
    path.move_to(start);
    if rest.is_empty() {
        path.line_to(start);
        return path;
    }
    for point in rest {
        path.line_to(transform * *point);
    }
    path
}
