//! Committed strokes plus the stroke currently being drawn.

use kurbo::Point;

use crate::camera::Camera;
use crate::render::{STROKE_COLOR, Surface, stroke_style};
use crate::stroke::{Stroke, is_finite, polyline};

/// Owns committed strokes in receipt order and the in-progress buffer.
#[derive(Debug, Clone, Default)]
pub struct StrokeStore {
    committed: Vec<Stroke>,
    in_progress: Option<Vec<Point>>,
}

impl StrokeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed strokes, oldest first.
    pub fn strokes(&self) -> &[Stroke] {
        &self.committed
    }

    /// Points of the stroke being drawn, if any.
    pub fn in_progress(&self) -> Option<&[Point]> {
        self.in_progress.as_deref()
    }

    /// Whether a stroke is currently being drawn.
    pub fn is_drawing(&self) -> bool {
        self.in_progress.is_some()
    }

    /// Start a new stroke at `point`.
    ///
    /// Returns false, leaving state untouched, if a stroke is already in
    /// progress or the point is not finite.
    pub fn begin_stroke(&mut self, point: Point) -> bool {
        if self.in_progress.is_some() || !is_finite(point) {
            return false;
        }
        self.in_progress = Some(vec![point]);
        true
    }

    /// Append a point to the stroke in progress.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        match self.in_progress.as_mut() {
            Some(points) if is_finite(point) => {
                points.push(point);
                true
            }
            _ => false,
        }
    }

    /// Move the stroke in progress into the committed list.
    ///
    /// Returns the committed stroke so it can be sent to peers, or `None`
    /// when there was nothing to commit.
    pub fn commit_stroke(&mut self) -> Option<Stroke> {
        let points = self.in_progress.take()?;
        let stroke = Stroke::from_points(points)?;
        self.committed.push(stroke.clone());
        Some(stroke)
    }

    /// Append a stroke received from a peer.
    ///
    /// Strokes left with no usable points are discarded.
    pub fn apply_remote_stroke(&mut self, stroke: Stroke) -> bool {
        match stroke.sanitized() {
            Some(stroke) => {
                self.committed.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Redraw everything under `camera`.
    pub fn render(&self, surface: &mut dyn Surface, camera: &Camera, stroke_width: f64) {
        surface.clear();

        let transform = camera.transform();
        let style = stroke_style(stroke_width, camera.zoom);

        for stroke in &self.committed {
            surface.stroke_path(&stroke.to_path(transform), &style, STROKE_COLOR);
        }
        if let Some(points) = self.in_progress.as_deref().filter(|p| !p.is_empty()) {
            surface.stroke_path(&polyline(points, transform), &style, STROKE_COLOR);
        }
    }
}
