//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Size, Vec2};

/// Smallest zoom the view can reach.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom the view can reach.
pub const MAX_ZOOM: f64 = 10.0;
/// Step used by the zoom in / zoom out commands.
pub const DEFAULT_ZOOM_STEP: f64 = 1.2;
/// Exponent applied per wheel notch.
pub const DEFAULT_WHEEL_INTENSITY: f64 = 0.1;

/// Camera manages the view transform for the canvas.
///
/// It handles panning (translation) and zooming (scaling) operations,
/// converting between screen coordinates and world coordinates.
/// `zoom` is kept inside `[MIN_ZOOM, MAX_ZOOM]` by every operation, so the
/// inverse transform is never singular.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// Current zoom level.
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    /// Create a new camera at the home view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts world coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Get the inverse transform for input handling.
    ///
    /// This transform converts screen coordinates to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.offset.x) / self.zoom,
            (screen_point.y - self.offset.y) / self.zoom,
        )
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        Point::new(
            world_point.x * self.zoom + self.offset.x,
            world_point.y * self.zoom + self.offset.y,
        )
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom the camera, keeping the given screen point fixed.
    ///
    /// Factors that are not finite and positive are ignored.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let world_point = self.screen_to_world(screen_point);
        self.zoom = new_zoom;

        // Solve offset so world_point lands back on screen_point
        self.offset = Vec2::new(
            screen_point.x - world_point.x * new_zoom,
            screen_point.y - world_point.y * new_zoom,
        );
    }

    /// Zoom in around the center of the viewport.
    pub fn zoom_in(&mut self, viewport: Size, factor: f64) {
        self.zoom_at(viewport_center(viewport), factor);
    }

    /// Zoom out around the center of the viewport.
    pub fn zoom_out(&mut self, viewport: Size, factor: f64) {
        self.zoom_at(viewport_center(viewport), 1.0 / factor);
    }

    /// Reset camera to default position and zoom.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Zoom factor for one wheel event.
///
/// Scrolling up (negative `delta_y`) zooms in by `exp(intensity)`, anything
/// else zooms out by `exp(-intensity)`.
pub fn wheel_factor(delta_y: f64, intensity: f64) -> f64 {
    let direction = if -delta_y > 0.0 { 1.0 } else { -1.0 };
    (direction * intensity).exp()
}

fn viewport_center(viewport: Size) -> Point {
    Point::new(viewport.width / 2.0, viewport.height / 2.0)
}
