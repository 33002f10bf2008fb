//! Vello-backed drawing surface.

use inkshare_core::render::Surface;
use kurbo::{Affine, BezPath, Rect, Size};
use peniko::{Color, Fill};
use vello::Scene;

/// Paper color behind the strokes.
pub const BACKGROUND_COLOR: Color = Color::from_rgba8(255, 255, 255, 255);

/// Records board drawing into a [`vello::Scene`].
///
/// The host renders the scene to its window surface after each redraw.
pub struct SceneSurface {
    scene: Scene,
    viewport: Size,
    background: Color,
}

impl SceneSurface {
    /// Create a surface covering `viewport` (logical pixels).
    pub fn new(viewport: Size) -> Self {
        Self {
            scene: Scene::new(),
            viewport,
            background: BACKGROUND_COLOR,
        }
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Track a new surface size.
    pub fn resize(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// The scene built so far.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

impl Surface for SceneSurface {
    fn clear(&mut self) {
        self.scene.reset();
        let bounds = Rect::from_origin_size((0.0, 0.0), self.viewport);
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, self.background, None, &bounds);
    }

    fn stroke_path(&mut self, path: &BezPath, style: &kurbo::Stroke, color: Color) {
        // Paths arrive in screen space already
        self.scene.stroke(style, Affine::IDENTITY, color, None, path);
    }
}
