//! Rendering contract for the stroke store.
//!
//! The core never talks to a graphics API directly. Anything that can clear
//! itself and stroke a screen-space path implements [`Surface`].

use kurbo::{BezPath, Cap, Join};
use peniko::Color;

/// Line width of a stroke at zoom 1.0, in world units.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Color every stroke is drawn with.
pub const STROKE_COLOR: Color = Color::from_rgba8(0, 0, 0, 255);

/// A target the renderer can draw into.
pub trait Surface {
    /// Erase everything drawn so far.
    fn clear(&mut self);

    /// Stroke a path given in screen coordinates.
    fn stroke_path(&mut self, path: &BezPath, style: &kurbo::Stroke, color: Color);
}

/// Stroke style for a given world width and zoom.
///
/// Width scales with zoom so lines keep their world thickness.
pub fn stroke_style(width: f64, zoom: f64) -> kurbo::Stroke {
    kurbo::Stroke::new(width * zoom)
        .with_caps(Cap::Round)
        .with_join(Join::Round)
}

/// One recorded draw command.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Clear,
    Stroke {
        path: BezPath,
        width: f64,
        color: Color,
    },
}

/// Headless surface that records draw commands.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    /// Create an empty display list.
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands in the order they were issued.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Paths stroked since the last clear.
    pub fn paths(&self) -> Vec<&BezPath> {
        let start = self
            .commands
            .iter()
            .rposition(|cmd| matches!(cmd, DrawCommand::Clear))
            .map_or(0, |i| i + 1);
        self.commands[start..]
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Stroke { path, .. } => Some(path),
                DrawCommand::Clear => None,
            })
            .collect()
    }
}

impl Surface for DisplayList {
    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn stroke_path(&mut self, path: &BezPath, style: &kurbo::Stroke, color: Color) {
        self.commands.push(DrawCommand::Stroke {
            path: path.clone(),
            width: style.width,
            color,
        });
    }
}
