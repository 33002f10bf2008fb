//! InkShare Render Library
//!
//! GPU drawing surfaces for InkShare boards.
//! The default implementation records into a Vello scene.

#[cfg(feature = "vello-renderer")]
mod vello_impl;

#[cfg(feature = "vello-renderer")]
pub use vello_impl::{BACKGROUND_COLOR, SceneSurface};
