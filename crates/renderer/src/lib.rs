//! Diagnostic images for contour plumes.
//!
//! - [`render_level`]: filled polygons of one level, read back from a
//!   written collection, over an ocean/land backdrop in plate carrée,
//!   under a drawn title band
//! - [`render_contour_preview`]: raw traced contour lines per level
//! - [`png`]: the PNG encoder both use

pub mod backdrop;
pub mod diagnostic;
pub mod png;
pub mod preview;
pub mod projection;
pub mod title;

pub use backdrop::Backdrop;
pub use diagnostic::{render_level, RenderSummary};
pub use preview::render_contour_preview;
pub use projection::{MapView, PlateCarree};
