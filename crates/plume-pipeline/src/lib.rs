//! Contour plume extraction pipeline.
//!
//! Reads a gridded field, reduces it over the analysis window, traces the
//! configured levels into polygons, writes them as a feature collection and
//! renders diagnostic figures from the written file.

pub mod config;
pub mod pipeline;
pub mod reporter;

pub use config::{FigureConfig, PipelineConfig, DEFAULT_FILL_LEVEL, DEFAULT_INPUT};
pub use pipeline::{Pipeline, PipelineReport};
pub use reporter::{PipelineEvent, RecordingReporter, Reporter, TracingReporter};
