//! Gridded field sources and temporal aggregation.
//!
//! A [`FieldSource`] yields a [`RawDataset`]: coordinate axes, a decoded time
//! axis and the requested variables, restricted to the samples spanning the
//! analysis window. [`select_and_reduce`] then picks the in-window samples
//! and collapses them into a single 2D field.
//!
//! Sources are opened from a descriptor string:
//! - `*.json` paths are read as [`GridDocument`]s
//! - wildcard paths (`/data/geos_*.nc4`) are expanded, sorted and
//!   concatenated along time
//! - anything else (NetCDF paths, OPeNDAP URLs) goes to the native reader,
//!   available with the `netcdf` feature

pub mod aggregate;
pub mod dataset;
pub mod json;
#[cfg(feature = "netcdf")]
pub mod native;
pub mod paths;

use tracing::info;

use plume_common::{AnalysisWindow, PlumeError, PlumeResult};

pub use aggregate::{select_and_reduce, SelectionRequest};
pub use dataset::{DimRole, RawDataset, RawVariable};
pub use json::{GridDocument, JsonFieldSource};
#[cfg(feature = "netcdf")]
pub use native::NetCdfFieldSource;

/// A readable gridded dataset.
pub trait FieldSource: Send + Sync {
    /// Identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Read the coordinate axes and the named variables.
    ///
    /// Only the time steps given by [`AnalysisWindow::index_range`] are
    /// read. Fails with `VariableNotFound` if any variable is absent.
    fn load(&self, variables: &[String], window: &AnalysisWindow) -> PlumeResult<RawDataset>;
}

/// Several sources concatenated along time, in order.
pub struct MultiFileSource {
    parts: Vec<Box<dyn FieldSource>>,
    name: String,
}

impl MultiFileSource {
    pub fn new(parts: Vec<Box<dyn FieldSource>>) -> Self {
        let name = parts
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ");
        Self { parts, name }
    }
}

impl FieldSource for MultiFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, variables: &[String], window: &AnalysisWindow) -> PlumeResult<RawDataset> {
        let datasets = self
            .parts
            .iter()
            .map(|p| p.load(variables, window))
            .collect::<PlumeResult<Vec<_>>>()?;
        RawDataset::concat_time(datasets)
    }
}

/// Open a source from its descriptor.
pub fn open_source(descriptor: &str) -> PlumeResult<Box<dyn FieldSource>> {
    if paths::has_wildcard(descriptor) {
        let files = paths::expand_wildcard(descriptor)?;
        info!(pattern = descriptor, files = files.len(), "Opening multi-file source");
        let parts = files
            .iter()
            .map(|f| open_single(&f.to_string_lossy()))
            .collect::<PlumeResult<Vec<_>>>()?;
        return Ok(Box::new(MultiFileSource::new(parts)));
    }
    open_single(descriptor)
}

fn open_single(descriptor: &str) -> PlumeResult<Box<dyn FieldSource>> {
    if !paths::is_remote(descriptor) && descriptor.to_lowercase().ends_with(".json") {
        return Ok(Box::new(JsonFieldSource::new(descriptor)));
    }
    open_netcdf(descriptor)
}

#[cfg(feature = "netcdf")]
fn open_netcdf(descriptor: &str) -> PlumeResult<Box<dyn FieldSource>> {
    Ok(Box::new(NetCdfFieldSource::new(descriptor)))
}

#[cfg(not(feature = "netcdf"))]
fn open_netcdf(descriptor: &str) -> PlumeResult<Box<dyn FieldSource>> {
    Err(PlumeError::DataUnavailable(format!(
        "cannot open {}: built without the `netcdf` feature",
        descriptor
    )))
}
