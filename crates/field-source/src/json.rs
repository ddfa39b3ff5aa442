//! JSON grid documents.
//!
//! A lightweight interchange format for gridded fields, mainly used for
//! fixtures and for environments built without the native NetCDF reader:
//!
//! ```json
//! {
//!   "lon": [0.0, 1.0], "lat": [10.0, 11.0],
//!   "time": ["2020-01-01T00:00:00"],
//!   "variables": {
//!     "pm25": { "dims": ["time", "lat", "lon"], "values": [1.0, null, 3.0, 4.0] }
//!   }
//! }
//! ```
//!
//! `null` marks a missing cell. `shape` may be given per variable and is
//! required when a dimension is not one of time/lat/lon.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use plume_common::{AnalysisWindow, PlumeError, PlumeResult};

use crate::dataset::{DimRole, RawDataset, RawVariable};
use crate::FieldSource;

const TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Serialized form of a gridded dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GridDocument {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    #[serde(default)]
    pub time: Vec<String>,
    pub variables: BTreeMap<String, VariableDocument>,
}

/// Serialized form of one variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariableDocument {
    pub dims: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    pub values: Vec<Option<f32>>,
}

impl GridDocument {
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> Self {
        Self {
            lon,
            lat,
            ..Default::default()
        }
    }

    /// Set the time axis.
    pub fn with_times(mut self, times: &[NaiveDateTime]) -> Self {
        self.time = times
            .iter()
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
            .collect();
        self
    }

    /// Add a variable. `NaN` values are stored as `null`.
    pub fn with_variable(mut self, name: &str, dims: &[&str], values: &[f32]) -> Self {
        self.variables.insert(
            name.to_string(),
            VariableDocument {
                dims: dims.iter().map(|d| d.to_string()).collect(),
                shape: None,
                values: values
                    .iter()
                    .map(|v| if v.is_nan() { None } else { Some(*v) })
                    .collect(),
            },
        );
        self
    }

    /// Add a variable with an explicit shape (needed for extra dimensions).
    pub fn with_shaped_variable(
        mut self,
        name: &str,
        dims: &[&str],
        shape: &[usize],
        values: &[f32],
    ) -> Self {
        self = self.with_variable(name, dims, values);
        if let Some(var) = self.variables.get_mut(name) {
            var.shape = Some(shape.to_vec());
        }
        self
    }

    /// Write the document as JSON.
    pub fn write_to(&self, path: impl AsRef<Path>) -> PlumeResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec(self).map_err(|e| PlumeError::write_failed(path, e))?;
        fs::write(path, json).map_err(|e| PlumeError::write_failed(path, e))
    }

    /// Decode into a dataset holding only the requested variables.
    pub fn into_dataset(self, source_name: &str, variables: &[String]) -> PlumeResult<RawDataset> {
        let invalid = |message: String| PlumeError::InvalidFormat {
            source_name: source_name.to_string(),
            message,
        };

        let times = self
            .time
            .iter()
            .map(|s| parse_time(s).ok_or_else(|| invalid(format!("bad timestamp '{}'", s))))
            .collect::<PlumeResult<Vec<_>>>()?;

        let mut decoded = BTreeMap::new();
        let mut documents = self.variables;
        for name in variables {
            let doc = documents
                .remove(name)
                .ok_or_else(|| PlumeError::VariableNotFound {
                    variable: name.clone(),
                    source_name: source_name.to_string(),
                })?;

            let shape = match doc.shape {
                Some(shape) => shape,
                None => doc
                    .dims
                    .iter()
                    .map(|d| match DimRole::classify(d) {
                        DimRole::Time => Ok(times.len().max(1)),
                        DimRole::Lat => Ok(self.lat.len()),
                        DimRole::Lon => Ok(self.lon.len()),
                        DimRole::Other => Err(invalid(format!(
                            "variable '{}' needs an explicit shape for dimension '{}'",
                            name, d
                        ))),
                    })
                    .collect::<PlumeResult<Vec<_>>>()?,
            };
            let values = doc
                .values
                .into_iter()
                .map(|v| v.unwrap_or(f32::NAN))
                .collect();
            let var = RawVariable::new(doc.dims, shape, values)
                .map_err(|e| invalid(format!("variable '{}': {}", name, e)))?;
            decoded.insert(name.clone(), var);
        }

        Ok(RawDataset {
            source_name: source_name.to_string(),
            lon: self.lon,
            lat: self.lat,
            times,
            variables: decoded,
        })
    }
}

fn parse_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Field source backed by a JSON grid document on disk.
#[derive(Debug, Clone)]
pub struct JsonFieldSource {
    path: PathBuf,
    name: String,
}

impl JsonFieldSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl FieldSource for JsonFieldSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, variables: &[String], window: &AnalysisWindow) -> PlumeResult<RawDataset> {
        let bytes = fs::read(&self.path).map_err(|e| {
            PlumeError::DataUnavailable(format!("cannot read {}: {}", self.name, e))
        })?;
        let doc: GridDocument =
            serde_json::from_slice(&bytes).map_err(|e| PlumeError::InvalidFormat {
                source_name: self.name.clone(),
                message: e.to_string(),
            })?;
        debug!(
            source = %self.name,
            nlon = doc.lon.len(),
            nlat = doc.lat.len(),
            ntime = doc.time.len(),
            "Parsed JSON grid document"
        );
        let dataset = doc.into_dataset(&self.name, variables)?;
        let range = window.index_range(&dataset.times);
        dataset.slice_time(range)
    }
}
