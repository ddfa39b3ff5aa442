//! Native NetCDF parsing using the netcdf library.
//!
//! Opens local NetCDF-3/4 files and OPeNDAP addresses (when libnetcdf was
//! built with DAP support). Only the coordinate variables and the requested
//! data variables are read, and of those only the time steps covering the
//! analysis window. Against a remote archive this keeps the request to a
//! single day instead of the whole collection.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Once;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use plume_common::{AnalysisWindow, CfTimeUnits, PlumeError, PlumeResult};

use crate::dataset::{DimRole, RawDataset, RawVariable};
use crate::FieldSource;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics even for errors that are handled,
/// e.g. when probing optional attributes. Safe to call more than once.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Field source backed by a NetCDF file path or OPeNDAP URL.
#[derive(Debug, Clone)]
pub struct NetCdfFieldSource {
    location: String,
}

impl NetCdfFieldSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> PlumeError {
        PlumeError::InvalidFormat {
            source_name: self.location.clone(),
            message: message.into(),
        }
    }

    fn read_coord(&self, file: &netcdf::File, names: &[&str]) -> PlumeResult<Vec<f64>> {
        for name in names {
            if let Some(var) = file.variable(name) {
                return var
                    .get_values::<f64, _>(..)
                    .map_err(|e| self.invalid(format!("failed to read '{}': {}", name, e)));
            }
        }
        Err(self.invalid(format!("missing coordinate {}", names.join(" or "))))
    }

    fn read_times(&self, file: &netcdf::File) -> PlumeResult<Vec<NaiveDateTime>> {
        let Some(var) = file.variable("time") else {
            return Ok(Vec::new());
        };
        let units = match var.attribute_value("units") {
            Some(Ok(netcdf::AttributeValue::Str(s))) => s,
            _ => return Err(self.invalid("time variable has no units attribute")),
        };
        let units = CfTimeUnits::parse(&units)?;
        let offsets: Vec<f64> = var
            .get_values(..)
            .map_err(|e| self.invalid(format!("failed to read time: {}", e)))?;
        offsets
            .into_iter()
            .map(|v| {
                units
                    .to_datetime(v)
                    .map_err(|_| self.invalid(format!("time offset {} is out of range", v)))
            })
            .collect()
    }

    /// Read a variable, restricted to `time_range` along its time dimension
    /// when one is given.
    fn read_variable(
        &self,
        file: &netcdf::File,
        name: &str,
        time_range: Option<&Range<usize>>,
    ) -> PlumeResult<RawVariable> {
        let var = file
            .variable(name)
            .ok_or_else(|| PlumeError::VariableNotFound {
                variable: name.to_string(),
                source_name: self.location.clone(),
            })?;

        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let mut shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        // Hyperslab: the window's time steps, everything else whole.
        let mut extents: Vec<netcdf::Extent> = Vec::with_capacity(shape.len());
        for (dim, len) in dims.iter().zip(shape.iter_mut()) {
            match time_range.filter(|_| DimRole::classify(dim) == DimRole::Time) {
                Some(time_range) => {
                    if time_range.end > *len {
                        return Err(self.invalid(format!(
                            "time range {:?} exceeds '{}' length {}",
                            time_range, name, len
                        )));
                    }
                    extents.push(time_range.clone().into());
                    *len = time_range.len();
                }
                None => extents.push((0..*len).into()),
            }
        }

        if shape.iter().product::<usize>() == 0 {
            return RawVariable::new(dims, shape, Vec::new());
        }

        debug!(variable = name, shape = ?shape, "Reading hyperslab");
        let raw: Vec<f32> = var
            .get_values(extents)
            .map_err(|e| self.invalid(format!("failed to read '{}': {}", name, e)))?;

        let scale = get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
        let offset = get_f64_attr(&var, "add_offset").unwrap_or(0.0);
        let fill = get_f64_attr(&var, "_FillValue").or_else(|| get_f64_attr(&var, "missing_value"));

        let values = raw
            .into_iter()
            .map(|v| match fill {
                Some(f) if (v as f64 - f).abs() <= f.abs() * 1e-6 => f32::NAN,
                _ if !v.is_finite() => f32::NAN,
                _ => (v as f64 * scale + offset) as f32,
            })
            .collect();

        RawVariable::new(dims, shape, values)
    }
}

impl FieldSource for NetCdfFieldSource {
    fn name(&self) -> &str {
        &self.location
    }

    fn load(&self, variables: &[String], window: &AnalysisWindow) -> PlumeResult<RawDataset> {
        silence_hdf5_errors();

        info!(source = %self.location, "Opening NetCDF source");
        let file = netcdf::open(&self.location).map_err(|e| {
            PlumeError::DataUnavailable(format!("cannot open {}: {}", self.location, e))
        })?;

        let lon = self.read_coord(&file, &["lon", "longitude"])?;
        let lat = self.read_coord(&file, &["lat", "latitude"])?;
        let all_times = self.read_times(&file)?;
        let time_range = window.index_range(&all_times);
        let times = all_times[time_range.clone()].to_vec();
        // Without a time coordinate there is nothing to restrict.
        let restrict = (!all_times.is_empty()).then_some(&time_range);

        info!(
            source = %self.location,
            available = all_times.len(),
            selected = times.len(),
            first = time_range.start,
            "Restricting read to analysis window"
        );

        let mut decoded = BTreeMap::new();
        for name in variables {
            decoded.insert(name.clone(), self.read_variable(&file, name, restrict)?);
        }

        debug!(
            source = %self.location,
            nlon = lon.len(),
            nlat = lat.len(),
            ntime = times.len(),
            "Read NetCDF variables"
        );

        Ok(RawDataset {
            source_name: self.location.clone(),
            lon,
            lat,
            times,
            variables: decoded,
        })
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}
