//! Raw (undecoded-axis) datasets as returned by a field source.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::NaiveDateTime;

use plume_common::{PlumeError, PlumeResult};

/// Role of a named dimension on a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimRole {
    Time,
    Lat,
    Lon,
    Other,
}

impl DimRole {
    /// Classify a dimension name using the usual CF short and long names.
    pub fn classify(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "time" | "t" => DimRole::Time,
            "lat" | "latitude" | "y" => DimRole::Lat,
            "lon" | "longitude" | "x" => DimRole::Lon,
            _ => DimRole::Other,
        }
    }
}

/// One variable: named dimensions, their lengths and row-major values.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVariable {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    /// Values with missing entries already converted to `NaN`.
    pub values: Vec<f32>,
}

impl RawVariable {
    pub fn new(dims: Vec<String>, shape: Vec<usize>, values: Vec<f32>) -> PlumeResult<Self> {
        if dims.len() != shape.len() {
            return Err(PlumeError::invalid_parameter(
                "dims",
                format!("{} dimension names for {} lengths", dims.len(), shape.len()),
            ));
        }
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(PlumeError::invalid_parameter(
                "values",
                format!("shape {:?} needs {} values, got {}", shape, expected, values.len()),
            ));
        }
        Ok(Self { dims, shape, values })
    }

    /// Index of the first dimension with the given role.
    pub fn axis(&self, role: DimRole) -> Option<usize> {
        self.dims.iter().position(|d| DimRole::classify(d) == role)
    }

    /// Restrict dimension `axis` to `range`.
    fn slice_axis(&mut self, axis: usize, range: Range<usize>) -> PlumeResult<()> {
        if range.end > self.shape[axis] {
            return Err(PlumeError::invalid_parameter(
                "time",
                format!("range {:?} exceeds dimension length {}", range, self.shape[axis]),
            ));
        }
        // Blocks of `inner` contiguous values repeat `outer` times.
        let inner: usize = self.shape[axis + 1..].iter().product();
        let outer: usize = self.shape[..axis].iter().product();
        let len = self.shape[axis];

        let mut values = Vec::with_capacity(outer * range.len() * inner);
        for o in 0..outer {
            let base = o * len * inner;
            values.extend_from_slice(&self.values[base + range.start * inner..base + range.end * inner]);
        }
        self.shape[axis] = range.len();
        self.values = values;
        Ok(())
    }
}

/// Coordinates, timestamps and the requested variables of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    /// Human-readable source identifier used in error messages.
    pub source_name: String,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    /// Decoded time axis; empty if the source has no time coordinate.
    pub times: Vec<NaiveDateTime>,
    pub variables: BTreeMap<String, RawVariable>,
}

impl RawDataset {
    pub fn variable(&self, name: &str) -> PlumeResult<&RawVariable> {
        self.variables
            .get(name)
            .ok_or_else(|| PlumeError::VariableNotFound {
                variable: name.to_string(),
                source_name: self.source_name.clone(),
            })
    }

    /// Keep only the time steps in `range`, on the axis and every variable.
    ///
    /// Variables without a time dimension are left untouched.
    pub fn slice_time(mut self, range: Range<usize>) -> PlumeResult<RawDataset> {
        if range.start == 0 && range.end >= self.times.len() {
            return Ok(self);
        }
        self.times = self.times[range.clone()].to_vec();
        for var in self.variables.values_mut() {
            if let Some(axis) = var.axis(DimRole::Time) {
                var.slice_axis(axis, range.clone())?;
            }
        }
        Ok(self)
    }

    /// Concatenate datasets along the time dimension, in the given order.
    ///
    /// All parts must share the same horizontal grid and carry every variable
    /// with time as its leading dimension.
    pub fn concat_time(parts: Vec<RawDataset>) -> PlumeResult<RawDataset> {
        let mut iter = parts.into_iter();
        let mut merged = iter
            .next()
            .ok_or_else(|| PlumeError::DataUnavailable("no datasets to concatenate".into()))?;
        if iter.len() == 0 {
            return Ok(merged);
        }

        let mut names = vec![merged.source_name.clone()];
        for part in iter {
            if part.lon != merged.lon || part.lat != merged.lat {
                return Err(PlumeError::InvalidFormat {
                    source_name: part.source_name,
                    message: "horizontal grid differs from the first file".into(),
                });
            }
            for (name, var) in merged.variables.iter_mut() {
                let other = part.variable(name)?;
                if var.axis(DimRole::Time) != Some(0) || other.axis(DimRole::Time) != Some(0) {
                    return Err(PlumeError::InvalidFormat {
                        source_name: part.source_name.clone(),
                        message: format!("variable '{}' has no leading time dimension", name),
                    });
                }
                if var.shape[1..] != other.shape[1..] {
                    return Err(PlumeError::InvalidFormat {
                        source_name: part.source_name.clone(),
                        message: format!(
                            "variable '{}' shape {:?} does not match {:?}",
                            name, other.shape, var.shape
                        ),
                    });
                }
                var.shape[0] += other.shape[0];
                var.values.extend_from_slice(&other.values);
            }
            merged.times.extend_from_slice(&part.times);
            names.push(part.source_name);
        }
        merged.source_name = names.join(", ");
        Ok(merged)
    }
}
