//! Gridded scalar fields on a regular lon/lat mesh.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{PlumeError, PlumeResult};
use crate::extent::BoundingBox;

/// A 2D scalar field indexed `(lat, lon)` with a representative timestamp.
///
/// Values are stored row-major: row `j` holds all longitudes at `lat[j]`.
/// Missing cells are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    lon: Vec<f64>,
    lat: Vec<f64>,
    values: Vec<f32>,
    time: NaiveDateTime,
}

impl GriddedField {
    /// Create a field, checking that the value count matches the axes.
    pub fn new(
        lon: Vec<f64>,
        lat: Vec<f64>,
        values: Vec<f32>,
        time: NaiveDateTime,
    ) -> PlumeResult<Self> {
        if values.len() != lon.len() * lat.len() {
            return Err(PlumeError::invalid_parameter(
                "values",
                format!(
                    "expected {} x {} = {} values, got {}",
                    lat.len(),
                    lon.len(),
                    lat.len() * lon.len(),
                    values.len()
                ),
            ));
        }
        Ok(Self {
            lon,
            lat,
            values,
            time,
        })
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Representative timestamp (mean of the selected time window).
    pub fn time(&self) -> NaiveDateTime {
        self.time
    }

    /// Number of longitude samples.
    pub fn width(&self) -> usize {
        self.lon.len()
    }

    /// Number of latitude samples.
    pub fn height(&self) -> usize {
        self.lat.len()
    }

    /// Value at `(lat index, lon index)`.
    pub fn get(&self, j: usize, i: usize) -> Option<f32> {
        if i >= self.width() || j >= self.height() {
            return None;
        }
        Some(self.values[j * self.width() + i])
    }

    /// Minimum and maximum of the defined values, or `None` if every cell is
    /// missing.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Geographic bounding box of the sample coordinates.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let (min_x, max_x) = min_max(&self.lon)?;
        let (min_y, max_y) = min_max(&self.lat)?;
        Some(BoundingBox::new(min_x, min_y, max_x, max_y))
    }

    /// Map a fractional longitude index to a longitude.
    pub fn lon_at(&self, index: f64) -> f64 {
        interpolate_axis(&self.lon, index)
    }

    /// Map a fractional latitude index to a latitude.
    pub fn lat_at(&self, index: f64) -> f64 {
        interpolate_axis(&self.lat, index)
    }
}

fn min_max(axis: &[f64]) -> Option<(f64, f64)> {
    let first = *axis.first()?;
    Some(
        axis.iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// Piecewise-linear interpolation of an axis at a fractional index.
///
/// Indices outside `[0, len - 1]` are clamped. Works for non-uniform axes.
pub fn interpolate_axis(axis: &[f64], index: f64) -> f64 {
    match axis.len() {
        0 => f64::NAN,
        1 => axis[0],
        n => {
            let index = index.clamp(0.0, (n - 1) as f64);
            let i0 = (index.floor() as usize).min(n - 2);
            let t = index - i0 as f64;
            axis[i0] + t * (axis[i0 + 1] - axis[i0])
        }
    }
}

/// Temporal reduction applied to the selected time samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Mean,
    Min,
    Max,
}

impl Reducer {
    /// Reduce a set of samples, skipping `NaN`. Returns `NaN` when no sample
    /// is defined.
    pub fn reduce(&self, samples: impl IntoIterator<Item = f32>) -> f32 {
        let mut count = 0usize;
        let mut acc = match self {
            Reducer::Mean => 0.0f64,
            Reducer::Min => f64::INFINITY,
            Reducer::Max => f64::NEG_INFINITY,
        };
        for v in samples.into_iter().filter(|v| !v.is_nan()) {
            let v = v as f64;
            acc = match self {
                Reducer::Mean => acc + v,
                Reducer::Min => acc.min(v),
                Reducer::Max => acc.max(v),
            };
            count += 1;
        }
        if count == 0 {
            return f32::NAN;
        }
        match self {
            Reducer::Mean => (acc / count as f64) as f32,
            _ => acc as f32,
        }
    }
}

impl FromStr for Reducer {
    type Err = PlumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(Reducer::Mean),
            "min" => Ok(Reducer::Min),
            "max" => Ok(Reducer::Max),
            other => Err(PlumeError::invalid_parameter(
                "func",
                format!("unknown reducer '{}', expected mean, min or max", other),
            )),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
        };
        f.write_str(name)
    }
}
