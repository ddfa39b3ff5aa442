//! Temporal selection and reduction of a raw dataset to one 2D field.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use plume_common::time::mean_timestamp;
use plume_common::{AnalysisWindow, GriddedField, PlumeError, PlumeResult, Reducer};

use crate::dataset::{DimRole, RawDataset, RawVariable};

/// What to select from a dataset and how to collapse it.
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub window: AnalysisWindow,
    /// Variables summed element-wise before reduction.
    pub variables: Vec<String>,
    /// Applied after reduction when different from 1.0.
    pub scale: f64,
    pub reducer: Reducer,
}

/// Per-variable strides into the raw values, with degenerate axes dropped.
struct Layout {
    ntime: usize,
    time_stride: usize,
    lat_stride: usize,
    lon_stride: usize,
}

impl Layout {
    fn of(name: &str, var: &RawVariable, nlat: usize, nlon: usize) -> PlumeResult<Self> {
        let mut strides = vec![1usize; var.shape.len()];
        for k in (0..var.shape.len().saturating_sub(1)).rev() {
            strides[k] = strides[k + 1] * var.shape[k + 1];
        }

        let mut layout = Layout {
            ntime: 1,
            time_stride: 0,
            lat_stride: 0,
            lon_stride: 0,
        };
        let (mut has_lat, mut has_lon) = (false, false);

        for (k, dim) in var.dims.iter().enumerate() {
            let len = var.shape[k];
            match DimRole::classify(dim) {
                DimRole::Time => {
                    layout.ntime = len;
                    layout.time_stride = strides[k];
                }
                DimRole::Lat if len == nlat => {
                    layout.lat_stride = strides[k];
                    has_lat = true;
                }
                DimRole::Lon if len == nlon => {
                    layout.lon_stride = strides[k];
                    has_lon = true;
                }
                // Degenerate axes such as a single vertical level are dropped.
                _ if len == 1 => {}
                _ => {
                    return Err(PlumeError::UnsupportedDimension {
                        variable: name.to_string(),
                        dimension: dim.clone(),
                        length: len,
                    })
                }
            }
        }

        if !(has_lat && has_lon) {
            return Err(PlumeError::UnsupportedDimension {
                variable: name.to_string(),
                dimension: var.dims.join(","),
                length: var.values.len(),
            });
        }
        Ok(layout)
    }

    fn value(&self, var: &RawVariable, t: usize, j: usize, i: usize) -> f32 {
        var.values[t * self.time_stride + j * self.lat_stride + i * self.lon_stride]
    }
}

/// Select the analysis window and reduce to a single [`GriddedField`].
///
/// When the source carries a single time sample it is used as-is, whatever
/// the window. The field's timestamp is the mean of the selected samples.
pub fn select_and_reduce(
    dataset: &RawDataset,
    request: &SelectionRequest,
) -> PlumeResult<GriddedField> {
    if request.variables.is_empty() {
        return Err(PlumeError::invalid_parameter(
            "ncvars",
            "at least one variable is required",
        ));
    }

    let nlat = dataset.lat.len();
    let nlon = dataset.lon.len();

    let mut inputs = Vec::with_capacity(request.variables.len());
    for name in &request.variables {
        let var = dataset.variable(name)?;
        let layout = Layout::of(name, var, nlat, nlon)?;
        inputs.push((name.as_str(), var, layout));
    }

    let ntime = inputs[0].2.ntime;
    if let Some((name, _, layout)) = inputs.iter().find(|(_, _, l)| l.ntime != ntime) {
        return Err(PlumeError::InvalidFormat {
            source_name: dataset.source_name.clone(),
            message: format!(
                "variable '{}' has {} time samples, expected {}",
                name, layout.ntime, ntime
            ),
        });
    }

    let sample_times: Vec<NaiveDateTime> = if dataset.times.len() == ntime {
        dataset.times.clone()
    } else if ntime == 1 {
        vec![request.window.start]
    } else {
        return Err(PlumeError::InvalidFormat {
            source_name: dataset.source_name.clone(),
            message: format!(
                "time axis has {} entries but variables have {} samples",
                dataset.times.len(),
                ntime
            ),
        });
    };

    let selected: Vec<usize> = if ntime > 1 {
        (0..ntime)
            .filter(|&t| request.window.contains(sample_times[t]))
            .collect()
    } else {
        (0..ntime).collect()
    };

    if selected.is_empty() {
        return Err(PlumeError::DataUnavailable(format!(
            "no time samples in {} between {} and {}",
            dataset.source_name, request.window.start, request.window.end
        )));
    }

    let selected_times: Vec<NaiveDateTime> = selected.iter().map(|&t| sample_times[t]).collect();
    let mean_time = mean_timestamp(&selected_times).ok_or_else(|| {
        PlumeError::DataUnavailable(format!("no timestamps selected in {}", dataset.source_name))
    })?;

    info!(
        source = %dataset.source_name,
        variables = ?request.variables,
        samples = selected.len(),
        reducer = %request.reducer,
        mean_time = %mean_time,
        "Selected time window"
    );

    // Summed value of all variables for one sample and cell.
    let summed = |t: usize, j: usize, i: usize| -> f32 {
        inputs
            .iter()
            .map(|(_, var, layout)| layout.value(var, t, j, i))
            .sum()
    };

    let mut values = Vec::with_capacity(nlat * nlon);
    for j in 0..nlat {
        for i in 0..nlon {
            let v = if selected.len() == 1 {
                summed(selected[0], j, i)
            } else {
                request
                    .reducer
                    .reduce(selected.iter().map(|&t| summed(t, j, i)))
            };
            values.push(v);
        }
    }

    if request.scale != 1.0 {
        let scale = request.scale;
        for v in values.iter_mut() {
            *v = (*v as f64 * scale) as f32;
        }
        debug!(scale = scale, "Applied scale factor");
    }

    GriddedField::new(dataset.lon.clone(), dataset.lat.clone(), values, mean_time)
}
