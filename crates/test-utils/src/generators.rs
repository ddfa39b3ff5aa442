//! Synthetic field generators with known contour geometry.
//!
//! All grids are row-major with row 0 first. Shapes are placed in grid-index
//! space so the expected contour can be computed by hand.

/// A coordinate axis of `n` evenly spaced values starting at `start`.
///
/// ```
/// use test_utils::axis;
///
/// assert_eq!(axis(-1.0, 0.5, 5), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
/// ```
pub fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// A cone peaking at `(cx, cy)` and falling off linearly with distance.
///
/// The iso-line at level `L` is a circle of radius `(peak - L) / slope`
/// grid cells, which makes the enclosed area easy to check.
pub fn cone_grid(
    width: usize,
    height: usize,
    centre: (f64, f64),
    peak: f32,
    slope: f32,
) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f64 - centre.0;
            let dy = row as f64 - centre.1;
            let dist = (dx * dx + dy * dy).sqrt() as f32;
            data.push(peak - slope * dist);
        }
    }
    data
}

/// A rectangular plateau of `inside` over a floor of `outside`.
///
/// `cols` and `rows` are inclusive index ranges of the plateau.
pub fn plateau_grid(
    width: usize,
    height: usize,
    cols: (usize, usize),
    rows: (usize, usize),
    inside: f32,
    outside: f32,
) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hit = (cols.0..=cols.1).contains(&col) && (rows.0..=rows.1).contains(&row);
            data.push(if hit { inside } else { outside });
        }
    }
    data
}

/// A Gaussian plume of amplitude `peak` over a background value.
pub fn gaussian_plume_grid(
    width: usize,
    height: usize,
    centre: (f64, f64),
    sigma: f64,
    peak: f32,
    background: f32,
) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    let two_sigma_sq = 2.0 * sigma * sigma;
    for row in 0..height {
        for col in 0..width {
            let dx = col as f64 - centre.0;
            let dy = row as f64 - centre.1;
            let g = (-(dx * dx + dy * dy) / two_sigma_sq).exp() as f32;
            data.push(background + peak * g);
        }
    }
    data
}

/// Replace the samples at the given `(col, row)` positions with `NaN`.
pub fn with_missing(mut data: Vec<f32>, width: usize, cells: &[(usize, usize)]) -> Vec<f32> {
    for &(col, row) in cells {
        if let Some(v) = data.get_mut(row * width + col) {
            *v = f32::NAN;
        }
    }
    data
}

/// Stack the same 2D grid `times` times, scaling each copy by its factor.
///
/// Useful for building `(time, lat, lon)` cubes with a known mean.
pub fn time_stack(grid: &[f32], factors: &[f32]) -> Vec<f32> {
    factors
        .iter()
        .flat_map(|&f| grid.iter().map(move |&v| v * f))
        .collect()
}
