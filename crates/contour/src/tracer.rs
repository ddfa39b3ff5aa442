//! Iso-line tracing using the marching squares algorithm.
//!
//! Tracing works in fractional grid-index space: `x` is the column
//! (longitude index) and `y` the row (latitude index). Segments produced for
//! each cell are stitched into chains through the cell edges they share, so
//! a ring that closes on itself comes out as one closed chain and a line cut
//! by the grid boundary or by missing data comes out as one open chain.

use std::collections::HashMap;

/// A point in grid-index space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

impl GridPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Identifier of a cell edge. Horizontal edge `(x, y)-(x+1, y)` is
/// `2 * (y * width + x)`, vertical edge `(x, y)-(x, y+1)` is that plus one.
type EdgeId = usize;

/// A line segment crossing one cell, from one edge to another.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: GridPoint,
    pub end: GridPoint,
    start_edge: EdgeId,
    end_edge: EdgeId,
}

/// A traced chain of grid points.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRing {
    pub points: Vec<GridPoint>,
    /// True when the chain returns to its start; the closing point is then
    /// repeated at the end.
    pub closed: bool,
}

/// Capability that turns a sampled 2D array into iso-line chains.
///
/// `data` is row-major with `width` columns and `height` rows; `NaN` marks
/// missing samples. Implementations must return chains in grid-index space.
pub trait ContourTracer: Send + Sync {
    fn trace(&self, data: &[f32], width: usize, height: usize, level: f64) -> Vec<GridRing>;
}

impl<T: ContourTracer + ?Sized> ContourTracer for Box<T> {
    fn trace(&self, data: &[f32], width: usize, height: usize, level: f64) -> Vec<GridRing> {
        (**self).trace(data, width, height, level)
    }
}

/// Marching squares with saddle disambiguation by the cell-centre average.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingSquares;

impl ContourTracer for MarchingSquares {
    fn trace(&self, data: &[f32], width: usize, height: usize, level: f64) -> Vec<GridRing> {
        let segments = march_squares(data, width, height, level);
        connect_segments(&segments)
    }
}

/// Marching squares over every cell of the grid.
///
/// # Returns
/// Unordered segments; cells touching a `NaN` sample are skipped.
pub fn march_squares(data: &[f32], width: usize, height: usize, level: f64) -> Vec<Segment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    let h_edge = |x: usize, y: usize| -> EdgeId { 2 * (y * width + x) };
    let v_edge = |x: usize, y: usize| -> EdgeId { 2 * (y * width + x) + 1 };

    let mut segments = Vec::new();

    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl = data[y * width + x] as f64;
            let tr = data[y * width + x + 1] as f64;
            let bl = data[(y + 1) * width + x] as f64;
            let br = data[(y + 1) * width + x + 1] as f64;

            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            let mut cell_index = 0u8;
            if tl >= level {
                cell_index |= 1;
            }
            if tr >= level {
                cell_index |= 2;
            }
            if br >= level {
                cell_index |= 4;
            }
            if bl >= level {
                cell_index |= 8;
            }
            if cell_index == 0 || cell_index == 15 {
                continue;
            }

            let (xf, yf) = (x as f64, y as f64);
            let top = (
                interpolate_edge(xf, yf, xf + 1.0, yf, tl, tr, level),
                h_edge(x, y),
            );
            let right = (
                interpolate_edge(xf + 1.0, yf, xf + 1.0, yf + 1.0, tr, br, level),
                v_edge(x + 1, y),
            );
            let bottom = (
                interpolate_edge(xf, yf + 1.0, xf + 1.0, yf + 1.0, bl, br, level),
                h_edge(x, y + 1),
            );
            let left = (
                interpolate_edge(xf, yf, xf, yf + 1.0, tl, bl, level),
                v_edge(x, y),
            );

            let centre_above = (tl + tr + br + bl) / 4.0 >= level;
            let mut push = |a: (GridPoint, EdgeId), b: (GridPoint, EdgeId)| {
                segments.push(Segment {
                    start: a.0,
                    end: b.0,
                    start_edge: a.1,
                    end_edge: b.1,
                });
            };

            match cell_index {
                1 | 14 => push(left, top),
                2 | 13 => push(top, right),
                3 | 12 => push(left, right),
                4 | 11 => push(right, bottom),
                6 | 9 => push(top, bottom),
                7 | 8 => push(left, bottom),
                // Saddles: tl and br above.
                5 if centre_above => {
                    push(top, right);
                    push(left, bottom);
                }
                5 => {
                    push(left, top);
                    push(right, bottom);
                }
                // Saddles: tr and bl above.
                10 if centre_above => {
                    push(left, top);
                    push(right, bottom);
                }
                10 => {
                    push(top, right);
                    push(left, bottom);
                }
                _ => {}
            }
        }
    }

    segments
}

/// Linearly interpolate where `level` crosses between two edge endpoints.
fn interpolate_edge(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    val1: f64,
    val2: f64,
    level: f64,
) -> GridPoint {
    if (val2 - val1).abs() < 1e-12 {
        return GridPoint::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }

    let t = ((level - val1) / (val2 - val1)).clamp(0.0, 1.0);
    GridPoint::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

/// Connect segments into chains through shared cell edges.
///
/// Each crossed edge is shared by at most two segments, so chains are
/// unambiguous. Consecutive identical points (a level passing exactly through
/// a grid node) are collapsed.
pub fn connect_segments(segments: &[Segment]) -> Vec<GridRing> {
    if segments.is_empty() {
        return vec![];
    }

    let mut by_edge: HashMap<EdgeId, Vec<usize>> = HashMap::with_capacity(segments.len() * 2);
    for (i, seg) in segments.iter().enumerate() {
        by_edge.entry(seg.start_edge).or_default().push(i);
        by_edge.entry(seg.end_edge).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut rings = Vec::new();

    // Next unused segment touching `edge`, with the point and edge on its
    // far side.
    let step = |edge: EdgeId, used: &mut [bool]| -> Option<(GridPoint, EdgeId)> {
        let next = by_edge
            .get(&edge)?
            .iter()
            .copied()
            .find(|&i| !used[i])?;
        used[next] = true;
        let seg = &segments[next];
        Some(if seg.start_edge == edge {
            (seg.end, seg.end_edge)
        } else {
            (seg.start, seg.start_edge)
        })
    };

    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let seg = &segments[first];

        let mut forward = vec![seg.start, seg.end];
        let mut tip = seg.end_edge;
        let mut closed = false;
        while let Some((point, far_edge)) = step(tip, &mut used) {
            forward.push(point);
            tip = far_edge;
            if tip == seg.start_edge {
                closed = true;
                break;
            }
        }

        let points = if closed {
            forward
        } else {
            let mut backward = Vec::new();
            let mut tail = seg.start_edge;
            while let Some((point, far_edge)) = step(tail, &mut used) {
                backward.push(point);
                tail = far_edge;
            }
            backward.reverse();
            backward.extend(forward);
            backward
        };

        let mut points = points;
        points.dedup();
        rings.push(GridRing { points, closed });
    }

    rings
}
