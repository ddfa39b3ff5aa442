//! Per-level contour extraction with level bookkeeping.

use rayon::prelude::*;
use tracing::{debug, info};

use plume_common::{ContourRing, GriddedField, PlumeError, PlumeResult};

use crate::tracer::{ContourTracer, MarchingSquares};

/// Rings traced at one level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRings {
    pub level: f64,
    /// Non-degenerate rings in (lon, lat) space.
    pub rings: Vec<ContourRing>,
    /// Number of chains the tracer returned, before filtering.
    pub traced: usize,
    /// Number of chains dropped as degenerate.
    pub degenerate: usize,
}

/// Drop repeated levels, keeping the first occurrence and caller order.
///
/// Fails on an empty list or a non-finite level.
pub fn dedup_levels(levels: &[f64]) -> PlumeResult<Vec<f64>> {
    if levels.is_empty() {
        return Err(PlumeError::invalid_parameter(
            "contours",
            "at least one contour level is required",
        ));
    }
    let mut unique: Vec<f64> = Vec::with_capacity(levels.len());
    for &level in levels {
        if !level.is_finite() {
            return Err(PlumeError::invalid_parameter(
                "contours",
                format!("level {} is not finite", level),
            ));
        }
        if !unique.contains(&level) {
            unique.push(level);
        }
    }
    Ok(unique)
}

/// Runs a [`ContourTracer`] for every level and maps the result to
/// geographic coordinates.
#[derive(Debug, Clone, Default)]
pub struct ContourExtractor<T = MarchingSquares> {
    tracer: T,
}

impl<T: ContourTracer> ContourExtractor<T> {
    pub fn new(tracer: T) -> Self {
        Self { tracer }
    }

    /// Extract rings for every level.
    ///
    /// Levels are traced in parallel; the result holds one entry per distinct
    /// level in the order given.
    pub fn extract(&self, field: &GriddedField, levels: &[f64]) -> PlumeResult<Vec<LevelRings>> {
        let levels = dedup_levels(levels)?;

        if let Some((lo, hi)) = field.value_range() {
            debug!(
                width = field.width(),
                height = field.height(),
                data_min = lo,
                data_max = hi,
                num_levels = levels.len(),
                "Contour extraction input"
            );
        }

        let results: Vec<LevelRings> = levels
            .par_iter()
            .map(|&level| self.extract_level(field, level))
            .collect();

        for entry in &results {
            info!(
                level = entry.level,
                rings = entry.rings.len(),
                traced = entry.traced,
                degenerate = entry.degenerate,
                "Extracted contour level"
            );
        }
        Ok(results)
    }

    /// Extract the rings of a single level.
    pub fn extract_level(&self, field: &GriddedField, level: f64) -> LevelRings {
        let chains = self
            .tracer
            .trace(field.values(), field.width(), field.height(), level);
        let traced = chains.len();

        let rings: Vec<ContourRing> = chains
            .into_iter()
            .map(|chain| {
                let vertices = chain
                    .points
                    .iter()
                    .map(|p| (field.lon_at(p.x), field.lat_at(p.y)))
                    .collect();
                ContourRing::new(level, vertices, chain.closed)
            })
            .filter(|ring| !ring.is_degenerate())
            .collect();

        LevelRings {
            level,
            degenerate: traced - rings.len(),
            traced,
            rings,
        }
    }
}
