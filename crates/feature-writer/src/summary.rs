//! Per-level feature counts.

use std::fmt;
use std::path::PathBuf;

use plume_common::PolygonFeature;

/// What a collection holds: feature counts per level, in the order levels
/// first appear.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub path: PathBuf,
    pub attribute: String,
    pub total: usize,
    pub per_level: Vec<(f64, usize)>,
}

impl CollectionSummary {
    pub fn from_features(path: PathBuf, attribute: &str, features: &[PolygonFeature]) -> Self {
        let mut per_level: Vec<(f64, usize)> = Vec::new();
        for feature in features {
            match per_level.iter_mut().find(|(level, _)| *level == feature.level) {
                Some((_, count)) => *count += 1,
                None => per_level.push((feature.level, 1)),
            }
        }
        Self {
            path,
            attribute: attribute.to_string(),
            total: features.len(),
            per_level,
        }
    }

    /// Number of features at `level`.
    pub fn count_for(&self, level: f64) -> usize {
        self.per_level
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

impl fmt::Display for CollectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} features", self.total)?;
        for (level, count) in &self.per_level {
            write!(f, ", {}={}: {}", self.attribute, level, count)?;
        }
        Ok(())
    }
}
