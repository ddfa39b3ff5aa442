//! Pipeline configuration.
//!
//! Built-in defaults reproduce the daily GEOS-CF surface PM2.5 product. A
//! YAML file may override any subset of fields; `${VAR}` and
//! `${VAR:-default}` are expanded from the environment before parsing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use contour::GeometryPolicy;
use plume_common::{Extent, PlumeError, PlumeResult, Reducer};

/// GEOS-CF hourly chemistry collection on the 0.25 degree grid.
pub const DEFAULT_INPUT: &str =
    "https://opendap.nccs.nasa.gov/dods/gmao/geos-cf/assim/chm_tavg_1hr_g1440x721_v1";

/// Level shown on the filled map unless overridden, in ug/m3.
pub const DEFAULT_FILL_LEVEL: f64 = 25.0;

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Source descriptor: path, wildcard path or URL. May contain strftime
    /// tokens, resolved against the window start.
    pub input: String,
    /// Start date parts; missing parts default to yesterday.
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub time_window_hours: i64,
    pub variables: Vec<String>,
    pub scale: f64,
    pub reducer: Reducer,
    pub levels: Vec<f64>,
    /// Output collection path template.
    pub output: String,
    /// Attribute name carrying the level value.
    pub attribute: String,
    pub geometry_policy: GeometryPolicy,
    pub figures: FigureConfig,
}

/// Diagnostic figure settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FigureConfig {
    /// Raw contour preview path template; skipped when unset.
    pub contour: Option<String>,
    /// Filled map path template; skipped when unset.
    pub fill: Option<String>,
    /// Level drawn on the filled map [25]; the first level when set to null.
    pub fill_level: Option<f64>,
    pub fill_title: String,
    pub central_longitude: f64,
    pub extent: Extent,
    /// GeoJSON land polygons for the backdrop; coarse built-in outlines when unset.
    pub land: Option<PathBuf>,
    pub width: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT.to_string(),
            year: None,
            month: None,
            day: None,
            time_window_hours: 24,
            variables: vec!["pm25_rh35_gcc".to_string()],
            scale: 1.0,
            reducer: Reducer::Mean,
            levels: vec![10.0, 25.0],
            output: "pm25_%Y%m%d.shp".to_string(),
            attribute: "pm25".to_string(),
            geometry_policy: GeometryPolicy::Reject,
            figures: FigureConfig::default(),
        }
    }
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            contour: None,
            fill: Some("pm25_%Y%m%d.png".to_string()),
            fill_level: Some(DEFAULT_FILL_LEVEL),
            fill_title: "Surface PM2.5 >= 25 ug/m3 (%Y-%m-%d)".to_string(),
            central_longitude: 0.0,
            extent: Extent::GLOBAL,
            land: None,
            width: 1024,
        }
    }
}

impl PipelineConfig {
    /// Load a YAML file over the built-in defaults.
    pub fn from_yaml_file(path: &Path) -> PlumeResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PlumeError::DataUnavailable(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    /// Parse YAML content; `source_name` is used in error messages.
    pub fn from_yaml_str(content: &str, source_name: &str) -> PlumeResult<Self> {
        let invalid = |message: String| PlumeError::InvalidFormat {
            source_name: source_name.to_string(),
            message,
        };
        let expanded = expand_env_vars(content).map_err(invalid)?;
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&expanded).map_err(|e| invalid(e.to_string()))
    }

    /// Level drawn on the filled map.
    pub fn fill_level(&self) -> Option<f64> {
        self.figures
            .fill_level
            .or_else(|| self.levels.first().copied())
    }

    /// Check every field that a run would otherwise trip over late.
    pub fn validate(&self) -> PlumeResult<()> {
        if self.input.trim().is_empty() {
            return Err(PlumeError::invalid_parameter("ifile", "input must not be empty"));
        }
        if self.variables.is_empty() || self.variables.iter().any(|v| v.trim().is_empty()) {
            return Err(PlumeError::invalid_parameter(
                "ncvars",
                "at least one non-empty variable name is required",
            ));
        }
        if self.time_window_hours < 0 {
            return Err(PlumeError::invalid_parameter(
                "time_window",
                format!("must not be negative, got {}", self.time_window_hours),
            ));
        }
        if !self.scale.is_finite() {
            return Err(PlumeError::invalid_parameter("ncscal", "scale must be finite"));
        }
        contour::dedup_levels(&self.levels)?;
        if self.attribute.trim().is_empty() {
            return Err(PlumeError::invalid_parameter("propname", "must not be empty"));
        }
        if self.output.trim().is_empty() {
            return Err(PlumeError::invalid_parameter("shapefile", "output must not be empty"));
        }
        if let Some(level) = self.figures.fill_level {
            if !level.is_finite() {
                return Err(PlumeError::invalid_parameter(
                    "fillfig_contour",
                    "level must be finite",
                ));
            }
        }
        if self.figures.width == 0 {
            return Err(PlumeError::invalid_parameter("width", "must be positive"));
        }
        self.figures.extent.validate()
    }
}

/// Expand `${VAR}` and `${VAR:-default}` from the environment.
fn expand_env_vars(content: &str) -> Result<String, String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("unclosed variable substitution: ${{{}", after))?;
        let expr = &after[..end];
        let value = match expr.split_once(":-") {
            Some((name, default)) => match std::env::var(name.trim()) {
                Ok(val) if !val.is_empty() => val,
                _ => default.to_string(),
            },
            None => std::env::var(expr.trim())
                .map_err(|_| format!("environment variable {} not set", expr))?,
        };
        result.push_str(&value);
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.fill_level(), Some(25.0));
        assert_eq!(config.figures.fill.as_deref(), Some("pm25_%Y%m%d.png"));
    }

    #[test]
    fn test_partial_yaml_overrides_defaults() {
        let yaml = r#"
input: /data/geos_cf_%Y%m%d.nc4
levels: [5.0, 15.0]
reducer: max
geometry_policy: pass-through
figures:
  fill_level: 15.0
  extent: {min_lon: -30.0, max_lon: 60.0, min_lat: 20.0, max_lat: 75.0}
"#;
        let config = PipelineConfig::from_yaml_str(yaml, "test.yaml").unwrap();
        assert_eq!(config.input, "/data/geos_cf_%Y%m%d.nc4");
        assert_eq!(config.levels, vec![5.0, 15.0]);
        assert_eq!(config.reducer, Reducer::Max);
        assert_eq!(config.geometry_policy, GeometryPolicy::PassThrough);
        assert_eq!(config.fill_level(), Some(15.0));
        assert_eq!(config.figures.extent.min_lon, -30.0);
        // untouched fields keep their defaults
        assert_eq!(config.attribute, "pm25");
        assert_eq!(config.time_window_hours, 24);
        assert_eq!(config.figures.width, 1024);
    }

    #[test]
    fn test_fill_level_matches_default_title() {
        let config = PipelineConfig::default();
        assert_eq!(config.figures.fill_level, Some(DEFAULT_FILL_LEVEL));
        assert!(config.figures.fill_title.contains(">= 25 "));
        assert!(config.levels.contains(&DEFAULT_FILL_LEVEL));

        // an explicit null falls back to the first contour level
        let yaml = "levels: [5.0, 15.0]\nfigures:\n  fill_level: null\n";
        let config = PipelineConfig::from_yaml_str(yaml, "null.yaml").unwrap();
        assert_eq!(config.fill_level(), Some(5.0));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PipelineConfig::from_yaml_str("levles: [1.0]", "typo.yaml").unwrap_err();
        assert!(matches!(err, PlumeError::InvalidFormat { .. }));
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("PLUME_TEST_INPUT_DIR", "/mnt/geos");
        let yaml = "input: ${PLUME_TEST_INPUT_DIR}/cf_*.nc4\noutput: ${PLUME_TEST_UNSET_DIR:-out}/pm25.geojson\n";
        let config = PipelineConfig::from_yaml_str(yaml, "env.yaml").unwrap();
        assert_eq!(config.input, "/mnt/geos/cf_*.nc4");
        assert_eq!(config.output, "out/pm25.geojson");

        assert!(expand_env_vars("${PLUME_TEST_SURELY_UNSET}").is_err());
        assert!(expand_env_vars("${OPEN").is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = PipelineConfig::default();
        config.levels.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.variables = vec![];
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.figures.extent.max_lat = 120.0;
        assert!(config.validate().is_err());
    }
}
