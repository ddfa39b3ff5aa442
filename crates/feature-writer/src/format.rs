//! On-disk collection formats.

use std::fmt;
use std::path::Path;

/// Format of a collection file, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// ESRI Shapefile: `.shp` geometry, `.shx` index, `.dbf` attribute
    /// table and a WGS84 `.prj`.
    Shapefile,
    /// GeoJSON FeatureCollection with a `schema` member.
    GeoJson,
}

impl OutputFormat {
    /// `.geojson` and `.json` select GeoJSON; every other path is written
    /// as a Shapefile.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("geojson") | Some("json") => OutputFormat::GeoJson,
            _ => OutputFormat::Shapefile,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Shapefile => f.write_str("ESRI Shapefile"),
            OutputFormat::GeoJson => f.write_str("GeoJSON"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("pm25_20200615.shp")), OutputFormat::Shapefile);
        assert_eq!(OutputFormat::from_path(Path::new("out/pm25.GeoJSON")), OutputFormat::GeoJson);
        assert_eq!(OutputFormat::from_path(Path::new("pm25.json")), OutputFormat::GeoJson);
        assert_eq!(OutputFormat::from_path(Path::new("pm25")), OutputFormat::Shapefile);
    }
}
