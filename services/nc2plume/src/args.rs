//! Command-line arguments and their layering over the file configuration.

use std::path::PathBuf;

use clap::Parser;

use contour::GeometryPolicy;
use plume_common::{Extent, PlumeResult, Reducer};
use plume_pipeline::PipelineConfig;

/// Flags left unset keep the value from `--config`, or the built-in
/// default shown in brackets.
#[derive(Parser, Debug)]
#[command(name = "nc2plume")]
#[command(about = "Extract contour plumes from a gridded field into polygon features")]
pub struct Args {
    /// Input file, wildcard path or OPeNDAP URL [GEOS-CF hourly chemistry]
    #[arg(short = 'i', long = "ifile", env = "NC2PLUME_INPUT")]
    pub input: Option<String>,

    /// Start year [yesterday]
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Start month [yesterday]
    #[arg(short, long)]
    pub month: Option<u32>,

    /// Start day [yesterday]
    #[arg(short, long)]
    pub day: Option<u32>,

    /// Window length in hours [24]
    #[arg(short = 't', long = "time-window")]
    pub time_window: Option<i64>,

    /// Variables summed before reduction [pm25_rh35_gcc]
    #[arg(short = 'v', long = "ncvars", num_args = 1..)]
    pub ncvars: Option<Vec<String>>,

    /// Scale factor applied after reduction [1.0]
    #[arg(short = 's', long = "ncscal", allow_negative_numbers = true)]
    pub ncscal: Option<f64>,

    /// Temporal reduction: mean, min or max [mean]
    #[arg(short = 'f', long = "func")]
    pub func: Option<Reducer>,

    /// Contour levels [10 25]
    #[arg(short = 'c', long = "contours", num_args = 1.., allow_negative_numbers = true)]
    pub contours: Option<Vec<f64>>,

    /// Output collection path, strftime tokens allowed; `.geojson` writes
    /// GeoJSON, anything else an ESRI Shapefile [pm25_%Y%m%d.shp]
    #[arg(short = 'o', long = "shapefile")]
    pub output: Option<String>,

    /// Attribute holding the level value [pm25]
    #[arg(short = 'p', long = "propname")]
    pub propname: Option<String>,

    /// Raw contour preview image
    #[arg(long = "contour-figname")]
    pub contour_figname: Option<String>,

    /// Filled map image [pm25_%Y%m%d.png]
    #[arg(long = "fillfig-name")]
    pub fillfig_name: Option<String>,

    /// Level drawn on the filled map [25]
    #[arg(long = "fillfig-contour", allow_negative_numbers = true)]
    pub fillfig_contour: Option<f64>,

    /// Filled map title, strftime tokens allowed
    #[arg(long = "fillfig-title")]
    pub fillfig_title: Option<String>,

    /// Map centre longitude [0]
    #[arg(long = "central-longitude", allow_negative_numbers = true)]
    pub central_longitude: Option<f64>,

    /// Map extent: min_lon max_lon min_lat max_lat [-180 180 -90 90]
    #[arg(long, num_args = 4, value_names = ["MINLON", "MAXLON", "MINLAT", "MAXLAT"], allow_negative_numbers = true)]
    pub extent: Option<Vec<f64>>,

    /// GeoJSON land polygons for the map backdrop [built-in coarse outlines]
    #[arg(long, env = "NC2PLUME_LAND")]
    pub land: Option<PathBuf>,

    /// Self-intersecting rings: reject or pass-through [reject]
    #[arg(long = "geometry-policy")]
    pub geometry_policy: Option<GeometryPolicy>,

    /// YAML configuration file
    #[arg(long, env = "NC2PLUME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Built-in defaults, then the YAML file, then these flags.
    pub fn to_config(&self) -> PlumeResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)?,
            None => PipelineConfig::default(),
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    fn apply(&self, config: &mut PipelineConfig) -> PlumeResult<()> {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if self.year.is_some() {
            config.year = self.year;
        }
        if self.month.is_some() {
            config.month = self.month;
        }
        if self.day.is_some() {
            config.day = self.day;
        }
        if let Some(hours) = self.time_window {
            config.time_window_hours = hours;
        }
        if let Some(vars) = &self.ncvars {
            config.variables = vars.clone();
        }
        if let Some(scale) = self.ncscal {
            config.scale = scale;
        }
        if let Some(reducer) = self.func {
            config.reducer = reducer;
        }
        if let Some(levels) = &self.contours {
            config.levels = levels.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(attribute) = &self.propname {
            config.attribute = attribute.clone();
        }
        if let Some(policy) = self.geometry_policy {
            config.geometry_policy = policy;
        }

        let figures = &mut config.figures;
        if self.contour_figname.is_some() {
            figures.contour = self.contour_figname.clone();
        }
        if self.fillfig_name.is_some() {
            figures.fill = self.fillfig_name.clone();
        }
        if self.fillfig_contour.is_some() {
            figures.fill_level = self.fillfig_contour;
        }
        if let Some(title) = &self.fillfig_title {
            figures.fill_title = title.clone();
        }
        if let Some(lon) = self.central_longitude {
            figures.central_longitude = lon;
        }
        if let Some(extent) = &self.extent {
            figures.extent = Extent::from_slice(extent)?;
        }
        if self.land.is_some() {
            figures.land = self.land.clone();
        }
        Ok(())
    }
}
