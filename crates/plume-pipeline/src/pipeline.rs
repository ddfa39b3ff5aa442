//! Pipeline orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use contour::{ContourExtractor, ContourTracer, LevelRings, MarchingSquares, PolygonBuilder};
use feature_writer::{write_collection, CollectionSummary};
use field_source::{open_source, select_and_reduce, FieldSource, SelectionRequest};
use plume_common::time::format_template;
use plume_common::{AnalysisWindow, ContourRing, GriddedField, PlumeError, PlumeResult};
use renderer::{render_contour_preview, render_level, Backdrop, MapView, PlateCarree};

use crate::config::PipelineConfig;
use crate::reporter::{PipelineEvent, Reporter, TracingReporter};

/// What one run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub window: AnalysisWindow,
    /// Representative timestamp of the reduced field.
    pub time: NaiveDateTime,
    pub collection: CollectionSummary,
    /// Rings dropped by the polygon builder.
    pub rejected: usize,
    /// Figures written successfully.
    pub figures: Vec<PathBuf>,
    /// Figures that failed; never fatal.
    pub figure_failures: usize,
}

/// A configured extraction run.
pub struct Pipeline {
    config: PipelineConfig,
    reporter: Arc<dyn Reporter>,
    extractor: ContourExtractor<Box<dyn ContourTracer>>,
}

impl Pipeline {
    /// Validate `config` and set up a pipeline reporting to `reporter`.
    pub fn new(config: PipelineConfig, reporter: Arc<dyn Reporter>) -> PlumeResult<Self> {
        config.validate()?;

        // Catch malformed templates before any data is read.
        let sample = NaiveDate::MIN.and_time(NaiveTime::MIN);
        let templates = [
            Some(&config.input),
            Some(&config.output),
            config.figures.contour.as_ref(),
            config.figures.fill.as_ref(),
            Some(&config.figures.fill_title),
        ];
        for template in templates.into_iter().flatten() {
            format_template(template, sample)?;
        }

        Ok(Self {
            config,
            reporter,
            extractor: ContourExtractor::new(Box::new(MarchingSquares) as Box<dyn ContourTracer>),
        })
    }

    /// Trace iso-lines with `tracer` instead of marching squares.
    pub fn with_tracer(mut self, tracer: impl ContourTracer + 'static) -> Self {
        self.extractor = ContourExtractor::new(Box::new(tracer) as Box<dyn ContourTracer>);
        self
    }

    /// A pipeline logging through `tracing`.
    pub fn with_tracing(config: PipelineConfig) -> PlumeResult<Self> {
        Self::new(config, Arc::new(TracingReporter))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve the analysis window relative to `today`, open the configured
    /// source and run.
    pub fn run(&self, today: NaiveDate) -> PlumeResult<PipelineReport> {
        let window = AnalysisWindow::resolve(
            self.config.year,
            self.config.month,
            self.config.day,
            self.config.time_window_hours,
            today,
        )?;
        let descriptor = format_template(&self.config.input, window.start)?;
        let source = open_source(&descriptor)?;
        self.run_with_source(source.as_ref(), window)
    }

    /// Run against an already opened source.
    pub fn run_with_source(
        &self,
        source: &dyn FieldSource,
        window: AnalysisWindow,
    ) -> PlumeResult<PipelineReport> {
        let config = &self.config;
        self.reporter.report(&PipelineEvent::SourceOpened {
            name: source.name().to_string(),
        });

        let raw = source.load(&config.variables, &window)?;
        let field = select_and_reduce(
            &raw,
            &SelectionRequest {
                window,
                variables: config.variables.clone(),
                scale: config.scale,
                reducer: config.reducer,
            },
        )?;
        let time = field.time();
        self.reporter.report(&PipelineEvent::FieldReduced {
            time,
            width: field.width(),
            height: field.height(),
        });

        let levels = self.extractor.extract(&field, &config.levels)?;
        for entry in &levels {
            self.reporter.report(&PipelineEvent::LevelExtracted {
                level: entry.level,
                rings: entry.rings.len(),
                degenerate: entry.degenerate,
            });
        }

        let mut figures = Vec::new();
        let mut figure_failures = 0;

        if let Some(template) = &config.figures.contour {
            let path = PathBuf::from(format_template(template, time)?);
            match self.contour_preview(&field, &levels, &path) {
                Ok(drawn) => {
                    self.figure_written(&path, drawn);
                    figures.push(path);
                }
                Err(e) => {
                    self.figure_failed(&path, &e);
                    figure_failures += 1;
                }
            }
        }

        let builder = PolygonBuilder::new(config.attribute.as_str(), config.geometry_policy)?;
        let outcome = builder.build_all(&levels);
        for err in &outcome.rejected {
            let level = match err {
                PlumeError::InvalidGeometry { level, .. } => *level,
                _ => f64::NAN,
            };
            self.reporter.report(&PipelineEvent::RingRejected {
                level,
                reason: err.to_string(),
            });
        }

        let output = PathBuf::from(format_template(&config.output, time)?);
        let collection = write_collection(&output, &config.attribute, &outcome.features)?;
        debug!(summary = %collection, "Collection summary");
        self.reporter.report(&PipelineEvent::CollectionWritten {
            path: output.clone(),
            features: collection.total,
        });

        if let (Some(template), Some(level)) = (&config.figures.fill, config.fill_level()) {
            let path = PathBuf::from(format_template(template, time)?);
            let title = format_template(&config.figures.fill_title, time)?;
            match self.fill_figure(&output, level, &path, &title) {
                Ok(drawn) => {
                    self.figure_written(&path, drawn);
                    figures.push(path);
                }
                Err(e) => {
                    self.figure_failed(&path, &e);
                    figure_failures += 1;
                }
            }
        }

        Ok(PipelineReport {
            window,
            time,
            collection,
            rejected: outcome.rejected.len(),
            figures,
            figure_failures,
        })
    }

    fn contour_preview(
        &self,
        field: &GriddedField,
        levels: &[LevelRings],
        path: &Path,
    ) -> PlumeResult<usize> {
        let bbox = field
            .bbox()
            .ok_or_else(|| PlumeError::render_failed(path, "field has no extent"))?;
        let rings: Vec<ContourRing> = levels.iter().flat_map(|l| l.rings.clone()).collect();
        render_contour_preview(&rings, bbox, path)
    }

    fn fill_figure(
        &self,
        collection: &Path,
        level: f64,
        path: &Path,
        title: &str,
    ) -> PlumeResult<usize> {
        let figures = &self.config.figures;
        let projection = PlateCarree::new(figures.central_longitude, figures.extent)?;
        let view = MapView::new(projection, figures.width);
        let backdrop = match &figures.land {
            Some(land) => Backdrop::with_land_file(land)?,
            None => Backdrop::builtin()?,
        };
        let summary = render_level(collection, level, path, title, &view, &backdrop)?;
        Ok(summary.features)
    }

    fn figure_written(&self, path: &Path, features: usize) {
        self.reporter.report(&PipelineEvent::FigureRendered {
            path: path.to_path_buf(),
            features,
        });
    }

    fn figure_failed(&self, path: &Path, err: &PlumeError) {
        self.reporter.report(&PipelineEvent::FigureFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        });
    }
}
