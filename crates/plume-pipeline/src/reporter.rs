//! Progress reporting for pipeline runs.
//!
//! The pipeline never logs directly; it hands [`PipelineEvent`]s to a
//! [`Reporter`] so tests can observe what happened.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use tracing::{info, warn};

/// Something worth reporting during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    SourceOpened {
        name: String,
    },
    FieldReduced {
        time: NaiveDateTime,
        width: usize,
        height: usize,
    },
    LevelExtracted {
        level: f64,
        rings: usize,
        degenerate: usize,
    },
    RingRejected {
        level: f64,
        reason: String,
    },
    CollectionWritten {
        path: PathBuf,
        features: usize,
    },
    FigureRendered {
        path: PathBuf,
        features: usize,
    },
    /// A diagnostic image could not be produced. Never fatal.
    FigureFailed {
        path: PathBuf,
        reason: String,
    },
}

/// Receiver of pipeline events.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::SourceOpened { name } => {
                info!(source = %name, "Opened field source");
            }
            PipelineEvent::FieldReduced {
                time,
                width,
                height,
            } => {
                info!(time = %time, width, height, "Reduced field");
            }
            PipelineEvent::LevelExtracted {
                level,
                rings,
                degenerate,
            } => {
                info!(level, rings, degenerate, "Contour level ready");
            }
            PipelineEvent::RingRejected { level, reason } => {
                warn!(level, reason = %reason, "Dropped invalid ring");
            }
            PipelineEvent::CollectionWritten { path, features } => {
                info!(path = %path.display(), features, "Wrote feature collection");
            }
            PipelineEvent::FigureRendered { path, features } => {
                info!(path = %path.display(), features, "Wrote figure");
            }
            PipelineEvent::FigureFailed { path, reason } => {
                warn!(path = %path.display(), reason = %reason, "Figure not written");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn rejected_rings(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PipelineEvent::RingRejected { .. }))
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &PipelineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
