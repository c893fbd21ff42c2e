//! Error types for tree generation, meshing and export

use std::collections::TryReserveError;

use thiserror::Error;

/// Rejected growth parameters, reported before any allocation happens
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("expected between 1 and {max} growth levels, got {got}")]
    LevelCount { got: usize, max: usize },

    #[error("level {level} has a curve resolution of zero")]
    CurveResolution { level: usize },

    #[error("quality must be positive, got {0}")]
    Quality(f32),

    #[error("{field} must be a finite number")]
    NonFinite { field: String },
}

/// Failure to grow one of the streams of a geometry buffer
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("could not grow the {stream} stream by {additional} elements: {source}")]
    Allocation {
        stream: &'static str,
        additional: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Errors raised while writing a mesh file
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
