//! Error types for every stage of the labeling pipeline.
//!
//! Per-file failures are collected into [`FileFailure`] so the batch driver
//! can keep going and report them by [`FailureKind`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading a notation document.
#[derive(Error, Debug)]
pub enum NotationError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid UTF-8 in MusicXML: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unsupported root element '{0}', only 'score-partwise' is supported")]
    UnsupportedRoot(String),

    #[error("failed to open MXL archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("MXL container: {0}")]
    Container(String),

    #[error("invalid pitch in measure {measure}: {message}")]
    InvalidPitch { measure: i32, message: String },

    #[error("invalid duration in measure {measure}: {message}")]
    InvalidDuration { measure: i32, message: String },

    #[error("score has no part at index {0}")]
    MissingPart(usize),
}

/// A pitch name such as `F#5` that could not be read.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid pitch name '{0}'")]
pub struct PitchNameError(pub String);

/// Errors raised while loading a calibration profile.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid calibration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid calibration: {0}")]
    Invalid(String),
}

/// Errors raised while probing a raster image for its dimensions.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized image format (only PNG and JPEG are supported)")]
    UnsupportedFormat,

    #[error("image header is truncated")]
    Truncated,

    #[error("JPEG stream has no frame header")]
    MissingFrameHeader,
}

/// A coordinate mapping that is mathematically undefined for its inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("part has zero total duration")]
    ZeroDuration,

    #[error("image is {width}x{height} pixels")]
    EmptyImage { width: u32, height: u32 },

    #[error("drawable width {drawable} is not positive for image width {image_width}")]
    NonPositiveDrawableWidth { image_width: u32, drawable: f64 },

    #[error("measure width {0} is not positive")]
    NonPositiveMeasureWidth(f64),

    #[error("measure index {0} is not 1-based")]
    InvalidMeasureIndex(usize),
}

/// Errors raised while reading or writing annotation files.
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("line {line}: expected 5 or 6 fields, found {found}")]
    ColumnCount { line: usize, found: usize },

    #[error("line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("display text '{0}' is not a single non-empty token")]
    InvalidText(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while drawing a review overlay.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("cannot read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("cannot read annotations {}: {source}", path.display())]
    Annotation {
        path: PathBuf,
        #[source]
        source: AnnotationError,
    },

    #[error("degenerate geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why one image/notation pair produced no annotation file.
#[derive(Error, Debug)]
pub enum FileFailure {
    #[error("missing input {}", .0.display())]
    MissingInput(PathBuf),

    #[error("cannot parse notation {}: {source}", path.display())]
    Notation {
        path: PathBuf,
        #[source]
        source: NotationError,
    },

    #[error("cannot read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("degenerate geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("cannot write annotations {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: AnnotationError,
    },
}

/// Coarse failure taxonomy used in batch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingInput,
    ParseFailure,
    DegenerateGeometry,
    OutputFailure,
}

impl FileFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            FileFailure::MissingInput(_) => FailureKind::MissingInput,
            FileFailure::Notation { .. } | FileFailure::Image { .. } => FailureKind::ParseFailure,
            FileFailure::Geometry(_) => FailureKind::DegenerateGeometry,
            FileFailure::Output { .. } => FailureKind::OutputFailure,
        }
    }
}
