//! omrlabel — notehead bounding-box labels for optical music recognition.
//!
//! Reads MusicXML (uncompressed or compressed MXL), maps every notated pitch
//! onto the pixel grid of the image an engraver rendered from it, and writes
//! YOLO annotation files.
//!
//! # Example
//! ```no_run
//! use omrlabel::{parse_file, score_events, synthesize_labels, CalibrationProfile, PageGeometry};
//!
//! let score = parse_file("data/xml/sample_0.musicxml").unwrap();
//! let events = score_events(&score, 0).unwrap();
//! let page = PageGeometry::new(1654, 2339).unwrap();
//! let labels = synthesize_labels(&events, &page, &CalibrationProfile::default()).unwrap();
//! println!("{} noteheads", labels.len());
//! ```

pub mod annotation;
pub mod batch;
pub mod calibration;
pub mod error;
pub mod events;
pub mod generator;
pub mod image;
pub mod labels;
pub mod mapper;
pub mod model;
pub mod mxl;
pub mod parser;
pub mod review;

use std::path::Path;

pub use annotation::{BoundingBoxLabel, LabelClass};
pub use calibration::{CalibrationProfile, HorizontalPolicy, MeasureGrid};
pub use error::*;
pub use events::{score_events, EventSequence, MusicalEvent};
pub use labels::synthesize_labels;
pub use mapper::PageGeometry;
pub use model::*;
pub use mxl::parse_mxl;
pub use parser::parse_musicxml;

/// Parse a MusicXML file from a file path.
/// Automatically detects format based on file extension:
/// - `.musicxml` or `.xml` → uncompressed MusicXML
/// - `.mxl` → compressed MXL (ZIP archive)
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Score, NotationError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| NotationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_bytes(&data, path.extension().and_then(|e| e.to_str()))
}

/// Parse MusicXML from raw bytes with an optional format hint.
/// If `extension` is None, tries to auto-detect the format.
pub fn parse_bytes(data: &[u8], extension: Option<&str>) -> Result<Score, NotationError> {
    match extension {
        Some("mxl") => parse_mxl(data),
        Some("musicxml") | Some("xml") => parse_musicxml(std::str::from_utf8(data)?),
        _ => {
            // Auto-detect: try as XML first, then as MXL
            if let Ok(xml) = std::str::from_utf8(data) {
                if xml.trim_start().starts_with('<') {
                    return parse_musicxml(xml);
                }
            }
            parse_mxl(data)
        }
    }
}
