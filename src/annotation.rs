//! YOLO annotation files — one normalized bounding box per line.
//!
//! ```text
//! class x_center y_center width height [display_text]
//! 0 0.597500 0.295757 0.018000 0.009286 C4
//! ```
//!
//! The sixth column is optional so files from before display text was added
//! still load.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AnnotationError;
use crate::mapper::PageGeometry;

/// Detector class of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelClass {
    Notehead,
    Clef,
    /// A class id this crate does not know by name
    Other(u32),
}

impl LabelClass {
    pub fn id(self) -> u32 {
        match self {
            LabelClass::Notehead => 0,
            LabelClass::Clef => 1,
            LabelClass::Other(id) => id,
        }
    }

    pub fn from_id(id: u32) -> Self {
        match id {
            0 => LabelClass::Notehead,
            1 => LabelClass::Clef,
            other => LabelClass::Other(other),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LabelClass::Notehead => "note",
            LabelClass::Clef => "clef",
            LabelClass::Other(_) => "unknown",
        }
    }
}

/// A box whose center and size are fractions of the image size.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxLabel {
    pub class: LabelClass,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    /// Single-token caption, e.g. the pitch name
    pub text: Option<String>,
}

impl BoundingBoxLabel {
    /// Normalize a pixel-space box against `page`. Centers and sizes are
    /// clamped into `[0, 1]`.
    pub fn from_pixels(
        class: LabelClass,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        page: &PageGeometry,
        text: Option<String>,
    ) -> Self {
        let w = page.width as f64;
        let h = page.height as f64;
        Self {
            class,
            x_center: (x / w).clamp(0.0, 1.0),
            y_center: (y / h).clamp(0.0, 1.0),
            width: (width / w).clamp(0.0, 1.0),
            height: (height / h).clamp(0.0, 1.0),
            text,
        }
    }

    /// Box in pixels as `(left, top, width, height)`.
    pub fn to_pixels(&self, page: &PageGeometry) -> (f64, f64, f64, f64) {
        let w = self.width * page.width as f64;
        let h = self.height * page.height as f64;
        let left = self.x_center * page.width as f64 - w / 2.0;
        let top = self.y_center * page.height as f64 - h / 2.0;
        (left, top, w, h)
    }

    /// Caption to show for this box: its text, or the class name.
    pub fn caption(&self) -> &str {
        match self.text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => self.class.name(),
        }
    }
}

impl fmt::Display for BoundingBoxLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class.id(),
            self.x_center,
            self.y_center,
            self.width,
            self.height
        )?;
        match self.text.as_deref() {
            Some(text) if !text.is_empty() => write!(f, " {text}"),
            _ => Ok(()),
        }
    }
}

/// Render labels as annotation text, one newline-terminated line each.
pub fn format_annotations(labels: &[BoundingBoxLabel]) -> Result<String, AnnotationError> {
    let mut out = String::new();
    for label in labels {
        if let Some(text) = &label.text {
            if text.is_empty() || text.contains(char::is_whitespace) {
                return Err(AnnotationError::InvalidText(text.clone()));
            }
        }
        out.push_str(&label.to_string());
        out.push('\n');
    }
    Ok(out)
}

/// Parse one line (1-based `line_no`). Blank lines yield `Ok(None)`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<BoundingBoxLabel>, AnnotationError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    if fields.len() != 5 && fields.len() != 6 {
        return Err(AnnotationError::ColumnCount {
            line: line_no,
            found: fields.len(),
        });
    }

    let invalid = |field: &'static str, value: &str| AnnotationError::InvalidField {
        line: line_no,
        field,
        value: value.to_string(),
    };
    let number = |field: &'static str, value: &str| -> Result<f64, AnnotationError> {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(field, value))
    };

    // Some exporters write the class as a float ("0.0").
    let class_id = match fields[0].parse::<u32>() {
        Ok(id) => id,
        Err(_) => {
            let id = number("class", fields[0])?;
            if id < 0.0 || id.fract() != 0.0 || id > u32::MAX as f64 {
                return Err(invalid("class", fields[0]));
            }
            id as u32
        }
    };

    Ok(Some(BoundingBoxLabel {
        class: LabelClass::from_id(class_id),
        x_center: number("x_center", fields[1])?,
        y_center: number("y_center", fields[2])?,
        width: number("width", fields[3])?,
        height: number("height", fields[4])?,
        text: fields.get(5).map(|t| t.to_string()),
    }))
}

/// Labels read from a file, plus the lines that had to be skipped.
#[derive(Debug, Default)]
pub struct AnnotationFile {
    pub labels: Vec<BoundingBoxLabel>,
    pub rejected: Vec<AnnotationError>,
}

/// Parse annotation text, skipping malformed lines.
pub fn parse_annotations(text: &str) -> AnnotationFile {
    let mut file = AnnotationFile::default();
    for (i, line) in text.lines().enumerate() {
        match parse_line(i + 1, line) {
            Ok(Some(label)) => file.labels.push(label),
            Ok(None) => {}
            Err(e) => {
                log::warn!("skipping annotation line: {e}");
                file.rejected.push(e);
            }
        }
    }
    file
}

pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<AnnotationFile, AnnotationError> {
    Ok(parse_annotations(&fs::read_to_string(path)?))
}

/// Write labels to `path` in one piece: the content goes to a temporary
/// sibling first and is renamed into place, so readers never see half a
/// file.
pub fn write_annotations<P: AsRef<Path>>(
    path: P,
    labels: &[BoundingBoxLabel],
) -> Result<(), AnnotationError> {
    let path = path.as_ref();
    let content = format_annotations(labels)?;
    let temp = temp_path(path);
    if let Err(e) = fs::write(&temp, content).and_then(|_| fs::rename(&temp, path)) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}
