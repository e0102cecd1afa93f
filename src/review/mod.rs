//! Review overlays — draw stored boxes over the page they were made for.
//!
//! The overlay is an SVG the size of the image that references the image
//! and draws one rectangle and caption per label, so a human can check the
//! calibration at a glance.

mod svg_builder;

use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::{read_annotations, BoundingBoxLabel, LabelClass};
use crate::batch::{is_image, IMAGE_EXTENSIONS};
use crate::error::ReviewError;
use crate::image::image_dimensions;
use crate::mapper::PageGeometry;
use svg_builder::SvgBuilder;

const NOTE_COLOR: &str = "red";
const CLEF_COLOR: &str = "blue";
const UNKNOWN_COLOR: &str = "yellow";
const BOX_STROKE_WIDTH: f64 = 1.0;
const CAPTION_SIZE: f64 = 8.0;
const CAPTION_GAP: f64 = 5.0;

fn class_color(class: LabelClass) -> &'static str {
    match class {
        LabelClass::Notehead => NOTE_COLOR,
        LabelClass::Clef => CLEF_COLOR,
        LabelClass::Other(_) => UNKNOWN_COLOR,
    }
}

/// Render an overlay for `labels` on a page of the given size.
pub fn render_review_svg(
    image_href: &str,
    page: &PageGeometry,
    labels: &[BoundingBoxLabel],
) -> String {
    let mut svg = SvgBuilder::new(page.width as f64, page.height as f64);
    svg.image(image_href);
    for label in labels {
        let (left, top, w, h) = label.to_pixels(page);
        let color = class_color(label.class);
        svg.rect(left, top, w, h, "none", color, BOX_STROKE_WIDTH);
        svg.caption(left, top - CAPTION_GAP, label.caption(), CAPTION_SIZE, color);
    }
    svg.build()
}

/// What one overlay contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewStats {
    pub boxes: usize,
    /// Annotation lines that could not be read
    pub rejected_lines: usize,
}

/// Draw the labels in `labels_path` over `image` and write the SVG to
/// `output`.
pub fn review_file(
    image: &Path,
    labels_path: &Path,
    output: &Path,
) -> Result<ReviewStats, ReviewError> {
    let (width, height) = image_dimensions(image).map_err(|source| ReviewError::Image {
        path: image.to_path_buf(),
        source,
    })?;
    let page = PageGeometry::new(width, height)?;
    let annotations = read_annotations(labels_path).map_err(|source| ReviewError::Annotation {
        path: labels_path.to_path_buf(),
        source,
    })?;

    // Absolute, so the overlay can live in any directory.
    let href = image
        .canonicalize()
        .unwrap_or_else(|_| image.to_path_buf())
        .to_string_lossy()
        .into_owned();
    let svg = render_review_svg(&href, &page, &annotations.labels);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, svg)?;

    Ok(ReviewStats {
        boxes: annotations.labels.len(),
        rejected_lines: annotations.rejected.len(),
    })
}

/// Find the image a label file was made for: same stem first, then the
/// stem without an engraver page suffix.
pub fn find_image(image_dir: &Path, stem: &str) -> Option<PathBuf> {
    let mut stems = vec![stem.to_string()];
    if let Some(base) = stem.strip_suffix("-1") {
        stems.push(base.to_string());
    }
    stems
        .iter()
        .flat_map(|s| {
            IMAGE_EXTENSIONS
                .iter()
                .map(move |ext| image_dir.join(format!("{s}.{ext}")))
        })
        .find(|path| path.is_file() && is_image(path))
}

/// Overlay counts for a whole directory of label files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub rendered: usize,
    pub skipped: usize,
}

/// Render `<stem>_boxed.svg` into `output_dir` for every `.txt` file in
/// `label_dir`.
pub fn review_dir(
    label_dir: &Path,
    image_dir: &Path,
    output_dir: &Path,
) -> std::io::Result<ReviewSummary> {
    let mut label_files: Vec<PathBuf> = fs::read_dir(label_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    label_files.sort();
    if label_files.is_empty() {
        log::warn!("no label files found in '{}'", label_dir.display());
    }

    let mut summary = ReviewSummary::default();
    for labels in &label_files {
        let stem = labels
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(image) = find_image(image_dir, &stem) else {
            log::warn!("no image for {} in '{}'", labels.display(), image_dir.display());
            summary.skipped += 1;
            continue;
        };
        let output = output_dir.join(format!("{stem}_boxed.svg"));
        match review_file(&image, labels, &output) {
            Ok(stats) => {
                log::info!("saved {} boxes to {}", stats.boxes, output.display());
                summary.rendered += 1;
            }
            Err(e) => {
                log::warn!("cannot review {}: {e}", labels.display());
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_are_scaled_to_the_page() {
        let page = PageGeometry::new(1000, 2000).unwrap();
        let labels = vec![
            BoundingBoxLabel {
                class: LabelClass::Notehead,
                x_center: 0.5,
                y_center: 0.25,
                width: 0.02,
                height: 0.01,
                text: Some("C4".to_string()),
            },
            BoundingBoxLabel {
                class: LabelClass::Other(9),
                x_center: 0.1,
                y_center: 0.1,
                width: 0.01,
                height: 0.01,
                text: None,
            },
        ];
        let svg = render_review_svg("page.png", &page, &labels);
        assert!(svg.contains(r#"href="page.png""#));
        assert!(svg.contains(r#"<rect x="490.0" y="490.0" width="20.0" height="20.0" fill="none" stroke="red""#));
        assert!(svg.contains(">C4</text>"));
        assert!(svg.contains(r#"stroke="yellow""#));
        assert!(svg.contains(">unknown</text>"));
    }
}
