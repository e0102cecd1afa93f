//! Batch labeling — pair rendered pages with their notation documents and
//! write one annotation file per page.
//!
//! Each page either succeeds or fails on its own; a failure is logged,
//! recorded with its [`FailureKind`] and the batch moves on.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::annotation::{write_annotations, BoundingBoxLabel};
use crate::calibration::CalibrationProfile;
use crate::error::{FailureKind, FileFailure};
use crate::events::score_events;
use crate::image::image_dimensions;
use crate::labels::synthesize_labels;
use crate::mapper::PageGeometry;
use crate::parse_file;

/// Raster extensions picked up from the image directory.
pub(crate) const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
/// Notation extensions tried for each image, in order.
const NOTATION_EXTENSIONS: &[&str] = &["musicxml", "mxl", "xml"];

/// Where a batch reads from and writes to.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub image_dir: PathBuf,
    pub notation_dir: PathBuf,
    pub label_dir: PathBuf,
    /// Index of the part to label in every score
    pub part_index: usize,
    /// File that gets one line per completed annotation file
    pub completion_log: Option<PathBuf>,
}

/// One rendered page and the files that belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePair {
    pub image: PathBuf,
    /// Matching notation document, if one exists
    pub notation: Option<PathBuf>,
    /// Preferred notation path, reported when none exists
    pub expected_notation: PathBuf,
    pub labels: PathBuf,
}

/// Result of labeling one page.
#[derive(Debug)]
pub enum FileOutcome {
    Labeled {
        image: PathBuf,
        labels: PathBuf,
        count: usize,
    },
    Failed {
        image: PathBuf,
        failure: FileFailure,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct LabeledFile {
    pub image: PathBuf,
    pub labels: PathBuf,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub image: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

/// What a batch did, file by file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<LabeledFile>,
    pub skipped: Vec<SkippedFile>,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Labeled {
                image,
                labels,
                count,
            } => self.succeeded.push(LabeledFile {
                image,
                labels,
                count,
            }),
            FileOutcome::Failed { image, failure } => self.skipped.push(SkippedFile {
                image,
                kind: failure.kind(),
                reason: failure.to_string(),
            }),
        }
    }

    pub fn skipped_by_kind(&self) -> BTreeMap<FailureKind, usize> {
        let mut counts = BTreeMap::new();
        for skipped in &self.skipped {
            *counts.entry(skipped.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn label_count(&self) -> usize {
        self.succeeded.iter().map(|f| f.count).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Candidate notation file names for an image stem. Engravers that export
/// one image per page append `-<page>` to the stem, so the bare stem is
/// tried as well.
pub fn notation_candidates(stem: &str) -> Vec<String> {
    let mut stems = vec![stem.to_string()];
    if let Some((base, page)) = stem.rsplit_once('-') {
        if !base.is_empty() && !page.is_empty() && page.chars().all(|c| c.is_ascii_digit()) {
            stems.push(base.to_string());
        }
    }
    stems
        .iter()
        .flat_map(|s| NOTATION_EXTENSIONS.iter().map(move |ext| format!("{s}.{ext}")))
        .collect()
}

pub(crate) fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Find every image in the image directory and its notation document,
/// sorted by image path.
pub fn discover_pairs(config: &BatchConfig) -> io::Result<Vec<PagePair>> {
    let mut images: Vec<PathBuf> = fs::read_dir(&config.image_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    images.sort();

    Ok(images
        .into_iter()
        .map(|image| {
            let stem = image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let candidates = notation_candidates(&stem);
            let notation = candidates
                .iter()
                .map(|name| config.notation_dir.join(name))
                .find(|path| path.is_file());
            PagePair {
                expected_notation: config.notation_dir.join(&candidates[0]),
                notation,
                labels: config.label_dir.join(format!("{stem}.txt")),
                image,
            }
        })
        .collect())
}

/// Compute the labels of one page without writing anything.
pub fn label_page(
    image: &Path,
    notation: &Path,
    part_index: usize,
    profile: &CalibrationProfile,
) -> Result<Vec<BoundingBoxLabel>, FileFailure> {
    for path in [image, notation] {
        if !path.is_file() {
            return Err(FileFailure::MissingInput(path.to_path_buf()));
        }
    }

    let (width, height) = image_dimensions(image).map_err(|source| FileFailure::Image {
        path: image.to_path_buf(),
        source,
    })?;
    let page = PageGeometry::new(width, height)?;

    let notation_failure = |source| FileFailure::Notation {
        path: notation.to_path_buf(),
        source,
    };
    let score = parse_file(notation).map_err(notation_failure)?;
    let sequence = score_events(&score, part_index).map_err(notation_failure)?;

    Ok(synthesize_labels(&sequence, &page, profile)?)
}

/// Label one page and write its annotation file.
pub fn process_pair(
    pair: &PagePair,
    part_index: usize,
    profile: &CalibrationProfile,
) -> FileOutcome {
    let result = pair
        .notation
        .as_deref()
        .ok_or_else(|| FileFailure::MissingInput(pair.expected_notation.clone()))
        .and_then(|notation| label_page(&pair.image, notation, part_index, profile))
        .and_then(|labels| {
            write_annotations(&pair.labels, &labels)
                .map(|_| labels.len())
                .map_err(|source| FileFailure::Output {
                    path: pair.labels.clone(),
                    source,
                })
        });

    match result {
        Ok(count) => FileOutcome::Labeled {
            image: pair.image.clone(),
            labels: pair.labels.clone(),
            count,
        },
        Err(failure) => FileOutcome::Failed {
            image: pair.image.clone(),
            failure,
        },
    }
}

/// Label every page found in `config.image_dir`.
///
/// Only a missing or unreadable image or label directory stops the batch.
pub fn run_batch(config: &BatchConfig, profile: &CalibrationProfile) -> io::Result<BatchSummary> {
    fs::create_dir_all(&config.label_dir)?;
    let pairs = discover_pairs(config)?;
    if pairs.is_empty() {
        log::warn!("no images found in '{}'", config.image_dir.display());
    }

    let mut summary = BatchSummary::default();
    for pair in &pairs {
        log::info!("processing {}", pair.image.display());
        let outcome = process_pair(pair, config.part_index, profile);
        match &outcome {
            FileOutcome::Labeled { labels, count, .. } => {
                log::info!("wrote {count} labels to {}", labels.display());
                if let Some(log_path) = &config.completion_log {
                    if let Err(e) = append_completion(log_path, labels) {
                        log::warn!("cannot update completion log '{}': {e}", log_path.display());
                    }
                }
            }
            FileOutcome::Failed { image, failure } => {
                log::warn!("skipping {}: {failure}", image.display());
            }
        }
        summary.record(outcome);
    }
    Ok(summary)
}

fn append_completion(log_path: &Path, labels: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    writeln!(file, "{}", labels.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn candidates_include_page_suffix_strip() {
        assert_eq!(
            notation_candidates("sample_0-1"),
            vec![
                "sample_0-1.musicxml",
                "sample_0-1.mxl",
                "sample_0-1.xml",
                "sample_0.musicxml",
                "sample_0.mxl",
                "sample_0.xml",
            ]
        );
        assert_eq!(notation_candidates("a-b").len(), 3);
        assert_eq!(notation_candidates("-1").len(), 3);
    }

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_image(Path::new("page.PNG")));
        assert!(is_image(Path::new("page.jpeg")));
        assert!(!is_image(Path::new("page.txt")));
        assert!(!is_image(Path::new("page")));
    }

    #[test]
    fn summary_counts_by_kind() {
        let mut summary = BatchSummary::default();
        summary.record(FileOutcome::Labeled {
            image: PathBuf::from("a.png"),
            labels: PathBuf::from("a.txt"),
            count: 4,
        });
        summary.record(FileOutcome::Failed {
            image: PathBuf::from("b.png"),
            failure: FileFailure::MissingInput(PathBuf::from("b.musicxml")),
        });
        summary.record(FileOutcome::Failed {
            image: PathBuf::from("c.png"),
            failure: FileFailure::MissingInput(PathBuf::from("c.musicxml")),
        });
        assert_eq!(summary.label_count(), 4);
        assert_eq!(
            summary.skipped_by_kind(),
            BTreeMap::from([(FailureKind::MissingInput, 2)])
        );
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"missing_input\""));
    }
}
