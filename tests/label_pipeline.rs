//! End-to-end labeling: MusicXML + rendered page in, annotation files out.

use std::fs;
use std::path::{Path, PathBuf};

use float_cmp::approx_eq;
use omrlabel::annotation::read_annotations;
use omrlabel::batch::{run_batch, BatchConfig};
use omrlabel::{CalibrationProfile, FailureKind, HorizontalPolicy, LabelClass, MeasureGrid};

/// Fresh scratch directory with `png/` and `xml/` inside.
fn workspace(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_output")
        .join(name);
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(dir.join("png")).unwrap();
    fs::create_dir_all(dir.join("xml")).unwrap();
    dir
}

fn config(dir: &Path) -> BatchConfig {
    BatchConfig {
        image_dir: dir.join("png"),
        notation_dir: dir.join("xml"),
        label_dir: dir.join("labels"),
        part_index: 0,
        completion_log: Some(dir.join("completed.txt")),
    }
}

/// Just enough of a PNG for the dimension probe.
fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data
}

fn score(notes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part-list><score-part id="P1"><part-name>Music</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
      {notes}
    </measure>
  </part>
</score-partwise>"#
    )
}

const MELODY: &str = r#"
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
      <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
      <note><rest/><duration>1</duration></note>
      <note><pitch><step>F</step><alter>1</alter><octave>4</octave></pitch><duration>1</duration></note>
      <note><chord/><pitch><step>A</step><octave>4</octave></pitch><duration>1</duration></note>"#;

const RESTS: &str = r#"
      <note><rest/><duration>2</duration></note>
      <note><rest/><duration>2</duration></note>"#;

#[test]
fn labels_a_page_with_the_reference_profile() {
    let dir = workspace("reference_profile");
    fs::write(dir.join("png/sample_0-1.png"), png_header(1000, 800)).unwrap();
    fs::write(dir.join("xml/sample_0.musicxml"), score(MELODY)).unwrap();

    let summary = run_batch(&config(&dir), &CalibrationProfile::default()).unwrap();
    assert_eq!(summary.succeeded.len(), 1);
    assert!(summary.skipped.is_empty());
    assert_eq!(summary.label_count(), 4);

    let file = read_annotations(dir.join("labels/sample_0-1.txt")).unwrap();
    assert!(file.rejected.is_empty());
    let labels = file.labels;
    let texts: Vec<&str> = labels.iter().map(|l| l.text.as_deref().unwrap()).collect();
    assert_eq!(texts, vec!["C4", "D4", "F#4", "A4"]);
    assert!(labels.iter().all(|l| l.class == LabelClass::Notehead));

    // x = 295 + offset / 4 * 605, y = 351.6 + (10 - index) * 6.8875
    let expected = [
        (295.0, 420.475),
        (446.25, 413.5875),
        (748.75, 399.8125),
        (748.75, 386.0375),
    ];
    for (label, (x, y)) in labels.iter().zip(expected) {
        assert!(approx_eq!(f64, label.x_center, x / 1000.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, label.y_center, y / 800.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, label.width, 0.018, epsilon = 1e-6));
        assert!(approx_eq!(f64, label.height, 0.01625, epsilon = 1e-6));
    }

    let completed = fs::read_to_string(dir.join("completed.txt")).unwrap();
    assert_eq!(completed.lines().count(), 1);
    assert!(completed.contains("sample_0-1.txt"));
}

#[test]
fn rests_only_part_writes_an_empty_file() {
    let dir = workspace("rests_only");
    fs::write(dir.join("png/quiet.png"), png_header(1000, 800)).unwrap();
    fs::write(dir.join("xml/quiet.musicxml"), score(RESTS)).unwrap();

    let summary = run_batch(&config(&dir), &CalibrationProfile::default()).unwrap();
    assert_eq!(summary.succeeded.len(), 1);
    assert_eq!(summary.succeeded[0].count, 0);
    assert_eq!(fs::read_to_string(dir.join("labels/quiet.txt")).unwrap(), "");
}

#[test]
fn failures_are_counted_by_kind_and_leave_no_file() {
    let dir = workspace("failures");
    // No notation at all.
    fs::write(dir.join("png/orphan.png"), png_header(1000, 800)).unwrap();
    // Broken notation.
    fs::write(dir.join("png/broken.png"), png_header(1000, 800)).unwrap();
    fs::write(dir.join("xml/broken.musicxml"), "<score-partwise><part").unwrap();
    // Page too narrow for the margins.
    fs::write(dir.join("png/narrow.png"), png_header(300, 800)).unwrap();
    fs::write(dir.join("xml/narrow.musicxml"), score(MELODY)).unwrap();
    // One good page so the batch keeps going past the failures.
    fs::write(dir.join("png/good.png"), png_header(1000, 800)).unwrap();
    fs::write(dir.join("xml/good.xml"), score(MELODY)).unwrap();

    let summary = run_batch(&config(&dir), &CalibrationProfile::default()).unwrap();
    assert_eq!(summary.succeeded.len(), 1);
    assert_eq!(summary.skipped.len(), 3);

    let by_kind = summary.skipped_by_kind();
    assert_eq!(by_kind.get(&FailureKind::MissingInput), Some(&1));
    assert_eq!(by_kind.get(&FailureKind::ParseFailure), Some(&1));
    assert_eq!(by_kind.get(&FailureKind::DegenerateGeometry), Some(&1));

    for stem in ["orphan", "broken", "narrow"] {
        assert!(!dir.join(format!("labels/{stem}.txt")).exists());
    }
    assert!(dir.join("labels/good.txt").exists());

    let completed = fs::read_to_string(dir.join("completed.txt")).unwrap();
    assert_eq!(completed.lines().count(), 1);

    let report = summary.to_json().unwrap();
    assert!(report.contains("\"degenerate_geometry\""));
}

#[test]
fn stale_annotation_survives_a_failing_rerun() {
    let dir = workspace("stale");
    fs::write(dir.join("png/page.png"), png_header(1000, 800)).unwrap();
    fs::write(dir.join("xml/page.musicxml"), score(MELODY)).unwrap();
    run_batch(&config(&dir), &CalibrationProfile::default()).unwrap();
    let before = fs::read_to_string(dir.join("labels/page.txt")).unwrap();

    fs::write(dir.join("xml/page.musicxml"), "not xml").unwrap();
    let summary = run_batch(&config(&dir), &CalibrationProfile::default()).unwrap();
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(fs::read_to_string(dir.join("labels/page.txt")).unwrap(), before);
}

#[test]
fn per_measure_grid_places_noteheads_on_the_grid() {
    let dir = workspace("per_measure");
    fs::write(dir.join("png/grid.png"), png_header(1000, 800)).unwrap();
    fs::write(dir.join("xml/grid.musicxml"), score(MELODY)).unwrap();

    let profile = CalibrationProfile {
        horizontal: HorizontalPolicy::PerMeasure(MeasureGrid::default()),
        ..CalibrationProfile::default()
    };
    run_batch(&config(&dir), &profile).unwrap();

    let labels = read_annotations(dir.join("labels/grid.txt")).unwrap().labels;
    // origin 100, 50 px per quarter, all in measure 1
    let xs: Vec<f64> = labels.iter().map(|l| l.x_center * 1000.0).collect();
    for (x, expected) in xs.iter().zip([100.0, 150.0, 250.0, 250.0]) {
        assert!(approx_eq!(f64, *x, expected, epsilon = 1e-6));
    }
}

#[test]
fn out_of_range_values_fail_only_their_file() {
    let dir = workspace("out_of_range");
    let hostile = [
        ("octave", "<step>C</step><octave>2147483647</octave>"),
        ("alter", "<step>C</step><alter>inf</alter><octave>4</octave>"),
    ];
    for (stem, pitch) in hostile {
        let notes = format!("<note><pitch>{pitch}</pitch><duration>1</duration></note>");
        fs::write(dir.join(format!("png/{stem}.png")), png_header(1000, 800)).unwrap();
        fs::write(dir.join(format!("xml/{stem}.musicxml")), score(&notes)).unwrap();
    }
    fs::write(dir.join("png/negative.png"), png_header(1000, 800)).unwrap();
    let negative = score("<note><rest/><duration>-4</duration></note>");
    fs::write(dir.join("xml/negative.musicxml"), negative).unwrap();
    fs::write(dir.join("png/plain.png"), png_header(1000, 800)).unwrap();
    fs::write(dir.join("xml/plain.musicxml"), score(MELODY)).unwrap();

    let summary = run_batch(&config(&dir), &CalibrationProfile::default()).unwrap();
    assert_eq!(summary.succeeded.len(), 1);
    assert_eq!(
        summary.skipped_by_kind().get(&FailureKind::ParseFailure),
        Some(&3)
    );
    for stem in ["octave", "alter", "negative"] {
        assert!(!dir.join(format!("labels/{stem}.txt")).exists());
    }
}

#[test]
fn clef_change_mid_measure_keeps_spacing() {
    let dir = workspace("clef_change");
    fs::write(dir.join("png/clefs.png"), png_header(1000, 800)).unwrap();
    let notes = r#"
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration></note>
      <attributes><clef><sign>F</sign><line>4</line></clef></attributes>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>2</duration></note>"#;
    let xml = score(notes).replace("<divisions>1</divisions>", "<divisions>2</divisions>");
    fs::write(dir.join("xml/clefs.musicxml"), xml).unwrap();

    let profile = CalibrationProfile {
        horizontal: HorizontalPolicy::PerMeasure(MeasureGrid::default()),
        ..CalibrationProfile::default()
    };
    run_batch(&config(&dir), &profile).unwrap();
    let labels = read_annotations(dir.join("labels/clefs.txt")).unwrap().labels;
    // Second quarter starts one beat (50 px) after the measure origin.
    assert!(approx_eq!(f64, labels[0].x_center * 1000.0, 100.0, epsilon = 1e-6));
    assert!(approx_eq!(f64, labels[1].x_center * 1000.0, 150.0, epsilon = 1e-6));
}
