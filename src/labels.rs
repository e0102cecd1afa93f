//! Label synthesis — one notehead box per notated pitch.

use crate::annotation::{BoundingBoxLabel, LabelClass};
use crate::calibration::CalibrationProfile;
use crate::error::GeometryError;
use crate::events::EventSequence;
use crate::mapper::{check_geometry, event_x, pitch_to_y, PageGeometry};

/// Build the notehead labels of one rendered page.
///
/// Rests are skipped. A chord shares one X and gets one box per pitch, in
/// document order; unisons are not merged since each is its own glyph.
pub fn synthesize_labels(
    sequence: &EventSequence,
    page: &PageGeometry,
    profile: &CalibrationProfile,
) -> Result<Vec<BoundingBoxLabel>, GeometryError> {
    check_geometry(sequence.total_duration, page, profile)?;

    let mut labels = Vec::with_capacity(sequence.notehead_count());
    for event in sequence.events.iter().filter(|e| !e.is_rest()) {
        let x = event_x(event, sequence.total_duration, page, profile)?;
        for pitch in &event.pitches {
            let y = pitch_to_y(pitch, profile);
            if !(0.0..=page.width as f64).contains(&x) || !(0.0..=page.height as f64).contains(&y) {
                log::warn!(
                    "{pitch} in measure {} maps to ({x:.1}, {y:.1}), outside the {}x{} page",
                    event.measure_number,
                    page.width,
                    page.height
                );
            }
            log::debug!("{pitch} at offset {} -> ({x:.1}, {y:.1})", event.part_offset);
            labels.push(BoundingBoxLabel::from_pixels(
                LabelClass::Notehead,
                x,
                y,
                profile.notehead_width,
                profile.notehead_height,
                page,
                Some(pitch.display_name()),
            ));
        }
    }
    Ok(labels)
}
