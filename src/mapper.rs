//! Coordinate mapping — pitch to Y, time to X.
//!
//! All functions are pure and take the calibration profile explicitly, so
//! several rendering configurations can be mapped side by side.

use crate::calibration::{CalibrationProfile, HorizontalPolicy, MeasureGrid};
use crate::error::GeometryError;
use crate::events::MusicalEvent;
use crate::model::Pitch;

/// Pixel size of a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
}

impl PageGeometry {
    pub fn new(width: u32, height: u32) -> Result<Self, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::EmptyImage { width, height });
        }
        Ok(Self { width, height })
    }

    /// Horizontal room between the profile's margins.
    pub fn drawable_width(&self, profile: &CalibrationProfile) -> f64 {
        self.width as f64 - profile.left_margin - profile.right_margin
    }
}

/// Y of the notehead center for `pitch`. Higher pitches get smaller Y.
pub fn pitch_to_y(pitch: &Pitch, profile: &CalibrationProfile) -> f64 {
    let steps = pitch.diatonic_index() as f64 - profile.anchor_pitch.diatonic_index() as f64;
    profile.anchor_pixel_y - steps * profile.step_height()
}

/// X for an offset into the part when the whole part fills one line.
pub fn proportional_x(
    part_offset: f64,
    total_duration: f64,
    page: &PageGeometry,
    profile: &CalibrationProfile,
) -> Result<f64, GeometryError> {
    if total_duration <= 0.0 {
        return Err(GeometryError::ZeroDuration);
    }
    let drawable = page.drawable_width(profile);
    if drawable <= 0.0 {
        return Err(GeometryError::NonPositiveDrawableWidth {
            image_width: page.width,
            drawable,
        });
    }
    Ok(profile.left_margin + (part_offset / total_duration) * drawable)
}

/// X where the 1-based `measure_index` begins on a uniform grid.
pub fn measure_base_x(measure_index: usize, grid: &MeasureGrid) -> Result<f64, GeometryError> {
    if measure_index == 0 {
        return Err(GeometryError::InvalidMeasureIndex(measure_index));
    }
    if grid.measure_width <= 0.0 {
        return Err(GeometryError::NonPositiveMeasureWidth(grid.measure_width));
    }
    Ok(grid.origin_x + (measure_index - 1) as f64 * grid.measure_width)
}

/// X for an offset into a measure on a uniform grid.
pub fn per_measure_x(
    offset: f64,
    measure_index: usize,
    grid: &MeasureGrid,
) -> Result<f64, GeometryError> {
    Ok(measure_base_x(measure_index, grid)? + offset * grid.pixels_per_beat)
}

/// X of an event under the profile's horizontal policy.
pub fn event_x(
    event: &MusicalEvent,
    total_duration: f64,
    page: &PageGeometry,
    profile: &CalibrationProfile,
) -> Result<f64, GeometryError> {
    match &profile.horizontal {
        HorizontalPolicy::Proportional => {
            proportional_x(event.part_offset, total_duration, page, profile)
        }
        HorizontalPolicy::PerMeasure(grid) => {
            per_measure_x(event.offset, event.measure_index, grid)
        }
    }
}

/// Fail early if no event of a part could be placed on this page.
pub fn check_geometry(
    total_duration: f64,
    page: &PageGeometry,
    profile: &CalibrationProfile,
) -> Result<(), GeometryError> {
    match &profile.horizontal {
        HorizontalPolicy::Proportional => {
            proportional_x(0.0, total_duration, page, profile).map(|_| ())
        }
        HorizontalPolicy::PerMeasure(grid) => measure_base_x(1, grid).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Step;
    use float_cmp::approx_eq;

    fn page(width: u32) -> PageGeometry {
        PageGeometry::new(width, 1400).unwrap()
    }

    #[test]
    fn higher_pitch_means_smaller_y() {
        let profile = CalibrationProfile::default();
        let mut previous = f64::INFINITY;
        for octave in 2..7 {
            for step in Step::ALL {
                let y = pitch_to_y(&Pitch::new(step, octave), &profile);
                assert!(y < previous, "{step:?}{octave} should be above its predecessor");
                previous = y;
            }
        }
    }

    #[test]
    fn y_is_affine_in_diatonic_index() {
        let profile = CalibrationProfile::default();
        let ys: Vec<f64> = [(Step::G, 3), (Step::A, 3), (Step::B, 3)]
            .iter()
            .map(|&(step, octave)| pitch_to_y(&Pitch::new(step, octave), &profile))
            .collect();
        assert!(approx_eq!(f64, ys[0] - ys[1], 13.775 / 2.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, ys[1] - ys[2], 13.775 / 2.0, epsilon = 1e-9));
    }

    #[test]
    fn anchor_maps_to_its_measured_y() {
        let profile = CalibrationProfile::default();
        let y = pitch_to_y(&profile.anchor_pitch, &profile);
        assert_eq!(y, 351.6);
    }

    #[test]
    fn middle_c_nine_steps_below_anchor() {
        // E5 sits nine diatonic steps above C4.
        let profile = CalibrationProfile {
            anchor_pitch: Pitch::new(Step::E, 5),
            ..CalibrationProfile::default()
        };
        let y = pitch_to_y(&Pitch::new(Step::C, 4), &profile);
        assert!(approx_eq!(f64, y, 351.6 + 9.0 * (13.775 / 2.0), epsilon = 1e-9));
        assert!(approx_eq!(f64, y, 413.5875, epsilon = 1e-9));
    }

    #[test]
    fn middle_c_below_reference_anchor() {
        let profile = CalibrationProfile::default();
        let y = pitch_to_y(&Pitch::new(Step::C, 4), &profile);
        assert!(approx_eq!(f64, y, 420.475, epsilon = 1e-9));
    }

    #[test]
    fn sharps_share_the_natural_position() {
        let profile = CalibrationProfile::default();
        let natural = Pitch::new(Step::F, 4);
        let sharp = Pitch {
            alter: Some(1.0),
            ..natural
        };
        assert_eq!(pitch_to_y(&natural, &profile), pitch_to_y(&sharp, &profile));
    }

    #[test]
    fn proportional_midpoint() {
        let profile = CalibrationProfile::default();
        let x = proportional_x(2.0, 4.0, &page(1000), &profile).unwrap();
        assert!(approx_eq!(f64, x, 597.5, epsilon = 1e-9));
        assert_eq!(proportional_x(0.0, 4.0, &page(1000), &profile).unwrap(), 295.0);
    }

    #[test]
    fn proportional_is_monotonic() {
        let profile = CalibrationProfile::default();
        let xs: Vec<f64> = (0..=16)
            .map(|i| proportional_x(i as f64 * 0.25, 4.0, &page(1200), &profile).unwrap())
            .collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn proportional_rejects_degenerate_inputs() {
        let profile = CalibrationProfile::default();
        assert_eq!(
            proportional_x(0.0, 0.0, &page(1000), &profile),
            Err(GeometryError::ZeroDuration)
        );
        assert!(matches!(
            proportional_x(0.0, 4.0, &page(395), &profile),
            Err(GeometryError::NonPositiveDrawableWidth { image_width: 395, .. })
        ));
        assert!(PageGeometry::new(0, 10).is_err());
    }

    #[test]
    fn per_measure_grid() {
        let grid = MeasureGrid::default();
        assert_eq!(measure_base_x(1, &grid).unwrap(), 100.0);
        assert_eq!(measure_base_x(3, &grid).unwrap(), 400.0);
        assert_eq!(per_measure_x(0.0, 2, &grid).unwrap(), 250.0);
        assert_eq!(per_measure_x(1.5, 2, &grid).unwrap(), 325.0);
        assert_eq!(
            measure_base_x(0, &grid),
            Err(GeometryError::InvalidMeasureIndex(0))
        );
        let flat = MeasureGrid {
            measure_width: 0.0,
            ..grid
        };
        assert_eq!(
            measure_base_x(1, &flat),
            Err(GeometryError::NonPositiveMeasureWidth(0.0))
        );
    }

    #[test]
    fn per_measure_is_monotonic_within_each_measure() {
        let grid = MeasureGrid::default();
        for measure in 1..=6 {
            let base = measure_base_x(measure, &grid).unwrap();
            let xs: Vec<f64> = (0..=16)
                .map(|i| per_measure_x(i as f64 * 0.25, measure, &grid).unwrap())
                .collect();
            assert_eq!(xs[0], base);
            assert!(xs.windows(2).all(|w| w[0] <= w[1]), "measure {measure}: {xs:?}");
        }
        let bases: Vec<f64> = (1..=6).map(|m| measure_base_x(m, &grid).unwrap()).collect();
        assert!(bases.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn event_x_follows_policy() {
        let event = MusicalEvent {
            offset: 1.0,
            part_offset: 5.0,
            duration: 1.0,
            measure_index: 2,
            measure_number: 2,
            pitches: vec![Pitch::new(Step::G, 4)],
        };
        let proportional = CalibrationProfile::default();
        let x = event_x(&event, 8.0, &page(1000), &proportional).unwrap();
        assert!(approx_eq!(f64, x, 295.0 + 5.0 / 8.0 * 605.0, epsilon = 1e-9));

        let per_measure = CalibrationProfile {
            horizontal: HorizontalPolicy::PerMeasure(MeasureGrid::default()),
            ..CalibrationProfile::default()
        };
        assert_eq!(event_x(&event, 8.0, &page(1000), &per_measure).unwrap(), 300.0);
        // Per-measure placement ignores the part's length.
        assert!(check_geometry(0.0, &page(1000), &per_measure).is_ok());
        assert!(check_geometry(0.0, &page(1000), &proportional).is_err());
    }
}
