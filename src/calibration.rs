//! Calibration profiles — the pixel-measured constants that tie the staff
//! model to one rendering configuration (page layout and resolution).
//!
//! A profile is measured once by hand: render a page, find a notehead of a
//! known pitch, read its center Y and the staff line spacing. Everything else
//! is extrapolated linearly from that anchor, so a change of DPI or page
//! layout means measuring again.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::model::{Pitch, Step, OCTAVE_RANGE};

/// Pixel constants of one rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    /// Pitch whose notehead center was measured
    pub anchor_pitch: Pitch,
    /// Measured Y of the anchor pitch's notehead center
    pub anchor_pixel_y: f64,
    /// Distance between two adjacent staff lines
    pub staff_line_spacing: f64,
    pub notehead_width: f64,
    pub notehead_height: f64,
    /// X where the first note of a part is drawn
    pub left_margin: f64,
    /// Padding between the last note and the right edge of the image
    pub right_margin: f64,
    /// How temporal offsets become X coordinates
    pub horizontal: HorizontalPolicy,
}

/// Strategy for mapping time to X. One policy is used for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum HorizontalPolicy {
    /// The whole part is spread over one line between the margins.
    #[default]
    Proportional,
    /// Every measure is equally wide; time inside a measure is linear.
    PerMeasure(MeasureGrid),
}

/// Uniform measure grid for [`HorizontalPolicy::PerMeasure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureGrid {
    /// X of the start of measure 1
    pub origin_x: f64,
    pub measure_width: f64,
    /// Horizontal distance per quarter note
    pub pixels_per_beat: f64,
}

impl Default for MeasureGrid {
    fn default() -> Self {
        Self {
            origin_x: 100.0,
            measure_width: 150.0,
            pixels_per_beat: 50.0,
        }
    }
}

impl Default for CalibrationProfile {
    /// The reference setup: MuseScore at 200 DPI, treble clef, one system.
    fn default() -> Self {
        Self {
            anchor_pitch: Pitch::new(Step::F, 5),
            anchor_pixel_y: 351.6,
            staff_line_spacing: 13.775,
            notehead_width: 18.0,
            notehead_height: 13.0,
            left_margin: 295.0,
            right_margin: 100.0,
            horizontal: HorizontalPolicy::Proportional,
        }
    }
}

impl CalibrationProfile {
    /// Load a profile from a JSON file. Missing fields take the reference
    /// setup's values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(json: &str) -> Result<Self, CalibrationError> {
        let profile: CalibrationProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String, CalibrationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject profiles no rendering could have produced.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !OCTAVE_RANGE.contains(&self.anchor_pitch.octave) {
            return Err(CalibrationError::Invalid(format!(
                "anchor octave {} is out of range",
                self.anchor_pitch.octave
            )));
        }
        let positive = [
            ("staff_line_spacing", self.staff_line_spacing),
            ("notehead_width", self.notehead_width),
            ("notehead_height", self.notehead_height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CalibrationError::Invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let finite = [
            ("anchor_pixel_y", self.anchor_pixel_y),
            ("left_margin", self.left_margin),
            ("right_margin", self.right_margin),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(CalibrationError::Invalid(format!("{name} is not finite")));
            }
        }
        Ok(())
    }

    /// Vertical distance between adjacent diatonic steps (line to space).
    pub fn step_height(&self) -> f64 {
        self.staff_line_spacing / 2.0
    }
}
