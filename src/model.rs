//! Data model for a parsed MusicXML score.
//!
//! Only the information needed to place noteheads is kept: part structure,
//! measure timing (divisions, time signature, backup/forward cursor moves)
//! and pitches.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PitchNameError;

/// A complete musical score parsed from MusicXML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// Title of the piece
    pub title: Option<String>,
    /// Composer name
    pub composer: Option<String>,
    /// MusicXML version (e.g., "3.1", "4.0")
    pub version: Option<String>,
    /// Software that created the file
    pub software: Option<String>,
    /// Musical parts (instruments)
    pub parts: Vec<Part>,
}

/// A musical part (one instrument or voice).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Part identifier (e.g., "P1")
    pub id: String,
    /// Part name (e.g., "Piano")
    pub name: String,
    /// Ordered list of measures
    pub measures: Vec<Measure>,
}

/// A single measure (bar) of music.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number as written (0 for a pickup)
    pub number: i32,
    /// Attribute changes, notes, rests and cursor moves in document order
    pub items: Vec<MeasureItem>,
}

/// One timed element of a measure, in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MeasureItem {
    /// `<attributes>`: takes effect from this point of the measure on
    Attributes(Attributes),
    Note(Note),
    /// `<backup>`: move the cursor back by this many divisions
    Backup(i32),
    /// `<forward>`: move the cursor ahead by this many divisions
    Forward(i32),
}

/// Musical attributes declared by one `<attributes>` block. Absent fields
/// keep their earlier values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attributes {
    /// Divisions per quarter note (determines duration resolution)
    pub divisions: Option<i32>,
    /// Time signature
    pub time: Option<TimeSignature>,
    /// Clef(s), one per staff
    pub clefs: Vec<Clef>,
}

/// Time signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub beats: i32,
    /// Denominator (e.g., 4 in 3/4)
    pub beat_type: i32,
}

/// Clef definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clef {
    /// Staff number this clef belongs to (1-based; defaults to 1)
    pub number: i32,
    /// Clef sign: "G" (treble), "F" (bass), "C" (alto/tenor)
    pub sign: String,
    /// Staff line the clef sits on
    pub line: i32,
}

/// A single note or rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Pitch (None if this is a rest or unpitched)
    pub pitch: Option<Pitch>,
    /// Duration in divisions
    pub duration: i32,
    /// Voice number (for multi-voice writing)
    pub voice: Option<i32>,
    /// Staff number (1-based; for multi-staff parts like piano)
    pub staff: Option<i32>,
    /// Note type: "whole", "half", "quarter", "eighth", "16th", "32nd"
    pub note_type: Option<String>,
    /// Whether this is a rest
    pub rest: bool,
    /// Whether this note is part of a chord with the previous note
    pub chord: bool,
    /// Whether this is a grace note
    pub grace: bool,
}

/// Diatonic step letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub const ALL: [Step; 7] = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];

    /// Parse a step letter ("C".."B").
    pub fn from_letter(letter: &str) -> Option<Step> {
        match letter {
            "C" => Some(Step::C),
            "D" => Some(Step::D),
            "E" => Some(Step::E),
            "F" => Some(Step::F),
            "G" => Some(Step::G),
            "A" => Some(Step::A),
            "B" => Some(Step::B),
            _ => None,
        }
    }

    /// Position of the step within its octave, counting up from C.
    pub fn offset(self) -> i32 {
        self as i32
    }

    pub fn letter(self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }
}

/// Octave of the diatonic index origin (C4 = 0).
pub const REFERENCE_OCTAVE: i32 = 4;

/// Octaves a notated pitch may use.
pub const OCTAVE_RANGE: RangeInclusive<i32> = -1..=9;

/// Largest chromatic alteration written with accidentals (double sharp/flat).
pub const MAX_ALTER: f64 = 2.0;

/// Pitch of a note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    /// Octave number (middle C = C4)
    pub octave: i32,
    /// Chromatic alteration: -1.0 = flat, 1.0 = sharp. Never moves the notehead.
    pub alter: Option<f64>,
}

impl Pitch {
    pub fn new(step: Step, octave: i32) -> Self {
        Self {
            step,
            octave,
            alter: None,
        }
    }

    /// Staff position counted in diatonic steps from C4. Saturates for
    /// octaves far outside [`OCTAVE_RANGE`].
    pub fn diatonic_index(&self) -> i32 {
        self.octave
            .saturating_sub(REFERENCE_OCTAVE)
            .saturating_mul(7)
            .saturating_add(self.step.offset())
    }

    /// Single-token name such as `C4`, `F#5` or `Bb3`.
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alter = self
            .alter
            .unwrap_or(0.0)
            .round()
            .clamp(-MAX_ALTER, MAX_ALTER) as i32;
        write!(f, "{}", self.step.letter())?;
        let accidental = if alter > 0 { '#' } else { 'b' };
        for _ in 0..alter.unsigned_abs() {
            write!(f, "{accidental}")?;
        }
        write!(f, "{}", self.octave)
    }
}

impl FromStr for Pitch {
    type Err = PitchNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PitchNameError(s.to_string());
        let step = s.get(..1).and_then(Step::from_letter).ok_or_else(err)?;
        let rest = &s[1..];
        let accidentals = rest.len() - rest.trim_start_matches(['#', 'b']).len();
        let (marks, octave) = rest.split_at(accidentals);
        let octave = octave
            .parse::<i32>()
            .ok()
            .filter(|o| OCTAVE_RANGE.contains(o))
            .ok_or_else(err)?;
        let sharps = marks.chars().filter(|c| *c == '#').count() as i32;
        let flats = marks.chars().filter(|c| *c == 'b').count() as i32;
        if (sharps > 0 && flats > 0) || marks.len() > MAX_ALTER as usize {
            return Err(err());
        }
        let alter = sharps - flats;
        Ok(Pitch {
            step,
            octave,
            alter: (alter != 0).then_some(alter as f64),
        })
    }
}

impl Score {
    /// Create a new empty score.
    pub fn new() -> Self {
        Self {
            title: None,
            composer: None,
            version: None,
            software: None,
            parts: Vec::new(),
        }
    }

    /// Get the number of measures in the first part.
    pub fn measure_count(&self) -> usize {
        self.parts.first().map_or(0, |p| p.measures.len())
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Measure {
    /// Iterate the notes and rests of this measure, skipping cursor moves.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.items.iter().filter_map(|item| match item {
            MeasureItem::Note(note) => Some(note),
            _ => None,
        })
    }
}
