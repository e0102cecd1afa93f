//! Flatten one part of a score into timed musical events.
//!
//! Every event answers "where in the measure, where in the part, and which
//! pitches": a rest has no pitches, a single note one, a chord several (in
//! document order). Offsets and durations are in quarter notes.

use crate::error::NotationError;
use crate::model::{MeasureItem, Part, Pitch, Score};

/// Default divisions per quarter note if the part never declares any.
const DEFAULT_DIVISIONS: i32 = 1;

/// A note, chord or rest positioned in time.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicalEvent {
    /// Offset from the start of the measure
    pub offset: f64,
    /// Offset from the start of the part
    pub part_offset: f64,
    pub duration: f64,
    /// 1-based position of the measure within the part
    pub measure_index: usize,
    /// Measure number as written in the document
    pub measure_number: i32,
    pub pitches: Vec<Pitch>,
}

impl MusicalEvent {
    pub fn is_rest(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn is_chord(&self) -> bool {
        self.pitches.len() > 1
    }
}

/// All events of a part in temporal order, plus the part's total length.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSequence {
    pub events: Vec<MusicalEvent>,
    /// Sum of the measure lengths, in quarter notes
    pub total_duration: f64,
    pub measure_count: usize,
}

impl EventSequence {
    /// Number of noteheads drawn for this sequence.
    pub fn notehead_count(&self) -> usize {
        self.events.iter().map(|e| e.pitches.len()).sum()
    }
}

/// Build the event sequence of the part at `part_index`.
pub fn score_events(score: &Score, part_index: usize) -> Result<EventSequence, NotationError> {
    score
        .parts
        .get(part_index)
        .map(part_events)
        .ok_or(NotationError::MissingPart(part_index))
}

/// Build the event sequence of one part.
///
/// `<chord/>` notes join the preceding note, `<backup>`/`<forward>` move
/// the cursor, grace notes are dropped. A divisions change applies from the
/// point where its `<attributes>` block appears. A measure is as long as the
/// furthest point its cursor reached.
pub fn part_events(part: &Part) -> EventSequence {
    let mut events = Vec::new();
    let mut divisions = DEFAULT_DIVISIONS;
    let mut measure_start = 0.0;

    for (i, measure) in part.measures.iter().enumerate() {
        // Quarter notes from the start of the measure.
        let mut cursor: f64 = 0.0;
        let mut furthest: f64 = 0.0;
        let mut measure_events: Vec<MusicalEvent> = Vec::new();

        for item in &measure.items {
            let quarters = move |d: i32| d as f64 / divisions as f64;
            match item {
                MeasureItem::Attributes(attrs) => {
                    if let Some(d) = attrs.divisions {
                        divisions = d.max(1);
                    }
                }
                MeasureItem::Note(note) => {
                    if note.grace {
                        continue;
                    }
                    let pitch = note.pitch.filter(|_| !note.rest);
                    if note.chord {
                        if let Some(last) = measure_events.last_mut() {
                            if !last.is_rest() {
                                last.pitches.extend(pitch);
                                continue;
                            }
                            // Chord tone after a rest: sounds where the rest
                            // starts, without moving the cursor.
                            let offset = last.offset;
                            if let Some(pitch) = pitch {
                                measure_events.push(MusicalEvent {
                                    offset,
                                    part_offset: 0.0,
                                    duration: quarters(note.duration),
                                    measure_index: i + 1,
                                    measure_number: measure.number,
                                    pitches: vec![pitch],
                                });
                            }
                            continue;
                        }
                    }
                    measure_events.push(MusicalEvent {
                        offset: cursor,
                        part_offset: 0.0,
                        duration: quarters(note.duration),
                        measure_index: i + 1,
                        measure_number: measure.number,
                        pitches: pitch.into_iter().collect(),
                    });
                    cursor += quarters(note.duration);
                    furthest = furthest.max(cursor);
                }
                MeasureItem::Backup(d) => cursor = (cursor - quarters(*d)).max(0.0),
                MeasureItem::Forward(d) => {
                    cursor += quarters(*d);
                    furthest = furthest.max(cursor);
                }
            }
        }

        // Stable, so voices that start together keep document order.
        measure_events.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        for mut event in measure_events {
            event.part_offset = measure_start + event.offset;
            events.push(event);
        }
        measure_start += furthest;
    }

    EventSequence {
        events,
        total_duration: measure_start,
        measure_count: part.measures.len(),
    }
}
