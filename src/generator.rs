//! Synthetic score generation — random single-part scores to feed the
//! engraver, written back out as MusicXML.
//!
//! Generation is deterministic for a given seed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::*;

/// Divisions per quarter note in generated scores.
const DIVISIONS: i32 = 4;

/// Shape of the generated scores.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub title: String,
    pub composer: String,
    /// Number of notes, chords and rests per score
    pub length: usize,
    /// Pitches to draw from
    pub pitches: Vec<Pitch>,
    /// Durations to draw from, in quarter notes
    pub durations: Vec<f64>,
    /// Probability that a note becomes a two-note chord
    pub chord_probability: f64,
    /// Probability that an event is a rest
    pub rest_probability: f64,
    /// Quarter notes per measure (4/4 when 4)
    pub beats_per_measure: i32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let pitches = [
            (Step::C, 4),
            (Step::D, 4),
            (Step::E, 4),
            (Step::F, 4),
            (Step::G, 4),
            (Step::A, 4),
            (Step::B, 4),
            (Step::C, 5),
        ]
        .into_iter()
        .map(|(step, octave)| Pitch::new(step, octave))
        .collect();
        Self {
            title: "Synthetic Example".to_string(),
            composer: "OCRchestraBot".to_string(),
            length: 4,
            pitches,
            durations: vec![1.0],
            chord_probability: 0.0,
            rest_probability: 0.0,
            beats_per_measure: 4,
        }
    }
}

/// Seedable source of randomness for generation.
#[derive(Debug)]
pub struct Rng(oorandom::Rand64);

impl Rng {
    pub fn new_with_seed(seed: u64) -> Self {
        Self(oorandom::Rand64::new(seed as u128))
    }

    fn chance(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.0.rand_float() < probability
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.0.rand_range(0..items.len() as u64) as usize]
    }
}

/// Generate one random score.
///
/// Durations that would cross a barline are not chosen; when nothing fits,
/// the measure is filled with a rest.
pub fn generate_score(config: &GeneratorConfig, rng: &mut Rng) -> Score {
    let measure_len = config.beats_per_measure.max(1) * DIVISIONS;
    let durations: Vec<i32> = config
        .durations
        .iter()
        .map(|d| (d * DIVISIONS as f64).round() as i32)
        .filter(|d| *d > 0 && *d <= measure_len)
        .collect();
    let durations = if durations.is_empty() {
        vec![DIVISIONS]
    } else {
        durations
    };

    let mut measures: Vec<Measure> = Vec::new();
    let mut filled = measure_len;
    for _ in 0..config.length {
        if filled == measure_len {
            measures.push(new_measure(measures.len(), config));
            filled = 0;
        }
        let remaining = measure_len - filled;
        let fitting: Vec<i32> = durations.iter().copied().filter(|d| *d <= remaining).collect();
        let Some(measure) = measures.last_mut() else {
            break;
        };
        if fitting.is_empty() || config.pitches.is_empty() {
            measure.items.push(MeasureItem::Note(rest(remaining)));
            filled = measure_len;
            continue;
        }

        let duration = *rng.pick(&fitting);
        if rng.chance(config.rest_probability) {
            measure.items.push(MeasureItem::Note(rest(duration)));
        } else {
            let pitch = *rng.pick(&config.pitches);
            measure.items.push(MeasureItem::Note(note(pitch, duration, false)));
            if rng.chance(config.chord_probability) {
                let others: Vec<Pitch> = config
                    .pitches
                    .iter()
                    .copied()
                    .filter(|p| p.diatonic_index() != pitch.diatonic_index())
                    .collect();
                if !others.is_empty() {
                    let second = *rng.pick(&others);
                    measure.items.push(MeasureItem::Note(note(second, duration, true)));
                }
            }
        }
        filled += duration;
    }

    // Pad the last measure so the part ends on a barline.
    if let Some(measure) = measures.last_mut() {
        if filled < measure_len {
            measure.items.push(MeasureItem::Note(rest(measure_len - filled)));
        }
    }

    Score {
        title: Some(config.title.clone()),
        composer: Some(config.composer.clone()),
        version: Some("4.0".to_string()),
        software: Some(format!("omrlabel {}", env!("CARGO_PKG_VERSION"))),
        parts: vec![Part {
            id: "P1".to_string(),
            name: "Music".to_string(),
            measures,
        }],
    }
}

fn new_measure(index: usize, config: &GeneratorConfig) -> Measure {
    let attributes = (index == 0).then(|| Attributes {
        divisions: Some(DIVISIONS),
        time: Some(TimeSignature {
            beats: config.beats_per_measure.max(1),
            beat_type: 4,
        }),
        clefs: vec![Clef {
            number: 1,
            sign: "G".to_string(),
            line: 2,
        }],
    });
    Measure {
        number: index as i32 + 1,
        items: attributes.map(MeasureItem::Attributes).into_iter().collect(),
    }
}

fn note(pitch: Pitch, duration: i32, chord: bool) -> Note {
    Note {
        pitch: Some(pitch),
        duration,
        voice: Some(1),
        staff: None,
        note_type: note_type(duration).map(String::from),
        rest: false,
        chord,
        grace: false,
    }
}

fn rest(duration: i32) -> Note {
    Note {
        pitch: None,
        duration,
        voice: Some(1),
        staff: None,
        note_type: note_type(duration).map(String::from),
        rest: true,
        chord: false,
        grace: false,
    }
}

fn note_type(duration: i32) -> Option<&'static str> {
    match duration {
        1 => Some("16th"),
        2 => Some("eighth"),
        4 => Some("quarter"),
        8 => Some("half"),
        16 => Some("whole"),
        _ => None,
    }
}

/// Serialize a score as partwise MusicXML.
pub fn to_musicxml(score: &Score) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#);
    xml.push('\n');
    xml.push_str(&format!(
        "<score-partwise version=\"{}\">\n",
        escape_xml(score.version.as_deref().unwrap_or("4.0"))
    ));

    if let Some(title) = &score.title {
        xml.push_str("  <work>\n");
        xml.push_str(&format!("    <work-title>{}</work-title>\n", escape_xml(title)));
        xml.push_str("  </work>\n");
    }
    if score.composer.is_some() || score.software.is_some() {
        xml.push_str("  <identification>\n");
        if let Some(composer) = &score.composer {
            xml.push_str(&format!(
                "    <creator type=\"composer\">{}</creator>\n",
                escape_xml(composer)
            ));
        }
        if let Some(software) = &score.software {
            xml.push_str("    <encoding>\n");
            xml.push_str(&format!("      <software>{}</software>\n", escape_xml(software)));
            xml.push_str("    </encoding>\n");
        }
        xml.push_str("  </identification>\n");
    }

    xml.push_str("  <part-list>\n");
    for part in &score.parts {
        xml.push_str(&format!("    <score-part id=\"{}\">\n", escape_xml(&part.id)));
        xml.push_str(&format!("      <part-name>{}</part-name>\n", escape_xml(&part.name)));
        xml.push_str("    </score-part>\n");
    }
    xml.push_str("  </part-list>\n");

    for part in &score.parts {
        xml.push_str(&format!("  <part id=\"{}\">\n", escape_xml(&part.id)));
        for measure in &part.measures {
            xml.push_str(&measure_to_xml(measure));
        }
        xml.push_str("  </part>\n");
    }

    xml.push_str("</score-partwise>\n");
    xml
}

fn measure_to_xml(measure: &Measure) -> String {
    let mut xml = format!("    <measure number=\"{}\">\n", measure.number);

    for item in &measure.items {
        match item {
            MeasureItem::Attributes(attrs) => xml.push_str(&attributes_to_xml(attrs)),
            MeasureItem::Note(note) => xml.push_str(&note_to_xml(note)),
            MeasureItem::Backup(d) => {
                xml.push_str(&format!("      <backup><duration>{d}</duration></backup>\n"))
            }
            MeasureItem::Forward(d) => {
                xml.push_str(&format!("      <forward><duration>{d}</duration></forward>\n"))
            }
        }
    }

    xml.push_str("    </measure>\n");
    xml
}

fn attributes_to_xml(attrs: &Attributes) -> String {
    let mut xml = String::from("      <attributes>\n");
    if let Some(divisions) = attrs.divisions {
        xml.push_str(&format!("        <divisions>{divisions}</divisions>\n"));
    }
    if let Some(time) = &attrs.time {
        xml.push_str("        <time>\n");
        xml.push_str(&format!("          <beats>{}</beats>\n", time.beats));
        xml.push_str(&format!("          <beat-type>{}</beat-type>\n", time.beat_type));
        xml.push_str("        </time>\n");
    }
    for clef in &attrs.clefs {
        xml.push_str(&format!("        <clef number=\"{}\">\n", clef.number));
        xml.push_str(&format!("          <sign>{}</sign>\n", escape_xml(&clef.sign)));
        xml.push_str(&format!("          <line>{}</line>\n", clef.line));
        xml.push_str("        </clef>\n");
    }
    xml.push_str("      </attributes>\n");
    xml
}

fn note_to_xml(note: &Note) -> String {
    let mut xml = String::from("      <note>\n");
    if note.chord {
        xml.push_str("        <chord/>\n");
    }
    match (&note.pitch, note.rest) {
        (Some(pitch), false) => {
            xml.push_str("        <pitch>\n");
            xml.push_str(&format!("          <step>{}</step>\n", pitch.step.letter()));
            if let Some(alter) = pitch.alter.filter(|a| *a != 0.0) {
                xml.push_str(&format!("          <alter>{alter}</alter>\n"));
            }
            xml.push_str(&format!("          <octave>{}</octave>\n", pitch.octave));
            xml.push_str("        </pitch>\n");
        }
        _ => xml.push_str("        <rest/>\n"),
    }
    xml.push_str(&format!("        <duration>{}</duration>\n", note.duration));
    if let Some(voice) = note.voice {
        xml.push_str(&format!("        <voice>{voice}</voice>\n"));
    }
    if let Some(note_type) = &note.note_type {
        xml.push_str(&format!("        <type>{note_type}</type>\n"));
    }
    if let Some(staff) = note.staff {
        xml.push_str(&format!("        <staff>{staff}</staff>\n"));
    }
    xml.push_str("      </note>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write `count` scores named `sample_<i>.musicxml` into `dir`.
pub fn generate_dir(
    dir: &Path,
    count: usize,
    config: &GeneratorConfig,
    seed: u64,
) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut rng = Rng::new_with_seed(seed);
    let mut written = Vec::with_capacity(count);
    for i in 0..count {
        let score = generate_score(config, &mut rng);
        let path = dir.join(format!("sample_{i}.musicxml"));
        fs::write(&path, to_musicxml(&score))?;
        log::info!("generated {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::part_events;
    use crate::parser::parse_musicxml;

    #[test]
    fn same_seed_same_score() {
        let config = GeneratorConfig {
            length: 12,
            chord_probability: 0.3,
            ..GeneratorConfig::default()
        };
        let a = to_musicxml(&generate_score(&config, &mut Rng::new_with_seed(7)));
        let b = to_musicxml(&generate_score(&config, &mut Rng::new_with_seed(7)));
        assert_eq!(a, b);
    }

    #[test]
    fn default_score_is_one_measure_of_quarters() {
        let score = generate_score(&GeneratorConfig::default(), &mut Rng::new_with_seed(1));
        let seq = part_events(&score.parts[0]);
        assert_eq!(seq.events.len(), 4);
        assert_eq!(seq.measure_count, 1);
        assert_eq!(seq.total_duration, 4.0);
        assert!(seq.events.iter().all(|e| e.pitches.len() == 1));
    }

    #[test]
    fn written_xml_parses_back() {
        let config = GeneratorConfig {
            length: 10,
            durations: vec![0.5, 1.0, 2.0],
            chord_probability: 0.5,
            rest_probability: 0.2,
            ..GeneratorConfig::default()
        };
        let score = generate_score(&config, &mut Rng::new_with_seed(42));
        let parsed = parse_musicxml(&to_musicxml(&score)).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Synthetic Example"));
        assert_eq!(parsed.composer.as_deref(), Some("OCRchestraBot"));

        let original = part_events(&score.parts[0]);
        let reparsed = part_events(&parsed.parts[0]);
        assert_eq!(original, reparsed);
        // Every measure is full, so the part ends on a barline.
        assert_eq!(reparsed.total_duration, 4.0 * reparsed.measure_count as f64);
    }

    #[test]
    fn chords_use_two_distinct_positions() {
        let config = GeneratorConfig {
            length: 16,
            chord_probability: 1.0,
            ..GeneratorConfig::default()
        };
        let score = generate_score(&config, &mut Rng::new_with_seed(3));
        let seq = part_events(&score.parts[0]);
        for event in &seq.events {
            assert_eq!(event.pitches.len(), 2);
            assert_ne!(
                event.pitches[0].diatonic_index(),
                event.pitches[1].diatonic_index()
            );
        }
    }
}
