//! MusicXML parser — converts MusicXML XML into the Score data model.

use roxmltree::{Document, Node};

use crate::error::NotationError;
use crate::model::*;

/// Parse a MusicXML XML string into a Score.
pub fn parse_musicxml(xml: &str) -> Result<Score, NotationError> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, options)?;
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(NotationError::UnsupportedRoot(
            root.tag_name().name().to_string(),
        ));
    }

    let mut score = Score::new();
    score.version = root.attribute("version").map(String::from);

    for child in root.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "work" => parse_work(&child, &mut score),
            "movement-title" => {
                if score.title.is_none() {
                    score.title = child.text().map(|t| t.trim().to_string());
                }
            }
            "identification" => parse_identification(&child, &mut score),
            "part-list" => parse_part_list(&child, &mut score),
            "part" => parse_part(&child, &mut score)?,
            _ => {}
        }
    }

    Ok(score)
}

// ─── Header ──────────────────────────────────────────────────────────

fn parse_work(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "work-title" {
            score.title = child.text().map(|t| t.trim().to_string());
        }
    }
}

fn parse_identification(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "creator" if child.attribute("type") == Some("composer") => {
                score.composer = child.text().map(|t| t.trim().to_string());
            }
            "encoding" => {
                for enc_child in child.children().filter(|n| n.is_element()) {
                    if enc_child.tag_name().name() == "software" {
                        score.software = enc_child.text().map(|t| t.trim().to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

// ─── Part List ───────────────────────────────────────────────────────

fn parse_part_list(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "score-part" {
            let id = child.attribute("id").unwrap_or("").to_string();
            let name = child
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "part-name")
                .and_then(|n| n.text())
                .unwrap_or("")
                .trim()
                .to_string();
            score.parts.push(Part {
                id,
                name,
                measures: Vec::new(),
            });
        }
    }
}

// ─── Part (measures) ─────────────────────────────────────────────────

fn parse_part(node: &Node, score: &mut Score) -> Result<(), NotationError> {
    let part_id = node.attribute("id").unwrap_or("").to_string();

    // Parts missing from the part-list are still usable.
    let index = match score.parts.iter().position(|p| p.id == part_id) {
        Some(i) => i,
        None => {
            score.parts.push(Part {
                id: part_id,
                name: String::new(),
                measures: Vec::new(),
            });
            score.parts.len() - 1
        }
    };

    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "measure" {
            let measure = parse_measure(&child)?;
            score.parts[index].measures.push(measure);
        }
    }
    Ok(())
}

// ─── Measure ─────────────────────────────────────────────────────────

fn parse_measure(node: &Node) -> Result<Measure, NotationError> {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse::<i32>().ok())
        .unwrap_or(0);

    let mut measure = Measure {
        number,
        items: Vec::new(),
    };

    for child in node.children().filter(|n| n.is_element()) {
        let item = match child.tag_name().name() {
            "attributes" => MeasureItem::Attributes(parse_attributes(&child, number)?),
            "note" => MeasureItem::Note(parse_note(&child, number)?),
            "backup" => MeasureItem::Backup(child_duration(&child, number)?),
            "forward" => MeasureItem::Forward(child_duration(&child, number)?),
            _ => continue,
        };
        measure.items.push(item);
    }

    Ok(measure)
}

/// `<duration>` of a `<backup>` or `<forward>` element.
fn child_duration(node: &Node, measure: i32) -> Result<i32, NotationError> {
    match node
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "duration")
    {
        Some(duration) => parse_duration(&duration, measure),
        None => Ok(0),
    }
}

/// A `<duration>` in divisions. Unreadable text counts as zero; negative
/// values cannot be placed on a timeline.
fn parse_duration(node: &Node, measure: i32) -> Result<i32, NotationError> {
    match parse_i32(node) {
        Some(d) if d < 0 => Err(NotationError::InvalidDuration {
            measure,
            message: format!("negative duration {d}"),
        }),
        Some(d) => Ok(d),
        None => Ok(0),
    }
}

// ─── Attributes ──────────────────────────────────────────────────────

fn parse_attributes(node: &Node, measure: i32) -> Result<Attributes, NotationError> {
    let mut attrs = Attributes {
        divisions: None,
        time: None,
        clefs: Vec::new(),
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "divisions" => {
                let divisions = parse_i32(&child);
                if let Some(d) = divisions.filter(|d| *d <= 0) {
                    return Err(NotationError::InvalidDuration {
                        measure,
                        message: format!("divisions must be positive, got {d}"),
                    });
                }
                attrs.divisions = divisions;
            }
            "time" => attrs.time = Some(parse_time(&child)),
            "clef" => attrs.clefs.push(parse_clef(&child)),
            _ => {}
        }
    }

    Ok(attrs)
}

fn parse_time(node: &Node) -> TimeSignature {
    let mut ts = TimeSignature {
        beats: 4,
        beat_type: 4,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "beats" => ts.beats = parse_i32(&child).unwrap_or(4),
            "beat-type" => ts.beat_type = parse_i32(&child).unwrap_or(4),
            _ => {}
        }
    }
    ts
}

fn parse_clef(node: &Node) -> Clef {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse::<i32>().ok())
        .unwrap_or(1);
    let mut clef = Clef {
        number,
        sign: "G".to_string(),
        line: 2,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "sign" => clef.sign = child.text().unwrap_or("G").trim().to_string(),
            "line" => clef.line = parse_i32(&child).unwrap_or(2),
            _ => {}
        }
    }
    clef
}

// ─── Note ────────────────────────────────────────────────────────────

fn parse_note(node: &Node, measure: i32) -> Result<Note, NotationError> {
    let mut note = Note {
        pitch: None,
        duration: 0,
        voice: None,
        staff: None,
        note_type: None,
        rest: false,
        chord: false,
        grace: false,
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "pitch" => note.pitch = Some(parse_pitch(&child, measure)?),
            "duration" => note.duration = parse_duration(&child, measure)?,
            "voice" => note.voice = parse_i32(&child),
            "staff" => note.staff = parse_i32(&child),
            "type" => note.note_type = child.text().map(|t| t.trim().to_string()),
            "rest" => note.rest = true,
            "chord" => note.chord = true,
            "grace" => note.grace = true,
            _ => {}
        }
    }

    Ok(note)
}

fn parse_pitch(node: &Node, measure: i32) -> Result<Pitch, NotationError> {
    let mut step = None;
    let mut octave = None;
    let mut alter = None;
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "step" => {
                let letter = child.text().unwrap_or("").trim();
                step = Some(Step::from_letter(letter).ok_or_else(|| {
                    NotationError::InvalidPitch {
                        measure,
                        message: format!("unknown step '{letter}'"),
                    }
                })?);
            }
            "octave" => octave = parse_i32(&child),
            "alter" => alter = parse_f64(&child),
            _ => {}
        }
    }
    let invalid = |message: String| NotationError::InvalidPitch { measure, message };
    if let Some(o) = octave.filter(|o| !OCTAVE_RANGE.contains(o)) {
        return Err(invalid(format!("octave {o} is out of range")));
    }
    if let Some(a) = alter.filter(|a| !(a.is_finite() && a.abs() <= MAX_ALTER)) {
        return Err(invalid(format!("alteration {a} is out of range")));
    }
    match (step, octave) {
        (Some(step), Some(octave)) => Ok(Pitch {
            step,
            octave,
            alter,
        }),
        _ => Err(NotationError::InvalidPitch {
            measure,
            message: "pitch needs both <step> and <octave>".to_string(),
        }),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn parse_i32(node: &Node) -> Option<i32> {
    node.text()?.trim().parse().ok()
}

fn parse_f64(node: &Node) -> Option<f64> {
    node.text()?.trim().parse().ok()
}
