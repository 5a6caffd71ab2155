use std::path::{Path, PathBuf};

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    NoteOn,
    NoteOff,
}

/// A note event extracted from one `midicsv` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub track: i32,
    pub tick: i64,
    pub kind: NoteKind,
    pub channel: i32,
    pub pitch: i32,
    pub velocity: i32,
}

impl NoteEvent {
    /// NoteOn with a non-zero velocity. Anything else releases.
    pub fn is_note_on(&self) -> bool {
        self.kind == NoteKind::NoteOn && self.velocity > 0
    }
}

/// Anything that can hand the player an ordered list of note events.
pub trait EventSource {
    fn load(&self) -> anyhow::Result<Vec<NoteEvent>>;
}

/// A `midicsv` export on disk.
pub struct CsvFile {
    path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for CsvFile {
    fn load(&self) -> anyhow::Result<Vec<NoteEvent>> {
        log::info!("Loading MIDI events from {}", self.path.display());
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read {}", self.path.display()))?;
        let events = parse(&content);
        log::info!("Loaded {} note events", events.len());
        Ok(events)
    }
}

/// Parse `midicsv` text into note events sorted by tick.
///
/// Rows that are not note events, or that are too short or non-numeric,
/// are skipped. Events on the same tick keep their input order.
pub fn parse(text: &str) -> Vec<NoteEvent> {
    let mut events: Vec<NoteEvent> = text
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let event = parse_row(line);
            if event.is_none() && looks_like_note_row(line) {
                log::debug!("Skipping malformed note row {}: {line}", i + 1);
            }
            event
        })
        .collect();
    // sort_by_key is stable
    events.sort_by_key(|e| e.tick);
    events
}

/// Parse a single row: `track, tick, kind, channel, pitch, velocity`.
pub fn parse_row(line: &str) -> Option<NoteEvent> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 6 {
        return None;
    }

    let kind = match fields[2] {
        "Note_on_c" => NoteKind::NoteOn,
        "Note_off_c" => NoteKind::NoteOff,
        _ => return None,
    };

    Some(NoteEvent {
        track: fields[0].parse().ok()?,
        tick: fields[1].parse().ok()?,
        kind,
        channel: fields[3].parse().ok()?,
        pitch: fields[4].parse().ok()?,
        velocity: fields[5].parse().ok()?,
    })
}

fn looks_like_note_row(line: &str) -> bool {
    line.contains("Note_on_c") || line.contains("Note_off_c")
}
