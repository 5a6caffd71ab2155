use std::collections::BTreeSet;
use std::fmt;

use crate::events::{NoteEvent, NoteKind};
use crate::keymap::{
    BLACK_KEYS, BLACK_OFFSETS, Compression, Key, KeyMap, Layout, WHITE_KEYS, WHITE_OFFSETS,
    scale_pitch,
};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scientific pitch name, e.g. 60 → `C4`.
pub fn note_name(pitch: i32) -> String {
    let octave = pitch.div_euclid(12) - 1;
    let name = NOTE_NAMES[pitch.rem_euclid(12) as usize];
    format!("{name}{octave}")
}

/// Which of the pitches used by a song have a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    /// Distinct NoteOn pitches, ascending, with their key if mapped.
    pub notes: Vec<(i32, Option<Key>)>,
}

impl Coverage {
    pub fn analyze(keymap: &KeyMap, events: &[NoteEvent]) -> Self {
        let used: BTreeSet<i32> = events
            .iter()
            .filter(|e| e.kind == NoteKind::NoteOn)
            .map(|e| e.pitch)
            .collect();
        Coverage {
            notes: used.into_iter().map(|p| (p, keymap.resolve(p))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn mapped(&self) -> usize {
        self.notes.iter().filter(|(_, k)| k.is_some()).count()
    }

    /// Lowest and highest pitch used.
    pub fn range(&self) -> Option<(i32, i32)> {
        let first = self.notes.first()?.0;
        let last = self.notes.last()?.0;
        Some((first, last))
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Note Analysis ===")?;
        writeln!(f, "Total unique notes used: {}", self.len())?;
        match self.range() {
            Some((lo, hi)) => writeln!(f, "Note range: {lo} - {hi}")?,
            None => writeln!(f, "Note range: (none)")?,
        }
        for &(pitch, key) in &self.notes {
            let name = note_name(pitch);
            match key {
                Some(key) => writeln!(f, "  MIDI {pitch} ({name}) -> Key '{key}'")?,
                None => writeln!(f, "  MIDI {pitch} ({name}) -> NOT MAPPED")?,
            }
        }
        write!(f, "Mapped notes: {}/{}", self.mapped(), self.len())
    }
}

/// Human-readable listing of a mapping table.
///
/// The piano layout is listed per alphabet in physical order; the
/// instrument layout lists the in-range part of `keymap` by pitch and marks
/// the priority range.
pub struct MappingReport<'a> {
    layout: Layout,
    keymap: &'a KeyMap,
    compression: &'a Compression,
}

pub fn render_mapping<'a>(
    layout: Layout,
    keymap: &'a KeyMap,
    compression: &'a Compression,
) -> MappingReport<'a> {
    MappingReport {
        layout,
        keymap,
        compression,
    }
}

impl fmt::Display for MappingReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layout {
            Layout::Piano => {
                writeln!(f, "=== Full Piano Keyboard Mapping ===")?;
                writeln!(f, "White Keys (low to high):")?;
                for (i, key) in WHITE_KEYS.iter().enumerate() {
                    writeln!(f, "  {key} -> {}", note_name(scale_pitch(i, &WHITE_OFFSETS)))?;
                }
                writeln!(f, "\nBlack Keys (low to high):")?;
                for (i, key) in BLACK_KEYS.iter().enumerate() {
                    writeln!(f, "  {key} -> {}", note_name(scale_pitch(i, &BLACK_OFFSETS)))?;
                }
            }
            Layout::Instrument => {
                let c = self.compression;
                writeln!(f, "=== Instrument Keyboard Mapping ===")?;
                writeln!(
                    f,
                    "Range: {} to {}, priority {} to {}",
                    note_name(c.min_pitch),
                    note_name(c.max_pitch),
                    note_name(c.mid_start),
                    note_name(c.mid_end)
                )?;
                for (pitch, key) in self.keymap.iter().filter(|&(p, _)| c.in_range(p)) {
                    let marker = if c.is_priority(pitch) { " (PRIORITY)" } else { "" };
                    writeln!(f, "  {key} -> {} (MIDI {pitch}){marker}", note_name(pitch))?;
                }
            }
        }
        Ok(())
    }
}

/// Keys a song would press, in order, without timing.
pub fn key_sequence(keymap: &KeyMap, events: &[NoteEvent]) -> Vec<(Key, i32)> {
    events
        .iter()
        .filter(|e| e.is_note_on())
        .filter_map(|e| keymap.resolve(e.pitch).map(|k| (k, e.pitch)))
        .collect()
}
