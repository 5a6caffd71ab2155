use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::Deserialize;

/// One physical key on the target keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct Key(pub char);

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Natural-note keys, physical left to right.
pub const WHITE_KEYS: [char; 22] = [
    'z', 'x', 'c', 'v', 'b', 'n', 'm', ',', '.', '/', 'q', 'w', 'e', 'r', 't', 'y', 'u', 'i',
    'o', 'p', '[', ']',
];

/// Accidental keys, physical left to right.
pub const BLACK_KEYS: [char; 15] = [
    's', 'd', 'g', 'h', 'j', 'l', ';', '2', '3', '4', '6', '7', '9', '0', '-',
];

/// Home-row keys handed to the priority range of the instrument layout.
pub const PRIORITY_KEYS: [char; 9] = ['f', 'g', 'h', 'j', 'k', 'l', 'd', 's', 'a'];

/// Semitone offsets of C, D, E, F, G, A, B within an octave.
pub const WHITE_OFFSETS: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Semitone offsets of C#, D#, F#, G#, A# within an octave.
pub const BLACK_OFFSETS: [i32; 5] = [1, 3, 6, 8, 10];

/// Pitch of the leftmost white key (C3).
pub const BASE_PITCH: i32 = 48;

/// Which fixed alphabet a key symbol belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    White,
    Black,
    Priority,
}

impl Key {
    pub fn alphabet(self) -> Option<Alphabet> {
        if WHITE_KEYS.contains(&self.0) {
            Some(Alphabet::White)
        } else if BLACK_KEYS.contains(&self.0) {
            Some(Alphabet::Black)
        } else if PRIORITY_KEYS.contains(&self.0) {
            Some(Alphabet::Priority)
        } else {
            None
        }
    }
}

/// Target key layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Full piano-style layout, 37 keys from C3
    #[default]
    Piano,
    /// 3-octave instrument keyboard with home-row priority keys
    Instrument,
}

/// Parameters of the range-compression transform for the instrument layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Compression {
    pub min_pitch: i32,
    pub max_pitch: i32,
    pub mid_start: i32,
    pub mid_end: i32,
    pub priority_keys: Vec<Key>,
}

impl Default for Compression {
    fn default() -> Self {
        Compression {
            min_pitch: 36,
            max_pitch: 84,
            mid_start: 53,
            mid_end: 55,
            priority_keys: PRIORITY_KEYS.iter().copied().map(Key).collect(),
        }
    }
}

impl Compression {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            i64::from(self.max_pitch) - i64::from(self.min_pitch) >= 12,
            "compression range {}..={} must span at least one octave",
            self.min_pitch,
            self.max_pitch
        );
        anyhow::ensure!(
            self.mid_start <= self.mid_end,
            "priority range {}..={} is empty",
            self.mid_start,
            self.mid_end
        );
        if let Some(key) = self.priority_keys.iter().find(|k| k.alphabet().is_none()) {
            anyhow::bail!("priority key '{key}' is not on the keyboard");
        }
        Ok(())
    }

    pub fn in_range(&self, pitch: i32) -> bool {
        (self.min_pitch..=self.max_pitch).contains(&pitch)
    }

    pub fn is_priority(&self, pitch: i32) -> bool {
        (self.mid_start..=self.mid_end).contains(&pitch)
    }
}

/// Shift `pitch` by whole octaves until it lies in `min..=max`.
///
/// Returns `None` when no octave of `pitch` fits, which can only happen
/// for ranges narrower than an octave.
pub fn fold_into_range(pitch: i32, min: i32, max: i32) -> Option<i32> {
    let mut folded = pitch;
    while folded < min {
        folded += 12;
    }
    while folded > max {
        folded -= 12;
    }
    (min..=max).contains(&folded).then_some(folded)
}

/// Immutable pitch → key table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyMap {
    entries: BTreeMap<i32, Key>,
}

static PIANO: OnceLock<KeyMap> = OnceLock::new();

impl KeyMap {
    /// The full piano table, built on first use.
    pub fn piano() -> &'static KeyMap {
        PIANO.get_or_init(build_piano)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (i32, Key)>) -> Self {
        KeyMap {
            entries: entries.into_iter().collect(),
        }
    }

    /// Build the table for `layout`. The compression parameters only
    /// matter for [`Layout::Instrument`].
    pub fn for_layout(layout: Layout, compression: &Compression) -> anyhow::Result<Self> {
        match layout {
            Layout::Piano => Ok(Self::piano().clone()),
            Layout::Instrument => {
                compression.validate()?;
                Ok(Self::piano().compress(compression))
            }
        }
    }

    /// Derive a compressed table: fold out-of-range pitches by octaves into
    /// the target range, then hand the priority range to the priority keys.
    ///
    /// Folding collisions are resolved last-write-wins in ascending pitch
    /// order. Priority pitches beyond the number of priority keys keep their
    /// folded key.
    pub fn compress(&self, c: &Compression) -> Self {
        let mut adjusted = BTreeMap::new();

        for (&pitch, &key) in &self.entries {
            if c.in_range(pitch) {
                adjusted.insert(pitch, key);
            } else if let Some(folded) = fold_into_range(pitch, c.min_pitch, c.max_pitch) {
                adjusted.insert(folded, key);
            }
        }

        let middle: Vec<i32> = adjusted
            .keys()
            .copied()
            .filter(|&p| c.is_priority(p))
            .collect();
        for (pitch, &key) in middle.into_iter().zip(c.priority_keys.iter()) {
            adjusted.insert(pitch, key);
        }

        KeyMap { entries: adjusted }
    }

    pub fn resolve(&self, pitch: i32) -> Option<Key> {
        self.entries.get(&pitch).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in ascending pitch order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, Key)> + '_ {
        self.entries.iter().map(|(&p, &k)| (p, k))
    }
}

/// Pitch of the `index`-th key of an alphabet laid over `offsets`.
pub fn scale_pitch(index: usize, offsets: &[i32]) -> i32 {
    let octave = (index / offsets.len()) as i32;
    BASE_PITCH + octave * 12 + offsets[index % offsets.len()]
}

fn build_piano() -> KeyMap {
    let white = WHITE_KEYS
        .iter()
        .enumerate()
        .map(|(i, &c)| (scale_pitch(i, &WHITE_OFFSETS), Key(c)));
    let black = BLACK_KEYS
        .iter()
        .enumerate()
        .map(|(i, &c)| (scale_pitch(i, &BLACK_OFFSETS), Key(c)));
    KeyMap::from_entries(white.chain(black))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn piano_covers_contiguous_range() {
        let map = KeyMap::piano();
        assert_eq!(map.len(), WHITE_KEYS.len() + BLACK_KEYS.len());
        let pitches: Vec<i32> = map.iter().map(|(p, _)| p).collect();
        assert_eq!(pitches, (48..=84).collect::<Vec<_>>());
    }

    #[test]
    fn piano_keys_are_unique_and_from_alphabets() {
        let map = KeyMap::piano();
        let keys: HashSet<Key> = map.iter().map(|(_, k)| k).collect();
        assert_eq!(keys.len(), map.len());
        for (_, key) in map.iter() {
            assert!(matches!(
                key.alphabet(),
                Some(Alphabet::White) | Some(Alphabet::Black)
            ));
        }
    }

    #[test]
    fn piano_known_positions() {
        let map = KeyMap::piano();
        assert_eq!(map.resolve(48), Some(Key('z')));
        assert_eq!(map.resolve(49), Some(Key('s')));
        assert_eq!(map.resolve(60), Some(Key(',')));
        assert_eq!(map.resolve(61), Some(Key('l')));
        assert_eq!(map.resolve(65), Some(Key('q')));
        assert_eq!(map.resolve(82), Some(Key('-')));
        assert_eq!(map.resolve(84), Some(Key(']')));
    }

    #[test]
    fn out_of_range_pitches_are_absent() {
        let map = KeyMap::piano();
        assert_eq!(map.resolve(47), None);
        assert_eq!(map.resolve(85), None);
        assert_eq!(map.resolve(200), None);
        assert_eq!(map.resolve(-1), None);
    }

    #[test]
    fn fold_low_pitch_up_an_octave() {
        assert_eq!(fold_into_range(30, 36, 84), Some(42));
        assert_eq!(fold_into_range(0, 36, 84), Some(36));
        assert_eq!(fold_into_range(100, 36, 84), Some(76));
        assert_eq!(fold_into_range(60, 36, 84), Some(60));
    }

    #[test]
    fn fold_fails_for_narrow_range() {
        // 61..=65 holds no C
        assert_eq!(fold_into_range(48, 61, 65), None);
    }

    #[test]
    fn compress_folds_outside_pitch() {
        let full = KeyMap::from_entries([(30, Key('z')), (60, Key('q'))]);
        let c = Compression {
            mid_start: 0,
            mid_end: 0,
            ..Compression::default()
        };
        let compressed = full.compress(&c);
        assert_eq!(compressed.resolve(42), Some(Key('z')));
        assert_eq!(compressed.resolve(30), None);
        assert_eq!(compressed.resolve(60), Some(Key('q')));
    }

    #[test]
    fn compress_collision_last_write_wins() {
        // 18 and 30 both fold onto 42
        let full = KeyMap::from_entries([(18, Key('a')), (30, Key('b'))]);
        let c = Compression {
            mid_start: 0,
            mid_end: 0,
            ..Compression::default()
        };
        let compressed = full.compress(&c);
        assert_eq!(compressed.len(), 1);
        assert_eq!(compressed.resolve(42), Some(Key('b')));
    }

    #[test]
    fn compress_keeps_in_range_pitches_outside_priority() {
        let c = Compression::default();
        let compressed = KeyMap::piano().compress(&c);
        for (pitch, key) in KeyMap::piano().iter() {
            if c.in_range(pitch) && !c.is_priority(pitch) {
                assert_eq!(compressed.resolve(pitch), Some(key), "pitch {pitch}");
            }
        }
    }

    #[test]
    fn compress_results_lie_in_range() {
        let full = KeyMap::from_entries((0..128).map(|p| (p, Key('z'))));
        let c = Compression::default();
        for (pitch, _) in full.compress(&c).iter() {
            assert!(c.in_range(pitch));
        }
    }

    #[test]
    fn instrument_priority_keys() {
        let map = KeyMap::for_layout(Layout::Instrument, &Compression::default()).unwrap();
        assert_eq!(map.resolve(53), Some(Key('f')));
        assert_eq!(map.resolve(54), Some(Key('g')));
        assert_eq!(map.resolve(55), Some(Key('h')));
        assert_eq!(map.resolve(56), Some(Key('h')));
        assert_eq!(map.len(), KeyMap::piano().len());
    }

    #[test]
    fn priority_truncates_when_keys_run_out() {
        let c = Compression {
            mid_start: 60,
            mid_end: 64,
            priority_keys: vec![Key('f'), Key('g')],
            ..Compression::default()
        };
        let map = KeyMap::piano().compress(&c);
        assert_eq!(map.resolve(60), Some(Key('f')));
        assert_eq!(map.resolve(61), Some(Key('g')));
        // remaining priority pitches keep their folded key
        assert_eq!(map.resolve(62), Some(Key('.')));
        assert_eq!(map.resolve(63), Some(Key(';')));
        assert_eq!(map.resolve(64), Some(Key('/')));
    }

    #[test]
    fn compressed_keys_come_from_alphabets() {
        let map = KeyMap::for_layout(Layout::Instrument, &Compression::default()).unwrap();
        for (_, key) in map.iter() {
            assert!(key.alphabet().is_some(), "{key}");
        }
    }

    #[test]
    fn narrow_compression_is_rejected() {
        let c = Compression {
            min_pitch: 60,
            max_pitch: 70,
            ..Compression::default()
        };
        assert!(KeyMap::for_layout(Layout::Instrument, &c).is_err());
        // piano layout ignores compression parameters
        assert!(KeyMap::for_layout(Layout::Piano, &c).is_ok());
    }

    #[test]
    fn extreme_compression_bounds_do_not_overflow() {
        let wide = Compression {
            min_pitch: i32::MIN,
            max_pitch: i32::MAX,
            ..Compression::default()
        };
        assert!(wide.validate().is_ok());
        let inverted = Compression {
            min_pitch: i32::MAX,
            max_pitch: i32::MIN,
            ..Compression::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn inverted_priority_range_is_rejected() {
        let c = Compression {
            mid_start: 56,
            mid_end: 53,
            ..Compression::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn unknown_priority_key_is_rejected() {
        let c = Compression {
            priority_keys: vec![Key('f'), Key('!')],
            ..Compression::default()
        };
        assert!(c.validate().is_err());
        assert!(Compression::default().validate().is_ok());
    }
}
