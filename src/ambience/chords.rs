//! The chord progression the pad cycles through.

#[cfg(feature = "serde")]
use serde::Serialize;

/// Three simultaneous tones, in Hz. Voice 0 takes the root, 1 the third,
/// 2 the fifth.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chord {
    pub name: &'static str,
    pub root: f32,
    pub third: f32,
    pub fifth: f32,
}

impl Chord {
    pub const fn new(name: &'static str, root: f32, third: f32, fifth: f32) -> Self {
        Self {
            name,
            root,
            third,
            fifth,
        }
    }

    /// Tones in voice order.
    pub fn tones(&self) -> [f32; 3] {
        [self.root, self.third, self.fifth]
    }
}

pub const CHORDS: [Chord; 4] = [
    Chord::new("A minor", 220.0, 261.63, 329.63),
    Chord::new("G sus2", 196.0, 246.94, 311.13),
    Chord::new("F major", 174.61, 220.0, 293.66),
    Chord::new("A sus4 resolve", 207.65, 261.63, 311.13),
];

/// Chord at `index`, wrapping around the table.
pub fn chord_at(index: usize) -> &'static Chord {
    &CHORDS[index % CHORDS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_wraps_modulo_table_length() {
        assert_eq!(chord_at(0), chord_at(4));
        assert_eq!(chord_at(3), chord_at(7));
        assert_eq!(chord_at(5).name, "G sus2");
    }

    #[test]
    fn tones_are_root_third_fifth() {
        let chord = chord_at(2);
        assert_eq!(chord.tones(), [174.61, 220.0, 293.66]);
        assert!(CHORDS
            .iter()
            .all(|c| c.root < c.third && c.third < c.fifth));
    }
}
