use super::key::KeySignature;
use super::tables::{degree_offsets, MusicTheory};

/// Moves melodies between keys degree-for-degree.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScaleTransformer {
    theory: MusicTheory,
}

impl ScaleTransformer {
    pub fn new(theory: MusicTheory) -> Self {
        Self { theory }
    }

    /// Snap each frequency to its nearest degree of `from` and re-voice that
    /// degree in `to`. Values `<= 0` are rests and pass through.
    pub fn transform(
        &self,
        frequencies: &[f64],
        from: &KeySignature,
        to: &KeySignature,
    ) -> Vec<f64> {
        let source_root = self.theory.note_frequency(from.root_note, 4);
        let source_degrees = degree_offsets(from.scale, from.mode);
        let target_degrees = degree_offsets(to.scale, to.mode);
        let root_offset = (to.root_note.index() - from.root_note.index()).rem_euclid(12);

        frequencies
            .iter()
            .map(|&f| {
                if f <= 0.0 || !f.is_finite() {
                    return f;
                }
                let semitones = 12.0 * (f / source_root).log2();
                let octave = (semitones / 12.0).floor();
                let within = semitones - octave * 12.0;

                let (degree, wrap) = nearest_degree(within, &source_degrees);
                let octave = octave as i32 + wrap;

                let carry = (degree / target_degrees.len()) as i32;
                let target = target_degrees[degree % target_degrees.len()];
                let pitch = (octave + carry) * 12 + target + root_offset;
                source_root * 2f64.powf(pitch as f64 / 12.0)
            })
            .collect()
    }
}

/// Nearest scale degree to `within` (0..12 semitones above the root).
///
/// The octave root at 12 is a candidate too; choosing it returns degree 0
/// with a wrap of one octave.
fn nearest_degree(within: f64, degrees: &[i32]) -> (usize, i32) {
    let mut best = (0usize, 0i32);
    let mut best_dist = f64::INFINITY;
    for (idx, &offset) in degrees.iter().enumerate() {
        let dist = (within - offset as f64).abs();
        if dist < best_dist {
            best_dist = dist;
            best = (idx, 0);
        }
    }
    if (12.0 - within) < best_dist {
        best = (0, 1);
    }
    best
}
