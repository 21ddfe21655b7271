//! # Time Spine
//!
//! Assigns every node its offset from the start of its enclosing Sequence.
//!
//! ## Rules
//! - Walk the tree in pre-order without entering chords.
//! - Each Sequence restarts the clock at the starting offset.
//! - A node gets the current offset, then the clock advances by its
//!   duration (zero for tags, barlines and collections).
//! - Time stands still inside a chord: every member gets the chord's offset,
//!   and the clock advances once by the chord's longest member.
//!
//! The pass only writes `time_spine` fields, so running it twice on the same
//! tree gives the same result. [`Score::reset_time_spines`] zeroes them.
//!
//! Offsets are exact. A sequence whose offsets outgrow the exact range fails
//! with an error at the event that overflowed.
//!
//! ## Example
//! ```rust
//! use guido::{parse, Rational};
//!
//! let parsed = parse("[ c/4 {e/2, g/8} d ]").unwrap();
//! let score = &parsed.score;
//! let seq = score.sequences()[0];
//! let last = *score.children(seq).last().unwrap();
//! assert_eq!(score[last].time_spine, Rational::new(3, 4).unwrap());
//! ```

use log::debug;

use crate::ast::{CollectionKind, NodeId};
use crate::error::{GuidoError, Result};
use crate::rational::Rational;
use crate::score::Score;

impl Score {
    /// Compute time spines for the whole score, starting at zero.
    pub fn calc_time_spines(&mut self) -> Result<()> {
        self.calc_time_spines_from(Rational::zero())
    }

    /// Compute time spines with every Sequence starting at `start`.
    pub fn calc_time_spines_from(&mut self, start: Rational) -> Result<()> {
        let mut time_spine = start;
        let mut sequences = 0usize;

        for item in self.visit_flat_with_chords(self.root()) {
            let kind = self.collection_kind(item);
            if kind == Some(CollectionKind::Sequence) {
                time_spine = start;
                sequences += 1;
            }
            self.node_mut(item).time_spine = time_spine;
            if kind == Some(CollectionKind::Chord) {
                for member in self.visit_flat(item).into_iter().skip(1) {
                    self.node_mut(member).time_spine = time_spine;
                }
            }
            time_spine = self.advance(item, time_spine)?;
        }

        debug!("computed time spines for {} sequence(s)", sequences);
        Ok(())
    }

    /// Zero every time spine so the pass can be rerun.
    pub fn reset_time_spines(&mut self) {
        for item in self.visit_flat(self.root()) {
            self.node_mut(item).time_spine = Rational::zero();
        }
    }

    /// Total duration of a Sequence.
    pub fn sequence_duration(&self, sequence: NodeId) -> Result<Rational> {
        self.children(sequence)
            .iter()
            .try_fold(Rational::zero(), |total, child| self.advance(*child, total))
    }

    fn advance(&self, item: NodeId, time_spine: Rational) -> Result<Rational> {
        time_spine.checked_add(self.duration(item)).map_err(|e| {
            GuidoError::structural(self[item].pos.as_ref(), e.to_string())
        })
    }
}
