//! Transposition table: a fixed-size, power-of-two, direct-mapped cache of
//! search results keyed by Zobrist hash, with depth/age replacement and
//! mate-distance rescaling so stored mate scores stay correct at any ply.

use std::collections::TryReserveError;
use std::fmt;

use crate::moves::Move;

/// Table allocation failed at startup: a resource-shortage error, distinct
/// from the input-error taxonomy in `error.rs` since it never originates
/// from user-supplied data.
#[derive(Debug)]
pub struct TtAllocError(TryReserveError);

impl fmt::Display for TtAllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to allocate transposition table: {}", self.0)
    }
}

impl std::error::Error for TtAllocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Clone, Copy, Debug)]
pub struct TtEntry {
    pub hash: u64,
    pub depth: u32,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<Move>,
    pub age: u8,
}

pub struct TranspositionTable {
    slots: Vec<Option<TtEntry>>,
    mask: usize,
    age: u8,
}

/// Default table size exponent: `1 << 24` entries.
pub const DEFAULT_SIZE_POWER: u32 = 24;

impl TranspositionTable {
    /// Fallible constructor: reports allocation failure instead of aborting,
    /// the resource-shortage branch of the error taxonomy.
    pub fn try_new(size_power: u32) -> Result<Self, TtAllocError> {
        let size = 1usize << size_power;
        let mut slots = Vec::new();
        slots.try_reserve_exact(size).map_err(TtAllocError)?;
        slots.resize(size, None);
        Ok(TranspositionTable { slots, mask: size - 1, age: 0 })
    }

    /// Sizes the table to fit approximately `size_mb` megabytes.
    pub fn try_with_size_mb(size_mb: usize) -> Result<Self, TtAllocError> {
        let entry_bytes = std::mem::size_of::<Option<TtEntry>>();
        let raw = (size_mb * 1024 * 1024 / entry_bytes).max(1);
        let size_power = (usize::BITS - 1 - raw.leading_zeros()).max(10);
        Self::try_new(size_power)
    }

    /// Infallible convenience wrapper over `try_new`, for call sites (tests,
    /// benchmarks) where a small fixed size can never plausibly fail.
    pub fn new(size_power: u32) -> Self {
        Self::try_new(size_power).expect("transposition table allocation failed")
    }

    /// Infallible convenience wrapper over `try_with_size_mb`.
    pub fn with_size_mb(size_mb: usize) -> Self {
        Self::try_with_size_mb(size_mb).expect("transposition table allocation failed")
    }

    /// Number of slots in the table (always a power of two).
    #[inline]
    pub fn len(&self) -> usize {
        self.mask + 1
    }

    #[inline]
    fn index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    /// Looks up `hash`, re-contextualising a stored mate score to `ply_from_root`.
    pub fn probe(&self, hash: u64, ply_from_root: i32) -> Option<TtEntry> {
        let slot = self.slots[self.index(hash)].as_ref()?;
        if slot.hash != hash {
            return None;
        }
        let mut entry = *slot;
        entry.score = rescale_on_read(entry.score, ply_from_root);
        Some(entry)
    }

    /// Stores a result for `hash`, rescaling a mate score back to a
    /// root-independent distance before it lands in the slot.
    pub fn store(
        &mut self,
        hash: u64,
        depth: u32,
        score: i32,
        bound: Bound,
        best_move: Option<Move>,
        ply_from_root: i32,
    ) {
        let index = self.index(hash);
        let stored_score = rescale_on_write(score, ply_from_root);
        let should_replace = match &self.slots[index] {
            None => true,
            Some(existing) => depth >= existing.depth || existing.age != self.age,
        };
        if should_replace {
            self.slots[index] =
                Some(TtEntry { hash, depth, score: stored_score, bound, best_move, age: self.age });
        }
    }

    /// Bumps the age counter; called once per top-level search.
    pub fn new_search(&mut self) {
        self.age = self.age.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.age = 0;
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE_POWER)
    }
}

/// Rescales a mate score found at `ply_from_root` into a root-independent
/// distance-to-mate before it is written to the table.
fn rescale_on_write(score: i32, ply_from_root: i32) -> i32 {
    if crate::eval::is_mate_score(score) {
        score + score.signum() * ply_from_root
    } else {
        score
    }
}

/// Reverses `rescale_on_write`, re-contextualising a stored mate distance to
/// the ply it is being read at.
fn rescale_on_read(score: i32, ply_from_root: i32) -> i32 {
    if crate::eval::is_mate_score(score) {
        score - score.signum() * ply_from_root
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::mated_in;

    #[test]
    fn try_new_succeeds_for_a_reasonable_size() {
        let tt = TranspositionTable::try_new(10).unwrap();
        assert_eq!(tt.len(), 1 << 10);
    }

    #[test]
    fn round_trips_an_ordinary_score() {
        let mut tt = TranspositionTable::new(10);
        tt.store(0xabc, 6, 123, Bound::Exact, None, 0);
        let entry = tt.probe(0xabc, 0).unwrap();
        assert_eq!(entry.score, 123);
        assert_eq!(entry.depth, 6);
    }

    #[test]
    fn mate_score_rescales_between_a_different_store_and_probe_ply() {
        let mut tt = TranspositionTable::new(10);
        let ply_found = 13;
        let score_at_found = mated_in(ply_found);
        tt.store(0x1, 5, score_at_found, Bound::Exact, None, ply_found);

        let ply_read = 4;
        let entry = tt.probe(0x1, ply_read).unwrap();
        let sign = score_at_found.signum();
        let expected = (score_at_found + sign * ply_found) - sign * ply_read;
        assert_eq!(entry.score, expected);
        assert_ne!(entry.score, score_at_found);
    }

    #[test]
    fn mate_score_round_trips_when_reread_at_the_same_ply() {
        let mut tt = TranspositionTable::new(10);
        let ply = 7;
        let score = mated_in(ply);
        tt.store(0x2, 5, score, Bound::Exact, None, ply);
        assert_eq!(tt.probe(0x2, ply).unwrap().score, score);
    }

    #[test]
    fn mismatched_hash_in_same_slot_misses() {
        let mut tt = TranspositionTable::new(4);
        tt.store(1, 1, 10, Bound::Exact, None, 0);
        tt.store(1 + 16, 1, 20, Bound::Exact, None, 0);
        let hit = tt.probe(1 + 16, 0);
        assert_eq!(hit.unwrap().score, 20);
    }

    #[test]
    fn deeper_entry_replaces_shallower_same_age() {
        let mut tt = TranspositionTable::new(10);
        tt.store(7, 2, 1, Bound::Exact, None, 0);
        tt.store(7, 8, 2, Bound::Exact, None, 0);
        assert_eq!(tt.probe(7, 0).unwrap().depth, 8);
        tt.store(7, 1, 3, Bound::Exact, None, 0);
        assert_eq!(tt.probe(7, 0).unwrap().depth, 8);
    }
}
