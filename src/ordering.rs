//! Killer moves and the history heuristic: the two quiet-move ordering
//! signals fed into the move picker's `Quiet` stage.

use crate::moves::Move;
use crate::types::{Color, Square, MAX_PLY};

pub const MAX_KILLERS: usize = 2;

/// Per-ply killer slots: at most two distinct quiet moves that caused a
/// beta cutoff at that ply, most recent first. Cleared at the start of
/// each top-level search.
pub struct KillerTable {
    slots: Vec<[Option<Move>; MAX_KILLERS]>,
}

impl KillerTable {
    pub fn new() -> Self {
        KillerTable { slots: vec![[None, None]; MAX_PLY + 1] }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = [None, None]);
    }

    pub fn at(&self, ply: usize) -> [Option<Move>; MAX_KILLERS] {
        self.slots[ply.min(MAX_PLY)]
    }

    /// Records `mv` as a killer at `ply`, skipping duplicates and keeping
    /// the most recent killer in slot 0.
    pub fn record(&mut self, ply: usize, mv: Move) {
        let slot = &mut self.slots[ply.min(MAX_PLY)];
        if slot[0] == Some(mv) {
            return;
        }
        if slot[1] == Some(mv) {
            slot.swap(0, 1);
            return;
        }
        slot[1] = slot[0];
        slot[0] = Some(mv);
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// `history[color][from][to]`, incremented by `remaining_depth^2` on a
/// quiet beta cutoff. No decay or aging in the base design.
pub struct HistoryTable {
    scores: Box<[[[i32; 64]; 64]; 2]>,
}

impl HistoryTable {
    pub fn new() -> Self {
        HistoryTable { scores: Box::new([[[0; 64]; 64]; 2]) }
    }

    pub fn clear(&mut self) {
        *self.scores = [[[0; 64]; 64]; 2];
    }

    #[inline]
    pub fn score(&self, color: Color, from: Square, to: Square) -> i32 {
        self.scores[color.index()][from.index()][to.index()]
    }

    pub fn record(&mut self, color: Color, from: Square, to: Square, remaining_depth: u32) {
        let bonus = (remaining_depth * remaining_depth) as i32;
        self.scores[color.index()][from.index()][to.index()] =
            self.scores[color.index()][from.index()][to.index()].saturating_add(bonus);
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Square;

    fn mv(from: &str, to: &str) -> Move {
        Move::Default { from: Square::parse(from).unwrap(), to: Square::parse(to).unwrap(), captured: None }
    }

    #[test]
    fn killer_insertion_skips_duplicates_and_keeps_most_recent_first() {
        let mut table = KillerTable::new();
        table.record(3, mv("e2", "e4"));
        table.record(3, mv("d2", "d4"));
        assert_eq!(table.at(3), [Some(mv("d2", "d4")), Some(mv("e2", "e4"))]);
        table.record(3, mv("d2", "d4"));
        assert_eq!(table.at(3)[0], Some(mv("d2", "d4")));
        assert_eq!(table.at(3)[1], Some(mv("e2", "e4")));
    }

    #[test]
    fn killer_table_clears_all_plies() {
        let mut table = KillerTable::new();
        table.record(5, mv("g1", "f3"));
        table.clear();
        assert_eq!(table.at(5), [None, None]);
    }

    #[test]
    fn history_accumulates_depth_squared_with_no_decay() {
        let mut history = HistoryTable::new();
        let from = Square::parse("e2").unwrap();
        let to = Square::parse("e4").unwrap();
        history.record(Color::White, from, to, 4);
        history.record(Color::White, from, to, 3);
        assert_eq!(history.score(Color::White, from, to), 16 + 9);
    }

    #[test]
    fn history_is_independent_per_color() {
        let mut history = HistoryTable::new();
        let from = Square::parse("e2").unwrap();
        let to = Square::parse("e4").unwrap();
        history.record(Color::White, from, to, 5);
        assert_eq!(history.score(Color::Black, from, to), 0);
    }
}
