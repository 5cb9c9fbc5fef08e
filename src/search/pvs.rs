//! The principal-variation searcher: alpha-beta with null-move pruning,
//! reverse futility pruning, a check extension, PVS zero-window re-search,
//! and transposition-table probing/storing.

use crate::eval::{self, evaluate};
use crate::movegen::{self, GenMode};
use crate::moves::MoveList;
use crate::picker::MovePicker;
use crate::tt::Bound;
use crate::types::MAX_PLY;

use super::Searcher;

/// Reverse futility pruning margin, centipawns per remaining ply.
const RFP_MARGIN_PER_PLY: i32 = 75;
const RFP_MAX_REMAINING: i32 = 5;
const NULL_MOVE_MIN_REMAINING: i32 = 3;
const NULL_MOVE_REDUCTION: i32 = 3;

impl Searcher<'_> {
    /// Negamax search of `remaining` plies within `(alpha, beta)`. `is_pv`
    /// marks a principal-variation node (non-null window). Returns `None`
    /// only when cancellation fires; callers must not mutate on `None`.
    pub(super) fn negamax(
        &mut self,
        remaining: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: u32,
        is_pv: bool,
        allow_null: bool,
    ) -> Option<i32> {
        self.poll_cancellation()?;

        if ply > 0 {
            if self.pos.is_repetition() || self.pos.is_fifty_move_draw() {
                return Some(eval::DRAW_VALUE);
            }
            if ply as usize >= MAX_PLY {
                return Some(evaluate(self.pos));
            }
        }

        if remaining <= 0 {
            return self.quiescence(alpha, beta, ply);
        }

        self.nodes += 1;

        let in_check = self.pos.in_check(self.pos.side_to_move());
        let hash = self.pos.hash();

        let mut tt_move = None;
        if let Some(entry) = self.tables.tt.probe(hash, ply as i32) {
            tt_move = entry.best_move;
            if !is_pv && entry.depth as i32 >= remaining {
                match entry.bound {
                    Bound::Upper if entry.score <= alpha => return Some(alpha),
                    Bound::Lower if entry.score >= beta => {
                        if let Some(mv) = entry.best_move {
                            if mv.is_quiet() {
                                self.tables.killers.record(ply as usize, mv);
                                self.tables.history.record(
                                    self.pos.side_to_move(),
                                    mv.from(),
                                    mv.to(),
                                    remaining as u32,
                                );
                            }
                        }
                        return Some(beta);
                    }
                    Bound::Exact => return Some(entry.score),
                    _ => {}
                }
            }
        }

        let mut legal_moves = MoveList::new();
        movegen::generate(self.pos, GenMode::All, &mut legal_moves);
        if legal_moves.is_empty() {
            return Some(if in_check { eval::mated_in(ply as i32) } else { eval::DRAW_VALUE });
        }

        let static_eval = evaluate(self.pos);

        if !is_pv && !in_check && remaining <= RFP_MAX_REMAINING {
            let margin = RFP_MARGIN_PER_PLY * remaining;
            if static_eval > beta + margin {
                return Some(static_eval);
            }
        }

        if allow_null
            && !is_pv
            && !in_check
            && remaining > NULL_MOVE_MIN_REMAINING
            && self.pos.non_pawn_material(self.pos.side_to_move()) > 0
        {
            let info = self.pos.make_null_move();
            let score = self
                .negamax(remaining - NULL_MOVE_REDUCTION, -beta, -beta + 1, ply + 1, false, false)
                .map(|s| -s);
            self.pos.unmake_null_move(info);
            if score? >= beta {
                return Some(beta);
            }
        }

        let extension = if in_check { 1 } else { 0 };
        let mover = self.pos.side_to_move();
        let killers = self.tables.killers.at(ply as usize);

        let tt_move_playable = tt_move.filter(|&mv| legal_moves.contains(mv));
        if let Some(mv) = tt_move_playable {
            legal_moves.remove(mv);
        }
        let mut picker = MovePicker::new(legal_moves, mover, killers);

        let mut best_score = i32::MIN;
        let mut best_move = None;
        let mut raised_alpha = false;
        let mut first_move = true;
        let mut pending_first = tt_move_playable;

        loop {
            let mv = match pending_first.take() {
                Some(mv) => mv,
                None => match picker.next(self.pos, &self.tables.history) {
                    Some(mv) => mv,
                    None => break,
                },
            };

            let info = self.pos.make_move(mv);
            let child_depth = remaining - 1 + extension;

            let score = if first_move {
                self.negamax(child_depth, -beta, -alpha, ply + 1, is_pv, true).map(|s| -s)
            } else {
                let zero_window =
                    self.negamax(child_depth, -alpha - 1, -alpha, ply + 1, false, true).map(|s| -s);
                match zero_window {
                    Some(s) if is_pv && s > alpha && s < beta => {
                        self.negamax(child_depth, -beta, -alpha, ply + 1, true, true).map(|s| -s)
                    }
                    other => other,
                }
            };
            self.pos.unmake_move(mv, info);
            let score = score?;
            first_move = false;

            if score > best_score {
                best_score = score;
                best_move = Some(mv);
            }
            if score > alpha {
                alpha = score;
                raised_alpha = true;
            }
            if alpha >= beta {
                if mv.is_quiet() {
                    self.tables.killers.record(ply as usize, mv);
                    self.tables.history.record(mover, mv.from(), mv.to(), remaining.max(1) as u32);
                }
                self.tables.tt.store(hash, remaining.max(0) as u32, beta, Bound::Lower, Some(mv), ply as i32);
                return Some(beta);
            }
        }

        let bound = if raised_alpha { Bound::Exact } else { Bound::Upper };
        self.tables.tt.store(hash, remaining.max(0) as u32, best_score, bound, best_move, ply as i32);
        Some(best_score)
    }
}

#[cfg(test)]
mod zero_window_property {
    use super::*;
    use crate::position::Position;
    use crate::search::{Limits, SearchTables};
    use crate::tt::TranspositionTable;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicBool;

    const TACTICAL_FENS: [&str; 2] = [
        "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    ];

    fn walk(mut pos: Position, selectors: &[u32]) -> Position {
        for &selector in selectors {
            let mut moves = MoveList::new();
            movegen::generate(&mut pos, GenMode::All, &mut moves);
            if moves.is_empty() {
                break;
            }
            let mv = moves.get(selector as usize % moves.len()).unwrap();
            pos.make_move(mv);
        }
        pos
    }

    /// Zero-window consistency (spec §8, item 6): a non-PV search of a
    /// one-point window never returns a value strictly inside that window.
    fn assert_zero_window_consistent(mut pos: Position) {
        let alpha = evaluate(&pos);
        let mut tables = SearchTables::new(TranspositionTable::new(10));
        let stop = AtomicBool::new(false);
        let mut searcher = Searcher::new(&mut pos, &mut tables, Limits::default(), &stop);
        let Some(score) = searcher.negamax(3, alpha, alpha + 1, 0, false, true) else { return };
        assert!(score <= alpha || score >= alpha + 1, "score {score} fell strictly inside ({alpha}, {})", alpha + 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn zero_window_search_never_lands_strictly_inside_from_start_position(
            selectors in prop::collection::vec(any::<u32>(), 0..12)
        ) {
            assert_zero_window_consistent(walk(Position::new(), &selectors));
        }

        #[test]
        fn zero_window_search_never_lands_strictly_inside_from_tactical_positions(
            fen_index in 0..TACTICAL_FENS.len(),
            selectors in prop::collection::vec(any::<u32>(), 0..12)
        ) {
            let pos = Position::from_fen(TACTICAL_FENS[fen_index]).unwrap();
            assert_zero_window_consistent(walk(pos, &selectors));
        }
    }
}
