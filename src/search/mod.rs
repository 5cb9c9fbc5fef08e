//! Iterative-deepening principal-variation search: the top-level driver
//! lives here, with the recursive algorithms split into sibling modules the
//! way a single search file would otherwise grow unwieldy.

mod pvs;
mod quiescence;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::eval::{self, evaluate};
use crate::movegen::{self, GenMode};
use crate::moves::{Move, MoveList};
use crate::ordering::{HistoryTable, KillerTable};
use crate::position::Position;
use crate::tt::TranspositionTable;

/// Cooperative cancellation and progress reporting are checked every this
/// many nodes, not on every recursive call.
const CANCELLATION_POLL_INTERVAL: u64 = 4096;

/// Aspiration window half-width added on a depth that doesn't fail.
const ASPIRATION_DELTA: i32 = 100;

/// Tables that persist across the iterative-deepening loop of a single
/// top-level search: the transposition table normally long outlives a
/// single search, the killer/history tables are reset at the start of one.
pub struct SearchTables {
    pub tt: TranspositionTable,
    pub killers: KillerTable,
    pub history: HistoryTable,
}

impl SearchTables {
    pub fn new(tt: TranspositionTable) -> Self {
        SearchTables { tt, killers: KillerTable::new(), history: HistoryTable::new() }
    }
}

/// Caller-supplied bounds on a single `go` call.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    pub max_depth: u32,
    pub move_time_ms: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_depth: 64, move_time_ms: None }
    }
}

/// Progress events emitted once per completed depth, and once at the end.
#[derive(Clone, Debug)]
pub enum SearchEvent {
    DepthInfo { depth: u32 },
    ScoreInfo { score: i32 },
    NodesPerSecond { nps: u64 },
    PrincipalVariation { moves: Vec<Move> },
    BestMove { mv: Option<Move> },
}

/// Drives one `go` call: iterative deepening with additive aspiration
/// windows, calling `on_event` after each completed depth and at the end.
pub struct Searcher<'a> {
    pos: &'a mut Position,
    tables: &'a mut SearchTables,
    limits: Limits,
    stop: &'a AtomicBool,
    start: Instant,
    nodes: u64,
}

impl<'a> Searcher<'a> {
    pub fn new(
        pos: &'a mut Position,
        tables: &'a mut SearchTables,
        limits: Limits,
        stop: &'a AtomicBool,
    ) -> Self {
        Searcher { pos, tables, limits, stop, start: Instant::now(), nodes: 0 }
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Checked at the top of every search node. `None` propagates up through
    /// every `?` on the call stack to abandon the in-progress depth.
    fn poll_cancellation(&mut self) -> Option<()> {
        if self.nodes % CANCELLATION_POLL_INTERVAL != 0 {
            return Some(());
        }
        if self.stop.load(Ordering::Relaxed) {
            return None;
        }
        if let Some(limit_ms) = self.limits.move_time_ms {
            if self.start.elapsed().as_millis() as u64 >= limit_ms {
                self.stop.store(true, Ordering::Relaxed);
                return None;
            }
        }
        Some(())
    }

    /// Runs iterative deepening to `limits.max_depth` or until cancelled,
    /// reporting progress through `on_event`. Returns the best move found at
    /// the last fully-completed depth (`None` only if the position has no
    /// legal moves at all).
    pub fn run(&mut self, mut on_event: impl FnMut(SearchEvent)) -> Option<Move> {
        self.tables.tt.new_search();
        self.tables.killers.clear();
        self.tables.history.clear();

        let mut root_moves = MoveList::new();
        movegen::generate(self.pos, GenMode::All, &mut root_moves);
        if root_moves.is_empty() {
            return None;
        }

        // A move is always available once legality is established, so the
        // caller always gets a playable move out of `BestMove` even if
        // cancellation fires before depth 1 completes.
        let mut best_move = root_moves.get(0);
        let mut last_score = evaluate(self.pos);

        for depth in 1..=self.limits.max_depth {
            let (mut alpha, mut beta) =
                if depth == 1 { (i32::MIN + 1, i32::MAX - 1) } else { (last_score - ASPIRATION_DELTA, last_score + ASPIRATION_DELTA) };

            let score = loop {
                match self.negamax(depth as i32, alpha, beta, 0, true, true) {
                    None => {
                        on_event(SearchEvent::BestMove { mv: best_move });
                        return best_move;
                    }
                    Some(s) if s <= alpha && alpha > i32::MIN + 1 => {
                        alpha = (alpha - ASPIRATION_DELTA).max(i32::MIN + 1);
                    }
                    Some(s) if s >= beta && beta < i32::MAX - 1 => {
                        beta = (beta + ASPIRATION_DELTA).min(i32::MAX - 1);
                    }
                    Some(s) => break s,
                }
            };

            last_score = score;
            let pv = self.extract_pv(depth);
            best_move = pv.first().copied().or(best_move);

            #[cfg(feature = "logging")]
            log::debug!("depth {depth} score {score} nodes {} pv {:?}", self.nodes, pv);

            on_event(SearchEvent::DepthInfo { depth });
            on_event(SearchEvent::ScoreInfo { score });
            let elapsed_ms = self.start.elapsed().as_millis().max(1) as u64;
            on_event(SearchEvent::NodesPerSecond { nps: self.nodes * 1000 / elapsed_ms });
            on_event(SearchEvent::PrincipalVariation { moves: pv });

            if eval::is_mate_score(score) {
                break;
            }
        }

        on_event(SearchEvent::BestMove { mv: best_move });
        best_move
    }

    /// Walks the transposition table's best-move links from the root,
    /// stopping at an unplayable move, a missing entry, a repeated position
    /// (a cycle through the table), or `max_len`.
    fn extract_pv(&mut self, max_len: u32) -> Vec<Move> {
        let mut pv = Vec::with_capacity(max_len as usize);
        let mut seen = Vec::new();
        let mut undo_stack = Vec::new();

        for _ in 0..max_len {
            let hash = self.pos.hash();
            if seen.contains(&hash) {
                break;
            }
            seen.push(hash);

            let Some(entry) = self.tables.tt.probe(hash, 0) else { break };
            let Some(mv) = entry.best_move else { break };

            let mut legal = MoveList::new();
            movegen::generate(self.pos, GenMode::All, &mut legal);
            if !legal.contains(mv) {
                break;
            }

            pv.push(mv);
            let info = self.pos.make_move(mv);
            undo_stack.push((mv, info));
        }

        while let Some((mv, info)) = undo_stack.pop() {
            self.pos.unmake_move(mv, info);
        }

        pv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tt::TranspositionTable;
    use crate::types::Square;

    #[test]
    fn search_from_the_start_position_returns_a_legal_move() {
        let mut pos = Position::new();
        let mut legal = MoveList::new();
        movegen::generate(&mut pos, GenMode::All, &mut legal);

        let mut tables = SearchTables::new(TranspositionTable::new(10));
        let stop = AtomicBool::new(false);
        let limits = Limits { max_depth: 3, move_time_ms: None };
        let mut searcher = Searcher::new(&mut pos, &mut tables, limits, &stop);
        let mv = searcher.run(|_| {}).unwrap();
        assert!(legal.contains(mv));
    }

    #[test]
    fn search_finds_the_only_legal_move_capturing_a_hanging_queen() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/4q3/4K3 w - - 0 1").unwrap();
        let mut tables = SearchTables::new(TranspositionTable::new(10));
        let stop = AtomicBool::new(false);
        let limits = Limits { max_depth: 2, move_time_ms: None };
        let mut searcher = Searcher::new(&mut pos, &mut tables, limits, &stop);
        let mv = searcher.run(|_| {}).unwrap();
        assert_eq!(mv.from(), Square::parse("e1").unwrap());
        assert_eq!(mv.to(), Square::parse("e2").unwrap());
    }

    #[test]
    fn a_preset_stop_flag_still_yields_a_legal_root_move() {
        let mut pos = Position::new();
        let mut legal = MoveList::new();
        movegen::generate(&mut pos, GenMode::All, &mut legal);

        let mut tables = SearchTables::new(TranspositionTable::new(10));
        let stop = AtomicBool::new(true);
        let limits = Limits { max_depth: 5, move_time_ms: None };
        let mut searcher = Searcher::new(&mut pos, &mut tables, limits, &stop);
        let mv = searcher.run(|_| {}).unwrap();
        assert!(legal.contains(mv));
    }

    #[test]
    fn depth_one_search_matches_the_best_immediate_capture() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/4q3/4K3 w - - 0 1").unwrap();
        let mut tables = SearchTables::new(TranspositionTable::new(10));
        let stop = AtomicBool::new(false);
        let limits = Limits { max_depth: 1, move_time_ms: None };
        let mut searcher = Searcher::new(&mut pos, &mut tables, limits, &stop);
        assert!(searcher.run(|_| {}).is_some());
        assert!(searcher.nodes() > 0);
    }
}
