//! The engine controller: owns the position and search tables, and exposes
//! the `SetPosition`/`ComputeBestMove`/`Stop` affordances a front-end drives.
//!
//! A `go` runs on a dedicated thread (given its own stack, mirroring this
//! engine family's deep-recursion reservation) so the calling thread stays
//! free to read the next protocol line and honour `stop` immediately. The
//! transposition/killer/history tables are shared behind a `parking_lot`
//! mutex that the search thread holds for the whole search: still a single
//! mutator at a time, just enforced by a lock instead of by borrow-checking
//! across the thread boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::error::UciError;
use crate::moves::Move;
use crate::position::Position;
use crate::search::{Limits, SearchEvent, SearchTables, Searcher};
use crate::tt::{TtAllocError, TranspositionTable};
use crate::uci::parse_move;

/// Matches the 32 MB search-thread stack this engine family has always
/// reserved against the main-variation recursion depth.
const DEFAULT_SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;
const DEFAULT_TT_SIZE_MB: usize = 64;

/// Mutable engine configuration, set once via `setoption` or directly by an
/// embedding caller, and read-only once a search is in flight.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub tt_size_mb: usize,
    pub search_stack_size_bytes: Option<usize>,
    pub ponder: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions { tt_size_mb: DEFAULT_TT_SIZE_MB, search_stack_size_bytes: None, ponder: false }
    }
}

pub struct EngineController {
    pos: Position,
    tables: Arc<Mutex<SearchTables>>,
    options: EngineOptions,
    stop: Arc<AtomicBool>,
    job: Option<JoinHandle<()>>,
}

impl EngineController {
    /// Fails only on transposition-table allocation failure at startup (the
    /// resource-shortage branch of the error taxonomy); the caller is
    /// expected to report it and exit with a non-zero code.
    pub fn try_new(options: EngineOptions) -> Result<Self, TtAllocError> {
        let tt = TranspositionTable::try_with_size_mb(options.tt_size_mb)?;
        #[cfg(feature = "logging")]
        log::info!(
            "engine startup: tt_size_mb={} tt_slots={} search_stack_size_bytes={}",
            options.tt_size_mb,
            tt.len(),
            options.search_stack_size_bytes.unwrap_or(DEFAULT_SEARCH_STACK_SIZE)
        );
        Ok(EngineController {
            pos: Position::new(),
            tables: Arc::new(Mutex::new(SearchTables::new(tt))),
            options,
            stop: Arc::new(AtomicBool::new(false)),
            job: None,
        })
    }

    /// Infallible convenience wrapper over `try_new`, for call sites (tests,
    /// embedding callers content with the default table size) where
    /// allocation can never plausibly fail.
    pub fn new(options: EngineOptions) -> Self {
        Self::try_new(options).expect("transposition table allocation failed")
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }

    pub fn is_searching(&self) -> bool {
        self.job.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// `SetPosition(FEN, move_list)`: stops any in-flight search, then
    /// replaces the tracked position with `fen` (or the start position) and
    /// replays `moves` (long-algebraic, e.g. `e2e4`, `e7e8q`) onto it.
    pub fn set_position(&mut self, fen: Option<&str>, moves: &[String]) -> Result<(), UciError> {
        self.stop();
        let mut pos = match fen {
            Some(f) => Position::from_fen(f)?,
            None => Position::new(),
        };
        for mv_str in moves {
            let mv = parse_move(&mut pos, mv_str)?;
            pos.make_move(mv);
        }
        self.pos = pos;
        Ok(())
    }

    /// `ucinewgame`: fresh position, cleared transposition table and age.
    pub fn new_game(&mut self) {
        self.stop();
        self.pos = Position::new();
        self.tables.lock().tt.clear();
    }

    /// `ComputeBestMove`: starts a search on a clone of the tracked position
    /// in the background. `on_event` is called from the search thread for
    /// every `SearchEvent`, including the closing `BestMove`; it must be
    /// `Send` (typically it forwards to a channel a printer thread drains).
    pub fn go(&mut self, limits: Limits, on_event: impl FnMut(SearchEvent) + Send + 'static) {
        self.stop();
        self.stop.store(false, Ordering::Relaxed);

        let mut pos_copy = self.pos.clone();
        let tables = Arc::clone(&self.tables);
        let stop = Arc::clone(&self.stop);
        let stack_size = self.options.search_stack_size_bytes.unwrap_or(DEFAULT_SEARCH_STACK_SIZE);

        let handle = thread::Builder::new()
            .stack_size(stack_size)
            .spawn(move || {
                let mut tables_guard = tables.lock();
                let mut searcher = Searcher::new(&mut pos_copy, &mut tables_guard, limits, &stop);
                searcher.run(on_event);
            })
            .expect("failed to spawn search thread");

        self.job = Some(handle);
    }

    /// `Stop`: requests cancellation and blocks until the search thread has
    /// actually finished (so the caller can rely on the final `BestMove`
    /// event having already fired by the time this returns).
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.job.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn set_position_replays_moves_onto_the_start_position() {
        let mut engine = EngineController::new(EngineOptions::default());
        engine.set_position(None, &["e2e4".to_string(), "e7e5".to_string()]).unwrap();
        assert_eq!(engine.position().halfmove_clock(), 0);
        assert_eq!(engine.position().fullmove_number(), 2);
    }

    #[test]
    fn set_position_rejects_an_illegal_move() {
        let mut engine = EngineController::new(EngineOptions::default());
        let err = engine.set_position(None, &["e2e5".to_string()]);
        assert!(err.is_err());
    }

    #[test]
    fn go_runs_to_completion_and_reports_a_best_move() {
        let mut engine = EngineController::new(EngineOptions::default());
        let (tx, rx) = mpsc::channel();
        engine.go(Limits { max_depth: 3, move_time_ms: None }, move |event| {
            let _ = tx.send(event);
        });
        engine.stop();

        let mut saw_best_move = false;
        while let Ok(event) = rx.try_recv() {
            if let SearchEvent::BestMove { mv } = event {
                saw_best_move = true;
                assert!(mv.is_some());
            }
        }
        assert!(saw_best_move);
    }
}
