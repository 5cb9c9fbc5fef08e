//! A UCI-subset line protocol over stdin/stdout: the concrete textual
//! chess-engine protocol front-end driving `EngineController`'s
//! `SetPosition`/`ComputeBestMove`/`Stop` affordances.

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

use crate::engine::{EngineController, EngineOptions};
use crate::error::{MoveParseError, UciError};
use crate::movegen::{self, GenMode};
use crate::moves::{promotion_piece_from_char, Move, MoveList};
use crate::position::Position;
use crate::search::{Limits, SearchEvent};
use crate::types::{Color, Square};

const ENGINE_NAME: &str = "mailfist";
const ENGINE_AUTHOR: &str = "the mailfist authors";

/// Fraction of the remaining clock budgeted to one move, before increment.
const TIME_FRACTION_DENOM: u64 = 20;
const TIME_SAFETY_MARGIN_MS: u64 = 50;
const MIN_MOVE_TIME_MS: u64 = 20;

/// Parses a long-algebraic move string (`e2e4`, `e7e8q`) against the legal
/// moves of `pos`, the only place outside a FEN that user input reaches the
/// engine, hence the only other site `UciError` is raised from.
pub fn parse_move(pos: &mut Position, s: &str) -> Result<Move, UciError> {
    let invalid = |source: MoveParseError| UciError::InvalidMove { move_str: s.to_string(), source };

    if s.len() != 4 && s.len() != 5 {
        return Err(invalid(MoveParseError::WrongLength(s.to_string())));
    }
    let from = Square::parse(&s[0..2]).ok_or_else(|| invalid(MoveParseError::BadSquare(s[0..2].to_string())))?;
    let to = Square::parse(&s[2..4]).ok_or_else(|| invalid(MoveParseError::BadSquare(s[2..4].to_string())))?;
    let promotion = match s.as_bytes().get(4) {
        Some(&c) => Some(promotion_piece_from_char(c as char).map_err(invalid)?),
        None => None,
    };

    let mut legal = MoveList::new();
    movegen::generate(pos, GenMode::All, &mut legal);
    legal
        .iter()
        .copied()
        .find(|mv| mv.from() == from && mv.to() == to && mv.promotion() == promotion)
        .ok_or_else(|| invalid(MoveParseError::NotPseudoLegal(s.to_string())))
}

fn parse_position_command(controller: &mut EngineController, parts: &[&str]) -> Result<(), UciError> {
    let mut i = 1;
    let fen;
    if parts.get(i) == Some(&"startpos") {
        fen = None;
        i += 1;
    } else if parts.get(i) == Some(&"fen") {
        let fields = parts.get(i + 1..i + 7).ok_or(UciError::MissingParts)?;
        fen = Some(fields.join(" "));
        i += 7;
    } else {
        return Err(UciError::MissingParts);
    }

    let moves: Vec<String> = if parts.get(i) == Some(&"moves") {
        parts[i + 1..].iter().map(|s| s.to_string()).collect()
    } else {
        Vec::new()
    };

    controller.set_position(fen.as_deref(), &moves)
}

/// Derives a soft move-time budget from a `wtime`/`btime`/`winc`/`binc`
/// clock, the way this engine family always has: a fraction of the
/// remaining clock plus the increment, clamped below the hard deadline.
fn time_budget_ms(remaining_ms: u64, increment_ms: u64) -> u64 {
    let budget = remaining_ms / TIME_FRACTION_DENOM + increment_ms / 2;
    let hard_cap = remaining_ms.saturating_sub(TIME_SAFETY_MARGIN_MS);
    budget.min(hard_cap).max(MIN_MOVE_TIME_MS)
}

fn parse_go_command(controller: &EngineController, parts: &[&str]) -> Limits {
    let mut depth: Option<u32> = None;
    let mut movetime: Option<u64> = None;
    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut winc: u64 = 0;
    let mut binc: u64 = 0;

    let mut i = 1;
    while i < parts.len() {
        let value = || parts.get(i + 1).and_then(|s| s.parse::<u64>().ok());
        match parts[i] {
            "depth" => depth = value().map(|v| v as u32),
            "movetime" => movetime = value(),
            "wtime" => wtime = value(),
            "btime" => btime = value(),
            "winc" => winc = value().unwrap_or(0),
            "binc" => binc = value().unwrap_or(0),
            _ => {}
        }
        i += 2;
    }

    let move_time_ms = if let Some(ms) = movetime {
        Some(ms)
    } else {
        let (remaining, increment) = match controller.position().side_to_move() {
            Color::White => (wtime, winc),
            Color::Black => (btime, binc),
        };
        remaining.map(|ms| time_budget_ms(ms, increment))
    };

    Limits { max_depth: depth.unwrap_or(Limits::default().max_depth), move_time_ms }
}

fn format_info(event: &SearchEvent) -> Option<String> {
    match event {
        SearchEvent::DepthInfo { depth } => Some(format!("info depth {depth}")),
        SearchEvent::ScoreInfo { score } => Some(format!("info score cp {score}")),
        SearchEvent::NodesPerSecond { nps } => Some(format!("info nps {nps}")),
        SearchEvent::PrincipalVariation { moves } => {
            if moves.is_empty() {
                return None;
            }
            let pv = moves.iter().map(|m| m.to_long_algebraic()).collect::<Vec<_>>().join(" ");
            Some(format!("info pv {pv}"))
        }
        SearchEvent::BestMove { mv } => {
            let mv = mv.map(|m| m.to_long_algebraic()).unwrap_or_else(|| "0000".to_string());
            Some(format!("bestmove {mv}"))
        }
    }
}

/// Runs the protocol loop until `quit` or end-of-input. Malformed lines are
/// an input error: reported to stderr, the engine state is unchanged, and
/// the loop keeps reading. Exits the process with a non-zero code if
/// transposition-table allocation fails at startup.
pub fn run() {
    let stdin = io::stdin();
    let mut controller = match EngineController::try_new(EngineOptions::default()) {
        Ok(controller) => controller,
        Err(err) => {
            eprintln!("fatal: {err}");
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::channel::<SearchEvent>();
    let printer = thread::spawn(move || {
        let stdout = io::stdout();
        while let Ok(event) = rx.recv() {
            if let Some(line) = format_info(&event) {
                let mut lock = stdout.lock();
                let _ = writeln!(lock, "{line}");
                let _ = lock.flush();
            }
        }
    });

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else { continue };

        let result = match command {
            "uci" => {
                println!("id name {ENGINE_NAME}");
                println!("id author {ENGINE_AUTHOR}");
                println!("option name Hash type spin default 64 min 1 max 4096");
                println!("option name Ponder type check default false");
                println!("uciok");
                Ok(())
            }
            "isready" => {
                println!("readyok");
                Ok(())
            }
            "ucinewgame" => {
                controller.new_game();
                Ok(())
            }
            "position" => parse_position_command(&mut controller, &parts),
            "go" => {
                let limits = parse_go_command(&controller, &parts);
                let tx = tx.clone();
                controller.go(limits, move |event| {
                    let _ = tx.send(event);
                });
                Ok(())
            }
            "stop" => {
                controller.stop();
                Ok(())
            }
            "quit" => break,
            _ => Ok(()),
        };

        if let Err(err) = result {
            #[cfg(feature = "logging")]
            log::warn!("failed to parse UCI command {command:?}: {err}");
            eprintln!("info string error: {err}");
        }
    }

    controller.stop();
    drop(tx);
    let _ = printer.join();
}
