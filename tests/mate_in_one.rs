//! End-to-end mate-in-one suite: loads a small JSON problem set (the way
//! this engine family has always kept its tactical regression data) and
//! checks that playing the listed move actually delivers checkmate.

use serde::Deserialize;

use mailfist::movegen::{self, GenMode};
use mailfist::moves::MoveList;
use mailfist::position::Position;
use mailfist::uci::parse_move;

#[derive(Deserialize)]
struct ProblemSet {
    problems: Vec<Problem>,
}

#[derive(Deserialize)]
struct Problem {
    #[serde(rename = "kind")]
    _kind: String,
    fen: String,
    mate_move: String,
}

fn is_checkmate(pos: &mut Position) -> bool {
    let mut moves = MoveList::new();
    movegen::generate(pos, GenMode::All, &mut moves);
    moves.is_empty() && pos.in_check(pos.side_to_move())
}

#[test]
fn mate_in_one_suite() {
    let data = include_str!("data/problems.json");
    let set: ProblemSet = serde_json::from_str(data).expect("invalid problems.json");

    for problem in &set.problems {
        let mut pos = Position::from_fen(&problem.fen).unwrap();
        let mv = parse_move(&mut pos, &problem.mate_move)
            .unwrap_or_else(|e| panic!("{}: {e}", problem.mate_move));
        pos.make_move(mv);
        assert!(is_checkmate(&mut pos), "fen {} move {} was not mate", problem.fen, problem.mate_move);
    }
}
