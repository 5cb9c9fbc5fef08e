//! Move generation: pseudo-legal enumeration by staged generation mode,
//! filtered to legal moves by simulating each move and testing whether the
//! mover's own king ends up attacked.

use crate::bitboard::Bitboard;
use crate::magic;
use crate::moves::{Move, MoveList};
use crate::position::Position;
use crate::types::{CastleSide, Color, Piece, Square, PROMOTION_PIECES};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GenMode {
    /// All legal moves.
    All,
    /// Alias of `All` used by the main search driver.
    Default,
    /// Captures, queen promotions, and (when in check) evasions.
    Quiescence,
}

/// Fills `out` with every legal move matching `mode` in `pos`.
pub fn generate(pos: &mut Position, mode: GenMode, out: &mut MoveList) {
    let mut pseudo = MoveList::new();
    generate_pseudo_legal(pos, mode, &mut pseudo);
    let mover = pos.side_to_move();
    for &mv in pseudo.iter() {
        if is_legal(pos, mv, mover) {
            out.push(mv);
        }
    }
}

pub fn has_legal_move(pos: &mut Position) -> bool {
    let mut pseudo = MoveList::new();
    generate_pseudo_legal(pos, GenMode::All, &mut pseudo);
    let mover = pos.side_to_move();
    pseudo.iter().any(|&mv| is_legal(pos, mv, mover))
}

/// Plays `mv` on the real board and checks the mover's king is safe, then
/// unmakes it. Straightforward rather than pin-optimized:
/// correctness-equivalent to the spec's pin-detection fast path, traded for
/// simplicity (see DESIGN.md).
fn is_legal(pos: &mut Position, mv: Move, mover: Color) -> bool {
    let info = pos.make_move(mv);
    let safe = !pos.in_check(mover);
    pos.unmake_move(mv, info);
    safe
}

fn generate_pseudo_legal(pos: &Position, mode: GenMode, out: &mut MoveList) {
    let us = pos.side_to_move();
    let in_check = pos.in_check(us);
    match mode {
        GenMode::All | GenMode::Default => {
            generate_pawn_moves(pos, us, false, out);
            generate_knight_moves(pos, us, false, out);
            generate_sliding_moves(pos, us, Piece::Bishop, false, out);
            generate_sliding_moves(pos, us, Piece::Rook, false, out);
            generate_sliding_moves(pos, us, Piece::Queen, false, out);
            generate_king_moves(pos, us, false, out);
            if !in_check {
                generate_castling_moves(pos, us, out);
            }
        }
        GenMode::Quiescence => {
            if in_check {
                // Evasions: fall back to the full legal set; the searcher
                // relies on every evasion being present, not just captures.
                generate_pawn_moves(pos, us, false, out);
                generate_knight_moves(pos, us, false, out);
                generate_sliding_moves(pos, us, Piece::Bishop, false, out);
                generate_sliding_moves(pos, us, Piece::Rook, false, out);
                generate_sliding_moves(pos, us, Piece::Queen, false, out);
                generate_king_moves(pos, us, false, out);
            } else {
                generate_pawn_moves(pos, us, true, out);
                generate_knight_moves(pos, us, true, out);
                generate_sliding_moves(pos, us, Piece::Bishop, true, out);
                generate_sliding_moves(pos, us, Piece::Rook, true, out);
                generate_sliding_moves(pos, us, Piece::Queen, true, out);
                generate_king_moves(pos, us, true, out);
            }
        }
    }
}

fn push_promotions(out: &mut MoveList, from: Square, to: Square, captured: Option<Piece>, quiescence_only: bool) {
    if quiescence_only {
        out.push(Move::Promotion { from, to, captured, promoted_to: Piece::Queen });
    } else {
        for &piece in &PROMOTION_PIECES {
            out.push(Move::Promotion { from, to, captured, promoted_to: piece });
        }
    }
}

fn generate_pawn_moves(pos: &Position, us: Color, captures_only: bool, out: &mut MoveList) {
    let pawns = pos.pieces_of(Piece::Pawn, us);
    let enemy = pos.color_bb(us.opposite());
    let push_dir = us.pawn_push_dir();
    let promo_rank = us.promotion_rank();

    for from in pawns.iter() {
        // Pushes.
        if !captures_only {
            let one_idx = from.index() as i8 + push_dir;
            if (0..64).contains(&one_idx) {
                let one = Square::from_index(one_idx as u8);
                if pos.piece_at(one).is_none() {
                    if one.rank() == promo_rank {
                        push_promotions(out, from, one, None, false);
                    } else {
                        out.push(Move::Default { from, to: one, captured: None });
                        if from.rank() == us.pawn_home_rank() {
                            let two_idx = one.index() as i8 + push_dir;
                            let two = Square::from_index(two_idx as u8);
                            if pos.piece_at(two).is_none() {
                                out.push(Move::DoublePush { from, to: two });
                            }
                        }
                    }
                }
            }
        }

        // Captures (including promotions-by-capture).
        let attacks = magic::pawn_attacks(us, from) & enemy;
        for to in attacks.iter() {
            let captured = pos.piece_at(to).map(|(p, _)| p);
            if to.rank() == promo_rank {
                push_promotions(out, from, to, captured, captures_only);
            } else {
                out.push(Move::Default { from, to, captured });
            }
        }

        // En passant.
        if let Some(ep) = pos.en_passant_target() {
            if (magic::pawn_attacks(us, from) & Bitboard::from_square(ep)).any() {
                out.push(Move::EnPassant { from, to: ep });
            }
        }
    }
}

fn generate_knight_moves(pos: &Position, us: Color, captures_only: bool, out: &mut MoveList) {
    let own = pos.color_bb(us);
    let enemy = pos.color_bb(us.opposite());
    for from in pos.pieces_of(Piece::Knight, us).iter() {
        let targets = magic::knight_attacks(from) & !own;
        let targets = if captures_only { targets & enemy } else { targets };
        for to in targets.iter() {
            let captured = pos.piece_at(to).map(|(p, _)| p);
            out.push(Move::Default { from, to, captured });
        }
    }
}

fn generate_king_moves(pos: &Position, us: Color, captures_only: bool, out: &mut MoveList) {
    let own = pos.color_bb(us);
    let enemy = pos.color_bb(us.opposite());
    let from = pos.king_square(us);
    let targets = magic::king_attacks(from) & !own;
    let targets = if captures_only { targets & enemy } else { targets };
    for to in targets.iter() {
        let captured = pos.piece_at(to).map(|(p, _)| p);
        out.push(Move::Default { from, to, captured });
    }
}

fn generate_sliding_moves(pos: &Position, us: Color, piece: Piece, captures_only: bool, out: &mut MoveList) {
    let own = pos.color_bb(us);
    let enemy = pos.color_bb(us.opposite());
    let occupied = pos.occupied();
    for from in pos.pieces_of(piece, us).iter() {
        let attacks = match piece {
            Piece::Bishop => magic::bishop_attacks(from, occupied),
            Piece::Rook => magic::rook_attacks(from, occupied),
            Piece::Queen => magic::queen_attacks(from, occupied),
            _ => unreachable!("generate_sliding_moves called with a non-sliding piece"),
        };
        let targets = attacks & !own;
        let targets = if captures_only { targets & enemy } else { targets };
        for to in targets.iter() {
            let captured = pos.piece_at(to).map(|(p, _)| p);
            out.push(Move::Default { from, to, captured });
        }
    }
}

fn generate_castling_moves(pos: &Position, us: Color, out: &mut MoveList) {
    for &side in &[CastleSide::King, CastleSide::Queen] {
        if !pos.has_castling_right(us, side) {
            continue;
        }
        let king_from = pos.king_square(us);
        let rook_from = pos.rook_home(us, side);
        let king_to = crate::moves::castle_king_dest(king_from, side);
        let rook_to = crate::moves::castle_rook_dest(king_from, side);

        let occupied_without_pieces = {
            let mut bb = pos.occupied();
            bb.reset(king_from);
            bb.reset(rook_from);
            bb
        };
        let span = squares_between_inclusive(king_from.min(king_to), king_from.max(king_to))
            | squares_between_inclusive(rook_from.min(rook_to), rook_from.max(rook_to));
        if (span & occupied_without_pieces).any() {
            continue;
        }

        let them = us.opposite();
        let king_path = squares_between_inclusive(king_from, king_to);
        let mut blocked = false;
        for sq in king_path.iter() {
            if pos.is_square_attacked_with_occupancy(sq, them, occupied_without_pieces | Bitboard::from_square(king_from)) {
                blocked = true;
                break;
            }
        }
        if blocked {
            continue;
        }

        out.push(Move::Castling { side, king_from, rook_from });
    }
}

trait SquareOrd {
    fn min(self, other: Square) -> Square;
    fn max(self, other: Square) -> Square;
}

impl SquareOrd for Square {
    fn min(self, other: Square) -> Square {
        if self.index() <= other.index() {
            self
        } else {
            other
        }
    }
    fn max(self, other: Square) -> Square {
        if self.index() >= other.index() {
            self
        } else {
            other
        }
    }
}

fn squares_between_inclusive(a: Square, b: Square) -> Bitboard {
    let mut bb = Bitboard::from_square(a) | Bitboard::from_square(b);
    let (lo, hi) = (a.index().min(b.index()), a.index().max(b.index()));
    for idx in lo..=hi {
        bb.set(Square::from_index(idx as u8));
    }
    bb
}


#[cfg(test)]
mod invariant_properties {
    use super::*;
    use crate::types::ALL_PIECES;
    use proptest::prelude::*;

    const TACTICAL_FENS: [&str; 3] = [
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    ];

    /// Bitboard/mailbox consistency (property 3 of spec §8): every occupied
    /// square is covered by exactly one piece bitboard and the matching
    /// color bitboard, and the per-type bitboards never overlap.
    fn assert_bitboards_consistent(pos: &Position) {
        let mut type_union = Bitboard::EMPTY;
        for &piece in &ALL_PIECES {
            let bb = pos.pieces_by_type(piece);
            assert!((type_union & bb).is_empty(), "piece bitboards overlap for {piece:?}");
            type_union = type_union | bb;
        }
        let color_union = pos.color_bb(Color::White) | pos.color_bb(Color::Black);
        assert_eq!(type_union, color_union);

        for idx in 0..64u8 {
            let sq = Square::from_index(idx);
            let occupied = type_union.test(sq);
            assert_eq!(pos.piece_at(sq).is_some(), occupied);
            if let Some((piece, color)) = pos.piece_at(sq) {
                assert!(pos.pieces_by_type(piece).test(sq));
                assert!(pos.color_bb(color).test(sq));
            }
        }
    }

    fn run_random_walk(mut pos: Position, selectors: &[u32]) {
        assert_bitboards_consistent(&pos);
        assert_eq!(pos.hash(), pos.recompute_hash_from_scratch());

        for &selector in selectors {
            let mut moves = MoveList::new();
            generate(&mut pos, GenMode::All, &mut moves);
            if moves.is_empty() {
                break;
            }
            let mv = moves.get(selector as usize % moves.len()).unwrap();

            let before = pos.clone();
            let info = pos.make_move(mv);

            assert_bitboards_consistent(&pos);
            assert_eq!(
                pos.hash(),
                pos.recompute_hash_from_scratch(),
                "incremental hash diverged from scratch after {mv}"
            );

            pos.unmake_move(mv, info);
            assert_eq!(pos, before, "unmake did not restore the exact prior position after {mv}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn make_unmake_and_hash_are_consistent_from_the_start_position(
            selectors in prop::collection::vec(any::<u32>(), 1..40)
        ) {
            run_random_walk(Position::new(), &selectors);
        }

        #[test]
        fn make_unmake_and_hash_are_consistent_from_tactical_positions(
            fen_index in 0..TACTICAL_FENS.len(),
            selectors in prop::collection::vec(any::<u32>(), 1..40)
        ) {
            let pos = Position::from_fen(TACTICAL_FENS[fen_index]).unwrap();
            run_random_walk(pos, &selectors);
        }
    }
}
