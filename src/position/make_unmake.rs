//! `DoMove`/`UndoMove`: incremental updates to bitboards, mailbox, hash,
//! material/PSQT, castling rights, and the repetition stack.

use super::{ep_capturable, NullMoveInfo, Position, UnmakeInfo};
use crate::moves::{castle_king_dest, castle_rook_dest, Move};
use crate::types::{CastleSide, Color, Piece, Square, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K, CASTLE_WHITE_Q};
use crate::zobrist::ZOBRIST;

impl Position {
    /// Applies `mv`, already assumed legal (the move generator is total
    /// over legal positions; this is never called with anything else).
    /// Returns the irreversible snapshot `unmake_move` needs to reverse it.
    pub fn make_move(&mut self, mv: Move) -> UnmakeInfo {
        let info = UnmakeInfo {
            castling_rights: self.castling_rights,
            en_passant_target: self.en_passant_target,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
        };

        self.toggle_en_passant_hash();
        self.toggle_castling_hash();

        let mover_color = self.side_to_move;
        let is_capture = mv.is_capture();
        let is_pawn_move = matches!(self.piece_at(mv.from()), Some((Piece::Pawn, _)));

        match mv {
            Move::Default { from, to, .. } => {
                let (piece, color) = self.remove_piece(from);
                if let Some(captured) = mv.captured() {
                    debug_assert_eq!(self.piece_at(to).map(|(p, _)| p), Some(captured));
                    self.remove_piece(to);
                }
                self.place_piece(piece, color, to);
                self.update_castling_rights_for(piece, color, from, to);
            }
            Move::DoublePush { from, to } => {
                let (piece, color) = self.remove_piece(from);
                self.place_piece(piece, color, to);
            }
            Move::EnPassant { from, to } => {
                let captured_sq = mv.en_passant_captured_square(mover_color);
                self.remove_piece(captured_sq);
                let (piece, color) = self.remove_piece(from);
                self.place_piece(piece, color, to);
            }
            Move::Promotion { from, to, .. } => {
                let (piece, color) = self.remove_piece(from);
                if mv.captured().is_some() {
                    self.remove_piece(to);
                }
                self.place_piece(mv.promotion().unwrap(), color, to);
                self.update_castling_rights_for(piece, color, from, to);
            }
            Move::Castling { side, king_from, rook_from } => {
                let (king, color) = self.remove_piece(king_from);
                let (rook, rook_color) = self.remove_piece(rook_from);
                let king_to = castle_king_dest(king_from, side);
                let rook_to = castle_rook_dest(king_from, side);
                self.place_piece(king, color, king_to);
                self.place_piece(rook, rook_color, rook_to);
                let rights = match (color, side) {
                    (Color::White, CastleSide::King) => CASTLE_WHITE_K | CASTLE_WHITE_Q,
                    (Color::White, CastleSide::Queen) => CASTLE_WHITE_K | CASTLE_WHITE_Q,
                    (Color::Black, CastleSide::King) => CASTLE_BLACK_K | CASTLE_BLACK_Q,
                    (Color::Black, CastleSide::Queen) => CASTLE_BLACK_K | CASTLE_BLACK_Q,
                };
                self.castling_rights &= !rights;
            }
            Move::Null => unreachable!("make_move called with a null move; use make_null_move"),
        }

        self.en_passant_target = None;
        if let Move::DoublePush { from, to } = mv {
            let mid = Square::from_index(((from.index() + to.index()) / 2) as u8);
            self.en_passant_target = Some(mid);
        }

        self.halfmove_clock = if is_capture || is_pawn_move { 0 } else { self.halfmove_clock + 1 };

        self.side_to_move = self.side_to_move.opposite();
        self.hash ^= ZOBRIST.side_to_move;
        if mover_color == Color::Black {
            self.fullmove_number += 1;
        }

        self.toggle_castling_hash();
        self.toggle_en_passant_hash();

        let resets = is_capture || is_pawn_move;
        self.history.push((self.hash, resets));

        info
    }

    pub fn unmake_move(&mut self, mv: Move, info: UnmakeInfo) {
        self.history.pop();
        self.side_to_move = self.side_to_move.opposite();
        let mover_color = self.side_to_move;
        if mover_color == Color::Black {
            self.fullmove_number -= 1;
        }

        match mv {
            Move::Default { from, to, captured } => {
                let (piece, color) = self.remove_piece(to);
                self.place_piece(piece, color, from);
                if let Some(captured) = captured {
                    self.place_piece(captured, color.opposite(), to);
                }
            }
            Move::DoublePush { from, to } => {
                let (piece, color) = self.remove_piece(to);
                self.place_piece(piece, color, from);
            }
            Move::EnPassant { from, to } => {
                let (piece, color) = self.remove_piece(to);
                self.place_piece(piece, color, from);
                let captured_sq = mv.en_passant_captured_square(mover_color);
                self.place_piece(Piece::Pawn, color.opposite(), captured_sq);
            }
            Move::Promotion { from, to, captured, .. } => {
                let (_, color) = self.remove_piece(to);
                self.place_piece(Piece::Pawn, color, from);
                if let Some(captured) = captured {
                    self.place_piece(captured, color.opposite(), to);
                }
            }
            Move::Castling { side, king_from, rook_from } => {
                let king_to = castle_king_dest(king_from, side);
                let rook_to = castle_rook_dest(king_from, side);
                let (king, color) = self.remove_piece(king_to);
                let (rook, rook_color) = self.remove_piece(rook_to);
                self.place_piece(king, color, king_from);
                self.place_piece(rook, rook_color, rook_from);
            }
            Move::Null => unreachable!("unmake_move called with a null move; use unmake_null_move"),
        }

        self.castling_rights = info.castling_rights;
        self.en_passant_target = info.en_passant_target;
        self.halfmove_clock = info.halfmove_clock;
        self.hash = info.hash;
    }

    /// Passes the turn without moving a piece; used only by null-move
    /// pruning. Never legal for the mover to actually play.
    pub fn make_null_move(&mut self) -> NullMoveInfo {
        let info = NullMoveInfo { en_passant_target: self.en_passant_target, hash: self.hash };
        let mover_color = self.side_to_move;
        self.toggle_en_passant_hash();
        self.en_passant_target = None;
        self.side_to_move = self.side_to_move.opposite();
        self.hash ^= ZOBRIST.side_to_move;
        if mover_color == Color::Black {
            self.fullmove_number += 1;
        }
        self.history.push((self.hash, true));
        info
    }

    pub fn unmake_null_move(&mut self, info: NullMoveInfo) {
        self.history.pop();
        self.side_to_move = self.side_to_move.opposite();
        if self.side_to_move == Color::Black {
            self.fullmove_number -= 1;
        }
        self.en_passant_target = info.en_passant_target;
        self.hash = info.hash;
    }

    /// King moves always clear both of that side's rights; a move touching
    /// (from or to) an original rook-home square clears that single right.
    /// `moved_piece`/`moved_color` must be captured by the caller before
    /// `place_piece` runs, since `place_piece` already moves `king_square`
    /// to `to` by the time this is called.
    fn update_castling_rights_for(&mut self, moved_piece: Piece, moved_color: Color, from: Square, to: Square) {
        if moved_piece == Piece::King {
            let rights = match moved_color {
                Color::White => CASTLE_WHITE_K | CASTLE_WHITE_Q,
                Color::Black => CASTLE_BLACK_K | CASTLE_BLACK_Q,
            };
            self.castling_rights &= !rights;
        }
        for &color in &[Color::White, Color::Black] {
            for &side in &[CastleSide::King, CastleSide::Queen] {
                let home = self.rook_home(color, side);
                if from == home || to == home {
                    self.castling_rights &= !crate::types::castle_bit(color, side);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::{self, GenMode};
    use crate::moves::MoveList;

    fn assert_roundtrip(fen: &str) {
        let mut pos = Position::from_fen(fen).unwrap();
        let before = pos.clone();
        let mut moves = MoveList::new();
        movegen::generate(&mut pos, GenMode::All, &mut moves);
        for mv in moves.iter().copied() {
            let info = pos.make_move(mv);
            pos.unmake_move(mv, info);
            assert_eq!(pos.hash(), before.hash());
            assert_eq!(pos.side_to_move(), before.side_to_move());
            assert_eq!(pos.castling_rights(), before.castling_rights());
            assert_eq!(pos.en_passant_target(), before.en_passant_target());
            assert_eq!(pos.halfmove_clock(), before.halfmove_clock());
            assert_eq!(pos.hash(), pos.recompute_hash_from_scratch());
        }
    }

    #[test]
    fn make_unmake_round_trips_from_start_position() {
        assert_roundtrip(crate::position::START_FEN);
    }

    #[test]
    fn make_unmake_round_trips_kiwipete() {
        assert_roundtrip("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
    }

    #[test]
    fn null_move_round_trips() {
        let mut pos = Position::new();
        let before_hash = pos.hash();
        let info = pos.make_null_move();
        assert_ne!(pos.hash(), before_hash);
        pos.unmake_null_move(info);
        assert_eq!(pos.hash(), before_hash);
    }

    #[test]
    fn fullmove_number_increments_after_blacks_move_and_unwinds_on_unmake() {
        let mut pos = Position::new();
        assert_eq!(pos.fullmove_number(), 1);

        let e4 = Move::DoublePush { from: Square::parse("e2").unwrap(), to: Square::parse("e4").unwrap() };
        let info_e4 = pos.make_move(e4);
        assert_eq!(pos.fullmove_number(), 1);

        let e5 = Move::DoublePush { from: Square::parse("e7").unwrap(), to: Square::parse("e5").unwrap() };
        let info_e5 = pos.make_move(e5);
        assert_eq!(pos.fullmove_number(), 2);

        pos.unmake_move(e5, info_e5);
        assert_eq!(pos.fullmove_number(), 1);
        pos.unmake_move(e4, info_e4);
        assert_eq!(pos.fullmove_number(), 1);
    }

    #[test]
    fn king_move_revokes_both_of_that_sides_castling_rights() {
        let mut pos = Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        let kf1 = Move::Default { from: Square::parse("e1").unwrap(), to: Square::parse("f1").unwrap(), captured: None };
        pos.make_move(kf1);
        assert_eq!(pos.castling_rights() & (CASTLE_WHITE_K | CASTLE_WHITE_Q), 0);
        assert_eq!(pos.castling_rights() & (CASTLE_BLACK_K | CASTLE_BLACK_Q), CASTLE_BLACK_K | CASTLE_BLACK_Q);
    }

    #[test]
    fn strict_en_passant_rule_only_toggles_when_capturable() {
        // After 1.e4, no black pawn is adjacent on the fourth rank, so the
        // strict rule must not fold an en-passant key into the hash.
        let mut pos = Position::new();
        let mv = Move::DoublePush { from: Square::parse("e2").unwrap(), to: Square::parse("e4").unwrap() };
        pos.make_move(mv);
        assert!(!ep_capturable(&pos, pos.en_passant_target().unwrap()));
        assert_eq!(pos.hash(), pos.recompute_hash_from_scratch());
    }
}
