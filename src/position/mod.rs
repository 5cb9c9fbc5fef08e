//! The central position aggregate: mailbox + per-type/per-color bitboards,
//! incrementally maintained Zobrist hash and tapered material/PSQT, and the
//! repetition history stack. Make/unmake live in `make_unmake`; FEN parsing
//! and printing live in `fen`.

mod fen;
mod make_unmake;

use crate::bitboard::Bitboard;
use crate::magic;
use crate::types::{CastleSide, Color, Piece, Square};
use crate::zobrist::ZOBRIST;

pub use fen::START_FEN;

/// Snapshot of everything `DoMove` cannot cheaply undo by inspecting the
/// move alone. Captured by `make_move`/`make_null_move`, consumed by the
/// matching `unmake_*`.
#[derive(Clone, Copy, Debug)]
pub struct UnmakeInfo {
    castling_rights: u8,
    en_passant_target: Option<Square>,
    halfmove_clock: u32,
    hash: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct NullMoveInfo {
    en_passant_target: Option<Square>,
    hash: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    board: [Option<(Piece, Color)>; 64],
    pieces_by_type: [Bitboard; 6],
    pieces_by_color: [Bitboard; 2],
    side_to_move: Color,
    king_square: [Square; 2],
    /// `rook_home[color][0]` = king-side rook origin, `[1]` = queen-side.
    rook_home: [[Square; 2]; 2],
    castling_rights: u8,
    en_passant_target: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
    eval_mg: [i32; 2],
    eval_eg: [i32; 2],
    non_pawn_material: [i32; 2],
    hash: u64,
    /// `(hash, resets_fifty_move_count)` pushed on every move, popped on undo.
    history: Vec<(u64, bool)>,
}

impl Position {
    pub fn new() -> Self {
        fen::parse(START_FEN).expect("start position FEN is well-formed")
    }

    pub fn from_fen(fen: &str) -> Result<Self, crate::error::FenError> {
        fen::parse(fen)
    }

    pub fn to_fen(&self) -> String {
        fen::format(self)
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.king_square[color.index()]
    }

    #[inline]
    pub fn rook_home(&self, color: Color, side: CastleSide) -> Square {
        let idx = match side {
            CastleSide::King => 0,
            CastleSide::Queen => 1,
        };
        self.rook_home[color.index()][idx]
    }

    #[inline]
    pub fn castling_rights(&self) -> u8 {
        self.castling_rights
    }

    #[inline]
    pub fn has_castling_right(&self, color: Color, side: CastleSide) -> bool {
        self.castling_rights & crate::types::castle_bit(color, side) != 0
    }

    #[inline]
    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant_target
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.board[sq.index()]
    }

    #[inline]
    pub fn pieces_of(&self, piece: Piece, color: Color) -> Bitboard {
        self.pieces_by_type[piece.index()] & self.pieces_by_color[color.index()]
    }

    #[inline]
    pub fn pieces_by_type(&self, piece: Piece) -> Bitboard {
        self.pieces_by_type[piece.index()]
    }

    #[inline]
    pub fn color_bb(&self, color: Color) -> Bitboard {
        self.pieces_by_color[color.index()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.pieces_by_color[0] | self.pieces_by_color[1]
    }

    #[inline]
    pub fn eval_mg(&self, color: Color) -> i32 {
        self.eval_mg[color.index()]
    }

    #[inline]
    pub fn eval_eg(&self, color: Color) -> i32 {
        self.eval_eg[color.index()]
    }

    #[inline]
    pub fn non_pawn_material(&self, color: Color) -> i32 {
        self.non_pawn_material[color.index()]
    }

    /// Whether `color`'s king is currently attacked.
    pub fn in_check(&self, color: Color) -> bool {
        self.is_square_attacked(self.king_square(color), color.opposite())
    }

    /// Whether `sq` is attacked by any piece of `by_color`, under the
    /// position's actual current occupancy.
    pub fn is_square_attacked(&self, sq: Square, by_color: Color) -> bool {
        self.is_square_attacked_with_occupancy(sq, by_color, self.occupied())
    }

    /// As `is_square_attacked`, but against a caller-supplied occupancy —
    /// used when testing king safety with the king itself removed from the
    /// board (so sliding attacks correctly see "through" the vacated square).
    pub fn is_square_attacked_with_occupancy(
        &self,
        sq: Square,
        by_color: Color,
        occupancy: Bitboard,
    ) -> bool {
        let pawns = self.pieces_of(Piece::Pawn, by_color);
        if (magic::pawn_attacks(by_color.opposite(), sq) & pawns).any() {
            return true;
        }
        if (magic::knight_attacks(sq) & self.pieces_of(Piece::Knight, by_color)).any() {
            return true;
        }
        if (magic::king_attacks(sq) & self.pieces_of(Piece::King, by_color)).any() {
            return true;
        }
        let bishops_queens =
            self.pieces_of(Piece::Bishop, by_color) | self.pieces_of(Piece::Queen, by_color);
        if (magic::bishop_attacks(sq, occupancy) & bishops_queens).any() {
            return true;
        }
        let rooks_queens =
            self.pieces_of(Piece::Rook, by_color) | self.pieces_of(Piece::Queen, by_color);
        if (magic::rook_attacks(sq, occupancy) & rooks_queens).any() {
            return true;
        }
        false
    }

    /// Walks the repetition stack back at most `halfmove_clock` entries,
    /// stopping at the first reset (capture or pawn move), counting matches
    /// of the current hash. A count of 2 or more (this position occurred
    /// before, twofold-in-search convention) is treated as a draw.
    pub fn is_repetition(&self) -> bool {
        let limit = self.halfmove_clock as usize;
        for &(h, reset) in self.history.iter().rev().take(limit) {
            if reset {
                break;
            }
            if h == self.hash {
                return true;
            }
        }
        false
    }

    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    pub fn is_draw(&self) -> bool {
        self.is_fifty_move_draw() || self.is_repetition() || self.is_insufficient_material()
    }

    pub fn is_insufficient_material(&self) -> bool {
        if (self.pieces_by_type[Piece::Pawn.index()]
            | self.pieces_by_type[Piece::Rook.index()]
            | self.pieces_by_type[Piece::Queen.index()])
        .any()
        {
            return false;
        }
        let minor_count = |color: Color| {
            (self.pieces_of(Piece::Knight, color) | self.pieces_of(Piece::Bishop, color))
                .popcount()
        };
        let white_minors = minor_count(Color::White);
        let black_minors = minor_count(Color::Black);
        white_minors <= 1 && black_minors <= 1 && white_minors + black_minors <= 1
    }

    /// Recomputes the Zobrist hash from scratch from board + irreversible
    /// state, for debug-assertion comparison against the incrementally
    /// maintained one.
    pub fn recompute_hash_from_scratch(&self) -> u64 {
        let mut h = 0u64;
        for sq_idx in 0..64 {
            if let Some((piece, color)) = self.board[sq_idx] {
                h ^= ZOBRIST.piece_square(piece, color, Square::from_index(sq_idx as u8));
            }
        }
        for &color in &[Color::White, Color::Black] {
            let rights = (self.castling_rights >> (color.index() as u8 * 2)) & 0b11;
            h ^= ZOBRIST.castling_rights(color, rights);
        }
        if let Some(ep) = self.en_passant_target {
            if ep_is_capturable(self, ep) {
                h ^= ZOBRIST.en_passant(ep.file());
            }
        }
        if self.side_to_move == Color::Black {
            h ^= ZOBRIST.side_to_move;
        }
        h
    }

    fn place_piece(&mut self, piece: Piece, color: Color, sq: Square) {
        debug_assert!(self.board[sq.index()].is_none());
        self.board[sq.index()] = Some((piece, color));
        self.pieces_by_type[piece.index()].set(sq);
        self.pieces_by_color[color.index()].set(sq);
        self.hash ^= ZOBRIST.piece_square(piece, color, sq);
        let (mg, eg) = crate::pst::psqt_value(piece, color, sq);
        let (piece_mg, piece_eg) = crate::eval::PIECE_VALUE[piece.index()];
        self.eval_mg[color.index()] += mg + piece_mg;
        self.eval_eg[color.index()] += eg + piece_eg;
        if piece != Piece::Pawn && piece != Piece::King {
            self.non_pawn_material[color.index()] += piece_mg;
        }
        if piece == Piece::King {
            self.king_square[color.index()] = sq;
        }
    }

    fn remove_piece(&mut self, sq: Square) -> (Piece, Color) {
        let (piece, color) = self.board[sq.index()].take().expect("remove_piece on empty square");
        self.pieces_by_type[piece.index()].reset(sq);
        self.pieces_by_color[color.index()].reset(sq);
        self.hash ^= ZOBRIST.piece_square(piece, color, sq);
        let (mg, eg) = crate::pst::psqt_value(piece, color, sq);
        let (piece_mg, piece_eg) = crate::eval::PIECE_VALUE[piece.index()];
        self.eval_mg[color.index()] -= mg + piece_mg;
        self.eval_eg[color.index()] -= eg + piece_eg;
        if piece != Piece::Pawn && piece != Piece::King {
            self.non_pawn_material[color.index()] -= piece_mg;
        }
        (piece, color)
    }

    fn toggle_castling_hash(&mut self) {
        for &color in &[Color::White, Color::Black] {
            let rights = (self.castling_rights >> (color.index() as u8 * 2)) & 0b11;
            self.hash ^= ZOBRIST.castling_rights(color, rights);
        }
    }

    fn toggle_en_passant_hash(&mut self) {
        if let Some(ep) = self.en_passant_target {
            if ep_is_capturable(self, ep) {
                self.hash ^= ZOBRIST.en_passant(ep.file());
            }
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

/// Strict en-passant hashing rule: the file key is only toggled when an
/// enemy pawn actually stands adjacent to the target and could capture,
/// so positions differing only in an unusable ep flag hash identically.
pub(crate) fn ep_is_capturable(pos: &Position, ep: Square) -> bool {
    let capturer = pos.side_to_move;
    let attackers = magic::pawn_attacks(capturer.opposite(), ep) & pos.pieces_of(Piece::Pawn, capturer);
    attackers.any()
}

pub(crate) use ep_is_capturable as ep_capturable;
