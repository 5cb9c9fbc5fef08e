//! Core scalar types: squares, colors, pieces, castling rights.
//!
//! Squares use the little-endian rank-file convention: `sq = rank * 8 + file`,
//! file a..h = 0..7, rank 1..8 = 0..7. a1 = 0, h1 = 7, a8 = 56, h8 = 63.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Square(pub u8);

impl Square {
    pub const COUNT: usize = 64;

    #[inline]
    pub fn new(rank: u8, file: u8) -> Self {
        debug_assert!(rank < 8 && file < 8);
        Square(rank * 8 + file)
    }

    #[inline]
    pub fn from_index(idx: u8) -> Self {
        debug_assert!(idx < 64);
        Square(idx)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    #[inline]
    pub fn file(self) -> u8 {
        self.0 % 8
    }

    /// Parses an algebraic square such as `e4`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return None;
        }
        let file = file as u8 - b'a';
        let rank = rank as u8 - b'1';
        Some(Square::new(rank, file))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.file()) as char;
        let rank = (b'1' + self.rank()) as char;
        write!(f, "{file}{rank}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[inline]
    pub fn from_index(i: usize) -> Color {
        match i {
            0 => Color::White,
            1 => Color::Black,
            _ => unreachable!("color index out of range"),
        }
    }

    /// Home rank for pawns of this color (the rank double-push originates from).
    #[inline]
    pub fn pawn_home_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    #[inline]
    pub fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    #[inline]
    pub fn pawn_push_dir(self) -> i8 {
        match self {
            Color::White => 8,
            Color::Black => -8,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

pub const ALL_PIECES: [Piece; 6] = [
    Piece::Pawn,
    Piece::Knight,
    Piece::Bishop,
    Piece::Rook,
    Piece::Queen,
    Piece::King,
];

/// Promotion choices, queen first (typical search-order preference).
pub const PROMOTION_PIECES: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

impl Piece {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Piece::Pawn => 0,
            Piece::Knight => 1,
            Piece::Bishop => 2,
            Piece::Rook => 3,
            Piece::Queen => 4,
            Piece::King => 5,
        }
    }

    pub fn from_char(c: char) -> Option<(Piece, Color)> {
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        let piece = match c.to_ascii_lowercase() {
            'p' => Piece::Pawn,
            'n' => Piece::Knight,
            'b' => Piece::Bishop,
            'r' => Piece::Rook,
            'q' => Piece::Queen,
            'k' => Piece::King,
            _ => return None,
        };
        Some((piece, color))
    }

    pub fn to_char(self, color: Color) -> char {
        let c = match self {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        };
        if color == Color::White {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }
}

/// Castling right bit flags, one per (color, side).
pub const CASTLE_WHITE_K: u8 = 1 << 0;
pub const CASTLE_WHITE_Q: u8 = 1 << 1;
pub const CASTLE_BLACK_K: u8 = 1 << 2;
pub const CASTLE_BLACK_Q: u8 = 1 << 3;
pub const CASTLE_ALL: u8 = CASTLE_WHITE_K | CASTLE_WHITE_Q | CASTLE_BLACK_K | CASTLE_BLACK_Q;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CastleSide {
    King,
    Queen,
}

#[inline]
pub fn castle_bit(color: Color, side: CastleSide) -> u8 {
    match (color, side) {
        (Color::White, CastleSide::King) => CASTLE_WHITE_K,
        (Color::White, CastleSide::Queen) => CASTLE_WHITE_Q,
        (Color::Black, CastleSide::King) => CASTLE_BLACK_K,
        (Color::Black, CastleSide::Queen) => CASTLE_BLACK_Q,
    }
}

pub const MAX_PLY: usize = 128;
pub const MAX_MOVES: usize = 256;
