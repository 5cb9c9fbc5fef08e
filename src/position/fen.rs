//! FEN parsing and printing: the 6-field position setup string.

use super::Position;
use crate::bitboard::Bitboard;
use crate::error::FenError;
use crate::types::{Color, Piece, Square, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K, CASTLE_WHITE_Q};
use crate::zobrist::ZOBRIST;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

pub fn parse(fen: &str) -> Result<Position, FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(FenError::WrongFieldCount(fields.len()));
    }

    let mut board = [None; 64];
    let mut rank = 7i32;
    let mut file = 0i32;
    for c in fields[0].chars() {
        match c {
            '/' => {
                if file != 8 {
                    return Err(FenError::BadPlacement(fields[0].to_string()));
                }
                rank -= 1;
                file = 0;
            }
            '1'..='8' => {
                file += c.to_digit(10).unwrap() as i32;
            }
            _ => {
                if !(0..8).contains(&rank) || !(0..8).contains(&file) {
                    return Err(FenError::BadPlacement(fields[0].to_string()));
                }
                let (piece, color) =
                    Piece::from_char(c).ok_or_else(|| FenError::BadPlacement(fields[0].to_string()))?;
                board[Square::new(rank as u8, file as u8).index()] = Some((piece, color));
                file += 1;
            }
        }
    }
    if rank != 0 || file != 8 {
        return Err(FenError::BadPlacement(fields[0].to_string()));
    }

    let side_to_move = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        _ => return Err(FenError::BadSideToMove(fields[1].to_string())),
    };

    let mut castling_rights = 0u8;
    if fields[2] != "-" {
        for c in fields[2].chars() {
            castling_rights |= match c {
                'K' => CASTLE_WHITE_K,
                'Q' => CASTLE_WHITE_Q,
                'k' => CASTLE_BLACK_K,
                'q' => CASTLE_BLACK_Q,
                _ => return Err(FenError::BadCastlingRights(fields[2].to_string())),
            };
        }
    }

    let en_passant_target = if fields[3] == "-" {
        None
    } else {
        Some(Square::parse(fields[3]).ok_or_else(|| FenError::BadEnPassantSquare(fields[3].to_string()))?)
    };

    let halfmove_clock: u32 =
        fields[4].parse().map_err(|_| FenError::BadHalfmoveClock(fields[4].to_string()))?;
    let fullmove_number: u32 =
        fields[5].parse().map_err(|_| FenError::BadFullmoveNumber(fields[5].to_string()))?;

    let mut rook_home = [[Square::new(0, 0); 2]; 2];
    for &color in &[Color::White, Color::Black] {
        let home_rank = if color == Color::White { 0 } else { 7 };
        let king_file = (0..8)
            .find(|&f| board[Square::new(home_rank, f).index()] == Some((Piece::King, color)))
            .unwrap_or(4);
        let king_side_rook = (king_file + 1..8)
            .rev()
            .find(|&f| board[Square::new(home_rank, f).index()] == Some((Piece::Rook, color)))
            .unwrap_or(7);
        let queen_side_rook = (0..king_file)
            .find(|&f| board[Square::new(home_rank, f).index()] == Some((Piece::Rook, color)))
            .unwrap_or(0);
        rook_home[color.index()] =
            [Square::new(home_rank, king_side_rook), Square::new(home_rank, queen_side_rook)];
    }

    let mut pos = Position {
        board: [None; 64],
        pieces_by_type: [Bitboard::EMPTY; 6],
        pieces_by_color: [Bitboard::EMPTY; 2],
        side_to_move,
        king_square: [Square::new(0, 4), Square::new(7, 4)],
        rook_home,
        castling_rights,
        en_passant_target,
        halfmove_clock,
        fullmove_number,
        eval_mg: [0; 2],
        eval_eg: [0; 2],
        non_pawn_material: [0; 2],
        hash: 0,
        history: Vec::with_capacity(64),
    };

    for sq_idx in 0..64 {
        if let Some((piece, color)) = board[sq_idx] {
            pos.place_piece(piece, color, Square::from_index(sq_idx as u8));
        }
    }

    for &color in &[Color::White, Color::Black] {
        let rights = (pos.castling_rights >> (color.index() as u8 * 2)) & 0b11;
        pos.hash ^= ZOBRIST.castling_rights(color, rights);
    }
    if let Some(ep) = pos.en_passant_target {
        if super::ep_capturable(&pos, ep) {
            pos.hash ^= ZOBRIST.en_passant(ep.file());
        }
    }
    if pos.side_to_move == Color::Black {
        pos.hash ^= ZOBRIST.side_to_move;
    }

    Ok(pos)
}

pub fn format(pos: &Position) -> String {
    let mut out = String::new();
    for rank in (0..8).rev() {
        let mut empty = 0;
        for file in 0..8 {
            let sq = Square::new(rank, file);
            match pos.piece_at(sq) {
                Some((piece, color)) => {
                    if empty > 0 {
                        out.push_str(&empty.to_string());
                        empty = 0;
                    }
                    out.push(piece.to_char(color));
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            out.push_str(&empty.to_string());
        }
        if rank != 0 {
            out.push('/');
        }
    }
    out.push(' ');
    out.push(if pos.side_to_move == Color::White { 'w' } else { 'b' });
    out.push(' ');
    let mut rights = String::new();
    if pos.castling_rights & CASTLE_WHITE_K != 0 {
        rights.push('K');
    }
    if pos.castling_rights & CASTLE_WHITE_Q != 0 {
        rights.push('Q');
    }
    if pos.castling_rights & CASTLE_BLACK_K != 0 {
        rights.push('k');
    }
    if pos.castling_rights & CASTLE_BLACK_Q != 0 {
        rights.push('q');
    }
    out.push_str(if rights.is_empty() { "-" } else { &rights });
    out.push(' ');
    match pos.en_passant_target {
        Some(sq) => out.push_str(&sq.to_string()),
        None => out.push('-'),
    }
    out.push(' ');
    out.push_str(&pos.halfmove_clock.to_string());
    out.push(' ');
    out.push_str(&pos.fullmove_number.to_string());
    out
}
