//! FEN (de)serialization for `Board`.

use super::fen_tables::{glyph_for, piece_from_glyph};
use super::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color};
use crate::square::Square;

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Loads a FEN string, replacing all current state.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let mut fields = fen.split_whitespace();

        let placement = fields.next().ok_or("FEN missing piece placement field")?;
        let side = fields.next().unwrap_or("w");
        let castling = fields.next().unwrap_or("-");
        let ep = fields.next().unwrap_or("-");
        let halfmove = fields.next().unwrap_or("0");
        let fullmove = fields.next().unwrap_or("1");

        let mut board = Board::new_empty();
        board.piece_bb = [[0u64; 6]; 2];

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(format!("FEN placement has {} ranks, expected 8", ranks.len()));
        }

        // FEN ranks run 8 (top) down to 1 (bottom); our square 0 is a1.
        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top as u8;
            let mut file: u8 = 0;
            for ch in rank_str.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file += skip as u8;
                    continue;
                }
                if file >= 8 {
                    return Err(format!("FEN rank '{}' overflows 8 files", rank_str));
                }
                let (piece, color) = piece_from_glyph(ch as u8)
                    .ok_or_else(|| format!("unrecognized FEN piece glyph '{}'", ch))?;
                let sq = Square::from_file_rank(file, rank);
                let bb = board.bb(color, piece) | (1u64 << sq.index());
                board.set_bb(color, piece, bb);
                file += 1;
            }
        }

        board.side_to_move = match side {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(format!("invalid side-to-move field '{}'", side)),
        };

        board.castling_rights = 0;
        if castling != "-" {
            for ch in castling.chars() {
                board.castling_rights |= match ch {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    _ => return Err(format!("invalid castling rights glyph '{}'", ch)),
                };
            }
        }

        board.en_passant = if ep == "-" {
            None
        } else {
            Some(Square::from_algebraic(ep).ok_or_else(|| format!("invalid en passant square '{}'", ep))?)
        };

        board.halfmove_clock = halfmove.parse().map_err(|_| "invalid halfmove clock field")?;
        board.fullmove_number = fullmove.parse().map_err(|_| "invalid fullmove number field")?;
        board.history.clear();
        board.refresh_zobrist();

        *self = board;
        Ok(())
    }

    /// Serializes the current state back into a FEN string.
    pub fn to_fen(&self) -> String {
        let mut ranks = Vec::with_capacity(8);
        for rank_from_top in 0..8u8 {
            let rank = 7 - rank_from_top;
            let mut rank_str = String::new();
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let sq = Square::from_file_rank(file, rank);
                match self.piece_at(sq) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            rank_str.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        rank_str.push(glyph_for(piece, color));
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                rank_str.push_str(&empty_run.to_string());
            }
            ranks.push(rank_str);
        }
        let placement = ranks.join("/");

        let side = match self.side_to_move {
            Color::White => "w",
            Color::Black => "b",
        };

        let mut castling = String::new();
        if self.castling_rights & CASTLE_WK != 0 {
            castling.push('K');
        }
        if self.castling_rights & CASTLE_WQ != 0 {
            castling.push('Q');
        }
        if self.castling_rights & CASTLE_BK != 0 {
            castling.push('k');
        }
        if self.castling_rights & CASTLE_BQ != 0 {
            castling.push('q');
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let ep = self
            .en_passant
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} {} {} {} {} {}",
            placement, side, castling, ep, self.halfmove_clock, self.fullmove_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_startpos() {
        let board: Board = STARTPOS_FEN.parse().unwrap();
        assert_eq!(board.to_fen(), STARTPOS_FEN);
    }

    #[test]
    fn round_trips_kiwipete() {
        let kiwipete = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let board: Board = kiwipete.parse().unwrap();
        assert_eq!(board.to_fen(), kiwipete);
    }

    #[test]
    fn rejects_malformed_placement() {
        let mut board = Board::new_empty();
        assert!(board.set_fen("not-a-fen").is_err());
    }
}
