//! Pseudo-legal move generation.
//!
//! Every generator in this file is parameterized by [`MoveKind`] instead of
//! existing twice (once for "give me everything", once for the staged
//! captures-then-quiets split the search's move picker wants). A slider or
//! stepper's target mask is the same regardless of which subset the caller
//! asked for; only the final filter against that mask differs, so the split
//! entry points below are thin wrappers over one generator per piece type
//! rather than a second copy of the move-pushing logic.

use crate::board::{Board, Color, Piece};
use crate::moves::king::KING_ATTACKS;
use crate::moves::knight::KNIGHT_ATTACKS;
use crate::moves::magic::MagicTables;
use crate::moves::magic::structs::{BishopMagicTables, RookMagicTables};
use crate::moves::pawn::{BLACK_PAWN_ATTACKS, WHITE_PAWN_ATTACKS};
use crate::moves::square_control::is_legal_castling;
use crate::moves::types::{
    CAPTURE, DOUBLE_PAWN_PUSH, EN_PASSANT, KINGSIDE_CASTLE, Move, MoveBuffer, PROMOTION,
    PROMOTION_CAPTURE, QUEENSIDE_CASTLE, QUIET_MOVE,
};
use crate::square::Square;
use crate::utils::pop_lsb;

const RANK1: u64 = 0x0000_0000_0000_00FF;
const RANK2: u64 = 0x0000_0000_0000_FF00;
const RANK7: u64 = 0x00FF_0000_0000_0000;
const RANK8: u64 = 0xFF00_0000_0000_0000;

const WHITE_KINGSIDE_BETWEEN: u64 = 0x0000_0000_0000_0060;
const WHITE_QUEENSIDE_BETWEEN: u64 = 0x0000_0000_0000_000E;
const BLACK_KINGSIDE_BETWEEN: u64 = 0x6000_0000_0000_0000;
const BLACK_QUEENSIDE_BETWEEN: u64 = 0x0E00_0000_0000_0000;

const PROMOS: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

/// Which subset of pseudo-legal moves a generator call should emit.
///
/// `search::picker::MovePicker` wants captures ordered before quiets, so it
/// asks for the two subsets separately rather than filtering one combined
/// list; `generate_pseudo_legal` (perft, the root move list, etc.) wants
/// everything at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    All,
    CapturesOnly,
    QuietsOnly,
}

impl MoveKind {
    fn wants_captures(self) -> bool {
        matches!(self, MoveKind::All | MoveKind::CapturesOnly)
    }

    fn wants_quiets(self) -> bool {
        matches!(self, MoveKind::All | MoveKind::QuietsOnly)
    }
}

#[inline(always)]
fn kingside_between(color: Color) -> u64 {
    match color {
        Color::White => WHITE_KINGSIDE_BETWEEN,
        Color::Black => BLACK_KINGSIDE_BETWEEN,
    }
}

#[inline(always)]
fn queenside_between(color: Color) -> u64 {
    match color {
        Color::White => WHITE_QUEENSIDE_BETWEEN,
        Color::Black => BLACK_QUEENSIDE_BETWEEN,
    }
}

/// Emits moves from `targets` (already masked against friendly occupancy
/// and the enemy king), filtered down to whichever of captures/quiets
/// `kind` asked for.
#[inline(always)]
fn push_targets(
    from: u8,
    targets: u64,
    enemy: u64,
    kind: MoveKind,
    piece: Piece,
    move_list: &mut impl MoveBuffer,
) {
    let mut bb = match kind {
        MoveKind::All => targets,
        MoveKind::CapturesOnly => targets & enemy,
        MoveKind::QuietsOnly => targets & !enemy,
    };
    while bb != 0 {
        let to = pop_lsb(&mut bb);
        let is_capture = (enemy >> to) & 1 != 0;
        move_list.push(Move {
            from: Square::from_index(from),
            to: Square::from_index(to),
            piece,
            promotion: None,
            flags: if is_capture { CAPTURE } else { QUIET_MOVE },
        });
    }
}

pub fn generate_knight_moves(board: &Board, move_list: &mut impl MoveBuffer, kind: MoveKind) {
    let color = board.side_to_move;
    let friendly = board.occupancy(color);
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;

    let mut bb = board.pieces(Piece::Knight, color);
    while bb != 0 {
        let from = pop_lsb(&mut bb);
        let targets = KNIGHT_ATTACKS[from as usize] & !friendly & !enemy_king;
        push_targets(from, targets, enemy_without_king, kind, Piece::Knight, move_list);
    }
}

pub fn generate_bishop_moves(
    board: &Board,
    tables: &BishopMagicTables,
    move_list: &mut impl MoveBuffer,
    kind: MoveKind,
) {
    let color = board.side_to_move;
    let friendly = board.occupancy(color);
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;
    let blockers = board.occupied();

    let mut bb = board.pieces(Piece::Bishop, color);
    while bb != 0 {
        let from = pop_lsb(&mut bb);
        let attacks = tables.get_attacks(from as usize, blockers);
        let targets = attacks & !friendly & !enemy_king;
        push_targets(from, targets, enemy_without_king, kind, Piece::Bishop, move_list);
    }
}

pub fn generate_rook_moves(
    board: &Board,
    tables: &RookMagicTables,
    move_list: &mut impl MoveBuffer,
    kind: MoveKind,
) {
    let color = board.side_to_move;
    let friendly = board.occupancy(color);
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;
    let blockers = board.occupied();

    let mut bb = board.pieces(Piece::Rook, color);
    while bb != 0 {
        let from = pop_lsb(&mut bb);
        let attacks = tables.get_attacks(from as usize, blockers);
        let targets = attacks & !friendly & !enemy_king;
        push_targets(from, targets, enemy_without_king, kind, Piece::Rook, move_list);
    }
}

pub fn generate_queen_moves(
    board: &Board,
    tables: &MagicTables,
    move_list: &mut impl MoveBuffer,
    kind: MoveKind,
) {
    let color = board.side_to_move;
    let friendly = board.occupancy(color);
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let enemy_without_king = board.opponent_occupancy(color) & !enemy_king;
    let blockers = board.occupied();

    let mut bb = board.pieces(Piece::Queen, color);
    while bb != 0 {
        let from = pop_lsb(&mut bb);
        let attacks = tables.queen_attacks(from as usize, blockers);
        let targets = attacks & !friendly & !enemy_king;
        push_targets(from, targets, enemy_without_king, kind, Piece::Queen, move_list);
    }
}

pub fn generate_king_moves(
    board: &Board,
    tables: &MagicTables,
    move_list: &mut impl MoveBuffer,
    kind: MoveKind,
) {
    let color = board.side_to_move;
    let king_bb = board.pieces(Piece::King, color);
    if king_bb == 0 {
        return; // illegal position safeguard
    }

    let from = king_bb.trailing_zeros() as u8; // exactly one king per side
    let friendly = board.occupancy(color);
    let enemy_king = board.pieces(Piece::King, color.opposite());
    let enemy = board.opponent_occupancy(color) & !enemy_king;

    let targets = KING_ATTACKS[from as usize] & !friendly & !enemy_king;
    push_targets(from, targets, enemy, kind, Piece::King, move_list);

    // Castling is never a capture, so it only participates in the quiet half.
    if !kind.wants_quiets() {
        return;
    }

    let occ = board.occupied();
    if board.has_kingside_castle(color) && (occ & kingside_between(color)) == 0 {
        let mv = Move {
            from: Square::from_index(from),
            to: Square::from_index(from + 2),
            piece: Piece::King,
            promotion: None,
            flags: KINGSIDE_CASTLE,
        };
        if is_legal_castling(board, mv, tables) {
            move_list.push(mv);
        }
    }
    if board.has_queenside_castle(color) && (occ & queenside_between(color)) == 0 {
        move_list.push(Move {
            from: Square::from_index(from),
            to: Square::from_index(from - 2),
            piece: Piece::King,
            promotion: None,
            flags: QUEENSIDE_CASTLE,
        });
    }
}

fn pawn_attack_table(color: Color) -> &'static [u64; 64] {
    match color {
        Color::White => &WHITE_PAWN_ATTACKS,
        Color::Black => &BLACK_PAWN_ATTACKS,
    }
}

pub fn generate_pawn_moves(board: &Board, move_list: &mut impl MoveBuffer, kind: MoveKind) {
    let color = board.side_to_move;
    let pawns = board.pieces(Piece::Pawn, color);
    let empty = !board.occupied();
    let enemy_without_king =
        board.opponent_occupancy(color) & !board.pieces(Piece::King, color.opposite());
    let attacks = pawn_attack_table(color);

    let (start_rank, promo_rank) = match color {
        Color::White => (RANK7, RANK8),
        Color::Black => (RANK2, RANK1),
    };

    if kind.wants_quiets() {
        let single_pushes = match color {
            Color::White => ((pawns << 8) & empty) & !promo_rank,
            Color::Black => ((pawns >> 8) & empty) & !promo_rank,
        };
        let mut bb = single_pushes;
        while bb != 0 {
            let to = pop_lsb(&mut bb);
            let from = if color == Color::White { to - 8 } else { to + 8 };
            move_list.push(Move {
                from: Square::from_index(from),
                to: Square::from_index(to),
                piece: Piece::Pawn,
                promotion: None,
                flags: QUIET_MOVE,
            });
        }

        let double_pushes = match color {
            Color::White => (((pawns & RANK2) << 8) & empty) << 8 & empty,
            Color::Black => (((pawns & RANK7) >> 8) & empty) >> 8 & empty,
        };
        let mut bb = double_pushes;
        while bb != 0 {
            let to = pop_lsb(&mut bb);
            let from = if color == Color::White { to - 16 } else { to + 16 };
            move_list.push(Move {
                from: Square::from_index(from),
                to: Square::from_index(to),
                piece: Piece::Pawn,
                promotion: None,
                flags: DOUBLE_PAWN_PUSH,
            });
        }

        let promo_pushes = match color {
            Color::White => (pawns & start_rank) << 8 & empty,
            Color::Black => (pawns & start_rank) >> 8 & empty,
        };
        let mut bb = promo_pushes;
        while bb != 0 {
            let to = pop_lsb(&mut bb);
            let from = if color == Color::White { to - 8 } else { to + 8 };
            for &promo in PROMOS.iter() {
                move_list.push(Move {
                    from: Square::from_index(from),
                    to: Square::from_index(to),
                    piece: Piece::Pawn,
                    promotion: Some(promo),
                    flags: PROMOTION,
                });
            }
        }
    }

    if kind.wants_captures() {
        let mut attackers = pawns & !start_rank;
        while attackers != 0 {
            let from = pop_lsb(&mut attackers);
            let mut targets = attacks[from as usize] & enemy_without_king & !promo_rank;
            while targets != 0 {
                let to = pop_lsb(&mut targets);
                move_list.push(Move {
                    from: Square::from_index(from),
                    to: Square::from_index(to),
                    piece: Piece::Pawn,
                    promotion: None,
                    flags: CAPTURE,
                });
            }
        }

        let mut promo_attackers = pawns & start_rank;
        while promo_attackers != 0 {
            let from = pop_lsb(&mut promo_attackers);
            let mut targets = attacks[from as usize] & enemy_without_king & promo_rank;
            while targets != 0 {
                let to = pop_lsb(&mut targets);
                for &promo in PROMOS.iter() {
                    move_list.push(Move {
                        from: Square::from_index(from),
                        to: Square::from_index(to),
                        piece: Piece::Pawn,
                        promotion: Some(promo),
                        flags: PROMOTION_CAPTURE,
                    });
                }
            }
        }

        if let Some(ep_sq) = board.en_passant {
            let ep = ep_sq.index();
            if (empty & (1u64 << ep)) != 0 {
                let cap_sq = if color == Color::White { ep - 8 } else { ep + 8 };
                let enemy_pawns = board.pieces(Piece::Pawn, color.opposite());
                if (enemy_pawns & (1u64 << cap_sq)) != 0 {
                    let mut atk = pawns;
                    while atk != 0 {
                        let from = pop_lsb(&mut atk);
                        if (attacks[from as usize] & (1u64 << ep)) != 0 {
                            move_list.push(Move {
                                from: Square::from_index(from),
                                to: Square::from_index(ep),
                                piece: Piece::Pawn,
                                promotion: None,
                                flags: EN_PASSANT,
                            });
                        }
                    }
                }
            }
        }
    }
}

/// Every pseudo-legal move for `board.side_to_move`: pawns, knights,
/// sliders, the king, and castling. `search::square_control` is what
/// filters the illegal (leaves-own-king-in-check) subset out afterward.
pub fn generate_pseudo_legal(board: &Board, tables: &MagicTables, moves: &mut impl MoveBuffer) {
    moves.clear();
    generate_pawn_moves(board, moves, MoveKind::All);
    generate_knight_moves(board, moves, MoveKind::All);
    generate_bishop_moves(board, &tables.bishop, moves, MoveKind::All);
    generate_rook_moves(board, &tables.rook, moves, MoveKind::All);
    generate_queen_moves(board, tables, moves, MoveKind::All);
    generate_king_moves(board, tables, moves, MoveKind::All);
}

/// Captures, promotions (capturing or not), and en passant — the subset
/// `search::picker::MovePicker` searches before any quiet move.
pub fn generate_pseudo_legal_captures(
    board: &Board,
    tables: &MagicTables,
    moves: &mut impl MoveBuffer,
) {
    generate_pawn_moves(board, moves, MoveKind::CapturesOnly);
    generate_knight_moves(board, moves, MoveKind::CapturesOnly);
    generate_bishop_moves(board, &tables.bishop, moves, MoveKind::CapturesOnly);
    generate_rook_moves(board, &tables.rook, moves, MoveKind::CapturesOnly);
    generate_queen_moves(board, tables, moves, MoveKind::CapturesOnly);
    generate_king_moves(board, tables, moves, MoveKind::CapturesOnly);
}

/// Single/double pawn pushes, non-capturing piece moves, and castling.
pub fn generate_pseudo_legal_quiets(
    board: &Board,
    tables: &MagicTables,
    moves: &mut impl MoveBuffer,
) {
    generate_pawn_moves(board, moves, MoveKind::QuietsOnly);
    generate_knight_moves(board, moves, MoveKind::QuietsOnly);
    generate_bishop_moves(board, &tables.bishop, moves, MoveKind::QuietsOnly);
    generate_rook_moves(board, &tables.rook, moves, MoveKind::QuietsOnly);
    generate_queen_moves(board, tables, moves, MoveKind::QuietsOnly);
    generate_king_moves(board, tables, moves, MoveKind::QuietsOnly);
}
