use crate::board::castle_bits::*;
use crate::board::{Board, Color, EMPTY_SQ, Piece};
use crate::hash::zobrist::{ep_file_to_hash, xor_castling_rights_delta, zobrist_keys};
use crate::moves::magic::MagicTables;
use crate::moves::movegen::generate_pseudo_legal;
use crate::moves::square_control::{in_check, is_legal_castling};
use crate::moves::types::{Move, MoveBuffer, NullMoveUndo, Undo};
use crate::square::Square;

/// Precomputed castling rook moves by king destination index.
#[inline(always)]
fn rook_castle_squares(king_to_idx: u8) -> Option<(Square, Square)> {
    match king_to_idx {
        6 => Some((Square::from_index(7), Square::from_index(5))), // White O-O
        2 => Some((Square::from_index(0), Square::from_index(3))), // White O-O-O
        62 => Some((Square::from_index(63), Square::from_index(61))), // Black O-O
        58 => Some((Square::from_index(56), Square::from_index(59))), // Black O-O-O
        _ => None,
    }
}

#[inline(always)]
fn rights_mask_to_clear_for_rook(color: Color, rook_sq: u8) -> u8 {
    match (color, rook_sq) {
        (Color::White, 0) => CASTLE_WQ,  // a1
        (Color::White, 7) => CASTLE_WK,  // h1
        (Color::Black, 56) => CASTLE_BQ, // a8
        (Color::Black, 63) => CASTLE_BK, // h8
        _ => 0,
    }
}

/// Which castling rights `mv` strips, combining "king moved", "rook moved
/// off its home square", and "a rook was captured on its home square".
#[inline(always)]
fn rights_to_clear(
    color: Color,
    piece: Piece,
    from: u8,
    capture: Option<(Color, Piece, Square)>,
) -> u8 {
    let mut mask = 0u8;

    if piece == Piece::King {
        mask |= match color {
            Color::White => CASTLE_WK | CASTLE_WQ,
            Color::Black => CASTLE_BK | CASTLE_BQ,
        };
    }

    if piece == Piece::Rook {
        mask |= rights_mask_to_clear_for_rook(color, from);
    }

    if let Some((cap_color, Piece::Rook, cap_sq)) = capture {
        mask |= rights_mask_to_clear_for_rook(cap_color, cap_sq.index());
    }

    mask
}

#[inline(always)]
fn remove_piece(board: &mut Board, color: Color, piece: Piece, idx: usize) {
    let new_bb = board.bb(color, piece) & !(1u64 << idx);
    board.set_bb(color, piece, new_bb);
}

#[inline(always)]
fn place_piece(board: &mut Board, color: Color, piece: Piece, idx: usize) {
    let new_bb = board.bb(color, piece) | (1u64 << idx);
    board.set_bb(color, piece, new_bb);
}

pub fn make_move_basic(board: &mut Board, mv: Move) -> Undo {
    let start_zobrist = board.zobrist;
    let color = board.side_to_move;
    let piece = mv.piece;
    let from_idx = mv.from.index() as usize;
    let to_idx = mv.to.index() as usize;

    let prev_en_passant = board.en_passant;

    // The outgoing EP file, if any, is baked into the current hash; strip it
    // before touching anything else so the delta below starts from a clean
    // "no EP" hash state.
    if let Some(f) = ep_file_to_hash(board) {
        board.zobrist ^= zobrist_keys().ep_file[f as usize];
    }

    board.en_passant = None;
    let prev_halfmove_clock = board.halfmove_clock;
    let prev_fullmove_number = board.fullmove_number;

    let mut capture = None;
    if mv.is_en_passant() {
        let cap_sq = if color == Color::White {
            to_idx - 8
        } else {
            to_idx + 8
        };
        capture = Some((
            color.opposite(),
            Piece::Pawn,
            Square::from_index(cap_sq as u8),
        ));
        remove_piece(board, color.opposite(), Piece::Pawn, cap_sq);
    } else {
        let occupant = board.piece_on_sq[to_idx];
        if occupant != EMPTY_SQ {
            let cap_color = Color::from_u8(occupant >> 3);
            let cap_piece = Piece::from_u8(occupant & 0b111);
            capture = Some((cap_color, cap_piece, mv.to));
            remove_piece(board, cap_color, cap_piece, to_idx);
        }
    }

    let mut undo = Undo {
        from: mv.from,
        to: mv.to,
        piece,
        color,
        prev_side: color,
        capture,
        castling_rook: None,
        prev_castling_rights: board.castling_rights,
        promotion: None,
        prev_en_passant,
        prev_halfmove_clock,
        prev_fullmove_number,
        prev_history: None,
    };

    if mv.is_castling() {
        undo.castling_rook = rook_castle_squares(to_idx as u8);
    }

    if piece == Piece::Pawn {
        let from_rank = from_idx / 8;
        let to_rank = to_idx / 8;
        let double_pushed = (color == Color::White && from_rank == 1 && to_rank == 3)
            || (color == Color::Black && from_rank == 6 && to_rank == 4);
        if double_pushed {
            let ep_sq = if color == Color::White {
                from_idx + 8
            } else {
                from_idx - 8
            };
            board.en_passant = Some(Square::from_index(ep_sq as u8));
            debug_assert!(
                matches!((color, ep_sq / 8), (Color::White, 2) | (Color::Black, 5)),
                "EP square on wrong rank: {:?} color={:?}",
                Square::from_index(ep_sq as u8),
                color
            );
        }
    }

    let old_rights = board.castling_rights;
    let new_rights = old_rights & !rights_to_clear(color, piece, mv.from.index(), capture);
    if new_rights != old_rights {
        board.castling_rights = new_rights;
        xor_castling_rights_delta(&mut board.zobrist, zobrist_keys(), old_rights, new_rights);
    }

    remove_piece(board, color, piece, from_idx);
    if let Some(prom) = mv.promotion {
        debug_assert!(piece == Piece::Pawn, "only pawns can promote");
        place_piece(board, color, prom, to_idx);
        undo.promotion = Some(prom);
    } else {
        place_piece(board, color, piece, to_idx);
    }

    if let Some((rook_from, rook_to)) = undo.castling_rook {
        remove_piece(board, color, Piece::Rook, rook_from.index() as usize);
        place_piece(board, color, Piece::Rook, rook_to.index() as usize);
    }

    board.halfmove_clock = if capture.is_some() || piece == Piece::Pawn {
        0
    } else {
        prev_halfmove_clock + 1
    };
    if color == Color::Black {
        board.fullmove_number = prev_fullmove_number + 1;
    }

    board.side_to_move = color.opposite();
    board.zobrist ^= zobrist_keys().side_to_move;
    if let Some(f) = ep_file_to_hash(board) {
        board.zobrist ^= zobrist_keys().ep_file[f as usize];
    }

    #[cfg(debug_assertions)]
    debug_assert_valid_ep(board);

    // Repetition history resets on any irreversible move (capture, pawn
    // push, promotion); positions before that point can never recur.
    let irreversible = capture.is_some() || piece == Piece::Pawn || mv.promotion.is_some();
    undo.prev_history = if irreversible {
        let saved = board.history.clone();
        board.history.clear();
        Some(saved)
    } else {
        None
    };
    board.history.push(start_zobrist);

    #[cfg(all(debug_assertions, feature = "paranoid_hash"))]
    log_hash_mismatch(board);

    #[cfg(debug_assertions)]
    board.assert_hash();

    undo
}

pub fn undo_move_basic(board: &mut Board, undo: Undo) {
    if let Some(f) = ep_file_to_hash(board) {
        board.zobrist ^= zobrist_keys().ep_file[f as usize];
    }

    board.side_to_move = undo.prev_side;
    board.zobrist ^= zobrist_keys().side_to_move;

    let kz = zobrist_keys();
    let cur = board.castling_rights;
    let prev = undo.prev_castling_rights;
    if cur != prev {
        xor_castling_rights_delta(&mut board.zobrist, kz, cur, prev);
    }
    board.castling_rights = prev;

    board.halfmove_clock = undo.prev_halfmove_clock;
    board.fullmove_number = undo.prev_fullmove_number;

    let from_idx = undo.from.index() as usize;
    let to_idx = undo.to.index() as usize;

    if let Some(prom) = undo.promotion {
        remove_piece(board, undo.color, prom, to_idx);
        place_piece(board, undo.color, Piece::Pawn, from_idx);
    } else {
        remove_piece(board, undo.color, undo.piece, to_idx);
        place_piece(board, undo.color, undo.piece, from_idx);
    }

    if let Some((cap_color, cap_piece, cap_sq)) = undo.capture {
        place_piece(board, cap_color, cap_piece, cap_sq.index() as usize);
    }

    if let Some((rook_from, rook_to)) = undo.castling_rook {
        remove_piece(board, undo.color, Piece::Rook, rook_to.index() as usize);
        place_piece(board, undo.color, Piece::Rook, rook_from.index() as usize);
    }

    board.en_passant = undo.prev_en_passant;
    if let Some(f) = ep_file_to_hash(board) {
        board.zobrist ^= kz.ep_file[f as usize];
    }

    #[cfg(debug_assertions)]
    debug_assert_valid_ep(board);

    let _ = board.history.pop();
    if let Some(prev) = undo.prev_history {
        board.history = prev;
    }

    #[cfg(debug_assertions)]
    board.assert_hash();
}

pub fn make_null_move(board: &mut Board) -> NullMoveUndo {
    board.history.push(board.zobrist);
    let undo = NullMoveUndo {
        prev_en_passant: board.en_passant,
        prev_halfmove_clock: board.halfmove_clock,
        prev_side: board.side_to_move,
    };

    if let Some(f) = ep_file_to_hash(board) {
        board.zobrist ^= zobrist_keys().ep_file[f as usize];
    }
    board.en_passant = None;

    let color = board.side_to_move;
    board.side_to_move = color.opposite();
    board.zobrist ^= zobrist_keys().side_to_move;

    // Halfmove clock is left untouched: a null move isn't a real move for
    // fifty-move-rule purposes, and search callers undo it unconditionally
    // before the clock could matter.

    undo
}

pub fn undo_null_move(board: &mut Board, undo: NullMoveUndo) {
    board.side_to_move = undo.prev_side;
    board.zobrist ^= zobrist_keys().side_to_move;

    board.en_passant = undo.prev_en_passant;
    if let Some(f) = ep_file_to_hash(board) {
        board.zobrist ^= zobrist_keys().ep_file[f as usize];
    }

    board.halfmove_clock = undo.prev_halfmove_clock;
    board.history.pop();
}

/// Pseudo-legal moves filtered down to the ones that don't leave the mover's
/// own king in check. `scratch` is caller-owned buffer reused across calls
/// to avoid an allocation per node.
pub fn generate_legal(
    board: &mut Board,
    tables: &MagicTables,
    moves: &mut impl MoveBuffer,
    scratch: &mut impl MoveBuffer,
) {
    scratch.clear();
    generate_pseudo_legal(board, tables, scratch);
    moves.clear();

    for mv in scratch.iter().copied() {
        if mv.is_castling() && !is_legal_castling(board, mv, tables) {
            continue;
        }
        let mover = board.side_to_move;
        let undo = make_move_basic(board, mv);
        let illegal = in_check(board, mover, tables);
        undo_move_basic(board, undo);
        if !illegal {
            moves.push(mv);
        }
    }
}

/// Whether a single pseudo-legal move is legal, i.e. does not leave the
/// mover's own king in check. Castling is checked via [`is_legal_castling`]
/// instead of make/undo, since it also has to verify the king doesn't pass
/// through an attacked square.
#[inline]
pub fn is_legal_move(board: &mut Board, mv: Move, tables: &MagicTables) -> bool {
    if mv.is_castling() {
        return is_legal_castling(board, mv, tables);
    }
    let mover = board.side_to_move;
    let undo = make_move_basic(board, mv);
    let illegal = in_check(board, mover, tables);
    undo_move_basic(board, undo);
    !illegal
}

/// Legal captures and promotions, plus any other legal move that gives
/// check — the "noisy" subset quiescence search wants.
pub fn generate_captures(
    board: &mut Board,
    tables: &MagicTables,
    moves: &mut impl MoveBuffer,
    scratch: &mut impl MoveBuffer,
) {
    scratch.clear();
    generate_pseudo_legal(board, tables, scratch);
    moves.clear();

    for &mv in scratch.iter() {
        if !mv.is_capture() && !mv.is_promotion() {
            continue;
        }

        let mover = board.side_to_move;
        let undo = make_move_basic(board, mv);
        let legal = !in_check(board, mover, tables);
        let gives_check = in_check(board, board.side_to_move, tables);
        undo_move_basic(board, undo);

        if legal && (mv.is_capture() || gives_check) {
            moves.push(mv);
        }
    }
}

#[cfg(all(debug_assertions, feature = "paranoid_hash"))]
fn log_hash_mismatch(board: &Board) {
    let full = board.compute_zobrist_full();
    let diff = board.zobrist ^ full;
    if diff == 0 {
        return;
    }
    eprintln!("HASH DIFF: stored ^ full = 0x{:016x}", diff);

    let kz = zobrist_keys();
    for (f, key) in kz.ep_file.iter().enumerate() {
        if diff == *key {
            eprintln!("looks like an EP-file mismatch: file {}", f);
        }
    }
    if diff == kz.side_to_move {
        eprintln!("side-to-move bit mismatch");
    }
    for cur in 0u8..16 {
        for prev in 0u8..16 {
            let mut z = 0u64;
            xor_castling_rights_delta(&mut z, kz, cur, prev);
            if z == diff {
                eprintln!("castling delta mismatch cur={} prev={}", cur, prev);
            }
        }
    }
}

#[cfg(debug_assertions)]
#[inline]
pub(crate) fn debug_assert_valid_ep(board: &Board) {
    if let Some(ep) = board.en_passant {
        let ep_idx = ep.index() as usize;
        let ep_rank = ep_idx / 8;
        debug_assert!(ep_idx % 8 <= 7, "EP file out of range: {}", ep_idx % 8);

        match board.side_to_move {
            Color::White => debug_assert!(
                ep_rank == 5,
                "EP must be on rank 6 when White is to move, got rank {} at {:?}",
                ep_rank,
                ep
            ),
            Color::Black => debug_assert!(
                ep_rank == 2,
                "EP must be on rank 3 when Black is to move, got rank {} at {:?}",
                ep_rank,
                ep
            ),
        }
    }
}
