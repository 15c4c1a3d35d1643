//! Move-count enumeration (`perft`) for validating the move generator:
//! plain node counts, a `divide` breakdown by root move, and a breakdown
//! by move category (captures, en passant, castles, promotions, checks).

use crate::board::Board;
use crate::moves::{
    execute::{generate_legal, make_move_basic, undo_move_basic},
    magic::MagicTables,
    square_control::in_check,
    types::Move,
};
use tracing::{debug, instrument};

const MAX_LOG_DEPTH: u32 = 3;
const MAX_PERFT_DEPTH: usize = 20;

fn check_depth(depth: u32) {
    assert!(
        depth as usize <= MAX_PERFT_DEPTH,
        "depth {depth} exceeds MAX_PERFT_DEPTH {MAX_PERFT_DEPTH}"
    );
}

#[derive(Default)]
pub struct PerftCounters {
    pub nodes: u64,
    pub captures: u64,
    pub ep_captures: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

impl PerftCounters {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn add(&mut self, other: &PerftCounters) {
        self.nodes += other.nodes;
        self.captures += other.captures;
        self.ep_captures += other.ep_captures;
        self.castles += other.castles;
        self.promotions += other.promotions;
        self.checks += other.checks;
        self.checkmates += other.checkmates;
    }

    fn tag_move(&mut self, mv: Move) {
        if mv.is_capture() {
            self.captures += 1;
            if mv.is_en_passant() {
                self.ep_captures += 1;
            }
        }
        if mv.is_castling() {
            self.castles += 1;
        }
        if mv.promotion.is_some() {
            self.promotions += 1;
        }
    }
}

/// Per-ply scratch buffers, allocated once and reused across the whole
/// recursive walk instead of once per node.
struct PerftBuffers {
    legal: [Vec<Move>; MAX_PERFT_DEPTH],
    pseudo: [Vec<Move>; MAX_PERFT_DEPTH],
}

impl PerftBuffers {
    fn new() -> Self {
        Self {
            legal: std::array::from_fn(|_| Vec::with_capacity(64)),
            pseudo: std::array::from_fn(|_| Vec::with_capacity(256)),
        }
    }

    fn legal_moves_at(&mut self, board: &mut Board, tables: &MagicTables, ply: usize) -> usize {
        let moves = &mut self.legal[ply];
        let pseudo = &mut self.pseudo[ply];
        moves.clear();
        generate_legal(board, tables, moves, pseudo);
        moves.len()
    }
}

#[inline]
fn square_name(idx: u8, white_origin: bool) -> String {
    let file = idx % 8;
    let rank = if white_origin { idx / 8 } else { 7 - idx / 8 };
    let f = (b'a' + file) as char;
    let r = (b'1' + rank) as char;
    format!("{f}{r}")
}

fn perft_recursive(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    ply: usize,
    buffers: &mut PerftBuffers,
) -> u64 {
    if depth == 0 {
        return 1;
    }

    let move_count = buffers.legal_moves_at(board, tables, ply);
    let mut node_count = 0;

    for i in 0..move_count {
        let mv = buffers.legal[ply][i];
        let undo = make_move_basic(board, mv);
        node_count += perft_recursive(board, tables, depth - 1, ply + 1, buffers);
        undo_move_basic(board, undo);
    }

    node_count
}

#[instrument(skip(board, tables), fields(depth))]
pub fn perft(board: &mut Board, tables: &MagicTables, depth: u32) -> u64 {
    check_depth(depth);
    perft_recursive(board, tables, depth, 0, &mut PerftBuffers::new())
}

#[instrument(skip(board, tables), fields(depth))]
pub fn perft_divide(board: &mut Board, tables: &MagicTables, depth: u32) -> u64 {
    check_depth(depth);

    let mut buffers = PerftBuffers::new();
    let move_count = buffers.legal_moves_at(board, tables, 0);
    if depth <= MAX_LOG_DEPTH {
        debug!(depth, moves = move_count, "divide: root legal moves");
    }

    let mut total = 0;

    for i in 0..move_count {
        let mv = buffers.legal[0][i];

        if depth <= MAX_LOG_DEPTH {
            let from = mv.from.index();
            let to = mv.to.index();
            debug!(
                %mv, depth,
                from_idx = from, to_idx = to,
                from_a1 = %square_name(from, true), to_a1 = %square_name(to, true),
                from_a8 = %square_name(from, false), to_a8 = %square_name(to, false),
                "divide: exploring root move (decode check)"
            );
        }

        let undo = make_move_basic(board, mv);
        let count = if depth == 1 {
            1
        } else {
            perft_recursive(board, tables, depth - 1, 1, &mut buffers)
        };
        undo_move_basic(board, undo);

        if depth <= MAX_LOG_DEPTH {
            debug!(%mv, nodes = count, "divide: root child total");
        }

        println!("{mv}: {count}");
        total += count;
    }

    debug!(depth, total, "divide: total");
    println!("Total: {total}");
    total
}

fn perft_count_recursive(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    ply: usize,
    out: &mut PerftCounters,
    buffers: &mut PerftBuffers,
) {
    if depth == 0 {
        out.nodes += 1;

        let side_in_check = in_check(board, board.side_to_move, tables);
        if side_in_check {
            out.checks += 1;
        }

        let move_count = buffers.legal_moves_at(board, tables, ply);
        if move_count == 0 && side_in_check {
            out.checkmates += 1;
        }
        return;
    }

    let move_count = buffers.legal_moves_at(board, tables, ply);

    for i in 0..move_count {
        let mv = buffers.legal[ply][i];
        out.tag_move(mv);

        #[cfg(debug_assertions)]
        let hash_before = board.zobrist;

        let undo = make_move_basic(board, mv);
        perft_count_recursive(board, tables, depth - 1, ply + 1, out, buffers);
        undo_move_basic(board, undo);

        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(board.zobrist, hash_before, "zobrist changed across make/undo");
            debug_assert_eq!(
                board.compute_zobrist_full(),
                board.zobrist,
                "full recompute mismatch"
            );
        }
    }
}

pub fn perft_count_with_breakdown(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    out: &mut PerftCounters,
) {
    check_depth(depth);
    perft_count_recursive(board, tables, depth, 0, out, &mut PerftBuffers::new());
}

pub fn perft_divide_with_breakdown(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
) -> Vec<(Move, PerftCounters)> {
    check_depth(depth);

    let mut buffers = PerftBuffers::new();
    let move_count = buffers.legal_moves_at(board, tables, 0);
    let mut out = Vec::with_capacity(move_count);

    for i in 0..move_count {
        let mv = buffers.legal[0][i];
        let undo = make_move_basic(board, mv);
        let mut counters = PerftCounters::zero();

        if depth > 1 {
            perft_count_recursive(board, tables, depth - 1, 1, &mut counters, &mut buffers);
        } else {
            counters.nodes = 1;
        }

        undo_move_basic(board, undo);
        out.push((mv, counters));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_name_matches_both_origin_conventions() {
        assert_eq!(square_name(0, true), "a1");
        assert_eq!(square_name(63, true), "h8");
        assert_eq!(square_name(0, false), "a8");
        assert_eq!(square_name(63, false), "h1");
    }

    #[test]
    fn counters_add_accumulates_every_field() {
        let mut total = PerftCounters::zero();
        let delta = PerftCounters {
            nodes: 1,
            captures: 2,
            ep_captures: 0,
            castles: 1,
            promotions: 0,
            checks: 3,
            checkmates: 0,
        };
        total.add(&delta);
        total.add(&delta);
        assert_eq!(total.nodes, 2);
        assert_eq!(total.captures, 4);
        assert_eq!(total.castles, 2);
        assert_eq!(total.checks, 6);
    }
}
