//! Zobrist hashing: one XOR-independent random key per (piece, square),
//! per side to move, per castling right, and per en passant file.

use crate::board::castle_bits::*;
use crate::board::{Board, Color, Piece};
use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

const FILE_A: u64 = 0x0101_0101_0101_0101;
const FILE_H: u64 = 0x8080_8080_8080_8080;

// Indices into `ZobristKeys::castling`, in castling-character order (K, Q, k, q).
const CASTLE_IDX_WK: usize = 0;
const CASTLE_IDX_WQ: usize = 1;
const CASTLE_IDX_BK: usize = 2;
const CASTLE_IDX_BQ: usize = 3;

#[cfg(feature = "deterministic_zobrist")]
const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

fn make_zobrist_rng() -> StdRng {
    #[cfg(feature = "deterministic_zobrist")]
    {
        StdRng::seed_from_u64(ZOBRIST_SEED)
    }
    #[cfg(not(feature = "deterministic_zobrist"))]
    {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        StdRng::from_seed(seed)
    }
}

pub struct ZobristKeys {
    /// `[color][piece][square]`, `Color` as index, `Piece` as index 0..6.
    pub piece: [[[u64; 64]; 6]; 2],
    pub side_to_move: u64,
    /// Indexed by `CASTLE_IDX_*` above (K, Q, k, q).
    pub castling: [u64; 4],
    /// File a..h as 0..7.
    pub ep_file: [u64; 8],
}

/// XORs `hash` for every castling right that differs between `old` and `new_`.
#[inline]
pub fn xor_castling_rights_delta(hash: &mut u64, keys: &ZobristKeys, old: u8, new_: u8) {
    let changed = old ^ new_;
    if changed & CASTLE_WK != 0 {
        *hash ^= keys.castling[CASTLE_IDX_WK];
    }
    if changed & CASTLE_WQ != 0 {
        *hash ^= keys.castling[CASTLE_IDX_WQ];
    }
    if changed & CASTLE_BK != 0 {
        *hash ^= keys.castling[CASTLE_IDX_BK];
    }
    if changed & CASTLE_BQ != 0 {
        *hash ^= keys.castling[CASTLE_IDX_BQ];
    }
}

/// The en passant file to fold into the hash this ply, or `None` if the
/// side to move has no pseudo-legal pawn capture onto the EP square — an
/// EP square with no possible capturer must hash identically to "no EP",
/// or two positions that only differ in an unreachable EP square would get
/// different keys despite being the same position for search purposes.
pub fn ep_file_to_hash(board: &Board) -> Option<u8> {
    let ep = board.en_passant?;
    let sq = ep.index();

    let rank = sq / 8;
    if rank != 2 && rank != 5 {
        return None;
    }

    let ep_bb: u64 = 1u64 << sq;
    let has_capturing_pawn = match board.side_to_move {
        Color::White => {
            let from_ne = (ep_bb >> 9) & !FILE_H;
            let from_nw = (ep_bb >> 7) & !FILE_A;
            ((from_ne | from_nw) & board.bb(Color::White, Piece::Pawn)) != 0
        }
        Color::Black => {
            let from_se = (ep_bb << 7) & !FILE_A;
            let from_sw = (ep_bb << 9) & !FILE_H;
            ((from_se | from_sw) & board.bb(Color::Black, Piece::Pawn)) != 0
        }
    };

    has_capturing_pawn.then_some(sq % 8)
}

/// Process-wide random key table, generated once on first use.
pub fn zobrist_keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(|| generate_zobrist_keys_with_rng(make_zobrist_rng()))
}

fn generate_zobrist_keys_with_rng(mut rng: StdRng) -> ZobristKeys {
    #[inline]
    fn non_zero(rng: &mut StdRng) -> u64 {
        loop {
            let v = rng.next_u64();
            if v != 0 {
                return v;
            }
        }
    }

    let mut keys = ZobristKeys {
        piece: [[[0u64; 64]; 6]; 2],
        side_to_move: 0,
        castling: [0u64; 4],
        ep_file: [0u64; 8],
    };

    for color in keys.piece.iter_mut() {
        for piece in color.iter_mut() {
            for key in piece.iter_mut() {
                *key = non_zero(&mut rng);
            }
        }
    }
    for key in keys.castling.iter_mut() {
        *key = non_zero(&mut rng);
    }
    for key in keys.ep_file.iter_mut() {
        *key = non_zero(&mut rng);
    }
    keys.side_to_move = non_zero(&mut rng);

    keys
}
