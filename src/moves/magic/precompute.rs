//! Generates magic bitboard tables by probing random sparse multipliers.
//!
//! For each square, the relevant occupancy mask excludes the board edge (a
//! blocker sitting on the last square of a ray never changes the attack set
//! beyond it), then every subset of that mask is enumerated via the
//! carry-rippler trick and a candidate magic is probed until one produces a
//! collision-free index for every subset.

use crate::moves::magic::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use crate::moves::magic::search::find_magic_number_for_square;
use crate::moves::magic::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::{RngCore, SeedableRng, rngs::StdRng};

const FILE_A: u64 = 0x0101_0101_0101_0101;
const FILE_H: u64 = 0x8080_8080_8080_8080;
const RANK_1: u64 = 0x0000_0000_0000_00FF;
const RANK_8: u64 = 0xFF00_0000_0000_0000;
const EDGES: u64 = FILE_A | FILE_H | RANK_1 | RANK_8;

pub enum MagicTableSeed {
    Fixed(u64),
    Random,
}

fn rook_mask(square: usize) -> u64 {
    rook_attacks_per_square(square, 0) & !edge_mask_for(square)
}

fn bishop_mask(square: usize) -> u64 {
    bishop_attacks_per_square(square, 0) & !EDGES
}

/// Rook masks exclude the edge square at the far end of each ray, but only the
/// edges that aren't the square's own rank/file (a rook on a1 still needs h1
/// excluded from the file mask, not the rank it sits on).
fn edge_mask_for(square: usize) -> u64 {
    let rank = square / 8;
    let file = square % 8;
    let mut mask = 0u64;
    if rank != 0 {
        mask |= RANK_1;
    }
    if rank != 7 {
        mask |= RANK_8;
    }
    if file != 0 {
        mask |= FILE_A;
    }
    if file != 7 {
        mask |= FILE_H;
    }
    mask
}

fn subsets_of(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1 << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

fn build_entry<R: RngCore>(
    square: usize,
    mask: u64,
    attack_fn: fn(usize, u64) -> u64,
    rng: &mut R,
) -> Result<MagicEntry, String> {
    let shift = 64 - mask.count_ones();
    let blockers = subsets_of(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| attack_fn(square, b)).collect();

    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)?;

    let mut table = vec![0u64; 1usize << mask.count_ones()];
    for (&b, &a) in blockers.iter().zip(attacks.iter()) {
        let index = (b.wrapping_mul(magic) >> shift) as usize;
        table[index] = a;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    })
}

pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, String> {
    let mut rng = match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(s),
        MagicTableSeed::Random => {
            let mut bytes = [0u8; 32];
            rand::rng().fill_bytes(&mut bytes);
            StdRng::from_seed(bytes)
        }
    };

    let mut rook_entries = Vec::with_capacity(64);
    let mut bishop_entries = Vec::with_capacity(64);

    for square in 0..64usize {
        rook_entries.push(build_entry(
            square,
            rook_mask(square),
            rook_attacks_per_square,
            &mut rng,
        )?);
        bishop_entries.push(build_entry(
            square,
            bishop_mask(square),
            bishop_attacks_per_square,
            &mut rng,
        )?);
    }

    Ok(MagicTables {
        rook: RookMagicTables {
            entries: rook_entries,
        },
        bishop: BishopMagicTables {
            entries: bishop_entries,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_rook_table_matches_scan_for_every_blocker_subset() {
        let tables = generate_magic_tables(MagicTableSeed::Fixed(1)).unwrap();
        let square = 27; // d4
        let mask = rook_mask(square);
        for blockers in subsets_of(mask) {
            let expected = rook_attacks_per_square(square, blockers);
            assert_eq!(tables.rook.get_attacks(square, blockers), expected);
        }
    }

    #[test]
    fn generated_bishop_table_matches_scan_for_every_blocker_subset() {
        let tables = generate_magic_tables(MagicTableSeed::Fixed(1)).unwrap();
        let square = 27; // d4
        let mask = bishop_mask(square);
        for blockers in subsets_of(mask) {
            let expected = bishop_attacks_per_square(square, blockers);
            assert_eq!(tables.bishop.get_attacks(square, blockers), expected);
        }
    }
}
