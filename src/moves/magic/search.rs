//! Randomized search for sliding-piece magic multipliers.

use rand::RngCore;
use std::collections::HashMap;

const MAGIC_SEARCH_ATTEMPTS: u32 = 1_000_000;

/// A 64-bit candidate with few set bits: AND-ing three random draws together
/// sparsifies the result, and sparse magics collide less often when
/// multiplied against an occupancy mask.
#[inline(always)]
pub fn random_sparse_u64<R: RngCore>(rng: &mut R) -> u64 {
    rng.next_u64() & rng.next_u64() & rng.next_u64()
}

/// True if `magic` maps every `(blocker, attack)` pair to a consistent
/// index: two different blocker patterns are allowed to collide only if
/// they produce the same attack set.
pub fn is_magic_candidate_valid(blockers: &[u64], attacks: &[u64], magic: u64, shift: u32) -> bool {
    let mut seen: HashMap<u64, u64> = HashMap::with_capacity(blockers.len());

    for (&blocker, &attack) in blockers.iter().zip(attacks) {
        let index = blocker.wrapping_mul(magic) >> shift;
        match seen.entry(index) {
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(attack);
            }
            std::collections::hash_map::Entry::Occupied(e) => {
                if *e.get() != attack {
                    return false;
                }
            }
        }
    }

    true
}

/// Searches for a magic multiplier that is collision-free over every
/// `(blockers[i], attacks[i])` pair, trying up to [`MAGIC_SEARCH_ATTEMPTS`]
/// random sparse candidates before giving up.
pub fn find_magic_number_for_square<R: RngCore>(
    blockers: &[u64],
    attacks: &[u64],
    shift: u32,
    rng: &mut R,
) -> Result<u64, String> {
    for _ in 0..MAGIC_SEARCH_ATTEMPTS {
        let magic = random_sparse_u64(rng);
        if is_magic_candidate_valid(blockers, attacks, magic, shift) {
            return Ok(magic);
        }
    }
    Err(format!(
        "failed to find a valid magic number after {MAGIC_SEARCH_ATTEMPTS} attempts"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn identical_attacks_never_fail_on_collision() {
        let blockers = [0x1u64, 0x2, 0x1]; // index 0 and 2 collide under magic=1, shift=0
        let attacks = [0xffu64, 0x00, 0xff]; // same attack for the colliding blocker
        assert!(is_magic_candidate_valid(&blockers, &attacks, 1, 0));
    }

    #[test]
    fn conflicting_attacks_at_same_index_fail() {
        let blockers = [0x1u64, 0x1];
        let attacks = [0xffu64, 0x00];
        assert!(!is_magic_candidate_valid(&blockers, &attacks, 1, 0));
    }

    #[test]
    fn search_finds_a_magic_for_a_trivial_table() {
        let blockers = [0u64, 1, 2, 3];
        let attacks = [10u64, 20, 30, 40];
        let mut rng = StdRng::seed_from_u64(7);
        assert!(find_magic_number_for_square(&blockers, &attacks, 60, &mut rng).is_ok());
    }
}
