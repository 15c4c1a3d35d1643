//! Optional Elo-limited play: throttles search speed and occasionally
//! substitutes an inferior root move, so the engine can be asked to play
//! at a target strength rather than its full playing strength.
//!
//! Disabled by default; enabled via the `UCI_LimitStrength`/`UCI_Elo`
//! setoption pair.

use rand::{rngs::StdRng, Rng, SeedableRng};

const MIN_ELO: u16 = 600;
const MAX_ELO: u16 = 2400;

/// `constant + scale * (x / 9)^power`, the shape used for every Elo-derived
/// curve here (nodes/sec budget, move error, blunder error, blunder rate).
fn non_linear_bonus(x: f64, scale: f64, power: f64, constant: f64) -> f64 {
    constant + scale * (x / 9.0).powf(power)
}

#[derive(Clone, Copy, Debug)]
pub struct Strength {
    elo: u16,
    rng_seed: u64,
}

impl Strength {
    pub fn new(elo: u16, rng_seed: u64) -> Self {
        Self {
            elo: elo.clamp(MIN_ELO, MAX_ELO),
            rng_seed,
        }
    }

    fn normalized(&self) -> f64 {
        (self.elo - MIN_ELO) as f64 / 200.0
    }

    /// Busy-wait throttle budget: searches slower at lower Elo.
    pub fn nodes_per_second(&self) -> u64 {
        non_linear_bonus(self.normalized(), 512.0, 4.0, 100.0) as u64
    }

    fn move_error(&self) -> i32 {
        non_linear_bonus(9.0 - self.normalized(), 150.0, 2.0, 10.0) as i32
    }

    fn blunder_error(&self) -> i32 {
        non_linear_bonus(9.0 - self.normalized(), 400.0, 2.0, 50.0) as i32
    }

    fn blunder_per_128(&self) -> u32 {
        non_linear_bonus(9.0 - self.normalized(), 40.0, 2.0, 2.0) as u32
    }

    /// Picks a root move to actually play, possibly substituting the
    /// engine's true best move with a weaker one. `root_moves` must be
    /// sorted best-score-first; `root_moves[0]` is the engine's real choice.
    pub fn choose_move<T: Copy>(&self, root_moves: &[(T, i32)]) -> Option<T> {
        if root_moves.is_empty() {
            return None;
        }
        let best_score = root_moves[0].1;
        let mut rng = StdRng::seed_from_u64(self.rng_seed);
        let blunder_roll: u32 = rng.random_range(0..128);
        let error = if blunder_roll < self.blunder_per_128() {
            self.blunder_error()
        } else {
            self.move_error()
        };
        let candidates: Vec<T> = root_moves
            .iter()
            .filter(|(_, score)| best_score - score <= error)
            .map(|(mv, _)| *mv)
            .collect();
        let idx = rng.random_range(0..candidates.len());
        Some(candidates[idx])
    }
}
