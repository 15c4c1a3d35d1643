//! Produces the process-wide magic bitboard tables, generating them once and
//! caching the result for the remainder of the run.

use crate::moves::magic::precompute::{MagicTableSeed, generate_magic_tables};
use crate::moves::magic::structs::MagicTables;
use once_cell::sync::OnceCell;

#[cfg(feature = "deterministic_magic")]
const MAGIC_SEED: u64 = 0xC0FF_EE15_BAD5_EED;

fn build_tables() -> MagicTables {
    #[cfg(feature = "deterministic_magic")]
    let seed = MagicTableSeed::Fixed(MAGIC_SEED);
    #[cfg(not(feature = "deterministic_magic"))]
    let seed = MagicTableSeed::Random;

    generate_magic_tables(seed).expect("magic number search exhausted its attempt budget")
}

/// Returns the shared magic bitboard tables, generating them on first call.
/// Cloning only copies `Box<[u64]>` table contents once at startup; callers
/// are expected to hold the result for the lifetime of the engine.
pub fn load_magic_tables() -> MagicTables {
    static TABLES: OnceCell<MagicTables> = OnceCell::new();
    TABLES.get_or_init(build_tables).clone()
}
