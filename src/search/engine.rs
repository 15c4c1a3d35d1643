//! Persistent search state that survives across `go` commands within a game.
//!
//! A fresh [`TranspositionTable`] and [`SearchContext`] per search would throw
//! away every cache hit and history score the moment the previous `go`
//! finished. `Engine` holds both for the lifetime of a game and is only
//! blanked on `ucinewgame` (or an explicit hash resize).

use crate::board::Board;
use crate::moves::magic::MagicTables;
use crate::search::context::SearchContext;
use crate::search::search::{search, SearchLimits, SearchReport};
use crate::search::tt::TranspositionTable;

const DEFAULT_HASH_MB: usize = 512;

pub struct Engine {
    tt: TranspositionTable,
    ctx: SearchContext,
    hash_mb: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_MB)
    }
}

impl Engine {
    pub fn new(hash_mb: usize) -> Self {
        Self {
            tt: TranspositionTable::new(hash_mb),
            ctx: SearchContext::new(),
            hash_mb,
        }
    }

    /// Clears the transposition table, killer table and history table —
    /// invoked on `ucinewgame`.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.ctx = SearchContext::new();
    }

    /// Resizes the transposition table, discarding its contents. Only safe
    /// to call while no search is running.
    pub fn resize_hash(&mut self, hash_mb: usize) {
        self.hash_mb = hash_mb;
        self.tt = TranspositionTable::new(hash_mb);
    }

    pub fn hash_mb(&self) -> usize {
        self.hash_mb
    }

    pub fn hashfull(&self) -> u32 {
        self.tt.hashfull()
    }

    /// Runs a search using this engine's persistent table/history, bumping
    /// the table's search generation first so aging eviction treats stale
    /// entries from prior searches as lower priority.
    pub fn go(&mut self, board: &mut Board, tables: &MagicTables, limits: SearchLimits) -> SearchReport {
        self.tt.new_search();
        search(board, tables, limits, &mut self.tt, &mut self.ctx)
    }
}
