//! # Domain Invariants
//!
//! Rules the sync engine checks rather than assumes.

use shared_types::{Block, Entry};
use std::collections::HashSet;

/// Invariant: a resolution needs answers from more than half of the
/// participants asked.
pub fn invariant_quorum(responded: usize, total: usize) -> bool {
    responded > total / 2
}

/// Invariant: a committed entry is never also pending.
///
/// Returns the ids found in both a non-genesis block and the pool. A
/// non-empty result means some write path forgot to clear the pool.
pub fn invariant_committed_not_pending(chain: &[Block], pool: &[Entry]) -> Vec<String> {
    let pending: HashSet<&str> = pool.iter().map(|e| e.id.as_str()).collect();
    chain
        .iter()
        .filter(|b| !b.is_genesis())
        .flat_map(|b| b.entry_ids())
        .filter(|id| pending.contains(id))
        .map(str::to_string)
        .collect()
}
