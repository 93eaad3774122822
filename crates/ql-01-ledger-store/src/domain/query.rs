//! # Lookup Rules
//!
//! Pure queries over chain and pool contents.
//!
//! An entry referenced as `original_id` by a `modify`/`delete` entry in
//! either container is superseded and never returned by key lookups.

use serde_json::Value;
use shared_types::{Block, Entry, EntryKind};
use std::collections::HashSet;

/// Every entry in the chain followed by every entry in the pool.
fn all_entries<'a>(chain: &'a [Block], pool: &'a [Entry]) -> impl Iterator<Item = &'a Entry> {
    chain.iter().flat_map(|b| b.data.iter()).chain(pool.iter())
}

/// Ids superseded by a `modify`/`delete` entry anywhere in the ledger.
pub fn superseded_ids(chain: &[Block], pool: &[Entry]) -> HashSet<String> {
    all_entries(chain, pool)
        .filter_map(|e| e.supersedes().map(str::to_string))
        .collect()
}

/// `new`/`modify` entries whose field at `path` equals `value`,
/// excluding superseded ones. Chain matches come first.
pub fn find_entries(chain: &[Block], pool: &[Entry], path: &str, value: &Value) -> Vec<Entry> {
    let superseded = superseded_ids(chain, pool);
    all_entries(chain, pool)
        .filter(|e| matches!(e.kind, EntryKind::New | EntryKind::Modify))
        .filter(|e| !superseded.contains(&e.id))
        .filter(|e| e.field(path) == Some(value))
        .cloned()
        .collect()
}
