//! # Fork Analysis
//!
//! A fork is a block whose hash is the `prev_hash` of more than one other
//! block. Only blocks present in the chain count as parents, so several
//! genesis blocks claiming `"0"` are not a fork.
//!
//! Branch walks take a child lookup instead of a chain slice so the same
//! code runs against a live store. Every walk is bounded by the block
//! count.

use shared_types::{Block, Lookup};
use std::collections::{HashMap, HashSet};

/// True if some block has two or more children.
pub fn has_fork(chain: &[Block]) -> bool {
    let hashes: HashSet<&str> = chain.iter().map(|b| b.hash.as_str()).collect();
    let mut claims: HashMap<&str, usize> = HashMap::new();
    chain
        .iter()
        .filter(|b| hashes.contains(b.prev_hash.as_str()))
        .any(|b| {
            let count = claims.entry(b.prev_hash.as_str()).or_insert(0);
            *count += 1;
            *count > 1
        })
}

/// The two branches leaving a forked block.
#[derive(Debug, Clone, PartialEq)]
pub struct ForkPoint {
    /// Hash of the block with several children.
    pub parent: String,
    /// Earlier-inserted child.
    pub first: Block,
    /// Later-inserted child.
    pub second: Block,
}

/// Which side of a fork point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// The branch rooted at [`ForkPoint::first`].
    First,
    /// The branch rooted at [`ForkPoint::second`].
    Second,
}

impl ForkPoint {
    /// Root block of `branch`.
    pub fn root(&self, branch: Branch) -> &Block {
        match branch {
            Branch::First => &self.first,
            Branch::Second => &self.second,
        }
    }
}

/// The fork nearest the chain tip: scanning blocks from last inserted to
/// first, the first block with two or more children. Only its first two
/// children in chain order are returned; any further children are left
/// for a later pass.
pub fn find_fork_point(chain: &[Block]) -> Option<ForkPoint> {
    chain.iter().rev().find_map(|parent| {
        let mut children = chain.iter().filter(|b| b.prev_hash == parent.hash);
        match (children.next(), children.next()) {
            (Some(first), Some(second)) => Some(ForkPoint {
                parent: parent.hash.clone(),
                first: first.clone(),
                second: second.clone(),
            }),
            _ => None,
        }
    })
}

/// Walk both branches of `point` in lock-step and return the one that
/// ends first. The second branch is checked first, so branches of equal
/// length report [`Branch::Second`] as short.
pub fn short_branch<E, F>(point: &ForkPoint, bound: usize, mut child_of: F) -> Result<Branch, E>
where
    F: FnMut(&str) -> Result<Lookup<Block>, E>,
{
    let mut first = point.first.hash.clone();
    let mut second = point.second.hash.clone();

    for _ in 0..bound.max(1) {
        let first_child = child_of(&first)?;
        let second_child = child_of(&second)?;
        match (first_child, second_child) {
            (_, Lookup::NotFound) => return Ok(Branch::Second),
            (Lookup::NotFound, _) => return Ok(Branch::First),
            (Lookup::Found(a), Lookup::Found(b)) => {
                first = a.hash;
                second = b.hash;
            }
        }
    }
    Ok(Branch::Second)
}

/// `root` followed by each successive child, at most `bound` blocks.
pub fn collect_tail<E, F>(root: Block, bound: usize, mut child_of: F) -> Result<Vec<Block>, E>
where
    F: FnMut(&str) -> Result<Lookup<Block>, E>,
{
    let mut tail = vec![root];
    while tail.len() < bound {
        let Some(last) = tail.last() else { break };
        match child_of(&last.hash)? {
            Lookup::Found(child) => tail.push(child),
            Lookup::NotFound => break,
        }
    }
    Ok(tail)
}
