//! # Reports
//!
//! Every sync operation ends in a report. Reports render to the text the
//! HTTP surface returns; [`SyncOutcome`] adds the `OK:`/`NG:` prefix.

use shared_types::PeerInfo;
use std::fmt;

use super::value_objects::Participant;

// =============================================================================
// TAMPER AUDIT
// =============================================================================

/// Verdict for one examined block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Stored hash matches the recomputed hash.
    Clean,
    /// Tampered, replaced with the majority's copy.
    Repaired,
    /// Tampered, left as is.
    Unrepairable(String),
}

/// One block's audit result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAudit {
    /// Stored hash of the block.
    pub hash: String,
    /// Verdict.
    pub outcome: AuditOutcome,
}

/// Result of auditing the whole chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// One entry per block, in chain order.
    pub blocks: Vec<BlockAudit>,
}

impl AuditReport {
    /// Blocks whose hash did not verify.
    pub fn tampered(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.outcome != AuditOutcome::Clean)
            .count()
    }

    /// Blocks replaced from the majority.
    pub fn repaired(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.outcome == AuditOutcome::Repaired)
            .count()
    }

    /// Tampered blocks that could not be repaired.
    pub fn unrepairable(&self) -> impl Iterator<Item = &BlockAudit> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.outcome, AuditOutcome::Unrepairable(_)))
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tampered() == 0 {
            return f.write_str("tamper audit: clean");
        }
        write!(
            f,
            "tamper audit: {} tampered, {} repaired",
            self.tampered(),
            self.repaired()
        )?;
        for block in &self.blocks {
            match &block.outcome {
                AuditOutcome::Clean => {}
                AuditOutcome::Repaired => write!(f, "\n{}: repaired", block.hash)?,
                AuditOutcome::Unrepairable(reason) => {
                    write!(f, "\n{}: unrepairable ({})", block.hash, reason)?
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// FORK RESOLUTION
// =============================================================================

/// A block deleted while pruning a short branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedBlock {
    /// Hash of the deleted block.
    pub hash: String,
    /// Its parent.
    pub prev_hash: String,
    /// Entries the block carried.
    pub entries: usize,
    /// Entries returned to the pool.
    pub requeued: usize,
}

impl fmt::Display for PrunedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (prev {}, {} entries, {} requeued)",
            self.hash, self.prev_hash, self.entries, self.requeued
        )
    }
}

/// Result of resolving every fork.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForkReport {
    /// Blocks deleted, in deletion order.
    pub pruned: Vec<PrunedBlock>,
    /// Set when a deletion could not be confirmed by any peer.
    pub failure: Option<String>,
}

impl ForkReport {
    /// True unless the pass was aborted.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

impl fmt::Display for ForkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pruned.is_empty() {
            match &self.failure {
                None => f.write_str("no fork"),
                Some(reason) => write!(f, "fork resolution aborted: {reason}"),
            }
        } else {
            let pruned: Vec<String> = self.pruned.iter().map(|p| p.to_string()).collect();
            write!(f, "pruned {}: {}", self.pruned.len(), pruned.join(", "))?;
            if let Some(reason) = &self.failure {
                write!(f, "; aborted: {reason}")?;
            }
            Ok(())
        }
    }
}

// =============================================================================
// POOL AND CHAIN DIFFS
// =============================================================================

/// Result of copying a delivered-pool snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSyncReport {
    /// Peer whose snapshot was applied.
    pub source: PeerInfo,
    /// Local delivered entries dropped before applying.
    pub purged: usize,
    /// Entries inserted from the snapshot.
    pub copied: usize,
}

impl fmt::Display for PoolSyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.copied == 0 {
            write!(f, "pool: no diff with {}", self.source)
        } else {
            write!(f, "pool: {} copied from {}", self.copied, self.source)
        }
    }
}

/// Result of reconciling the chain against the majority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDiffReport {
    /// Participant the chain was reconciled against.
    pub source: Participant,
    /// Hashes fetched and inserted.
    pub added: Vec<String>,
    /// Local-only hashes deleted.
    pub removed: Vec<String>,
    /// Hashes the source listed but would not serve.
    pub failed: Vec<String>,
}

impl BlockDiffReport {
    /// Report for a node already in the majority.
    pub fn in_majority() -> Self {
        Self {
            source: Participant::Local,
            added: Vec::new(),
            removed: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl fmt::Display for BlockDiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_local() {
            return f.write_str("block diff: local chain holds the majority view, no diff");
        }
        write!(
            f,
            "block diff with {}: {} added, {} removed",
            self.source,
            self.added.len(),
            self.removed.len()
        )?;
        if !self.failed.is_empty() {
            write!(f, ", {} not fetched", self.failed.len())?;
        }
        Ok(())
    }
}

// =============================================================================
// OPERATION OUTCOME
// =============================================================================

/// Text result of a sync operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Completed; detail describes what changed.
    Ok(String),
    /// Could not complete; detail says why.
    Ng(String),
}

impl SyncOutcome {
    /// Success with `detail`.
    pub fn ok(detail: impl fmt::Display) -> Self {
        SyncOutcome::Ok(detail.to_string())
    }

    /// Failure with `detail`.
    pub fn ng(detail: impl fmt::Display) -> Self {
        SyncOutcome::Ng(detail.to_string())
    }

    /// True for `Ok`.
    pub fn is_ok(&self) -> bool {
        matches!(self, SyncOutcome::Ok(_))
    }

    /// Detail without the prefix.
    pub fn detail(&self) -> &str {
        match self {
            SyncOutcome::Ok(detail) | SyncOutcome::Ng(detail) => detail,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        if self.is_ok() {
            "ok"
        } else {
            "ng"
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Ok(detail) => write!(f, "OK:{detail}"),
            SyncOutcome::Ng(detail) => write!(f, "NG:{detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audit(hash: &str, outcome: AuditOutcome) -> BlockAudit {
        BlockAudit {
            hash: hash.into(),
            outcome,
        }
    }

    #[test]
    fn test_audit_report_counts() {
        let report = AuditReport {
            blocks: vec![
                audit("a", AuditOutcome::Clean),
                audit("b", AuditOutcome::Repaired),
                audit("c", AuditOutcome::Unrepairable("no majority".into())),
            ],
        };
        assert_eq!(report.tampered(), 2);
        assert_eq!(report.repaired(), 1);
        assert_eq!(report.unrepairable().count(), 1);

        let text = report.to_string();
        assert!(text.starts_with("tamper audit: 2 tampered, 1 repaired"));
        assert!(text.contains("c: unrepairable (no majority)"));
        assert!(!text.contains("a:"));
    }

    #[test]
    fn test_clean_audit_text() {
        let report = AuditReport {
            blocks: vec![audit("a", AuditOutcome::Clean)],
        };
        assert_eq!(report.to_string(), "tamper audit: clean");
    }

    #[test]
    fn test_fork_report_text() {
        assert_eq!(ForkReport::default().to_string(), "no fork");

        let report = ForkReport {
            pruned: vec![PrunedBlock {
                hash: "h2".into(),
                prev_hash: "h1".into(),
                entries: 2,
                requeued: 1,
            }],
            failure: Some("no peer could delete h3".into()),
        };
        let text = report.to_string();
        assert!(text.starts_with("pruned 1: h2 (prev h1, 2 entries, 1 requeued)"));
        assert!(text.ends_with("aborted: no peer could delete h3"));
        assert!(!report.is_complete());
    }

    #[test]
    fn test_outcome_prefixes() {
        assert_eq!(SyncOutcome::ok("no fork").to_string(), "OK:no fork");
        assert_eq!(SyncOutcome::ng("no majority").to_string(), "NG:no majority");
        assert_eq!(SyncOutcome::ng("x").label(), "ng");
    }

    #[test]
    fn test_block_diff_in_majority_text() {
        assert!(BlockDiffReport::in_majority().to_string().contains("no diff"));
    }
}
