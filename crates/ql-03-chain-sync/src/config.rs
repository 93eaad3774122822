//! # Chain Sync Configuration

use shared_types::PeerInfo;

/// Static peer set and identity of this node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// Configured peers, excluding this node. Order matters: pool diffs
    /// use the first peer that answers.
    pub peers: Vec<PeerInfo>,

    /// Name this node uses for itself in logs.
    pub local_label: String,
}

impl SyncConfig {
    /// Config for the given peer list.
    pub fn new(peers: Vec<PeerInfo>) -> Self {
        Self {
            peers,
            local_label: "local".to_string(),
        }
    }

    /// Builder: set the local label.
    pub fn with_local_label(mut self, label: impl Into<String>) -> Self {
        self.local_label = label.into();
        self
    }

    /// Three loopback peers on consecutive ports.
    pub fn for_testing() -> Self {
        Self::new(
            (0..3)
                .map(|i| PeerInfo::new("127.0.0.1", 18_081 + i))
                .collect(),
        )
    }
}
