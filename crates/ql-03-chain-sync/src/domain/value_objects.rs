//! # Value Objects
//!
//! What the majority resolver is asked and what it answers.

use serde_json::Value;
use shared_types::{PeerInfo, RpcMethod, RpcRequest};
use std::fmt;
use thiserror::Error;

/// A voter in a majority resolution: this node or one configured peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Participant {
    /// This node, answered in-process.
    Local,
    /// A configured peer.
    Remote(PeerInfo),
}

impl Participant {
    /// The peer, if remote.
    pub fn peer(&self) -> Option<&PeerInfo> {
        match self {
            Participant::Local => None,
            Participant::Remote(peer) => Some(peer),
        }
    }

    /// True for this node.
    pub fn is_local(&self) -> bool {
        matches!(self, Participant::Local)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Participant::Local => f.write_str("local"),
            Participant::Remote(peer) => write!(f, "{peer}"),
        }
    }
}

/// What to ask every participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// A parameterless snapshot method such as `copyBlock`. This node
    /// votes too.
    Snapshot(RpcMethod),
    /// Whether a block with `hash` exists, asked of peers only.
    BlockByHash {
        /// Block hash to look up
        hash: String,
        /// Method to call, normally `checkBlockByHash`
        method: RpcMethod,
    },
}

impl Probe {
    /// Snapshot probe for `method`.
    pub fn snapshot(method: RpcMethod) -> Self {
        Probe::Snapshot(method)
    }

    /// `checkBlockByHash` probe.
    pub fn block_by_hash(hash: impl Into<String>) -> Self {
        Probe::BlockByHash {
            hash: hash.into(),
            method: RpcMethod::CheckBlockByHash,
        }
    }

    /// Method being probed.
    pub fn method(&self) -> RpcMethod {
        match self {
            Probe::Snapshot(method) | Probe::BlockByHash { method, .. } => *method,
        }
    }

    /// Request sent to each participant.
    pub fn request(&self) -> RpcRequest {
        match self {
            Probe::Snapshot(method) => RpcRequest::new(*method),
            Probe::BlockByHash { hash, method } => RpcRequest::with_hash(*method, hash.clone()),
        }
    }

    /// True if this node answers the probe alongside its peers.
    pub fn includes_local(&self) -> bool {
        matches!(self, Probe::Snapshot(_))
    }
}

/// Why no majority could be named.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MajorityWarning {
    /// Half or fewer of the participants answered.
    #[error("insufficient quorum ({responded} of {total} responded)")]
    InsufficientQuorum {
        /// Participants that gave a usable answer
        responded: usize,
        /// Participants asked
        total: usize,
    },

    /// Two or more distinct answers are equally popular.
    #[error("no majority")]
    NoMajority,
}

/// The participant speaking for the majority.
#[derive(Debug, Clone, PartialEq)]
pub struct Majority {
    /// Who to trust.
    pub participant: Participant,
    /// How many participants gave the same answer, the winner included.
    pub agreeing: usize,
    /// Participants that answered at all.
    pub responded: usize,
    /// The agreed answer.
    pub response: Value,
}

/// Outcome of one majority resolution.
pub type Resolution = Result<Majority, MajorityWarning>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_probe_request_carries_hash() {
        let probe = Probe::block_by_hash("abc");
        let request = probe.request();
        assert_eq!(request.method, RpcMethod::CheckBlockByHash);
        assert_eq!(request.params["hash"], "abc");
        assert!(!probe.includes_local());
    }

    #[test]
    fn test_snapshot_probe_includes_local() {
        let probe = Probe::snapshot(RpcMethod::CopyBlock);
        assert!(probe.includes_local());
        assert_eq!(probe.request().params, Value::Null);
    }

    #[test]
    fn test_warning_messages() {
        let warning = MajorityWarning::InsufficientQuorum {
            responded: 1,
            total: 3,
        };
        assert_eq!(warning.to_string(), "insufficient quorum (1 of 3 responded)");
        assert_eq!(MajorityWarning::NoMajority.to_string(), "no majority");
    }

    #[test]
    fn test_participant_display() {
        assert_eq!(Participant::Local.to_string(), "local");
        let remote = Participant::Remote(PeerInfo::new("10.0.0.2", 8080));
        assert_eq!(remote.to_string(), "10.0.0.2:8080");
        assert_eq!(remote.peer().map(|p| p.port), Some(8080));
    }
}
