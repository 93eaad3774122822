//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, its canonical hashing form
//! - **Pool**: `Entry`, `EntryKind`
//! - **Networking**: `PeerInfo`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::errors::TypesError;

/// `prev_hash` value that marks the genesis block.
pub const GENESIS_PREV_HASH: &str = "0";

/// Format of the human-readable `settime` field.
pub const SETTIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Current wall-clock time in `settime` format.
pub fn settime_now() -> String {
    chrono::Local::now().format(SETTIME_FORMAT).to_string()
}

/// Current Unix time in milliseconds, as stored in `timestamp`.
pub fn timestamp_now() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A committed block.
///
/// Blocks form a tree rooted at the genesis block; a node with more than one
/// child is a fork. `height` and `size` are informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Informational height; 0 for genesis.
    pub height: u64,
    /// Number of entries in `data`.
    pub size: usize,
    /// Creation time (`yyyyMMddHHmmss`).
    pub settime: String,
    /// Creation time in Unix milliseconds.
    pub timestamp: String,
    /// Hash of the parent block, or `"0"` for genesis.
    pub prev_hash: String,
    /// Committed entries. Empty for genesis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Entry>,
    /// SHA-256 content hash, lowercase hex.
    pub hash: String,
}

/// Canonical hashing form: every field except `hash`, and no `data` for genesis.
#[derive(Serialize)]
struct HashableBlock<'a> {
    height: u64,
    size: usize,
    settime: &'a str,
    timestamp: &'a str,
    prev_hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a [Entry]>,
}

impl Block {
    /// Build the genesis block.
    pub fn genesis(settime: String, timestamp: String) -> Result<Self, TypesError> {
        Self::sealed(0, settime, timestamp, GENESIS_PREV_HASH.to_string(), Vec::new())
    }

    /// Build a block committing `data` on top of `parent`.
    pub fn child_of(
        parent: &Block,
        data: Vec<Entry>,
        settime: String,
        timestamp: String,
    ) -> Result<Self, TypesError> {
        Self::sealed(
            parent.height + 1,
            settime,
            timestamp,
            parent.hash.clone(),
            data,
        )
    }

    fn sealed(
        height: u64,
        settime: String,
        timestamp: String,
        prev_hash: String,
        data: Vec<Entry>,
    ) -> Result<Self, TypesError> {
        let mut block = Self {
            height,
            size: data.len(),
            settime,
            timestamp,
            prev_hash,
            data,
            hash: String::new(),
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// True for the chain root.
    pub fn is_genesis(&self) -> bool {
        self.prev_hash == GENESIS_PREV_HASH
    }

    /// Recompute the content hash from the current field values.
    pub fn compute_hash(&self) -> Result<String, TypesError> {
        let hashable = HashableBlock {
            height: self.height,
            size: self.size,
            settime: &self.settime,
            timestamp: &self.timestamp,
            prev_hash: &self.prev_hash,
            data: if self.is_genesis() {
                None
            } else {
                Some(&self.data)
            },
        };
        let bytes = serde_json::to_vec(&hashable)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// True when the stored hash matches a recomputation.
    pub fn verify_hash(&self) -> Result<bool, TypesError> {
        Ok(self.compute_hash()? == self.hash)
    }

    /// Ids of the committed entries.
    pub fn entry_ids(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|e| e.id.as_str())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block(height={}, hash={}, prev_hash={}, entries={})",
            self.height,
            self.hash,
            self.prev_hash,
            self.data.len()
        )
    }
}

// =============================================================================
// CLUSTER B: THE POOL
// =============================================================================

/// Kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Registers a new record.
    New,
    /// Supersedes `original_id` with a new version.
    Modify,
    /// Supersedes `original_id` with a tombstone.
    Delete,
}

/// A ledger entry, either pending in the pool or committed inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique id, assigned at registration.
    #[serde(rename = "_id")]
    pub id: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// The superseded entry, for `modify` and `delete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    /// Already propagated to peers.
    #[serde(rename = "deliveryF", default)]
    pub delivered: bool,
    /// Registration time (`yyyyMMddHHmmss`).
    pub settime: String,
    /// Application fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Entry {
    /// A new `new` entry with a fresh id.
    pub fn new(payload: Map<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: EntryKind::New,
            original_id: None,
            delivered: false,
            settime: settime_now(),
            payload,
        }
    }

    /// A `modify` entry superseding `original_id`.
    pub fn modify(original_id: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            kind: EntryKind::Modify,
            original_id: Some(original_id.into()),
            ..Self::new(payload)
        }
    }

    /// A `delete` entry superseding `original_id`.
    pub fn delete(original_id: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Delete,
            original_id: Some(original_id.into()),
            ..Self::new(Map::new())
        }
    }

    /// Same entry with the delivery flag set.
    pub fn into_delivered(mut self) -> Self {
        self.delivered = true;
        self
    }

    /// Id this entry supersedes, if it is a `modify`/`delete`.
    pub fn supersedes(&self) -> Option<&str> {
        match self.kind {
            EntryKind::New => None,
            EntryKind::Modify | EntryKind::Delete => self.original_id.as_deref(),
        }
    }

    /// Look up a payload field by dotted path (`"owner.name"`).
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.payload.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

// =============================================================================
// CLUSTER C: NETWORKING
// =============================================================================

/// A statically configured peer node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Host name or IP address.
    pub host: String,
    /// RPC port.
    pub port: u16,
}

impl PeerInfo {
    /// Create a peer descriptor.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Stable identifier, `host:port`.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerInfo {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| TypesError::InvalidPeerAddress(s.to_string()))?;
        if host.is_empty() {
            return Err(TypesError::InvalidPeerAddress(s.to_string()));
        }
        let port = port
            .parse()
            .map_err(|_| TypesError::InvalidPeerAddress(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}
