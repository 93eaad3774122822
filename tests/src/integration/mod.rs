//! Cross-crate integration flows.

pub mod cluster_flows;
pub mod http_flows;
