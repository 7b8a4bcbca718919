//! Identifier Types
//!
//! Opaque newtypes for the values that flow between the orchestrator and the
//! chain capabilities. None of them are interpreted by this workspace; they
//! are compared, hashed, logged and handed back to the capability that
//! produced them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an NFT within a batch. Unique per batch, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TokenId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Hash of a submitted source-chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxHash {
    fn from(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

/// Chain id of a network (source or destination).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an item is being bridged to.
///
/// Passed verbatim to both the fork simulator and the bridge submission so the
/// simulated call and the real call target the same destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationChain {
    /// Destination chain id
    pub network: NetworkId,
    /// Messaging-layer endpoint id, when the bridge protocol uses one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<u32>,
    /// Receiving address on the destination chain
    pub recipient: String,
}

impl DestinationChain {
    pub fn new(network: u64, recipient: impl Into<String>) -> Self {
        Self {
            network: NetworkId(network),
            endpoint_id: None,
            recipient: recipient.into(),
        }
    }

    pub fn with_endpoint_id(mut self, endpoint_id: u32) -> Self {
        self.endpoint_id = Some(endpoint_id);
        self
    }
}

/// One input row of a batch: which token goes where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub token_id: TokenId,
    pub destination: DestinationChain,
}

impl BridgeRequest {
    pub fn new(token_id: impl Into<TokenId>, destination: DestinationChain) -> Self {
        Self {
            token_id: token_id.into(),
            destination,
        }
    }

    /// Build one request per token id, all targeting the same destination.
    pub fn many<I, T>(token_ids: I, destination: &DestinationChain) -> Vec<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<TokenId>,
    {
        token_ids
            .into_iter()
            .map(|id| Self::new(id, destination.clone()))
            .collect()
    }
}
