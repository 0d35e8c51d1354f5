//! Chain parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crosschain_core::PublicKey;

use crate::error::Result;

/// Target ccid of burns that leave the notarised network (self-import and
/// gateways).
pub const WILDCARD_CC_ID: u32 = u32::MAX;

/// Lowest ccid whose coins are fungible across chains.
pub const MIN_FUNGIBLE_CC_ID: u32 = 100;

/// Distinct notary approvals needed on the fallback path.
pub const NOTARY_APPROVAL_QUORUM: usize = 5;

/// Fee a relayer may skim from a burn.
pub const DEFAULT_NETWORK_FEE: i64 = 10_000;

/// Configuration of the chain this node validates imports for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Symbol of this chain.
    pub symbol: String,
    /// Chain-class id of this chain.
    pub cc_id: u32,
    /// Whether this node runs the hub chain.
    pub is_hub: bool,
    /// Key allowed to sign self-import burns; self-import is off without it.
    pub self_import_pubkey: Option<PublicKey>,
    /// Chain whose imports predate canonical construction.
    pub legacy_symbol: Option<String>,
    /// Distinct notaries required on the approval-list path.
    pub approval_quorum: usize,
    /// Largest gap allowed between the burn amount and the payouts.
    pub network_fee: i64,
    /// Time limit for each light-client or oracle call, in milliseconds.
    pub external_timeout_ms: u64,
    /// Publishers that must report a gateway root, over and above the
    /// gateway's own threshold.
    pub min_gateway_publishers: usize,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            cc_id: MIN_FUNGIBLE_CC_ID,
            is_hub: false,
            self_import_pubkey: None,
            legacy_symbol: None,
            approval_quorum: NOTARY_APPROVAL_QUORUM,
            network_fee: DEFAULT_NETWORK_FEE,
            external_timeout_ms: 10_000,
            min_gateway_publishers: 1,
        }
    }
}

impl ChainParams {
    /// Parameters for the chain `symbol` with class `cc_id`.
    pub fn new(symbol: impl Into<String>, cc_id: u32) -> Self {
        Self {
            symbol: symbol.into(),
            cc_id,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_millis(self.external_timeout_ms)
    }

    /// Whether imports on this chain skip the canonical rebuild.
    pub fn exempt_from_canonical_check(&self) -> bool {
        self.legacy_symbol.as_deref() == Some(self.symbol.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ChainParams::new("ASSETB", 200);
        assert_eq!(params.approval_quorum, 5);
        assert_eq!(params.network_fee, 10_000);
        assert!(params.self_import_pubkey.is_none());
        assert!(!params.exempt_from_canonical_check());
    }

    #[test]
    fn test_from_json_partial() {
        let params =
            ChainParams::from_json(r#"{"symbol":"OLDCHAIN","cc_id":2,"legacy_symbol":"OLDCHAIN","approval_quorum":2}"#)
                .unwrap();
        assert_eq!(params.cc_id, 2);
        assert_eq!(params.approval_quorum, 2);
        assert_eq!(params.external_timeout(), Duration::from_secs(10));
        assert!(params.exempt_from_canonical_check());
        assert!(ChainParams::from_json("{\"cc_id\":\"x\"}").is_err());
    }
}
