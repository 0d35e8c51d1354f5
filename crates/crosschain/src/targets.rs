//! Import targets outside the notarised network and the collaborators that
//! vouch for them.
//!
//! Burns with the wildcard ccid name their target by symbol. Each symbol
//! maps to one [`TargetKind`]; light clients and oracles are injected and
//! only ever asked for a yes/no answer or published data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crosschain_core::{
    CoreError, Decodable, Decoder, Encodable, Encoder, Hash256, MerkleBranch, PublicKey,
    Transaction, TxId,
};

/// Where a wildcard burn is headed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Re-issue on this chain, authorised by the override key.
    SelfImport,
    Beam,
    Coda,
    Pegs,
    /// Any other symbol names an oracle-backed gateway.
    Gateway(String),
}

impl TargetKind {
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "PUBKEY" => TargetKind::SelfImport,
            "BEAM" => TargetKind::Beam,
            "CODA" => TargetKind::Coda,
            "PEGSCC" => TargetKind::Pegs,
            other => TargetKind::Gateway(other.to_string()),
        }
    }

    /// Whether a light client decides imports of this kind.
    pub fn uses_light_client(&self) -> bool {
        matches!(self, TargetKind::Beam | TargetKind::Coda | TargetKind::Pegs)
    }
}

/// An oracle-registered gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayBinding {
    /// Publishers that must agree on a root.
    pub m: usize,
    pub publishers: Vec<PublicKey>,
    /// Address deposits to this gateway must be sent to.
    pub deposit_address: String,
}

/// A deposit on an external chain, carried as a gateway burn's raw proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayDepositProof {
    /// External block height the deposit was mined at.
    pub height: u32,
    /// Merkle root of that block as reported by the oracle publishers.
    pub merkle_root: Hash256,
    pub deposit_txid: TxId,
    pub branch: MerkleBranch,
    pub deposit_address: String,
    /// Key the imported coins must be paid to.
    pub destination: PublicKey,
}

impl GatewayDepositProof {
    pub fn is_self_consistent(&self) -> bool {
        self.branch.exec(&self.deposit_txid) == Some(self.merkle_root)
    }
}

impl Encodable for GatewayDepositProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u32(self.height);
        enc.write_hash(&self.merkle_root);
        enc.write_hash(&self.deposit_txid);
        self.branch.encode(enc);
        enc.write_string(&self.deposit_address);
        enc.write_raw(self.destination.as_bytes());
    }
}

impl Decodable for GatewayDepositProof {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CoreError> {
        Ok(Self {
            height: dec.read_u32()?,
            merkle_root: dec.read_hash()?,
            deposit_txid: dec.read_hash()?,
            branch: MerkleBranch::decode(dec)?,
            deposit_address: dec.read_string()?,
            destination: PublicKey(dec.read_hash()?.0),
        })
    }
}

/// Verifier for chains with their own light client.
#[async_trait]
pub trait LightClient: Send + Sync {
    /// Whether `raw_proof` shows `burn_tx` entitles `import_tx`.
    async fn verify(
        &self,
        kind: &TargetKind,
        burn_tx: &Transaction,
        import_tx: &Transaction,
        raw_proof: &[u8],
    ) -> anyhow::Result<bool>;
}

/// Oracle data published for gateways.
#[async_trait]
pub trait OracleSource: Send + Sync {
    async fn binding(&self, gateway: &str) -> anyhow::Result<GatewayBinding>;

    /// Merkle roots reported for `height`, with the reporting publisher.
    async fn reported_roots(
        &self,
        gateway: &str,
        height: u32,
    ) -> anyhow::Result<Vec<(PublicKey, Hash256)>>;
}

/// Fixed-answer collaborators for tests.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    /// A light client with a fixed verdict and an optional delay.
    #[derive(Debug, Clone)]
    pub struct StaticLightClient {
        pub verdict: bool,
        pub delay: Option<Duration>,
    }

    impl StaticLightClient {
        pub fn new(verdict: bool) -> Self {
            Self {
                verdict,
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl LightClient for StaticLightClient {
        async fn verify(
            &self,
            _kind: &TargetKind,
            _burn_tx: &Transaction,
            _import_tx: &Transaction,
            _raw_proof: &[u8],
        ) -> anyhow::Result<bool> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.verdict)
        }
    }

    /// An oracle backed by maps.
    #[derive(Debug, Clone, Default)]
    pub struct StaticOracle {
        pub bindings: HashMap<String, GatewayBinding>,
        pub roots: HashMap<(String, u32), Vec<(PublicKey, Hash256)>>,
    }

    impl StaticOracle {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn bind(&mut self, gateway: &str, binding: GatewayBinding) {
            self.bindings.insert(gateway.to_string(), binding);
        }

        pub fn report(&mut self, gateway: &str, height: u32, publisher: PublicKey, root: Hash256) {
            self.roots
                .entry((gateway.to_string(), height))
                .or_default()
                .push((publisher, root));
        }
    }

    #[async_trait]
    impl OracleSource for StaticOracle {
        async fn binding(&self, gateway: &str) -> anyhow::Result<GatewayBinding> {
            self.bindings
                .get(gateway)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("gateway {gateway} not bound"))
        }

        async fn reported_roots(
            &self,
            gateway: &str,
            height: u32,
        ) -> anyhow::Result<Vec<(PublicKey, Hash256)>> {
            Ok(self
                .roots
                .get(&(gateway.to_string(), height))
                .cloned()
                .unwrap_or_default())
        }
    }
}
