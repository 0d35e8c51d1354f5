//! Proof artifacts carried by import transactions.

use crate::codec::{Decodable, Decoder, Encodable, Encoder};
use crate::error::{CoreError, Result};
use crate::merkle::MerkleBranch;
use crate::types::{Hash256, TxId};

/// A Merkle branch anchored at a notarisation transaction.
///
/// `branch` proves a transaction id into the root committed by the
/// notarisation identified by `notarisation_txid`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxProof {
    pub notarisation_txid: TxId,
    pub branch: MerkleBranch,
}

impl TxProof {
    pub fn new(notarisation_txid: TxId, branch: MerkleBranch) -> Self {
        Self {
            notarisation_txid,
            branch,
        }
    }
}

impl Encodable for TxProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_hash(&self.notarisation_txid);
        self.branch.encode(enc);
    }
}

impl Decodable for TxProof {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            notarisation_txid: dec.read_hash()?,
            branch: MerkleBranch::decode(dec)?,
        })
    }
}

const PROOF_MERKLE_BRANCH: u8 = 0x11;
const PROOF_NOTARY_TXIDS: u8 = 0x12;

/// The proof attached to an import transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportProof {
    /// Branch from the burn txid to a MoMoM.
    MerkleBranch(TxProof),
    /// Notary approval transactions vouching for the burn.
    NotaryTxids(Vec<TxId>),
}

impl ImportProof {
    pub fn as_tx_proof(&self) -> Option<&TxProof> {
        match self {
            ImportProof::MerkleBranch(proof) => Some(proof),
            ImportProof::NotaryTxids(_) => None,
        }
    }
}

impl Encodable for ImportProof {
    fn encode(&self, enc: &mut Encoder) {
        match self {
            ImportProof::MerkleBranch(proof) => {
                enc.write_u8(PROOF_MERKLE_BRANCH);
                proof.encode(enc);
            }
            ImportProof::NotaryTxids(txids) => {
                enc.write_u8(PROOF_NOTARY_TXIDS);
                txids.encode(enc);
            }
        }
    }
}

impl Decodable for ImportProof {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        match dec.read_u8()? {
            PROOF_MERKLE_BRANCH => Ok(ImportProof::MerkleBranch(TxProof::decode(dec)?)),
            PROOF_NOTARY_TXIDS => Ok(ImportProof::NotaryTxids(Vec::decode(dec)?)),
            kind => Err(CoreError::UnknownProofKind(kind)),
        }
    }
}

/// An SPV-style inclusion claim published by a notary.
///
/// Only self-consistency can be checked locally: the branch must lead from
/// `txid` to `merkle_root`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InclusionProof {
    pub merkle_root: Hash256,
    pub txid: TxId,
    pub branch: MerkleBranch,
}

impl InclusionProof {
    pub fn is_self_consistent(&self) -> bool {
        self.branch.exec(&self.txid) == Some(self.merkle_root)
    }
}

impl Encodable for InclusionProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_hash(&self.merkle_root);
        enc.write_hash(&self.txid);
        self.branch.encode(enc);
    }
}

impl Decodable for InclusionProof {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            merkle_root: dec.read_hash()?,
            txid: dec.read_hash()?,
            branch: MerkleBranch::decode(dec)?,
        })
    }
}
