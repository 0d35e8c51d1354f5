//! Transactions and block headers.

use serde::{Deserialize, Serialize};

use crate::codec::{serialize_hash, Decodable, Decoder, Encodable, Encoder};
use crate::error::Result;
use crate::merkle::merkle_root;
use crate::script::Script;
use crate::types::{BlockHash, Hash256, TxId};

/// Reference to an output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: TxId, vout: u32) -> Self {
        Self { txid, vout }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxIn {
    /// An unsigned input with the final sequence number.
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Script::empty(),
            sequence: u32::MAX,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: i64,
    pub script_pubkey: Script,
}

impl TxOut {
    pub fn new(value: i64, script_pubkey: Script) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }

    /// True for cryptocondition outputs.
    pub fn is_cc(&self) -> bool {
        self.script_pubkey.is_pay_to_cryptocondition()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
    pub expiry_height: u32,
}

/// Version used for every transaction this crate constructs.
pub const TX_VERSION: i32 = 4;

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            expiry_height: 0,
        }
    }
}

impl Transaction {
    pub fn txid(&self) -> TxId {
        serialize_hash(self)
    }

    /// Sum of output values, saturating on overflow.
    pub fn value_out(&self) -> i64 {
        self.outputs
            .iter()
            .fold(0i64, |acc, out| acc.saturating_add(out.value))
    }

    /// Digest signed by spend authorisations: the transaction with every
    /// `script_sig` emptied.
    pub fn signature_hash(&self) -> Hash256 {
        let mut stripped = self.clone();
        for input in &mut stripped.inputs {
            input.script_sig = Script::empty();
        }
        serialize_hash(&stripped)
    }
}

impl Encodable for OutPoint {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_hash(&self.txid);
        enc.write_u32(self.vout);
    }
}

impl Decodable for OutPoint {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            txid: dec.read_hash()?,
            vout: dec.read_u32()?,
        })
    }
}

impl Encodable for TxIn {
    fn encode(&self, enc: &mut Encoder) {
        self.prevout.encode(enc);
        self.script_sig.encode(enc);
        enc.write_u32(self.sequence);
    }
}

impl Decodable for TxIn {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            prevout: OutPoint::decode(dec)?,
            script_sig: Script::decode(dec)?,
            sequence: dec.read_u32()?,
        })
    }
}

impl Encodable for TxOut {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_i64(self.value);
        self.script_pubkey.encode(enc);
    }
}

impl Decodable for TxOut {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            value: dec.read_i64()?,
            script_pubkey: Script::decode(dec)?,
        })
    }
}

impl Encodable for Transaction {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_i32(self.version);
        self.inputs.encode(enc);
        self.outputs.encode(enc);
        enc.write_u32(self.lock_time);
        enc.write_u32(self.expiry_height);
    }
}

impl Decodable for Transaction {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            version: dec.read_i32()?,
            inputs: Vec::decode(dec)?,
            outputs: Vec::decode(dec)?,
            lock_time: dec.read_u32()?,
            expiry_height: dec.read_u32()?,
        })
    }
}

/// Header fields of a block on the active chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub hash: BlockHash,
    pub height: u32,
    pub time: u32,
    pub merkle_root: Hash256,
}

/// A block with its transactions in position order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub info: BlockInfo,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn txids(&self) -> Vec<TxId> {
        self.transactions.iter().map(Transaction::txid).collect()
    }
}

/// Merkle root over the transaction ids of a block.
pub fn block_merkle_root(transactions: &[Transaction]) -> Hash256 {
    let txids: Vec<TxId> = transactions.iter().map(Transaction::txid).collect();
    merkle_root(&txids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{deserialize, serialize};
    use crate::crypto::PublicKey;

    fn sample_tx() -> Transaction {
        Transaction {
            inputs: vec![TxIn {
                prevout: OutPoint::new(Hash256::from_bytes([1; 32]), 3),
                script_sig: Script::from(vec![1, 2, 3]),
                sequence: 7,
            }],
            outputs: vec![
                TxOut::new(5000, Script::pay_to_pubkey(&PublicKey([2; 32]))),
                TxOut::new(0, Script::op_return(b"memo")),
            ],
            lock_time: 11,
            expiry_height: 99,
            ..Default::default()
        }
    }

    #[test]
    fn test_transaction_decode_matches_encode() {
        let tx = sample_tx();
        let bytes = serialize(&tx);
        assert_eq!(deserialize::<Transaction>(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_expiry_height_changes_txid() {
        let tx = sample_tx();
        let mut other = tx.clone();
        other.expiry_height += 1;
        assert_ne!(tx.txid(), other.txid());
    }

    #[test]
    fn test_signature_hash_ignores_script_sig() {
        let tx = sample_tx();
        let mut resigned = tx.clone();
        resigned.inputs[0].script_sig = Script::from(vec![9; 64]);
        assert_eq!(tx.signature_hash(), resigned.signature_hash());
        assert_ne!(tx.txid(), resigned.txid());
    }

    #[test]
    fn test_value_out() {
        assert_eq!(sample_tx().value_out(), 5000);
    }
}
