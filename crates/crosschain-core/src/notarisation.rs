//! Notarisation payloads.
//!
//! A notarisation transaction commits a chain checkpoint in the `OP_RETURN`
//! of its second output. The payload layout is:
//!
//! ```text
//! blockHash(32) height(u32) [txHash(32)] symbol\0 [MoM(32) MoMDepth(u16) ccId(u16) [MoMoM(32) MoMoMDepth(u32)]]
//! ```
//!
//! `txHash` and the MoMoM pair only exist on back-notarisations. Whether a
//! record is a back-notarisation is not stored; it is inferred from where the
//! record is read (see [`NotarisationContext`]).

use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encodable, Encoder};
use crate::error::{CoreError, Result};
use crate::transaction::Transaction;
use crate::types::{BlockHash, Hash256, TxId};

/// Longest symbol accepted, including the NUL terminator.
pub const MAX_SYMBOL_LEN: usize = 64;

/// Symbols of the hub family. Hub-chain records carrying one of these
/// symbols at the back-notarisation offset are back-notarisations.
pub const HUB_SYMBOLS: [&str; 2] = ["KMD", "BTC"];

/// Offset of the symbol in a back-notarisation.
const BACK_SYMBOL_OFFSET: usize = 32 + 4 + 32;

/// Output index carrying the notarisation payload.
pub const NOTARISATION_VOUT: usize = 1;

/// Where a notarisation payload is being decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotarisationContext {
    /// The hub chain: forward notarisations, plus back-notarisations of the
    /// hub itself into an external chain.
    Hub,
    /// Any other chain: every record is a back-notarisation.
    Assetchain,
}

/// Fields present only on back-notarisations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackNotarisation {
    /// The forward notarisation this record backs.
    pub tx_hash: TxId,
    pub mom_mom: Hash256,
    pub mom_mom_depth: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarisationData {
    pub block_hash: BlockHash,
    pub height: u32,
    pub symbol: String,
    pub mom: Hash256,
    pub mom_depth: u16,
    pub cc_id: u16,
    pub back: Option<BackNotarisation>,
}

impl NotarisationData {
    pub fn is_back(&self) -> bool {
        self.back.is_some()
    }

    /// MoMoM of a back-notarisation; zero for forward records.
    pub fn mom_mom(&self) -> Hash256 {
        self.back.as_ref().map_or(Hash256::ZERO, |b| b.mom_mom)
    }

    /// Decode a payload read in `context`.
    pub fn decode(bytes: &[u8], context: NotarisationContext) -> Result<Self> {
        let back = match context {
            NotarisationContext::Assetchain => true,
            NotarisationContext::Hub => has_hub_back_symbol(bytes),
        };

        let mut dec = Decoder::new(bytes);
        let block_hash = dec.read_hash()?;
        let height = dec.read_u32()?;
        let tx_hash = if back { Some(dec.read_hash()?) } else { None };
        let symbol = dec.read_cstring(MAX_SYMBOL_LEN)?;

        let mut data = NotarisationData {
            block_hash,
            height,
            symbol,
            mom: Hash256::ZERO,
            mom_depth: 0,
            cc_id: 0,
            back: tx_hash.map(|tx_hash| BackNotarisation {
                tx_hash,
                mom_mom: Hash256::ZERO,
                mom_mom_depth: 0,
            }),
        };

        if dec.is_empty() {
            return Ok(data);
        }
        data.mom = dec.read_hash()?;
        data.mom_depth = dec.read_u16()?;
        data.cc_id = dec.read_u16()?;

        if let Some(back) = data.back.as_mut() {
            if !dec.is_empty() {
                back.mom_mom = dec.read_hash()?;
                back.mom_mom_depth = dec.read_u32()?;
            }
        }
        dec.finish()?;
        Ok(data)
    }
}

fn has_hub_back_symbol(bytes: &[u8]) -> bool {
    bytes.len() >= BACK_SYMBOL_OFFSET + 4
        && HUB_SYMBOLS.iter().any(|sym| {
            let tail = &bytes[BACK_SYMBOL_OFFSET..];
            tail.starts_with(sym.as_bytes()) && tail.get(sym.len()) == Some(&0)
        })
}

impl Encodable for NotarisationData {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_hash(&self.block_hash);
        enc.write_u32(self.height);
        if let Some(back) = &self.back {
            enc.write_hash(&back.tx_hash);
        }
        enc.write_cstring(&self.symbol);
        enc.write_hash(&self.mom);
        enc.write_u16(self.mom_depth);
        enc.write_u16(self.cc_id);
        if let Some(back) = &self.back {
            enc.write_hash(&back.mom_mom);
            enc.write_u32(back.mom_mom_depth);
        }
    }
}

/// A notarisation transaction id with its decoded payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notarisation {
    pub txid: TxId,
    pub data: NotarisationData,
}

impl Notarisation {
    pub fn new(txid: TxId, data: NotarisationData) -> Self {
        Self { txid, data }
    }

    pub fn symbol(&self) -> &str {
        &self.data.symbol
    }
}

/// Notarisations found in one block, in transaction order.
pub type NotarisationsInBlock = Vec<Notarisation>;

/// Decode the notarisation payload of `tx`.
///
/// Requires at least two outputs with the second an `OP_RETURN`.
pub fn parse_notarisation_op_return(
    tx: &Transaction,
    context: NotarisationContext,
) -> Result<NotarisationData> {
    let data = tx
        .outputs
        .get(NOTARISATION_VOUT)
        .and_then(|out| out.script_pubkey.op_return_data())
        .ok_or(CoreError::MissingOpReturn)?;
    NotarisationData::decode(data, context)
}
