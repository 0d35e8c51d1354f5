//! Burn and import transaction formats.
//!
//! A burn transaction destroys value on a source chain; its last output is
//! an `OP_RETURN` describing where the value should reappear and committing
//! to the exact payouts. The matching import transaction on the destination
//! chain is fully determined by `(proof, burn transaction, payouts, expiry)`
//! and is only ever built through [`make_import_coin_transaction`].

use crate::codec::{serialize, serialize_hash, Decodable, Decoder, Encodable, Encoder};
use crate::crypto::PublicKey;
use crate::error::{CoreError, Result};
use crate::proof::ImportProof;
use crate::script::{Condition, Script};
use crate::transaction::{OutPoint, Transaction, TxIn, TxOut};
use crate::types::{Hash256, TxId};

/// Eval code of the import-coin contract.
pub const EVAL_IMPORTCOIN: u8 = 0xe2;

/// Eval code of the tokens contract.
pub const EVAL_TOKENS: u8 = 0xf2;

/// Output index referenced by the single input of an import transaction.
/// No real transaction has this many outputs.
pub const IMPORT_PREVOUT_INDEX: u32 = 1_000_000_000;

/// Metadata of a token's creation transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenCreation {
    pub origin_pubkey: PublicKey,
    pub name: String,
    pub description: String,
}

impl Encodable for TokenCreation {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_raw(self.origin_pubkey.as_bytes());
        enc.write_string(&self.name);
        enc.write_string(&self.description);
    }
}

impl Decodable for TokenCreation {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            origin_pubkey: PublicKey(dec.read_hash()?.0),
            name: dec.read_string()?,
            description: dec.read_string()?,
        })
    }
}

/// A token being moved between chains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMigration {
    pub token_id: TxId,
    pub creation: TokenCreation,
}

impl Encodable for TokenMigration {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_hash(&self.token_id);
        self.creation.encode(enc);
    }
}

impl Decodable for TokenMigration {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            token_id: dec.read_hash()?,
            creation: TokenCreation::decode(dec)?,
        })
    }
}

/// Contents of a burn transaction's last output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnDescriptor {
    pub target_cc_id: u32,
    pub target_symbol: String,
    pub payouts_hash: Hash256,
    /// Target-specific proof material, opaque to this layer.
    pub raw_proof: Vec<u8>,
    pub token: Option<TokenMigration>,
}

impl Encodable for BurnDescriptor {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u8(EVAL_IMPORTCOIN);
        enc.write_varint(self.target_cc_id as u64);
        enc.write_string(&self.target_symbol);
        enc.write_hash(&self.payouts_hash);
        enc.write_bytes(&self.raw_proof);
        match &self.token {
            Some(token) => {
                enc.write_u8(1);
                token.encode(enc);
            }
            None => enc.write_u8(0),
        }
    }
}

impl Decodable for BurnDescriptor {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        expect_eval(dec, EVAL_IMPORTCOIN)?;
        let target_cc_id =
            u32::try_from(dec.read_varint()?).map_err(|_| CoreError::VarIntOverflow)?;
        let target_symbol = dec.read_string()?;
        let payouts_hash = dec.read_hash()?;
        let raw_proof = dec.read_bytes()?;
        let token = match dec.read_u8()? {
            0 => None,
            1 => Some(TokenMigration::decode(dec)?),
            other => {
                return Err(CoreError::MalformedTransaction(format!(
                    "bad token flag {}",
                    other
                )))
            }
        };
        Ok(Self {
            target_cc_id,
            target_symbol,
            payouts_hash,
            raw_proof,
            token,
        })
    }
}

fn expect_eval(dec: &mut Decoder<'_>, expected: u8) -> Result<()> {
    let got = dec.read_u8()?;
    if got != expected {
        return Err(CoreError::UnexpectedEvalCode { expected, got });
    }
    Ok(())
}

/// Hash committed by a burn to the payouts of its import.
pub fn payouts_hash(payouts: &[TxOut]) -> Hash256 {
    serialize_hash(payouts)
}

/// The burn output: `amount` destroyed, described by `descriptor`.
pub fn make_burn_output(amount: i64, descriptor: &BurnDescriptor) -> TxOut {
    TxOut::new(amount, Script::op_return(&serialize(descriptor)))
}

/// Decode the burn descriptor from the last output of `tx`.
pub fn unmarshal_burn_tx(tx: &Transaction) -> Result<BurnDescriptor> {
    let data = tx
        .outputs
        .last()
        .and_then(|out| out.script_pubkey.op_return_data())
        .ok_or(CoreError::MissingOpReturn)?;
    crate::codec::deserialize(data)
}

/// Value destroyed by a burn transaction.
pub fn burn_amount(tx: &Transaction) -> i64 {
    tx.outputs.last().map_or(0, |out| out.value)
}

/// The `(proof, burn, payouts)` triple carried by an import transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportPayload {
    pub proof: ImportProof,
    pub burn_tx: Transaction,
    pub payouts: Vec<TxOut>,
}

impl Encodable for ImportPayload {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u8(EVAL_IMPORTCOIN);
        self.proof.encode(enc);
        self.burn_tx.encode(enc);
        self.payouts.encode(enc);
    }
}

impl Decodable for ImportPayload {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        expect_eval(dec, EVAL_IMPORTCOIN)?;
        Ok(Self {
            proof: ImportProof::decode(dec)?,
            burn_tx: Transaction::decode(dec)?,
            payouts: Vec::decode(dec)?,
        })
    }
}

/// Script sig of the single import input.
pub fn import_script_sig() -> Script {
    Script::from(serialize(&Condition::eval(EVAL_IMPORTCOIN, Vec::new())))
}

/// Build the canonical import transaction.
///
/// The result is a pure function of its arguments; validators rebuild it
/// and compare transaction ids.
pub fn make_import_coin_transaction(
    proof: ImportProof,
    burn_tx: Transaction,
    payouts: Vec<TxOut>,
    expiry_height: u32,
) -> Transaction {
    let input = TxIn {
        prevout: OutPoint::new(burn_tx.txid(), IMPORT_PREVOUT_INDEX),
        script_sig: import_script_sig(),
        sequence: u32::MAX,
    };
    let mut outputs = payouts.clone();
    let payload = ImportPayload {
        proof,
        burn_tx,
        payouts,
    };
    outputs.push(TxOut::new(0, Script::op_return(&serialize(&payload))));
    Transaction {
        inputs: vec![input],
        outputs,
        expiry_height,
        ..Default::default()
    }
}

/// True for transactions shaped like an import.
pub fn is_import_coin(tx: &Transaction) -> bool {
    match tx.inputs.as_slice() {
        [input] => {
            input.prevout.vout == IMPORT_PREVOUT_INDEX && input.script_sig == import_script_sig()
        }
        _ => false,
    }
}

/// Decode the payload of an import transaction.
pub fn unmarshal_import_tx(tx: &Transaction) -> Result<ImportPayload> {
    if !is_import_coin(tx) {
        return Err(CoreError::MalformedTransaction("not an import".into()));
    }
    let data = tx
        .outputs
        .last()
        .and_then(|out| out.script_pubkey.op_return_data())
        .ok_or(CoreError::MissingOpReturn)?;
    crate::codec::deserialize(data)
}

/// A token output: value locked to `owner` under the tokens contract.
pub fn token_output(value: i64, token_id: &TxId, owner: &PublicKey) -> TxOut {
    let cond = Condition::Threshold {
        k: 2,
        subconditions: vec![
            Condition::eval(EVAL_TOKENS, token_id.as_bytes().to_vec()),
            Condition::PublicKey(*owner),
        ],
    };
    TxOut::new(value, Script::cryptocondition(&cond))
}

/// Token id carried by a token output.
pub fn token_id_of(out: &TxOut) -> Option<TxId> {
    let cond = out.script_pubkey.condition()?;
    let params = cond.eval_params(EVAL_TOKENS)?;
    Hash256::try_from(params).ok()
}

/// Sum of outputs carrying `token_id`.
pub fn token_value(outputs: &[TxOut], token_id: &TxId) -> i64 {
    outputs
        .iter()
        .filter(|out| token_id_of(out).as_ref() == Some(token_id))
        .fold(0i64, |acc, out| acc.saturating_add(out.value))
}

/// Trailing payout announcing a migrated token's creation on the
/// destination chain.
pub fn token_creation_output(creation: &TokenCreation) -> TxOut {
    let mut enc = Encoder::new();
    enc.write_u8(EVAL_TOKENS);
    creation.encode(&mut enc);
    TxOut::new(0, Script::op_return(&enc.into_bytes()))
}

/// The creation record at the end of a migration's payouts.
pub fn token_creation_from_payouts(payouts: &[TxOut]) -> Option<TokenCreation> {
    let data = payouts.last()?.script_pubkey.op_return_data()?;
    let mut dec = Decoder::new(data);
    expect_eval(&mut dec, EVAL_TOKENS).ok()?;
    let creation = TokenCreation::decode(&mut dec).ok()?;
    dec.finish().ok()?;
    Some(creation)
}
