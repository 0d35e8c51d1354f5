//! Output scripts and cryptocondition trees.
//!
//! Only the handful of script shapes this subsystem reads or writes are
//! modelled: pay-to-pubkey, `OP_RETURN` data carriers and cryptocondition
//! outputs. Anything else is opaque bytes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{serialize, Decodable, Decoder, Encodable, Encoder};
use crate::crypto::{PublicKey, Signature};
use crate::error::{CoreError, Result};

pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKCRYPTOCONDITION: u8 = 0xcc;

/// Maximum nesting of threshold conditions accepted on decode.
pub const MAX_CONDITION_DEPTH: usize = 8;

/// A serialized output or input script.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Script(pub Bytes);

impl Script {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `<pubkey> OP_CHECKSIG`
    pub fn pay_to_pubkey(pk: &PublicKey) -> Self {
        let mut out = Vec::with_capacity(34);
        out.push(32);
        out.extend_from_slice(pk.as_bytes());
        out.push(OP_CHECKSIG);
        Self(out.into())
    }

    /// `OP_RETURN <data>`
    pub fn op_return(data: &[u8]) -> Self {
        let mut out = vec![OP_RETURN];
        push_data(&mut out, data);
        Self(out.into())
    }

    /// `<condition> OP_CHECKCRYPTOCONDITION`
    pub fn cryptocondition(cond: &Condition) -> Self {
        let mut out = Vec::new();
        push_data(&mut out, &serialize(cond));
        out.push(OP_CHECKCRYPTOCONDITION);
        Self(out.into())
    }

    /// Script sig spending a pay-to-pubkey output.
    pub fn signature(sig: &Signature) -> Self {
        let mut out = Vec::with_capacity(65);
        push_data(&mut out, sig.as_bytes());
        Self(out.into())
    }

    /// The data of a script made of exactly one push.
    pub fn single_push(&self) -> Option<&[u8]> {
        let (data, rest) = read_push(self.as_bytes())?;
        rest.is_empty().then_some(data)
    }

    /// The key of a pay-to-pubkey script.
    pub fn as_pay_to_pubkey(&self) -> Option<PublicKey> {
        let b = self.as_bytes();
        if b.len() != 34 || b[0] != 32 || b[33] != OP_CHECKSIG {
            return None;
        }
        let mut pk = [0u8; 32];
        pk.copy_from_slice(&b[1..33]);
        Some(PublicKey(pk))
    }

    pub fn is_op_return(&self) -> bool {
        self.0.first() == Some(&OP_RETURN)
    }

    /// The payload of an `OP_RETURN` script holding a single push.
    pub fn op_return_data(&self) -> Option<&[u8]> {
        let b = self.as_bytes();
        if b.first() != Some(&OP_RETURN) {
            return None;
        }
        let (data, rest) = read_push(&b[1..])?;
        rest.is_empty().then_some(data)
    }

    pub fn is_pay_to_cryptocondition(&self) -> bool {
        self.condition_bytes().is_some()
    }

    fn condition_bytes(&self) -> Option<&[u8]> {
        let b = self.as_bytes();
        let (last, body) = b.split_last()?;
        if *last != OP_CHECKCRYPTOCONDITION {
            return None;
        }
        let (data, rest) = read_push(body)?;
        rest.is_empty().then_some(data)
    }

    /// Decode the condition of a cryptocondition output.
    pub fn condition(&self) -> Option<Condition> {
        let bytes = self.condition_bytes()?;
        crate::codec::deserialize(bytes).ok()
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for Script {
    fn from(v: Vec<u8>) -> Self {
        Self(v.into())
    }
}

impl Encodable for Script {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bytes(&self.0);
    }
}

impl Decodable for Script {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self(dec.read_bytes()?.into()))
    }
}

fn push_data(out: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
}

/// Split one push off the front of `b`.
fn read_push(b: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&op, rest) = b.split_first()?;
    let (len, rest) = match op {
        0..=0x4b => (op as usize, rest),
        OP_PUSHDATA1 => {
            let (&n, rest) = rest.split_first()?;
            (n as usize, rest)
        }
        OP_PUSHDATA2 => {
            let n = u16::from_le_bytes(rest.get(..2)?.try_into().ok()?);
            (n as usize, &rest[2..])
        }
        OP_PUSHDATA4 => {
            let n = u32::from_le_bytes(rest.get(..4)?.try_into().ok()?);
            (n as usize, &rest[4..])
        }
        _ => return None,
    };
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}

/// A cryptocondition tree.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Condition {
    /// Satisfied when `k` of the subconditions are.
    Threshold { k: u8, subconditions: Vec<Condition> },
    /// Satisfied by a signature from the key.
    PublicKey(PublicKey),
    /// Dispatches to a contract module by eval code.
    Eval { code: u8, params: Vec<u8> },
}

const TAG_THRESHOLD: u8 = 0;
const TAG_PUBLIC_KEY: u8 = 1;
const TAG_EVAL: u8 = 2;

impl Condition {
    pub fn eval(code: u8, params: impl Into<Vec<u8>>) -> Self {
        Condition::Eval {
            code,
            params: params.into(),
        }
    }

    /// Parameters of the first `Eval` node with the given code, depth first.
    pub fn eval_params(&self, code: u8) -> Option<&[u8]> {
        match self {
            Condition::Eval { code: c, params } if *c == code => Some(params.as_slice()),
            Condition::Threshold { subconditions, .. } => {
                subconditions.iter().find_map(|sub| sub.eval_params(code))
            }
            _ => None,
        }
    }

    fn decode_at_depth(dec: &mut Decoder<'_>, depth: usize) -> Result<Self> {
        if depth > MAX_CONDITION_DEPTH {
            return Err(CoreError::InvalidCondition("nesting too deep".into()));
        }
        match dec.read_u8()? {
            TAG_THRESHOLD => {
                let k = dec.read_u8()?;
                let count = dec.read_count()?;
                let mut subconditions = Vec::with_capacity(count);
                for _ in 0..count {
                    subconditions.push(Self::decode_at_depth(dec, depth + 1)?);
                }
                if k == 0 || k as usize > subconditions.len() {
                    return Err(CoreError::InvalidCondition(format!(
                        "threshold {} of {}",
                        k,
                        subconditions.len()
                    )));
                }
                Ok(Condition::Threshold { k, subconditions })
            }
            TAG_PUBLIC_KEY => Ok(Condition::PublicKey(PublicKey(dec.read_hash()?.0))),
            TAG_EVAL => {
                let code = dec.read_u8()?;
                let params = dec.read_bytes()?;
                Ok(Condition::Eval { code, params })
            }
            tag => Err(CoreError::InvalidCondition(format!("unknown tag {}", tag))),
        }
    }
}

impl Encodable for Condition {
    fn encode(&self, enc: &mut Encoder) {
        match self {
            Condition::Threshold { k, subconditions } => {
                enc.write_u8(TAG_THRESHOLD);
                enc.write_u8(*k);
                subconditions.encode(enc);
            }
            Condition::PublicKey(pk) => {
                enc.write_u8(TAG_PUBLIC_KEY);
                enc.write_raw(pk.as_bytes());
            }
            Condition::Eval { code, params } => {
                enc.write_u8(TAG_EVAL);
                enc.write_u8(*code);
                enc.write_bytes(params);
            }
        }
    }
}

impl Decodable for Condition {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Self::decode_at_depth(dec, 0)
    }
}
