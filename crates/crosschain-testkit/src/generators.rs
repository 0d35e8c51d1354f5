//! Proptest generators for property-based testing.

use proptest::prelude::*;

use crosschain_core::{
    BackNotarisation, Hash256, Keypair, MerkleBranch, NotarisationData, PublicKey, Script,
    Transaction, TxOut,
};

use crate::fixtures::burn_transaction;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random 32-byte hash.
pub fn hash() -> impl Strategy<Value = Hash256> {
    any::<[u8; 32]>().prop_map(Hash256)
}

/// Generate a random public key.
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate an assetchain symbol.
pub fn symbol() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9]{2,15}".prop_map(String::from)
}

/// Generate a fungible crosschain id.
pub fn fungible_cc_id() -> impl Strategy<Value = u16> {
    100u16..=u16::MAX
}

/// Generate a leaf list and a valid index into it.
pub fn leaves_and_index(max_len: usize) -> impl Strategy<Value = (Vec<Hash256>, usize)> {
    prop::collection::vec(hash(), 1..=max_len).prop_flat_map(|leaves| {
        let len = leaves.len();
        (Just(leaves), 0..len)
    })
}

/// Generate a Merkle branch for a random leaf of a random tree.
pub fn merkle_branch(max_leaves: usize) -> impl Strategy<Value = MerkleBranch> {
    leaves_and_index(max_leaves).prop_filter_map("duplicate sibling", |(leaves, index)| {
        MerkleBranch::from_leaves(&leaves, index)
    })
}

/// Generate a forward notarisation record.
pub fn forward_notarisation() -> impl Strategy<Value = NotarisationData> {
    (hash(), 1u32..=10_000_000, symbol(), hash(), 1u16..=1440, fungible_cc_id()).prop_map(
        |(block_hash, height, symbol, mom, mom_depth, cc_id)| NotarisationData {
            block_hash,
            height,
            symbol,
            mom,
            mom_depth,
            cc_id,
            back: None,
        },
    )
}

/// Generate a back-notarisation record.
pub fn back_notarisation() -> impl Strategy<Value = NotarisationData> {
    (forward_notarisation(), hash(), hash(), 0u32..=1440).prop_map(
        |(data, tx_hash, mom_mom, mom_mom_depth)| NotarisationData {
            back: Some(BackNotarisation {
                tx_hash,
                mom_mom,
                mom_mom_depth,
            }),
            ..data
        },
    )
}

/// Generate payouts to pay-to-pubkey outputs.
pub fn payouts(max_outputs: usize) -> impl Strategy<Value = Vec<TxOut>> {
    prop::collection::vec(
        (1i64..=1_000_000_000, any::<[u8; 32]>())
            .prop_map(|(value, pk)| TxOut::new(value, Script::pay_to_pubkey(&PublicKey(pk)))),
        1..=max_outputs,
    )
}

/// Parameters for generating a burn transaction.
#[derive(Debug, Clone)]
pub struct BurnParams {
    pub target_symbol: String,
    pub target_cc_id: u32,
    pub payouts: Vec<TxOut>,
    /// Added on top of the payouts to give the burn a fee margin.
    pub fee: i64,
    pub nonce: u32,
}

impl BurnParams {
    pub fn amount(&self) -> i64 {
        self.payouts.iter().map(|out| out.value).sum::<i64>() + self.fee
    }
}

impl Arbitrary for BurnParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            symbol(),
            100u32..=u32::MAX - 1,
            payouts(4),
            0i64..=10_000, // fee
            any::<u32>(),
        )
            .prop_map(|(target_symbol, target_cc_id, payouts, fee, nonce)| BurnParams {
                target_symbol,
                target_cc_id,
                payouts,
                fee,
                nonce,
            })
            .boxed()
    }
}

/// Generate a burn transaction from parameters.
pub fn burn_from_params(params: &BurnParams) -> Transaction {
    burn_transaction(
        params.amount(),
        &params.target_symbol,
        params.target_cc_id,
        &params.payouts,
        params.nonce,
    )
}
