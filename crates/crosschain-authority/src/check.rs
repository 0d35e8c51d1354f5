//! Threshold check over a transaction's inputs.

use crosschain_core::{ChainView, Transaction};

use crate::directory::{CrosschainAuthority, MAX_NOTARIES};

/// Whether `tx` was signed by enough distinct notaries of `authority`.
///
/// Every input must spend a pay-to-pubkey output whose key belongs to the
/// authority, no notary may fund two inputs, and there must be at least
/// `required_sigs` inputs.
pub fn check_tx_authority(
    tx: &Transaction,
    authority: &CrosschainAuthority,
    chain: &dyn ChainView,
) -> bool {
    if tx.inputs.len() < authority.required_sigs {
        return false;
    }
    let mut seen = [false; MAX_NOTARIES];

    for input in &tx.inputs {
        let Some(spent) = chain.spent_output(&input.prevout) else {
            return false;
        };
        let Some(pk) = spent.script_pubkey.as_pay_to_pubkey() else {
            return false;
        };
        // A key counts once however many slots carry it.
        let Some(slot) = authority
            .notaries
            .iter()
            .take(MAX_NOTARIES)
            .position(|notary| *notary == pk)
        else {
            return false;
        };
        if seen[slot] {
            return false;
        }
        seen[slot] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosschain_core::{Keypair, MemoryChain, OutPoint, Script, TxIn, TxOut};
    use proptest::prelude::*;

    fn notaries(n: u8) -> Vec<Keypair> {
        (0..n).map(|i| Keypair::from_seed(&[i + 1; 32])).collect()
    }

    /// Chain with one funding block paying each key, returns the funding tx.
    fn fund(chain: &MemoryChain, keys: &[Keypair]) -> Transaction {
        let funding = Transaction {
            outputs: keys
                .iter()
                .map(|k| TxOut::new(10, Script::pay_to_pubkey(&k.public_key())))
                .collect(),
            ..Default::default()
        };
        chain.push_block(vec![funding.clone()], 1_000);
        funding
    }

    fn spending(funding: &Transaction, vouts: &[u32]) -> Transaction {
        Transaction {
            inputs: vouts
                .iter()
                .map(|&v| TxIn::new(OutPoint::new(funding.txid(), v)))
                .collect(),
            ..Default::default()
        }
    }

    fn authority(keys: &[Keypair], required: usize) -> CrosschainAuthority {
        CrosschainAuthority::new(keys.iter().map(Keypair::public_key).collect(), required).unwrap()
    }

    #[test]
    fn test_threshold_met() {
        let chain = MemoryChain::new();
        let keys = notaries(4);
        let funding = fund(&chain, &keys);
        let auth = authority(&keys, 2);

        assert!(check_tx_authority(&spending(&funding, &[0, 3]), &auth, &chain));
        assert!(check_tx_authority(&spending(&funding, &[2, 1, 0]), &auth, &chain));
        assert!(!check_tx_authority(&spending(&funding, &[1]), &auth, &chain));
    }

    #[test]
    fn test_rejects_outsider_and_unknown_inputs() {
        let chain = MemoryChain::new();
        let keys = notaries(3);
        let funding = fund(&chain, &keys);
        let auth = authority(&keys[..2], 2);

        // vout 2 pays a key outside the authority.
        assert!(!check_tx_authority(&spending(&funding, &[0, 2]), &auth, &chain));
        // vout 9 does not exist.
        assert!(!check_tx_authority(&spending(&funding, &[0, 9]), &auth, &chain));
    }

    #[test]
    fn test_rejects_non_p2pk_input() {
        let chain = MemoryChain::new();
        let keys = notaries(2);
        let funding = fund(&chain, &keys);
        let other = Transaction {
            outputs: vec![TxOut::new(10, Script::op_return(b"x"))],
            lock_time: 1,
            ..Default::default()
        };
        chain.push_block(vec![other.clone()], 1_060);
        let mut tx = spending(&funding, &[0]);
        tx.inputs.push(TxIn::new(OutPoint::new(other.txid(), 0)));
        assert!(!check_tx_authority(&tx, &authority(&keys, 2), &chain));
    }

    #[test]
    fn test_duplicated_key_counts_once() {
        let chain = MemoryChain::new();
        let key = notaries(1).remove(0);
        let funding = fund(&chain, &[key.clone(), key.clone()]);
        // Built without `new`, so the duplicate is never validated away.
        let auth = CrosschainAuthority {
            notaries: vec![key.public_key(), key.public_key()],
            required_sigs: 2,
        };
        assert!(!check_tx_authority(&spending(&funding, &[0, 1]), &auth, &chain));
    }

    proptest! {
        #[test]
        fn prop_reused_notary_rejected(n in 2u8..8, reused in 0u8..8, required in 1usize..3) {
            let reused = (reused % n) as u32;
            let chain = MemoryChain::new();
            let keys = notaries(n);
            let auth = authority(&keys, required.min(n as usize));
            // Two outputs paying the same notary.
            let mut funding = Transaction {
                outputs: keys
                    .iter()
                    .map(|k| TxOut::new(10, Script::pay_to_pubkey(&k.public_key())))
                    .collect(),
                ..Default::default()
            };
            funding
                .outputs
                .push(TxOut::new(10, Script::pay_to_pubkey(&keys[reused as usize].public_key())));
            chain.push_block(vec![funding.clone()], 1_000);

            let tx = spending(&funding, &[reused, n as u32]);
            prop_assert!(!check_tx_authority(&tx, &auth, &chain));
        }
    }
}
