//! Notarisation detection at block connect.
//!
//! Detection is a pure function of the block, the chain it extends and the
//! notary directory, so disconnect can recompute exactly what connect wrote.

use tracing::{debug, warn};

use crosschain_core::{
    parse_notarisation_op_return, Block, ChainView, Notarisation, NotarisationContext,
    NotarisationsInBlock, Transaction,
};

use crate::check::check_tx_authority;
use crate::directory::{CrosschainAuthority, NotaryLookup};
use crate::family::{authority_for_symbol, staked_class, StakedClass};

/// The authority that must have signed a notarisation of `symbol` confirmed
/// at (`height`, `timestamp`). Banned chains have none.
pub fn authority_for_notarisation<'a>(
    lookup: &'a dyn NotaryLookup,
    symbol: &str,
    height: u32,
    timestamp: u32,
    is_hub: bool,
) -> Option<&'a CrosschainAuthority> {
    if staked_class(symbol) == Some(StakedClass::Banned) {
        return None;
    }
    lookup.authority_for(authority_for_symbol(symbol), height, timestamp, is_hub)
}

/// Every authorised notarisation in `block`, in transaction order.
pub fn scan_block_notarisations(
    block: &Block,
    lookup: &dyn NotaryLookup,
    chain: &dyn ChainView,
    context: NotarisationContext,
    is_hub: bool,
) -> NotarisationsInBlock {
    let height = block.info.height;
    let time = block.info.time;
    let mut found = Vec::new();

    for tx in &block.transactions {
        let data = match parse_notarisation_op_return(tx, context) {
            Ok(data) => data,
            Err(e) => {
                warn_if_notary_signed(tx, lookup, chain, height, time, is_hub, &e);
                continue;
            }
        };
        if data.symbol.is_empty() {
            continue;
        }
        let Some(authority) = authority_for_notarisation(lookup, &data.symbol, height, time, is_hub)
        else {
            debug!(symbol = %data.symbol, height, "no authority for notarisation");
            continue;
        };
        if !check_tx_authority(tx, authority, chain) {
            continue;
        }
        let txid = tx.txid();
        debug!(%txid, symbol = %data.symbol, height, back = data.is_back(), "found notarisation");
        found.push(Notarisation::new(txid, data));
    }
    found
}

/// A payload that fails to parse is ignored, but it is worth a warning when
/// the hub notaries signed it.
fn warn_if_notary_signed(
    tx: &Transaction,
    lookup: &dyn NotaryLookup,
    chain: &dyn ChainView,
    height: u32,
    time: u32,
    is_hub: bool,
    error: &crosschain_core::CoreError,
) {
    if tx.outputs.len() < 2 || !tx.outputs[1].script_pubkey.is_op_return() {
        return;
    }
    let Some(authority) = lookup.notaries_for_height_and_time(height, time, is_hub) else {
        return;
    };
    if check_tx_authority(tx, authority, chain) {
        warn!(txid = %tx.txid(), height, %error, "unparseable notarisation from notaries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{CrosschainAuthority, EraWindow, NotaryDirectory, NotarySeason};
    use crosschain_core::{
        serialize, Hash256, Keypair, MemoryChain, NotarisationData, OutPoint, Script, TxIn, TxOut,
    };

    struct Fixture {
        chain: MemoryChain,
        keys: Vec<Keypair>,
        funding: Transaction,
        directory: NotaryDirectory,
    }

    fn fixture() -> Fixture {
        let keys: Vec<Keypair> = (0..6).map(|i| Keypair::from_seed(&[i + 1; 32])).collect();
        let pks: Vec<_> = keys.iter().map(Keypair::public_key).collect();
        let chain = MemoryChain::new();
        let funding = Transaction {
            outputs: pks
                .iter()
                .flat_map(|pk| {
                    (0..4).map(move |_| TxOut::new(10, Script::pay_to_pubkey(pk)))
                })
                .collect(),
            ..Default::default()
        };
        chain.push_block(vec![funding.clone()], 1_000);
        let directory = NotaryDirectory {
            seasons: vec![NotarySeason {
                start_height: 0,
                start_time: 0,
                authority: CrosschainAuthority::new(pks[..3].to_vec(), 2).unwrap(),
            }],
            staked_eras: EraWindow::from_cutovers(
                &[1_500],
                vec![CrosschainAuthority::new(pks[3..].to_vec(), 2).unwrap()],
            )
            .unwrap(),
            txscl: None,
        };
        Fixture {
            chain,
            keys,
            funding,
            directory,
        }
    }

    fn forward(symbol: &str, height: u32) -> NotarisationData {
        NotarisationData {
            block_hash: Hash256::from_bytes([height as u8; 32]),
            height,
            symbol: symbol.into(),
            mom: Hash256::from_bytes([9; 32]),
            mom_depth: 4,
            cc_id: 200,
            back: None,
        }
    }

    /// Notarisation signed by notaries `signers`; each output of the
    /// funding tx pays key `vout / 4`.
    fn nota(fx: &Fixture, signers: &[usize], nonce: u32, data: &NotarisationData) -> Transaction {
        Transaction {
            inputs: signers
                .iter()
                .map(|&k| TxIn::new(OutPoint::new(fx.funding.txid(), (k * 4) as u32 + nonce)))
                .collect(),
            outputs: vec![
                TxOut::new(0, Script::pay_to_pubkey(&fx.keys[0].public_key())),
                TxOut::new(0, Script::op_return(&serialize(data))),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_detects_authorised_notarisations_in_order() {
        let fx = fixture();
        let a = nota(&fx, &[0, 1], 0, &forward("ASSETA", 10));
        let b = nota(&fx, &[2, 0], 1, &forward("ASSETB", 11));
        let block = fx.chain.push_block(vec![a.clone(), b.clone()], 1_060);

        let found = scan_block_notarisations(
            &block,
            &fx.directory,
            &fx.chain,
            NotarisationContext::Hub,
            true,
        );
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].txid, a.txid());
        assert_eq!(found[1].symbol(), "ASSETB");
    }

    #[test]
    fn test_skips_unsigned_and_malformed() {
        let fx = fixture();
        let single = nota(&fx, &[0], 0, &forward("ASSETA", 10));
        let staked_signers = nota(&fx, &[3, 4], 0, &forward("ASSETA", 10));
        let mut malformed = nota(&fx, &[0, 1], 1, &forward("ASSETA", 10));
        malformed.outputs[1] = TxOut::new(0, Script::op_return(&[1, 2, 3]));
        let block = fx
            .chain
            .push_block(vec![single, staked_signers, malformed], 1_060);

        let found = scan_block_notarisations(
            &block,
            &fx.directory,
            &fx.chain,
            NotarisationContext::Hub,
            true,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_staked_family_uses_era_by_block_time() {
        let fx = fixture();
        let labs = nota(&fx, &[3, 4], 0, &forward("LABSTH", 10));
        let in_era = fx.chain.push_block(vec![labs.clone()], 1_200);
        let found = scan_block_notarisations(
            &in_era,
            &fx.directory,
            &fx.chain,
            NotarisationContext::Hub,
            true,
        );
        assert_eq!(found.len(), 1);

        // After the last cut-over no staked era applies.
        fx.chain.pop_block();
        let late = fx.chain.push_block(vec![labs], 1_600);
        let found = scan_block_notarisations(
            &late,
            &fx.directory,
            &fx.chain,
            NotarisationContext::Hub,
            true,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_banned_symbol_never_authorised() {
        let fx = fixture();
        assert!(authority_for_notarisation(&fx.directory, "THIS_CHAIN_IS_BANNED", 1, 1_200, true)
            .is_none());
        assert!(authority_for_notarisation(&fx.directory, "LABSTH", 1, 1_200, true).is_some());
        assert!(authority_for_notarisation(&fx.directory, "TXSCL1", 1, 1_200, true).is_none());
    }
}
