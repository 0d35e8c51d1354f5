//! Shared helpers for unit tests.

use crosschain_core::{
    BackNotarisation, Hash256, MemoryChain, Notarisation, NotarisationData, Script, Transaction,
    TxOut,
};
use crosschain_store::{KvStore, NotarisationDb};

/// A transaction unique to `tag`.
pub fn coinbase(tag: u32) -> Transaction {
    Transaction {
        outputs: vec![TxOut::new(50, Script::from(tag.to_le_bytes().to_vec()))],
        ..Default::default()
    }
}

/// A chain of `n` blocks, each holding one distinct coinbase.
pub fn hub_with_blocks(n: u32) -> MemoryChain {
    let chain = MemoryChain::new();
    for h in 0..n {
        chain.push_block(vec![coinbase(h)], 1_000 + h * 60);
    }
    chain
}

/// A forward notarisation with txid and MoM filled with the given bytes.
pub fn forward(symbol: &str, cc_id: u16, txid: u8, mom: u8) -> Notarisation {
    Notarisation::new(
        Hash256::from_bytes([txid; 32]),
        NotarisationData {
            block_hash: Hash256::from_bytes([0xbb; 32]),
            height: 1,
            symbol: symbol.into(),
            mom: Hash256::from_bytes([mom; 32]),
            mom_depth: 4,
            cc_id,
            back: None,
        },
    )
}

/// A back-notarisation of `symbol` backing the hub notarisation `tx_hash`.
pub fn back(
    txid: Hash256,
    symbol: &str,
    height: u32,
    mom: Hash256,
    mom_depth: u16,
    tx_hash: Hash256,
    mom_mom: Hash256,
) -> Notarisation {
    Notarisation::new(
        txid,
        NotarisationData {
            block_hash: Hash256::from_bytes([0xcc; 32]),
            height,
            symbol: symbol.into(),
            mom,
            mom_depth,
            cc_id: 200,
            back: Some(BackNotarisation {
                tx_hash,
                mom_mom,
                mom_mom_depth: 0,
            }),
        },
    )
}

/// Record `notas` as the notarisations of the block at `height`.
pub fn index<S: KvStore>(db: &NotarisationDb<S>, chain: &MemoryChain, height: u32, notas: Vec<Notarisation>) {
    use crosschain_core::ChainView;
    let block = chain.block_at(height).expect("block exists");
    db.connect_block(&block.hash, &notas, &[]).expect("connect");
}
