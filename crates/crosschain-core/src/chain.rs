//! Read access to the active chain.
//!
//! Notarisation scanning, proof construction and validation only ever read
//! the chain. [`ChainView`] is the narrow surface they need; the node that
//! owns the chain implements it.

use crate::transaction::{BlockInfo, OutPoint, Transaction, TxOut};
use crate::types::{BlockHash, TxId};

/// The active chain as seen by this subsystem.
pub trait ChainView: Send + Sync {
    /// Height of the tip, or `None` for an empty chain.
    fn tip_height(&self) -> Option<u32>;

    /// Block at `height` on the active chain.
    fn block_at(&self, height: u32) -> Option<BlockInfo>;

    /// Block by hash, if it is on the active chain.
    fn block_by_hash(&self, hash: &BlockHash) -> Option<BlockInfo>;

    /// Transaction ids of a block in position order.
    fn block_txids(&self, hash: &BlockHash) -> Option<Vec<TxId>>;

    /// A transaction and the block confirming it; `None` for the block
    /// while it is only in the mempool.
    fn transaction(&self, txid: &TxId) -> Option<(Transaction, Option<BlockInfo>)>;

    /// The output an input spends.
    fn spent_output(&self, outpoint: &OutPoint) -> Option<TxOut> {
        let (tx, _) = self.transaction(&outpoint.txid)?;
        tx.outputs.get(outpoint.vout as usize).cloned()
    }
}

pub mod memory {
    //! In-memory chain for tests and fixtures.

    use std::collections::HashMap;
    use std::sync::{PoisonError, RwLock};

    use super::ChainView;
    use crate::codec::Encoder;
    use crate::crypto::hash256;
    use crate::transaction::{block_merkle_root, Block, BlockInfo, Transaction};
    use crate::types::{BlockHash, Hash256, TxId};

    #[derive(Default)]
    struct ChainState {
        blocks: Vec<Block>,
        heights: HashMap<BlockHash, u32>,
        confirmed: HashMap<TxId, (u32, usize)>,
        mempool: HashMap<TxId, Transaction>,
    }

    /// A chain held in memory. Thread-safe via RwLock.
    #[derive(Default)]
    pub struct MemoryChain {
        inner: RwLock<ChainState>,
    }

    impl MemoryChain {
        pub fn new() -> Self {
            Self::default()
        }

        /// Append a block and return it.
        pub fn push_block(&self, transactions: Vec<Transaction>, time: u32) -> Block {
            let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let height = state.blocks.len() as u32;
            let prev = state.blocks.last().map_or(Hash256::ZERO, |b| b.info.hash);
            let merkle_root = block_merkle_root(&transactions);

            let mut header = Encoder::new();
            header.write_hash(&prev);
            header.write_hash(&merkle_root);
            header.write_u32(height);
            header.write_u32(time);
            let info = BlockInfo {
                hash: hash256(&header.into_bytes()),
                height,
                time,
                merkle_root,
            };

            for (pos, tx) in transactions.iter().enumerate() {
                let txid = tx.txid();
                state.mempool.remove(&txid);
                state.confirmed.insert(txid, (height, pos));
            }
            state.heights.insert(info.hash, height);
            let block = Block { info, transactions };
            state.blocks.push(block.clone());
            block
        }

        /// Remove the tip block, returning it.
        pub fn pop_block(&self) -> Option<Block> {
            let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let block = state.blocks.pop()?;
            state.heights.remove(&block.info.hash);
            for tx in &block.transactions {
                state.confirmed.remove(&tx.txid());
            }
            Some(block)
        }

        pub fn add_to_mempool(&self, tx: Transaction) {
            let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            state.mempool.insert(tx.txid(), tx);
        }

        /// Full block at `height`.
        pub fn block(&self, height: u32) -> Option<Block> {
            let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            state.blocks.get(height as usize).cloned()
        }
    }

    impl ChainView for MemoryChain {
        fn tip_height(&self) -> Option<u32> {
            let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            state.blocks.len().checked_sub(1).map(|h| h as u32)
        }

        fn block_at(&self, height: u32) -> Option<BlockInfo> {
            let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            state.blocks.get(height as usize).map(|b| b.info)
        }

        fn block_by_hash(&self, hash: &BlockHash) -> Option<BlockInfo> {
            let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            let height = *state.heights.get(hash)?;
            state.blocks.get(height as usize).map(|b| b.info)
        }

        fn block_txids(&self, hash: &BlockHash) -> Option<Vec<TxId>> {
            let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            let height = *state.heights.get(hash)?;
            state.blocks.get(height as usize).map(Block::txids)
        }

        fn transaction(&self, txid: &TxId) -> Option<(Transaction, Option<BlockInfo>)> {
            let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&(height, pos)) = state.confirmed.get(txid) {
                let block = state.blocks.get(height as usize)?;
                return Some((block.transactions.get(pos)?.clone(), Some(block.info)));
            }
            state.mempool.get(txid).map(|tx| (tx.clone(), None))
        }
    }

}
