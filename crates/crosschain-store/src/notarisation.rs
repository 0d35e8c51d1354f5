//! The notarisation index.
//!
//! Three keyspaces share one engine:
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `B` | block hash | notarisations in that block |
//! | `T` | forward notarisation txid | the back-notarisation backing it |
//! | `I` | burn txid | block hash of the import that spent it |
//!
//! Every block's records are written and erased in a single batch, so
//! readers always observe the index at a block boundary.

use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crosschain_core::{BlockHash, ChainView, Notarisation, NotarisationsInBlock, TxId};

use crate::error::{Result, StoreError};
use crate::traits::{KvStore, WriteBatch};

const BLOCK_PREFIX: u8 = b'B';
const BACK_PREFIX: u8 = b'T';
const IMPORT_PREFIX: u8 = b'I';

fn key(prefix: u8, id: &[u8; 32]) -> Vec<u8> {
    let mut k = Vec::with_capacity(33);
    k.push(prefix);
    k.extend_from_slice(id);
    k
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Notarisation index over a key-value engine.
pub struct NotarisationDb<S> {
    store: S,
    /// Serialises connect/disconnect.
    writer: Mutex<()>,
}

impl<S: KvStore> NotarisationDb<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// The underlying engine.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read and decode a value. Engine errors and undecodable values are
    /// logged and reported as absent.
    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> Option<T> {
        let bytes = match self.store.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, key = %hex::encode(key), "notarisation index read failed");
                return None;
            }
        };
        match ciborium::from_reader(bytes.as_slice()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, key = %hex::encode(key), "corrupt notarisation index entry");
                None
            }
        }
    }

    pub fn get_block_notarisations(&self, block_hash: &BlockHash) -> Option<NotarisationsInBlock> {
        self.read(&key(BLOCK_PREFIX, block_hash.as_bytes()))
    }

    pub fn put_block_notarisations(
        &self,
        block_hash: &BlockHash,
        notarisations: &NotarisationsInBlock,
    ) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key(BLOCK_PREFIX, block_hash.as_bytes()), encode(notarisations)?);
        self.store.write_batch(batch)
    }

    /// Index a back-notarisation under the forward txid it backs. Forward
    /// notarisations are ignored.
    pub fn put_back_index(&self, notarisation: &Notarisation) -> Result<()> {
        let mut batch = WriteBatch::new();
        add_back_index(&mut batch, notarisation)?;
        self.store.write_batch(batch)
    }

    pub fn get_back_notarisation(&self, forward_txid: &TxId) -> Option<Notarisation> {
        self.read(&key(BACK_PREFIX, forward_txid.as_bytes()))
    }

    /// True once an import spending `burn_txid` is on the active chain.
    pub fn is_imported(&self, burn_txid: &TxId) -> bool {
        self.read::<BlockHash>(&key(IMPORT_PREFIX, burn_txid.as_bytes()))
            .is_some()
    }

    /// Record a connected block's notarisations and imports.
    pub fn connect_block(
        &self,
        block_hash: &BlockHash,
        notarisations: &NotarisationsInBlock,
        imported_burns: &[TxId],
    ) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // One tombstone per burn; a second would be erased with the first.
        for (i, burn) in imported_burns.iter().enumerate() {
            if imported_burns[..i].contains(burn) || self.is_imported(burn) {
                return Err(StoreError::DuplicateImport(*burn));
            }
        }
        let mut batch = WriteBatch::new();
        if !notarisations.is_empty() {
            batch.put(key(BLOCK_PREFIX, block_hash.as_bytes()), encode(notarisations)?);
            for nota in notarisations {
                add_back_index(&mut batch, nota)?;
            }
        }
        let tombstone = encode(block_hash)?;
        for burn in imported_burns {
            batch.put(key(IMPORT_PREFIX, burn.as_bytes()), tombstone.clone());
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.store.write_batch(batch)?;
        info!(
            block = %block_hash,
            notarisations = notarisations.len(),
            imports = imported_burns.len(),
            "indexed block"
        );
        Ok(())
    }

    /// Erase exactly what [`connect_block`](Self::connect_block) wrote for
    /// the same inputs.
    pub fn disconnect_block(
        &self,
        block_hash: &BlockHash,
        notarisations: &NotarisationsInBlock,
        imported_burns: &[TxId],
    ) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut batch = WriteBatch::new();
        if !notarisations.is_empty() {
            batch.delete(key(BLOCK_PREFIX, block_hash.as_bytes()));
            for nota in notarisations {
                if let Some(back) = &nota.data.back {
                    batch.delete(key(BACK_PREFIX, back.tx_hash.as_bytes()));
                }
            }
        }
        for burn in imported_burns {
            batch.delete(key(IMPORT_PREFIX, burn.as_bytes()));
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.store.write_batch(batch)?;
        info!(
            block = %block_hash,
            notarisations = notarisations.len(),
            imports = imported_burns.len(),
            "unindexed block"
        );
        Ok(())
    }

    /// Walk the active chain down from `from_height` for at most `limit`
    /// blocks, never below genesis, and return the first notarisation of
    /// `symbol`.
    pub fn scan_backward<C: ChainView + ?Sized>(
        &self,
        chain: &C,
        from_height: u32,
        symbol: &str,
        limit: u32,
    ) -> Option<(u32, Notarisation)> {
        let tip = chain.tip_height()?;
        if from_height > tip {
            return None;
        }
        for i in 0..limit {
            if i > from_height {
                break;
            }
            let height = from_height - i;
            let Some(block) = chain.block_at(height) else {
                continue;
            };
            if let Some(found) = self
                .get_block_notarisations(&block.hash)
                .and_then(|notas| notas.into_iter().find(|n| n.symbol() == symbol))
            {
                debug!(height, symbol, "found notarisation scanning backward");
                return Some((height, found));
            }
        }
        None
    }

    /// Walk the active chain up from `max(from_height, 1)` through
    /// `from_height + limit - 1`, capped at the tip, and return the first
    /// notarisation matching `predicate`.
    pub fn scan_forward<C, F>(
        &self,
        chain: &C,
        from_height: u32,
        limit: u32,
        mut predicate: F,
    ) -> Option<(u32, Notarisation)>
    where
        C: ChainView + ?Sized,
        F: FnMut(&Notarisation) -> bool,
    {
        let tip = chain.tip_height()?;
        let last = from_height.saturating_add(limit.checked_sub(1)?).min(tip);
        for height in from_height.max(1)..=last {
            let Some(block) = chain.block_at(height) else {
                continue;
            };
            if let Some(found) = self
                .get_block_notarisations(&block.hash)
                .and_then(|notas| notas.into_iter().find(|n| predicate(n)))
            {
                debug!(height, "found notarisation scanning forward");
                return Some((height, found));
            }
        }
        None
    }
}

fn add_back_index(batch: &mut WriteBatch, nota: &Notarisation) -> Result<()> {
    if let Some(back) = &nota.data.back {
        batch.put(key(BACK_PREFIX, back.tx_hash.as_bytes()), encode(nota)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::sqlite::SqliteStore;
    use crosschain_core::{
        BackNotarisation, Hash256, MemoryChain, NotarisationData, Script, Transaction, TxOut,
    };
    use proptest::prelude::*;

    fn nota(tag: u8, symbol: &str, back: bool) -> Notarisation {
        Notarisation::new(
            Hash256::from_bytes([tag; 32]),
            NotarisationData {
                block_hash: Hash256::from_bytes([tag.wrapping_add(1); 32]),
                height: tag as u32,
                symbol: symbol.into(),
                mom: Hash256::from_bytes([tag.wrapping_add(2); 32]),
                mom_depth: 4,
                cc_id: 200,
                back: back.then(|| BackNotarisation {
                    tx_hash: Hash256::from_bytes([tag.wrapping_add(3); 32]),
                    mom_mom: Hash256::from_bytes([tag.wrapping_add(4); 32]),
                    mom_mom_depth: 10,
                }),
            },
        )
    }

    /// A chain of `n` blocks with distinct contents.
    fn chain(n: u32) -> MemoryChain {
        let chain = MemoryChain::new();
        for h in 0..n {
            let tx = Transaction {
                outputs: vec![TxOut::new(h as i64, Script::from(h.to_le_bytes().to_vec()))],
                ..Default::default()
            };
            chain.push_block(vec![tx], 1_000 + h * 60);
        }
        chain
    }

    fn block_hash(chain: &MemoryChain, height: u32) -> BlockHash {
        chain.block_at(height).unwrap().hash
    }

    fn connect_and_disconnect<S: KvStore>(db: NotarisationDb<S>) {
        let hash = Hash256::from_bytes([0xaa; 32]);
        let notas = vec![nota(1, "ASSETA", false), nota(10, "ASSETB", true)];
        let burns = vec![Hash256::from_bytes([0xbb; 32])];

        db.connect_block(&hash, &notas, &burns).unwrap();
        assert_eq!(db.get_block_notarisations(&hash), Some(notas.clone()));
        let backed = notas[1].data.back.as_ref().unwrap().tx_hash;
        assert_eq!(db.get_back_notarisation(&backed), Some(notas[1].clone()));
        assert!(db.is_imported(&burns[0]));

        db.disconnect_block(&hash, &notas, &burns).unwrap();
        assert_eq!(db.get_block_notarisations(&hash), None);
        assert_eq!(db.get_back_notarisation(&backed), None);
        assert!(!db.is_imported(&burns[0]));
        assert!(db.store().scan_prefix(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_connect_disconnect_memory() {
        connect_and_disconnect(NotarisationDb::new(MemoryStore::new()));
    }

    #[test]
    fn test_connect_disconnect_sqlite() {
        connect_and_disconnect(NotarisationDb::new(SqliteStore::open_memory().unwrap()));
    }

    #[test]
    fn test_duplicate_import_rejected() {
        let db = NotarisationDb::new(MemoryStore::new());
        let burn = Hash256::from_bytes([0xbb; 32]);
        let first = Hash256::from_bytes([0xa1; 32]);
        let second = Hash256::from_bytes([0xa2; 32]);

        let err = db.connect_block(&first, &Vec::new(), &[burn, burn]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateImport(b) if b == burn));
        assert!(db.store().is_empty());

        db.connect_block(&first, &Vec::new(), &[burn]).unwrap();
        let err = db.connect_block(&second, &Vec::new(), &[burn]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateImport(_)));

        db.disconnect_block(&first, &Vec::new(), &[burn]).unwrap();
        assert!(!db.is_imported(&burn));
        db.connect_block(&second, &Vec::new(), &[burn]).unwrap();
        assert!(db.is_imported(&burn));
    }

    #[test]
    fn test_corrupt_entry_key_logged_as_hex() {
        let db = NotarisationDb::new(MemoryStore::new());
        let txid = Hash256::from_bytes([0x5a; 32]);
        let k = key(BACK_PREFIX, txid.as_bytes());
        assert_eq!(hex::encode(&k), format!("54{}", "5a".repeat(32)));
        db.store().put(&k, b"not cbor").unwrap();
        assert_eq!(db.get_back_notarisation(&txid), None);
    }

    #[test]
    fn test_empty_block_writes_nothing() {
        let db = NotarisationDb::new(MemoryStore::new());
        db.connect_block(&Hash256::ZERO, &Vec::new(), &[]).unwrap();
        assert!(db.store().is_empty());
    }

    #[test]
    fn test_forward_notarisation_not_back_indexed() {
        let db = NotarisationDb::new(MemoryStore::new());
        db.put_back_index(&nota(1, "ASSETA", false)).unwrap();
        assert!(db.store().is_empty());
    }

    #[test]
    fn test_corrupt_entry_reads_as_absent() {
        let db = NotarisationDb::new(MemoryStore::new());
        let hash = Hash256::from_bytes([5; 32]);
        db.store()
            .put(&key(BLOCK_PREFIX, hash.as_bytes()), &[0xff, 0x00, 0x13])
            .unwrap();
        assert_eq!(db.get_block_notarisations(&hash), None);
    }

    #[test]
    fn test_scan_backward_limit_boundary() {
        let chain = chain(30);
        let db = NotarisationDb::new(MemoryStore::new());
        // Notarisation at height 11; scanning down from 20 with limit 10
        // visits heights 20..=11.
        db.put_block_notarisations(&block_hash(&chain, 11), &vec![nota(1, "ASSETA", false)])
            .unwrap();
        assert_eq!(db.scan_backward(&chain, 20, "ASSETA", 10).map(|(h, _)| h), Some(11));
        assert_eq!(db.scan_backward(&chain, 21, "ASSETA", 10), None);
        assert_eq!(db.scan_backward(&chain, 20, "ASSETB", 10), None);
    }

    #[test]
    fn test_scan_backward_stops_at_genesis_and_tip() {
        let chain = chain(5);
        let db = NotarisationDb::new(MemoryStore::new());
        db.put_block_notarisations(&block_hash(&chain, 0), &vec![nota(1, "ASSETA", false)])
            .unwrap();
        assert_eq!(db.scan_backward(&chain, 3, "ASSETA", 100).map(|(h, _)| h), Some(0));
        assert_eq!(db.scan_backward(&chain, 5, "ASSETA", 100), None);
    }

    #[test]
    fn test_scan_forward_includes_tip_and_skips_genesis() {
        let chain = chain(8);
        let db = NotarisationDb::new(MemoryStore::new());
        db.put_block_notarisations(&block_hash(&chain, 0), &vec![nota(1, "ASSETA", false)])
            .unwrap();
        db.put_block_notarisations(&block_hash(&chain, 7), &vec![nota(2, "ASSETA", false)])
            .unwrap();

        let found = db.scan_forward(&chain, 0, 100, |n| n.symbol() == "ASSETA");
        assert_eq!(found.map(|(h, n)| (h, n.txid)), Some((7, Hash256::from_bytes([2; 32]))));
        // Limit 3 from height 5 visits 5, 6, 7.
        assert!(db.scan_forward(&chain, 5, 3, |_| true).is_some());
        assert!(db.scan_forward(&chain, 4, 3, |_| true).is_none());
        assert!(db.scan_forward(&chain, 5, 0, |_| true).is_none());
    }

    #[test]
    fn test_scan_forward_predicate_sees_block_order() {
        let chain = chain(4);
        let db = NotarisationDb::new(MemoryStore::new());
        db.put_block_notarisations(
            &block_hash(&chain, 2),
            &vec![nota(1, "ASSETB", false), nota(2, "ASSETA", false), nota(3, "ASSETA", false)],
        )
        .unwrap();
        let (_, found) = db.scan_forward(&chain, 1, 10, |n| n.symbol() == "ASSETA").unwrap();
        assert_eq!(found.txid, Hash256::from_bytes([2; 32]));
    }

    proptest! {
        #[test]
        fn prop_disconnect_undoes_connect(
            tags in prop::collection::btree_set(any::<u8>(), 0..12),
            backs in prop::collection::vec(any::<bool>(), 12),
            burns in prop::collection::btree_set(any::<[u8; 32]>(), 0..4),
        ) {
            let db = NotarisationDb::new(MemoryStore::new());
            let notas: Vec<Notarisation> = tags
                .iter()
                .zip(&backs)
                .map(|(&tag, &back)| nota(tag, "ASSETA", back))
                .collect();
            let burns: Vec<TxId> = burns.into_iter().map(Hash256::from_bytes).collect();
            let hash = Hash256::from_bytes([0xee; 32]);

            db.connect_block(&hash, &notas, &burns).unwrap();
            for burn in &burns {
                prop_assert!(db.is_imported(burn));
            }
            db.disconnect_block(&hash, &notas, &burns).unwrap();
            prop_assert!(db.store().is_empty());
        }
    }
}
