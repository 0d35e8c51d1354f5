//! The node facade: block hooks, proof operations and import validation.
//!
//! The node owns the notarisation index for its chain and keeps it in step
//! with the active chain through [`CrosschainNode::on_block_connected`] and
//! [`CrosschainNode::on_block_disconnected`].

use std::sync::Arc;

use tracing::info;

use crosschain_authority::{scan_block_notarisations, NotaryDirectory};
use crosschain_core::{
    is_import_coin, unmarshal_import_tx, Block, ChainView, NotarisationContext,
    NotarisationsInBlock, Transaction, TxId, TxProof,
};
use crosschain_proof::{complete_import_transaction, get_assetchain_proof, get_cross_chain_proof};
use crosschain_store::{KvStore, NotarisationDb};

use crate::config::ChainParams;
use crate::error::{ImportError, Result};
use crate::targets::{LightClient, OracleSource};
use crate::validator::ImportValidator;

/// Cross-chain state of one chain.
pub struct CrosschainNode<S: KvStore, C: ChainView> {
    params: ChainParams,
    directory: NotaryDirectory,
    db: NotarisationDb<S>,
    chain: Arc<C>,
    light_client: Option<Arc<dyn LightClient>>,
    oracle: Option<Arc<dyn OracleSource>>,
}

impl<S: KvStore, C: ChainView> CrosschainNode<S, C> {
    /// Create a node over `store` for `chain`.
    pub fn new(params: ChainParams, directory: NotaryDirectory, store: S, chain: Arc<C>) -> Result<Self> {
        directory.validate()?;
        Ok(Self {
            params,
            directory,
            db: NotarisationDb::new(store),
            chain,
            light_client: None,
            oracle: None,
        })
    }

    pub fn with_light_client(mut self, light_client: Arc<dyn LightClient>) -> Self {
        self.light_client = Some(light_client);
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn OracleSource>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn directory(&self) -> &NotaryDirectory {
        &self.directory
    }

    pub fn db(&self) -> &NotarisationDb<S> {
        &self.db
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    fn context(&self) -> NotarisationContext {
        if self.params.is_hub {
            NotarisationContext::Hub
        } else {
            NotarisationContext::Assetchain
        }
    }

    /// What connecting `block` adds to the index.
    fn block_effects(&self, block: &Block) -> (NotarisationsInBlock, Vec<TxId>) {
        let notarisations = scan_block_notarisations(
            block,
            &self.directory,
            self.chain.as_ref(),
            self.context(),
            self.params.is_hub,
        );
        let imported = block
            .transactions
            .iter()
            .filter(|tx| is_import_coin(tx))
            .filter_map(|tx| unmarshal_import_tx(tx).ok())
            .map(|payload| payload.burn_tx.txid())
            .collect();
        (notarisations, imported)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Block Hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Index the notarisations and imports of a newly connected block.
    ///
    /// Must run while the block's funding outputs are still visible through
    /// the chain view.
    pub fn on_block_connected(&self, block: &Block) -> Result<()> {
        let (notarisations, imported) = self.block_effects(block);
        self.db
            .connect_block(&block.info.hash, &notarisations, &imported)?;
        if !notarisations.is_empty() {
            info!(
                height = block.info.height,
                count = notarisations.len(),
                "notarisations connected"
            );
        }
        Ok(())
    }

    /// Remove exactly what [`Self::on_block_connected`] added for `block`.
    pub fn on_block_disconnected(&self, block: &Block) -> Result<()> {
        let (notarisations, imported) = self.block_effects(block);
        self.db
            .disconnect_block(&block.info.hash, &notarisations, &imported)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Proof Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Prove a transaction of this chain into its MoM.
    pub fn build_proof(&self, txid: &TxId) -> Result<TxProof> {
        Ok(get_assetchain_proof(
            &self.db,
            self.chain.as_ref(),
            &self.params.symbol,
            txid,
        )?)
    }

    /// Extend a source proof to the MoMoM of `target_symbol`. Runs on the
    /// hub.
    pub fn extend_proof(
        &self,
        txid: &TxId,
        proof: &TxProof,
        target_symbol: &str,
        target_cc_id: u32,
    ) -> Result<TxProof> {
        Ok(get_cross_chain_proof(
            &self.db,
            self.chain.as_ref(),
            txid,
            target_symbol,
            target_cc_id,
            proof,
            0,
        )?)
    }

    /// Rebuild an import around a proof extended on the hub.
    pub fn complete_import(&self, import_tx: &Transaction, height_offset: u32) -> Result<Transaction> {
        Ok(complete_import_transaction(
            &self.db,
            self.chain.as_ref(),
            import_tx,
            height_offset,
        )?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// A validator over this node's state and collaborators.
    pub fn validator(&self) -> ImportValidator<'_, S, C> {
        let mut validator =
            ImportValidator::new(&self.params, &self.directory, &self.db, self.chain.as_ref());
        if let Some(light_client) = &self.light_client {
            validator = validator.with_light_client(light_client.as_ref());
        }
        if let Some(oracle) = &self.oracle {
            validator = validator.with_oracle(oracle.as_ref());
        }
        validator
    }

    pub async fn validate_import(&self, tx: &Transaction) -> std::result::Result<(), ImportError> {
        self.validator().validate(tx).await
    }
}
