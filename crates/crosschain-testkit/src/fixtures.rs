//! Test fixtures and helpers.
//!
//! [`TestChain`] wraps a [`CrosschainNode`] over an in-memory chain whose
//! genesis block funds a shared notary set. [`Network`] wires a source
//! chain, the hub and a target chain together so that a burn can travel
//! through notarisation, proof extension and import.

use std::sync::Arc;

use crosschain::{ChainParams, CrosschainNode, Result};
use crosschain_authority::{CrosschainAuthority, NotaryDirectory, NotarySeason};
use crosschain_core::{
    hash256, make_burn_output, make_import_coin_transaction, payouts_hash, serialize,
    BackNotarisation, Block, BlockInfo, BurnDescriptor, ChainView, Hash256, ImportProof, Keypair,
    MemoryChain, NotarisationData, OutPoint, PublicKey, Script, Transaction, TxId, TxIn, TxOut,
};
use crosschain_proof::{calculate_proof_root, compute_mom, NOTARISATION_SCAN_LIMIT_BLOCKS};
use crosschain_store::MemoryStore;

pub const HUB_SYMBOL: &str = "KMD";
pub const SOURCE_SYMBOL: &str = "ASSETA";
pub const TARGET_SYMBOL: &str = "ASSETB";

/// Crosschain id shared by the source and target chains.
pub const CC_ID: u32 = 200;

pub const NOTARY_COUNT: u8 = 3;
pub const REQUIRED_SIGS: usize = 2;

/// MoM depth used by [`Network`] notarisations.
pub const DEFAULT_MOM_DEPTH: u16 = 4;

/// Funding outputs per notary in each genesis block.
const SLOTS_PER_NOTARY: u32 = 64;

const GENESIS_TIME: u32 = 1_700_000_000;
const BLOCK_INTERVAL: u32 = 60;

/// Deterministic notary keys.
pub fn notary_keys() -> Vec<Keypair> {
    (0..NOTARY_COUNT)
        .map(|i| Keypair::from_seed(&[0x10 + i; 32]))
        .collect()
}

/// A single season from genesis run by `keys`.
pub fn notary_directory(keys: &[Keypair]) -> NotaryDirectory {
    NotaryDirectory {
        seasons: vec![NotarySeason {
            start_height: 0,
            start_time: 0,
            authority: CrosschainAuthority {
                notaries: keys.iter().map(Keypair::public_key).collect(),
                required_sigs: REQUIRED_SIGS,
            },
        }],
        ..Default::default()
    }
}

/// A transaction unique to `(symbol, height)`.
pub fn coinbase(symbol: &str, height: u32) -> Transaction {
    Transaction {
        outputs: vec![TxOut::new(
            50,
            Script::from(format!("{symbol}/{height}").into_bytes()),
        )],
        ..Default::default()
    }
}

/// A burn of `amount` towards `target_symbol`, committing to `payouts`.
///
/// `nonce` only makes the transaction unique.
pub fn burn_transaction(
    amount: i64,
    target_symbol: &str,
    target_cc_id: u32,
    payouts: &[TxOut],
    nonce: u32,
) -> Transaction {
    let descriptor = BurnDescriptor {
        target_cc_id,
        target_symbol: target_symbol.to_string(),
        payouts_hash: payouts_hash(payouts),
        raw_proof: Vec::new(),
        token: None,
    };
    Transaction {
        inputs: vec![TxIn::new(OutPoint::new(hash256(&nonce.to_le_bytes()), 0))],
        outputs: vec![make_burn_output(amount, &descriptor)],
        ..Default::default()
    }
}

/// One chain with its node and a funded notary set.
pub struct TestChain {
    pub node: CrosschainNode<MemoryStore, MemoryChain>,
    keys: Vec<Keypair>,
    funding: TxId,
    next_slot: u32,
}

impl TestChain {
    /// Create the chain and mine its genesis block.
    pub fn new(params: ChainParams, keys: &[Keypair]) -> Result<Self> {
        let node = CrosschainNode::new(
            params,
            notary_directory(keys),
            MemoryStore::new(),
            Arc::new(MemoryChain::new()),
        )?;
        let funding = Transaction {
            outputs: keys
                .iter()
                .flat_map(|k| {
                    let script = Script::pay_to_pubkey(&k.public_key());
                    (0..SLOTS_PER_NOTARY).map(move |_| TxOut::new(1, script.clone()))
                })
                .collect(),
            ..Default::default()
        };
        let this = Self {
            node,
            keys: keys.to_vec(),
            funding: funding.txid(),
            next_slot: 0,
        };
        this.mine(vec![funding])?;
        Ok(this)
    }

    pub fn chain(&self) -> &MemoryChain {
        self.node.chain()
    }

    pub fn symbol(&self) -> &str {
        &self.node.params().symbol
    }

    pub fn height(&self) -> u32 {
        self.chain().tip_height().unwrap_or(0)
    }

    pub fn tip(&self) -> Option<BlockInfo> {
        self.chain().block_at(self.height())
    }

    /// Mine a block of a coinbase followed by `transactions`, and index it.
    pub fn mine(&self, transactions: Vec<Transaction>) -> Result<Block> {
        let height = self.chain().tip_height().map_or(0, |h| h + 1);
        let mut txs = vec![coinbase(self.symbol(), height)];
        txs.extend(transactions);
        let block = self
            .chain()
            .push_block(txs, GENESIS_TIME + height * BLOCK_INTERVAL);
        self.node.on_block_connected(&block)?;
        Ok(block)
    }

    pub fn mine_empty(&self, n: u32) -> Result<()> {
        for _ in 0..n {
            self.mine(Vec::new())?;
        }
        Ok(())
    }

    /// Disconnect and drop the tip block.
    pub fn rewind(&self) -> Result<Option<Block>> {
        let Some(block) = self.chain().tip_height().and_then(|h| self.chain().block(h)) else {
            return Ok(None);
        };
        // Unindex while the block's funding is still visible.
        self.node.on_block_disconnected(&block)?;
        self.chain().pop_block();
        Ok(Some(block))
    }

    /// Notarisation data for the tip over the last `depth` blocks.
    pub fn tip_notarisation_data(&self, depth: u16) -> NotarisationData {
        let height = self.height();
        let depth = depth.min(u16::try_from(height + 1).unwrap_or(u16::MAX));
        let params = self.node.params();
        NotarisationData {
            block_hash: self.tip().map_or(Hash256::ZERO, |b| b.hash),
            height,
            symbol: params.symbol.clone(),
            mom: compute_mom(self.chain(), height, depth).unwrap_or(Hash256::ZERO),
            mom_depth: depth,
            cc_id: u16::try_from(params.cc_id).unwrap_or(u16::MAX),
            back: None,
        }
    }

    /// A transaction publishing `data`, funded by the first
    /// [`REQUIRED_SIGS`] notaries of this chain.
    pub fn notarisation_tx(&mut self, data: &NotarisationData) -> Transaction {
        let slot = self.next_slot % SLOTS_PER_NOTARY;
        self.next_slot += 1;
        let inputs = (0..REQUIRED_SIGS as u32)
            .map(|k| TxIn::new(OutPoint::new(self.funding, k * SLOTS_PER_NOTARY + slot)))
            .collect();
        let first = self.keys.first().map(Keypair::public_key).unwrap_or(PublicKey([0; 32]));
        Transaction {
            inputs,
            outputs: vec![
                TxOut::new(0, Script::pay_to_pubkey(&first)),
                TxOut::new(0, Script::op_return(&serialize(data))),
            ],
            ..Default::default()
        }
    }
}

/// Notarise the tip of `chain` on `hub`, then mine the back-notarisation
/// on `chain` carrying the hub's MoMoM for it.
///
/// Returns the hub notarisation txid.
pub fn notarise(hub: &mut TestChain, chain: &mut TestChain, depth: u16) -> Result<TxId> {
    notarise_with(hub, chain, depth, Vec::new())
}

/// [`notarise`], mining `transactions` in the same block as the
/// back-notarisation.
pub fn notarise_with(
    hub: &mut TestChain,
    chain: &mut TestChain,
    depth: u16,
    transactions: Vec<Transaction>,
) -> Result<TxId> {
    let data = chain.tip_notarisation_data(depth);
    let forward = hub.notarisation_tx(&data);
    let block = hub.mine(vec![forward.clone()])?;

    let mom_mom = calculate_proof_root(
        hub.node.db(),
        hub.chain(),
        &data.symbol,
        chain.node.params().cc_id,
        block.info.height,
    )
    .mom_mom()
    .unwrap_or(Hash256::ZERO);

    let back = NotarisationData {
        back: Some(BackNotarisation {
            tx_hash: forward.txid(),
            mom_mom,
            mom_mom_depth: NOTARISATION_SCAN_LIMIT_BLOCKS,
        }),
        ..data
    };
    let back_tx = chain.notarisation_tx(&back);
    let mut txs = vec![back_tx];
    txs.extend(transactions);
    chain.mine(txs)?;
    Ok(forward.txid())
}

/// A burn on the source chain and the payouts it commits to.
#[derive(Clone, Debug)]
pub struct Transfer {
    pub burn_tx: Transaction,
    pub payouts: Vec<TxOut>,
}

impl Transfer {
    pub fn burn_txid(&self) -> TxId {
        self.burn_tx.txid()
    }
}

/// Source, hub and target chains sharing one notary set.
pub struct Network {
    pub keys: Vec<Keypair>,
    pub source: TestChain,
    pub hub: TestChain,
    pub target: TestChain,
    nonce: u32,
}

impl Network {
    /// Three chains, each two blocks past genesis.
    pub fn new() -> Result<Self> {
        let keys = notary_keys();
        let mut hub_params = ChainParams::new(HUB_SYMBOL, 0);
        hub_params.is_hub = true;
        let network = Self {
            source: TestChain::new(ChainParams::new(SOURCE_SYMBOL, CC_ID), &keys)?,
            hub: TestChain::new(hub_params, &keys)?,
            target: TestChain::new(ChainParams::new(TARGET_SYMBOL, CC_ID), &keys)?,
            keys,
            nonce: 0,
        };
        network.source.mine_empty(2)?;
        network.hub.mine_empty(2)?;
        network.target.mine_empty(2)?;
        Ok(network)
    }

    /// Burn `amount` on the source chain, paid in full to `recipient` on
    /// the target.
    pub fn burn(&mut self, amount: i64, recipient: &PublicKey) -> Result<Transfer> {
        let payouts = vec![TxOut::new(amount, Script::pay_to_pubkey(recipient))];
        self.nonce += 1;
        let burn_tx = burn_transaction(amount, TARGET_SYMBOL, CC_ID, &payouts, self.nonce);
        self.source.mine(vec![burn_tx.clone()])?;
        Ok(Transfer { burn_tx, payouts })
    }

    pub fn notarise_source(&mut self) -> Result<TxId> {
        notarise(&mut self.hub, &mut self.source, DEFAULT_MOM_DEPTH)
    }

    pub fn notarise_target(&mut self) -> Result<TxId> {
        notarise(&mut self.hub, &mut self.target, DEFAULT_MOM_DEPTH)
    }

    /// The import as first built on the source chain, proven only up to
    /// the source MoM.
    pub fn source_import(&self, transfer: &Transfer) -> Result<Transaction> {
        let proof = self.source.node.build_proof(&transfer.burn_txid())?;
        Ok(make_import_coin_transaction(
            ImportProof::MerkleBranch(proof),
            transfer.burn_tx.clone(),
            transfer.payouts.clone(),
            0,
        ))
    }

    /// Run a transfer end to end up to the completed import: burn,
    /// notarise the source, build the source proof, notarise the target
    /// and complete the import on the hub.
    pub fn transfer(&mut self, amount: i64, recipient: &PublicKey) -> Result<(Transfer, Transaction)> {
        let transfer = self.burn(amount, recipient)?;
        self.source.mine_empty(1)?;
        self.notarise_source()?;
        let import = self.source_import(&transfer)?;
        self.notarise_target()?;
        let completed = self.hub.node.complete_import(&import, 0)?;
        Ok((transfer, completed))
    }
}
