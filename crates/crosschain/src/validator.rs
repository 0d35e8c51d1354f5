//! The import-coin validator.
//!
//! A candidate import moves through fixed stages: structure, canonical
//! rebuild, replay, amounts, then the target's rules. The first failing
//! predicate decides the rejection tag.

use std::collections::HashSet;
use std::future::Future;

use tracing::{debug, warn};

use crosschain_authority::NotaryLookup;
use crosschain_core::{
    burn_amount, deserialize, make_import_coin_transaction, payouts_hash, unmarshal_burn_tx,
    unmarshal_import_tx, BurnDescriptor, ChainView, ImportPayload, ImportProof, PublicKey,
    Signature, Transaction, TxId, TxOut,
};
use crosschain_proof::{check_mo_mom, ProofError};
use crosschain_store::{KvStore, NotarisationDb};

use crate::approval::check_notaries_approval;
use crate::config::{ChainParams, MIN_FUNGIBLE_CC_ID, WILDCARD_CC_ID};
use crate::error::{ImportError, Rejection};
use crate::migration::check_token_migration;
use crate::targets::{GatewayDepositProof, LightClient, OracleSource, TargetKind};

/// Validates import transactions against one chain's state.
pub struct ImportValidator<'a, S, C: ?Sized> {
    params: &'a ChainParams,
    directory: &'a dyn NotaryLookup,
    db: &'a NotarisationDb<S>,
    chain: &'a C,
    light_client: Option<&'a dyn LightClient>,
    oracle: Option<&'a dyn OracleSource>,
}

impl<'a, S, C> ImportValidator<'a, S, C>
where
    S: KvStore,
    C: ChainView + ?Sized,
{
    pub fn new(
        params: &'a ChainParams,
        directory: &'a dyn NotaryLookup,
        db: &'a NotarisationDb<S>,
        chain: &'a C,
    ) -> Self {
        Self {
            params,
            directory,
            db,
            chain,
            light_client: None,
            oracle: None,
        }
    }

    pub fn with_light_client(mut self, light_client: &'a dyn LightClient) -> Self {
        self.light_client = Some(light_client);
        self
    }

    pub fn with_oracle(mut self, oracle: &'a dyn OracleSource) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Accept or reject `tx` as an import into this chain.
    pub async fn validate(&self, tx: &Transaction) -> Result<(), ImportError> {
        let result = self.run(tx).await;
        match &result {
            Ok(()) => debug!(txid = %tx.txid(), "import valid"),
            Err(e) => debug!(txid = %tx.txid(), error = %e, "import rejected"),
        }
        result
    }

    async fn run(&self, tx: &Transaction) -> Result<(), ImportError> {
        if tx.outputs.len() < 2 {
            return Err(Rejection::TooFewVouts.into());
        }
        let payload = unmarshal_import_tx(tx).map_err(|_| Rejection::InvalidParams)?;
        let burn = unmarshal_burn_tx(&payload.burn_tx).map_err(|_| Rejection::InvalidBurnTx)?;
        let burn_txid = payload.burn_tx.txid();

        if !self.params.exempt_from_canonical_check() {
            let canonical = make_import_coin_transaction(
                payload.proof.clone(),
                payload.burn_tx.clone(),
                payload.payouts.clone(),
                tx.expiry_height,
            );
            if canonical.txid() != tx.txid() {
                return Err(Rejection::NonCanonical.into());
            }
        }

        if self.db.is_imported(&burn_txid) {
            return Err(Rejection::AlreadyImported.into());
        }

        self.check_amounts(tx, &payload, &burn)?;

        if burn.target_cc_id == WILDCARD_CC_ID {
            self.check_wildcard(tx, &payload, &burn).await?;
            Ok(())
        } else {
            self.check_same_network(&payload, &burn, &burn_txid)
        }
    }

    fn check_amounts(
        &self,
        tx: &Transaction,
        payload: &ImportPayload,
        burn: &BurnDescriptor,
    ) -> Result<(), Rejection> {
        let amount = burn_amount(&payload.burn_tx);
        if amount <= 0 {
            return Err(Rejection::InvalidBurnAmount);
        }
        if payouts_hash(&payload.payouts) != burn.payouts_hash {
            return Err(Rejection::WrongPayouts);
        }
        let mut paid = 0i64;
        for out in tx.outputs.iter().filter(|out| !out.is_cc()) {
            if out.value < 0 {
                return Err(Rejection::PayoutTooHighOrTooLow);
            }
            paid = paid
                .checked_add(out.value)
                .ok_or(Rejection::PayoutTooHighOrTooLow)?;
        }
        if paid > amount || paid < amount.saturating_sub(self.params.network_fee) {
            return Err(Rejection::PayoutTooHighOrTooLow);
        }
        if burn.target_cc_id < MIN_FUNGIBLE_CC_ID {
            return Err(Rejection::ChainNotFungible);
        }
        Ok(())
    }

    fn check_same_network(
        &self,
        payload: &ImportPayload,
        burn: &BurnDescriptor,
        burn_txid: &TxId,
    ) -> Result<(), ImportError> {
        if burn.target_cc_id != self.params.cc_id || burn.target_symbol != self.params.symbol {
            return Err(Rejection::WrongChain.into());
        }
        if let Some(migration) = &burn.token {
            check_token_migration(&payload.burn_tx, &payload.payouts, migration)?;
        }

        match &payload.proof {
            ImportProof::MerkleBranch(proof) => {
                let root = proof
                    .branch
                    .exec(burn_txid)
                    .ok_or(Rejection::MoMoMCheckFail)?;
                match check_mo_mom(self.db, self.chain, &proof.notarisation_txid, &root) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(Rejection::MoMoMCheckFail.into()),
                    Err(ProofError::BackNotarisationNotFound(txid)) => Err(
                        ImportError::Indeterminate(format!("no back-notarisation for {txid} yet")),
                    ),
                    Err(e) => {
                        warn!(error = %e, "MoMoM check failed");
                        Err(Rejection::MoMoMCheckFail.into())
                    }
                }
            }
            ImportProof::NotaryTxids(approvals) => {
                if check_notaries_approval(
                    self.chain,
                    self.directory,
                    burn_txid,
                    approvals,
                    self.params.approval_quorum,
                    self.params.is_hub,
                ) {
                    Ok(())
                } else {
                    Err(Rejection::NotariesApprovalCheckFail.into())
                }
            }
        }
    }

    async fn check_wildcard(
        &self,
        tx: &Transaction,
        payload: &ImportPayload,
        burn: &BurnDescriptor,
    ) -> Result<(), Rejection> {
        match TargetKind::from_symbol(&burn.target_symbol) {
            TargetKind::SelfImport => self.check_self_import(&payload.burn_tx),
            kind @ (TargetKind::Beam | TargetKind::Coda | TargetKind::Pegs) => {
                let client = self.light_client.ok_or(Rejection::ExternalCheckFailed)?;
                let verified = self
                    .external(client.verify(&kind, &payload.burn_tx, tx, &burn.raw_proof))
                    .await?;
                if verified {
                    Ok(())
                } else {
                    Err(Rejection::ExternalCheckFailed)
                }
            }
            TargetKind::Gateway(name) => {
                self.check_gateway(&name, &payload.payouts, &burn.raw_proof)
                    .await
            }
        }
    }

    /// The burn's only input must spend an output of the override key and
    /// carry that key's signature.
    fn check_self_import(&self, burn_tx: &Transaction) -> Result<(), Rejection> {
        let key = self
            .params
            .self_import_pubkey
            .ok_or(Rejection::SelfImportNotEnabled)?;
        let [input] = burn_tx.inputs.as_slice() else {
            return Err(Rejection::SelfImportInvalidSigner);
        };
        let funder = self
            .chain
            .spent_output(&input.prevout)
            .and_then(|out| out.script_pubkey.as_pay_to_pubkey());
        if funder != Some(key) {
            return Err(Rejection::SelfImportInvalidSigner);
        }
        let signature = input
            .script_sig
            .single_push()
            .and_then(Signature::from_slice)
            .ok_or(Rejection::SelfImportInvalidSigner)?;
        key.verify(burn_tx.signature_hash().as_bytes(), &signature)
            .map_err(|_| Rejection::SelfImportInvalidSigner)
    }

    async fn check_gateway(
        &self,
        gateway: &str,
        payouts: &[TxOut],
        raw_proof: &[u8],
    ) -> Result<(), Rejection> {
        let oracle = self.oracle.ok_or(Rejection::ExternalCheckFailed)?;
        let proof: GatewayDepositProof =
            deserialize(raw_proof).map_err(|_| Rejection::GatewayInvalidProof)?;
        if !proof.is_self_consistent() {
            return Err(Rejection::GatewayInvalidProof);
        }

        let binding = self.external(oracle.binding(gateway)).await?;
        let reports = self
            .external(oracle.reported_roots(gateway, proof.height))
            .await?;
        let agreeing: HashSet<PublicKey> = reports
            .iter()
            .filter(|(publisher, root)| {
                *root == proof.merkle_root && binding.publishers.contains(publisher)
            })
            .map(|(publisher, _)| *publisher)
            .collect();
        if agreeing.len() < binding.m.max(self.params.min_gateway_publishers) {
            return Err(Rejection::GatewayQuorumNotMet);
        }

        if proof.deposit_address != binding.deposit_address {
            return Err(Rejection::GatewayDepositMismatch);
        }
        let mut paid = payouts
            .iter()
            .filter(|out| !out.is_cc() && !out.script_pubkey.is_op_return())
            .peekable();
        if paid.peek().is_none()
            || !paid.all(|out| out.script_pubkey.as_pay_to_pubkey() == Some(proof.destination))
        {
            return Err(Rejection::GatewayDestinationMismatch);
        }
        Ok(())
    }

    /// Run a collaborator call under the configured timeout. Errors and
    /// timeouts both reject.
    async fn external<T>(
        &self,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, Rejection> {
        match tokio::time::timeout(self.params.external_timeout(), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(error = %e, "external check failed");
                Err(Rejection::ExternalCheckFailed)
            }
            Err(_) => {
                warn!(timeout_ms = self.params.external_timeout_ms, "external check timed out");
                Err(Rejection::ExternalCheckTimeout)
            }
        }
    }
}
