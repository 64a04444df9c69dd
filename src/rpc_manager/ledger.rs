//! Ledger RPC boundary
//!
//! [`LedgerRpc`] is the slice of the JSON-RPC surface the submitter needs.
//! It is implemented for the nonblocking `RpcClient`, which is safe to share
//! between concurrent submissions behind an `Arc`.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_client::{
    nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig,
    rpc_request::TokenAccountsFilter,
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::{TransactionConfirmationStatus, UiTransactionEncoding};
use tracing::debug;

use super::rpc_errors::LedgerRpcError;

/// Named confirmation depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    /// Equivalent RPC commitment
    pub fn commitment_config(self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.commitment_level(),
        }
    }

    fn commitment_level(self) -> CommitmentLevel {
        match self {
            Self::Processed => CommitmentLevel::Processed,
            Self::Confirmed => CommitmentLevel::Confirmed,
            Self::Finalized => CommitmentLevel::Finalized,
        }
    }
}

impl From<TransactionConfirmationStatus> for ConfirmationLevel {
    fn from(status: TransactionConfirmationStatus) -> Self {
        match status {
            TransactionConfirmationStatus::Processed => Self::Processed,
            TransactionConfirmationStatus::Confirmed => Self::Confirmed,
            TransactionConfirmationStatus::Finalized => Self::Finalized,
        }
    }
}

/// `sendTransaction` options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Skip preflight simulation
    pub skip_preflight: bool,
    /// Commitment used for preflight, RPC default when `None`
    pub preflight_commitment: Option<ConfirmationLevel>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: true,
            preflight_commitment: None,
        }
    }
}

/// Status of a submitted signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// Slot the transaction was processed in
    pub slot: u64,
    /// Confirmation depth reached so far
    pub confirmation_status: ConfirmationLevel,
    /// Ledger execution error, if the transaction failed on chain
    pub err: Option<String>,
}

impl SignatureStatus {
    /// Whether the status is at or beyond `target`
    pub fn reached(&self, target: ConfirmationLevel) -> bool {
        self.confirmation_status >= target
    }
}

/// Ledger RPC interface
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Submit serialized transaction bytes, returning the transaction id
    async fn send_raw_transaction(
        &self,
        tx_bytes: &[u8],
        options: &SendOptions,
    ) -> Result<Signature, LedgerRpcError>;

    /// Status of `signature`, `None` while the ledger has not seen it
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, LedgerRpcError>;

    /// Latest blockhash and its last valid block height
    async fn get_latest_blockhash(
        &self,
        commitment: ConfirmationLevel,
    ) -> Result<(Hash, u64), LedgerRpcError>;

    /// Current block height
    async fn get_block_height(&self) -> Result<u64, LedgerRpcError>;

    /// UI balance of `owner`'s first token account for `mint`
    async fn get_token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<f64>, LedgerRpcError>;
}

/// Build a shared nonblocking RPC client
pub fn connect(url: &str, timeout: Duration, commitment: ConfirmationLevel) -> Arc<RpcClient> {
    Arc::new(RpcClient::new_with_timeout_and_commitment(
        url.to_string(),
        timeout,
        commitment.commitment_config(),
    ))
}

#[async_trait]
impl LedgerRpc for RpcClient {
    async fn send_raw_transaction(
        &self,
        tx_bytes: &[u8],
        options: &SendOptions,
    ) -> Result<Signature, LedgerRpcError> {
        let tx: VersionedTransaction = bincode::deserialize(tx_bytes)
            .map_err(|e| LedgerRpcError::transport(format!("undecodable transaction bytes: {e}")))?;

        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: options.preflight_commitment.map(|c| c.commitment_level()),
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSendTransactionConfig::default()
        };

        let signature = self.send_transaction_with_config(&tx, config).await?;
        debug!(signature = %signature, "sendTransaction accepted");
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, LedgerRpcError> {
        let response = self.get_signature_statuses(&[*signature]).await?;
        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                slot: status.slot,
                confirmation_status: status.confirmation_status().into(),
                err: status.err.map(|err| err.to_string()),
            }))
    }

    async fn get_latest_blockhash(
        &self,
        commitment: ConfirmationLevel,
    ) -> Result<(Hash, u64), LedgerRpcError> {
        Ok(self
            .get_latest_blockhash_with_commitment(commitment.commitment_config())
            .await?)
    }

    async fn get_block_height(&self) -> Result<u64, LedgerRpcError> {
        Ok(RpcClient::get_block_height(self).await?)
    }

    async fn get_token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<f64>, LedgerRpcError> {
        let accounts = self
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(*mint))
            .await?;
        let Some(account) = accounts.first() else {
            return Ok(None);
        };
        let pubkey = account
            .pubkey
            .parse::<Pubkey>()
            .map_err(|e| LedgerRpcError::transport(format!("bad token account pubkey: {e}")))?;

        let balance = self.get_token_account_balance(&pubkey).await?;
        Ok(balance.ui_amount)
    }
}
