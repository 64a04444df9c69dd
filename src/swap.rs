//! Swap orchestration
//!
//! Quote, assemble, sign, and submit in one call. The blockhash window is
//! read after signing and bounds the whole submission.

use std::{future::Future, sync::Arc};

use solana_sdk::{pubkey::Pubkey, signature::Signature, signer::Signer};
use thiserror::Error;
use tracing::info;

use crate::config::{AuxiliaryTransferConfig, Config, QuoteConfig};
use crate::quote_provider::{QuoteError, QuoteProvider, RateProvider, SwapApiClient, SwapRequest};
use crate::rpc_manager::{LedgerRpc, LedgerRpcError};
use crate::submit::{BlockhashWindow, SubmissionConfig, SubmissionError, SubmissionWaiter};
use crate::tx_builder::{assemble, compute_auxiliary_transfer, AssembleError};

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("Quote failed: {0}")]
    Quote(#[from] QuoteError),

    #[error("Assembly failed: {0}")]
    Assemble(#[from] AssembleError),

    #[error("Ledger RPC failed: {0}")]
    Ledger(#[from] LedgerRpcError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl SwapError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Quote(_) => "quote",
            Self::Assemble(e) => e.category(),
            Self::Ledger(_) => "ledger",
            Self::Submission(e) => e.category(),
        }
    }

    /// Whether a fresh attempt (new quote, new blockhash) could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Quote(e) => e.is_retryable(),
            Self::Assemble(e) => e.is_retryable(),
            Self::Ledger(_) => true,
            Self::Submission(e) => e.is_rebuildable(),
        }
    }
}

/// Runs swaps end to end against one quote provider and one ledger
#[derive(Clone)]
pub struct SwapExecutor {
    quotes: Arc<dyn QuoteProvider>,
    rates: Arc<dyn RateProvider>,
    ledger: Arc<dyn LedgerRpc>,
    waiter: SubmissionWaiter,
    quote_config: QuoteConfig,
    auxiliary: AuxiliaryTransferConfig,
    submission: SubmissionConfig,
}

impl SwapExecutor {
    pub fn new(
        quotes: Arc<dyn QuoteProvider>,
        rates: Arc<dyn RateProvider>,
        ledger: Arc<dyn LedgerRpc>,
        config: &Config,
    ) -> Self {
        Self {
            quotes,
            rates,
            waiter: SubmissionWaiter::new(ledger.clone()),
            ledger,
            quote_config: config.quote.clone(),
            auxiliary: config.auxiliary_transfer.clone(),
            submission: config.submission.submission_config(),
        }
    }

    /// Executor backed by the configured swap API
    pub fn from_config(config: &Config, ledger: Arc<dyn LedgerRpc>) -> Result<Self, SwapError> {
        let api = Arc::new(SwapApiClient::from_config(&config.quote)?);
        Ok(Self::new(api.clone(), api, ledger, config))
    }

    /// Swap `amount` of `from` into `to`, paid and signed by `signer`
    pub async fn perform_swap(
        &self,
        from: &Pubkey,
        to: &Pubkey,
        amount: f64,
        signer: &(dyn Signer + Send + Sync),
    ) -> Result<Signature, SwapError> {
        self.perform_swap_until(from, to, amount, signer, std::future::pending::<()>())
            .await
    }

    /// Like [`perform_swap`](Self::perform_swap), abandoning submission once
    /// `shutdown` resolves
    pub async fn perform_swap_until<F>(
        &self,
        from: &Pubkey,
        to: &Pubkey,
        amount: f64,
        signer: &(dyn Signer + Send + Sync),
        shutdown: F,
    ) -> Result<Signature, SwapError>
    where
        F: Future,
    {
        let payer = signer.pubkey();
        let request = SwapRequest::from_config(*from, *to, amount, payer, &self.quote_config);
        let response = self.quotes.get_swap_instructions(&request).await?;

        let auxiliary = compute_auxiliary_transfer(
            amount,
            from,
            &payer,
            &self.auxiliary,
            self.rates.as_ref(),
        )
        .await?;
        let signed = assemble(&response.payload(), signer, auxiliary.as_ref())?;

        let (blockhash, last_valid_block_height) = self
            .ledger
            .get_latest_blockhash(self.submission.commitment)
            .await?;
        let window = BlockhashWindow::new(
            blockhash,
            last_valid_block_height,
            self.submission.last_valid_block_height_buffer,
        );

        info!(
            from = %from,
            to = %to,
            amount,
            signature = %signed.signature(),
            wire_format = ?signed.wire_format(),
            expiry_height = window.expiry_height(),
            "Sending swap transaction"
        );

        let signature = self
            .waiter
            .send_until(signed.as_bytes(), &window, &self.submission, shutdown)
            .await?;
        Ok(signature)
    }

    /// UI balance of `owner`'s `mint` token account, if one exists
    pub async fn token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Option<f64>, SwapError> {
        Ok(self.ledger.get_token_balance(owner, mint).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_delegates() {
        let err = SwapError::from(SubmissionError::Cancelled { attempts: 1 });
        assert_eq!(err.category(), "cancelled");
        assert_eq!(err.to_string(), "Submission cancelled after 1 send attempts");

        let err = SwapError::from(QuoteError::Decode("bad json".to_string()));
        assert_eq!(err.category(), "quote");
    }

    #[test]
    fn test_retryable_delegates() {
        assert!(!SwapError::from(SubmissionError::Cancelled { attempts: 1 }).is_retryable());
        assert!(SwapError::from(SubmissionError::ExpiredBlockhash {
            reason: "block height 900 exceeded expiry height 850".to_string(),
        })
        .is_retryable());
        assert!(SwapError::from(QuoteError::Api {
            status: 429,
            message: "slow down".to_string(),
        })
        .is_retryable());
        assert!(!SwapError::from(AssembleError::Decode("garbage".to_string())).is_retryable());
        assert!(SwapError::from(AssembleError::Pricing("timeout".to_string())).is_retryable());
    }
}
