//! Send-and-confirm loop
//!
//! One [`SubmissionWaiter::send`] call drives one signed transaction to a
//! terminal outcome. The loop alternates between sending the same bytes and
//! polling their status, and stops on confirmation, a ledger rejection,
//! blockhash expiry, or an exhausted retry budget.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use solana_sdk::signature::Signature;
use tokio::time::{sleep, Instant};

use super::{BlockhashWindow, SubmissionConfig, SubmissionError};
use crate::rpc_manager::{LedgerRpc, LedgerRpcError};
use crate::structured_logging::SubmissionLogger;

/// Result of one submission
pub type SubmissionOutcome = Result<Signature, SubmissionError>;

/// How a confirmation poll ended without success
enum PollFailure {
    /// Hand back to the retry decision
    Transport(LedgerRpcError),
    /// Stop the submission
    Terminal(SubmissionError),
}

/// Sends signed transactions and waits for them to land
///
/// Cheap to clone; concurrent `send` calls share only the RPC handle.
#[derive(Clone)]
pub struct SubmissionWaiter {
    rpc: Arc<dyn LedgerRpc>,
}

impl SubmissionWaiter {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self { rpc }
    }

    /// Send `tx_bytes` until it reaches a terminal outcome
    pub async fn send(
        &self,
        tx_bytes: &[u8],
        window: &BlockhashWindow,
        config: &SubmissionConfig,
    ) -> SubmissionOutcome {
        self.send_until(tx_bytes, window, config, std::future::pending::<()>())
            .await
    }

    /// Like [`send`](Self::send), but ends with [`SubmissionError::Cancelled`]
    /// as soon as `shutdown` resolves
    pub async fn send_until<F>(
        &self,
        tx_bytes: &[u8],
        window: &BlockhashWindow,
        config: &SubmissionConfig,
        shutdown: F,
    ) -> SubmissionOutcome
    where
        F: Future,
    {
        let logger = SubmissionLogger::fresh();
        let started = Instant::now();
        let attempts = AtomicU32::new(0);

        let outcome = tokio::select! {
            outcome = self.run(tx_bytes, window, config, &logger, &attempts) => outcome,
            _ = shutdown => Err(SubmissionError::Cancelled {
                attempts: attempts.load(Ordering::Relaxed),
            }),
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(signature) => {
                logger.log_success(signature, attempts.load(Ordering::Relaxed), latency_ms)
            }
            Err(err) => logger.log_failure(err, latency_ms),
        }
        outcome
    }

    async fn run(
        &self,
        tx_bytes: &[u8],
        window: &BlockhashWindow,
        config: &SubmissionConfig,
        logger: &SubmissionLogger,
        attempts: &AtomicU32,
    ) -> SubmissionOutcome {
        let max_retries = config.confirmation_retries;
        let mut attempt: u32 = 0;

        loop {
            logger.log_send_attempt(attempt, max_retries, window.expiry_height());
            attempts.store(attempt.saturating_add(1), Ordering::Relaxed);

            let failure = match self
                .rpc
                .send_raw_transaction(tx_bytes, &config.send_options)
                .await
            {
                Ok(signature) => {
                    logger.log_accepted(&signature, attempt);
                    if config.skip_confirmation_check {
                        return Ok(signature);
                    }
                    match self.confirm(&signature, window, config).await {
                        Ok(()) => return Ok(signature),
                        Err(PollFailure::Terminal(err)) => return Err(err),
                        Err(PollFailure::Transport(err)) => err,
                    }
                }
                Err(err) => err,
            };

            if attempt >= max_retries {
                return Err(SubmissionError::MaxRetriesExceeded {
                    attempts: attempt.saturating_add(1),
                    last_reason: failure.message().to_string(),
                });
            }
            if failure.is_expired() {
                return Err(SubmissionError::ExpiredBlockhash {
                    reason: failure.message().to_string(),
                });
            }

            logger.log_retry(attempt, failure.message());
            attempt += 1;
            sleep(config.confirmation_retry_timeout).await;

            // An unreadable height leaves the retry budget as the only bound
            match self.rpc.get_block_height().await {
                Ok(height) if window.is_expired_at(height) => {
                    return Err(expired_at(height, window));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(error = %err, "Block height unavailable before resend");
                }
            }
        }
    }

    /// Poll until the signature reaches the target commitment
    async fn confirm(
        &self,
        signature: &Signature,
        window: &BlockhashWindow,
        config: &SubmissionConfig,
    ) -> Result<(), PollFailure> {
        loop {
            match self.rpc.get_signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(reason) = status.err {
                        return Err(PollFailure::Terminal(SubmissionError::LedgerRejected {
                            signature: *signature,
                            reason,
                        }));
                    }
                    if status.reached(config.commitment) {
                        return Ok(());
                    }
                    tracing::trace!(
                        signature = %signature,
                        status = ?status.confirmation_status,
                        "Below target commitment"
                    );
                }
                Ok(None) => {}
                Err(err) => return Err(PollFailure::Transport(err)),
            }

            sleep(config.confirmation_check_interval).await;

            let height = self
                .rpc
                .get_block_height()
                .await
                .map_err(PollFailure::Transport)?;
            if window.is_expired_at(height) {
                return Err(PollFailure::Terminal(expired_at(height, window)));
            }
        }
    }
}

fn expired_at(height: u64, window: &BlockhashWindow) -> SubmissionError {
    SubmissionError::ExpiredBlockhash {
        reason: format!(
            "block height {} exceeded expiry height {}",
            height,
            window.expiry_height()
        ),
    }
}
