//! Structured logging and submission context

use solana_sdk::signature::Signature;
use uuid::Uuid;

use crate::submit::SubmissionError;

/// Structured logger for submission events
///
/// Every event carries the same `context_id`, so concurrent submissions can
/// be told apart in interleaved output.
#[derive(Debug, Clone)]
pub struct SubmissionLogger {
    context_id: String,
}

impl SubmissionLogger {
    pub fn new(context_id: String) -> Self {
        Self { context_id }
    }

    /// Logger with a fresh random context id
    pub fn fresh() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_send_attempt(&self, attempt: u32, max_attempts: u32, expiry_height: u64) {
        tracing::debug!(
            context_id = %self.context_id,
            attempt = attempt,
            max_attempts = max_attempts,
            expiry_height = expiry_height,
            "Sending transaction"
        );
    }

    pub fn log_accepted(&self, signature: &Signature, attempt: u32) {
        tracing::debug!(
            context_id = %self.context_id,
            signature = %signature,
            attempt = attempt,
            "Transaction accepted by RPC"
        );
    }

    pub fn log_success(&self, signature: &Signature, attempts: u32, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            attempts = attempts,
            latency_ms = latency_ms,
            "Submission succeeded"
        );
    }

    pub fn log_retry(&self, attempt: u32, reason: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            attempt = attempt,
            reason = %reason,
            "Send failed, retrying"
        );
    }

    pub fn log_failure(&self, error: &SubmissionError, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            category = error.category(),
            error = %error,
            latency_ms = latency_ms,
            "Submission failed"
        );
    }
}

impl Default for SubmissionLogger {
    fn default() -> Self {
        Self::fresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_loggers_have_distinct_ids() {
        let a = SubmissionLogger::fresh();
        let b = SubmissionLogger::fresh();
        assert_ne!(a.context_id(), b.context_id());
        assert!(Uuid::parse_str(a.context_id()).is_ok());
    }
}
