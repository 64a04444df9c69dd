use solana_sdk::signature::Signature;
use thiserror::Error;

/// Terminal submission outcomes other than success
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// The reference blockhash window closed before confirmation
    #[error("Transaction expired: {reason}")]
    ExpiredBlockhash { reason: String },

    /// The ledger executed the transaction and it failed
    #[error("Transaction {signature} rejected by ledger: {reason}")]
    LedgerRejected { signature: Signature, reason: String },

    /// Every allowed send attempt failed
    #[error("Gave up after {attempts} send attempts: {last_reason}")]
    MaxRetriesExceeded { attempts: u32, last_reason: String },

    /// The caller stopped the submission
    #[error("Submission cancelled after {attempts} send attempts")]
    Cancelled { attempts: u32 },
}

impl SubmissionError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::ExpiredBlockhash { .. } => "expired",
            Self::LedgerRejected { .. } => "rejected",
            Self::MaxRetriesExceeded { .. } => "max_retries",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Whether rebuilding with a fresh blockhash could succeed
    pub fn is_rebuildable(&self) -> bool {
        matches!(
            self,
            Self::ExpiredBlockhash { .. } | Self::MaxRetriesExceeded { .. }
        )
    }
}
