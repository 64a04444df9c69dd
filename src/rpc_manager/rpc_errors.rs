use solana_client::client_error::{ClientError, ClientErrorKind};
use thiserror::Error;

/// Message fragments that mean the blockhash window has closed
const EXPIRY_MARKERS: [&str; 2] = ["transaction expired", "block height exceeded"];

/// Ledger RPC error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerRpcError {
    /// Transport-level or RPC server rejection; worth resending
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The transaction's blockhash is no longer valid
    #[error("Transaction expired: {message}")]
    Expired { message: String },
}

impl LedgerRpcError {
    /// Transport error from any message
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Classify an error message, falling back to [`Self::Transport`]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if EXPIRY_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            Self::Expired { message }
        } else {
            Self::Transport { message }
        }
    }

    /// Create from ClientError
    ///
    /// Connection-level failures are transport errors by construction. For
    /// everything else the RPC surface carries no dedicated expiry code, so
    /// the message is inspected.
    pub fn from_client_error(err: &ClientError) -> Self {
        match err.kind() {
            ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => Self::transport(err.to_string()),
            _ => Self::from_message(err.to_string()),
        }
    }

    /// Whether this error ends the submission as expired
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }

    /// Human-readable reason
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message } | Self::Expired { message } => message,
        }
    }
}

impl From<ClientError> for LedgerRpcError {
    fn from(err: ClientError) -> Self {
        Self::from_client_error(&err)
    }
}
