//! Error types for the transaction assembler
//!
//! Every failure between "provider handed us a payload" and "we hold signed
//! wire bytes" ends up here. Assembly errors are never retried by the
//! submission layer: the payload either makes sense or it does not.

use thiserror::Error;

/// Error type for all transaction assembly operations
#[derive(Error, Debug)]
pub enum AssembleError {
    /// Payload could not be read as base64 text nor as raw wire bytes
    #[error("Payload decode failed: {0}")]
    Decode(String),

    /// The auxiliary transfer targets a slot the transaction does not have
    #[error("Instruction slot {index} out of range (transaction has {len} instructions)")]
    InstructionSlot {
        /// Requested instruction index
        index: usize,
        /// Number of instructions in the decoded message
        len: usize,
    },

    /// The signer is not a writable signer of the message
    ///
    /// A system transfer debits the signer, so it must be listed in the
    /// writable-signed section of the account keys.
    #[error("Signer {0} is not a writable signer of the transaction")]
    SignerNotWritable(String),

    /// The auxiliary recipient is already present as a readonly account
    #[error("Auxiliary recipient {0} is present as a readonly account")]
    ReadonlyRecipient(String),

    /// The computed auxiliary amount is not a valid lamport count
    #[error("Invalid auxiliary amount: {0}")]
    AuxiliaryAmount(String),

    /// Rate lookup for a non-native input failed
    #[error("Pricing lookup failed: {0}")]
    Pricing(String),

    /// Failed to sign the transaction
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The message account table cannot take another key
    #[error("Message layout error: {0}")]
    Layout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failed to serialize the signed transaction
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl AssembleError {
    /// Check if this error is potentially retryable
    ///
    /// Only the pricing collaborator can fail transiently; everything else
    /// is a property of the payload or the configuration.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Pricing(_) => true,

            Self::Decode(_) => false,
            Self::InstructionSlot { .. } => false,
            Self::SignerNotWritable(_) => false,
            Self::ReadonlyRecipient(_) => false,
            Self::AuxiliaryAmount(_) => false,
            Self::Signing(_) => false,
            Self::Layout(_) => false,
            Self::Configuration(_) => false,
            Self::Serialization(_) => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::InstructionSlot { .. } => "instruction",
            Self::SignerNotWritable(_) => "signer",
            Self::ReadonlyRecipient(_) => "instruction",
            Self::AuxiliaryAmount(_) => "auxiliary",
            Self::Pricing(_) => "pricing",
            Self::Signing(_) => "signing",
            Self::Layout(_) => "layout",
            Self::Configuration(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl AssembleError {
    /// Create a decode error
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }

    /// Create a signing error
    pub fn signing(reason: impl Into<String>) -> Self {
        Self::Signing(reason.into())
    }

    /// Create an auxiliary amount error
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        Self::AuxiliaryAmount(reason.into())
    }
}
