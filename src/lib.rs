//! Swap Sender - Solana swap transaction assembly and submission
//!
//! Fetches a swap transaction from a quote provider, signs it, and drives it
//! to confirmation within its blockhash window.

// Solana SDK compatibility layer
pub mod compat;

pub mod config;
pub mod quote_provider;
pub mod rpc_manager;
pub mod structured_logging;
pub mod submit;
pub mod swap;
pub mod tx_builder;
pub mod wallet;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use submit::{BlockhashWindow, SubmissionConfig, SubmissionError, SubmissionWaiter};
pub use swap::{SwapError, SwapExecutor};
