//! RPC Manager Module
//!
//! Ledger RPC trait, its `RpcClient` implementation, and error
//! classification for send/poll failures.

pub mod ledger;
pub mod rpc_errors;

// Re-exports for convenience
pub use ledger::{connect, ConfirmationLevel, LedgerRpc, SendOptions, SignatureStatus};
pub use rpc_errors::LedgerRpcError;
